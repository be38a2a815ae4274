use clap::Parser;
use tracing_subscriber::EnvFilter;

use linkshield::cli;
use linkshield::errors::LinkshieldError;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .init();

    let result = match cli.command {
        cli::Commands::Serve(args) => cli::serve::handle_serve(args).await,
        cli::Commands::Scan(args) => cli::scan::handle_scan(args).await,
        cli::Commands::Query(args) => cli::query::handle_query(args).await,
        cli::Commands::Credits(args) => cli::credits::handle_credits(args).await,
    };

    match result {
        Ok(()) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            let exit_code = match &e {
                LinkshieldError::Config(_) => 2,
                LinkshieldError::InvalidUrl(_) => 3,
                LinkshieldError::InsufficientCredit { .. } => 4,
                LinkshieldError::NotFound(_) => 5,
                _ => 1,
            };
            std::process::exit(exit_code);
        }
    }
}
