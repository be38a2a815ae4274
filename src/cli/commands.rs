use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "linkshield", version, about = "AI-powered URL safety screening service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP REST API server and worker pool
    Serve(ServeArgs),
    /// Submit one URL and drive the scan to completion
    Scan(ScanArgs),
    /// Query a scan job and its verdict
    Query(QueryArgs),
    /// Manage a user's credit wallet
    Credits(CreditsArgs),
}

#[derive(Args, Clone)]
pub struct ServeArgs {
    /// Bind address
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Bind port
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    /// SQLite database path
    #[arg(long, default_value = "./linkshield.db")]
    pub db: String,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Model API key (or use OPENAI_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Model identifier for risk assessment
    #[arg(long)]
    pub model: Option<String>,

    /// OpenAI-compatible endpoint base URL
    #[arg(long)]
    pub base_url: Option<String>,
}

#[derive(Args, Clone)]
pub struct ScanArgs {
    /// Owning user id
    #[arg(short, long)]
    pub user: String,

    /// Target URL to screen
    #[arg(long)]
    pub url: String,

    /// SQLite database path
    #[arg(long, default_value = "./linkshield.db")]
    pub db: String,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Model API key (or use OPENAI_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Model identifier for risk assessment
    #[arg(long)]
    pub model: Option<String>,

    /// OpenAI-compatible endpoint base URL
    #[arg(long)]
    pub base_url: Option<String>,
}

#[derive(Args, Clone)]
pub struct QueryArgs {
    /// Scan job id
    pub job_id: String,

    /// SQLite database path
    #[arg(long, default_value = "./linkshield.db")]
    pub db: String,
}

#[derive(Args, Clone)]
pub struct CreditsArgs {
    #[command(subcommand)]
    pub command: CreditsCommands,
}

#[derive(Subcommand, Clone)]
pub enum CreditsCommands {
    /// Add credits to a user's wallet
    Add {
        /// User id
        #[arg(short, long)]
        user: String,

        /// Credits to add
        #[arg(short, long)]
        amount: i64,

        /// Ledger description
        #[arg(long)]
        description: Option<String>,

        /// SQLite database path
        #[arg(long, default_value = "./linkshield.db")]
        db: String,
    },
    /// Show a user's balance
    Balance {
        /// User id
        #[arg(short, long)]
        user: String,

        /// SQLite database path
        #[arg(long, default_value = "./linkshield.db")]
        db: String,
    },
    /// Show a user's transaction history
    History {
        /// User id
        #[arg(short, long)]
        user: String,

        /// SQLite database path
        #[arg(long, default_value = "./linkshield.db")]
        db: String,
    },
}
