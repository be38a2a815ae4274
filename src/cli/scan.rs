use std::sync::Arc;

use console::style;

use crate::analyzer::LlmAnalyzer;
use crate::cli::commands::ScanArgs;
use crate::cli::serve::{load_config, resolve_api_key};
use crate::db::Database;
use crate::engine::ScanOrchestrator;
use crate::errors::LinkshieldError;
use crate::models::JobState;

/// Headless one-shot scan: submit, drive the job inline, print the
/// verdict.
pub async fn handle_scan(args: ScanArgs) -> Result<(), LinkshieldError> {
    let mut config = load_config(args.config.as_deref()).await?;
    if let Some(model) = &args.model {
        config.model = model.clone();
    }
    if let Some(base_url) = &args.base_url {
        config.model_base_url = base_url.clone();
    }
    config.validate()?;

    let api_key = resolve_api_key(args.api_key.as_deref())?;
    let analyzer = Arc::new(LlmAnalyzer::new(
        &api_key,
        &config.model,
        &config.model_base_url,
        config.fetch_timeout(),
    )?);

    let db = Database::new(&args.db)?;
    let orchestrator = ScanOrchestrator::new(db.clone(), analyzer, config);

    let job = orchestrator.submit(&args.user, &args.url)?;
    println!("Submitted scan {} for {}", style(&job.id).cyan(), args.url);

    orchestrator.process(&job).await?;

    let job = db
        .get_job(&job.id)?
        .ok_or_else(|| LinkshieldError::Internal("Job vanished after processing".into()))?;

    match job.state {
        JobState::Completed => {
            let result = db
                .get_result(&job.id)?
                .ok_or_else(|| LinkshieldError::Internal("Completed job has no result".into()))?;
            let score_styled = if result.risk_score >= 70 {
                style(result.risk_score).red().bold()
            } else if result.risk_score >= 40 {
                style(result.risk_score).yellow()
            } else {
                style(result.risk_score).green()
            };
            println!("Risk score:  {}/100", score_styled);
            println!("Categories:  {}", result.categories.join(", "));
            println!("Confidence:  {:.2}", result.confidence);
            println!("Model:       {}", result.model_used);
            println!("Reasoning:   {}", result.reasoning);
            for indicator in &result.indicators {
                println!("  - {}", indicator);
            }
        }
        state => {
            println!(
                "{} scan ended in state '{}': {}",
                style("!").red(),
                state,
                job.error_message.as_deref().unwrap_or("no detail")
            );
            println!("The reserved credit was refunded.");
        }
    }
    Ok(())
}
