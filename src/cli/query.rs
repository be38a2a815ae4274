use console::style;

use crate::cli::commands::QueryArgs;
use crate::db::Database;
use crate::errors::LinkshieldError;
use crate::models::JobState;

pub async fn handle_query(args: QueryArgs) -> Result<(), LinkshieldError> {
    let db = Database::new(&args.db)?;
    let job = db
        .get_job(&args.job_id)?
        .ok_or_else(|| LinkshieldError::NotFound(format!("job {}", args.job_id)))?;

    println!("Job:      {}", style(&job.id).cyan());
    println!("User:     {}", job.user_id);
    println!("URL:      {}", job.url);
    println!("State:    {}", job.state);
    println!("Created:  {}", job.created_at.to_rfc3339());
    println!("Updated:  {}", job.updated_at.to_rfc3339());
    if let Some(error) = &job.error_message {
        println!("Error:    {}", error);
    }

    if job.state == JobState::Completed {
        if let Some(result) = db.get_result(&job.id)? {
            println!();
            println!("Risk score:  {}/100", result.risk_score);
            println!("Categories:  {}", result.categories.join(", "));
            println!("Confidence:  {:.2}", result.confidence);
            println!("Hash:        {}", result.content_hash);
            println!("Model:       {}", result.model_used);
        }
    }
    Ok(())
}
