use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::analyzer::LlmAnalyzer;
use crate::api::{build_router, AppState};
use crate::cli::commands::ServeArgs;
use crate::config::ServiceConfig;
use crate::db::Database;
use crate::engine::{ScanOrchestrator, WorkerPool};
use crate::errors::LinkshieldError;

pub(crate) async fn load_config(path: Option<&str>) -> Result<ServiceConfig, LinkshieldError> {
    match path {
        Some(p) => ServiceConfig::load(Path::new(p)).await,
        None => Ok(ServiceConfig::default()),
    }
}

pub(crate) fn resolve_api_key(arg: Option<&str>) -> Result<String, LinkshieldError> {
    if let Some(key) = arg {
        return Ok(key.to_string());
    }
    std::env::var("OPENAI_API_KEY").map_err(|_| {
        LinkshieldError::Config("No API key: pass --api-key or set OPENAI_API_KEY".into())
    })
}

pub async fn handle_serve(args: ServeArgs) -> Result<(), LinkshieldError> {
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
    let orchestrator = Arc::new(ScanOrchestrator::new(db, analyzer, config.clone()));

    let pool = WorkerPool::spawn(orchestrator.clone(), config.workers, config.poll_interval());

    let app = build_router(AppState { orchestrator });
    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    let result = axum::serve(listener, app)
        .await
        .map_err(|e| LinkshieldError::Internal(format!("Server error: {}", e)));

    pool.shutdown().await;
    result
}
