pub mod orchestrator;
pub mod worker;

pub use orchestrator::{validate_url, ScanOrchestrator};
pub use worker::WorkerPool;
