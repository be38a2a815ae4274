pub mod connection;
pub mod schema;
pub mod jobs;
pub mod results;
pub mod wallets;
pub mod audit;

pub use connection::Database;

use chrono::{DateTime, Utc};

use crate::errors::LinkshieldError;

pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, LinkshieldError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| LinkshieldError::Database(format!("Bad timestamp '{}': {}", s, e)))
}
