use regex::Regex;
use std::sync::OnceLock;

use crate::db::Database;
use crate::errors::LinkshieldError;
use crate::models::{AuditLogEntry, AuditLogInput};

/// Longest value accepted for any single audit field. Real metadata
/// (URLs, header values, category names) sits far below this; anything
/// larger is treated as smuggled content.
const MAX_FIELD_LEN: usize = 2048;

fn markup_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)<\s*(!doctype|html|head|body|script|iframe|div|img|style)\b").unwrap()
    })
}

fn is_content_shaped(value: &str) -> bool {
    if value.len() > MAX_FIELD_LEN {
        return true;
    }
    if markup_pattern().is_match(value) {
        return true;
    }
    // Binary payloads: control bytes other than whitespace
    value
        .bytes()
        .any(|b| b < 0x20 && b != b'\t' && b != b'\n' && b != b'\r')
}

/// Append-only recorder for fetch metadata. Every record is validated
/// to be metadata-only before it is persisted: a field carrying an HTML
/// body, a binary blob, or an oversized value fails the call outright
/// rather than being stored. Page bodies, screenshots, and DOM
/// snapshots never reach this table.
#[derive(Clone)]
pub struct AuditRecorder {
    db: Database,
}

impl AuditRecorder {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn record(&self, input: &AuditLogInput) -> Result<AuditLogEntry, LinkshieldError> {
        Self::validate(input)?;
        self.db.insert_audit_entry(input)
    }

    /// Hard metadata-only check. This is an invariant of the audit
    /// table, not a best-effort filter.
    fn validate(input: &AuditLogInput) -> Result<(), LinkshieldError> {
        Self::check_field("url_accessed", &input.url_accessed)?;
        if let Some(hash) = &input.content_hash {
            Self::check_field("content_hash", hash)?;
            if hash.len() != 64 || !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(LinkshieldError::Validation(format!(
                    "audit field content_hash is not a hex digest: {} bytes",
                    hash.len()
                )));
            }
        }
        if let Some(content_type) = &input.content_type {
            Self::check_field("content_type", content_type)?;
        }
        if let Some(headers) = &input.http_headers {
            for (name, value) in headers {
                Self::check_field(name, value)?;
            }
        }
        if let Some(categories) = &input.categories {
            for category in categories {
                Self::check_field("category", category)?;
            }
        }
        Ok(())
    }

    fn check_field(name: &str, value: &str) -> Result<(), LinkshieldError> {
        if is_content_shaped(value) {
            return Err(LinkshieldError::Validation(format!(
                "audit field '{}' resembles raw content ({} bytes)",
                name,
                value.len()
            )));
        }
        Ok(())
    }

    pub fn entries_for_job(&self, job_id: &str) -> Result<Vec<AuditLogEntry>, LinkshieldError> {
        self.db.list_audit_entries(job_id)
    }
}
