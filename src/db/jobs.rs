use chrono::Utc;

use super::{parse_timestamp, Database};
use crate::errors::LinkshieldError;
use crate::models::{JobState, ScanJob};

fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<(ScanJob, String, String)> {
    let state_str: String = row.get(3)?;
    let created: String = row.get(7)?;
    let updated: String = row.get(8)?;
    Ok((
        ScanJob {
            id: row.get(0)?,
            user_id: row.get(1)?,
            url: row.get(2)?,
            state: JobState::parse(&state_str).unwrap_or(JobState::Failed),
            version: row.get(4)?,
            reservation_id: row.get(5)?,
            error_message: row.get(6)?,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        },
        created,
        updated,
    ))
}

const JOB_COLUMNS: &str =
    "id, user_id, url, state, version, reservation_id, error_message, created_at, updated_at";

impl Database {
    /// Insert a new job in the queued state with version 1.
    pub fn create_job(
        &self,
        id: &str,
        user_id: &str,
        url: &str,
        reservation_id: &str,
    ) -> Result<ScanJob, LinkshieldError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO scan_jobs (id, user_id, url, state, version, reservation_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, 'queued', 1, ?4, ?5, ?5)",
            rusqlite::params![id, user_id, url, reservation_id, now.to_rfc3339()],
        )
        .map_err(|e| LinkshieldError::Database(format!("Failed to create job: {}", e)))?;

        Ok(ScanJob {
            id: id.to_string(),
            user_id: user_id.to_string(),
            url: url.to_string(),
            state: JobState::Queued,
            version: 1,
            reservation_id: reservation_id.to_string(),
            error_message: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_job(&self, id: &str) -> Result<Option<ScanJob>, LinkshieldError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(&format!("SELECT {} FROM scan_jobs WHERE id = ?1", JOB_COLUMNS))
            .map_err(|e| LinkshieldError::Database(format!("Query failed: {}", e)))?;

        let result = stmt.query_row(rusqlite::params![id], row_to_job);
        match result {
            Ok((mut job, created, updated)) => {
                job.created_at = parse_timestamp(&created)?;
                job.updated_at = parse_timestamp(&updated)?;
                Ok(Some(job))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(LinkshieldError::Database(format!("Query error: {}", e))),
        }
    }

    /// List jobs, newest first, optionally filtered to one user.
    pub fn list_jobs(
        &self,
        user_id: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ScanJob>, LinkshieldError> {
        let conn = self.conn.lock().unwrap();
        let sql = match user_id {
            Some(_) => format!(
                "SELECT {} FROM scan_jobs WHERE user_id = ?1 ORDER BY created_at DESC LIMIT ?2 OFFSET ?3",
                JOB_COLUMNS
            ),
            None => format!(
                "SELECT {} FROM scan_jobs ORDER BY created_at DESC LIMIT ?1 OFFSET ?2",
                JOB_COLUMNS
            ),
        };
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| LinkshieldError::Database(format!("Query failed: {}", e)))?;

        let mapped = match user_id {
            Some(uid) => stmt.query_map(
                rusqlite::params![uid, limit as i64, offset as i64],
                row_to_job,
            ),
            None => stmt.query_map(rusqlite::params![limit as i64, offset as i64], row_to_job),
        }
        .map_err(|e| LinkshieldError::Database(format!("Query error: {}", e)))?;

        let mut jobs = Vec::new();
        for row in mapped {
            let (mut job, created, updated) =
                row.map_err(|e| LinkshieldError::Database(format!("Row error: {}", e)))?;
            job.created_at = parse_timestamp(&created)?;
            job.updated_at = parse_timestamp(&updated)?;
            jobs.push(job);
        }
        Ok(jobs)
    }

    /// The oldest queued job, if any. Queued rows are the work queue;
    /// claiming is done separately via the version CAS so two workers
    /// reading the same row race safely.
    pub fn next_queued_job(&self) -> Result<Option<ScanJob>, LinkshieldError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM scan_jobs WHERE state = 'queued' ORDER BY created_at ASC LIMIT 1",
                JOB_COLUMNS
            ))
            .map_err(|e| LinkshieldError::Database(format!("Query failed: {}", e)))?;

        match stmt.query_row([], row_to_job) {
            Ok((mut job, created, updated)) => {
                job.created_at = parse_timestamp(&created)?;
                job.updated_at = parse_timestamp(&updated)?;
                Ok(Some(job))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(LinkshieldError::Database(format!("Query error: {}", e))),
        }
    }

    /// Compare-and-swap state transition. The caller supplies the
    /// version it read; on mismatch the transition fails with
    /// `StaleVersion` instead of silently overwriting. Returns the new
    /// version on success.
    pub fn transition_job(
        &self,
        id: &str,
        expected_version: i64,
        next: JobState,
        error_message: Option<&str>,
    ) -> Result<i64, LinkshieldError> {
        let conn = self.conn.lock().unwrap();

        let current: Result<(String, i64), _> = conn.query_row(
            "SELECT state, version FROM scan_jobs WHERE id = ?1",
            rusqlite::params![id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        );
        let (state_str, version) = match current {
            Ok(v) => v,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(LinkshieldError::NotFound(format!("job {}", id)))
            }
            Err(e) => return Err(LinkshieldError::Database(format!("Query error: {}", e))),
        };

        if version != expected_version {
            return Err(LinkshieldError::StaleVersion(id.to_string()));
        }

        let current_state = JobState::parse(&state_str)
            .ok_or_else(|| LinkshieldError::Database(format!("Unknown job state '{}'", state_str)))?;
        if !current_state.can_transition_to(next) {
            return Err(LinkshieldError::Validation(format!(
                "illegal transition {} -> {} on job {}",
                current_state, next, id
            )));
        }

        let affected = conn
            .execute(
                "UPDATE scan_jobs
                 SET state = ?3, version = version + 1, error_message = ?4, updated_at = ?5
                 WHERE id = ?1 AND version = ?2",
                rusqlite::params![
                    id,
                    expected_version,
                    next.as_str(),
                    error_message,
                    Utc::now().to_rfc3339()
                ],
            )
            .map_err(|e| LinkshieldError::Database(format!("Update failed: {}", e)))?;

        if affected == 0 {
            return Err(LinkshieldError::StaleVersion(id.to_string()));
        }
        Ok(expected_version + 1)
    }
}
