use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a scan job. Transitions are monotonic along
/// queued -> fetching -> analyzing -> {completed, failed, timed_out};
/// the three terminal states are write-once.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Fetching,
    Analyzing,
    Completed,
    Failed,
    TimedOut,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::Analyzing => "analyzing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "fetching" => Some(Self::Fetching),
            "analyzing" => Some(Self::Analyzing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "timed_out" => Some(Self::TimedOut),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::TimedOut)
    }

    /// The directed transition graph. Failure states are reachable from
    /// the two in-flight states only; no edge skips a state and no edge
    /// leaves a terminal state. No job re-enters queued.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Fetching)
                | (Self::Fetching, Self::Analyzing)
                | (Self::Fetching, Self::Failed)
                | (Self::Fetching, Self::TimedOut)
                | (Self::Analyzing, Self::Completed)
                | (Self::Analyzing, Self::Failed)
                | (Self::Analyzing, Self::TimedOut)
        )
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scan job row. Never deleted; retained as history once terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanJob {
    pub id: String,
    pub user_id: String,
    pub url: String,
    pub state: JobState,
    /// Optimistic concurrency counter, starts at 1 and increments on
    /// every committed transition. A transition must supply the version
    /// it read or it is rejected as stale.
    pub version: i64,
    pub reservation_id: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_roundtrip() {
        for s in [
            JobState::Queued,
            JobState::Fetching,
            JobState::Analyzing,
            JobState::Completed,
            JobState::Failed,
            JobState::TimedOut,
        ] {
            assert_eq!(JobState::parse(s.as_str()), Some(s));
        }
        assert_eq!(JobState::parse("running"), None);
    }

    #[test]
    fn test_happy_path_edges() {
        assert!(JobState::Queued.can_transition_to(JobState::Fetching));
        assert!(JobState::Fetching.can_transition_to(JobState::Analyzing));
        assert!(JobState::Analyzing.can_transition_to(JobState::Completed));
    }

    #[test]
    fn test_failure_edges_from_inflight_only() {
        assert!(JobState::Fetching.can_transition_to(JobState::Failed));
        assert!(JobState::Fetching.can_transition_to(JobState::TimedOut));
        assert!(JobState::Analyzing.can_transition_to(JobState::Failed));
        assert!(JobState::Analyzing.can_transition_to(JobState::TimedOut));
        assert!(!JobState::Queued.can_transition_to(JobState::Failed));
        assert!(!JobState::Queued.can_transition_to(JobState::TimedOut));
    }

    #[test]
    fn test_no_skipping_and_no_requeue() {
        assert!(!JobState::Queued.can_transition_to(JobState::Analyzing));
        assert!(!JobState::Queued.can_transition_to(JobState::Completed));
        assert!(!JobState::Fetching.can_transition_to(JobState::Completed));
        assert!(!JobState::Fetching.can_transition_to(JobState::Queued));
        assert!(!JobState::Failed.can_transition_to(JobState::Queued));
    }

    #[test]
    fn test_terminal_states_have_no_outgoing_edges() {
        for terminal in [JobState::Completed, JobState::Failed, JobState::TimedOut] {
            assert!(terminal.is_terminal());
            for next in [
                JobState::Queued,
                JobState::Fetching,
                JobState::Analyzing,
                JobState::Completed,
                JobState::Failed,
                JobState::TimedOut,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }
}
