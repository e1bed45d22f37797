//! Per-entry action failures
//!
//! These never abort a run. The runner retries the retryable ones and the
//! orchestrator reports whatever is left, excluding those entries from
//! the merge.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionFailure {
    #[error("invalid acquisition descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("`{program}` not found")]
    ProgramNotFound { program: String },

    #[error("could not start `{program}`: {reason}")]
    Spawn { program: String, reason: String },

    #[error("`{program}` exited with {status}{}", detail_suffix(.detail))]
    NonZeroExit {
        program: String,
        status: String,
        detail: String,
    },

    #[error("`{program}` timed out after {secs}s")]
    Timeout { program: String, secs: u64 },

    #[error("fetching {url} failed: {reason}")]
    Fetch {
        url: String,
        reason: String,
        transient: bool,
    },

    #[error("failed to write {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("interrupted before the action could run")]
    Cancelled,
}

fn detail_suffix(detail: &str) -> String {
    if detail.is_empty() {
        String::new()
    } else {
        format!(": {detail}")
    }
}

impl ActionFailure {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ActionFailure::NonZeroExit { .. }
            | ActionFailure::Timeout { .. }
            | ActionFailure::Spawn { .. } => true,
            ActionFailure::Fetch { transient, .. } => *transient,
            ActionFailure::InvalidDescriptor(_)
            | ActionFailure::ProgramNotFound { .. }
            | ActionFailure::Io { .. }
            | ActionFailure::Cancelled => false,
        }
    }
}
