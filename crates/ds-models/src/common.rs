//! Shared wire types used across DeepSights responses

use serde::{Deserialize, Serialize};

/// Status block of a server-side asynchronous job ("minion job").
///
/// The server reports `CREATED` while the job is queued, `STARTED` while it
/// runs, a `FAILED*` status on failure and anything else once the result is
/// available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinionJob {
    /// Job identifier, used for polling
    pub id: String,

    /// Server-reported status string
    pub status: String,

    /// Failure detail, present when status starts with FAILED
    #[serde(default)]
    pub error_reason: Option<String>,
}

impl MinionJob {
    /// Whether the server still considers the job in flight
    pub fn is_in_progress(&self) -> bool {
        self.status == "CREATED" || self.status == "STARTED"
    }

    /// Whether the server reported failure
    pub fn is_failed(&self) -> bool {
        self.status.starts_with("FAILED")
    }
}
