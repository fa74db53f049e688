//! Persisted notification tasks.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a notification task.
///
/// ```text
/// Pending → InFlight → Completed
///              └─────→ Pending (retry)
/// ```
///
/// There is no terminal failure state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskState {
    Pending,
    InFlight,
    Completed,
}

/// One "your config changed" delivery to a listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationTask {
    pub id: Uuid,
    /// Listener base URL.
    pub url: String,
    /// Section owning the listener; its admin token is the credential.
    pub section: String,
    pub state: TaskState,
    pub attempts: u32,
    pub created_on: u64,
    /// Earliest unix second the task may be claimed again.
    pub not_before: u64,
    #[serde(default)]
    pub claimed_by: Option<String>,
    #[serde(default)]
    pub claimed_at: Option<u64>,
    #[serde(default)]
    pub completed_on: Option<u64>,
    #[serde(default)]
    pub last_error: Option<String>,
}

impl NotificationTask {
    pub fn new(url: impl Into<String>, section: impl Into<String>, now: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            section: section.into(),
            state: TaskState::Pending,
            attempts: 0,
            created_on: now,
            not_before: now,
            claimed_by: None,
            claimed_at: None,
            completed_on: None,
            last_error: None,
        }
    }

    pub fn is_due(&self, now: u64) -> bool {
        self.state == TaskState::Pending && self.not_before <= now
    }
}

/// Queue depth by state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub pending: usize,
    pub in_flight: usize,
    pub completed: usize,
}
