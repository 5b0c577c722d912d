use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label given to sessions with no explicit label.
pub const DEFAULT_LABEL: &str = "Main";
/// Label given to delegated sub-task sessions with no explicit label.
pub const SUBAGENT_LABEL: &str = "Sub-agent";
/// Model reported when no event names one.
pub const UNKNOWN_MODEL: &str = "unknown";

/// Current state of a session as read from its log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// No token-bearing message yet, or nothing observed.
    #[default]
    Idle,
    /// The last turn stopped to invoke a tool.
    Running,
    /// The last turn stopped for any other reason.
    Completed,
    /// The log was moved out of the active set.
    Archived,
    /// Part of the dashboard's wire contract; nothing in log interpretation
    /// produces it.
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Running => "running",
            SessionStatus::Completed => "completed",
            SessionStatus::Archived => "archived",
            SessionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate view of one session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Identifier taken from the log's file name.
    pub session_id: String,
    /// Namespaced key from the log's `session` event, else `session_id`.
    pub session_key: String,
    pub label: String,
    pub model: String,
    pub total_tokens: u64,
    pub total_cost: f64,
    pub status: SessionStatus,
    /// Number of message events carrying a payload.
    pub message_count: u64,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub is_deleted: bool,
}
