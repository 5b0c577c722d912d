//! Folding a session log into a [`SessionSummary`].
//!
//! Summaries are recomputed from the log on every call. Events are consumed
//! one at a time by [`SessionAccumulator`], so a file is never held in
//! memory in full; everything order-sensitive (last model, last stop
//! reason, first label) is tracked as the fold goes.

use crate::error::Result;
use crate::events::{open_events, CustomEvent, LogEvent, MessagePayload};
use crate::identity::SessionIdentity;
use crate::types::{SessionStatus, SessionSummary, DEFAULT_LABEL, SUBAGENT_LABEL, UNKNOWN_MODEL};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::fs::Metadata;
use std::path::Path;
use std::sync::OnceLock;

/// Longest label taken from free-text task instructions.
const MAX_EXTRACTED_LABEL_CHARS: usize = 60;

fn task_label_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?im)^[\s>*_#-]*(?:label|task)[*_]*\s*:[*_]*[ \t]*(.+)$").ok())
        .as_ref()
}

/// Pull a short label out of sub-agent task instructions, e.g. a
/// `Label: Fix parser` or `**Task:** Fix parser` line.
pub fn extract_task_label(text: &str) -> Option<String> {
    let caps = task_label_pattern()?.captures(text)?;
    let raw = caps.get(1)?.as_str();
    let cleaned = raw.trim().trim_matches(|c| c == '*' || c == '_').trim();
    if cleaned.is_empty() {
        return None;
    }
    Some(cleaned.chars().take(MAX_EXTRACTED_LABEL_CHARS).collect())
}

/// Modification and creation times of a log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogFileTimes {
    pub modified: DateTime<Utc>,
    pub created: DateTime<Utc>,
}

impl LogFileTimes {
    /// Creation time falls back to modification time on filesystems that
    /// don't record it.
    pub fn from_metadata(metadata: &Metadata) -> std::io::Result<Self> {
        let modified: DateTime<Utc> = metadata.modified()?.into();
        let created = metadata.created().map(DateTime::<Utc>::from).unwrap_or(modified);
        Ok(Self { modified, created })
    }
}

/// Running state of the single pass over a session's events.
#[derive(Debug, Clone, Default)]
pub struct SessionAccumulator {
    header_id: Option<String>,
    total_tokens: u64,
    total_cost: f64,
    model: Option<String>,
    last_status: Option<SessionStatus>,
    message_count: u64,
    custom_label: Option<String>,
    snapshot_model: Option<String>,
    user_task_label: Option<String>,
    any_task_label: Option<String>,
}

impl SessionAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: &LogEvent) {
        match event {
            LogEvent::Session(session) => {
                if self.header_id.is_none() {
                    self.header_id = session.id.clone().filter(|id| !id.is_empty());
                }
            }
            LogEvent::Message(message) => {
                if let Some(payload) = &message.message {
                    self.push_message(payload);
                }
            }
            LogEvent::Custom(custom) => self.push_custom(custom),
            LogEvent::Other(_) => {}
        }
    }

    fn push_message(&mut self, payload: &MessagePayload) {
        self.message_count += 1;

        if let Some(usage) = &payload.usage {
            self.total_tokens = self.total_tokens.saturating_add(usage.tokens());
            self.total_cost += usage.cost_total();
        }

        if let Some(model) = payload.model.as_deref().filter(|m| !m.is_empty()) {
            self.model = Some(model.to_string());
        }

        if payload.stop_reason.is_some() {
            self.last_status = Some(if payload.stopped_for_tool() {
                SessionStatus::Running
            } else {
                SessionStatus::Completed
            });
        }

        let is_user = payload.role.as_deref() == Some("user");
        if (is_user && self.user_task_label.is_none()) || self.any_task_label.is_none() {
            if let Some(label) = extract_task_label(&payload.text()) {
                if is_user && self.user_task_label.is_none() {
                    self.user_task_label = Some(label.clone());
                }
                if self.any_task_label.is_none() {
                    self.any_task_label = Some(label);
                }
            }
        }
    }

    fn push_custom(&mut self, custom: &CustomEvent) {
        if self.custom_label.is_none() {
            self.custom_label = custom.label().map(str::to_string);
        }
        if self.snapshot_model.is_none() {
            self.snapshot_model = custom.snapshot_model().map(str::to_string);
        }
    }

    /// Resolve the summary for the log stored under `name`.
    pub fn finish(self, name: &str, agent_id: &str, times: LogFileTimes) -> SessionSummary {
        let identity = SessionIdentity::resolve(name, agent_id, self.header_id.as_deref());

        let label = match self.custom_label {
            Some(label) => label,
            None if identity.is_subagent() => self
                .user_task_label
                .or(self.any_task_label)
                .unwrap_or_else(|| SUBAGENT_LABEL.to_string()),
            None => DEFAULT_LABEL.to_string(),
        };

        let model = self
            .snapshot_model
            .or(self.model)
            .unwrap_or_else(|| UNKNOWN_MODEL.to_string());

        let status = if identity.is_deleted {
            SessionStatus::Archived
        } else if self.total_tokens == 0 {
            SessionStatus::Idle
        } else {
            self.last_status.unwrap_or(SessionStatus::Idle)
        };

        SessionSummary {
            session_id: identity.session_id,
            session_key: identity.session_key,
            label,
            model,
            total_tokens: self.total_tokens,
            total_cost: self.total_cost,
            status,
            message_count: self.message_count,
            last_updated: times.modified,
            created_at: times.created,
            is_deleted: identity.is_deleted,
        }
    }
}

/// Summarize an already decoded event sequence.
pub fn summarize_events<I>(name: &str, agent_id: &str, events: I, times: LogFileTimes) -> SessionSummary
where
    I: IntoIterator<Item = LogEvent>,
{
    let mut acc = SessionAccumulator::new();
    for event in events {
        acc.push(&event);
    }
    acc.finish(name, agent_id, times)
}

/// Read and summarize one log file.
pub fn summarize_file(path: &Path, agent_id: &str) -> Result<SessionSummary> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let metadata = std::fs::metadata(path)?;
    let times = LogFileTimes::from_metadata(&metadata)?;

    let mut stream = open_events(path)?;
    let mut acc = SessionAccumulator::new();
    for value in stream.by_ref() {
        acc.push(&LogEvent::from_value(value));
    }
    if let Some(e) = stream.take_error() {
        return Err(e.into());
    }

    Ok(acc.finish(&name, agent_id, times))
}
