//! Session identity from a log's file name and header record.

use regex::Regex;
use std::sync::OnceLock;

/// Extension of an active session log.
pub const PRIMARY_EXTENSION: &str = ".jsonl";
/// Inserted after the extension when a session is archived,
/// e.g. `<id>.jsonl.deleted.2026-01-02T03-04-05.000Z`.
pub const ARCHIVE_MARKER: &str = ".deleted.";
/// Suffix of the writer's lock file next to an active log.
pub const LOCK_SUFFIX: &str = ".lock";
/// Session keys containing this belong to delegated sub-tasks.
pub const SUBAGENT_MARKER: &str = "subagent";

fn session_id_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
                .ok()
        })
        .as_ref()
}

/// What a directory entry is, judged by name alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Active,
    Archived,
    Lock,
    Other,
}

impl LogKind {
    pub fn classify(name: &str) -> Self {
        if name.ends_with(LOCK_SUFFIX) {
            LogKind::Lock
        } else if name.contains(&format!("{PRIMARY_EXTENSION}{ARCHIVE_MARKER}")) {
            LogKind::Archived
        } else if name.ends_with(PRIMARY_EXTENSION) {
            LogKind::Active
        } else {
            LogKind::Other
        }
    }
}

/// Who a session is and whether it has been archived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub session_id: String,
    pub session_key: String,
    pub is_deleted: bool,
}

impl SessionIdentity {
    /// Resolve identity from a storage name and the `id` of the log's first
    /// `session` record, if one was seen.
    pub fn resolve(name: &str, agent_id: &str, header_id: Option<&str>) -> Self {
        let session_id = session_id_from_name(name);
        let session_key = match header_id {
            Some(id) if !id.is_empty() => namespaced_key(agent_id, id),
            _ => session_id.clone(),
        };
        Self {
            session_id,
            session_key,
            is_deleted: is_archived_name(name),
        }
    }

    pub fn is_subagent(&self) -> bool {
        is_subagent_key(&self.session_key)
    }
}

/// Leading UUID of the storage name, or the whole name when there is none.
pub fn session_id_from_name(name: &str) -> String {
    session_id_pattern()
        .and_then(|re| re.find(name))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| name.to_string())
}

pub fn is_archived_name(name: &str) -> bool {
    name.contains(ARCHIVE_MARKER)
}

/// `agent:<agent_id>:<id>`
pub fn namespaced_key(agent_id: &str, id: &str) -> String {
    format!("agent:{agent_id}:{id}")
}

pub fn is_subagent_key(key: &str) -> bool {
    key.contains(SUBAGENT_MARKER)
}
