//! Reading a directory of session logs.
//!
//! The store never writes. Every call lists the directory again and
//! summarizes each matching log from scratch; a log that cannot be read is
//! reported in [`SessionListing::failures`] and left out of the results
//! instead of failing the listing.

use crate::config::LogConfig;
use crate::error::{MonitorError, Result};
use crate::identity::{LogKind, ARCHIVE_MARKER, PRIMARY_EXTENSION};
use crate::summary::summarize_file;
use crate::types::SessionSummary;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A session log found in the store directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    pub path: PathBuf,
    pub name: String,
    pub kind: LogKind,
    pub modified: DateTime<Utc>,
}

impl LogFile {
    pub fn is_archived(&self) -> bool {
        self.kind == LogKind::Archived
    }
}

/// Filters for [`SessionStore::list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    /// Only logs modified within this long before now are listed.
    pub window: Duration,
    pub include_deleted: bool,
}

impl ListOptions {
    pub fn new(window_minutes: u64, include_deleted: bool) -> Self {
        let minutes = i64::try_from(window_minutes).unwrap_or(i64::MAX);
        Self {
            window: Duration::try_minutes(minutes).unwrap_or(Duration::MAX),
            include_deleted,
        }
    }

    pub fn from_config(config: &LogConfig) -> Self {
        Self::new(config.window_minutes, config.include_deleted)
    }

    /// Earliest modification time that passes the window.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// A log that was listed but could not be summarized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Result of a directory scan, newest session first.
#[derive(Debug, Clone, Default)]
pub struct SessionListing {
    pub sessions: Vec<SessionSummary>,
    pub failures: Vec<ScanFailure>,
}

/// Read-only view of one agent's session log directory.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
    agent_id: String,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>, agent_id: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            agent_id: agent_id.into(),
        }
    }

    pub fn from_config(config: &LogConfig) -> Self {
        Self::new(config.resolved_sessions_dir(), config.agent_id.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    fn read_dir(&self) -> Result<std::fs::ReadDir> {
        std::fs::read_dir(&self.dir).map_err(|source| MonitorError::Store {
            path: self.dir.clone(),
            source,
        })
    }

    /// Every active log, plus archived ones when `include_deleted` is set.
    /// Lock files and unrelated entries are never returned.
    pub fn log_files(&self, include_deleted: bool) -> Result<Vec<LogFile>> {
        let mut files = Vec::new();
        for entry in self.read_dir()? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Failed to read entry in {:?}: {}", self.dir, e);
                    continue;
                }
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            let kind = LogKind::classify(&name);
            let wanted = match kind {
                LogKind::Active => true,
                LogKind::Archived => include_deleted,
                LogKind::Lock | LogKind::Other => false,
            };
            if !wanted {
                continue;
            }

            let modified = match entry.metadata().and_then(|m| m.modified()) {
                Ok(t) => DateTime::<Utc>::from(t),
                Err(e) => {
                    tracing::warn!("Failed to stat session log {:?}: {}", entry.path(), e);
                    continue;
                }
            };

            files.push(LogFile {
                path: entry.path(),
                name,
                kind,
                modified,
            });
        }
        Ok(files)
    }

    /// Summarize one log file.
    pub fn summarize(&self, path: &Path) -> Result<SessionSummary> {
        summarize_file(path, &self.agent_id)
    }

    /// Summaries of recently modified logs, newest first.
    pub fn list(&self, options: &ListOptions) -> Result<SessionListing> {
        self.list_at(options, Utc::now())
    }

    /// [`list`](Self::list) with an explicit notion of "now".
    pub fn list_at(&self, options: &ListOptions, now: DateTime<Utc>) -> Result<SessionListing> {
        let cutoff = options.cutoff(now);
        let mut listing = SessionListing::default();

        for file in self.log_files(options.include_deleted)? {
            if file.modified < cutoff {
                continue;
            }
            match self.summarize(&file.path) {
                Ok(summary) => listing.sessions.push(summary),
                Err(e) => {
                    tracing::warn!("Skipping session log {:?}: {}", file.path, e);
                    listing.failures.push(ScanFailure {
                        path: file.path,
                        error: e.to_string(),
                    });
                }
            }
        }

        listing.sessions.sort_by(|a, b| {
            b.last_updated
                .cmp(&a.last_updated)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        Ok(listing)
    }

    /// Locate the log for `session_id`: the active file if it exists,
    /// otherwise the most recently modified archived variant.
    pub fn find(&self, session_id: &str) -> Result<PathBuf> {
        if session_id.is_empty()
            || session_id.contains(['/', '\\'])
            || session_id.contains("..")
        {
            return Err(MonitorError::NotFound(session_id.to_string()));
        }

        let active = self.dir.join(format!("{session_id}{PRIMARY_EXTENSION}"));
        if active.is_file() {
            return Ok(active);
        }

        let prefix = format!("{session_id}{PRIMARY_EXTENSION}{ARCHIVE_MARKER}");
        self.log_files(true)?
            .into_iter()
            .filter(|f| f.is_archived() && f.name.starts_with(&prefix))
            .max_by_key(|f| f.modified)
            .map(|f| f.path)
            .ok_or_else(|| MonitorError::NotFound(session_id.to_string()))
    }

    /// Summary of one session, active or archived.
    pub fn get(&self, session_id: &str) -> Result<SessionSummary> {
        let path = self.find(session_id)?;
        self.summarize(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SessionStatus;
    use serde_json::json;
    use std::fs::File;
    use std::time::{Duration as StdDuration, SystemTime};
    use tempfile::TempDir;

    fn write_log(dir: &Path, name: &str, lines: &[serde_json::Value], age: StdDuration) -> PathBuf {
        write_log_at(dir, name, lines, SystemTime::now() - age)
    }

    fn write_log_at(dir: &Path, name: &str, lines: &[serde_json::Value], mtime: SystemTime) -> PathBuf {
        let path = dir.join(name);
        let body: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
        std::fs::write(&path, body.join("\n")).unwrap();
        let file = File::options().write(true).open(&path).unwrap();
        file.set_modified(mtime).unwrap();
        path
    }

    fn usage_line(tokens: u64) -> serde_json::Value {
        json!({"type": "message", "message": {"usage": {"totalTokens": tokens}, "stopReason": "stop"}})
    }

    fn minutes(n: u64) -> StdDuration {
        StdDuration::from_secs(n * 60)
    }

    #[test]
    fn test_lists_recent_logs_newest_first() {
        let tmp = TempDir::new().unwrap();
        let ids: Vec<String> = (0..3).map(|_| uuid::Uuid::new_v4().to_string()).collect();
        write_log(tmp.path(), &format!("{}.jsonl", ids[0]), &[usage_line(1)], minutes(50));
        write_log(tmp.path(), &format!("{}.jsonl", ids[1]), &[usage_line(2)], minutes(5));
        write_log(tmp.path(), &format!("{}.jsonl", ids[2]), &[usage_line(3)], minutes(20));
        write_log(tmp.path(), "old.jsonl", &[usage_line(4)], minutes(120));

        let store = SessionStore::new(tmp.path(), "main");
        let listing = store.list(&ListOptions::new(60, true)).unwrap();

        let got: Vec<&str> = listing.sessions.iter().map(|s| s.session_id.as_str()).collect();
        assert_eq!(got, vec![ids[1].as_str(), ids[2].as_str(), ids[0].as_str()]);
        assert!(listing.failures.is_empty());
    }

    #[test]
    fn test_window_includes_logs_at_cutoff() {
        use chrono::TimeZone;

        let tmp = TempDir::new().unwrap();
        let cutoff = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let at_cutoff = uuid::Uuid::new_v4().to_string();
        let just_before = uuid::Uuid::new_v4().to_string();
        write_log_at(
            tmp.path(),
            &format!("{at_cutoff}.jsonl"),
            &[usage_line(1)],
            SystemTime::from(cutoff),
        );
        write_log_at(
            tmp.path(),
            &format!("{just_before}.jsonl"),
            &[usage_line(1)],
            SystemTime::from(cutoff - Duration::seconds(1)),
        );

        let options = ListOptions::new(60, true);
        let now = cutoff + options.window;
        assert_eq!(options.cutoff(now), cutoff);

        let store = SessionStore::new(tmp.path(), "main");
        let listing = store.list_at(&options, now).unwrap();
        let got: Vec<&str> = listing.sessions.iter().map(|s| s.session_id.as_str()).collect();
        assert_eq!(got, vec![at_cutoff.as_str()]);
        assert_eq!(listing.sessions[0].last_updated, cutoff);
    }

    #[test]
    fn test_archived_inclusion_and_lock_files() {
        let tmp = TempDir::new().unwrap();
        let id = uuid::Uuid::new_v4().to_string();
        write_log(tmp.path(), &format!("{id}.jsonl"), &[usage_line(1)], minutes(1));
        write_log(tmp.path(), &format!("{id}.jsonl.lock"), &[], minutes(1));
        write_log(
            tmp.path(),
            &format!("{id}.jsonl.deleted.2026-01-01T00-00-00.000Z"),
            &[usage_line(9)],
            minutes(1),
        );
        write_log(tmp.path(), "sessions.json", &[json!({})], minutes(1));

        let store = SessionStore::new(tmp.path(), "main");

        let with = store.list(&ListOptions::new(60, true)).unwrap();
        assert_eq!(with.sessions.len(), 2);
        let archived = with.sessions.iter().find(|s| s.is_deleted).unwrap();
        assert_eq!(archived.status, SessionStatus::Archived);
        assert_eq!(archived.session_id, id);

        let without = store.list(&ListOptions::new(60, false)).unwrap();
        assert_eq!(without.sessions.len(), 1);
        assert!(!without.sessions[0].is_deleted);
    }

    #[test]
    fn test_unreadable_log_is_isolated() {
        let tmp = TempDir::new().unwrap();
        for tokens in 1..=3 {
            let id = uuid::Uuid::new_v4();
            write_log(tmp.path(), &format!("{id}.jsonl"), &[usage_line(tokens)], minutes(1));
        }
        // A directory with a log's name opens but cannot be read.
        let bad = tmp.path().join(format!("{}.jsonl", uuid::Uuid::new_v4()));
        std::fs::create_dir(&bad).unwrap();

        let store = SessionStore::new(tmp.path(), "main");
        let listing = store.list(&ListOptions::new(60, true)).unwrap();
        assert_eq!(listing.sessions.len(), 3);
        assert_eq!(listing.failures.len(), 1);
        assert_eq!(listing.failures[0].path, bad);
    }

    #[test]
    fn test_missing_directory_is_store_error() {
        let tmp = TempDir::new().unwrap();
        let store = SessionStore::new(tmp.path().join("nope"), "main");
        let err = store.list(&ListOptions::new(60, true)).unwrap_err();
        assert!(matches!(err, MonitorError::Store { .. }));
    }

    #[test]
    fn test_get_prefers_active_log() {
        let tmp = TempDir::new().unwrap();
        let id = uuid::Uuid::new_v4().to_string();
        write_log(tmp.path(), &format!("{id}.jsonl"), &[usage_line(5)], minutes(1));
        write_log(tmp.path(), &format!("{id}.jsonl.deleted.2026-01-01"), &[usage_line(7)], minutes(1));

        let store = SessionStore::new(tmp.path(), "main");
        let summary = store.get(&id).unwrap();
        assert_eq!(summary.total_tokens, 5);
        assert!(!summary.is_deleted);
    }

    #[test]
    fn test_get_falls_back_to_newest_archive() {
        let tmp = TempDir::new().unwrap();
        let id = uuid::Uuid::new_v4().to_string();
        write_log(tmp.path(), &format!("{id}.jsonl.deleted.2026-01-01"), &[usage_line(7)], minutes(30));
        write_log(tmp.path(), &format!("{id}.jsonl.deleted.2026-02-01"), &[usage_line(8)], minutes(10));

        let store = SessionStore::new(tmp.path(), "main");
        let summary = store.get(&id).unwrap();
        assert_eq!(summary.total_tokens, 8);
        assert_eq!(summary.status, SessionStatus::Archived);
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let store = SessionStore::new(tmp.path(), "main");
        assert!(store.get("missing").unwrap_err().is_not_found());
        assert!(store.get("../etc/passwd").unwrap_err().is_not_found());
        assert!(store.get("").unwrap_err().is_not_found());
    }

    #[test]
    fn test_window_cutoff_saturates() {
        let options = ListOptions::new(u64::MAX, true);
        assert_eq!(options.cutoff(Utc::now()), DateTime::<Utc>::MIN_UTC);
    }
}
