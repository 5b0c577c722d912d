//! Fleet-wide rollups over session summaries.
//!
//! A [`Fleet`] is fed either a directory listing (every log counted from its
//! metadata, then summarized where possible) or a set of summaries already
//! computed by a listing.

use agent_core::error::Result;
use agent_core::scanner::SessionStore;
use agent_core::types::{SessionStatus, SessionSummary};
use chrono::{DateTime, Duration, Local, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cross-session statistics served to the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetStats {
    /// Every log counted, whether or not it could be summarized.
    pub total_sessions: u64,
    /// Logs modified since local midnight.
    pub active_today: u64,
    pub archived: u64,
    /// `total_sessions - archived`.
    pub active_sessions: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
    /// Logs counted but left out of the token and cost totals.
    pub failed: u64,
}

/// Token and cost totals for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelUsage {
    pub model: String,
    pub sessions: u32,
    pub total_tokens: u64,
    pub total_cost: f64,
}

impl ModelUsage {
    fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            sessions: 0,
            total_tokens: 0,
            total_cost: 0.0,
        }
    }
}

/// Accumulates [`FleetStats`] and per-status / per-model breakdowns.
pub struct Fleet {
    stats: FleetStats,
    /// Start of "today" for the active-today count.
    today_start: DateTime<Utc>,
    status_counts: HashMap<SessionStatus, u32>,
    model_usage: HashMap<String, ModelUsage>,
}

impl Fleet {
    pub fn new(today_start: DateTime<Utc>) -> Self {
        Self {
            stats: FleetStats::default(),
            today_start,
            status_counts: HashMap::new(),
            model_usage: HashMap::new(),
        }
    }

    /// A fleet whose "today" starts at the most recent local midnight.
    pub fn starting_today() -> Self {
        Self::new(local_midnight(Local::now()))
    }

    /// Roll up summaries that were already computed.
    pub fn from_summaries(summaries: &[SessionSummary]) -> Self {
        let mut fleet = Self::starting_today();
        fleet.process_summaries(summaries);
        fleet
    }

    /// Roll up every log in the store, active and archived, with no
    /// recency filter.
    pub fn from_store(store: &SessionStore) -> Result<Self> {
        let mut fleet = Self::starting_today();
        fleet.process_store(store)?;
        Ok(fleet)
    }

    /// Count each log from its metadata, then add its summary's totals.
    /// A log whose summary fails stays in the counts but not the totals.
    pub fn process_store(&mut self, store: &SessionStore) -> Result<()> {
        for file in store.log_files(true)? {
            self.count_log(file.modified, file.is_archived());
            match store.summarize(&file.path) {
                Ok(summary) => self.add_totals(&summary),
                Err(e) => {
                    tracing::warn!("Excluding {:?} from fleet totals: {}", file.path, e);
                    self.stats.failed += 1;
                }
            }
        }
        Ok(())
    }

    pub fn process_summary(&mut self, summary: &SessionSummary) {
        self.count_log(summary.last_updated, summary.is_deleted);
        self.add_totals(summary);
    }

    pub fn process_summaries(&mut self, summaries: &[SessionSummary]) {
        for summary in summaries {
            self.process_summary(summary);
        }
    }

    fn count_log(&mut self, modified: DateTime<Utc>, archived: bool) {
        self.stats.total_sessions += 1;
        if modified >= self.today_start {
            self.stats.active_today += 1;
        }
        if archived {
            self.stats.archived += 1;
        }
    }

    fn add_totals(&mut self, summary: &SessionSummary) {
        self.stats.total_tokens = self.stats.total_tokens.saturating_add(summary.total_tokens);
        self.stats.total_cost += summary.total_cost;

        *self.status_counts.entry(summary.status).or_insert(0) += 1;

        let usage = self
            .model_usage
            .entry(summary.model.clone())
            .or_insert_with(|| ModelUsage::new(&summary.model));
        usage.sessions += 1;
        usage.total_tokens = usage.total_tokens.saturating_add(summary.total_tokens);
        usage.total_cost += summary.total_cost;
    }

    /// Current totals, with the derived active-session count filled in.
    pub fn stats(&self) -> FleetStats {
        FleetStats {
            active_sessions: self.stats.total_sessions.saturating_sub(self.stats.archived),
            ..self.stats.clone()
        }
    }

    /// Summarized sessions per status, most common first.
    pub fn status_counts(&self) -> Vec<(SessionStatus, u32)> {
        let mut counts: Vec<_> = self.status_counts.iter().map(|(s, c)| (*s, *c)).collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));
        counts
    }

    /// Models by total tokens, largest first.
    pub fn top_models(&self, limit: usize) -> Vec<ModelUsage> {
        let mut models: Vec<ModelUsage> = self.model_usage.values().cloned().collect();
        models.sort_by(|a, b| {
            b.total_tokens
                .cmp(&a.total_tokens)
                .then_with(|| a.model.cmp(&b.model))
        });
        models.truncate(limit);
        models
    }
}

impl Default for Fleet {
    fn default() -> Self {
        Self::starting_today()
    }
}

/// The most recent local midnight at or before `now`, in UTC.
pub fn local_midnight(now: DateTime<Local>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| naive.and_local_timezone(Local).earliest())
        .map(|t| t.with_timezone(&Utc))
        // Midnight skipped by a DST change.
        .unwrap_or_else(|| {
            (now - Duration::seconds(i64::from(now.num_seconds_from_midnight()))).with_timezone(&Utc)
        })
}

/// Format a token count compactly (e.g. `950`, `12.3k`, `4.5M`).
pub fn format_tokens(tokens: u64) -> String {
    if tokens >= 1_000_000 {
        format!("{:.1}M", tokens as f64 / 1_000_000.0)
    } else if tokens >= 1_000 {
        format!("{:.1}k", tokens as f64 / 1_000.0)
    } else {
        tokens.to_string()
    }
}

/// Format a dollar cost with four decimals.
pub fn format_cost(cost: f64) -> String {
    format!("${:.4}", cost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use std::fs::File;
    use std::path::Path;
    use std::time::{Duration as StdDuration, SystemTime};

    const ID_A: &str = "11111111-1111-4111-8111-111111111111";
    const ID_B: &str = "22222222-2222-4222-8222-222222222222";
    const ID_C: &str = "33333333-3333-4333-8333-333333333333";
    const ID_D: &str = "44444444-4444-4444-8444-444444444444";

    fn summary(id: &str, tokens: u64, cost: f64, status: SessionStatus, updated: DateTime<Utc>) -> SessionSummary {
        SessionSummary {
            session_id: id.into(),
            session_key: id.into(),
            label: "Main".into(),
            model: "model-x".into(),
            total_tokens: tokens,
            total_cost: cost,
            status,
            message_count: 1,
            last_updated: updated,
            created_at: updated,
            is_deleted: status == SessionStatus::Archived,
        }
    }

    fn write_log(dir: &Path, name: &str, tokens: u64, cost: f64, age: StdDuration) {
        let path = dir.join(name);
        let line = json!({
            "type": "message",
            "message": {"model": "model-x", "stopReason": "stop", "usage": {"totalTokens": tokens, "cost": {"total": cost}}}
        });
        std::fs::write(&path, line.to_string()).unwrap();
        let file = File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[test]
    fn test_empty_fleet() {
        let fleet = Fleet::default();
        assert_eq!(fleet.stats(), FleetStats::default());
        assert!(fleet.top_models(5).is_empty());
    }

    #[test]
    fn test_from_summaries() {
        let midnight = Utc.with_ymd_and_hms(2026, 5, 10, 0, 0, 0).unwrap();
        let mut fleet = Fleet::new(midnight);
        fleet.process_summaries(&[
            summary(ID_A, 100, 0.5, SessionStatus::Running, midnight + Duration::hours(3)),
            summary(ID_B, 50, 0.25, SessionStatus::Completed, midnight - Duration::hours(3)),
            summary(ID_C, 10, 0.0, SessionStatus::Archived, midnight),
        ]);

        let stats = fleet.stats();
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.active_today, 2);
        assert_eq!(stats.archived, 1);
        assert_eq!(stats.active_sessions, 2);
        assert_eq!(stats.total_tokens, 160);
        assert!((stats.total_cost - 0.75).abs() < 1e-12);
        assert_eq!(stats.failed, 0);
    }

    #[test]
    fn test_status_counts_and_models() {
        let now = Utc::now();
        let mut fleet = Fleet::new(now);
        let mut other = summary(ID_D, 500, 2.0, SessionStatus::Running, now);
        other.model = "model-y".into();
        fleet.process_summaries(&[
            summary(ID_A, 100, 0.5, SessionStatus::Running, now),
            summary(ID_B, 50, 0.25, SessionStatus::Completed, now),
            other,
        ]);

        let counts = fleet.status_counts();
        assert_eq!(counts[0], (SessionStatus::Running, 2));
        assert_eq!(counts[1], (SessionStatus::Completed, 1));

        let models = fleet.top_models(10);
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].model, "model-y");
        assert_eq!(models[1].model, "model-x");
        assert_eq!(models[1].sessions, 2);
        assert_eq!(models[1].total_tokens, 150);
        assert_eq!(fleet.top_models(1).len(), 1);
    }

    #[test]
    fn test_from_store_isolates_failures() {
        let tmp = tempfile::TempDir::new().unwrap();
        write_log(tmp.path(), &format!("{ID_A}.jsonl"), 10, 0.1, StdDuration::from_secs(0));
        write_log(tmp.path(), &format!("{ID_B}.jsonl"), 20, 0.2, StdDuration::from_secs(3 * 24 * 3600));
        write_log(
            tmp.path(),
            &format!("{ID_C}.jsonl.deleted.2026-01-01T00-00-00.000Z"),
            5,
            0.0,
            StdDuration::from_secs(0),
        );
        write_log(tmp.path(), &format!("{ID_A}.jsonl.lock"), 0, 0.0, StdDuration::from_secs(0));
        std::fs::create_dir(tmp.path().join(format!("{ID_D}.jsonl"))).unwrap();

        let store = SessionStore::new(tmp.path(), "main");
        let fleet = Fleet::from_store(&store).unwrap();
        let stats = fleet.stats();

        assert_eq!(stats.total_sessions, 4);
        assert_eq!(stats.active_today, 3);
        assert_eq!(stats.archived, 1);
        assert_eq!(stats.active_sessions, 3);
        assert_eq!(stats.total_tokens, 35);
        assert!((stats.total_cost - 0.3).abs() < 1e-9);
        assert_eq!(stats.failed, 1);
    }

    #[test]
    fn test_from_store_unreadable_directory() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = SessionStore::new(tmp.path().join("missing"), "main");
        assert!(Fleet::from_store(&store).is_err());
    }

    #[test]
    fn test_local_midnight() {
        let now = Local::now();
        let midnight = local_midnight(now);
        assert!(midnight <= now.with_timezone(&Utc));
        assert!(now.with_timezone(&Utc) - midnight < Duration::hours(25));
    }

    #[test]
    fn test_stats_json_shape() {
        let json = serde_json::to_value(FleetStats::default()).unwrap();
        for key in ["totalSessions", "activeToday", "archived", "activeSessions", "totalTokens", "totalCost"] {
            assert!(json.get(key).is_some(), "missing key {key}");
        }
    }

    #[test]
    fn test_format_tokens() {
        assert_eq!(format_tokens(950), "950");
        assert_eq!(format_tokens(12_345), "12.3k");
        assert_eq!(format_tokens(4_500_000), "4.5M");
        assert_eq!(format_cost(0.5), "$0.5000");
    }
}
