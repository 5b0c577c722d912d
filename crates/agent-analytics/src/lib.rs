//! Fleet rollups and reporting for agent-monitor.
//!
//! Combines per-session summaries into cross-session statistics (totals,
//! today's activity, archived counts, per-model usage) and renders them as
//! markdown or terminal text.

pub mod aggregations;
pub mod reports;

pub use aggregations::{Fleet, FleetStats, ModelUsage};
pub use reports::ReportGenerator;
