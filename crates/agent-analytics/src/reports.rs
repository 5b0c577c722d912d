//! Markdown and plain-text reports over a fleet rollup.

use crate::aggregations::{format_cost, format_tokens, Fleet};
use agent_core::types::SessionSummary;

/// Sessions shown in the markdown session table.
const MAX_REPORT_SESSIONS: usize = 50;

/// Report generator for creating markdown summaries.
pub struct ReportGenerator;

impl ReportGenerator {
    /// Full markdown report: overview, status and model breakdowns, and the
    /// most recent sessions.
    pub fn markdown(fleet: &Fleet, sessions: &[SessionSummary]) -> String {
        let stats = fleet.stats();
        let mut report = String::new();

        report.push_str(&format!(
            "# Session Report\n\n**Generated {}**\n\n",
            chrono::Local::now().format("%B %d, %Y %H:%M")
        ));

        report.push_str("## Overview\n\n");
        report.push_str(&format!("- **Sessions:** {}\n", stats.total_sessions));
        report.push_str(&format!("- **Active:** {}\n", stats.active_sessions));
        report.push_str(&format!("- **Archived:** {}\n", stats.archived));
        report.push_str(&format!("- **Active Today:** {}\n", stats.active_today));
        report.push_str(&format!(
            "- **Tokens:** {}\n",
            format_tokens(stats.total_tokens)
        ));
        report.push_str(&format!("- **Cost:** {}\n", format_cost(stats.total_cost)));
        if stats.failed > 0 {
            report.push_str(&format!("- **Unreadable Logs:** {}\n", stats.failed));
        }
        report.push('\n');

        let statuses = fleet.status_counts();
        if !statuses.is_empty() {
            report.push_str("## Status\n\n");
            report.push_str("| Status | Sessions |\n");
            report.push_str("|--------|----------|\n");
            for (status, count) in &statuses {
                report.push_str(&format!("| {} | {} |\n", status, count));
            }
            report.push('\n');
        }

        let models = fleet.top_models(10);
        if !models.is_empty() {
            report.push_str("## Models\n\n");
            report.push_str("| Model | Sessions | Tokens | Cost |\n");
            report.push_str("|-------|----------|--------|------|\n");
            for usage in &models {
                report.push_str(&format!(
                    "| `{}` | {} | {} | {} |\n",
                    usage.model,
                    usage.sessions,
                    format_tokens(usage.total_tokens),
                    format_cost(usage.total_cost),
                ));
            }
            report.push('\n');
        }

        if !sessions.is_empty() {
            report.push_str("## Recent Sessions\n\n");
            report.push_str("| Session | Label | Model | Status | Messages | Tokens | Updated |\n");
            report.push_str("|---------|-------|-------|--------|----------|--------|---------|\n");
            for s in sessions.iter().take(MAX_REPORT_SESSIONS) {
                report.push_str(&format!(
                    "| {} | {} | `{}` | {} | {} | {} | {} |\n",
                    short_id(&s.session_id),
                    s.label.replace('|', "\\|"),
                    s.model,
                    s.status,
                    s.message_count,
                    format_tokens(s.total_tokens),
                    s.last_updated
                        .with_timezone(&chrono::Local)
                        .format("%Y-%m-%d %H:%M"),
                ));
            }
            if sessions.len() > MAX_REPORT_SESSIONS {
                report.push_str(&format!(
                    "\n_{} more not shown._\n",
                    sessions.len() - MAX_REPORT_SESSIONS
                ));
            }
            report.push('\n');
        }

        report
    }

    /// Compact summary for the terminal.
    pub fn text_summary(fleet: &Fleet) -> String {
        let stats = fleet.stats();
        let mut output = String::new();

        if stats.total_sessions == 0 {
            output.push_str("  No sessions found (0 sessions)\n");
            return output;
        }

        output.push_str(&format!(
            "  Sessions: {} total, {} active, {} archived\n",
            stats.total_sessions, stats.active_sessions, stats.archived
        ));
        output.push_str(&format!("  Today: {} updated\n", stats.active_today));
        output.push_str(&format!(
            "  Usage: {} tokens, {}\n",
            format_tokens(stats.total_tokens),
            format_cost(stats.total_cost)
        ));

        let statuses = fleet.status_counts();
        if !statuses.is_empty() {
            output.push_str("  Status:");
            for (status, count) in &statuses {
                output.push_str(&format!(" {}({})", status, count));
            }
            output.push('\n');
        }

        let top = fleet.top_models(3);
        if !top.is_empty() {
            output.push_str("  Top models:");
            for usage in &top {
                output.push_str(&format!(" {}({})", usage.model, format_tokens(usage.total_tokens)));
            }
            output.push('\n');
        }

        if stats.failed > 0 {
            output.push_str(&format!("  Unreadable logs: {}\n", stats.failed));
        }

        output
    }
}

/// First block of a UUID-style id.
fn short_id(id: &str) -> &str {
    id.split('-').next().unwrap_or(id)
}
