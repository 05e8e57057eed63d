use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use shared::{domain::RunId, protocol::RunRecord};

pub const UNNAMED_SCENARIO: &str = "Unnamed Scenario";
pub const NO_RUNS_YET: &str = "No simulation runs yet.";
pub const NO_RUNS_FOR_FILTER: &str = "No runs found for this filter.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    All,
    Starred,
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "starred" => Ok(Self::Starred),
            other => Err(format!("unknown filter '{other}' (expected all or starred)")),
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Starred => "starred",
        })
    }
}

/// Runs kept by `mode`, newest first. Equal timestamps keep cache order.
pub fn filter_runs(runs: &[RunRecord], mode: FilterMode) -> Vec<RunRecord> {
    let mut kept = runs
        .iter()
        .filter(|run| mode == FilterMode::All || run.starred)
        .cloned()
        .collect::<Vec<_>>();
    kept.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    kept
}

pub fn relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - at).num_seconds();
    if seconds < 60 {
        "Just now".to_string()
    } else if seconds < 3_600 {
        format!("{} minutes ago", seconds / 60)
    } else if seconds < 86_400 {
        format!("{} hours ago", seconds / 3_600)
    } else if seconds < 2_592_000 {
        format!("{} days ago", seconds / 86_400)
    } else {
        at.format("%Y-%m-%d").to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    pub id: RunId,
    pub short_id: String,
    pub title: String,
    pub starred: bool,
    pub timestamp: String,
    pub relative_time: String,
    pub message_count: Option<usize>,
}

impl HistoryRow {
    fn from_run(run: &RunRecord, now: DateTime<Utc>) -> Self {
        let title = run
            .scenario_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(UNNAMED_SCENARIO)
            .to_string();
        Self {
            id: run.id,
            short_id: run.id.short(),
            title,
            starred: run.starred,
            timestamp: run
                .timestamp
                .as_datetime()
                .format("%Y-%m-%d %H:%M:%S UTC")
                .to_string(),
            relative_time: relative_time(run.timestamp.as_datetime(), now),
            message_count: run.log.as_ref().map(Vec::len),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryView {
    pub filter: FilterMode,
    pub rows: Vec<HistoryRow>,
    pub empty_message: Option<&'static str>,
}

pub fn render_history(runs: &[RunRecord], filter: FilterMode, now: DateTime<Utc>) -> HistoryView {
    if runs.is_empty() {
        return HistoryView {
            filter,
            rows: Vec::new(),
            empty_message: Some(NO_RUNS_YET),
        };
    }
    let rows = filter_runs(runs, filter)
        .iter()
        .map(|run| HistoryRow::from_run(run, now))
        .collect::<Vec<_>>();
    let empty_message = rows.is_empty().then_some(NO_RUNS_FOR_FILTER);
    HistoryView {
        filter,
        rows,
        empty_message,
    }
}

#[cfg(test)]
#[path = "tests/history_tests.rs"]
mod tests;
