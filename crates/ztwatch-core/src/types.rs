//! Domain types shared by the state store, the health evaluator and the
//! API collaborators.
//!
//! `MemberState` is the only record that survives between poll cycles.
//! Everything else here is built fresh every cycle.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Unique identifier for a ZeroTier member (10 hex digits).
pub type NodeId = String;

/// Sentinel reported by the API collaborator when a client version is unknown.
pub const UNKNOWN_VERSION: &str = "N/A";

/// `last_seen_seconds_ago` value meaning "never observed online".
pub const LAST_SEEN_UNKNOWN: i64 = -1;

// ── Member state ──────────────────────────────────────────────────

/// Persisted health state of a single monitored member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberState {
    pub node_id: NodeId,
    /// Display name, overwritten with the latest value every cycle.
    pub name: String,
    /// An "outdated version" alert is outstanding.
    #[serde(default)]
    pub version_alert_sent: bool,
    /// Tier level of the last offline alert; 0 when none is active.
    #[serde(default)]
    pub offline_alert_level: u8,
    /// Corrected seconds since last seen, or `LAST_SEEN_UNKNOWN`.
    #[serde(default = "last_seen_unknown")]
    pub last_seen_seconds_ago: i64,
    /// Problem reports raised in the current reporting period.
    #[serde(default)]
    pub problems_count: u32,
}

fn last_seen_unknown() -> i64 {
    LAST_SEEN_UNKNOWN
}

impl MemberState {
    /// Fresh state for a member seen for the first time.
    pub fn new(node_id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            name: name.into(),
            version_alert_sent: false,
            offline_alert_level: 0,
            last_seen_seconds_ago: LAST_SEEN_UNKNOWN,
            problems_count: 0,
        }
    }
}

// ── Member facts ──────────────────────────────────────────────────

/// What the upstream API reported about a member in this poll cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct MemberFacts {
    pub node_id: NodeId,
    pub name: Option<String>,
    /// Raw client version as reported, possibly prefixed with `v`.
    pub client_version: Option<String>,
    /// Last-seen timestamp in epoch milliseconds.
    pub last_seen_ms: Option<i64>,
    /// Managed IP addresses assigned to the member.
    pub ip_assignments: Vec<String>,
}

impl MemberFacts {
    /// Name to show in reports; falls back to the node id.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.node_id,
        }
    }

    /// Normalized client version, `None` when unknown.
    pub fn reported_version(&self) -> Option<String> {
        self.client_version.as_deref().and_then(normalize_version)
    }
}

/// Strip a leading `v` and map empty or sentinel values to `None`.
pub fn normalize_version(raw: &str) -> Option<String> {
    let version = raw.trim().trim_start_matches('v');
    if version.is_empty() || version == UNKNOWN_VERSION {
        None
    } else {
        Some(version.to_string())
    }
}

// ── Reports ───────────────────────────────────────────────────────

/// Whether a report announces a new problem or clears one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Problem,
    Recovery,
}

/// One human-readable line destined for the report sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub kind: ReportKind,
    pub text: String,
}

impl Report {
    pub fn problem(text: impl Into<String>) -> Self {
        Self {
            kind: ReportKind::Problem,
            text: text.into(),
        }
    }

    pub fn recovery(text: impl Into<String>) -> Self {
        Self {
            kind: ReportKind::Recovery,
            text: text.into(),
        }
    }

    pub fn is_problem(&self) -> bool {
        self.kind == ReportKind::Problem
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

// ── Daily statistics ──────────────────────────────────────────────

/// Counters for the current reporting day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyStats {
    /// Day the counters belong to (local date).
    pub report_date: NaiveDate,
    pub checks_today: u32,
    pub problems_today: u32,
    /// Local time of the last poll cycle.
    pub last_check_at: Option<NaiveDateTime>,
    /// Last latest-version value fetched successfully.
    pub latest_version: Option<String>,
}

impl DailyStats {
    pub fn new(report_date: NaiveDate) -> Self {
        Self {
            report_date,
            checks_today: 0,
            problems_today: 0,
            last_check_at: None,
            latest_version: None,
        }
    }

    /// Zero the counters and move to a new reporting day.
    pub fn roll_over(&mut self, today: NaiveDate) {
        self.report_date = today;
        self.checks_today = 0;
        self.problems_today = 0;
    }
}

/// Member with problems in the current period, for the daily report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblematicMember {
    pub name: String,
    pub problems_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_has_defaults() {
        let state = MemberState::new("abcdef0123", "gateway");
        assert!(!state.version_alert_sent);
        assert_eq!(state.offline_alert_level, 0);
        assert_eq!(state.last_seen_seconds_ago, LAST_SEEN_UNKNOWN);
        assert_eq!(state.problems_count, 0);
    }

    #[test]
    fn state_missing_fields_deserialize_with_defaults() {
        let json = r#"{"node_id":"abcdef0123","name":"gateway"}"#;
        let state: MemberState = serde_json::from_str(json).unwrap();
        assert_eq!(state, MemberState::new("abcdef0123", "gateway"));
    }

    #[test]
    fn display_name_falls_back_to_node_id() {
        let mut facts = MemberFacts {
            node_id: "abcdef0123".to_string(),
            ..Default::default()
        };
        assert_eq!(facts.display_name(), "abcdef0123");

        facts.name = Some("  ".to_string());
        assert_eq!(facts.display_name(), "abcdef0123");

        facts.name = Some("laptop".to_string());
        assert_eq!(facts.display_name(), "laptop");
    }

    #[test]
    fn version_normalization() {
        assert_eq!(normalize_version("v1.14.2"), Some("1.14.2".to_string()));
        assert_eq!(normalize_version("1.12.0"), Some("1.12.0".to_string()));
        assert_eq!(normalize_version("N/A"), None);
        assert_eq!(normalize_version(""), None);
    }

    #[test]
    fn stats_roll_over_keeps_latest_version() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let mut stats = DailyStats::new(day);
        stats.checks_today = 12;
        stats.problems_today = 3;
        stats.latest_version = Some("1.14.2".to_string());

        let next = day.succ_opt().unwrap();
        stats.roll_over(next);
        assert_eq!(stats.report_date, next);
        assert_eq!(stats.checks_today, 0);
        assert_eq!(stats.problems_today, 0);
        assert_eq!(stats.latest_version.as_deref(), Some("1.14.2"));
    }
}
