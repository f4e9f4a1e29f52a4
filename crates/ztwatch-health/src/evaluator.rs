//! Member evaluator — one decision per member per poll cycle.
//!
//! Combines the version check, the anomaly filter and the escalation
//! ladder into a new `MemberState` plus the ordered reports for that
//! member. Performs no I/O apart from the injected reachability probe.

use tracing::{debug, info, warn};

use ztwatch_core::{
    ConfigError, MemberFacts, MemberState, Messages, MonitorConfig, NodeId, Report,
};

use crate::anomaly::AnomalyFilter;
use crate::escalation::{Escalation, ThresholdLadder};
use crate::probe::ReachabilityProbe;
use crate::version::check_version;

/// Thresholds the evaluator works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthPolicy {
    pub anomaly: AnomalyFilter,
    pub ladder: ThresholdLadder,
}

impl HealthPolicy {
    pub fn from_config(config: &MonitorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            anomaly: AnomalyFilter::new(
                i64::try_from(config.poll_interval_secs).unwrap_or(i64::MAX),
                config.anomaly_threshold_secs,
            ),
            ladder: ThresholdLadder::new(config.offline_tiers.clone())?,
        })
    }
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            anomaly: AnomalyFilter::new(300, 200),
            ladder: ThresholdLadder::default(),
        }
    }
}

/// Facts about one member for one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationInput {
    pub node_id: NodeId,
    pub name: String,
    /// Normalized client version; `None` when unknown.
    pub reported_version: Option<String>,
    pub latest_version: String,
    /// Last-seen timestamp (epoch ms). `None` or 0 means never seen.
    pub last_seen_ms: Option<i64>,
    pub now_ms: i64,
    pub addresses: Vec<String>,
}

impl EvaluationInput {
    pub fn from_facts(facts: &MemberFacts, latest_version: &str, now_ms: i64) -> Self {
        Self {
            node_id: facts.node_id.clone(),
            name: facts.display_name().to_string(),
            reported_version: facts.reported_version(),
            latest_version: latest_version.to_string(),
            last_seen_ms: facts.last_seen_ms,
            now_ms,
            addresses: facts.ip_assignments.clone(),
        }
    }
}

/// New state and ordered reports (version first, then online status).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub state: MemberState,
    pub reports: Vec<Report>,
}

impl Evaluation {
    pub fn problem_count(&self) -> u32 {
        self.reports.iter().filter(|r| r.is_problem()).count() as u32
    }
}

/// Result of the online-status half of an evaluation.
struct OnlineStatus {
    report: Option<Report>,
    level: u8,
    seconds_ago: i64,
    corrected: bool,
}

pub struct MemberEvaluator {
    policy: HealthPolicy,
    messages: Messages,
}

impl MemberEvaluator {
    pub fn new(policy: HealthPolicy, messages: Messages) -> Self {
        Self { policy, messages }
    }

    pub fn policy(&self) -> &HealthPolicy {
        &self.policy
    }

    /// Evaluate one member. Never fails: missing data maps to sentinel
    /// branches, probe failures to the "unreachable" annotation.
    pub async fn evaluate<P: ReachabilityProbe>(
        &self,
        input: &EvaluationInput,
        previous: Option<&MemberState>,
        probe: &P,
    ) -> Evaluation {
        let mut state = previous
            .cloned()
            .unwrap_or_else(|| MemberState::new(input.node_id.clone(), input.name.clone()));
        state.name = input.name.clone();

        let mut reports = Vec::new();

        let (version_report, alert_sent) = check_version(
            &self.messages,
            &input.name,
            input.reported_version.as_deref(),
            &input.latest_version,
            state.version_alert_sent,
        );
        reports.extend(version_report);
        state.version_alert_sent = alert_sent;

        let online = self
            .check_online(input, &state, previous.is_none(), probe)
            .await;
        reports.extend(online.report);
        state.offline_alert_level = online.level;
        state.last_seen_seconds_ago = online.seconds_ago;

        let problems = reports.iter().filter(|r| r.is_problem()).count() as u32;
        state.problems_count = state.problems_count.saturating_add(problems);

        // An unknown version logs as OLD, like any mismatch.
        let version_status = match input.reported_version.as_deref() {
            Some(v) if v == input.latest_version => "OK",
            _ => "OLD",
        };
        info!(
            node_id = %input.node_id,
            name = %input.name,
            version = input.reported_version.as_deref().unwrap_or("N/A"),
            status = version_status,
            last_seen_secs = online.seconds_ago,
            calculated = online.corrected,
            level = state.offline_alert_level,
            "check result"
        );

        Evaluation { state, reports }
    }

    async fn check_online<P: ReachabilityProbe>(
        &self,
        input: &EvaluationInput,
        current: &MemberState,
        first_seen: bool,
        probe: &P,
    ) -> OnlineStatus {
        let Some(last_seen_ms) = input.last_seen_ms.filter(|ts| *ts > 0) else {
            let report = first_seen.then(|| Report::problem(self.messages.never_online(&input.name)));
            return OnlineStatus {
                report,
                level: current.offline_alert_level,
                seconds_ago: current.last_seen_seconds_ago,
                corrected: false,
            };
        };

        let raw = (input.now_ms - last_seen_ms).abs() / 1000;
        let correction = self
            .policy
            .anomaly
            .correct(raw, current.last_seen_seconds_ago);
        if correction.corrected {
            warn!(
                node_id = %input.node_id,
                name = %input.name,
                api_secs = raw,
                previous_secs = current.last_seen_seconds_ago,
                calculated_secs = correction.seconds_ago,
                "anomalous last-seen jump, using calculated value"
            );
        }
        let seconds_ago = correction.seconds_ago;
        let previous_level = current.offline_alert_level;

        let decision = self.policy.ladder.evaluate(seconds_ago, previous_level);
        let report = match &decision {
            Escalation::Online { recovered: true } => {
                info!(node_id = %input.node_id, name = %input.name, "member back online");
                Some(Report::recovery(self.messages.back_online(&input.name)))
            }
            Escalation::Online { recovered: false } => None,
            Escalation::Escalate(tier) => {
                let mut text = self.messages.offline(&input.name, tier.level, tier.seconds);
                text.push_str(&self.annotate(input, probe).await);
                Some(Report::problem(text))
            }
            Escalation::Hold(tier) => {
                debug!(node_id = %input.node_id, tier = %tier.key, level = previous_level, "already alerted at this tier");
                None
            }
        };

        OnlineStatus {
            report,
            level: decision.new_level(previous_level),
            seconds_ago,
            corrected: correction.corrected,
        }
    }

    /// Probe the member's first address and describe the outcome.
    async fn annotate<P: ReachabilityProbe>(&self, input: &EvaluationInput, probe: &P) -> String {
        let Some(address) = input.addresses.first() else {
            info!(node_id = %input.node_id, name = %input.name, "no address available for probe");
            return String::new();
        };
        info!(node_id = %input.node_id, name = %input.name, %address, "member offline, probing");
        if probe.probe(address).await.is_reachable() {
            self.messages.probe_reachable(address)
        } else {
            self.messages.probe_unreachable(address)
        }
    }
}
