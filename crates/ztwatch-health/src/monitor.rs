//! Poll monitor — the background loop that drives member evaluation.
//!
//! Each cycle rolls the daily statistics over when the local date
//! changes, resolves the latest client version, fetches members from
//! every configured network, evaluates the monitored ones, persists the
//! new states and delivers one findings message.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use ztwatch_core::{
    Clock, ConfigError, DailyStats, MemberFacts, Messages, MonitorConfig, Report,
};
use ztwatch_state::StateStore;

use crate::evaluator::{EvaluationInput, HealthPolicy, MemberEvaluator};
use crate::probe::ReachabilityProbe;

// ── Collaborators ──────────────────────────────────────────────────

/// A fetch that still failed after every retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    /// Network id, or the release feed for the version lookup.
    pub target: String,
    pub attempts: u32,
    pub error: String,
}

/// Members from every configured network plus the networks that failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberBatch {
    pub members: Vec<MemberFacts>,
    pub failures: Vec<FetchFailure>,
}

/// Upstream controller API.
pub trait MemberSource: Send + Sync {
    fn fetch_members(&self) -> impl Future<Output = MemberBatch> + Send;

    /// Latest released client version with any leading `v` stripped.
    fn latest_version(&self) -> impl Future<Output = Result<String, FetchFailure>> + Send;
}

/// Where report text is delivered. Delivery is best effort.
pub trait ReportSink: Send + Sync {
    fn send(&self, text: &str) -> impl Future<Output = ()> + Send;
}

// ── Monitor ────────────────────────────────────────────────────────

/// Outcome of one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Monitored members evaluated this cycle.
    pub evaluated: usize,
    pub reports: Vec<Report>,
    /// No members were fetched, nothing was evaluated.
    pub skipped: bool,
    /// A daily report was sent before the cycle ran.
    pub rolled_over: bool,
}

pub struct PollMonitor<S, K, P> {
    config: MonitorConfig,
    store: StateStore,
    source: S,
    sink: K,
    probe: P,
    clock: Arc<dyn Clock>,
    evaluator: MemberEvaluator,
    messages: Messages,
}

impl<S, K, P> PollMonitor<S, K, P>
where
    S: MemberSource,
    K: ReportSink,
    P: ReachabilityProbe,
{
    pub fn new(
        config: MonitorConfig,
        store: StateStore,
        source: S,
        sink: K,
        probe: P,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let messages = Messages::new(config.language);
        let evaluator = MemberEvaluator::new(HealthPolicy::from_config(&config)?, messages);
        Ok(Self {
            config,
            store,
            source,
            sink,
            probe,
            clock,
            evaluator,
            messages,
        })
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Forget stored last-seen values and announce the start.
    pub async fn startup(&self) {
        if let Err(e) = self.store.reset_last_seen() {
            error!(error = %e, "failed to reset stored last-seen values");
        }
        self.sink
            .send(&self.messages.startup(env!("CARGO_PKG_VERSION")))
            .await;
        info!(
            members = self.config.member_ids.len(),
            networks = self.config.networks.len(),
            interval_secs = self.config.poll_interval_secs,
            "monitor started"
        );
    }

    /// Run cycles until `shutdown` flips, then send the shutdown notice.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        self.startup().await;
        let interval = Duration::from_secs(self.config.poll_interval_secs);

        loop {
            if let Err(e) = self.run_cycle().await {
                error!(error = %e, "poll cycle failed");
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.changed() => {
                    debug!("poll loop shutting down");
                    break;
                }
            }
        }

        self.sink.send(&self.messages.shutdown()).await;
        info!("monitor stopped");
    }

    /// One full poll cycle.
    pub async fn run_cycle(&self) -> anyhow::Result<CycleSummary> {
        let mut stats = self.store.load_or_init_stats(self.clock.today())?;
        let rolled_over = self.handle_daily_rollover(&mut stats).await?;

        stats.checks_today += 1;
        stats.last_check_at = Some(self.clock.local_now());

        let latest = self.resolve_latest_version(&mut stats).await;

        let batch = self.source.fetch_members().await;
        for failure in &batch.failures {
            self.sink
                .send(&self.messages.members_fetch_failed(
                    &failure.target,
                    failure.attempts,
                    &failure.error,
                ))
                .await;
        }

        if batch.members.is_empty() {
            warn!("no members fetched, skipping cycle");
            self.store.put_stats(&stats)?;
            return Ok(CycleSummary {
                skipped: true,
                rolled_over,
                ..CycleSummary::default()
            });
        }

        let now_ms = self.clock.now_ms();
        let mut seen = HashSet::new();
        let mut reports = Vec::new();
        let mut evaluated = 0;

        for facts in &batch.members {
            if !self.config.is_monitored(&facts.node_id) || !seen.insert(facts.node_id.as_str()) {
                continue;
            }

            let previous = match self.store.get_member(&facts.node_id) {
                Ok(previous) => previous,
                Err(e) => {
                    error!(node_id = %facts.node_id, error = %e, "failed to load member state, skipping");
                    continue;
                }
            };

            let input = EvaluationInput::from_facts(facts, &latest, now_ms);
            let evaluation = self
                .evaluator
                .evaluate(&input, previous.as_ref(), &self.probe)
                .await;
            evaluated += 1;

            if let Err(e) = self.store.put_member(&evaluation.state) {
                error!(node_id = %facts.node_id, error = %e, "failed to persist member state");
            }
            stats.problems_today += evaluation.problem_count();
            reports.extend(evaluation.reports);
        }

        self.store.put_stats(&stats)?;

        if reports.is_empty() {
            info!(evaluated, "no new problems");
        } else {
            let lines: Vec<String> = reports.iter().map(|r| r.text.clone()).collect();
            self.sink.send(&self.messages.findings(&lines)).await;
            info!(evaluated, reports = reports.len(), "findings sent");
        }

        Ok(CycleSummary {
            evaluated,
            reports,
            skipped: false,
            rolled_over,
        })
    }

    /// Send the report for the finished day and start a new one.
    async fn handle_daily_rollover(&self, stats: &mut DailyStats) -> anyhow::Result<bool> {
        let today = self.clock.today();
        if today <= stats.report_date {
            return Ok(false);
        }

        // Store failures are logged; the report date advances regardless.
        let problematic = self.store.problematic_members().unwrap_or_else(|e| {
            error!(error = %e, "failed to list problematic members");
            Vec::new()
        });
        self.sink
            .send(&self.messages.daily_report(stats, &problematic))
            .await;
        info!(
            date = %stats.report_date,
            checks = stats.checks_today,
            problems = stats.problems_today,
            "daily report sent"
        );

        if let Err(e) = self.store.reset_problem_counts() {
            error!(error = %e, "failed to reset daily problem counters");
        }
        stats.roll_over(today);
        self.store.put_stats(stats)?;
        Ok(true)
    }

    /// Fetched version, else the last one fetched, else the configured fallback.
    async fn resolve_latest_version(&self, stats: &mut DailyStats) -> String {
        match self.source.latest_version().await {
            Ok(version) => {
                debug!(%version, "latest client version");
                stats.latest_version = Some(version.clone());
                version
            }
            Err(failure) => {
                self.sink
                    .send(&self.messages.latest_version_fetch_failed(
                        failure.attempts,
                        &failure.error,
                    ))
                    .await;
                let version = stats
                    .latest_version
                    .clone()
                    .unwrap_or_else(|| self.config.fallback_version.clone());
                warn!(%version, error = %failure.error, "using stored latest version");
                version
            }
        }
    }
}
