//! ztwatch-health — member health-state machine for ztwatch.
//!
//! Decides, per member and per poll cycle, which reports to emit and
//! which state to persist. Alerts are edge-triggered: an outdated
//! version is reported once until it is fixed, and an offline member is
//! reported once per escalation tier until it comes back.
//!
//! # Architecture
//!
//! ```text
//! PollMonitor (background loop, one cycle per poll interval)
//!   ├── daily rollover → daily report, counters reset
//!   ├── MemberSource → latest version + MemberBatch
//!   ├── MemberEvaluator (per monitored member)
//!   │   ├── check_version()        → outdated / updated
//!   │   ├── AnomalyFilter          → corrected seconds since last seen
//!   │   ├── ThresholdLadder        → Online / Escalate / Hold
//!   │   └── ReachabilityProbe      → annotation on escalation only
//!   ├── StateStore (MemberState, DailyStats)
//!   └── ReportSink ← one findings message per cycle
//! ```
//!
//! # Anomaly correction
//!
//! The controller sometimes reports a last-seen gap that grew by far more
//! than one poll interval since the previous cycle. Such values are
//! replaced by `previous + poll_interval` so a controller hiccup cannot
//! fire the highest offline tier in one step.

pub mod anomaly;
pub mod escalation;
pub mod evaluator;
pub mod monitor;
pub mod probe;
pub mod version;

pub use anomaly::{AnomalyFilter, Correction};
pub use escalation::{Escalation, ThresholdLadder};
pub use evaluator::{Evaluation, EvaluationInput, HealthPolicy, MemberEvaluator};
pub use monitor::{CycleSummary, FetchFailure, MemberBatch, MemberSource, PollMonitor, ReportSink};
pub use probe::{PingProbe, ProbeOutcome, ReachabilityProbe};
pub use version::check_version;
