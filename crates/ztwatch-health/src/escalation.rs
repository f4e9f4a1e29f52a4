//! Offline escalation ladder.

use ztwatch_core::config::validate_tiers;
use ztwatch_core::{ConfigError, OfflineTier};

/// Decision for one member in one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Escalation {
    /// At or below the online threshold. `recovered` is set when an
    /// offline alert was active and must be cleared.
    Online { recovered: bool },
    /// A higher tier was crossed; alert at this tier.
    Escalate(OfflineTier),
    /// Still offline but already alerted at or above the triggered tier.
    Hold(OfflineTier),
}

impl Escalation {
    /// Alert level to persist after this decision.
    pub fn new_level(&self, previous_level: u8) -> u8 {
        match self {
            Escalation::Online { .. } => 0,
            Escalation::Escalate(tier) => tier.level,
            Escalation::Hold(_) => previous_level,
        }
    }

    pub fn triggered_tier(&self) -> Option<&OfflineTier> {
        match self {
            Escalation::Online { .. } => None,
            Escalation::Escalate(tier) | Escalation::Hold(tier) => Some(tier),
        }
    }
}

/// Ordered tiers, lowest boundary first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdLadder {
    tiers: Vec<OfflineTier>,
}

impl ThresholdLadder {
    /// Build a ladder; tiers may be given in any order but must be strictly
    /// increasing in both boundary and level once sorted.
    pub fn new(mut tiers: Vec<OfflineTier>) -> Result<Self, ConfigError> {
        tiers.sort_by_key(|t| t.seconds);
        validate_tiers(&tiers)?;
        Ok(Self { tiers })
    }

    /// Seconds at or below which a member counts as online.
    pub fn online_threshold(&self) -> i64 {
        self.tiers[0].seconds
    }

    pub fn tiers(&self) -> &[OfflineTier] {
        &self.tiers
    }

    /// Highest tier whose boundary `seconds_ago` exceeds.
    ///
    /// Scanning from the top lets a long-unseen member land on its real
    /// tier in one step.
    pub fn triggered(&self, seconds_ago: i64) -> Option<&OfflineTier> {
        self.tiers.iter().rev().find(|t| seconds_ago > t.seconds)
    }

    pub fn evaluate(&self, seconds_ago: i64, previous_level: u8) -> Escalation {
        if seconds_ago <= self.online_threshold() {
            return Escalation::Online {
                recovered: previous_level > 0,
            };
        }
        match self.triggered(seconds_ago) {
            Some(tier) if tier.level > previous_level => Escalation::Escalate(tier.clone()),
            Some(tier) => Escalation::Hold(tier.clone()),
            // Unreachable with a validated ladder: above the lowest boundary
            // always triggers the lowest tier.
            None => Escalation::Online {
                recovered: previous_level > 0,
            },
        }
    }
}

impl Default for ThresholdLadder {
    fn default() -> Self {
        Self {
            tiers: vec![
                OfflineTier::new("5m", 300, 1),
                OfflineTier::new("15m", 900, 2),
                OfflineTier::new("1h", 3600, 3),
            ],
        }
    }
}
