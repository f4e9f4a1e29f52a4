//! Last-seen anomaly filter.
//!
//! The controller API occasionally reports a last-seen gap far larger than
//! the poll cadence allows. Such jumps are replaced by a linear
//! extrapolation from the previous corrected value.

use ztwatch_core::LAST_SEEN_UNKNOWN;

/// Outcome of filtering one raw "seconds since last seen" value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Correction {
    /// Value to use and persist.
    pub seconds_ago: i64,
    /// The raw value was replaced by the extrapolation.
    pub corrected: bool,
}

/// Filter parameters, fixed for the lifetime of a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnomalyFilter {
    pub poll_interval_secs: i64,
    pub threshold_secs: i64,
}

impl AnomalyFilter {
    pub fn new(poll_interval_secs: i64, threshold_secs: i64) -> Self {
        Self {
            poll_interval_secs,
            threshold_secs,
        }
    }

    /// Correct `raw` against the value persisted by the previous cycle.
    ///
    /// A jump is anomalous when it exceeds the previous value by more than
    /// one poll interval plus the threshold. Without a previous value the
    /// raw value always passes.
    pub fn correct(&self, raw: i64, previous: i64) -> Correction {
        let expected = previous.saturating_add(self.poll_interval_secs);
        if previous != LAST_SEEN_UNKNOWN && raw > expected.saturating_add(self.threshold_secs) {
            Correction {
                seconds_ago: expected,
                corrected: true,
            }
        } else {
            Correction {
                seconds_ago: raw,
                corrected: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> AnomalyFilter {
        AnomalyFilter::new(300, 200)
    }

    #[test]
    fn spike_is_extrapolated() {
        let c = filter().correct(10_000, 100);
        assert_eq!(c.seconds_ago, 400);
        assert!(c.corrected);
    }

    #[test]
    fn extreme_settings_saturate() {
        let wide = AnomalyFilter::new(i64::MAX, i64::MAX);
        let c = wide.correct(i64::MAX, 100);
        assert_eq!(c, Correction { seconds_ago: i64::MAX, corrected: false });

        let c = AnomalyFilter::new(300, i64::MAX).correct(50_000, 100);
        assert!(!c.corrected);
    }

    #[test]
    fn plausible_growth_passes() {
        // 100 + 300 + 200 = 600 is the last accepted value.
        let c = filter().correct(600, 100);
        assert_eq!(c, Correction { seconds_ago: 600, corrected: false });

        let c = filter().correct(601, 100);
        assert_eq!(c, Correction { seconds_ago: 400, corrected: true });
    }

    #[test]
    fn drops_always_pass() {
        let c = filter().correct(5, 4_000);
        assert_eq!(c, Correction { seconds_ago: 5, corrected: false });
    }

    #[test]
    fn unknown_previous_disables_filter() {
        let c = filter().correct(1_000_000, LAST_SEEN_UNKNOWN);
        assert_eq!(c, Correction { seconds_ago: 1_000_000, corrected: false });
    }

    #[test]
    fn repeated_spikes_advance_by_interval() {
        let f = filter();
        let mut previous = 100;
        for expected in [400, 700, 1000] {
            let c = f.correct(50_000, previous);
            assert_eq!(c.seconds_ago, expected);
            previous = c.seconds_ago;
        }
    }
}
