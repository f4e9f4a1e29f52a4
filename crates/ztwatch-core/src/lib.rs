//! ztwatch-core — shared domain types for the ztwatch monitor.
//!
//! Holds the persisted `MemberState`, the per-cycle `MemberFacts` handed
//! over by the API collaborator, the `ztwatch.toml` configuration, the
//! injectable `Clock`, and the localized report catalog.

pub mod clock;
pub mod config;
pub mod messages;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, MonitorConfig, OfflineTier};
pub use messages::{Language, Messages};
pub use types::*;
