//! ztwatch-state — embedded state store for ztwatch.
//!
//! Backed by [redb](https://docs.rs/redb), persists one `MemberState` per
//! monitored node plus the daily statistics record.
//!
//! # Architecture
//!
//! Values are JSON-serialized into redb's `&[u8]` value columns, so records
//! written by older builds still load when fields are added (missing fields
//! take their serde defaults).
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;

pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use ztwatch_core::{DailyStats, MemberState, ProblematicMember};
