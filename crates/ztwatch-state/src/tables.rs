//! redb table definitions for the ztwatch state store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized domain types).

use redb::TableDefinition;

/// Shape shared by every ztwatch table.
pub type JsonTable = TableDefinition<'static, &'static str, &'static [u8]>;

/// Member health state keyed by `{node_id}`.
pub const MEMBERS: JsonTable = TableDefinition::new("members");

/// Singleton records keyed by name (see `DAILY_STATS_KEY`).
pub const STATS: JsonTable = TableDefinition::new("stats");

/// Key of the `DailyStats` record in `STATS`.
pub const DAILY_STATS_KEY: &str = "daily";
