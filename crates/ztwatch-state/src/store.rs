//! StateStore — redb-backed persistence for member health state.
//!
//! Provides typed get/put operations over member states and the daily
//! statistics record. The store supports both on-disk and in-memory
//! backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use redb::{Database, ReadableDatabase, ReadableTable};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use ztwatch_core::{DailyStats, LAST_SEEN_UNKNOWN, MemberState, ProblematicMember};

use crate::error::{StateError, StateResult};
use crate::tables::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(MEMBERS).map_err(map_err!(Table))?;
        txn.open_table(STATS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    fn put_json<T: Serialize>(
        &self,
        def: JsonTable,
        key: &str,
        value: &T,
    ) -> StateResult<()> {
        let bytes = serde_json::to_vec(value).map_err(|e| StateError::encode(key, e))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(def).map_err(map_err!(Table))?;
            table
                .insert(key, bytes.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        def: JsonTable,
        key: &str,
    ) -> StateResult<Option<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(def).map_err(map_err!(Table))?;
        match table.get(key).map_err(map_err!(Read))? {
            Some(guard) => {
                let value =
                    serde_json::from_slice(guard.value()).map_err(|e| StateError::decode(key, e))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Apply `update` to every member record in a single write transaction.
    /// Returns how many records were changed. Undecodable records are left
    /// as they are.
    fn update_members<F>(&self, mut update: F) -> StateResult<u32>
    where
        F: FnMut(&mut MemberState) -> bool,
    {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let changed = {
            let mut table = txn.open_table(MEMBERS).map_err(map_err!(Table))?;
            let mut pending = Vec::new();
            for entry in table.iter().map_err(map_err!(Read))? {
                let (key, value) = entry.map_err(map_err!(Read))?;
                let key = key.value().to_string();
                let mut state: MemberState = match serde_json::from_slice(value.value()) {
                    Ok(state) => state,
                    Err(e) => {
                        warn!(%key, error = %e, "skipping corrupt member record");
                        continue;
                    }
                };
                if update(&mut state) {
                    let bytes =
                        serde_json::to_vec(&state).map_err(|e| StateError::encode(&key, e))?;
                    pending.push((key, bytes));
                }
            }
            for (key, bytes) in &pending {
                table
                    .insert(key.as_str(), bytes.as_slice())
                    .map_err(map_err!(Write))?;
            }
            pending.len() as u32
        };
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(changed)
    }

    // ── Members ────────────────────────────────────────────────────

    /// Insert or replace the state of one member.
    pub fn put_member(&self, state: &MemberState) -> StateResult<()> {
        self.put_json(MEMBERS, &state.node_id, state)?;
        debug!(node_id = %state.node_id, "member state stored");
        Ok(())
    }

    /// Get the stored state of a member, if it was ever evaluated.
    pub fn get_member(&self, node_id: &str) -> StateResult<Option<MemberState>> {
        self.get_json(MEMBERS, node_id)
    }

    /// List all stored member states that decode.
    pub fn list_members(&self) -> StateResult<Vec<MemberState>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(MEMBERS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            match serde_json::from_slice::<MemberState>(value.value()) {
                Ok(state) => results.push(state),
                Err(e) => warn!(key = key.value(), error = %e, "skipping corrupt member record"),
            }
        }
        Ok(results)
    }

    /// Forget every stored last-seen value.
    ///
    /// Called on startup: the gap since the previous run would otherwise
    /// look like an anomalous jump to the first cycle.
    pub fn reset_last_seen(&self) -> StateResult<u32> {
        let changed = self.update_members(|state| {
            let stale = state.last_seen_seconds_ago != LAST_SEEN_UNKNOWN;
            state.last_seen_seconds_ago = LAST_SEEN_UNKNOWN;
            stale
        })?;
        info!(members = changed, "stored last-seen values reset");
        Ok(changed)
    }

    /// Zero every member's problem counter (daily rollover).
    pub fn reset_problem_counts(&self) -> StateResult<u32> {
        let changed = self.update_members(|state| {
            let dirty = state.problems_count > 0;
            state.problems_count = 0;
            dirty
        })?;
        info!(members = changed, "daily problem counters reset");
        Ok(changed)
    }

    /// Members with at least one problem this period, worst first.
    pub fn problematic_members(&self) -> StateResult<Vec<ProblematicMember>> {
        let mut members: Vec<ProblematicMember> = self
            .list_members()?
            .into_iter()
            .filter(|s| s.problems_count > 0)
            .map(|s| ProblematicMember {
                name: s.name,
                problems_count: s.problems_count,
            })
            .collect();
        members.sort_by(|a, b| {
            b.problems_count
                .cmp(&a.problems_count)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(members)
    }

    // ── Daily statistics ───────────────────────────────────────────

    pub fn get_stats(&self) -> StateResult<Option<DailyStats>> {
        self.get_json(STATS, DAILY_STATS_KEY)
    }

    pub fn put_stats(&self, stats: &DailyStats) -> StateResult<()> {
        self.put_json(STATS, DAILY_STATS_KEY, stats)
    }

    /// Load the stats record, creating one for `today` if none exists.
    pub fn load_or_init_stats(&self, today: NaiveDate) -> StateResult<DailyStats> {
        if let Some(stats) = self.get_stats()? {
            return Ok(stats);
        }
        let stats = DailyStats::new(today);
        self.put_stats(&stats)?;
        info!(%today, "daily statistics initialized");
        Ok(stats)
    }
}
