// src/store/mod.rs
//! The events table, as seen by the pipeline.

pub mod supabase;

use anyhow::{bail, Result};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::ingest::types::CanonicalEvent;

#[async_trait::async_trait]
pub trait EventStore: Send + Sync {
    /// Insert or fully replace rows keyed by `event_id`.
    async fn upsert_events(&self, events: &[CanonicalEvent]) -> Result<()>;
    /// Subset of `ids` already present.
    async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>>;
    /// Rows whose `source` column equals `source`.
    async fn count_by_source(&self, source: &str) -> Result<usize>;
}

/// In-process table. Used by tests and dry runs; can be told to fail writes.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<BTreeMap<String, CanonicalEvent>>,
    extra_counts: Mutex<BTreeMap<String, usize>>,
    fail_writes: AtomicBool,
    calls: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: impl IntoIterator<Item = CanonicalEvent>) -> Self {
        let store = Self::default();
        {
            let mut map = store.rows.lock().expect("store mutex poisoned");
            for r in rows {
                map.insert(r.event_id.clone(), r);
            }
        }
        store
    }

    /// Pretend `n` more rows exist for `source` than are held (for count checks).
    pub fn with_phantom_rows(self, source: &str, n: usize) -> Self {
        self.extra_counts
            .lock()
            .expect("store mutex poisoned")
            .insert(source.to_string(), n);
        self
    }

    pub fn fail_writes(&self, on: bool) {
        self.fail_writes.store(on, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> Vec<CanonicalEvent> {
        self.rows
            .lock()
            .expect("store mutex poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Every trait call, reads included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Successful upsert batches.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EventStore for MemoryStore {
    async fn upsert_events(&self, events: &[CanonicalEvent]) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("memory store: writes disabled");
        }
        let mut map = self.rows.lock().expect("store mutex poisoned");
        for e in events {
            map.insert(e.event_id.clone(), e.clone());
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let map = self.rows.lock().expect("store mutex poisoned");
        Ok(ids.iter().filter(|id| map.contains_key(*id)).cloned().collect())
    }

    async fn count_by_source(&self, source: &str) -> Result<usize> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let held = self
            .rows
            .lock()
            .expect("store mutex poisoned")
            .values()
            .filter(|e| e.source == source)
            .count();
        let extra = self
            .extra_counts
            .lock()
            .expect("store mutex poisoned")
            .get(source)
            .copied()
            .unwrap_or(0);
        Ok(held + extra)
    }
}
