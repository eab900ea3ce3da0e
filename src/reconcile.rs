// src/reconcile.rs
use anyhow::Result;
use metrics::counter;

use crate::ingest::dedup_by_event_id;
use crate::ingest::types::CanonicalEvent;
use crate::store::EventStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileCounts {
    pub inserted: usize,
    pub updated: usize,
}

/// Dedup, classify against the store, then upsert the whole batch.
///
/// Insert/update counts are a point-in-time estimate: ids are read before
/// the write, without a transaction.
pub async fn reconcile(
    store: &dyn EventStore,
    events: Vec<CanonicalEvent>,
) -> Result<ReconcileCounts> {
    if events.is_empty() {
        return Ok(ReconcileCounts::default());
    }

    let before = events.len();
    let (events, dropped) = dedup_by_event_id(events);
    if dropped > 0 {
        tracing::info!(before, after = events.len(), "deduplicated events by event_id");
        counter!("ingest_dedup_total").increment(dropped as u64);
    }

    let ids: Vec<String> = events.iter().map(|e| e.event_id.clone()).collect();
    let existing = store.existing_ids(&ids).await?;

    let inserted = ids.iter().filter(|id| !existing.contains(*id)).count();
    let updated = events.len() - inserted;

    store.upsert_events(&events).await?;

    counter!("store_inserted_total").increment(inserted as u64);
    counter!("store_updated_total").increment(updated as u64);

    Ok(ReconcileCounts { inserted, updated })
}
