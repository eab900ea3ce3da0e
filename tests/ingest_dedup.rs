// tests/ingest_dedup.rs
mod common;

use common::event;
use events_hub_scraper::ingest::dedup_by_event_id;

#[test]
fn repeated_ids_keep_first_in_order() {
    let raw = vec![
        event("Same Event", "2026-10-20T18:00:00Z"),
        event("Other Event", "2026-10-20T18:00:00Z"),
        event("Same Event", "2026-10-20T18:00:00Z"),
        // same title, different start → distinct identity
        event("Same Event", "2026-10-27T18:00:00Z"),
    ];

    let (kept, dropped) = dedup_by_event_id(raw);
    assert_eq!(dropped, 1);
    let titles: Vec<&str> = kept.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Same Event", "Other Event", "Same Event"]);
}
