// src/ingest/mod.rs
pub mod campus;
pub mod identity;
pub mod normalize;
pub mod providers;
pub mod timestamps;
pub mod types;

use crate::ingest::types::CanonicalEvent;
use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use std::collections::HashSet;

/// One-time metrics registration (so series show up in the exported textfile).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "ingest_events_total",
            "Events normalized from a provider."
        );
        describe_counter!(
            "ingest_rejected_total",
            "Raw records dropped (no title / bad start time / malformed)."
        );
        describe_counter!(
            "ingest_dedup_total",
            "Events removed by event_id deduplication."
        );
        describe_counter!(
            "ingest_provider_errors_total",
            "Provider fetch/parse errors."
        );
        describe_counter!(
            "scraper_fallback_total",
            "Runs that fell back from the API to the calendar feed."
        );
        describe_counter!("scraper_runs_total", "Pipeline runs by outcome.");
        describe_counter!("store_inserted_total", "Rows inserted by reconciliation.");
        describe_counter!("store_updated_total", "Rows updated by reconciliation.");
        describe_gauge!(
            "scraper_consecutive_failures",
            "Consecutive failed runs for the source."
        );
        describe_gauge!("scraper_kill_switch", "1 when the kill switch is latched.");
        describe_histogram!("ingest_parse_ms", "Provider parse time in milliseconds.");
    });
}

/// Strip markup, decode entities, collapse whitespace. Never returns an empty string.
/// Only literal tags are removed; escaped brackets survive as text.
pub fn sanitize(s: Option<&str>) -> Option<String> {
    let s = s?;

    // 1) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"<[^>]+>").unwrap());
    let stripped = re_tags.replace_all(s, " ");

    // 2) HTML entity decode
    let decoded = html_escape::decode_html_entities(&stripped);

    // 3) Collapse whitespace (\s is Unicode-aware, so &nbsp; folds too)
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    let out = re_ws.replace_all(&decoded, " ");

    let out = out.trim();
    (!out.is_empty()).then(|| out.to_string())
}

/// Keep the first occurrence of each `event_id`, in input order.
/// Returns (kept, dropped_count).
pub fn dedup_by_event_id(events: Vec<CanonicalEvent>) -> (Vec<CanonicalEvent>, usize) {
    let before = events.len();
    let mut seen: HashSet<String> = HashSet::with_capacity(before);
    let kept: Vec<CanonicalEvent> = events
        .into_iter()
        .filter(|e| seen.insert(e.event_id.clone()))
        .collect();
    let dropped = before - kept.len();
    (kept, dropped)
}
