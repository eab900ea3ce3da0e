// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use events_hub_scraper::ingest::identity::make_event_id;
use events_hub_scraper::ingest::timestamps::format_utc;
use events_hub_scraper::{Campus, CanonicalEvent, EventSource, FetchError};
use std::sync::atomic::{AtomicUsize, Ordering};

pub const SOURCE: &str = "getinvolved";

pub fn event(title: &str, start: &str) -> CanonicalEvent {
    let start_time: DateTime<Utc> = start.parse().expect("test timestamp");
    CanonicalEvent {
        event_id: make_event_id(title, &format_utc(&start_time), SOURCE),
        source: SOURCE.to_string(),
        title: title.to_string(),
        description: None,
        start_time,
        end_time: None,
        location: None,
        campus: Campus::Unknown,
        organization: None,
        category: None,
        source_url: "https://example.test/".to_string(),
        last_seen: Utc::now(),
    }
}

/// Canned outcome per call; counts how often it was asked.
pub struct MockSource {
    name: &'static str,
    outcome: Box<dyn Fn() -> Result<Vec<CanonicalEvent>, FetchError> + Send + Sync>,
    calls: AtomicUsize,
}

impl MockSource {
    pub fn ok(name: &'static str, events: Vec<CanonicalEvent>) -> Self {
        Self {
            name,
            outcome: Box::new(move || Ok(events.clone())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn http_error(name: &'static str, status: u16) -> Self {
        Self {
            name,
            outcome: Box::new(move || Err(FetchError::from_status(status))),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn decode_error(name: &'static str, msg: &'static str) -> Self {
        Self {
            name,
            outcome: Box::new(move || Err(FetchError::Decode(msg.to_string()))),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventSource for MockSource {
    async fn fetch_events(&self) -> Result<Vec<CanonicalEvent>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.outcome)()
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
