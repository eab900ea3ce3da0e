// src/ingest/normalize.rs
//! Raw record → canonical event. Each upstream format implements [`RawEvent`];
//! validation and derivation live here once.

use chrono::{DateTime, Utc};

use crate::ingest::campus::infer_campus;
use crate::ingest::identity::make_event_id;
use crate::ingest::sanitize;
use crate::ingest::timestamps::{format_utc, RawTimestamp};
use crate::ingest::types::CanonicalEvent;

/// Field accessors over one upstream record.
pub trait RawEvent {
    fn title(&self) -> Option<&str>;
    fn start(&self) -> Option<RawTimestamp>;
    fn end(&self) -> Option<RawTimestamp>;
    fn location(&self) -> Option<&str>;
    fn description(&self) -> Option<&str>;
    /// Event-specific link, or the source-level fallback.
    fn source_url(&self) -> String;

    fn organization(&self) -> Option<String> {
        None
    }
    fn category(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejected {
    #[error("missing title")]
    MissingTitle,
    #[error("missing or unparseable start time")]
    BadStart,
}

fn non_empty_trimmed(s: Option<&str>) -> Option<String> {
    s.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

pub fn normalize<R: RawEvent + ?Sized>(
    raw: &R,
    source: &str,
    now: DateTime<Utc>,
) -> Result<CanonicalEvent, Rejected> {
    let title = non_empty_trimmed(raw.title()).ok_or(Rejected::MissingTitle)?;

    let start_time = raw
        .start()
        .and_then(|ts| ts.to_utc())
        .ok_or(Rejected::BadStart)?;
    let end_time = raw.end().and_then(|ts| ts.to_utc());

    let location = non_empty_trimmed(raw.location());
    let campus = infer_campus(location.as_deref());

    let event_id = make_event_id(&title, &format_utc(&start_time), source);

    Ok(CanonicalEvent {
        event_id,
        source: source.to_string(),
        title,
        description: sanitize(raw.description()),
        start_time,
        end_time,
        location,
        campus,
        organization: raw.organization(),
        category: raw.category(),
        source_url: raw.source_url(),
        last_seen: now,
    })
}
