// src/ingest/providers/ical_feed.rs
//! Public iCalendar feed, used when the Engage API is unavailable.
//! The feed carries no organization or category data.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use ical::parser::ical::component::IcalEvent;
use ical::IcalParser;
use metrics::{counter, histogram};
use reqwest::header::ACCEPT;

use crate::config::ScraperConfig;
use crate::ingest::normalize::{normalize, RawEvent};
use crate::ingest::timestamps::RawTimestamp;
use crate::ingest::types::{CanonicalEvent, EventSource, FetchError};

type Params = Option<Vec<(String, Vec<String>)>>;

fn param<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params
        .iter()
        .flatten()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .and_then(|(_, v)| v.first())
        .map(|s| s.trim_matches('"'))
}

/// Undo RFC 5545 TEXT escaping (`\n`, `\,`, `\;`, `\\`).
fn unescape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// DATE, UTC (`...Z`), TZID-local, or floating DATE-TIME.
pub(crate) fn ical_timestamp(value: &str, params: &Params) -> RawTimestamp {
    let v = value.trim();

    let is_date = param(params, "VALUE").is_some_and(|t| t.eq_ignore_ascii_case("DATE"))
        || (v.len() == 8 && v.bytes().all(|b| b.is_ascii_digit()));
    if is_date {
        if let Ok(d) = NaiveDate::parse_from_str(v, "%Y%m%d") {
            return RawTimestamp::Date(d);
        }
    }

    if let Some(head) = v.strip_suffix('Z') {
        if let Ok(naive) = NaiveDateTime::parse_from_str(head, "%Y%m%dT%H%M%S") {
            return RawTimestamp::Instant(naive.and_utc());
        }
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(v, "%Y%m%dT%H%M%S") {
        if let Some(tzid) = param(params, "TZID") {
            match tzid.parse::<Tz>() {
                Ok(tz) => {
                    if let Some(local) = tz.from_local_datetime(&naive).earliest() {
                        return RawTimestamp::Instant(local.with_timezone(&Utc));
                    }
                }
                Err(_) => tracing::debug!(tzid, "unknown TZID, treating as UTC"),
            }
        }
        return RawTimestamp::Floating(naive);
    }

    RawTimestamp::Text(v.to_string())
}

#[derive(Debug, Default)]
struct FeedRecord {
    summary: Option<String>,
    dtstart: Option<RawTimestamp>,
    dtend: Option<RawTimestamp>,
    location: Option<String>,
    description: Option<String>,
    url: Option<String>,
    fallback_url: String,
}

impl FeedRecord {
    fn from_component(ev: &IcalEvent, fallback_url: &str) -> Self {
        let mut rec = FeedRecord {
            fallback_url: fallback_url.to_string(),
            ..Default::default()
        };
        for prop in &ev.properties {
            let Some(value) = prop.value.as_deref() else {
                continue;
            };
            // first occurrence wins
            match prop.name.to_ascii_uppercase().as_str() {
                "SUMMARY" if rec.summary.is_none() => rec.summary = Some(unescape_text(value)),
                "DTSTART" if rec.dtstart.is_none() => {
                    rec.dtstart = Some(ical_timestamp(value, &prop.params))
                }
                "DTEND" if rec.dtend.is_none() => {
                    rec.dtend = Some(ical_timestamp(value, &prop.params))
                }
                "LOCATION" if rec.location.is_none() => rec.location = Some(unescape_text(value)),
                "DESCRIPTION" if rec.description.is_none() => {
                    rec.description = Some(unescape_text(value))
                }
                "URL" if rec.url.is_none() => rec.url = Some(value.trim().to_string()),
                _ => {}
            }
        }
        rec
    }
}

impl RawEvent for FeedRecord {
    fn title(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    fn start(&self) -> Option<RawTimestamp> {
        self.dtstart.clone()
    }

    fn end(&self) -> Option<RawTimestamp> {
        self.dtend.clone()
    }

    fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn source_url(&self) -> String {
        self.url
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.fallback_url.clone())
    }
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

pub struct IcalFeedProvider {
    mode: Mode,
    source: String,
    feed_url: String,
}

impl IcalFeedProvider {
    pub fn from_url(client: reqwest::Client, cfg: &ScraperConfig) -> Self {
        Self {
            mode: Mode::Http { client },
            source: cfg.source.clone(),
            feed_url: cfg.feed_url.clone(),
        }
    }

    pub fn from_fixture_str(s: &str) -> Self {
        let cfg = ScraperConfig::default();
        Self {
            mode: Mode::Fixture(s.to_string()),
            source: cfg.source,
            feed_url: cfg.feed_url,
        }
    }

    fn parse_calendar(&self, body: &str) -> Result<Vec<CanonicalEvent>, FetchError> {
        let t0 = std::time::Instant::now();
        let now = Utc::now();
        let mut calendars = 0usize;
        let mut out = Vec::new();

        for cal in IcalParser::new(body.as_bytes()) {
            let cal = cal.map_err(|e| FetchError::Decode(format!("ical feed: {e}")))?;
            calendars += 1;
            // VTODO/VJOURNAL/VTIMEZONE etc. are kept apart by the parser; only VEVENTs are read.
            for component in &cal.events {
                let rec = FeedRecord::from_component(component, &self.feed_url);
                match normalize(&rec, &self.source, now) {
                    Ok(ev) => out.push(ev),
                    Err(why) => {
                        tracing::debug!(reason = %why, provider = self.name(), "feed event dropped");
                        counter!("ingest_rejected_total", "provider" => "feed").increment(1);
                    }
                }
            }
        }

        if calendars == 0 {
            return Err(FetchError::Decode("ical feed: no VCALENDAR in body".into()));
        }

        histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("ingest_events_total", "provider" => "feed").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl EventSource for IcalFeedProvider {
    async fn fetch_events(&self) -> Result<Vec<CanonicalEvent>, FetchError> {
        match &self.mode {
            Mode::Fixture(s) => self.parse_calendar(s),
            Mode::Http { client } => {
                tracing::info!(url = %self.feed_url, "fetching ical feed");
                let resp = client
                    .get(&self.feed_url)
                    .header(ACCEPT, "text/calendar")
                    .send()
                    .await?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(FetchError::from_status(status.as_u16()));
                }
                let body = resp.text().await?;
                self.parse_calendar(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "feed"
    }
}
