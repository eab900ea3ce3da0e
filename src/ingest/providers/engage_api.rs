// src/ingest/providers/engage_api.rs
//! Campus Labs Engage discovery API: paginated JSON search for approved
//! events that end today or later.

use async_trait::async_trait;
use chrono::Utc;
use metrics::{counter, histogram};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::config::ScraperConfig;
use crate::ingest::normalize::{normalize, RawEvent};
use crate::ingest::timestamps::RawTimestamp;
use crate::ingest::types::{CanonicalEvent, EventSource, FetchError};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EngageEvent {
    id: Option<Value>,
    name: Option<String>,
    starts_on: Option<String>,
    ends_on: Option<String>,
    location: Option<String>,
    description: Option<String>,
    organization_name: Option<String>,
    organization_id: Option<Value>,
    category_names: Option<OneOrMany>,
    category_name: Option<OneOrMany>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<Option<String>>),
}

impl OneOrMany {
    /// Trimmed, non-empty entries.
    fn names(&self) -> Vec<&str> {
        let all: Vec<&str> = match self {
            OneOrMany::One(s) => vec![s.as_str()],
            OneOrMany::Many(v) => v.iter().flatten().map(String::as_str).collect(),
        };
        all.into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Number or non-empty string, rendered as text.
fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

struct ApiRecord<'a> {
    ev: EngageEvent,
    api_url: &'a str,
    event_url_base: &'a str,
}

impl RawEvent for ApiRecord<'_> {
    fn title(&self) -> Option<&str> {
        self.ev.name.as_deref()
    }

    fn start(&self) -> Option<RawTimestamp> {
        self.ev.starts_on.clone().map(RawTimestamp::Text)
    }

    fn end(&self) -> Option<RawTimestamp> {
        self.ev.ends_on.clone().map(RawTimestamp::Text)
    }

    fn location(&self) -> Option<&str> {
        self.ev.location.as_deref()
    }

    fn description(&self) -> Option<&str> {
        self.ev.description.as_deref()
    }

    fn source_url(&self) -> String {
        let id = self
            .ev
            .id
            .as_ref()
            .and_then(scalar_text)
            .filter(|id| id != "0");
        match id {
            Some(id) => format!("{}/{}", self.event_url_base.trim_end_matches('/'), id),
            None => self.api_url.to_string(),
        }
    }

    fn organization(&self) -> Option<String> {
        self.ev
            .organization_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| self.ev.organization_id.as_ref().and_then(scalar_text))
    }

    fn category(&self) -> Option<String> {
        // An empty `categoryNames` counts as missing.
        let names = [&self.ev.category_names, &self.ev.category_name]
            .into_iter()
            .flatten()
            .map(OneOrMany::names)
            .find(|names| !names.is_empty())?;
        Some(names.join(", "))
    }
}

/// One page of search results.
#[derive(Debug)]
pub(crate) struct Page {
    pub records: Vec<Value>,
    pub total: usize,
}

/// Results live under `value` (or the root is the list itself); the total
/// under `totalItems` or `@odata.count`, else the page length.
pub(crate) fn parse_page(body: &str) -> Result<Page, FetchError> {
    let data: Value = serde_json::from_str(body)
        .map_err(|e| FetchError::Decode(format!("engage page json: {e}")))?;

    let (records, reported) = match data {
        Value::Array(records) => (records, None),
        Value::Object(mut map) => {
            let reported = ["totalItems", "@odata.count"]
                .iter()
                .filter_map(|k| map.get(*k).and_then(Value::as_u64))
                .find(|n| *n > 0);
            let records = match map.remove("value") {
                Some(Value::Array(v)) => v,
                _ => Vec::new(),
            };
            (records, reported)
        }
        _ => (Vec::new(), None),
    };

    let total = reported
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(records.len());
    Ok(Page { records, total })
}

enum Mode {
    /// Canned (status, body) responses, one per page request in order.
    Fixture {
        responses: Vec<(u16, String)>,
        served: AtomicUsize,
    },
    Http {
        client: reqwest::Client,
    },
}

pub struct EngageApiProvider {
    mode: Mode,
    source: String,
    api_url: String,
    event_url_base: String,
    page_size: usize,
    page_delay: Duration,
}

impl EngageApiProvider {
    pub fn from_url(client: reqwest::Client, cfg: &ScraperConfig) -> Self {
        Self::with_mode(Mode::Http { client }, cfg)
    }

    /// Serves each body as a 200 page; requests past the end see an empty page.
    pub fn from_fixture_pages(pages: Vec<String>) -> Self {
        Self::from_fixture_responses(pages.into_iter().map(|b| (200, b)).collect())
    }

    pub fn from_fixture_responses(responses: Vec<(u16, String)>) -> Self {
        let mode = Mode::Fixture {
            responses,
            served: AtomicUsize::new(0),
        };
        Self::with_mode(mode, &ScraperConfig::default()).with_page_delay(Duration::ZERO)
    }

    fn with_mode(mode: Mode, cfg: &ScraperConfig) -> Self {
        Self {
            mode,
            source: cfg.source.clone(),
            api_url: cfg.api_url.clone(),
            event_url_base: cfg.event_url_base.clone(),
            page_size: cfg.page_size.max(1),
            page_delay: Duration::from_millis(cfg.page_delay_ms),
        }
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size.max(1);
        self
    }

    /// Page requests issued so far (fixture mode only).
    pub fn pages_requested(&self) -> usize {
        match &self.mode {
            Mode::Fixture { served, .. } => served.load(Ordering::SeqCst),
            Mode::Http { .. } => 0,
        }
    }

    async fn get_page(&self, ends_after: &str, skip: usize) -> Result<String, FetchError> {
        match &self.mode {
            Mode::Fixture { responses, served } => {
                let i = served.fetch_add(1, Ordering::SeqCst);
                match responses.get(i) {
                    Some((status, _)) if !(200..300).contains(status) => {
                        Err(FetchError::from_status(*status))
                    }
                    Some((_, body)) => Ok(body.clone()),
                    None => Ok(r#"{"value": []}"#.to_string()),
                }
            }
            Mode::Http { client } => {
                let take = self.page_size.to_string();
                let skip = skip.to_string();
                let resp = client
                    .get(&self.api_url)
                    .header(ACCEPT, "application/json")
                    .query(&[
                        ("endsAfter", ends_after),
                        ("orderByField", "endsOn"),
                        ("orderByDirection", "ascending"),
                        ("status", "Approved"),
                        ("take", take.as_str()),
                        ("skip", skip.as_str()),
                    ])
                    .send()
                    .await?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(FetchError::from_status(status.as_u16()));
                }
                Ok(resp.text().await?)
            }
        }
    }

    fn normalize_page(&self, records: Vec<Value>, out: &mut Vec<CanonicalEvent>) {
        let now = Utc::now();
        for rec in records {
            let ev: EngageEvent = match serde_json::from_value(rec) {
                Ok(ev) => ev,
                Err(e) => {
                    tracing::warn!(error = %e, provider = self.name(), "malformed api record");
                    counter!("ingest_rejected_total", "provider" => "api").increment(1);
                    continue;
                }
            };
            let raw = ApiRecord {
                ev,
                api_url: &self.api_url,
                event_url_base: &self.event_url_base,
            };
            match normalize(&raw, &self.source, now) {
                Ok(event) => out.push(event),
                Err(why) => {
                    tracing::debug!(reason = %why, provider = self.name(), "api record dropped");
                    counter!("ingest_rejected_total", "provider" => "api").increment(1);
                }
            }
        }
    }
}

#[async_trait]
impl EventSource for EngageApiProvider {
    async fn fetch_events(&self) -> Result<Vec<CanonicalEvent>, FetchError> {
        let ends_after = Utc::now().date_naive().format("%Y-%m-%d").to_string();
        let mut events = Vec::new();
        let mut page = 0usize;

        loop {
            let skip = page * self.page_size;
            if page > 0 && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }

            tracing::info!(page, skip, "engage api page");
            let body = self.get_page(&ends_after, skip).await?;

            let t0 = Instant::now();
            let Page { records, total } = parse_page(&body)?;
            let raw_count = records.len();
            let before = events.len();
            self.normalize_page(records, &mut events);

            histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
            counter!("ingest_events_total", "provider" => "api")
                .increment((events.len() - before) as u64);

            page += 1;
            if events.len() >= total || raw_count == 0 {
                break;
            }
        }

        Ok(events)
    }

    fn name(&self) -> &'static str {
        "api"
    }
}
