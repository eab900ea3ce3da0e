// src/store/supabase.rs
//! Supabase (PostgREST) implementation of [`EventStore`].

use anyhow::{anyhow, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_RANGE};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;

use super::EventStore;
use crate::config::ScraperConfig;
use crate::ingest::types::CanonicalEvent;

/// Ids per `in.(...)` filter, keeps request URLs short.
const IN_CHUNK: usize = 150;

#[derive(Clone)]
pub struct SupabaseStore {
    client: Client,
    rest_url: String,
    table: String,
}

#[derive(Deserialize)]
struct IdRow {
    event_id: String,
}

impl SupabaseStore {
    pub fn new(cfg: &ScraperConfig) -> Result<Self> {
        let (url, key) = cfg.store_credentials()?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(key).context("supabase key is not a valid header value")?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {key}"))
                .context("supabase key is not a valid header value")?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .context("building supabase http client")?;

        Ok(Self {
            client,
            rest_url: format!("{}/rest/v1", url.trim_end_matches('/')),
            table: cfg.store.table.clone(),
        })
    }

    fn table_url(&self) -> String {
        format!("{}/{}", self.rest_url, self.table)
    }
}

/// PostgREST `in.(..)` list; values are double-quoted.
pub(crate) fn in_filter(ids: &[String]) -> String {
    let quoted: Vec<String> = ids
        .iter()
        .map(|id| format!("\"{}\"", id.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

/// Total from a `Content-Range` header such as `0-0/123` or `*/0`.
pub(crate) fn parse_content_range_total(v: &str) -> Option<usize> {
    v.rsplit_once('/')
        .and_then(|(_, total)| total.trim().parse().ok())
}

#[async_trait::async_trait]
impl EventStore for SupabaseStore {
    async fn upsert_events(&self, events: &[CanonicalEvent]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }
        self.client
            .post(self.table_url())
            .query(&[("on_conflict", "event_id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(events)
            .send()
            .await
            .context("supabase upsert request")?
            .error_for_status()
            .context("supabase upsert")?;
        Ok(())
    }

    async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>> {
        let mut found = HashSet::new();
        for chunk in ids.chunks(IN_CHUNK) {
            let rows: Vec<IdRow> = self
                .client
                .get(self.table_url())
                .query(&[("select", "event_id".to_string()), ("event_id", in_filter(chunk))])
                .send()
                .await
                .context("supabase select ids request")?
                .error_for_status()
                .context("supabase select ids")?
                .json()
                .await
                .context("supabase select ids body")?;
            found.extend(rows.into_iter().map(|r| r.event_id));
        }
        Ok(found)
    }

    async fn count_by_source(&self, source: &str) -> Result<usize> {
        let resp = self
            .client
            .get(self.table_url())
            .query(&[("select", "event_id".to_string()), ("source", format!("eq.{source}"))])
            .header("Prefer", "count=exact")
            .header("Range", "0-0")
            .send()
            .await
            .context("supabase count request")?
            .error_for_status()
            .context("supabase count")?;

        let range = resp
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| anyhow!("supabase count: missing Content-Range"))?;
        parse_content_range_total(range)
            .ok_or_else(|| anyhow!("supabase count: unexpected Content-Range {range:?}"))
    }
}
