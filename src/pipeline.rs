// src/pipeline.rs
//! One scraper run: kill-switch check → fetch (API, else feed) → empty-result
//! safety check → reconcile → failure-state update.

use chrono::Utc;
use metrics::{counter, gauge};
use serde::Serialize;

use crate::config::ScraperConfig;
use crate::ingest::ensure_metrics_described;
use crate::ingest::types::{CanonicalEvent, EventSource, FetchError};
use crate::reconcile::reconcile;
use crate::state::{FailureState, Health, StateStore};
use crate::store::EventStore;

/// Which upstream the run's events came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchVia {
    Api,
    Feed,
    None,
}

impl FetchVia {
    pub fn as_str(self) -> &'static str {
        match self {
            FetchVia::Api => "api",
            FetchVia::Feed => "feed",
            FetchVia::None => "none",
        }
    }
}

impl std::fmt::Display for FetchVia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a run reports back to its caller. `error` present ⇒ the run failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub fetched: usize,
    pub inserted: usize,
    pub updated: usize,
    pub source: FetchVia,
    pub error: Option<String>,
}

impl RunSummary {
    fn idle(source: FetchVia, error: Option<String>) -> Self {
        Self {
            fetched: 0,
            inserted: 0,
            updated: 0,
            source,
            error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Result of the two-step fetch attempt.
#[derive(Debug)]
pub enum FetchOutcome {
    Primary(Vec<CanonicalEvent>),
    Secondary(Vec<CanonicalEvent>),
    Failed {
        primary: FetchError,
        secondary: FetchError,
    },
}

/// Try `primary`; on any error try `secondary` once. No further retries.
pub async fn fetch_with_fallback(
    primary: &dyn EventSource,
    secondary: &dyn EventSource,
) -> FetchOutcome {
    let primary_err = match primary.fetch_events().await {
        Ok(events) => {
            tracing::info!(provider = primary.name(), count = events.len(), "fetched events");
            return FetchOutcome::Primary(events);
        }
        Err(e) => e,
    };

    counter!("ingest_provider_errors_total", "provider" => primary.name()).increment(1);
    counter!("scraper_fallback_total").increment(1);
    match primary_err.status() {
        Some(status) if primary_err.is_throttled() => tracing::warn!(
            status,
            provider = primary.name(),
            fallback = secondary.name(),
            "rate limited or forbidden, falling back"
        ),
        _ => tracing::warn!(
            error = %primary_err,
            provider = primary.name(),
            fallback = secondary.name(),
            "fetch failed, falling back"
        ),
    }

    match secondary.fetch_events().await {
        Ok(events) => {
            tracing::info!(provider = secondary.name(), count = events.len(), "fetched events");
            FetchOutcome::Secondary(events)
        }
        Err(e) => {
            counter!("ingest_provider_errors_total", "provider" => secondary.name()).increment(1);
            tracing::error!(error = %e, provider = secondary.name(), "fallback also failed");
            FetchOutcome::Failed {
                primary: primary_err,
                secondary: e,
            }
        }
    }
}

pub struct Pipeline<'a> {
    primary: &'a dyn EventSource,
    secondary: &'a dyn EventSource,
    store: &'a dyn EventStore,
    source: String,
    max_failures: u32,
    safety_floor: usize,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        primary: &'a dyn EventSource,
        secondary: &'a dyn EventSource,
        store: &'a dyn EventStore,
        cfg: &ScraperConfig,
    ) -> Self {
        Self {
            primary,
            secondary,
            store,
            source: cfg.source.clone(),
            max_failures: cfg.max_failures,
            safety_floor: cfg.safety_floor,
        }
    }

    /// Load state, run, persist state if it changed.
    ///
    /// An unreadable state document is replaced by a fresh one. A failed save is
    /// surfaced through `error` so the caller's exit code reflects it.
    pub async fn run_once(&self, states: &dyn StateStore) -> RunSummary {
        let mut state = match states.load().await {
            Ok(Some(s)) => s,
            Ok(None) => FailureState::default(),
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "failure state unreadable, starting fresh");
                FailureState::default()
            }
        };
        let before = state.clone();

        let mut summary = self.run_with_state(&mut state).await;

        if state != before {
            if let Err(e) = states.save(&state).await {
                tracing::error!(error = %format!("{e:#}"), "could not persist failure state");
                if summary.error.is_none() {
                    summary.error = Some(format!("could not persist failure state: {e:#}"));
                }
            }
        }
        summary
    }

    /// The run itself, over an explicitly passed state document.
    pub async fn run_with_state(&self, state: &mut FailureState) -> RunSummary {
        ensure_metrics_described();
        let summary = self.run_inner(state).await;

        let outcome = if summary.is_error() { "error" } else { "ok" };
        counter!("scraper_runs_total", "outcome" => outcome).increment(1);
        let current = state.get(&self.source);
        gauge!("scraper_consecutive_failures").set(f64::from(current.consecutive_failures));
        gauge!("scraper_kill_switch").set(if current.kill_switch { 1.0 } else { 0.0 });

        summary
    }

    async fn run_inner(&self, state: &mut FailureState) -> RunSummary {
        let src = self.source.as_str();

        let current = state.get(src);
        if current.health() == Health::Blocked {
            let msg = format!(
                "Kill switch is active for '{src}' after {} consecutive failures. \
                 Reset the state file manually (or run with --reset-kill-switch) to resume.",
                current.consecutive_failures
            );
            tracing::error!(source = src, "{msg}");
            return RunSummary::idle(FetchVia::None, Some(msg));
        }

        let (events, via) = match fetch_with_fallback(self.primary, self.secondary).await {
            FetchOutcome::Primary(events) => (events, FetchVia::Api),
            FetchOutcome::Secondary(events) => (events, FetchVia::Feed),
            FetchOutcome::Failed { secondary, .. } => {
                state.record_failure(src, Utc::now(), self.max_failures);
                return RunSummary::idle(FetchVia::None, Some(secondary.to_string()));
            }
        };

        if events.is_empty() {
            return match self.store.count_by_source(src).await {
                Ok(stored) if stored >= self.safety_floor => {
                    let msg = format!(
                        "Fetched 0 events but {stored} are stored. \
                         Refusing to treat this as a healthy run; check the source manually."
                    );
                    tracing::error!(source = src, stored, "{msg}");
                    state.record_failure(src, Utc::now(), self.max_failures);
                    RunSummary::idle(via, Some(msg))
                }
                Ok(stored) => {
                    tracing::warn!(source = src, stored, "fetched 0 events, skipping upsert");
                    state.record_success(src, Utc::now());
                    RunSummary::idle(via, None)
                }
                Err(e) => {
                    tracing::error!(error = %format!("{e:#}"), "could not count stored events");
                    state.record_failure(src, Utc::now(), self.max_failures);
                    RunSummary::idle(via, Some(format!("counting stored events: {e:#}")))
                }
            };
        }

        let fetched = events.len();
        match reconcile(self.store, events).await {
            Ok(counts) => {
                tracing::info!(
                    source = src,
                    via = via.as_str(),
                    fetched,
                    inserted = counts.inserted,
                    updated = counts.updated,
                    "scrape complete"
                );
                state.record_success(src, Utc::now());
                RunSummary {
                    fetched,
                    inserted: counts.inserted,
                    updated: counts.updated,
                    source: via,
                    error: None,
                }
            }
            Err(e) => {
                tracing::error!(error = %format!("{e:#}"), "store upsert failed");
                state.record_failure(src, Utc::now(), self.max_failures);
                RunSummary {
                    fetched,
                    inserted: 0,
                    updated: 0,
                    source: via,
                    error: Some(format!("{e:#}")),
                }
            }
        }
    }
}
