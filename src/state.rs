// src/state.rs
//! Per-source failure counters and the kill switch, persisted as a small JSON
//! document keyed by source name.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::fs;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceState {
    #[serde(default)]
    pub consecutive_failures: u32,
    #[serde(default)]
    pub kill_switch: bool,
    #[serde(default)]
    pub last_success: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_attempt: Option<DateTime<Utc>>,
}

/// Health as the orchestrator sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    /// Consecutive failures so far (0 when fully healthy).
    Healthy(u32),
    Blocked,
}

impl SourceState {
    pub fn health(&self) -> Health {
        if self.kill_switch {
            Health::Blocked
        } else {
            Health::Healthy(self.consecutive_failures)
        }
    }
}

/// The whole state document: one entry per source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FailureState {
    sources: BTreeMap<String, SourceState>,
}

impl FailureState {
    pub fn get(&self, source: &str) -> SourceState {
        self.sources.get(source).cloned().unwrap_or_default()
    }

    pub fn health(&self, source: &str) -> Health {
        self.get(source).health()
    }

    pub fn sources(&self) -> impl Iterator<Item = (&str, &SourceState)> {
        self.sources.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Count a failed run; latches the kill switch at `max_failures`.
    pub fn record_failure(
        &mut self,
        source: &str,
        now: DateTime<Utc>,
        max_failures: u32,
    ) -> &SourceState {
        let s = self.sources.entry(source.to_string()).or_default();
        s.consecutive_failures = s.consecutive_failures.saturating_add(1);
        s.last_attempt = Some(now);
        if s.consecutive_failures >= max_failures && !s.kill_switch {
            s.kill_switch = true;
            tracing::error!(
                source,
                failures = s.consecutive_failures,
                "kill switch ACTIVATED; reset the state file (or run with --reset-kill-switch) to resume"
            );
        }
        s
    }

    pub fn record_success(&mut self, source: &str, now: DateTime<Utc>) -> &SourceState {
        let s = self.sources.entry(source.to_string()).or_default();
        s.consecutive_failures = 0;
        s.kill_switch = false;
        s.last_success = Some(now);
        s.last_attempt = Some(now);
        s
    }

    /// Operator escape hatch: clear counters and kill switch for every source.
    pub fn reset_all(&mut self) {
        for s in self.sources.values_mut() {
            s.kill_switch = false;
            s.consecutive_failures = 0;
        }
    }
}

/// Durable home of the [`FailureState`] document.
#[async_trait::async_trait]
pub trait StateStore: Send + Sync {
    /// `Ok(None)` when nothing has been persisted yet.
    async fn load(&self) -> Result<Option<FailureState>>;
    async fn save(&self, state: &FailureState) -> Result<()>;
}

/// JSON file written via temp-file + rename so a crash never leaves half a document.
#[derive(Debug, Clone)]
pub struct JsonFileStateStore {
    path: PathBuf,
}

impl JsonFileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait::async_trait]
impl StateStore for JsonFileStateStore {
    async fn load(&self) -> Result<Option<FailureState>> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.path.display()))
            }
        };
        let state = serde_json::from_str(&raw)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(Some(state))
    }

    async fn save(&self, state: &FailureState) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let body = serde_json::to_vec_pretty(state).context("serializing failure state")?;
        let tmp = self.tmp_path();
        fs::write(&tmp, body)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

/// In-memory state store for tests.
#[derive(Default)]
pub struct MemoryStateStore {
    inner: Mutex<Option<FailureState>>,
    saves: AtomicUsize,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: FailureState) -> Self {
        Self {
            inner: Mutex::new(Some(state)),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn current(&self) -> Option<FailureState> {
        self.inner.lock().expect("state mutex poisoned").clone()
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<Option<FailureState>> {
        Ok(self.current())
    }

    async fn save(&self, state: &FailureState) -> Result<()> {
        *self.inner.lock().expect("state mutex poisoned") = Some(state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    NothingToReset,
    Reset { sources: usize },
}

/// Clear the kill switch for all sources, bypassing normal transitions.
pub async fn reset_kill_switch(store: &dyn StateStore) -> Result<ResetOutcome> {
    let Some(mut state) = store.load().await? else {
        return Ok(ResetOutcome::NothingToReset);
    };
    state.reset_all();
    store.save(&state).await?;
    Ok(ResetOutcome::Reset {
        sources: state.sources.len(),
    })
}
