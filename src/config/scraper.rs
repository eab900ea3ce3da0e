// src/config/scraper.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};

pub const ENV_CONFIG_PATH: &str = "SCRAPER_CONFIG_PATH";
pub const ENV_STATE_PATH: &str = "SCRAPER_STATE_PATH";
pub const ENV_SUPABASE_URL: &str = "SUPABASE_URL";
pub const ENV_SUPABASE_SERVICE_KEY: &str = "SUPABASE_SERVICE_KEY";
pub const ENV_SUPABASE_ANON_KEY: &str = "SUPABASE_ANON_KEY";

pub const DEFAULT_CONFIG_PATH: &str = "config/scraper.toml";

fn default_source() -> String {
    "getinvolved".into()
}
fn default_api_url() -> String {
    "https://rutgers.campuslabs.com/engage/api/discovery/event/search".into()
}
fn default_feed_url() -> String {
    "https://rutgers.campuslabs.com/engage/events/ical".into()
}
fn default_event_url_base() -> String {
    "https://rutgers.campuslabs.com/engage/event".into()
}
fn default_user_agent() -> String {
    "RUEventsHub/1.0 (student project; contact: ruventshub@gmail.com)".into()
}
fn default_page_size() -> usize {
    100
}
fn default_page_delay_ms() -> u64 {
    2_000
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_max_failures() -> u32 {
    3
}
fn default_safety_floor() -> usize {
    50
}
fn default_state_path() -> PathBuf {
    PathBuf::from("state/scraper_state.json")
}
fn default_table() -> String {
    "events".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub url: Option<String>,
    /// Service-role key preferred; falls back to the anon key.
    pub key: Option<String>,
    #[serde(default = "default_table")]
    pub table: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            key: None,
            table: default_table(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Value written to `events.source` and the key in the state file.
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_feed_url")]
    pub feed_url: String,
    #[serde(default = "default_event_url_base")]
    pub event_url_base: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Consecutive failed runs before the kill switch latches.
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,
    /// Stored rows at or above which an empty fetch counts as a failure.
    #[serde(default = "default_safety_floor")]
    pub safety_floor: usize,
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
    #[serde(default)]
    pub store: StoreConfig,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            api_url: default_api_url(),
            feed_url: default_feed_url(),
            event_url_base: default_event_url_base(),
            user_agent: default_user_agent(),
            page_size: default_page_size(),
            page_delay_ms: default_page_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            max_failures: default_max_failures(),
            safety_floor: default_safety_floor(),
            state_path: default_state_path(),
            store: StoreConfig::default(),
        }
    }
}

impl ScraperConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading scraper config from {}", path.display()))?;
        let cfg: ScraperConfig = toml::from_str(&data)
            .with_context(|| format!("parsing scraper config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Defaults → TOML file → environment.
    /// File lookup: explicit path, then $SCRAPER_CONFIG_PATH, then config/scraper.toml if present.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let cfg = if let Some(p) = explicit {
            Self::load_from_file(p)?
        } else if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::load_from_file(DEFAULT_CONFIG_PATH)?
        } else {
            Self::default()
        };
        Ok(cfg.with_env_overrides())
    }

    fn with_env_overrides(mut self) -> Self {
        let non_empty = |k: &str| env::var(k).ok().filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(ENV_SUPABASE_URL) {
            self.store.url = Some(url);
        }
        if let Some(key) =
            non_empty(ENV_SUPABASE_SERVICE_KEY).or_else(|| non_empty(ENV_SUPABASE_ANON_KEY))
        {
            self.store.key = Some(key);
        }
        if let Some(p) = non_empty(ENV_STATE_PATH) {
            self.state_path = PathBuf::from(p);
        }
        self
    }

    fn sanitized(mut self) -> Self {
        if self.page_size == 0 {
            self.page_size = default_page_size();
        }
        if self.max_failures == 0 {
            self.max_failures = default_max_failures();
        }
        self
    }

    /// Store URL and key, or an error naming the missing variables.
    pub fn store_credentials(&self) -> Result<(&str, &str)> {
        match (self.store.url.as_deref(), self.store.key.as_deref()) {
            (Some(url), Some(key)) => Ok((url, key)),
            _ => Err(anyhow!(
                "{ENV_SUPABASE_URL} and {ENV_SUPABASE_SERVICE_KEY} (or {ENV_SUPABASE_ANON_KEY}) must be set"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: ScraperConfig = toml::from_str(
            r#"
            page_size = 25
            safety_floor = 10

            [store]
            url = "https://db.example.test"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.page_size, 25);
        assert_eq!(cfg.safety_floor, 10);
        assert_eq!(cfg.max_failures, 3);
        assert_eq!(cfg.source, "getinvolved");
        assert_eq!(cfg.store.table, "events");
        assert!(cfg.store_credentials().is_err());
    }

    #[test]
    fn zero_page_size_is_reset() {
        let cfg: ScraperConfig = toml::from_str("page_size = 0\nmax_failures = 0").unwrap();
        let cfg = cfg.sanitized();
        assert_eq!(cfg.page_size, 100);
        assert_eq!(cfg.max_failures, 3);
    }
}
