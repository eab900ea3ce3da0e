// src/ingest/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ingest::timestamps::{serde_utc, serde_utc_opt};

/// Campus label derived from a free-text location. Serialized as the label
/// the web app filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Campus {
    #[serde(rename = "College Ave")]
    CollegeAve,
    Livingston,
    Busch,
    #[serde(rename = "Cook/Douglass")]
    CookDouglass,
    Online,
    #[serde(rename = "Off-Campus")]
    OffCampus,
    Unknown,
}

impl Campus {
    pub fn label(self) -> &'static str {
        match self {
            Campus::CollegeAve => "College Ave",
            Campus::Livingston => "Livingston",
            Campus::Busch => "Busch",
            Campus::CookDouglass => "Cook/Douglass",
            Campus::Online => "Online",
            Campus::OffCampus => "Off-Campus",
            Campus::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for Campus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the `events` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalEvent {
    pub event_id: String,
    pub source: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(with = "serde_utc")]
    pub start_time: DateTime<Utc>,
    #[serde(default, with = "serde_utc_opt")]
    pub end_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub campus: Campus,
    pub organization: Option<String>,
    pub category: Option<String>,
    pub source_url: String,
    #[serde(with = "serde_utc")]
    pub last_seen: DateTime<Utc>,
}

/// Why a fetch from one source failed. All variants trigger the same
/// fallback; `Throttled` only changes how loudly we log it.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP {status} (rate limited or forbidden)")]
    Throttled { status: u16 },
    #[error("HTTP {status}")]
    Status { status: u16 },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn from_status(status: u16) -> Self {
        match status {
            403 | 429 => FetchError::Throttled { status },
            _ => FetchError::Status { status },
        }
    }

    pub fn is_throttled(&self) -> bool {
        matches!(self, FetchError::Throttled { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Throttled { status } | FetchError::Status { status } => Some(*status),
            FetchError::Transport(e) => e.status().map(|s| s.as_u16()),
            FetchError::Decode(_) => None,
        }
    }
}

/// A strategy that produces normalized events for one upstream format.
#[async_trait::async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch_events(&self) -> Result<Vec<CanonicalEvent>, FetchError>;
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(FetchError::from_status(429).is_throttled());
        assert!(FetchError::from_status(403).is_throttled());
        assert!(!FetchError::from_status(500).is_throttled());
        assert_eq!(FetchError::from_status(502).status(), Some(502));
    }

    #[test]
    fn campus_serializes_as_label() {
        let s = serde_json::to_string(&Campus::CookDouglass).unwrap();
        assert_eq!(s, "\"Cook/Douglass\"");
        let c: Campus = serde_json::from_str("\"Off-Campus\"").unwrap();
        assert_eq!(c, Campus::OffCampus);
        assert_eq!(Campus::CollegeAve.to_string(), "College Ave");
    }
}
