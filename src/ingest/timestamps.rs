// src/ingest/timestamps.rs
//! UTC conversion for upstream timestamps and the fixed textual form used in
//! stored rows and event identities (`YYYY-MM-DDTHH:MM:SS+00:00`).

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// A timestamp as an upstream hands it to us, before UTC normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawTimestamp {
    /// Already anchored to an instant.
    Instant(DateTime<Utc>),
    /// Wall-clock time without zone; interpreted as UTC.
    Floating(NaiveDateTime),
    /// Whole-day value; interpreted as midnight UTC.
    Date(NaiveDate),
    /// Free text, parsed leniently.
    Text(String),
}

impl RawTimestamp {
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            RawTimestamp::Instant(dt) => Some(*dt),
            RawTimestamp::Floating(naive) => Some(naive.and_utc()),
            RawTimestamp::Date(d) => Some(d.and_hms_opt(0, 0, 0)?.and_utc()),
            RawTimestamp::Text(s) => parse_lenient(s),
        }
    }
}

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y%m%dT%H%M%S%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y%m%dT%H%M%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
    "%B %d, %Y %I:%M %p",
    "%b %d, %Y %I:%M %p",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d", "%m/%d/%Y", "%B %d, %Y", "%b %d, %Y"];

/// Best-effort parse of a free-text timestamp. Zone-less values are UTC.
pub fn parse_lenient(text: &str) -> Option<DateTime<Utc>> {
    let s = text.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    // "...Z" outside strict RFC 3339 (e.g. no seconds): swap for an explicit offset.
    let zulu;
    let s = match s.strip_suffix('Z').or_else(|| s.strip_suffix('z')) {
        Some(head) => {
            zulu = format!("{head}+0000");
            zulu.as_str()
        }
        None => s,
    };

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::<FixedOffset>::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return RawTimestamp::Date(d).to_utc();
        }
    }
    None
}

/// Fixed textual UTC form. Sub-second precision is dropped.
pub fn format_utc(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S+00:00").to_string()
}

pub mod serde_utc {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_utc(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_lenient(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }
}

pub mod serde_utc_opt {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match dt {
            Some(dt) => s.serialize_some(&super::format_utc(dt)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(d)? {
            None => Ok(None),
            Some(raw) => super::parse_lenient(&raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iso(s: &str) -> Option<String> {
        parse_lenient(s).map(|dt| format_utc(&dt))
    }

    #[test]
    fn offsets_are_converted_to_utc() {
        assert_eq!(
            iso("2026-10-20T18:00:00-04:00").as_deref(),
            Some("2026-10-20T22:00:00+00:00")
        );
        assert_eq!(
            iso("2026-10-20T18:00:00.123Z").as_deref(),
            Some("2026-10-20T18:00:00+00:00")
        );
        assert_eq!(
            iso("2026-10-20T18:00Z").as_deref(),
            Some("2026-10-20T18:00:00+00:00")
        );
    }

    #[test]
    fn zoneless_and_date_only_assume_utc() {
        assert_eq!(
            iso("2026-10-20 09:30").as_deref(),
            Some("2026-10-20T09:30:00+00:00")
        );
        assert_eq!(iso("2026-10-20").as_deref(), Some("2026-10-20T00:00:00+00:00"));
        assert_eq!(
            iso("October 20, 2026").as_deref(),
            Some("2026-10-20T00:00:00+00:00")
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(iso(""), None);
        assert_eq!(iso("sometime next week"), None);
        assert_eq!(iso("2026-13-45"), None);
    }

    #[test]
    fn raw_variants() {
        let d = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        assert_eq!(
            RawTimestamp::Date(d).to_utc().map(|dt| format_utc(&dt)).as_deref(),
            Some("2026-01-02T00:00:00+00:00")
        );
        let naive = d.and_hms_opt(5, 6, 7).unwrap();
        assert_eq!(
            RawTimestamp::Floating(naive).to_utc().map(|dt| format_utc(&dt)).as_deref(),
            Some("2026-01-02T05:06:07+00:00")
        );
    }
}
