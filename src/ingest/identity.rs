// src/ingest/identity.rs
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// Length of the hex prefix kept from the SHA-256 digest (128 bits).
pub const EVENT_ID_HEX_LEN: usize = 32;

/// Stable identifier for an event: `sha256("{title}|{start}|{source}")`,
/// truncated. `start_iso` must already be in the fixed UTC form.
pub fn make_event_id(title: &str, start_iso: &str, source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"|");
    hasher.update(start_iso.as_bytes());
    hasher.update(b"|");
    hasher.update(source.as_bytes());
    let digest = hasher.finalize();

    let mut out = String::with_capacity(EVENT_ID_HEX_LEN);
    for b in digest.iter().take(EVENT_ID_HEX_LEN / 2) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = "2026-10-20T18:00:00+00:00";

    #[test]
    fn deterministic_fixed_length_hex() {
        let a = make_event_id("Fall Fest", START, "getinvolved");
        let b = make_event_id("Fall Fest", START, "getinvolved");
        assert_eq!(a, b);
        assert_eq!(a.len(), EVENT_ID_HEX_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn each_field_changes_the_id() {
        let base = make_event_id("Fall Fest", START, "getinvolved");
        assert_ne!(base, make_event_id("Fall Fest!", START, "getinvolved"));
        assert_ne!(
            base,
            make_event_id("Fall Fest", "2026-10-20T19:00:00+00:00", "getinvolved")
        );
        assert_ne!(base, make_event_id("Fall Fest", START, "other"));
    }

    #[test]
    fn matches_rows_written_by_earlier_runs() {
        assert_eq!(
            make_event_id("Fall Fest", START, "getinvolved"),
            "32c21a6e8914a074346d17893481a6a1"
        );
    }
}
