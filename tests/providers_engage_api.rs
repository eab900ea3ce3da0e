// tests/providers_engage_api.rs
use events_hub_scraper::ingest::providers::engage_api::EngageApiProvider;
use events_hub_scraper::ingest::timestamps::format_utc;
use events_hub_scraper::{Campus, EventSource, FetchError};
use std::time::Duration;

const PAGE1: &str = include_str!("fixtures/engage_page1.json");
const PAGE2: &str = include_str!("fixtures/engage_page2.json");

#[tokio::test]
async fn paginates_until_reported_total() {
    let provider = EngageApiProvider::from_fixture_pages(vec![
        PAGE1.to_string(),
        PAGE2.to_string(),
        PAGE2.to_string(),
    ]);
    let events = provider.fetch_events().await.expect("api fixture ok");

    // untitled record on page 1 is dropped; total of 3 reached after page 2
    assert_eq!(events.len(), 3);
    assert_eq!(provider.pages_requested(), 2);
}

#[tokio::test]
async fn stops_on_empty_page() {
    let page = r#"{"totalItems": 50, "value": [{"name": "Only One", "startsOn": "2026-10-30"}]}"#;
    let provider = EngageApiProvider::from_fixture_pages(vec![page.to_string()]);
    let events = provider.fetch_events().await.unwrap();

    assert_eq!(events.len(), 1);
    // second request sees an empty page and ends the loop
    assert_eq!(provider.pages_requested(), 2);
}

#[tokio::test]
async fn api_fields_are_mapped() {
    let provider = EngageApiProvider::from_fixture_pages(vec![PAGE1.into(), PAGE2.into()]);
    let events = provider.fetch_events().await.unwrap();

    let open_mic = events.iter().find(|e| e.title == "Open Mic Night").unwrap();
    assert_eq!(open_mic.campus, Campus::CollegeAve);
    assert_eq!(
        open_mic.organization.as_deref(),
        Some("Rutgers University Programming Association")
    );
    assert_eq!(open_mic.category.as_deref(), Some("Arts, Social"));
    assert_eq!(
        open_mic.description.as_deref(),
        Some("Sign up at the door. All acts welcome!")
    );
    assert_eq!(
        open_mic.source_url,
        "https://rutgers.campuslabs.com/engage/event/9001"
    );

    let research = events
        .iter()
        .find(|e| e.title == "Intro to Research Computing")
        .unwrap();
    assert_eq!(research.campus, Campus::Busch);
    assert_eq!(format_utc(&research.start_time), "2026-10-24T18:00:00+00:00");
    assert_eq!(research.organization.as_deref(), Some("4412"));
    assert_eq!(research.category.as_deref(), Some("Academic"));
    assert_eq!(research.description, None);

    let study = events.iter().find(|e| e.title == "Virtual Study Hall").unwrap();
    assert_eq!(study.campus, Campus::Online);
    assert_eq!(format_utc(&study.start_time), "2026-10-25T19:00:00+00:00");
    assert_eq!(
        study.source_url,
        "https://rutgers.campuslabs.com/engage/api/discovery/event/search"
    );
}

#[tokio::test]
async fn throttling_is_distinguished_from_other_statuses() {
    let throttled = EngageApiProvider::from_fixture_responses(vec![(429, String::new())]);
    let err = throttled.fetch_events().await.unwrap_err();
    assert!(err.is_throttled());
    assert_eq!(err.status(), Some(429));

    let broken = EngageApiProvider::from_fixture_responses(vec![(500, String::new())]);
    let err = broken.fetch_events().await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 500 }));
}

#[tokio::test]
async fn error_on_a_later_page_fails_the_whole_fetch() {
    let provider = EngageApiProvider::from_fixture_responses(vec![
        (200, PAGE1.to_string()),
        (403, String::new()),
    ]);
    let err = provider.fetch_events().await.unwrap_err();
    assert!(err.is_throttled());
    assert_eq!(provider.pages_requested(), 2);
}

#[tokio::test(start_paused = true)]
async fn sleeps_between_pages_but_not_before_the_first() {
    let page = |name: &str| {
        format!(r#"{{"totalItems": 3, "value": [{{"name": "{name}", "startsOn": "2026-10-30T18:00:00Z"}}]}}"#)
    };
    let delay = Duration::from_millis(2_000);
    let provider =
        EngageApiProvider::from_fixture_pages(vec![page("One"), page("Two"), page("Three")])
            .with_page_size(1)
            .with_page_delay(delay);

    let started = tokio::time::Instant::now();
    let events = provider.fetch_events().await.expect("api fixture ok");

    assert_eq!(events.len(), 3);
    assert_eq!(provider.pages_requested(), 3);
    assert_eq!(started.elapsed(), delay * 2);
}
