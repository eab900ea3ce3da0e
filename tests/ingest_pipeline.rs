// tests/ingest_pipeline.rs
use events_hub_scraper::ingest::providers::engage_api::EngageApiProvider;
use events_hub_scraper::ingest::providers::ical_feed::IcalFeedProvider;
use events_hub_scraper::EventSource;

const PAGE1: &str = include_str!("fixtures/engage_page1.json");
const PAGE2: &str = include_str!("fixtures/engage_page2.json");
const FEED: &str = include_str!("fixtures/feed_two_events.ics");

#[tokio::test]
async fn both_sources_share_one_schema() {
    let api = EngageApiProvider::from_fixture_pages(vec![PAGE1.into(), PAGE2.into()]);
    let feed = IcalFeedProvider::from_fixture_str(FEED);

    let mut all = api.fetch_events().await.expect("api ok");
    all.extend(feed.fetch_events().await.expect("feed ok"));

    assert_eq!(all.len(), 5);
    for e in &all {
        assert_eq!(e.event_id.len(), 32);
        assert!(!e.title.is_empty());
        assert!(!e.source_url.is_empty());
        assert_ne!(e.description.as_deref(), Some(""));
    }
}

#[tokio::test]
async fn same_title_and_start_collapse_across_sources() {
    let page = r#"{"value": [{"id": 1, "name": "Resume Workshop", "startsOn": "2026-10-20T14:00:00-04:00", "location": "Somewhere else"}]}"#;
    let api = EngageApiProvider::from_fixture_pages(vec![page.into()]);
    let feed = IcalFeedProvider::from_fixture_str(FEED);

    let from_api = api.fetch_events().await.unwrap();
    let from_feed = feed.fetch_events().await.unwrap();
    let workshop = from_feed
        .iter()
        .find(|e| e.title == "Resume Workshop")
        .unwrap();

    assert_eq!(from_api[0].event_id, workshop.event_id);
}
