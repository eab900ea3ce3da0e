// tests/state_file.rs
mod common;

use common::{MockSource, SOURCE};
use events_hub_scraper::state::{Health, ResetOutcome};
use events_hub_scraper::store::MemoryStore;
use events_hub_scraper::{
    reset_kill_switch, FailureState, JsonFileStateStore, Pipeline, ScraperConfig, StateStore,
};
use std::fs;

#[tokio::test]
async fn missing_file_loads_as_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStateStore::new(dir.path().join("state.json"));
    assert!(store.load().await.unwrap().is_none());
}

#[tokio::test]
async fn save_creates_dirs_and_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("state.json");
    let store = JsonFileStateStore::new(&path);

    let mut st = FailureState::default();
    st.record_failure(SOURCE, chrono::Utc::now(), 3);
    store.save(&st).await.unwrap();

    assert_eq!(store.path(), path.as_path());
    assert!(path.exists());
    assert!(!dir.path().join("nested").join("state.json.tmp").exists());
    let loaded = store.load().await.unwrap().unwrap();
    assert_eq!(loaded, st);
}

#[tokio::test]
async fn reads_documents_written_by_the_previous_runner() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    fs::write(
        &path,
        r#"{
  "getinvolved": {
    "consecutive_failures": 3,
    "kill_switch": true,
    "last_success": null,
    "last_attempt": "2026-10-17T06:00:01.123456+00:00"
  }
}"#,
    )
    .unwrap();

    let store = JsonFileStateStore::new(&path);
    let st = store.load().await.unwrap().unwrap();
    assert_eq!(st.health(SOURCE), Health::Blocked);
    assert!(st.get(SOURCE).last_attempt.is_some());
}

#[tokio::test]
async fn corrupt_file_does_not_block_a_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    fs::write(&path, "{ not json").unwrap();
    let states = JsonFileStateStore::new(&path);
    assert!(states.load().await.is_err());

    let cfg = ScraperConfig::default();
    let api = MockSource::http_error("api", 500);
    let feed = MockSource::http_error("feed", 500);
    let store = MemoryStore::new();
    let summary = Pipeline::new(&api, &feed, &store, &cfg).run_once(&states).await;

    assert!(summary.is_error());
    assert_eq!(api.calls(), 1);
    // rewritten as a valid document with one failure
    let st = states.load().await.unwrap().unwrap();
    assert_eq!(st.health(SOURCE), Health::Healthy(1));
}

#[tokio::test]
async fn reset_clears_all_sources() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStateStore::new(dir.path().join("state.json"));

    assert_eq!(
        reset_kill_switch(&store).await.unwrap(),
        ResetOutcome::NothingToReset
    );

    let now = chrono::Utc::now();
    let mut st = FailureState::default();
    for _ in 0..3 {
        st.record_failure(SOURCE, now, 3);
    }
    st.record_failure("other", now, 3);
    store.save(&st).await.unwrap();

    assert_eq!(
        reset_kill_switch(&store).await.unwrap(),
        ResetOutcome::Reset { sources: 2 }
    );
    let st = store.load().await.unwrap().unwrap();
    let names: Vec<&str> = st.sources().map(|(name, _)| name).collect();
    assert_eq!(names, vec![SOURCE, "other"]);
    for (name, s) in st.sources() {
        assert_eq!(s.health(), Health::Healthy(0), "{name} still blocked");
    }
}
