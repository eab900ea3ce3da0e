// src/ingest/providers/mod.rs
pub mod engage_api;
pub mod ical_feed;
