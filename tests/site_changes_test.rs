// ABOUTME: Integration tests for infusion site change tracking
// ABOUTME: Validates event storage, today's seed, and the daily backfill from event history
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use chrono_tz::Tz;
use common::{at, init_test_logging, items, TEST_ACCOUNT};
use insite_core::errors::ErrorCode;
use insite_sync::persistence::{DocumentPath, DocumentStore, InMemoryDocumentStore, StreamUploader};
use insite_sync::site_changes::SiteChangeTracker;
use serde_json::json;
use std::sync::Arc;

fn tracker(memory: &InMemoryDocumentStore) -> SiteChangeTracker {
    init_test_logging();
    SiteChangeTracker::new(StreamUploader::new(Arc::new(memory.clone()), TEST_ACCOUNT))
}

#[tokio::test]
async fn test_first_change_seeds_today_only() {
    let memory = InMemoryDocumentStore::new();
    let outcome = tracker(&memory)
        .record_site_change("abdomen", Tz::UTC, at("2025-05-10T08:00:00Z"))
        .await
        .unwrap();

    assert_eq!(outcome.days.len(), 1);
    assert_eq!(outcome.days[0].days_since_change, 0);
    assert!(outcome.uploads.is_complete());

    let event = memory
        .get(&DocumentPath::new(
            items("site_changes", "events"),
            outcome.event.id.to_string(),
        ))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event["location"], json!("abdomen"));
    assert_eq!(event["localTz"], json!("UTC"));
    assert_eq!(event["timestamp"], json!("2025-05-10T08:00:00Z"));

    let today = memory
        .get(&DocumentPath::new(items("site_changes", "daily"), "site-2025-05-10"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(today["daysSinceChange"], json!(0));
    assert_eq!(today["location"], json!("abdomen"));
}

#[tokio::test]
async fn test_later_change_rebuilds_recent_days_from_history() {
    let memory = InMemoryDocumentStore::new();
    let tracker = tracker(&memory);
    tracker
        .record_site_change("abdomen", Tz::UTC, at("2025-05-01T08:00:00Z"))
        .await
        .unwrap();

    let outcome = tracker
        .record_site_change("left arm", Tz::UTC, at("2025-05-04T20:00:00Z"))
        .await
        .unwrap();

    // Window is 2025-04-21..=2025-05-04; days before the first change are skipped
    let summary: Vec<(String, i64, &str)> = outcome
        .days
        .iter()
        .map(|day| (day.date.to_string(), day.days_since_change, day.location.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("2025-05-01".to_owned(), 0, "abdomen"),
            ("2025-05-02".to_owned(), 1, "abdomen"),
            ("2025-05-03".to_owned(), 2, "abdomen"),
            ("2025-05-04".to_owned(), 0, "left arm"),
        ]
    );
    assert_eq!(tracker.history().await.unwrap().len(), 2);
    assert_eq!(memory.document_count(&items("site_changes", "daily")).await, 4);
}

#[tokio::test]
async fn test_backfill_window_is_bounded() {
    let memory = InMemoryDocumentStore::new();
    let tracker = tracker(&memory).with_backfill_days(3);
    tracker
        .record_site_change("thigh", Tz::UTC, at("2025-05-01T08:00:00Z"))
        .await
        .unwrap();

    let outcome = tracker
        .record_site_change("thigh", Tz::UTC, at("2025-05-20T08:00:00Z"))
        .await
        .unwrap();

    let dates: Vec<String> = outcome.days.iter().map(|day| day.date.to_string()).collect();
    assert_eq!(dates, vec!["2025-05-18", "2025-05-19", "2025-05-20"]);
    assert_eq!(outcome.days[0].days_since_change, 17);
}

#[tokio::test]
async fn test_days_follow_local_calendar() {
    let memory = InMemoryDocumentStore::new();
    // 02:00 UTC on the 10th is still the 9th in Los Angeles
    let outcome = tracker(&memory)
        .record_site_change("hip", Tz::America__Los_Angeles, at("2025-05-10T02:00:00Z"))
        .await
        .unwrap();

    assert_eq!(outcome.days.len(), 1);
    assert_eq!(outcome.days[0].date.to_string(), "2025-05-09");
    assert_eq!(outcome.days[0].day_start, at("2025-05-09T07:00:00Z"));
}

#[tokio::test]
async fn test_blank_location_is_rejected() {
    let memory = InMemoryDocumentStore::new();
    let error = tracker(&memory)
        .record_site_change("   ", Tz::UTC, at("2025-05-10T08:00:00Z"))
        .await
        .unwrap_err();

    assert_eq!(error.code, ErrorCode::InvalidInput);
    assert_eq!(memory.total_documents().await, 0);
}

#[tokio::test]
async fn test_failed_event_write_stops_before_daily_stream() {
    let memory = InMemoryDocumentStore::new();
    memory.fail_next_commits(1);

    let error = tracker(&memory)
        .record_site_change("abdomen", Tz::UTC, at("2025-05-10T08:00:00Z"))
        .await
        .unwrap_err();

    assert_eq!(error.code, ErrorCode::StorageError);
    assert_eq!(memory.document_count(&items("site_changes", "daily")).await, 0);
}
