//! End-to-end crawl tests
//!
//! These tests run the engine and the task controller against in-memory
//! collaborators and check the progress stream, the records handed to the
//! writers and the failure accounting.

use crate::common::{note, FakeApi, Harness, Lines, TimelineFactory};
use note_harvester::crawler::{
    ChannelProgressSink, RateLimitPolicy, SubmitOutcome, TaskController, TaskOutcome,
};
use note_harvester::model::{CrawlRequest, CrawlSource, DistanceFilter, SaveMode, SearchParams};
use note_harvester::{FetchError, HarvestError, HarvesterError, ValidationError};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn urls_request(ids: &[&str], save_mode: SaveMode) -> CrawlRequest {
    CrawlRequest::new(
        CrawlSource::Urls(ids.iter().map(|id| note(id)).collect()),
        save_mode,
    )
}

fn controller() -> (TaskController, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (TaskController::new(Arc::new(ChannelProgressSink::new(tx))), rx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Ok(line) = rx.try_recv() {
        lines.push(line);
    }
    lines
}

#[tokio::test]
async fn test_partial_failure_through_controller() {
    let harness = Harness::with_api(FakeApi::failing(&["n2"]));
    let (controller, mut rx) = controller();

    let request = urls_request(&["n1", "n2", "n3"], SaveMode::ALL).with_report_name("trip");
    let outcome = controller
        .submit_crawl(harness.engine.clone(), request)
        .unwrap();
    assert_eq!(outcome, SubmitOutcome::Accepted);

    // partial failures still complete the task
    assert_eq!(controller.wait().await, Some(TaskOutcome::Completed));
    assert!(!controller.is_busy());

    let lines = drain(&mut rx);
    let per_reference: Vec<_> = lines.iter().filter(|l| l.starts_with('[')).collect();
    assert_eq!(per_reference.len(), 3);
    assert_eq!(per_reference[0], "[1/3] title n1");
    assert_eq!(
        per_reference[1],
        "[2/3] download failed: note unavailable"
    );
    assert_eq!(per_reference[2], "[3/3] title n3");
    assert_eq!(lines.first().map(String::as_str), Some("crawl-notes started"));
    assert_eq!(lines.last().map(String::as_str), Some("crawl-notes completed"));
    assert!(lines.contains(&"done: 2 succeeded, 1 failed".to_string()));

    let (name, records) = harness.report.only();
    assert_eq!(name, "trip");
    let ids: Vec<_> = records.iter().map(|r| r.note_id.as_str()).collect();
    assert_eq!(ids, vec!["n1", "n3"]);
    assert_eq!(harness.media.saved.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_engine_reports_failures_in_order() {
    let harness = Harness::with_api(FakeApi::failing(&["n2"]));
    let lines = Lines::default();

    let outcome = harness
        .engine
        .execute(urls_request(&["n1", "n2", "n3"], SaveMode::MEDIA), &lines)
        .await
        .unwrap();

    assert_eq!(outcome.processed, 3);
    assert_eq!(outcome.succeeded(), 2);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].reference, note("n2"));
    assert_eq!(
        outcome.failures[0].error,
        FetchError::Remote("note unavailable".to_string())
    );
    assert_eq!(outcome.records[0].note_url, note("n1"));
    assert_eq!(harness.api.fetched(), vec!["n1", "n2", "n3"]);
    assert!(harness.report.reports.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_cap_selects_prefix() {
    let harness = Harness::with_api(FakeApi::default());
    let lines = Lines::default();

    let request = urls_request(&["n1", "n2", "n3", "n4", "n5"], SaveMode::MEDIA).with_cap(2);
    let outcome = harness.engine.execute(request, &lines).await.unwrap();

    assert_eq!(outcome.processed, 2);
    assert_eq!(harness.api.fetched(), vec!["n1", "n2"]);
    assert_eq!(lines.per_reference(), vec!["[1/2] title n1", "[2/2] title n2"]);
}

#[tokio::test]
async fn test_zero_cap_is_unbounded() {
    let harness = Harness::with_api(FakeApi::default());

    let request = urls_request(&["n1", "n2", "n3"], SaveMode::MEDIA).with_cap(0);
    let outcome = harness
        .engine
        .execute(request, &Lines::default())
        .await
        .unwrap();

    assert_eq!(outcome.processed, 3);
}

#[tokio::test]
async fn test_repeated_references_fetched_once() {
    let harness = Harness::with_api(FakeApi::default());

    let request = urls_request(&["n1", "n2", "n1"], SaveMode::MEDIA);
    harness
        .engine
        .execute(request, &Lines::default())
        .await
        .unwrap();

    assert_eq!(harness.api.fetched(), vec!["n1", "n2"]);
}

#[tokio::test]
async fn test_rerun_is_reproducible() {
    let harness = Harness::with_api(FakeApi::failing(&["n3"]));
    let request = urls_request(&["n4", "n3", "n1"], SaveMode::MEDIA).with_cap(3);

    let first = harness
        .engine
        .execute(request.clone(), &Lines::default())
        .await
        .unwrap();
    let second = harness
        .engine
        .execute(request, &Lines::default())
        .await
        .unwrap();

    let ids = |outcome: &note_harvester::BatchOutcome| -> Vec<String> {
        outcome.records.iter().map(|r| r.note_id.clone()).collect()
    };
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(first.failures, second.failures);
}

#[tokio::test]
async fn test_missing_report_name_fetches_nothing() {
    let harness = Harness::with_api(FakeApi::default());
    let (controller, _rx) = controller();

    let result = controller.submit_crawl(harness.engine.clone(), urls_request(&["n1"], SaveMode::ALL));

    assert_eq!(result, Err(ValidationError::MissingReportName));
    assert!(!controller.is_busy());
    assert_eq!(harness.api.calls(), 0);

    let err = harness
        .engine
        .execute(urls_request(&["n1"], SaveMode::REPORT), &Lines::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HarvesterError::Validation(ValidationError::MissingReportName)
    ));
    assert_eq!(harness.api.calls(), 0);
}

#[tokio::test]
async fn test_distance_filter_without_geo_is_rejected() {
    let harness = Harness::with_api(FakeApi::default());
    let (controller, mut rx) = controller();

    let mut params = SearchParams::new("coffee", 10);
    params.distance = DistanceFilter::SameCity;
    let request = CrawlRequest::new(CrawlSource::Search(params), SaveMode::ALL);

    let result = controller.submit_crawl(harness.engine.clone(), request);

    assert!(matches!(result, Err(ValidationError::MissingGeo { .. })));
    assert_eq!(harness.api.calls(), 0);
    assert_eq!(harness.sessions.opened.load(Ordering::SeqCst), 0);
    assert!(!controller.is_busy());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_second_crawl_rejected_while_busy() {
    let harness = Harness::with_api(FakeApi::default());
    let (controller, mut rx) = controller();

    let first = controller
        .submit_crawl(harness.engine.clone(), urls_request(&["n1"], SaveMode::MEDIA))
        .unwrap();
    let second = controller
        .submit_crawl(harness.engine.clone(), urls_request(&["n2"], SaveMode::MEDIA))
        .unwrap();

    assert_eq!(first, SubmitOutcome::Accepted);
    assert_eq!(second, SubmitOutcome::RejectedBusy);

    assert_eq!(controller.wait().await, Some(TaskOutcome::Completed));
    assert!(!controller.is_busy());
    assert_eq!(harness.api.fetched(), vec!["n1"]);
    assert!(drain(&mut rx).contains(&"crawl-notes rejected: another task is running".to_string()));
}

#[tokio::test]
async fn test_search_crawl_keeps_only_notes() {
    let api = FakeApi {
        search_items: vec![
            json!({ "id": "s1", "model_type": "note", "xsec_token": "t1" }),
            json!({ "id": "hot", "model_type": "rec_query" }),
            json!({ "id": "s2", "model_type": "note", "xsec_token": "t2" }),
            json!({ "id": "s1", "model_type": "note", "xsec_token": "t1" }),
        ],
        ..FakeApi::default()
    };
    let harness = Harness::with_api(api);

    let request = CrawlRequest::new(
        CrawlSource::Search(SearchParams::new(" coffee ", 10)),
        SaveMode::ALL,
    );
    let outcome = harness
        .engine
        .execute(request, &Lines::default())
        .await
        .unwrap();

    assert_eq!(harness.api.fetched(), vec!["s1", "s2"]);
    assert_eq!(outcome.records[1].note_url.xsec_token().as_deref(), Some("t2"));
    let (name, records) = harness.report.only();
    assert_eq!(name, "coffee");
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn test_search_count_clamped_to_cap() {
    let api = FakeApi {
        search_items: (0..10)
            .map(|i| json!({ "id": format!("s{}", i), "model_type": "note", "xsec_token": "t" }))
            .collect(),
        ..FakeApi::default()
    };
    let harness = Harness::with_api(api);

    let request = CrawlRequest::new(
        CrawlSource::Search(SearchParams::new("coffee", 10)),
        SaveMode::MEDIA,
    )
    .with_cap(3);
    harness
        .engine
        .execute(request, &Lines::default())
        .await
        .unwrap();

    assert_eq!(harness.api.fetched(), vec!["s0", "s1", "s2"]);
}

#[tokio::test]
async fn test_search_failure_fails_the_task() {
    let api = FakeApi {
        search_failure: Some("login required".to_string()),
        ..FakeApi::default()
    };
    let harness = Harness::with_api(api);
    let (controller, mut rx) = controller();

    let request = CrawlRequest::new(
        CrawlSource::Search(SearchParams::new("coffee", 5)),
        SaveMode::MEDIA,
    );
    controller
        .submit_crawl(harness.engine.clone(), request)
        .unwrap();
    match controller.wait().await {
        Some(TaskOutcome::Failed(reason)) => assert!(reason.contains("login required")),
        other => panic!("unexpected outcome: {:?}", other),
    }

    let lines = drain(&mut rx);
    let last = lines.last().unwrap();
    assert!(last.starts_with("crawl-search failed: "), "{}", last);
    assert!(last.contains("login required"));
    assert!(harness.api.fetched().is_empty());
    assert!(!controller.is_busy());
}

#[tokio::test]
async fn test_user_crawl_harvests_then_fetches() {
    let sessions = TimelineFactory::new(vec![vec!["u3", "u1"], vec!["u2", "u1"]]);
    let harness = Harness::new(FakeApi::default(), sessions, RateLimitPolicy::DISABLED);
    let lines = Lines::default();

    let request = CrawlRequest::new(
        CrawlSource::User {
            target: "https://www.example.com/user/profile/5f3a?xsec_source=pc".to_string(),
            scroll_limit: None,
        },
        SaveMode::ALL,
    );
    harness.engine.execute(request, &lines).await.unwrap();

    // sorted, not discovery order
    assert_eq!(harness.api.fetched(), vec!["u1", "u2", "u3"]);
    assert_eq!(harness.sessions.quits.load(Ordering::SeqCst), 1);
    assert!(lines.all().contains(&"found 3 notes".to_string()));

    let (name, _) = harness.report.only();
    assert_eq!(name, "5f3a");
    let saved = harness.media.saved.lock().unwrap();
    assert!(saved.iter().all(|(_, mode)| *mode == SaveMode::ALL.images_only()));
}

#[tokio::test]
async fn test_user_crawl_navigation_failure() {
    let mut sessions = TimelineFactory::new(vec![vec!["u1"]]);
    sessions.fail_navigation = true;
    let harness = Harness::new(FakeApi::default(), sessions, RateLimitPolicy::DISABLED);

    let request = CrawlRequest::new(
        CrawlSource::User {
            target: "https://www.example.com/user/profile/5f3a".to_string(),
            scroll_limit: Some(3),
        },
        SaveMode::MEDIA,
    );
    let err = harness
        .engine
        .execute(request, &Lines::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        HarvesterError::Harvest(HarvestError::Navigation { .. })
    ));
    assert!(harness.api.fetched().is_empty());
    assert_eq!(harness.sessions.quits.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_batch_respects_rate_limit() {
    let policy = RateLimitPolicy {
        max_per_window: 2,
        window: Duration::from_secs(10),
        min_interval: Duration::ZERO,
    };
    let harness = Harness::new(FakeApi::default(), TimelineFactory::default(), policy);

    let start = tokio::time::Instant::now();
    harness
        .engine
        .execute(
            urls_request(&["n1", "n2", "n3"], SaveMode::MEDIA),
            &Lines::default(),
        )
        .await
        .unwrap();

    assert_eq!(harness.api.fetched().len(), 3);
    assert!(start.elapsed() >= Duration::from_secs(10));
}
