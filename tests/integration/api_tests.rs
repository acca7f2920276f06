//! HTTP note API tests
//!
//! These tests use wiremock to stand in for the web API.

use crate::common::{feed_item, note};
use note_harvester::api::{ApiError, HttpNoteApi, NoteApi, FEED_PATH, SEARCH_PAGE_SIZE, SEARCH_PATH};
use note_harvester::config::Config;
use note_harvester::model::SearchParams;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_for(server: &MockServer) -> HttpNoteApi {
    let mut config = Config::default();
    config.api.base_url = server.uri();
    config.api.timeout_secs = 5;
    config.auth.cookies = "a1=abc; web_session=xyz".to_string();
    HttpNoteApi::from_config(&config).unwrap()
}

fn search_page(ids: std::ops::Range<usize>, has_more: bool) -> Value {
    let items: Vec<Value> = ids
        .map(|i| json!({ "id": format!("s{}", i), "model_type": "note", "xsec_token": "t" }))
        .collect();
    json!({ "success": true, "msg": "成功", "data": { "items": items, "has_more": has_more } })
}

#[tokio::test]
async fn test_fetch_note_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FEED_PATH))
        .and(header("cookie", "a1=abc; web_session=xyz"))
        .and(body_partial_json(
            json!({ "source_note_id": "n1", "xsec_token": "tok-n1" }),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "msg": "成功",
            "data": { "items": [feed_item("n1")] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = api_for(&server).fetch_note(&note("n1")).await.unwrap();

    assert!(reply.success);
    assert_eq!(reply.items.len(), 1);
    assert_eq!(reply.items[0]["id"], "n1");
}

#[tokio::test]
async fn test_fetch_note_remote_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FEED_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": false, "msg": "note not found" })),
        )
        .mount(&server)
        .await;

    let reply = api_for(&server).fetch_note(&note("gone")).await.unwrap();

    assert!(!reply.success);
    assert_eq!(reply.message, "note not found");
    assert!(reply.items.is_empty());
}

#[tokio::test]
async fn test_fetch_note_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = api_for(&server).fetch_note(&note("n1")).await.unwrap_err();

    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "upstream down");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_fetch_note_undecodable_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>captcha</html>"))
        .mount(&server)
        .await;

    let err = api_for(&server).fetch_note(&note("n1")).await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn test_search_pages_until_count() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(body_partial_json(json!({ "keyword": "coffee", "page": 1 })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(search_page(0..SEARCH_PAGE_SIZE, true)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .and(body_partial_json(json!({ "page": 2 })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(search_page(SEARCH_PAGE_SIZE..SEARCH_PAGE_SIZE * 2, true)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let reply = api_for(&server)
        .search_notes(&SearchParams::new("coffee", 25))
        .await
        .unwrap();

    assert!(reply.success);
    assert_eq!(reply.items.len(), 25);
    assert_eq!(reply.items[24]["id"], "s24");
}

#[tokio::test]
async fn test_search_stops_without_more_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page(0..3, false)))
        .expect(1)
        .mount(&server)
        .await;

    let reply = api_for(&server)
        .search_notes(&SearchParams::new("coffee", 50))
        .await
        .unwrap();

    assert_eq!(reply.items.len(), 3);
}

#[tokio::test]
async fn test_search_failure_is_a_failed_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "success": false, "msg": "login required" })),
        )
        .mount(&server)
        .await;

    let reply = api_for(&server)
        .search_notes(&SearchParams::new("coffee", 10))
        .await
        .unwrap();

    assert!(!reply.success);
    assert_eq!(reply.message, "login required");
}
