//! Media and report writer tests

use crate::common::note;
use chrono::Utc;
use note_harvester::model::{NoteKind, Record, SaveMode};
use note_harvester::output::{
    load_statistics, HttpMediaWriter, MediaWriter, ReportWriter, SqliteReportWriter,
};
use note_harvester::storage::{open_report, ReportStore};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn record(id: &str, kind: NoteKind, media_base: &str) -> Record {
    let (image_list, video_cover, video_addr) = match kind {
        NoteKind::Album => (
            vec![
                format!("{}/img/{}-0.jpg", media_base, id),
                format!("{}/img/{}-1.jpg", media_base, id),
            ],
            None,
            None,
        ),
        NoteKind::Video => (
            vec![format!("{}/img/{}-cover.jpg", media_base, id)],
            Some(format!("{}/img/{}-cover.jpg", media_base, id)),
            Some(format!("{}/video/{}.mp4", media_base, id)),
        ),
    };

    Record {
        note_id: id.to_string(),
        note_url: note(id),
        note_type: kind,
        user_id: "u1".to_string(),
        home_url: "https://www.example.com/user/profile/u1".to_string(),
        nickname: "ann".to_string(),
        avatar: String::new(),
        title: format!("trip/{}", id),
        desc: String::new(),
        liked_count: 10,
        collected_count: 2,
        comment_count: 1,
        share_count: 0,
        video_cover,
        video_addr,
        image_list,
        tags: vec!["travel".to_string()],
        upload_time: None,
        ip_location: String::new(),
        fetched_at: Utc::now(),
    }
}

async fn media_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/video/v1.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 32]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 8]))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_album_media_layout() {
    let server = media_server().await;
    let dir = TempDir::new().unwrap();
    let writer = HttpMediaWriter::new(reqwest::Client::new(), dir.path());
    let album = record("a1", NoteKind::Album, &server.uri());

    let summary = writer.write_media(&album, SaveMode::ALL).await.unwrap();

    let target = dir.path().join("ann_u1").join("trip_a1_a1");
    assert_eq!(summary.directory.as_deref(), Some(target.as_path()));
    assert_eq!(summary.files, 2);
    assert!(target.join("info.json").is_file());
    assert!(target.join("image_0.jpg").is_file());
    assert!(target.join("image_1.jpg").is_file());
}

#[tokio::test]
async fn test_video_skipped_by_image_mode() {
    let server = media_server().await;
    let dir = TempDir::new().unwrap();
    let writer = HttpMediaWriter::new(reqwest::Client::new(), dir.path());
    let video = record("v1", NoteKind::Video, &server.uri());

    let skipped = writer
        .write_media(&video, SaveMode::MEDIA_IMAGE)
        .await
        .unwrap();
    assert!(skipped.directory.is_none());

    let written = writer
        .write_media(&video, SaveMode::MEDIA_VIDEO)
        .await
        .unwrap();
    let target = written.directory.unwrap();
    assert_eq!(written.files, 2);
    assert_eq!(std::fs::read(target.join("video.mp4")).unwrap().len(), 32);
    assert!(target.join("cover.jpg").is_file());
}

#[tokio::test]
async fn test_failed_download_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let writer = HttpMediaWriter::new(reqwest::Client::new(), dir.path());

    let result = writer
        .write_media(&record("a1", NoteKind::Album, &server.uri()), SaveMode::MEDIA)
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_report_round_trip_and_statistics() {
    let dir = TempDir::new().unwrap();
    let writer = SqliteReportWriter::new(dir.path().join("reports"));
    let records = vec![
        record("a1", NoteKind::Album, "https://img.example.com"),
        record("v1", NoteKind::Video, "https://img.example.com"),
    ];

    let path = writer.write_report(&records, "summer trip").await.unwrap();
    assert!(path.ends_with("summer trip.sqlite"));

    let store = open_report(&path).unwrap();
    let loaded = store.load_records().unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[1].note_type, NoteKind::Video);

    let stats = load_statistics(&store).unwrap();
    assert_eq!(stats.total_notes, 2);
    assert_eq!(stats.video_notes, 1);
    assert_eq!(stats.total_likes, 20);
    assert_eq!(stats.meta.unwrap().name, "summer trip");
}

#[tokio::test]
async fn test_empty_report_is_written() {
    let dir = TempDir::new().unwrap();
    let writer = SqliteReportWriter::new(dir.path());

    let path = writer.write_report(&[], "nothing").await.unwrap();

    let store = open_report(&path).unwrap();
    assert!(store.load_records().unwrap().is_empty());
    assert_eq!(store.meta().unwrap().unwrap().record_count, 0);
}
