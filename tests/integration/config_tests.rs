//! Configuration loading tests

use note_harvester::config::{load_config, load_config_with_hash};
use note_harvester::crawler::CrawlEngine;
use note_harvester::ConfigError;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

const FULL_CONFIG: &str = r#"
[api]
base-url = "http://127.0.0.1:9000"
web-url = "https://www.example.com"
timeout-secs = 15

[network]
proxy = "http://127.0.0.1:8080"

[rate-limit]
max-per-window = 30
window-seconds = 300
min-interval = 0.5

[crawl]
max-notes = 40

[harvest]
scroll-pause-ms = 800
stable-rounds = 3
headless = false
skip-video = false

[output]
media-dir = "out/media"
report-dir = "out/reports"
"#;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_full_config_drives_engine_settings() {
    let file = write_config(FULL_CONFIG);
    let (config, hash) = load_config_with_hash(file.path()).unwrap();
    assert_eq!(hash.len(), 64);

    let engine = CrawlEngine::from_config(&config).unwrap();
    let settings = engine.settings();
    assert_eq!(settings.web_base.as_str(), "https://www.example.com/");
    assert_eq!(settings.default_cap, Some(40));
    assert!(!settings.skip_video);
    assert_eq!(settings.rate_limit.max_per_window, 30);
    assert_eq!(settings.rate_limit.window, Duration::from_secs(300));
    assert_eq!(settings.rate_limit.min_interval, Duration::from_millis(500));
    assert_eq!(settings.harvest.scroll_pause, Duration::from_millis(800));
    assert_eq!(settings.harvest.stable_rounds, 3);
}

#[test]
fn test_hash_tracks_content() {
    let a = write_config(FULL_CONFIG);
    let b = write_config(&FULL_CONFIG.replace("max-notes = 40", "max-notes = 41"));

    let (_, hash_a) = load_config_with_hash(a.path()).unwrap();
    let (_, hash_a_again) = load_config_with_hash(a.path()).unwrap();
    let (_, hash_b) = load_config_with_hash(b.path()).unwrap();

    assert_eq!(hash_a, hash_a_again);
    assert_ne!(hash_a, hash_b);
}

#[test]
fn test_empty_file_uses_defaults() {
    let file = write_config("");
    let config = load_config(file.path()).unwrap();
    assert_eq!(config.rate_limit.max_per_window, 60);
    assert_eq!(config.harvest.stable_rounds, 2);
    assert_eq!(config.crawl.max_notes, 0);
}

#[test]
fn test_invalid_values_are_rejected() {
    for bad in [
        "[rate-limit]\nwindow-seconds = 0\n",
        "[rate-limit]\nmin-interval = -1.0\n",
        "[harvest]\nstable-rounds = 0\n",
        "[api]\nweb-url = \"ftp://example.com\"\n",
    ] {
        let file = write_config(bad);
        assert!(
            load_config(file.path()).is_err(),
            "accepted invalid config: {}",
            bad
        );
    }
}

#[test]
fn test_unparseable_toml() {
    let file = write_config("[rate-limit\nmax-per-window = ");
    assert!(matches!(
        load_config(file.path()),
        Err(ConfigError::Parse(_))
    ));
}
