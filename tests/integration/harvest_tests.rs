//! Link harvester tests against a scripted timeline page

use crate::common::{settings, Lines, TimelineFactory};
use note_harvester::crawler::{LinkHarvester, RateLimitPolicy};
use note_harvester::HarvestError;
use std::sync::atomic::Ordering;
use std::sync::Arc;

const PROFILE: &str = "https://www.example.com/user/profile/5f3a";

fn harvester(factory: &Arc<TimelineFactory>) -> LinkHarvester {
    LinkHarvester::new(factory.clone(), settings(RateLimitPolicy::DISABLED).harvest)
}

fn ids(refs: &[note_harvester::NoteRef]) -> Vec<String> {
    refs.iter()
        .map(|r| r.note_id().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_growing_timeline_is_fully_collected() {
    let factory = Arc::new(TimelineFactory::new(vec![
        vec!["d", "b"],
        vec!["b", "a"],
        vec!["c", "d"],
    ]));
    let lines = Lines::default();

    let refs = harvester(&factory)
        .harvest(PROFILE, None, None, &lines)
        .await
        .unwrap();

    assert_eq!(ids(&refs), vec!["a", "b", "c", "d"]);
    assert!(refs
        .iter()
        .all(|r| r.xsec_token().map_or(false, |t| t.starts_with("tok-"))));
    // two growing scrolls, then two unchanged ones
    assert_eq!(lines.all().len(), 4);
    assert_eq!(lines.all().last().unwrap(), "scroll 4: 4 notes found");
    assert_eq!(factory.quits.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_zero_scroll_limit_means_unbounded() {
    let factory = Arc::new(TimelineFactory::new(vec![vec!["a"], vec!["b"], vec!["c"]]));
    let lines = Lines::default();

    let refs = harvester(&factory)
        .harvest(PROFILE, Some(0), None, &lines)
        .await
        .unwrap();

    assert_eq!(refs.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_scroll_limit_stops_early() {
    let factory = Arc::new(TimelineFactory::new(vec![vec!["a"], vec!["b"], vec!["c"]]));
    let lines = Lines::default();

    let refs = harvester(&factory)
        .harvest(PROFILE, Some(1), None, &lines)
        .await
        .unwrap();

    assert_eq!(ids(&refs), vec!["a"]);
    assert_eq!(lines.all(), vec!["scroll 1: 1 notes found"]);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_harvests_agree() {
    let factory = Arc::new(TimelineFactory::new(vec![vec!["z", "m"], vec!["a"]]));
    let harvester = harvester(&factory);

    let first = harvester
        .harvest(PROFILE, None, None, &Lines::default())
        .await
        .unwrap();
    let second = harvester
        .harvest(PROFILE, None, None, &Lines::default())
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(factory.quits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_navigation_failure_discards_everything() {
    let mut factory = TimelineFactory::new(vec![vec!["a"]]);
    factory.fail_navigation = true;
    let factory = Arc::new(factory);

    let err = harvester(&factory)
        .harvest(PROFILE, None, None, &Lines::default())
        .await
        .unwrap_err();

    match err {
        HarvestError::Navigation { url, .. } => assert_eq!(url, PROFILE),
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(factory.quits.load(Ordering::SeqCst), 1);
}
