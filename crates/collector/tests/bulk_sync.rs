mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use vossibility_collector::{SyncJob, SyncOptions};
use vossibility_github::IssueState;
use vossibility_store::{IndexedBlob, MemoryIndexer, Tier};

use common::FakeGithub;

fn options() -> SyncOptions {
    SyncOptions {
        num_fetch_workers: 2,
        num_index_workers: 2,
        per_page: 2,
        ..SyncOptions::default()
    }
}

fn sorted_writes(indexer: &MemoryIndexer) -> Vec<IndexedBlob> {
    let mut writes = indexer.writes();
    writes.sort_by_key(|w| w.blob.id().parse::<u64>().unwrap());
    writes
}

#[tokio::test]
async fn walks_every_page_into_the_snapshot() {
    let github = Arc::new(
        FakeGithub::new()
            .with_page(vec![common::issue(1, "First"), common::pull_request_issue(2)])
            .with_page(vec![common::issue(3, "Third")])
            .with_pull_request(json!({ "number": 2, "title": "PR 2", "merged": true, "labels": [] })),
    );
    let indexer = Arc::new(MemoryIndexer::default());
    let config = common::config();
    let repositories: Vec<_> = config.repositories.values().cloned().collect();

    let job = SyncJob::new(github.clone(), common::store(&indexer), options());
    let report = job.run(&repositories).await;

    assert!(report.is_complete());
    assert_eq!(report.stored(), 3);
    let engine = &report.repositories[0];
    assert_eq!((engine.repository.as_str(), engine.listed, engine.failed), ("engine", 3, 0));

    let writes = sorted_writes(&indexer);
    assert!(writes.iter().all(|w| w.index == "engine-snapshot"));
    assert_eq!(writes[0].blob.kind(), "issue");
    assert_eq!(writes[0].blob.get("title"), Some(&json!("First")));
    assert_eq!(writes[1].blob.kind(), "pull_request");
    assert_eq!(writes[1].blob.get("merged"), Some(&json!(true)));
    assert_eq!(writes[1].blob.get("labels"), Some(&json!("status/needs-review")));
    assert_eq!(writes[2].blob.id(), "3");

    let calls = github.calls();
    assert_eq!(calls[0], "list docker/engine state=all page=1 per_page=2");
    assert!(calls.contains(&"list docker/engine state=all page=2 per_page=2".to_owned()));
    assert!(calls.contains(&"pull docker/engine#2".to_owned()));
}

#[tokio::test]
async fn unavailable_pull_request_is_stored_as_issue() {
    let github = Arc::new(FakeGithub::new().with_page(vec![common::pull_request_issue(5)]));
    let indexer = Arc::new(MemoryIndexer::default());
    let config = common::config();
    let repositories: Vec<_> = config.repositories.values().cloned().collect();

    let report = SyncJob::new(github, common::store(&indexer), options())
        .run(&repositories)
        .await;

    assert_eq!(report.stored(), 1);
    let writes = indexer.writes();
    assert_eq!(writes[0].blob.kind(), "issue");
    assert_eq!(writes[0].blob.get("title"), Some(&json!("PR 5")));
}

#[tokio::test]
async fn listing_failure_aborts_the_repository() {
    let github = Arc::new(
        FakeGithub::new()
            .with_page(vec![common::issue(1, "First"), common::issue(2, "Second")])
            .with_page(vec![common::issue(3, "Third")])
            .failing_page(2),
    );
    let indexer = Arc::new(MemoryIndexer::default());
    let config = common::config();
    let repositories: Vec<_> = config.repositories.values().cloned().collect();

    let report = SyncJob::new(github, common::store(&indexer), options())
        .run(&repositories)
        .await;

    assert!(!report.is_complete());
    let engine = &report.repositories[0];
    assert_eq!(engine.stored, 2, "items of earlier pages are still stored");
    assert!(engine.error.as_deref().unwrap().contains("502"));
    assert!(report.to_string().starts_with("engine: 2 listed, 2 stored, 0 failed (aborted:"));
}

#[tokio::test]
async fn storage_failures_are_counted_and_skipped() {
    let github = Arc::new(FakeGithub::new().with_page(vec![common::issue(1, "First")]));
    let indexer = Arc::new(MemoryIndexer::failing_on("engine-snapshot"));
    let config = common::config();
    let repositories: Vec<_> = config.repositories.values().cloned().collect();

    let report = SyncJob::new(github, common::store(&indexer), options())
        .run(&repositories)
        .await;

    assert!(report.is_complete());
    assert_eq!((report.repositories[0].stored, report.repositories[0].failed), (0, 1));
}

#[tokio::test]
async fn listing_starts_at_the_page_of_the_first_issue() {
    let github = Arc::new(FakeGithub::new());
    let indexer = Arc::new(MemoryIndexer::default());
    let config = common::config();
    let repositories: Vec<_> = config.repositories.values().cloned().collect();

    let job = SyncJob::new(
        github.clone(),
        common::store(&indexer),
        SyncOptions {
            from: 250,
            per_page: 100,
            ..options()
        },
    );
    assert_eq!(job.options().start_page(&repositories[0]), 3);
    job.run(&repositories).await;
    assert_eq!(github.calls(), vec!["list docker/engine state=all page=3 per_page=100"]);
}

#[test]
fn zero_from_uses_the_repository_start_index() {
    let config = common::config();
    let mut repository = (*config.repositories["engine"]).clone();
    repository.start_index = 1200;
    let options = SyncOptions {
        from: 0,
        ..SyncOptions::default()
    };
    assert_eq!(options.start_page(&repository), 13);
}

#[test]
fn periodic_sync_lists_open_items_into_current_state() {
    let options = SyncOptions::periodic();
    assert_eq!(options.state, IssueState::Open);
    assert_eq!(options.tier, Tier::CurrentState);
    assert_eq!(options.sleep_per_page, Duration::from_secs(10));
    assert_eq!(options.from, 1);
}
