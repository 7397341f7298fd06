//! Bulk synchronization of a repository's issues and pull requests.
//!
//! One producer walks the paged issue listing. Plain issues go straight to
//! the index queue; pull requests first go through fetch workers that
//! retrieve their full representation. Index workers turn items into blobs
//! and store them at the job's tier.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use vossibility_github::{GithubApi, GithubItem, IssueState};
use vossibility_store::{BlobStore, Repository, Tier};

pub const DEFAULT_FROM: u64 = 1;
pub const DEFAULT_NUM_FETCH_WORKERS: usize = 20;
pub const DEFAULT_NUM_INDEX_WORKERS: usize = 5;
pub const DEFAULT_PER_PAGE: u32 = 100;

/// Pause between pages of the periodic sync, to stay clear of GitHub's
/// abuse detection.
pub const PERIODIC_SLEEP_PER_PAGE: Duration = Duration::from_secs(10);

/// Parameters of a sync job.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Issue number to start from; `0` uses each repository's
    /// `start_index`.
    pub from: u64,
    pub num_fetch_workers: usize,
    pub num_index_workers: usize,
    pub per_page: u32,
    pub sleep_per_page: Duration,
    pub state: IssueState,
    /// Tier the items are stored at.
    pub tier: Tier,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            from: DEFAULT_FROM,
            num_fetch_workers: DEFAULT_NUM_FETCH_WORKERS,
            num_index_workers: DEFAULT_NUM_INDEX_WORKERS,
            per_page: DEFAULT_PER_PAGE,
            sleep_per_page: Duration::ZERO,
            state: IssueState::All,
            tier: Tier::Snapshot,
        }
    }
}

impl SyncOptions {
    /// Options of the periodic sync: open items only, stored in the rolling
    /// current-state indices.
    pub fn periodic() -> Self {
        Self {
            sleep_per_page: PERIODIC_SLEEP_PER_PAGE,
            state: IssueState::Open,
            tier: Tier::CurrentState,
            ..Self::default()
        }
    }

    /// First page to list for `repository`.
    pub fn start_page(&self, repository: &Repository) -> u32 {
        let from = if self.from == 0 {
            repository.start_index
        } else {
            self.from
        };
        let page = from / u64::from(self.per_page.max(1)) + 1;
        u32::try_from(page).unwrap_or(u32::MAX)
    }
}

/// Outcome of one repository's job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositorySyncReport {
    pub repository: String,
    /// Items returned by the listing.
    pub listed: usize,
    pub stored: usize,
    /// Items skipped because they could not be built or stored.
    pub failed: usize,
    /// Why listing stopped early, if it did.
    pub error: Option<String>,
}

/// Outcome of a sync job, one entry per repository in run order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub repositories: Vec<RepositorySyncReport>,
}

impl SyncReport {
    pub fn stored(&self) -> usize {
        self.repositories.iter().map(|r| r.stored).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.repositories.iter().all(|r| r.error.is_none())
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in &self.repositories {
            write!(
                f,
                "{}: {} listed, {} stored, {} failed",
                r.repository, r.listed, r.stored, r.failed
            )?;
            if let Some(ref error) = r.error {
                write!(f, " (aborted: {error})")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[derive(Default)]
struct Counters {
    stored: AtomicUsize,
    failed: AtomicUsize,
}

/// Synchronizes repositories from the GitHub API into a [`BlobStore`].
#[derive(Clone)]
pub struct SyncJob {
    github: Arc<dyn GithubApi>,
    store: Arc<dyn BlobStore>,
    options: SyncOptions,
}

impl SyncJob {
    pub fn new(github: Arc<dyn GithubApi>, store: Arc<dyn BlobStore>, options: SyncOptions) -> Self {
        Self {
            github,
            store,
            options,
        }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Sync every repository in turn. Isolated item failures are logged and
    /// skipped; a listing failure ends that repository's job only.
    pub async fn run(&self, repositories: &[Arc<Repository>]) -> SyncReport {
        let mut report = SyncReport::default();
        for repository in repositories {
            report.repositories.push(self.sync_repository(repository).await);
        }
        report
    }

    async fn sync_repository(&self, repository: &Arc<Repository>) -> RepositorySyncReport {
        let counters = Arc::new(Counters::default());
        let (fetch_tx, fetch_rx) = flume::bounded::<GithubItem>(self.options.num_fetch_workers.max(1));
        let (index_tx, index_rx) = flume::bounded::<GithubItem>(self.options.num_index_workers.max(1));

        let mut indexers = JoinSet::new();
        for _ in 0..self.options.num_index_workers.max(1) {
            indexers.spawn(index_worker(
                index_rx.clone(),
                Arc::clone(&self.store),
                Arc::clone(repository),
                self.options.tier,
                Arc::clone(&counters),
            ));
        }
        drop(index_rx);

        let mut fetchers = JoinSet::new();
        for _ in 0..self.options.num_fetch_workers.max(1) {
            fetchers.spawn(fetch_worker(
                fetch_rx.clone(),
                index_tx.clone(),
                Arc::clone(&self.github),
                Arc::clone(repository),
            ));
        }
        drop(fetch_rx);

        let mut report = RepositorySyncReport {
            repository: repository.given_name.clone(),
            ..RepositorySyncReport::default()
        };
        if let Err(e) = self.list(repository, &fetch_tx, &index_tx, &mut report).await {
            error!(repository = %repository.pretty_name(), error = %e, "error syncing repository issues");
            report.error = Some(e);
        }

        // Everything to fetch is queued: fetchers drain and exit.
        drop(fetch_tx);
        while fetchers.join_next().await.is_some() {}
        debug!(repository = %repository.given_name, "done fetching GitHub API data");

        // Everything to index is queued: indexers drain and exit.
        drop(index_tx);
        while indexers.join_next().await.is_some() {}
        info!(repository = %repository.given_name, "done indexing documents");

        report.stored = counters.stored.load(Ordering::Relaxed);
        report.failed += counters.failed.load(Ordering::Relaxed);
        report
    }

    /// Walk the listing and dispatch every item.
    async fn list(
        &self,
        repository: &Repository,
        fetch_tx: &flume::Sender<GithubItem>,
        index_tx: &flume::Sender<GithubItem>,
        report: &mut RepositorySyncReport,
    ) -> Result<(), String> {
        let mut next = Some(self.options.start_page(repository));
        while let Some(page) = next {
            let listing = self
                .github
                .list_issues(
                    &repository.user,
                    &repository.repo,
                    self.options.state,
                    page,
                    self.options.per_page,
                )
                .await
                .map_err(|e| e.to_string())?;

            report.listed += listing.items.len();
            info!(repository = %repository.pretty_name(), page, count = report.listed, "retrieved items");

            for issue in listing.items {
                let item = match GithubItem::from_issue(issue) {
                    Ok(item) => item,
                    Err(e) => {
                        warn!(repository = %repository.given_name, error = %e, "skipping listed item");
                        report.failed += 1;
                        continue;
                    }
                };
                let queue = if item.is_pull_request() { fetch_tx } else { index_tx };
                queue
                    .send_async(item)
                    .await
                    .map_err(|_| "sync workers exited early".to_owned())?;
            }

            next = listing.next_page;
            if next.is_some() && !self.options.sleep_per_page.is_zero() {
                tokio::time::sleep(self.options.sleep_per_page).await;
            }
        }
        Ok(())
    }
}

/// Resolve listed pull requests into their full representation, keeping the
/// labels of the issue listing. Falls back to the issue representation.
async fn fetch_worker(
    rx: flume::Receiver<GithubItem>,
    tx: flume::Sender<GithubItem>,
    github: Arc<dyn GithubApi>,
    repository: Arc<Repository>,
) {
    while let Ok(item) = rx.recv_async().await {
        let number = item.number();
        debug!(repository = %repository.given_name, number, "fetching associated pull request");

        let fetched = match github
            .pull_request(&repository.user, &repository.repo, number)
            .await
        {
            Ok(pull_request) => GithubItem::from_pull_request(pull_request, item.payload().get("labels")),
            Err(e) => Err(e),
        };
        let resolved = fetched.unwrap_or_else(|e| {
            error!(repository = %repository.given_name, number, error = %e, "fail to retrieve pull request information");
            item.as_issue()
        });

        if tx.send_async(resolved).await.is_err() {
            break;
        }
    }
}

async fn index_worker(
    rx: flume::Receiver<GithubItem>,
    store: Arc<dyn BlobStore>,
    repository: Arc<Repository>,
    tier: Tier,
    counters: Arc<Counters>,
) {
    while let Ok(item) = rx.recv_async().await {
        let id = item.id();
        let kind = item.kind();
        match store.store(tier, &repository, item.into_blob()).await {
            Ok(()) => {
                counters.stored.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                error!(repository = %repository.given_name, kind, id = %id, error = %e, "storing item failed");
            }
        }
    }
}
