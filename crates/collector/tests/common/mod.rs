#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use vossibility_collector::{Config, RawConfig};
use vossibility_github::{GithubApi, GithubError, IssuePage, IssueState, Rate, RateLimits};
use vossibility_store::{BlobStore, CascadingBlobStore, MemoryIndexer, TransformingBlobStore};
use vossibility_transform::{FunctionRegistry, MemoryUserStore, UserProfile};

pub const CONFIG: &str = r#"
elasticsearch = "http://localhost:9200"
sync_periodicity = "daily"

[repositories.engine]
user = "docker"
repo = "engine"
topic = "engine-events"

[event_set.default]
issues = "issue_event"
pull_request = "pull_request_event"
snapshot_issue = "issue"
snapshot_pull_request = "pull_request"

[transformations.issue_event]
action = "{{ .action }}"
issue = "{{ apply_transformation \"issue\" .issue }}"
_snapshot_id = "number"
_snapshot_field = "issue"

[transformations.pull_request_event]
action = "{{ .action }}"
labels = "{{ range .pull_request.labels }}{{ .name }}{{ end }}"

[transformations.issue]
number = "{{ .number }}"
title = ""
author = "{{ user_data .user.login }}"

[transformations.pull_request]
number = "{{ .number }}"
merged = ""
labels = "{{ range .labels }}{{ .name }}{{ end }}"
"#;

/// The test configuration, with `icecrime` as the only known user.
pub fn config() -> Config {
    let users: MemoryUserStore = [UserProfile {
        login: "icecrime".to_owned(),
        company: Some("Docker".to_owned()),
        is_maintainer: true,
    }]
    .into_iter()
    .collect();
    RawConfig::from_toml(CONFIG)
        .unwrap()
        .build(FunctionRegistry::with_builtins(Arc::new(users)))
        .unwrap()
}

/// The production store stack over an in-memory indexer.
pub fn store(indexer: &Arc<MemoryIndexer>) -> Arc<dyn BlobStore> {
    Arc::new(TransformingBlobStore::new(Arc::new(CascadingBlobStore::new(
        Arc::clone(indexer) as _,
    ))))
}

pub fn issue(number: u64, title: &str) -> Value {
    json!({
        "number": number,
        "title": title,
        "user": { "login": "icecrime" },
        "labels": [{ "name": "kind/bug" }],
    })
}

pub fn pull_request_issue(number: u64) -> Value {
    json!({
        "number": number,
        "title": format!("PR {number}"),
        "user": { "login": "someone" },
        "labels": [{ "name": "status/needs-review" }],
        "pull_request": { "url": format!("https://api.github.com/repos/docker/engine/pulls/{number}") },
    })
}

/// In-memory GitHub: pages of issues, pull request details and labels.
#[derive(Default)]
pub struct FakeGithub {
    pages: Vec<Vec<Value>>,
    failing_pages: HashSet<u32>,
    pull_requests: HashMap<u64, Value>,
    labels: HashMap<u64, Vec<Value>>,
    calls: Mutex<Vec<String>>,
    on_list: Option<Box<dyn Fn() + Send + Sync>>,
}

impl FakeGithub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pages are numbered from 1 in insertion order.
    pub fn with_page(mut self, items: Vec<Value>) -> Self {
        self.pages.push(items);
        self
    }

    pub fn failing_page(mut self, page: u32) -> Self {
        self.failing_pages.insert(page);
        self
    }

    pub fn with_pull_request(mut self, pull_request: Value) -> Self {
        let number = pull_request["number"].as_u64().unwrap();
        self.pull_requests.insert(number, pull_request);
        self
    }

    pub fn with_labels(mut self, number: u64, labels: Vec<Value>) -> Self {
        self.labels.insert(number, labels);
        self
    }

    /// Called on every listing request.
    pub fn on_list(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_list = Some(Box::new(hook));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn not_found() -> GithubError {
    GithubError::Api {
        status: 404,
        body: r#"{"message":"Not Found"}"#.to_owned(),
    }
}

#[async_trait]
impl GithubApi for FakeGithub {
    async fn list_issues(
        &self,
        user: &str,
        repo: &str,
        state: IssueState,
        page: u32,
        per_page: u32,
    ) -> Result<IssuePage, GithubError> {
        self.record(format!("list {user}/{repo} state={state} page={page} per_page={per_page}"));
        if let Some(hook) = &self.on_list {
            hook();
        }
        if self.failing_pages.contains(&page) {
            return Err(GithubError::Api {
                status: 502,
                body: "bad gateway".to_owned(),
            });
        }
        let index = usize::try_from(page).unwrap() - 1;
        let items = self.pages.get(index).cloned().unwrap_or_default();
        let next_page = (index + 1 < self.pages.len()).then_some(page + 1);
        Ok(IssuePage { items, next_page })
    }

    async fn pull_request(&self, user: &str, repo: &str, number: u64) -> Result<Value, GithubError> {
        self.record(format!("pull {user}/{repo}#{number}"));
        self.pull_requests.get(&number).cloned().ok_or_else(not_found)
    }

    async fn issue_labels(&self, user: &str, repo: &str, number: u64) -> Result<Vec<Value>, GithubError> {
        self.record(format!("labels {user}/{repo}#{number}"));
        self.labels.get(&number).cloned().ok_or_else(not_found)
    }

    async fn rate_limits(&self) -> Result<RateLimits, GithubError> {
        let rate = Rate {
            limit: 5000,
            remaining: 5000,
            reset: chrono::DateTime::UNIX_EPOCH,
        };
        Ok(RateLimits {
            core: rate.clone(),
            search: rate,
        })
    }
}
