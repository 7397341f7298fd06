use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::GithubError;
use crate::rate_limit::RateLimits;

/// `state` filter of the issue listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IssueState {
    #[default]
    Open,
    All,
}

impl IssueState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::All => "all",
        }
    }
}

impl fmt::Display for IssueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One page of the issue listing.
#[derive(Debug, Clone, Default)]
pub struct IssuePage {
    /// Raw issue objects, pull requests included.
    pub items: Vec<Value>,
    /// Page to request next, `None` on the last page.
    pub next_page: Option<u32>,
}

/// The GitHub operations the collector relies on.
#[async_trait]
pub trait GithubApi: Send + Sync {
    /// Issues of `user/repo` sorted by ascending creation date.
    async fn list_issues(
        &self,
        user: &str,
        repo: &str,
        state: IssueState,
        page: u32,
        per_page: u32,
    ) -> Result<IssuePage, GithubError>;

    async fn pull_request(&self, user: &str, repo: &str, number: u64) -> Result<Value, GithubError>;

    /// Labels attached to issue (or pull request) `number`.
    async fn issue_labels(&self, user: &str, repo: &str, number: u64) -> Result<Vec<Value>, GithubError>;

    async fn rate_limits(&self) -> Result<RateLimits, GithubError>;
}
