//! Read-only access to the parts of the GitHub REST API the collector needs:
//! paged issue listings, pull request details, issue labels and rate limits.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod item;
pub mod link;
pub mod rate_limit;

#[cfg(test)]
mod mock;

pub use api::{GithubApi, IssuePage, IssueState};
pub use client::GithubClient;
pub use config::GithubConfig;
pub use error::GithubError;
pub use item::GithubItem;
pub use rate_limit::{Rate, RateLimits};
