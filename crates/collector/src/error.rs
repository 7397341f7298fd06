use thiserror::Error;
use vossibility_elasticsearch::ElasticsearchError;
use vossibility_github::GithubError;
use vossibility_queue::QueueError;

use crate::config::ConfigError;

/// Errors that end a collector command.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("elasticsearch error: {0}")]
    Elasticsearch(#[from] ElasticsearchError),

    #[error("github error: {0}")]
    Github(#[from] GithubError),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// A consumer task panicked or was aborted.
    #[error("consumer task aborted: {0}")]
    ConsumerAborted(String),

    #[error("unknown repository {0:?}")]
    UnknownRepository(String),

    /// The users file could not be read or parsed.
    #[error("users file {path}: {reason}")]
    UsersFile { path: String, reason: String },
}
