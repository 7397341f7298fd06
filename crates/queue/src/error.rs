use std::fmt;

use thiserror::Error;

/// Errors of the Redis transport itself.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The connection pool could not be built or yielded no connection.
    #[error("connection error: {0}")]
    Connection(String),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// A message handler failed; the message will be delivered again.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HandlerError(String);

impl HandlerError {
    pub fn new(reason: impl fmt::Display) -> Self {
        Self(reason.to_string())
    }
}
