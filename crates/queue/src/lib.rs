//! Webhook delivery over Redis Streams.
//!
//! Each repository topic is a stream `<prefix>:<topic>` read through a
//! consumer group. A message is acknowledged once its handler succeeds; a
//! failed message stays in the group's pending list and is delivered again
//! after a delay, up to a bounded number of attempts.

pub mod config;
pub mod consumer;
pub mod error;
pub mod handler;
pub mod message;
mod retry;

pub use config::RedisQueueConfig;
pub use consumer::{StreamConsumer, connect};
pub use error::{HandlerError, QueueError};
pub use handler::{Disposition, MessageHandler};
pub use message::Message;
