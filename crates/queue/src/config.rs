use std::time::Duration;

use serde::Deserialize;

/// Configuration of the Redis Streams transport.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisQueueConfig {
    /// Redis connection URL (e.g. `redis://127.0.0.1:6379`).
    #[serde(default = "default_url")]
    pub url: String,

    /// Prepended to every topic to form the stream key.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Consumer group shared by every collector instance.
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Name of this consumer within the group. Generated when absent.
    #[serde(default)]
    pub consumer: Option<String>,

    /// Number of connections in the `deadpool-redis` pool.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// How long one read blocks waiting for new entries.
    #[serde(default = "default_block_ms")]
    pub block_ms: u64,

    /// Maximum entries fetched per read.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause before a failed message is delivered again.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Deliveries of one message before it is acknowledged and dropped.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_url() -> String {
    String::from("redis://127.0.0.1:6379")
}

fn default_prefix() -> String {
    String::from("vossibility")
}

fn default_channel() -> String {
    String::from("vossibility-collector")
}

fn default_pool_size() -> usize {
    8
}

fn default_block_ms() -> u64 {
    5_000
}

fn default_batch_size() -> usize {
    16
}

fn default_retry_delay_ms() -> u64 {
    1_000
}

fn default_max_attempts() -> u32 {
    5
}

impl Default for RedisQueueConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            prefix: default_prefix(),
            channel: default_channel(),
            consumer: None,
            pool_size: default_pool_size(),
            block_ms: default_block_ms(),
            batch_size: default_batch_size(),
            retry_delay_ms: default_retry_delay_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl RedisQueueConfig {
    /// Stream key carrying the messages of `topic`.
    pub fn stream_key(&self, topic: &str) -> String {
        format!("{}:{topic}", self.prefix)
    }

    /// The configured consumer name, or a fresh unique one.
    pub fn consumer_name(&self) -> String {
        self.consumer
            .clone()
            .unwrap_or_else(|| format!("collector-{}", uuid::Uuid::new_v4()))
    }

    pub fn block(&self) -> Duration {
        Duration::from_millis(self.block_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}
