use std::sync::Arc;
use std::time::Duration;

use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use redis::streams::{StreamReadOptions, StreamReadReply};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::RedisQueueConfig;
use crate::error::QueueError;
use crate::handler::{Disposition, MessageHandler};
use crate::message::{BODY_FIELD, Message};
use crate::retry::{NEW, PENDING, RetryTracker, Verdict};

/// Build the connection pool shared by every consumer.
pub fn connect(config: &RedisQueueConfig) -> Result<Pool, QueueError> {
    Config::from_url(&config.url)
        .builder()
        .map(|b| b.max_size(config.pool_size).runtime(Runtime::Tokio1).build())
        .map_err(|e| QueueError::Connection(e.to_string()))?
        .map_err(|e| QueueError::Connection(e.to_string()))
}

/// Consumes one topic stream through the configured consumer group.
pub struct StreamConsumer {
    pool: Pool,
    config: RedisQueueConfig,
    topic: String,
    stream: String,
    consumer: String,
    handler: Arc<dyn MessageHandler>,
}

impl StreamConsumer {
    pub fn new(
        pool: Pool,
        config: &RedisQueueConfig,
        topic: impl Into<String>,
        consumer: impl Into<String>,
        handler: Arc<dyn MessageHandler>,
    ) -> Self {
        let topic = topic.into();
        Self {
            pool,
            stream: config.stream_key(&topic),
            config: config.clone(),
            topic,
            consumer: consumer.into(),
            handler,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection, QueueError> {
        self.pool
            .get()
            .await
            .map_err(|e| QueueError::Connection(e.to_string()))
    }

    /// Create the consumer group (and the stream) unless it exists. A new
    /// group starts at the beginning of the stream.
    async fn ensure_group(&self) -> Result<(), QueueError> {
        let mut conn = self.conn().await?;
        let created: redis::RedisResult<()> = conn
            .xgroup_create_mkstream(&self.stream, &self.config.channel, "0")
            .await;
        match created {
            Ok(()) => {
                info!(stream = %self.stream, group = %self.config.channel, "consumer group created");
                Ok(())
            }
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn read(&self, cursor: &str, block: Duration) -> Result<Vec<Message>, QueueError> {
        let mut conn = self.conn().await?;
        let mut options = StreamReadOptions::default()
            .group(&self.config.channel, &self.consumer)
            .count(self.config.batch_size);
        if cursor == NEW {
            options = options.block(usize::try_from(block.as_millis()).unwrap_or(usize::MAX));
        }

        let reply: Option<StreamReadReply> = conn
            .xread_options(&[&self.stream], &[cursor], &options)
            .await?;

        let messages = reply
            .into_iter()
            .flat_map(|reply| reply.keys)
            .flat_map(|key| key.ids)
            .map(|entry| {
                let body = entry.get::<Vec<u8>>(BODY_FIELD).unwrap_or_default();
                Message::new(entry.id, self.topic.clone(), body)
            })
            .collect();
        Ok(messages)
    }

    async fn ack(&self, id: &str) -> Result<(), QueueError> {
        let mut conn = self.conn().await?;
        let _: i64 = conn.xack(&self.stream, &self.config.channel, &[id]).await?;
        Ok(())
    }

    /// Consume until `cancel` fires. A failed message is read again from
    /// the pending list after the retry delay while new entries keep being
    /// consumed; after `max_attempts` deliveries it is acknowledged and
    /// dropped. A message being handled when cancellation is requested is
    /// allowed to finish.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), QueueError> {
        self.ensure_group().await?;
        info!(topic = %self.topic, stream = %self.stream, consumer = %self.consumer, "consumer started");

        let mut retries = RetryTracker::new(
            self.config.max_attempts,
            self.config.retry_delay(),
            Instant::now(),
        );
        while !cancel.is_cancelled() {
            let now = Instant::now();
            let cursor = retries.next_cursor(now);
            let block = retries.block_budget(now, self.config.block());
            let read = tokio::select! {
                () = cancel.cancelled() => break,
                read = self.read(cursor, block) => read,
            };

            let messages = match read {
                Ok(messages) => messages,
                Err(e) => {
                    warn!(topic = %self.topic, error = %e, "reading stream failed");
                    if cursor == PENDING {
                        retries.resume_pending(Instant::now());
                    }
                    self.pause(&cancel).await;
                    continue;
                }
            };

            let mut failures = 0;
            for message in &messages {
                let result = self.handler.handle(message).await;
                if Disposition::of(&result) == Disposition::Ack {
                    retries.succeeded(&message.id);
                    self.acknowledge(message).await;
                    continue;
                }
                failures += 1;
                let reason = result.err().map(|e| e.to_string()).unwrap_or_default();
                match retries.failed(&message.id, Instant::now()) {
                    Verdict::Retry { attempt } => {
                        warn!(topic = %self.topic, id = %message.id, attempt, error = %reason, "message handling failed, will retry");
                    }
                    Verdict::GiveUp { attempts } => {
                        error!(topic = %self.topic, id = %message.id, attempts, error = %reason, "giving up on message");
                        self.acknowledge(message).await;
                    }
                }
            }

            // A full batch of recovered entries may hide more behind it.
            if cursor == PENDING && failures == 0 && messages.len() >= self.config.batch_size {
                retries.resume_pending(Instant::now());
            }
        }

        info!(topic = %self.topic, "consumer stopped");
        Ok(())
    }

    async fn acknowledge(&self, message: &Message) {
        if let Err(e) = self.ack(&message.id).await {
            warn!(topic = %self.topic, id = %message.id, error = %e, "acknowledging message failed");
        }
    }

    async fn pause(&self, cancel: &CancellationToken) {
        debug!(topic = %self.topic, delay_ms = self.config.retry_delay_ms, "backing off");
        tokio::select! {
            () = cancel.cancelled() => {}
            () = tokio::time::sleep(self.config.retry_delay()) => {}
        }
    }
}

#[cfg(all(test, feature = "integration"))]
mod integration_tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::error::HandlerError;

    fn test_config() -> RedisQueueConfig {
        RedisQueueConfig {
            url: std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            prefix: format!("vossibility-test-{}", uuid::Uuid::new_v4()),
            retry_delay_ms: 50,
            block_ms: 100,
            ..RedisQueueConfig::default()
        }
    }

    /// Fails the first delivery, then records bodies and cancels once two
    /// messages have been seen.
    struct FlakyHandler {
        failed_once: AtomicBool,
        seen: Mutex<Vec<String>>,
        cancel: CancellationToken,
    }

    #[async_trait]
    impl MessageHandler for FlakyHandler {
        async fn handle(&self, message: &Message) -> Result<(), HandlerError> {
            if !self.failed_once.swap(true, Ordering::SeqCst) {
                return Err(HandlerError::new("first delivery fails"));
            }
            let mut seen = self.seen.lock().unwrap();
            seen.push(String::from_utf8_lossy(&message.body).into_owned());
            if seen.len() == 2 {
                self.cancel.cancel();
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_message_is_redelivered() {
        let config = test_config();
        let pool = connect(&config).unwrap();
        let stream = config.stream_key("events");

        let mut conn = pool.get().await.unwrap();
        for body in ["one", "two"] {
            let _: String = conn.xadd(&stream, "*", &[(BODY_FIELD, body)]).await.unwrap();
        }
        drop(conn);

        let cancel = CancellationToken::new();
        let handler = Arc::new(FlakyHandler {
            failed_once: AtomicBool::new(false),
            seen: Mutex::new(Vec::new()),
            cancel: cancel.clone(),
        });
        let consumer = StreamConsumer::new(pool.clone(), &config, "events", "test", handler.clone());
        tokio::time::timeout(std::time::Duration::from_secs(10), consumer.run(cancel))
            .await
            .unwrap()
            .unwrap();

        let mut seen = handler.seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec!["one", "two"]);

        let mut conn = pool.get().await.unwrap();
        let _: i64 = conn.del(&stream).await.unwrap();
    }

    /// Never accepts `poison`; records everything else. Cancels once `good`
    /// was seen and `poison` was offered `attempts` times.
    struct PoisonHandler {
        poison_attempts: AtomicUsize,
        attempts: usize,
        seen: Mutex<Vec<String>>,
        cancel: CancellationToken,
    }

    impl PoisonHandler {
        fn maybe_stop(&self) {
            let good = self.seen.lock().unwrap().iter().any(|b| b == "good");
            if good && self.poison_attempts.load(Ordering::SeqCst) >= self.attempts {
                self.cancel.cancel();
            }
        }
    }

    #[async_trait]
    impl MessageHandler for PoisonHandler {
        async fn handle(&self, message: &Message) -> Result<(), HandlerError> {
            let body = String::from_utf8_lossy(&message.body).into_owned();
            let result = if body == "poison" {
                self.poison_attempts.fetch_add(1, Ordering::SeqCst);
                Err(HandlerError::new("transformation failed"))
            } else {
                self.seen.lock().unwrap().push(body);
                Ok(())
            };
            self.maybe_stop();
            result
        }
    }

    #[tokio::test]
    async fn failing_message_does_not_hold_up_the_stream() {
        let config = RedisQueueConfig {
            max_attempts: 3,
            ..test_config()
        };
        let pool = connect(&config).unwrap();
        let stream = config.stream_key("events");

        let mut conn = pool.get().await.unwrap();
        for body in ["poison", "good"] {
            let _: String = conn.xadd(&stream, "*", &[(BODY_FIELD, body)]).await.unwrap();
        }
        drop(conn);

        let cancel = CancellationToken::new();
        let handler = Arc::new(PoisonHandler {
            poison_attempts: AtomicUsize::new(0),
            attempts: 3,
            seen: Mutex::new(Vec::new()),
            cancel: cancel.clone(),
        });
        let consumer = StreamConsumer::new(pool.clone(), &config, "events", "test", handler.clone());
        tokio::time::timeout(std::time::Duration::from_secs(10), consumer.run(cancel))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(*handler.seen.lock().unwrap(), vec!["good"]);
        assert_eq!(handler.poison_attempts.load(Ordering::SeqCst), 3);

        let leftover = StreamConsumer::new(pool.clone(), &config, "events", "test", handler.clone());
        let pending = leftover.read(PENDING, config.block()).await.unwrap();
        assert!(pending.is_empty(), "given-up message must be acknowledged");

        let mut conn = pool.get().await.unwrap();
        let _: i64 = conn.del(&stream).await.unwrap();
    }
}
