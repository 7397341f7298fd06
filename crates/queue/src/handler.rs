use async_trait::async_trait;

use crate::error::HandlerError;
use crate::message::Message;

/// Processes queued messages, one at a time per consumer.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle `message`. `Ok` acknowledges it; an error keeps it pending so
    /// that it is delivered again.
    async fn handle(&self, message: &Message) -> Result<(), HandlerError>;
}

/// What becomes of a message once handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Ack,
    Retry,
}

impl Disposition {
    pub fn of(result: &Result<(), HandlerError>) -> Self {
        if result.is_ok() { Self::Ack } else { Self::Retry }
    }
}
