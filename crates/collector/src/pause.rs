use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Pauses live processing while a periodic sync runs.
///
/// Live handlers share the read side, one guard per message; the periodic
/// sync takes the write side for its whole duration. Taking the write side
/// waits for in-flight messages, and new messages wait for the sync.
#[derive(Debug, Clone, Default)]
pub struct PauseGate {
    lock: Arc<RwLock<()>>,
}

impl PauseGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Guard held while handling one live message.
    pub async fn live(&self) -> RwLockReadGuard<'_, ()> {
        self.lock.read().await
    }

    /// Guard held for the duration of a periodic sync.
    pub async fn exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.lock.write().await
    }

    /// Whether a periodic sync currently holds the gate.
    pub fn is_paused(&self) -> bool {
        self.lock.try_read().is_err()
    }
}
