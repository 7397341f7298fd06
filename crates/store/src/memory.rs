use std::sync::Mutex;

use async_trait::async_trait;
use vossibility_core::Blob;

use crate::error::IndexError;
use crate::indexer::Indexer;

/// A write captured by [`MemoryIndexer`].
#[derive(Debug, Clone)]
pub struct IndexedBlob {
    pub index: String,
    pub blob: Blob,
}

/// In-memory [`Indexer`] recording every write in order.
///
/// Intended for tests and dry runs. Writes to indices starting with the
/// configured failure prefix are rejected.
#[derive(Debug, Default)]
pub struct MemoryIndexer {
    writes: Mutex<Vec<IndexedBlob>>,
    fail_prefix: Option<String>,
}

impl MemoryIndexer {
    /// An indexer rejecting writes to indices starting with `prefix`.
    pub fn failing_on(prefix: impl Into<String>) -> Self {
        Self {
            writes: Mutex::default(),
            fail_prefix: Some(prefix.into()),
        }
    }

    /// Every accepted write, in order.
    pub fn writes(&self) -> Vec<IndexedBlob> {
        self.writes
            .lock()
            .map(|writes| writes.clone())
            .unwrap_or_default()
    }

    /// Target index of every accepted write, in order.
    pub fn indices(&self) -> Vec<String> {
        self.writes().into_iter().map(|w| w.index).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut writes) = self.writes.lock() {
            writes.clear();
        }
    }
}

#[async_trait]
impl Indexer for MemoryIndexer {
    async fn index(&self, index: &str, blob: &Blob) -> Result<(), IndexError> {
        if self
            .fail_prefix
            .as_deref()
            .is_some_and(|prefix| index.starts_with(prefix))
        {
            return Err(IndexError::Storage(format!("index {index} rejected the write")));
        }
        self.writes
            .lock()
            .map_err(|e| IndexError::Storage(e.to_string()))?
            .push(IndexedBlob {
                index: index.to_owned(),
                blob: blob.clone(),
            });
        Ok(())
    }
}
