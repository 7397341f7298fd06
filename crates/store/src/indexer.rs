use async_trait::async_trait;
use vossibility_core::Blob;

use crate::error::IndexError;

/// Destination of documents: writes a blob under its ID into an index.
#[async_trait]
pub trait Indexer: Send + Sync {
    async fn index(&self, index: &str, blob: &Blob) -> Result<(), IndexError>;
}
