use thiserror::Error;
use vossibility_transform::TransformError;

use crate::tier::Tier;

/// Errors reported by an [`Indexer`](crate::Indexer) backend.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The backend rejected the write or could not be reached.
    #[error("storage error: {0}")]
    Storage(String),

    /// The document could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Errors from [`BlobStore::store`](crate::BlobStore::store).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The transformation bound to the blob's type failed.
    #[error("applying transformation to event {event:?}: {source}")]
    Transform {
        event: String,
        #[source]
        source: TransformError,
    },

    /// Writing one tier failed; later tiers were not attempted.
    #[error("store {tier} {id} data: {source}")]
    Index {
        tier: Tier,
        id: String,
        #[source]
        source: IndexError,
    },
}

/// Inconsistencies between an event set and the transformations it binds.
#[derive(Debug, Error)]
pub enum EventSetError {
    #[error("event {event:?} references unknown transformation {transformation:?}")]
    UnknownTransformation { event: String, transformation: String },

    #[error("missing mandatory entry {0:?}")]
    MissingEntry(&'static str),
}
