use std::sync::Arc;

use async_trait::async_trait;
use vossibility_core::{
    Blob, GITHUB_TYPE_ISSUE, GITHUB_TYPE_PULL_REQUEST, SNAPSHOT_ISSUE_TYPE,
    SNAPSHOT_PULL_REQUEST_TYPE,
};
use vossibility_transform::{Scope, Transformation};

use crate::error::StoreError;
use crate::indexer::Indexer;
use crate::repository::Repository;
use crate::tier::Tier;

/// Persists blobs for a repository at a storage tier.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn store(&self, tier: Tier, repository: &Repository, blob: Blob) -> Result<(), StoreError>;
}

/// Writes a blob to its tier and every following one.
///
/// After the live-event write the blob is replaced by its snapshot; a blob
/// without one stops there. The first failed write aborts the rest.
pub struct CascadingBlobStore {
    indexer: Arc<dyn Indexer>,
}

impl CascadingBlobStore {
    pub fn new(indexer: Arc<dyn Indexer>) -> Self {
        Self { indexer }
    }

    async fn write(&self, tier: Tier, index: &str, blob: &Blob) -> Result<(), StoreError> {
        tracing::debug!(%tier, index, kind = blob.kind(), id = blob.id(), "storing blob");
        self.indexer
            .index(index, blob)
            .await
            .map_err(|source| StoreError::Index {
                tier,
                id: blob.id().to_owned(),
                source,
            })
    }
}

#[async_trait]
impl BlobStore for CascadingBlobStore {
    async fn store(&self, tier: Tier, repository: &Repository, blob: Blob) -> Result<(), StoreError> {
        let mut blob = blob;
        for &current in tier.cascade() {
            match current {
                Tier::LiveEvent => {
                    let index = repository.live_index_for(blob.timestamp());
                    self.write(current, &index, &blob).await?;

                    let wants_snapshot = blob.wants_snapshot();
                    let Some(snapshot) = blob.snapshot() else {
                        if wants_snapshot {
                            tracing::warn!(
                                repository = %repository.pretty_name(),
                                kind = blob.kind(),
                                id = blob.id(),
                                "snapshot metadata does not resolve, skipping state and snapshot"
                            );
                        }
                        return Ok(());
                    };
                    blob = snapshot;
                }
                Tier::CurrentState => {
                    let index = repository.state_index_for(blob.timestamp());
                    self.write(current, &index, &blob).await?;
                }
                Tier::Snapshot => {
                    let index = repository.snapshot_index();
                    self.write(current, &index, &blob).await?;
                }
            }
        }
        Ok(())
    }
}

/// Applies the transformation bound to a blob's type before delegating.
///
/// Live events are looked up by event type. Other tiers only receive issues
/// and pull requests, reshaped by the `snapshot_issue` and
/// `snapshot_pull_request` bindings. A blob without a transformation is
/// forwarded unchanged.
pub struct TransformingBlobStore {
    inner: Arc<dyn BlobStore>,
}

impl TransformingBlobStore {
    pub fn new(inner: Arc<dyn BlobStore>) -> Self {
        Self { inner }
    }

    fn transformation<'r>(
        tier: Tier,
        repository: &'r Repository,
        kind: &str,
    ) -> Option<&'r Transformation> {
        let binding = match tier {
            Tier::LiveEvent => kind,
            Tier::CurrentState | Tier::Snapshot => match kind {
                GITHUB_TYPE_ISSUE => SNAPSHOT_ISSUE_TYPE,
                GITHUB_TYPE_PULL_REQUEST => SNAPSHOT_PULL_REQUEST_TYPE,
                _ => {
                    tracing::warn!(kind, "no transformation found for event type");
                    return None;
                }
            },
        };
        let transformation = repository.event_set.get(binding);
        if transformation.is_none() {
            tracing::warn!(
                repository = %repository.pretty_name(),
                binding,
                "no transformation bound, storing unmodified"
            );
        }
        transformation
    }
}

#[async_trait]
impl BlobStore for TransformingBlobStore {
    async fn store(&self, tier: Tier, repository: &Repository, blob: Blob) -> Result<(), StoreError> {
        let blob = match Self::transformation(tier, repository, blob.kind()) {
            Some(transformation) => {
                let context = repository.context();
                let scope = Scope::new(repository.event_set.transformations(), &context);
                transformation
                    .apply(&scope, &blob)
                    .await
                    .map_err(|source| StoreError::Transform {
                        event: blob.kind().to_owned(),
                        source,
                    })?
            }
            None => blob,
        };
        self.inner.store(tier, repository, blob).await
    }
}
