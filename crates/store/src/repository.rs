use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use vossibility_core::{PeriodicSync, SNAPSHOT_ISSUE_TYPE, SNAPSHOT_PULL_REQUEST_TYPE};
use vossibility_transform::{RepositoryInfo, TransformContext, Transformation, Transformations};

use crate::error::EventSetError;

/// Subscribed event types, each bound to the transformation reshaping it.
#[derive(Debug, Clone)]
pub struct EventSet {
    name: String,
    bindings: BTreeMap<String, String>,
    transformations: Arc<Transformations>,
}

impl EventSet {
    /// Bind event types to transformation names.
    ///
    /// Every binding must name a known transformation, and the
    /// `snapshot_issue` / `snapshot_pull_request` entries are mandatory.
    pub fn new(
        name: impl Into<String>,
        bindings: BTreeMap<String, String>,
        transformations: Arc<Transformations>,
    ) -> Result<Self, EventSetError> {
        for (event, transformation) in &bindings {
            if !transformations.contains(transformation) {
                return Err(EventSetError::UnknownTransformation {
                    event: event.clone(),
                    transformation: transformation.clone(),
                });
            }
        }
        for mandatory in [SNAPSHOT_ISSUE_TYPE, SNAPSHOT_PULL_REQUEST_TYPE] {
            if !bindings.contains_key(mandatory) {
                return Err(EventSetError::MissingEntry(mandatory));
            }
        }
        Ok(Self {
            name: name.into(),
            bindings,
            transformations,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn contains(&self, event: &str) -> bool {
        self.bindings.contains_key(event)
    }

    /// The transformation bound to `event`.
    #[must_use]
    pub fn get(&self, event: &str) -> Option<&Transformation> {
        self.bindings
            .get(event)
            .and_then(|name| self.transformations.get(name))
    }

    #[must_use]
    pub fn transformations(&self) -> &Transformations {
        &self.transformations
    }

    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }
}

/// A GitHub repository followed under a user-given name.
///
/// Its documents live in three families of indices, all prefixed with the
/// given name: monthly `live-` indices of raw events, `state-` indices rolled
/// at the sync periodicity, and a single `snapshot` index.
#[derive(Debug, Clone)]
pub struct Repository {
    pub given_name: String,
    pub user: String,
    pub repo: String,
    /// Queue topic carrying this repository's webhooks.
    pub topic: String,
    /// First issue number considered by bulk synchronization.
    pub start_index: u64,
    pub event_set: EventSet,
    pub periodic_sync: PeriodicSync,
}

impl Repository {
    /// `user/repo`, as GitHub knows it.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.user, self.repo)
    }

    /// `given (user:repo)`, for humans.
    #[must_use]
    pub fn pretty_name(&self) -> String {
        format!("{} ({}:{})", self.given_name, self.user, self.repo)
    }

    #[must_use]
    pub fn is_subscribed(&self, event: &str) -> bool {
        self.event_set.contains(event)
    }

    /// Prefix shared by every index of this repository.
    #[must_use]
    pub fn index_prefix(&self) -> String {
        format!("{}-", self.given_name)
    }

    #[must_use]
    pub fn live_index_for(&self, timestamp: DateTime<Utc>) -> String {
        format!("{}live-{}", self.index_prefix(), timestamp.format("%Y.%m"))
    }

    #[must_use]
    pub fn live_index(&self) -> String {
        self.live_index_for(Utc::now())
    }

    #[must_use]
    pub fn state_index_for(&self, timestamp: DateTime<Utc>) -> String {
        format!(
            "{}state-{}",
            self.index_prefix(),
            timestamp.format(self.periodic_sync.state_bucket_format())
        )
    }

    #[must_use]
    pub fn state_index(&self) -> String {
        self.state_index_for(Utc::now())
    }

    #[must_use]
    pub fn snapshot_index(&self) -> String {
        format!("{}snapshot", self.index_prefix())
    }

    /// What the `context` template function reports for this repository.
    #[must_use]
    pub fn context(&self) -> TransformContext {
        TransformContext {
            repository: RepositoryInfo {
                given_name: self.given_name.clone(),
                full_name: self.full_name(),
                pretty_name: self.pretty_name(),
                user: self.user.clone(),
                repo: self.repo.clone(),
            },
        }
    }
}
