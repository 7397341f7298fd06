use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, info};
use vossibility_core::{Blob, GITHUB_TYPE_PULL_REQUEST, Webhook};
use vossibility_github::GithubApi;
use vossibility_queue::{HandlerError, Message, MessageHandler};
use vossibility_store::{BlobStore, Repository, Tier};

use crate::pause::PauseGate;

/// Path of the labels inside a `pull_request` event payload.
pub const LABELS_ATTRIBUTE: &str = "pull_request.labels";

/// Handles the webhooks queued for one repository and stores them as live
/// events.
pub struct LiveHandler {
    repository: Arc<Repository>,
    store: Arc<dyn BlobStore>,
    github: Arc<dyn GithubApi>,
    gate: PauseGate,
}

impl LiveHandler {
    pub fn new(
        repository: Arc<Repository>,
        store: Arc<dyn BlobStore>,
        github: Arc<dyn GithubApi>,
        gate: PauseGate,
    ) -> Self {
        Self {
            repository,
            store,
            github,
            gate,
        }
    }

    /// Pull request events do not always carry labels: fetch them from the
    /// issue of the same number.
    async fn complete(&self, blob: &mut Blob) -> Result<(), HandlerError> {
        if blob.kind() != GITHUB_TYPE_PULL_REQUEST || blob.has_attribute(LABELS_ATTRIBUTE) {
            return Ok(());
        }
        let Some(number) = blob.get("number").and_then(Value::as_u64) else {
            debug!(repository = %self.repository.given_name, id = blob.id(), "pull request event without a number");
            return Ok(());
        };

        debug!(repository = %self.repository.given_name, number, "fetching labels");
        let labels = self
            .github
            .issue_labels(&self.repository.user, &self.repository.repo, number)
            .await
            .map_err(|e| HandlerError::new(format!("retrieve labels for issue {number}: {e}")))?;
        blob.push(LABELS_ATTRIBUTE, Value::Array(labels))
            .map_err(HandlerError::new)
    }
}

#[async_trait]
impl MessageHandler for LiveHandler {
    async fn handle(&self, message: &Message) -> Result<(), HandlerError> {
        if self.gate.is_paused() {
            debug!(repository = %self.repository.given_name, "waiting for periodic sync to finish");
        }
        let _guard = self.gate.live().await;

        let webhook = match Webhook::decode(&message.body) {
            Ok(webhook) => webhook,
            Err(e) => {
                error!(topic = %message.topic, id = %message.id, error = %e, "dropping undecodable message");
                return Ok(());
            }
        };

        let event = webhook.envelope.event.clone();
        if !self.repository.is_subscribed(&event) {
            debug!(repository = %self.repository.given_name, event = %event, "ignoring unsubscribed event");
            return Ok(());
        }
        info!(
            repository = %self.repository.given_name,
            event = %event,
            delivery = %webhook.envelope.delivery,
            "received event"
        );

        let mut blob = webhook.into_blob();
        if let Err(e) = self.complete(&mut blob).await {
            error!(repository = %self.repository.given_name, event = %event, error = %e, "preparing event for storage");
            return Err(e);
        }

        blob.set_timestamp(message.timestamp);
        self.store
            .store(Tier::LiveEvent, &self.repository, blob)
            .await
            .map_err(HandlerError::new)
    }
}
