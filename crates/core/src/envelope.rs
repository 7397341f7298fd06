use serde::Deserialize;
use serde_json::Value;

use crate::blob::Blob;
use crate::error::CoreError;

/// Delivery headers forwarded alongside a GitHub webhook payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Envelope {
    #[serde(rename = "X-GitHub-Event")]
    pub event: String,
    #[serde(rename = "X-GitHub-Delivery")]
    pub delivery: String,
    #[serde(rename = "X-Hub-Signature", default)]
    pub signature: Option<String>,
}

/// A decoded webhook message: the envelope plus the full JSON body.
#[derive(Debug, Clone)]
pub struct Webhook {
    pub envelope: Envelope,
    pub payload: Value,
}

impl Webhook {
    /// Decode a queued webhook body. The envelope keys live at the top level
    /// of the same document as the event payload.
    pub fn decode(raw: &[u8]) -> Result<Self, CoreError> {
        let payload: Value = serde_json::from_slice(raw)?;
        let envelope = Envelope::deserialize(&payload)?;
        Ok(Self { envelope, payload })
    }

    /// Build the live-event blob: typed by event name, keyed by delivery ID.
    #[must_use]
    pub fn into_blob(self) -> Blob {
        Blob::with_data(self.envelope.event, self.envelope.delivery, self.payload)
    }
}
