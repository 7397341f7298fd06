use chrono::{DateTime, Utc};
use serde_json::{Map, Number, Value};

use crate::error::CoreError;
use crate::metadata::{MetadataField, is_metadata_key};
use crate::path;

/// A unit of storable data: a JSON document plus the attributes that decide
/// where and how it is stored.
///
/// Reserved `_`-prefixed keys pushed into a blob never reach [`Blob::data`];
/// they are captured as metadata instead (see [`MetadataField`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    kind: String,
    id: String,
    timestamp: DateTime<Utc>,
    data: Value,
    snapshot_id: Option<String>,
    snapshot_field: Option<String>,
}

impl Blob {
    /// Create an empty blob stamped with the current time.
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::with_data(kind, id, Value::Object(Map::new()))
    }

    /// Create a blob around an already decoded document.
    pub fn with_data(kind: impl Into<String>, id: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            timestamp: Utc::now(),
            data,
            snapshot_id: None,
            snapshot_field: None,
        }
    }

    /// Create a blob from a raw JSON payload.
    pub fn from_payload(
        kind: impl Into<String>,
        id: impl Into<String>,
        raw: &[u8],
    ) -> Result<Self, CoreError> {
        let data = serde_json::from_slice(raw)?;
        Ok(Self::with_data(kind, id, data))
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: DateTime<Utc>) {
        self.timestamp = timestamp;
    }

    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }

    #[must_use]
    pub fn into_data(self) -> Value {
        self.data
    }

    /// Current value of a metadata attribute.
    #[must_use]
    pub fn metadata(&self, field: MetadataField) -> Option<&str> {
        match field {
            MetadataField::Type => Some(&self.kind),
            MetadataField::SnapshotId => self.snapshot_id.as_deref(),
            MetadataField::SnapshotField => self.snapshot_field.as_deref(),
        }
    }

    /// Set `value` at the dot path `key`.
    ///
    /// Keys in the reserved namespace are dispatched to the matching metadata
    /// attribute and must carry a string.
    pub fn push(&mut self, key: &str, value: Value) -> Result<(), CoreError> {
        if !is_metadata_key(key) {
            return path::set(&mut self.data, key, value);
        }

        let field = MetadataField::from_key(key)
            .ok_or_else(|| CoreError::InvalidMetadataField(key.to_owned()))?;
        let text = match value {
            Value::String(text) => text,
            other => {
                return Err(CoreError::BadValue {
                    field: key.to_owned(),
                    expected: field.expected_type(),
                    found: path::kind_of(&other),
                });
            }
        };
        match field {
            MetadataField::Type => self.kind = text,
            MetadataField::SnapshotId => self.snapshot_id = Some(text),
            MetadataField::SnapshotField => self.snapshot_field = Some(text),
        }
        Ok(())
    }

    /// Whether the dot path resolves in the document, `null` values included.
    #[must_use]
    pub fn has_attribute(&self, path: &str) -> bool {
        path::get(&self.data, path).is_some()
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        path::get(&self.data, path)
    }

    /// Serialize the document to JSON bytes.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.data)
    }

    /// Derive the snapshot of this blob, if it carries snapshot metadata.
    ///
    /// The snapshot is the sub-document at `_snapshot_field`, keyed by the
    /// scalar found at `_snapshot_id` inside it. Returns `None` when either
    /// attribute is unset or does not resolve to usable data.
    #[must_use]
    pub fn snapshot(&self) -> Option<Blob> {
        let (Some(id_path), Some(field_path)) = (&self.snapshot_id, &self.snapshot_field) else {
            return None;
        };
        let document = path::get(&self.data, field_path)?;
        let id = match path::get(document, id_path)? {
            Value::String(id) => id.clone(),
            Value::Number(id) => number_id(id),
            _ => return None,
        };
        Some(Blob {
            kind: self.kind.clone(),
            id,
            timestamp: self.timestamp,
            data: document.clone(),
            snapshot_id: None,
            snapshot_field: None,
        })
    }

    /// Whether the blob carries either snapshot attribute.
    #[must_use]
    pub fn wants_snapshot(&self) -> bool {
        self.snapshot_id.is_some() || self.snapshot_field.is_some()
    }
}

/// Integral floats render without a fractional part, like integers.
fn number_id(number: &Number) -> String {
    match number.as_f64() {
        Some(f) if number.is_f64() && f.fract().abs() < f64::EPSILON => format!("{f:.0}"),
        _ => number.to_string(),
    }
}
