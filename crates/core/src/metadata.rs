use std::fmt;

/// Prefix reserved for metadata attributes in transformation outputs.
pub const METADATA_PREFIX: &str = "_";

/// Reserved attributes that steer storage rather than land in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataField {
    /// `_type`: overrides the blob's logical type.
    Type,
    /// `_snapshot_id`: path of the snapshot ID, relative to the snapshot field.
    SnapshotId,
    /// `_snapshot_field`: path of the sub-document to snapshot.
    SnapshotField,
}

impl MetadataField {
    pub const ALL: [Self; 3] = [Self::Type, Self::SnapshotId, Self::SnapshotField];

    /// The reserved key, prefix included.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Type => "_type",
            Self::SnapshotId => "_snapshot_id",
            Self::SnapshotField => "_snapshot_field",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }

    /// JSON type a value must have to be assigned to this field.
    #[must_use]
    pub fn expected_type(self) -> &'static str {
        "string"
    }
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Whether `key` falls in the reserved metadata namespace.
#[must_use]
pub fn is_metadata_key(key: &str) -> bool {
    key.starts_with(METADATA_PREFIX)
}
