use thiserror::Error;

/// Errors produced while building or mutating a [`Blob`](crate::Blob).
#[derive(Debug, Error)]
pub enum CoreError {
    /// The raw payload is not valid JSON.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// A reserved `_`-prefixed key does not name a known metadata field.
    #[error("invalid metadata field {0:?}")]
    InvalidMetadataField(String),

    /// A metadata field was given a value of the wrong type.
    #[error("bad value for metadata field {field:?}: expected {expected}, found {found}")]
    BadValue {
        /// The metadata key.
        field: String,
        /// Expected JSON type.
        expected: &'static str,
        /// Actual JSON type.
        found: &'static str,
    },

    /// A dot path cannot be written.
    #[error("invalid path {path:?}: {reason}")]
    Path {
        /// The offending path.
        path: String,
        /// What went wrong.
        reason: String,
    },

    /// Not one of `hourly`, `daily` or `weekly`.
    #[error("invalid value {0:?} for sync periodicity")]
    InvalidPeriodicity(String),
}
