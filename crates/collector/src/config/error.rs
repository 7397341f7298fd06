use thiserror::Error;
use vossibility_store::EventSetError;
use vossibility_transform::TransformError;

/// Problems found while loading the configuration. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("event {event:?} of event set {event_set:?} references an unknown transformation {transformation:?}")]
    UnknownTransformation {
        event_set: String,
        event: String,
        transformation: String,
    },

    #[error("missing required event {event:?} in event set {event_set:?}")]
    MissingEvent {
        event_set: String,
        event: &'static str,
    },

    #[error("unknown event set {event_set:?} for repository {repository:?}")]
    UnknownEventSet {
        repository: String,
        event_set: String,
    },

    #[error("duplicated topic name {topic:?} for repository {repository:?}")]
    DuplicateTopic { repository: String, topic: String },

    #[error("transformation {transformation:?} should have either none or both of `_snapshot_id` and `_snapshot_field`")]
    SnapshotPairing { transformation: String },

    #[error("invalid value {0:?} for sync periodicity")]
    InvalidPeriodicity(String),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("event set {event_set:?}: {source}")]
    EventSet {
        event_set: String,
        #[source]
        source: EventSetError,
    },
}
