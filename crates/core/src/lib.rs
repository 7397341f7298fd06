pub mod blob;
pub mod envelope;
pub mod error;
pub mod metadata;
pub mod path;
pub mod periodicity;

pub use blob::Blob;
pub use envelope::{Envelope, Webhook};
pub use error::CoreError;
pub use metadata::{METADATA_PREFIX, MetadataField, is_metadata_key};
pub use periodicity::PeriodicSync;

/// Document type of a GitHub issue.
pub const GITHUB_TYPE_ISSUE: &str = "issue";

/// Document type of a GitHub pull request.
pub const GITHUB_TYPE_PULL_REQUEST: &str = "pull_request";

/// Event-set binding used to reshape issues outside the live tier.
pub const SNAPSHOT_ISSUE_TYPE: &str = "snapshot_issue";

/// Event-set binding used to reshape pull requests outside the live tier.
pub const SNAPSHOT_PULL_REQUEST_TYPE: &str = "snapshot_pull_request";
