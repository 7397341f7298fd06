pub mod error;
pub mod indexer;
pub mod memory;
pub mod repository;
pub mod store;
pub mod tier;

pub use error::{EventSetError, IndexError, StoreError};
pub use indexer::Indexer;
pub use memory::{IndexedBlob, MemoryIndexer};
pub use repository::{EventSet, Repository};
pub use store::{BlobStore, CascadingBlobStore, TransformingBlobStore};
pub use tier::Tier;
