pub mod client;
pub mod config;
pub mod error;
pub mod indexer;
pub mod mapping;
pub mod users;

#[cfg(test)]
mod mock;

pub use client::ElasticsearchClient;
pub use config::ElasticsearchConfig;
pub use error::ElasticsearchError;
pub use indexer::ElasticsearchIndexer;
pub use mapping::{index_template, sync_mapping, template_name};
pub use users::{ElasticsearchUserStore, USERS_INDEX, sync_users};
