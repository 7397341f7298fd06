use async_trait::async_trait;
use chrono::SecondsFormat;
use serde_json::Value;
use vossibility_core::Blob;
use vossibility_store::{IndexError, Indexer};

use crate::client::ElasticsearchClient;
use crate::error::ElasticsearchError;

/// Reserved document field holding the blob timestamp.
pub const TIMESTAMP_FIELD: &str = "@timestamp";

/// Reserved document field holding the blob type.
pub const TYPE_FIELD: &str = "@type";

/// [`Indexer`] writing blobs as Elasticsearch documents.
#[derive(Debug, Clone)]
pub struct ElasticsearchIndexer {
    client: ElasticsearchClient,
}

impl ElasticsearchIndexer {
    pub fn new(client: ElasticsearchClient) -> Self {
        Self { client }
    }
}

/// The document stored for `blob`: its data with `@timestamp` (RFC 3339,
/// UTC) and `@type` added.
pub fn document(blob: &Blob) -> Result<Value, ElasticsearchError> {
    let Value::Object(mut body) = blob.data().clone() else {
        return Err(ElasticsearchError::NotAnObject(blob.id().to_owned()));
    };
    body.insert(
        TIMESTAMP_FIELD.to_owned(),
        Value::String(blob.timestamp().to_rfc3339_opts(SecondsFormat::Secs, true)),
    );
    body.insert(TYPE_FIELD.to_owned(), Value::String(blob.kind().to_owned()));
    Ok(Value::Object(body))
}

#[async_trait]
impl Indexer for ElasticsearchIndexer {
    async fn index(&self, index: &str, blob: &Blob) -> Result<(), IndexError> {
        let body = document(blob)?;
        self.client.put_document(index, blob.id(), &body).await?;
        Ok(())
    }
}
