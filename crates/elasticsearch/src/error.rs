use thiserror::Error;
use vossibility_store::IndexError;
use vossibility_transform::FunctionError;

/// Errors talking to Elasticsearch.
#[derive(Debug, Error)]
pub enum ElasticsearchError {
    /// The request could not be sent or the response not read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The cluster answered with a non-success status.
    #[error("{operation} failed with status {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Only JSON objects can be indexed as documents.
    #[error("document {0:?} is not a JSON object")]
    NotAnObject(String),
}

impl From<ElasticsearchError> for IndexError {
    fn from(err: ElasticsearchError) -> Self {
        match err {
            ElasticsearchError::Serialization(_) | ElasticsearchError::NotAnObject(_) => {
                IndexError::Serialization(err.to_string())
            }
            ElasticsearchError::Http(_) | ElasticsearchError::Status { .. } => {
                IndexError::Storage(err.to_string())
            }
        }
    }
}

impl From<ElasticsearchError> for FunctionError {
    fn from(err: ElasticsearchError) -> Self {
        FunctionError::Failed(err.to_string())
    }
}
