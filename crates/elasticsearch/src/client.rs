use std::time::Duration;

use serde_json::Value;

use crate::config::ElasticsearchConfig;
use crate::error::ElasticsearchError;

/// Thin wrapper over the Elasticsearch REST API via `reqwest`.
///
/// Cloning is cheap: the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct ElasticsearchClient {
    client: reqwest::Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl ElasticsearchClient {
    pub fn new(config: &ElasticsearchConfig) -> Result<Self, ElasticsearchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_owned(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Base URL of the cluster, without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a [`reqwest::RequestBuilder`] for the given method and path,
    /// applying basic authentication when credentials are configured.
    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{path}", self.base_url);
        let mut req = self.client.request(method, &url);
        if let Some(ref user) = self.username {
            req = req.basic_auth(user, self.password.as_deref());
        }
        req
    }

    /// Create or replace the document `id` in `index`.
    pub async fn put_document(
        &self,
        index: &str,
        id: &str,
        body: &Value,
    ) -> Result<(), ElasticsearchError> {
        let path = format!("{index}/_doc/{id}");
        let resp = self
            .request(reqwest::Method::PUT, &path)
            .json(body)
            .send()
            .await?;

        if resp.status().is_success() {
            tracing::debug!(index = %index, id = %id, "document indexed");
            Ok(())
        } else {
            Err(status_error("index document", resp).await)
        }
    }

    /// The `_source` of document `id` in `index`, `None` when it does not
    /// exist.
    pub async fn get_source(&self, index: &str, id: &str) -> Result<Option<Value>, ElasticsearchError> {
        let path = format!("{index}/_doc/{id}");
        let resp = self.request(reqwest::Method::GET, &path).send().await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(status_error("get document", resp).await);
        }

        let get: GetResponse = resp.json().await?;
        Ok(if get.found { get.source } else { None })
    }

    /// Create or replace the composable index template `name`.
    pub async fn put_index_template(&self, name: &str, body: &Value) -> Result<(), ElasticsearchError> {
        let path = format!("_index_template/{name}");
        let resp = self
            .request(reqwest::Method::PUT, &path)
            .json(body)
            .send()
            .await?;

        if resp.status().is_success() {
            tracing::debug!(template = %name, "index template updated");
            Ok(())
        } else {
            Err(status_error("put index template", resp).await)
        }
    }
}

async fn status_error(operation: &'static str, resp: reqwest::Response) -> ElasticsearchError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    ElasticsearchError::Status {
        operation,
        status,
        body,
    }
}

#[derive(serde::Deserialize)]
struct GetResponse {
    #[serde(rename = "_source", default)]
    source: Option<Value>,
    #[serde(default)]
    found: bool,
}
