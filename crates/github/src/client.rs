use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::header::{ACCEPT, HeaderMap, LINK};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::api::{GithubApi, IssuePage, IssueState};
use crate::config::GithubConfig;
use crate::error::GithubError;
use crate::link::next_page;
use crate::rate_limit::{RateLimitResponse, RateLimits};

const MEDIA_TYPE: &str = "application/vnd.github+json";

/// [`GithubApi`] over the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GithubClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> Result<Self, GithubError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            token: config.token.clone(),
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{path}", self.base_url);
        let mut req = self.client.get(&url).header(ACCEPT, MEDIA_TYPE);
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<Response, GithubError> {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        if is_rate_limited(status, resp.headers()) {
            let reset = header_value(resp.headers(), "x-ratelimit-reset")
                .and_then(|secs| DateTime::from_timestamp(secs, 0));
            return Err(GithubError::RateLimited { reset });
        }

        let body = resp.text().await.unwrap_or_default();
        Err(GithubError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, GithubError> {
        let resp = self.send(self.get(path)).await?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

fn is_rate_limited(status: StatusCode, headers: &HeaderMap) -> bool {
    match status {
        StatusCode::TOO_MANY_REQUESTS => true,
        StatusCode::FORBIDDEN => header_value(headers, "x-ratelimit-remaining") == Some(0),
        _ => false,
    }
}

#[async_trait]
impl GithubApi for GithubClient {
    async fn list_issues(
        &self,
        user: &str,
        repo: &str,
        state: IssueState,
        page: u32,
        per_page: u32,
    ) -> Result<IssuePage, GithubError> {
        let req = self.get(&format!("repos/{user}/{repo}/issues")).query(&[
            ("state", state.as_str().to_owned()),
            ("sort", "created".to_owned()),
            ("direction", "asc".to_owned()),
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ]);
        let resp = self.send(req).await?;

        let next_page = resp
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(next_page);
        let bytes = resp.bytes().await?;
        let items: Vec<Value> = serde_json::from_slice(&bytes)?;

        tracing::debug!(repository = %format!("{user}/{repo}"), page, count = items.len(), "listed issues");
        Ok(IssuePage { items, next_page })
    }

    async fn pull_request(&self, user: &str, repo: &str, number: u64) -> Result<Value, GithubError> {
        self.get_json(&format!("repos/{user}/{repo}/pulls/{number}")).await
    }

    async fn issue_labels(&self, user: &str, repo: &str, number: u64) -> Result<Vec<Value>, GithubError> {
        self.get_json(&format!("repos/{user}/{repo}/issues/{number}/labels"))
            .await
    }

    async fn rate_limits(&self) -> Result<RateLimits, GithubError> {
        let response: RateLimitResponse = self.get_json("rate_limit").await?;
        Ok(response.resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockGithub;
    use serde_json::json;

    fn github_client(server: &MockGithub, token: Option<&str>) -> GithubClient {
        let config = GithubConfig::new(token.map(str::to_owned)).with_base_url(&server.base_url);
        GithubClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn list_issues_follows_link_header() {
        let server = MockGithub::start().await;
        let client = github_client(&server, Some("s3cret"));
        let link = format!(
            r#"<{0}/repositories/1/issues?page=3>; rel="next", <{0}/repositories/1/issues?page=9>; rel="last""#,
            server.base_url
        );

        let handle = tokio::spawn(server.respond_once(
            200,
            vec![("Link".to_owned(), link)],
            r#"[{"number": 1}, {"number": 2, "pull_request": {}}]"#,
        ));
        let page = client
            .list_issues("docker", "docker", IssueState::All, 2, 100)
            .await
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.next_page, Some(3));

        let request = handle.await.unwrap();
        let request_line = request.lines().next().unwrap();
        assert!(request_line.starts_with("GET /repos/docker/docker/issues?"));
        for param in ["state=all", "sort=created", "direction=asc", "page=2", "per_page=100"] {
            assert!(request_line.contains(param), "missing {param} in {request_line}");
        }
        let lower = request.to_lowercase();
        assert!(lower.contains("authorization: bearer s3cret"));
        assert!(lower.contains("user-agent: vossibility-collector/"));
    }

    #[tokio::test]
    async fn last_page_has_no_next() {
        let server = MockGithub::start().await;
        let client = github_client(&server, None);
        let handle = tokio::spawn(server.respond_once(200, vec![], "[]"));

        let page = client
            .list_issues("docker", "docker", IssueState::Open, 1, 100)
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.next_page, None);

        let request = handle.await.unwrap();
        assert!(request.contains("state=open"));
        assert!(!request.to_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn exhausted_quota_is_rate_limited() {
        let server = MockGithub::start().await;
        let client = github_client(&server, None);
        let handle = tokio::spawn(server.respond_once(
            403,
            vec![
                ("X-RateLimit-Remaining".to_owned(), "0".to_owned()),
                ("X-RateLimit-Reset".to_owned(), "1372700873".to_owned()),
            ],
            r#"{"message": "API rate limit exceeded"}"#,
        ));

        let err = client.pull_request("docker", "docker", 5).await.unwrap_err();
        handle.await.unwrap();
        match err {
            GithubError::RateLimited { reset } => {
                assert_eq!(reset.map(|r| r.timestamp()), Some(1_372_700_873));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn other_errors_keep_status_and_body() {
        let server = MockGithub::start().await;
        let client = github_client(&server, None);
        let handle = tokio::spawn(server.respond_once(404, vec![], r#"{"message": "Not Found"}"#));

        let err = client.issue_labels("docker", "docker", 5).await.unwrap_err();
        assert!(handle.await.unwrap().starts_with("GET /repos/docker/docker/issues/5/labels "));
        assert!(matches!(err, GithubError::Api { status: 404, ref body } if body.contains("Not Found")));
    }

    #[tokio::test]
    async fn pull_request_and_labels() {
        let server = MockGithub::start().await;
        let client = github_client(&server, None);
        let handle = tokio::spawn(server.respond_once(200, vec![], r#"{"number": 5, "merged": true}"#));
        let pr = client.pull_request("docker", "docker", 5).await.unwrap();
        assert_eq!(pr, json!({"number": 5, "merged": true}));
        assert!(handle.await.unwrap().starts_with("GET /repos/docker/docker/pulls/5 "));

        let server = MockGithub::start().await;
        let client = github_client(&server, None);
        let handle = tokio::spawn(server.respond_once(200, vec![], r#"[{"name": "kind/bug"}]"#));
        let labels = client.issue_labels("docker", "docker", 5).await.unwrap();
        assert_eq!(labels, vec![json!({"name": "kind/bug"})]);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn rate_limits() {
        let server = MockGithub::start().await;
        let client = github_client(&server, None);
        let handle = tokio::spawn(server.respond_once(
            200,
            vec![],
            r#"{"resources": {"core": {"limit": 60, "remaining": 59, "reset": 0}, "search": {"limit": 10, "remaining": 10, "reset": 0}}}"#,
        ));
        let limits = client.rate_limits().await.unwrap();
        assert_eq!(limits.core.remaining, 59);
        assert_eq!(limits.search.limit, 10);
        assert!(handle.await.unwrap().starts_with("GET /rate_limit "));
    }
}
