use std::collections::BTreeMap;

use async_trait::async_trait;
use vossibility_transform::{FunctionError, UserProfile, UserStore};

use crate::client::ElasticsearchClient;
use crate::error::ElasticsearchError;

/// Index holding one document per known user, keyed by lowercase login.
pub const USERS_INDEX: &str = "users";

/// [`UserStore`] backed by the users index.
#[derive(Debug, Clone)]
pub struct ElasticsearchUserStore {
    client: ElasticsearchClient,
    index: String,
}

impl ElasticsearchUserStore {
    pub fn new(client: ElasticsearchClient) -> Self {
        Self {
            client,
            index: USERS_INDEX.to_owned(),
        }
    }

    #[must_use]
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }
}

#[async_trait]
impl UserStore for ElasticsearchUserStore {
    async fn user(&self, login: &str) -> Result<Option<UserProfile>, FunctionError> {
        let Some(source) = self
            .client
            .get_source(&self.index, &login.to_lowercase())
            .await?
        else {
            return Ok(None);
        };
        let mut profile: UserProfile =
            serde_json::from_value(source).map_err(|e| FunctionError::Failed(e.to_string()))?;
        if profile.login.is_empty() {
            login.clone_into(&mut profile.login);
        }
        Ok(Some(profile))
    }
}

/// Write every profile of `users` (keyed by login) into `index`. A failing
/// user is logged and skipped; the number of users written is returned.
pub async fn sync_users(
    client: &ElasticsearchClient,
    index: &str,
    users: &BTreeMap<String, UserProfile>,
) -> Result<usize, ElasticsearchError> {
    let mut written = 0;
    for (login, profile) in users {
        let mut profile = profile.clone();
        login.clone_into(&mut profile.login);
        let body = serde_json::to_value(&profile)?;

        match client.put_document(index, &login.to_lowercase(), &body).await {
            Ok(()) => {
                tracing::info!(login = %login, "user data saved");
                written += 1;
            }
            Err(e) => tracing::error!(login = %login, error = %e, "indexing user data failed"),
        }
    }
    Ok(written)
}
