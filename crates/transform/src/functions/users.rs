use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{FunctionError, TemplateFunction, arguments};

/// What is known about a GitHub user beyond their login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub login: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default)]
    pub is_maintainer: bool,
}

/// Lookup of user profiles by login.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Profile for `login`, `None` if the user is unknown.
    async fn user(&self, login: &str) -> Result<Option<UserProfile>, FunctionError>;
}

/// `user_data login`: the stored profile for `login`, or just `{"login": …}`
/// when nothing is known. Lookup failures never fail the template.
pub struct UserData {
    store: Arc<dyn UserStore>,
}

impl UserData {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TemplateFunction for UserData {
    async fn call(&self, args: Vec<Value>) -> Result<Value, FunctionError> {
        let [login] = arguments(args)?;
        let Value::String(login) = login else {
            return Ok(Value::Null);
        };

        match self.store.user(&login).await {
            Ok(Some(mut profile)) => {
                profile.login = login;
                serde_json::to_value(profile).map_err(|e| FunctionError::Failed(e.to_string()))
            }
            Ok(None) => Ok(json!({ "login": login })),
            Err(e) => {
                tracing::debug!(login = %login, error = %e, "user lookup failed");
                Ok(json!({ "login": login }))
            }
        }
    }
}

/// In-memory [`UserStore`] keyed by lowercase login.
#[derive(Debug, Default, Clone)]
pub struct MemoryUserStore {
    users: HashMap<String, UserProfile>,
}

impl MemoryUserStore {
    pub fn insert(&mut self, profile: UserProfile) {
        self.users.insert(profile.login.to_lowercase(), profile);
    }
}

impl FromIterator<UserProfile> for MemoryUserStore {
    fn from_iter<I: IntoIterator<Item = UserProfile>>(iter: I) -> Self {
        let mut store = Self::default();
        for profile in iter {
            store.insert(profile);
        }
        store
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn user(&self, login: &str) -> Result<Option<UserProfile>, FunctionError> {
        Ok(self.users.get(&login.to_lowercase()).cloned())
    }
}
