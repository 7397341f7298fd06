//! Configuration file: raw TOML structures, validation, and the resolved
//! runtime [`Config`].

mod error;

#[cfg(test)]
mod tests;

pub use error::ConfigError;

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use vossibility_core::{MetadataField, PeriodicSync, SNAPSHOT_ISSUE_TYPE, SNAPSHOT_PULL_REQUEST_TYPE};
use vossibility_elasticsearch::ElasticsearchConfig;
use vossibility_github::GithubConfig;
use vossibility_queue::RedisQueueConfig;
use vossibility_store::{EventSet, Repository};
use vossibility_transform::{ExecFunction, FunctionRegistry, Transformations, UserStore};

/// Event set used by repositories that do not name one.
pub const DEFAULT_EVENT_SET: &str = "default";

/// Field -> template definitions, keyed by name.
pub type Table = BTreeMap<String, BTreeMap<String, String>>;

/// The configuration file as written.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfig {
    /// Base URL of the Elasticsearch cluster.
    pub elasticsearch: String,
    #[serde(default)]
    pub elasticsearch_username: Option<String>,
    #[serde(default)]
    pub elasticsearch_password: Option<String>,
    #[serde(default)]
    pub github_api_token: Option<String>,
    /// `hourly`, `daily` (default) or `weekly`.
    #[serde(default)]
    pub sync_periodicity: Option<String>,
    #[serde(default)]
    pub redis: RedisQueueConfig,
    #[serde(default)]
    pub mapping: MappingConfig,
    /// User functions: template name -> executable.
    #[serde(default)]
    pub functions: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub repositories: BTreeMap<String, RepositoryConfig>,
    #[serde(default)]
    pub event_set: Table,
    #[serde(default)]
    pub transformations: Table,
}

/// The `[mapping]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MappingConfig {
    /// Field patterns stored verbatim rather than analyzed.
    #[serde(default)]
    pub not_analyzed: Vec<String>,
}

/// One `[repositories.<given name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryConfig {
    pub user: String,
    pub repo: String,
    pub topic: String,
    #[serde(default)]
    pub start_index: u64,
    #[serde(default = "default_event_set")]
    pub event_set: String,
}

fn default_event_set() -> String {
    DEFAULT_EVENT_SET.to_owned()
}

/// Resolved configuration shared by every command.
#[derive(Debug, Clone)]
pub struct Config {
    pub elasticsearch: ElasticsearchConfig,
    pub github: GithubConfig,
    pub redis: RedisQueueConfig,
    pub periodic_sync: PeriodicSync,
    pub not_analyzed: Vec<String>,
    pub repositories: BTreeMap<String, Arc<Repository>>,
}

impl Config {
    /// The repositories named in `names`, or all of them when `names` is
    /// empty.
    pub fn select_repositories(&self, names: &[String]) -> Result<Vec<Arc<Repository>>, String> {
        if names.is_empty() {
            return Ok(self.repositories.values().cloned().collect());
        }
        names
            .iter()
            .map(|name| self.repositories.get(name).cloned().ok_or_else(|| name.clone()))
            .collect()
    }
}

impl RawConfig {
    /// Read and validate the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate a configuration document.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.verify()?;
        Ok(config)
    }

    /// Enforce the cross-references between sections.
    pub fn verify(&self) -> Result<(), ConfigError> {
        self.verify_event_sets()?;
        self.verify_repositories()?;
        self.verify_transformations()?;
        self.periodic_sync()?;
        Ok(())
    }

    fn verify_event_sets(&self) -> Result<(), ConfigError> {
        for (name, events) in &self.event_set {
            for (event, transformation) in events {
                if !self.transformations.contains_key(transformation) {
                    return Err(ConfigError::UnknownTransformation {
                        event_set: name.clone(),
                        event: event.clone(),
                        transformation: transformation.clone(),
                    });
                }
            }
            for mandatory in [SNAPSHOT_ISSUE_TYPE, SNAPSHOT_PULL_REQUEST_TYPE] {
                if !events.contains_key(mandatory) {
                    return Err(ConfigError::MissingEvent {
                        event_set: name.clone(),
                        event: mandatory,
                    });
                }
            }
        }
        Ok(())
    }

    fn verify_repositories(&self) -> Result<(), ConfigError> {
        let mut topics = HashSet::new();
        for (name, repository) in &self.repositories {
            if !self.event_set.contains_key(&repository.event_set) {
                return Err(ConfigError::UnknownEventSet {
                    repository: name.clone(),
                    event_set: repository.event_set.clone(),
                });
            }
            if !topics.insert(repository.topic.as_str()) {
                return Err(ConfigError::DuplicateTopic {
                    repository: name.clone(),
                    topic: repository.topic.clone(),
                });
            }
        }
        Ok(())
    }

    fn verify_transformations(&self) -> Result<(), ConfigError> {
        for (name, fields) in &self.transformations {
            let has_id = fields.contains_key(MetadataField::SnapshotId.key());
            let has_field = fields.contains_key(MetadataField::SnapshotField.key());
            if has_id != has_field {
                return Err(ConfigError::SnapshotPairing {
                    transformation: name.clone(),
                });
            }
        }
        Ok(())
    }

    /// The configured sync periodicity, daily when unset.
    pub fn periodic_sync(&self) -> Result<PeriodicSync, ConfigError> {
        match self.sync_periodicity.as_deref() {
            None => Ok(PeriodicSync::default()),
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidPeriodicity(value.to_owned())),
        }
    }

    pub fn elasticsearch(&self) -> ElasticsearchConfig {
        let config = ElasticsearchConfig::new(&self.elasticsearch);
        match &self.elasticsearch_username {
            Some(username) => config.with_basic_auth(username, self.elasticsearch_password.clone()),
            None => config,
        }
    }

    pub fn github(&self) -> GithubConfig {
        GithubConfig::new(self.github_api_token.clone())
    }

    /// Built-in functions backed by `users`, plus one [`ExecFunction`] per
    /// `[functions]` entry.
    pub fn function_registry(&self, users: Arc<dyn UserStore>) -> Result<FunctionRegistry, ConfigError> {
        let mut registry = FunctionRegistry::with_builtins(users);
        for (name, program) in &self.functions {
            registry.register(name, Arc::new(ExecFunction::new(program, &self.elasticsearch)))?;
        }
        Ok(registry)
    }

    /// Compile the transformations against `functions` and resolve every
    /// repository.
    pub fn build(&self, functions: FunctionRegistry) -> Result<Config, ConfigError> {
        let periodic_sync = self.periodic_sync()?;
        let transformations = Arc::new(Transformations::compile(&self.transformations, functions)?);

        let mut event_sets = BTreeMap::new();
        for (name, bindings) in &self.event_set {
            let event_set = EventSet::new(name, bindings.clone(), Arc::clone(&transformations))
                .map_err(|source| ConfigError::EventSet {
                    event_set: name.clone(),
                    source,
                })?;
            event_sets.insert(name.as_str(), event_set);
        }

        let mut repositories = BTreeMap::new();
        for (name, raw) in &self.repositories {
            let event_set = event_sets
                .get(raw.event_set.as_str())
                .cloned()
                .ok_or_else(|| ConfigError::UnknownEventSet {
                    repository: name.clone(),
                    event_set: raw.event_set.clone(),
                })?;
            let repository = Repository {
                given_name: name.clone(),
                user: raw.user.clone(),
                repo: raw.repo.clone(),
                topic: raw.topic.clone(),
                start_index: raw.start_index,
                event_set,
                periodic_sync,
            };
            repositories.insert(name.clone(), Arc::new(repository));
        }

        Ok(Config {
            elasticsearch: self.elasticsearch(),
            github: self.github(),
            redis: self.redis.clone(),
            periodic_sync,
            not_analyzed: self.mapping.not_analyzed.clone(),
            repositories,
        })
    }
}
