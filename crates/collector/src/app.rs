use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};
use vossibility_elasticsearch::{
    ElasticsearchClient, ElasticsearchIndexer, ElasticsearchUserStore, USERS_INDEX, sync_mapping,
    sync_users,
};
use vossibility_github::{GithubApi, GithubClient, RateLimits};
use vossibility_queue::StreamConsumer;
use vossibility_store::{BlobStore, CascadingBlobStore, TransformingBlobStore};
use vossibility_transform::UserProfile;

use crate::config::{Config, RawConfig};
use crate::error::CollectorError;
use crate::live::LiveHandler;
use crate::pause::PauseGate;
use crate::supervisor::Supervisor;
use crate::sync::{SyncJob, SyncOptions, SyncReport};

/// The collector with its backends connected, ready to run a command.
pub struct App {
    config: Config,
    elasticsearch: ElasticsearchClient,
    github: Arc<dyn GithubApi>,
    store: Arc<dyn BlobStore>,
}

impl App {
    /// Load the configuration at `path` and connect the backends.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CollectorError> {
        let raw = RawConfig::load(path)?;
        let elasticsearch = ElasticsearchClient::new(&raw.elasticsearch())?;
        let users = Arc::new(ElasticsearchUserStore::new(elasticsearch.clone()));
        let config = raw.build(raw.function_registry(users)?)?;

        let github: Arc<dyn GithubApi> = Arc::new(GithubClient::new(&config.github)?);
        let indexer = Arc::new(ElasticsearchIndexer::new(elasticsearch.clone()));
        let store: Arc<dyn BlobStore> = Arc::new(TransformingBlobStore::new(Arc::new(
            CascadingBlobStore::new(indexer),
        )));

        Ok(Self {
            config,
            elasticsearch,
            github,
            store,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume live events for every repository until `shutdown` resolves,
    /// running the periodic sync on schedule.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> Result<(), CollectorError> {
        let pool = vossibility_queue::connect(&self.config.redis)?;
        let consumer = self.config.redis.consumer_name();
        let gate = PauseGate::new();
        let repositories: Vec<_> = self.config.repositories.values().cloned().collect();

        let periodic = SyncJob::new(
            Arc::clone(&self.github),
            Arc::clone(&self.store),
            SyncOptions::periodic(),
        );
        let mut supervisor = Supervisor::new(
            gate.clone(),
            self.config.periodic_sync,
            periodic,
            repositories.clone(),
        );

        for repository in repositories {
            let handler = LiveHandler::new(
                Arc::clone(&repository),
                Arc::clone(&self.store),
                Arc::clone(&self.github),
                gate.clone(),
            );
            let stream_consumer = StreamConsumer::new(
                pool.clone(),
                &self.config.redis,
                repository.topic.clone(),
                consumer.clone(),
                Arc::new(handler),
            );
            info!(repository = %repository.pretty_name(), topic = %repository.topic, "subscribing");
            let cancel = supervisor.cancellation_token();
            supervisor.spawn_consumer(stream_consumer.run(cancel));
        }

        supervisor.run(shutdown).await
    }

    /// Bulk sync of the repositories named in `names` (all when empty).
    pub async fn sync(&self, names: &[String], options: SyncOptions) -> Result<SyncReport, CollectorError> {
        let repositories = self
            .config
            .select_repositories(names)
            .map_err(CollectorError::UnknownRepository)?;
        let given: Vec<&str> = repositories.iter().map(|r| r.given_name.as_str()).collect();
        warn!(repositories = %given.join(", "), "running sync jobs");

        let job = SyncJob::new(Arc::clone(&self.github), Arc::clone(&self.store), options);
        Ok(job.run(&repositories).await)
    }

    /// Install the index template of every repository.
    pub async fn sync_mapping(&self) -> Result<(), CollectorError> {
        sync_mapping(
            &self.elasticsearch,
            self.config.repositories.values().map(Arc::as_ref),
            &self.config.not_analyzed,
        )
        .await?;
        Ok(())
    }

    /// Store the user profiles of the TOML file at `path`, keyed by login.
    pub async fn sync_users(&self, path: impl AsRef<Path>) -> Result<usize, CollectorError> {
        let path = path.as_ref();
        let users_file = |reason: String| CollectorError::UsersFile {
            path: path.display().to_string(),
            reason,
        };
        let contents = std::fs::read_to_string(path).map_err(|e| users_file(e.to_string()))?;
        let users: BTreeMap<String, UserProfile> =
            toml::from_str(&contents).map_err(|e| users_file(e.to_string()))?;

        Ok(sync_users(&self.elasticsearch, USERS_INDEX, &users).await?)
    }

    pub async fn limits(&self) -> Result<RateLimits, CollectorError> {
        Ok(self.github.rate_limits().await?)
    }
}
