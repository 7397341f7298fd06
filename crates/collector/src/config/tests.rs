use std::sync::Arc;

use vossibility_core::PeriodicSync;
use vossibility_transform::{FunctionRegistry, MemoryUserStore, TransformError};

use super::*;

const VALID: &str = r#"
elasticsearch = "http://localhost:9200"
github_api_token = "t0k"
sync_periodicity = "hourly"

[redis]
url = "redis://queue:6379"
channel = "collector"

[mapping]
not_analyzed = ["*_id", "login"]

[repositories.docker]
user = "docker"
repo = "docker"
topic = "docker-events"
start_index = 4000

[repositories.machine]
user = "docker"
repo = "machine"
topic = "machine-events"
event_set = "minimal"

[event_set.default]
issues = "issue_event"
snapshot_issue = "issue"
snapshot_pull_request = "pull_request"

[event_set.minimal]
snapshot_issue = "issue"
snapshot_pull_request = "issue"

[transformations.issue_event]
action = "{{ .action }}"
issue = "{{ apply_transformation \"issue\" .issue }}"
_snapshot_id = "number"
_snapshot_field = "issue"

[transformations.issue]
number = "{{ .number }}"
author = "{{ user_data .user.login }}"
repository = "{{ (context).repository.full_name }}"

[transformations.pull_request]
number = "{{ .number }}"
"#;

fn with(extra: &str) -> String {
    format!("{VALID}\n{extra}")
}

fn registry() -> FunctionRegistry {
    FunctionRegistry::with_builtins(Arc::new(MemoryUserStore::default()))
}

#[test]
fn parse_valid_config() {
    let raw = RawConfig::from_toml(VALID).unwrap();
    assert_eq!(raw.repositories.len(), 2);
    assert_eq!(raw.repositories["docker"].event_set, "default");
    assert_eq!(raw.repositories["docker"].start_index, 4000);
    assert_eq!(raw.redis.channel, "collector");
    assert_eq!(raw.redis.prefix, "vossibility");
    assert_eq!(raw.mapping.not_analyzed, vec!["*_id", "login"]);
    assert_eq!(raw.periodic_sync().unwrap(), PeriodicSync::Hourly);
    assert_eq!(raw.github().token.as_deref(), Some("t0k"));
}

#[test]
fn build_resolves_repositories() {
    let config = RawConfig::from_toml(VALID).unwrap().build(registry()).unwrap();
    let docker = &config.repositories["docker"];
    assert_eq!(docker.full_name(), "docker/docker");
    assert_eq!(docker.topic, "docker-events");
    assert_eq!(docker.periodic_sync, PeriodicSync::Hourly);
    assert!(docker.is_subscribed("issues"));
    assert!(!config.repositories["machine"].is_subscribed("issues"));
    assert_eq!(config.elasticsearch.url, "http://localhost:9200");
    assert_eq!(config.not_analyzed.len(), 2);
}

#[test]
fn select_repositories() {
    let config = RawConfig::from_toml(VALID).unwrap().build(registry()).unwrap();
    assert_eq!(config.select_repositories(&[]).unwrap().len(), 2);

    let picked = config.select_repositories(&["machine".to_owned()]).unwrap();
    assert_eq!(picked[0].given_name, "machine");

    assert_eq!(
        config.select_repositories(&["nope".to_owned()]).unwrap_err(),
        "nope"
    );
}

#[test]
fn periodicity_defaults_to_daily() {
    let raw = RawConfig::from_toml(&VALID.replace("sync_periodicity = \"hourly\"", "")).unwrap();
    assert_eq!(raw.periodic_sync().unwrap(), PeriodicSync::Daily);
}

#[test]
fn invalid_periodicity() {
    let err =
        RawConfig::from_toml(&VALID.replace("\"hourly\"", "\"monthly\"")).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidPeriodicity(v) if v == "monthly"));
}

#[test]
fn unknown_transformation_in_event_set() {
    let err = RawConfig::from_toml(&with(
        "[event_set.broken]\nsnapshot_issue = \"issue\"\nsnapshot_pull_request = \"missing\"\n",
    ))
    .unwrap_err();
    match err {
        ConfigError::UnknownTransformation {
            event_set,
            transformation,
            ..
        } => {
            assert_eq!(event_set, "broken");
            assert_eq!(transformation, "missing");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_mandatory_event() {
    let err = RawConfig::from_toml(&with("[event_set.partial]\nsnapshot_issue = \"issue\"\n"))
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::MissingEvent { ref event_set, event: "snapshot_pull_request" } if event_set == "partial"
    ));
}

#[test]
fn unknown_event_set() {
    let err = RawConfig::from_toml(&with(
        "[repositories.swarm]\nuser = \"docker\"\nrepo = \"swarm\"\ntopic = \"swarm\"\nevent_set = \"nope\"\n",
    ))
    .unwrap_err();
    assert!(matches!(err, ConfigError::UnknownEventSet { ref repository, .. } if repository == "swarm"));
}

#[test]
fn duplicate_topic() {
    let err = RawConfig::from_toml(&with(
        "[repositories.swarm]\nuser = \"docker\"\nrepo = \"swarm\"\ntopic = \"docker-events\"\n",
    ))
    .unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateTopic { ref topic, .. } if topic == "docker-events"));
}

#[test]
fn snapshot_metadata_must_be_paired() {
    let err = RawConfig::from_toml(&with("[transformations.half]\n_snapshot_id = \"{{ .id }}\"\n"))
        .unwrap_err();
    assert!(matches!(err, ConfigError::SnapshotPairing { ref transformation } if transformation == "half"));
}

#[test]
fn unknown_template_function_fails_build() {
    let raw = RawConfig::from_toml(&with("[transformations.odd]\nx = \"{{ frobnicate .a }}\"\n")).unwrap();
    let err = raw.build(registry()).unwrap_err();
    assert!(matches!(err, ConfigError::Transform(_)));
}

#[test]
fn user_functions_cannot_shadow_intrinsics() {
    let raw = RawConfig::from_toml(&with("[functions]\ncontext = \"/bin/true\"\n")).unwrap();
    let err = raw
        .function_registry(Arc::new(MemoryUserStore::default()))
        .unwrap_err();
    assert!(matches!(err, ConfigError::Transform(TransformError::ReservedFunction(_))));
}

#[test]
fn user_functions_are_callable_from_templates() {
    let raw = RawConfig::from_toml(&with(
        "[functions]\nlookup = \"/usr/local/bin/lookup\"\n\n[transformations.looked_up]\nx = \"{{ lookup .a }}\"\n",
    ))
    .unwrap();
    let registry = raw
        .function_registry(Arc::new(MemoryUserStore::default()))
        .unwrap();
    assert!(registry.is_known("lookup"));
    assert!(raw.build(registry).is_ok());
}

#[test]
fn missing_file() {
    let err = RawConfig::load("/nonexistent/config.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn elasticsearch_credentials() {
    let raw = RawConfig::from_toml(&VALID.replace(
        "github_api_token",
        "elasticsearch_username = \"elastic\"\nelasticsearch_password = \"pw\"\ngithub_api_token",
    ))
    .unwrap();
    let es = raw.elasticsearch();
    assert_eq!(es.username.as_deref(), Some("elastic"));
    assert_eq!(es.password.as_deref(), Some("pw"));
}
