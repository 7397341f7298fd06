use serde_json::{Value, json};
use vossibility_store::Repository;

use crate::client::ElasticsearchClient;
use crate::error::ElasticsearchError;
use crate::indexer::TIMESTAMP_FIELD;

/// Name of the index template owned by the repository `given_name`.
pub fn template_name(given_name: &str) -> String {
    format!("vossibility-{given_name}")
}

/// Composable index template covering every index starting with
/// `index_prefix`. String fields matching one of `not_analyzed` are mapped
/// as `keyword`.
pub fn index_template(index_prefix: &str, not_analyzed: &[String]) -> Value {
    let dynamic_templates: Vec<Value> = not_analyzed
        .iter()
        .map(|pattern| {
            json!({
                pattern.as_str(): {
                    "match": pattern,
                    "match_mapping_type": "string",
                    "mapping": { "type": "keyword" }
                }
            })
        })
        .collect();

    json!({
        "index_patterns": [format!("{index_prefix}*")],
        "priority": 1,
        "template": {
            "mappings": {
                "properties": {
                    TIMESTAMP_FIELD: { "type": "date" }
                },
                "dynamic_templates": dynamic_templates
            }
        }
    })
}

/// Install the index template of every repository. Stops at the first
/// rejected template.
pub async fn sync_mapping<'a>(
    client: &ElasticsearchClient,
    repositories: impl IntoIterator<Item = &'a Repository>,
    not_analyzed: &[String],
) -> Result<(), ElasticsearchError> {
    for repository in repositories {
        let name = template_name(&repository.given_name);
        let template = index_template(&repository.index_prefix(), not_analyzed);
        client.put_index_template(&name, &template).await?;
        tracing::info!(repository = %repository.given_name, template = %name, "mapping synchronized");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_matches_prefix_and_patterns() {
        let template = index_template("docker-", &["*_id".to_owned(), "login".to_owned()]);
        assert_eq!(template["index_patterns"], json!(["docker-*"]));
        assert_eq!(template["priority"], json!(1));

        let mappings = &template["template"]["mappings"];
        assert_eq!(mappings["properties"]["@timestamp"]["type"], "date");
        assert_eq!(
            mappings["dynamic_templates"],
            json!([
                {"*_id": {"match": "*_id", "match_mapping_type": "string", "mapping": {"type": "keyword"}}},
                {"login": {"match": "login", "match_mapping_type": "string", "mapping": {"type": "keyword"}}}
            ])
        );
    }

    #[test]
    fn no_patterns_yields_empty_dynamic_templates() {
        let template = index_template("x-", &[]);
        assert_eq!(template["template"]["mappings"]["dynamic_templates"], json!([]));
    }

    #[test]
    fn template_names() {
        assert_eq!(template_name("docker"), "vossibility-docker");
    }
}
