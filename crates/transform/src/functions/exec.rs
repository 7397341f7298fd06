use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;

use super::{FunctionError, TemplateFunction};

/// A user-configured executable exposed as a template function.
///
/// Arguments are passed on the command line, the Elasticsearch URL through the
/// `ELASTICSEARCH` environment variable, and standard output is parsed as
/// JSON.
#[derive(Debug, Clone)]
pub struct ExecFunction {
    program: PathBuf,
    elasticsearch: String,
}

impl ExecFunction {
    pub fn new(program: impl Into<PathBuf>, elasticsearch: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            elasticsearch: elasticsearch.into(),
        }
    }
}

#[async_trait]
impl TemplateFunction for ExecFunction {
    async fn call(&self, args: Vec<Value>) -> Result<Value, FunctionError> {
        let output = Command::new(&self.program)
            .args(args.iter().map(render_argument))
            .env("ELASTICSEARCH", &self.elasticsearch)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                FunctionError::Failed(format!("running {}: {e}", self.program.display()))
            })?;

        if !output.status.success() {
            return Err(FunctionError::Failed(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        serde_json::from_slice(&output.stdout).map_err(|e| {
            FunctionError::Failed(format!(
                "{} produced invalid JSON: {e}",
                self.program.display()
            ))
        })
    }
}

fn render_argument(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
