use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use vossibility_core::path::kind_of;

use super::{Command, Node, Operand, Pipeline, Template};
use crate::error::TransformError;
use crate::transformation::Scope;

/// Execution environment shared by every node of one template run.
#[derive(Clone, Copy)]
struct Env<'a> {
    root: &'a Value,
    scope: &'a Scope<'a>,
}

/// Execute `template` against `root` and unify the emitted values: nothing
/// becomes `null`, a single value is returned as is, several become an array.
pub(crate) async fn render(
    template: &Template,
    root: &Value,
    scope: &Scope<'_>,
) -> Result<Value, TransformError> {
    let env = Env { root, scope };
    let mut emitted = Vec::new();
    exec(template.nodes(), root, env, &mut emitted).await?;
    Ok(collapse(emitted))
}

fn collapse(mut values: Vec<Value>) -> Value {
    match values.len() {
        0 => Value::Null,
        1 => values.swap_remove(0),
        _ => Value::Array(values),
    }
}

/// `null`, `false`, zero, and empty strings or collections are false.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f.abs() > 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn exec<'a>(
    nodes: &'a [Node],
    dot: &'a Value,
    env: Env<'a>,
    out: &'a mut Vec<Value>,
) -> BoxFuture<'a, Result<(), TransformError>> {
    async move {
        for node in nodes {
            match node {
                Node::Text(text) => out.push(Value::String(text.clone())),
                Node::Emit(pipeline) => out.push(eval_pipeline(pipeline, dot, env).await?),
                Node::If {
                    branches,
                    otherwise,
                } => {
                    let mut taken = None;
                    for (condition, body) in branches {
                        if is_truthy(&eval_pipeline(condition, dot, env).await?) {
                            taken = Some(body);
                            break;
                        }
                    }
                    exec(taken.unwrap_or(otherwise), dot, env, out).await?;
                }
                Node::Range {
                    pipeline,
                    body,
                    otherwise,
                } => {
                    let collection = eval_pipeline(pipeline, dot, env).await?;
                    match &collection {
                        Value::Array(items) if !items.is_empty() => {
                            for item in items {
                                exec(body, item, env, out).await?;
                            }
                        }
                        Value::Object(map) if !map.is_empty() => {
                            for item in map.values() {
                                exec(body, item, env, out).await?;
                            }
                        }
                        Value::Array(_) | Value::Object(_) | Value::Null => {
                            exec(otherwise, dot, env, out).await?;
                        }
                        other => {
                            return Err(TransformError::Eval(format!(
                                "range can't iterate over a {}",
                                kind_of(other)
                            )));
                        }
                    }
                }
                Node::With {
                    pipeline,
                    body,
                    otherwise,
                } => {
                    let value = eval_pipeline(pipeline, dot, env).await?;
                    if is_truthy(&value) {
                        exec(body, &value, env, out).await?;
                    } else {
                        exec(otherwise, dot, env, out).await?;
                    }
                }
            }
        }
        Ok(())
    }
    .boxed()
}

fn eval_pipeline<'a>(
    pipeline: &'a Pipeline,
    dot: &'a Value,
    env: Env<'a>,
) -> BoxFuture<'a, Result<Value, TransformError>> {
    async move {
        let mut piped: Option<Value> = None;
        for command in &pipeline.commands {
            let value = match command {
                Command::Operand(operand) => eval_operand(operand, dot, env).await?,
                Command::Call { name, args } => {
                    let mut values = Vec::with_capacity(args.len() + 1);
                    for arg in args {
                        values.push(eval_operand(arg, dot, env).await?);
                    }
                    values.extend(piped.take());
                    env.scope.call(name, values).await?
                }
            };
            piped = Some(value);
        }
        Ok(piped.unwrap_or(Value::Null))
    }
    .boxed()
}

async fn eval_operand(
    operand: &Operand,
    dot: &Value,
    env: Env<'_>,
) -> Result<Value, TransformError> {
    match operand {
        Operand::Dot(fields) => walk(dot, fields),
        Operand::Root(fields) => walk(env.root, fields),
        Operand::Literal(value) => Ok(value.clone()),
        Operand::Function(name) => env.scope.call(name, Vec::new()).await,
        Operand::Sub { pipeline, fields } => {
            let value = eval_pipeline(pipeline, dot, env).await?;
            walk(&value, fields)
        }
    }
}

/// Follow field accessors. Missing members and anything below `null` yield
/// `null`; descending into a scalar is an error.
fn walk(value: &Value, fields: &[String]) -> Result<Value, TransformError> {
    let mut current = value;
    for field in fields {
        current = match current {
            Value::Null => return Ok(Value::Null),
            Value::Object(map) => match map.get(field) {
                Some(next) => next,
                None => return Ok(Value::Null),
            },
            Value::Array(items) => match field.parse::<usize>().ok().and_then(|i| items.get(i)) {
                Some(next) => next,
                None => return Ok(Value::Null),
            },
            other => {
                return Err(TransformError::Eval(format!(
                    "can't evaluate field {field} in a {}",
                    kind_of(other)
                )));
            }
        };
    }
    Ok(current.clone())
}
