//! A small template language in the style of Go's `text/template`.
//!
//! Instead of rendering text, executing a template yields the sequence of
//! values its actions emit. [`Template::parse`] builds the AST, the `eval`
//! module runs it.

mod eval;
mod parser;

use std::collections::BTreeSet;

use serde_json::Value;

use crate::error::TransformError;

pub(crate) use eval::render;

/// A parsed template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

/// A node of the template body.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text outside actions, emitted as a string.
    Text(String),
    /// `{{ pipeline }}`: emits the pipeline value.
    Emit(Pipeline),
    /// `{{ if }}` with its `else if` chain and final `else`.
    If {
        branches: Vec<(Pipeline, Vec<Node>)>,
        otherwise: Vec<Node>,
    },
    /// `{{ range }}`: runs `body` once per element, `otherwise` when empty.
    Range {
        pipeline: Pipeline,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
    /// `{{ with }}`: runs `body` with dot rebound when the value is truthy.
    With {
        pipeline: Pipeline,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

/// Commands chained with `|`. Each stage after the first receives the
/// previous value as its last argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// A function call with space-separated arguments.
    Call { name: String, args: Vec<Operand> },
    /// A bare operand, only valid as the first stage.
    Operand(Operand),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// `.` followed by field names.
    Dot(Vec<String>),
    /// `$` followed by field names.
    Root(Vec<String>),
    Literal(Value),
    /// A function called without arguments, in argument position.
    Function(String),
    /// `( pipeline )` followed by field names.
    Sub {
        pipeline: Box<Pipeline>,
        fields: Vec<String>,
    },
}

impl Template {
    /// Parse template source.
    pub fn parse(source: &str) -> Result<Self, TransformError> {
        parser::parse_template(source).map(|nodes| Self { nodes })
    }

    pub(crate) fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Names of every function the template calls.
    #[must_use]
    pub fn functions(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        collect_nodes(&self.nodes, &mut names);
        names
    }
}

fn collect_nodes<'a>(nodes: &'a [Node], names: &mut BTreeSet<&'a str>) {
    for node in nodes {
        match node {
            Node::Text(_) => {}
            Node::Emit(pipeline) => collect_pipeline(pipeline, names),
            Node::If {
                branches,
                otherwise,
            } => {
                for (condition, body) in branches {
                    collect_pipeline(condition, names);
                    collect_nodes(body, names);
                }
                collect_nodes(otherwise, names);
            }
            Node::Range {
                pipeline,
                body,
                otherwise,
            }
            | Node::With {
                pipeline,
                body,
                otherwise,
            } => {
                collect_pipeline(pipeline, names);
                collect_nodes(body, names);
                collect_nodes(otherwise, names);
            }
        }
    }
}

fn collect_pipeline<'a>(pipeline: &'a Pipeline, names: &mut BTreeSet<&'a str>) {
    for command in &pipeline.commands {
        match command {
            Command::Call { name, args } => {
                names.insert(name.as_str());
                for arg in args {
                    collect_operand(arg, names);
                }
            }
            Command::Operand(operand) => collect_operand(operand, names),
        }
    }
}

fn collect_operand<'a>(operand: &'a Operand, names: &mut BTreeSet<&'a str>) {
    match operand {
        Operand::Function(name) => {
            names.insert(name.as_str());
        }
        Operand::Sub { pipeline, .. } => collect_pipeline(pipeline, names),
        Operand::Dot(_) | Operand::Root(_) | Operand::Literal(_) => {}
    }
}
