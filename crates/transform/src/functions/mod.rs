//! Functions callable from templates.
//!
//! `apply_transformation` and `context` are intrinsics resolved by the
//! evaluator itself; everything else goes through a [`FunctionRegistry`]
//! shared by all transformations of one configuration.

pub mod dates;
pub mod exec;
pub mod users;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::error::TransformError;

/// Apply a sibling transformation to a nested object.
pub const APPLY_TRANSFORMATION: &str = "apply_transformation";

/// Describe the repository owning the data under transformation.
pub const CONTEXT: &str = "context";

pub const INTRINSICS: [&str; 2] = [APPLY_TRANSFORMATION, CONTEXT];

/// Failure reported by a [`TemplateFunction`].
#[derive(Debug, Error)]
pub enum FunctionError {
    #[error("expected {expected} argument(s), got {found}")]
    Arity { expected: usize, found: usize },

    #[error("{0}")]
    Failed(String),
}

/// A function exposed to templates.
#[async_trait]
pub trait TemplateFunction: Send + Sync {
    async fn call(&self, args: Vec<Value>) -> Result<Value, FunctionError>;
}

/// Take exactly `N` arguments.
pub(crate) fn arguments<const N: usize>(args: Vec<Value>) -> Result<[Value; N], FunctionError> {
    <[Value; N]>::try_from(args).map_err(|args| FunctionError::Arity {
        expected: N,
        found: args.len(),
    })
}

/// Named functions available to templates.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn TemplateFunction>>,
}

impl FunctionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding `days_difference` and `user_data`.
    pub fn with_builtins(users: Arc<dyn users::UserStore>) -> Self {
        let mut registry = Self::new();
        registry
            .functions
            .insert("days_difference".to_owned(), Arc::new(dates::DaysDifference));
        registry
            .functions
            .insert("user_data".to_owned(), Arc::new(users::UserData::new(users)));
        registry
    }

    /// Register `function` under `name`, replacing any previous entry.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        function: Arc<dyn TemplateFunction>,
    ) -> Result<(), TransformError> {
        let name = name.into();
        if INTRINSICS.contains(&name.as_str()) {
            return Err(TransformError::ReservedFunction(name));
        }
        self.functions.insert(name, function);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn TemplateFunction>> {
        self.functions.get(name)
    }

    /// Whether a template may call `name`.
    #[must_use]
    pub fn is_known(&self, name: &str) -> bool {
        INTRINSICS.contains(&name) || self.functions.contains_key(name)
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("FunctionRegistry")
            .field("functions", &names)
            .finish()
    }
}
