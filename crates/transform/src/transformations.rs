use std::collections::{BTreeMap, HashMap};

use vossibility_core::Blob;

use crate::error::TransformError;
use crate::functions::FunctionRegistry;
use crate::transformation::{Scope, TransformContext, Transformation};

/// Maximum depth of `apply_transformation` nesting.
pub const MAX_NESTING_DEPTH: usize = 16;

/// Every transformation of one configuration, compiled against one function
/// registry. Immutable once built; share it behind an `Arc`.
#[derive(Debug)]
pub struct Transformations {
    transformations: HashMap<String, Transformation>,
    functions: FunctionRegistry,
}

impl Transformations {
    /// Compile all definitions, keyed by transformation name.
    pub fn compile(
        definitions: &BTreeMap<String, BTreeMap<String, String>>,
        functions: FunctionRegistry,
    ) -> Result<Self, TransformError> {
        let mut transformations = HashMap::with_capacity(definitions.len());
        for (name, definition) in definitions {
            let transformation = Transformation::compile(name, definition, &functions)?;
            transformations.insert(name.clone(), transformation);
        }
        Ok(Self {
            transformations,
            functions,
        })
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Transformation> {
        self.transformations.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.transformations.contains_key(name)
    }

    #[must_use]
    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Apply the transformation `name` to `blob`.
    pub async fn apply(
        &self,
        name: &str,
        context: &TransformContext,
        blob: &Blob,
    ) -> Result<Blob, TransformError> {
        let transformation = self
            .get(name)
            .ok_or_else(|| TransformError::UnknownTransformation(name.to_owned()))?;
        transformation.apply(&Scope::new(self, context), blob).await
    }
}
