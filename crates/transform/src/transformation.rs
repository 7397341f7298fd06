use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use vossibility_core::path::{self, kind_of};
use vossibility_core::{Blob, MetadataField};

use crate::error::TransformError;
use crate::functions::{APPLY_TRANSFORMATION, CONTEXT, FunctionRegistry};
use crate::template::{self, Template};
use crate::transformations::{MAX_NESTING_DEPTH, Transformations};

/// Repository description returned by the `context` template function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryInfo {
    pub given_name: String,
    pub full_name: String,
    pub pretty_name: String,
    pub user: String,
    pub repo: String,
}

/// Data a transformation can consult besides the document itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformContext {
    pub repository: RepositoryInfo,
}

/// Evaluation scope: the sibling transformations, the caller's context and
/// the current nesting depth.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    transformations: &'a Transformations,
    context: &'a TransformContext,
    depth: usize,
}

impl<'a> Scope<'a> {
    #[must_use]
    pub fn new(transformations: &'a Transformations, context: &'a TransformContext) -> Self {
        Self {
            transformations,
            context,
            depth: 0,
        }
    }

    fn nested(&self) -> Result<Self, TransformError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(TransformError::TooDeep(MAX_NESTING_DEPTH));
        }
        Ok(Self {
            depth: self.depth + 1,
            ..*self
        })
    }

    /// Call a template function by name.
    pub(crate) async fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, TransformError> {
        match name {
            APPLY_TRANSFORMATION => self.apply_transformation(args).await,
            CONTEXT => serde_json::to_value(self.context)
                .map_err(|e| TransformError::Eval(e.to_string())),
            _ => {
                let function = self
                    .transformations
                    .functions()
                    .get(name)
                    .ok_or_else(|| TransformError::UnknownFunction(name.to_owned()))?;
                function
                    .call(args)
                    .await
                    .map_err(|e| TransformError::Function {
                        name: name.to_owned(),
                        reason: e.to_string(),
                    })
            }
        }
    }

    async fn apply_transformation(&self, args: Vec<Value>) -> Result<Value, TransformError> {
        let bad_arguments = |reason: String| TransformError::Function {
            name: APPLY_TRANSFORMATION.to_owned(),
            reason,
        };
        let [name, object] = <[Value; 2]>::try_from(args)
            .map_err(|args| bad_arguments(format!("expected 2 arguments, got {}", args.len())))?;
        let Value::String(name) = name else {
            return Err(bad_arguments(format!(
                "transformation name must be a string, got a {}",
                kind_of(&name)
            )));
        };

        let transformation = self
            .transformations
            .get(&name)
            .ok_or(TransformError::UnknownTransformation(name))?;
        match object {
            Value::Null => Ok(Value::Null),
            Value::Object(_) => {
                let nested = self.nested()?;
                let output = transformation.apply_to_object(&nested, &object).await?;
                Ok(Value::Object(output))
            }
            other => Err(TransformError::NonObject(kind_of(&other))),
        }
    }
}

#[derive(Debug, Clone)]
enum Field {
    /// Copy the input value found at the output path.
    PassThrough,
    Template(Template),
}

/// A compiled mapping from output paths to templates.
#[derive(Debug, Clone)]
pub struct Transformation {
    name: String,
    fields: BTreeMap<String, Field>,
}

impl Transformation {
    /// Compile a transformation definition. Empty sources are pass-through.
    ///
    /// Every template must parse and call only functions known to `registry`,
    /// and the snapshot attributes must come as a pair.
    pub fn compile(
        name: &str,
        definition: &BTreeMap<String, String>,
        registry: &FunctionRegistry,
    ) -> Result<Self, TransformError> {
        Self::compile_fields(definition, registry)
            .map(|fields| Self {
                name: name.to_owned(),
                fields,
            })
            .map_err(|e| e.in_transformation(name))
    }

    fn compile_fields(
        definition: &BTreeMap<String, String>,
        registry: &FunctionRegistry,
    ) -> Result<BTreeMap<String, Field>, TransformError> {
        let mut fields = BTreeMap::new();
        for (key, source) in definition {
            let field = if source.trim().is_empty() {
                Field::PassThrough
            } else {
                let template = Template::parse(source).map_err(|e| e.in_field(key))?;
                if let Some(unknown) = template.functions().into_iter().find(|f| !registry.is_known(f))
                {
                    return Err(TransformError::UnknownFunction(unknown.to_owned()).in_field(key));
                }
                Field::Template(template)
            };
            fields.insert(key.clone(), field);
        }

        let has_id = fields.contains_key(MetadataField::SnapshotId.key());
        let has_field = fields.contains_key(MetadataField::SnapshotField.key());
        if has_id != has_field {
            return Err(TransformError::SnapshotPairing);
        }
        Ok(fields)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Output paths, in evaluation order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    #[must_use]
    pub fn defines(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Apply to a blob. The result inherits type, ID and timestamp; outputs
    /// in the reserved namespace become metadata of the new blob.
    pub async fn apply(&self, scope: &Scope<'_>, blob: &Blob) -> Result<Blob, TransformError> {
        let mut result = Blob::new(blob.kind(), blob.id());
        result.set_timestamp(blob.timestamp());
        for (key, field) in &self.fields {
            let value = evaluate(key, field, blob.data(), scope).await?;
            result
                .push(key, value)
                .map_err(|e| TransformError::from(e).in_field(key))?;
        }
        Ok(result)
    }

    /// Apply to a plain object. Output keys are taken literally and no
    /// metadata handling takes place.
    pub async fn apply_to_object(
        &self,
        scope: &Scope<'_>,
        object: &Value,
    ) -> Result<Map<String, Value>, TransformError> {
        if !object.is_object() {
            return Err(TransformError::NonObject(kind_of(object)));
        }
        let mut result = Map::new();
        for (key, field) in &self.fields {
            let value = evaluate(key, field, object, scope).await?;
            result.insert(key.clone(), value);
        }
        Ok(result)
    }
}

async fn evaluate(
    key: &str,
    field: &Field,
    input: &Value,
    scope: &Scope<'_>,
) -> Result<Value, TransformError> {
    match field {
        Field::PassThrough => Ok(path::get(input, key).cloned().unwrap_or(Value::Null)),
        Field::Template(template) => template::render(template, input, scope)
            .await
            .map_err(|e| e.in_field(key)),
    }
}
