use thiserror::Error;
use vossibility_core::CoreError;

/// Errors raised while compiling or applying transformations.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The template source is malformed.
    #[error("parse error: {0}")]
    Parse(String),

    /// A template calls a function that is neither intrinsic nor registered.
    #[error("unknown function {0:?}")]
    UnknownFunction(String),

    /// Template execution failed.
    #[error("evaluation error: {0}")]
    Eval(String),

    /// A registered function returned an error.
    #[error("function {name:?} failed: {reason}")]
    Function {
        /// The function name as called from the template.
        name: String,
        /// The underlying failure.
        reason: String,
    },

    /// `apply_transformation` named a transformation that does not exist.
    #[error("no such transformation {0:?}")]
    UnknownTransformation(String),

    /// `apply_transformation` was given something other than an object.
    #[error("cannot apply transformation to non-object ({0})")]
    NonObject(&'static str),

    /// Nested transformations exceeded the depth limit.
    #[error("transformations nested deeper than {0} levels")]
    TooDeep(usize),

    /// A transformation defines only one of the two snapshot attributes.
    #[error("must define both or neither of _snapshot_id and _snapshot_field")]
    SnapshotPairing,

    /// A function name collides with an intrinsic.
    #[error("function name {0:?} is reserved")]
    ReservedFunction(String),

    /// An error attributed to one transformation.
    #[error("transformation {name:?}: {source}")]
    Transformation {
        name: String,
        #[source]
        source: Box<TransformError>,
    },

    /// An error attributed to one output field of a transformation.
    #[error("field {field:?}: {source}")]
    Field {
        field: String,
        #[source]
        source: Box<TransformError>,
    },

    /// An output value could not be pushed into the result blob.
    #[error(transparent)]
    Blob(#[from] CoreError),
}

impl TransformError {
    pub(crate) fn in_field(self, field: &str) -> Self {
        Self::Field {
            field: field.to_owned(),
            source: Box::new(self),
        }
    }

    pub(crate) fn in_transformation(self, name: &str) -> Self {
        Self::Transformation {
            name: name.to_owned(),
            source: Box::new(self),
        }
    }
}
