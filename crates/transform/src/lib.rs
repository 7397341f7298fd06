pub mod error;
pub mod functions;
pub mod template;
pub mod transformation;
pub mod transformations;

pub use error::TransformError;
pub use functions::dates::DaysDifference;
pub use functions::exec::ExecFunction;
pub use functions::users::{MemoryUserStore, UserData, UserProfile, UserStore};
pub use functions::{FunctionError, FunctionRegistry, TemplateFunction};
pub use template::Template;
pub use transformation::{RepositoryInfo, Scope, TransformContext, Transformation};
pub use transformations::{MAX_NESTING_DEPTH, Transformations};
