pub mod set;
pub mod template;
pub mod value;

pub use set::{VariableSet, REQUEST_KEY, RESPONSE_KEY};
pub use template::{has_unresolved, render};
pub use value::{Scalar, Value, ValueKind};
