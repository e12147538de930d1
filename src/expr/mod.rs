pub mod environment;
pub mod evaluator;
pub mod functions;

pub use environment::{Declaration, Environment};
pub use evaluator::{EvalError, Evaluator, ExprEvaluator};
