pub mod loader;
pub mod types;

pub use loader::{load_definition, load_definitions, parse_definition, validate_definition};
pub use types::{Definition, Detail, Rule, RuleGroup, RuleSet};
