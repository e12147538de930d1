//! Rule-driven HTTP verification engine.
//!
//! A [`Definition`] describes how to prove one vulnerability: a variable schema
//! and either a chain of [`Rule`]s or named groups of chains. A [`SessionPool`]
//! hands out [`ScanSession`]s bound to a definition; each session replays the
//! rules against one target, threading extracted variables and the last
//! request/response through a [`VariableSet`] into the expression evaluator.

pub mod config;
pub mod definition;
pub mod errors;
pub mod expr;
pub mod extract;
pub mod http;
pub mod logging;
pub mod pool;
pub mod scanner;
pub mod vars;

pub use config::EngineConfig;
pub use definition::{Definition, Rule, RuleGroup, RuleSet};
pub use errors::{TransportError, VerifyError};
pub use scanner::{ScanSession, SessionPool, Toolkit};
pub use vars::{Value, VariableSet};
