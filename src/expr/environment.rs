use std::collections::HashSet;
use std::sync::Arc;
use dashmap::DashMap;
use evalexpr::{build_operator_tree, ContextWithMutableVariables, HashMapContext, Node, Value as ExprValue};
use reqwest::header::HeaderMap;
use crate::errors::VerifyError;
use crate::http::{RequestModel, ResponseModel};
use crate::vars::{Scalar, Value, ValueKind, VariableSet, REQUEST_KEY, RESPONSE_KEY};
use super::evaluator::EvalError;
use super::functions::builtin_context;
use tracing::trace;

/// One schema entry, typed by the value its default expression produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub kind: ValueKind,
    pub default: Scalar,
}

/// Compiled evaluation context for one vulnerability definition.
///
/// Built once from the definition's variable schema and shared by every rule and
/// group of a session. Rule expressions are compiled on first use and cached.
pub struct Environment {
    declarations: Vec<Declaration>,
    base: HashMapContext,
    compiled: DashMap<String, Arc<Node>>,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("declarations", &self.declarations)
            .field("compiled", &self.compiled.len())
            .finish()
    }
}

impl Environment {
    /// Compile a schema of `name -> default expression` pairs, in order.
    /// Later defaults may reference earlier names.
    pub fn compile(schema: &[(String, String)]) -> Result<Self, VerifyError> {
        let base = builtin_context()
            .map_err(|e| VerifyError::Environment(format!("Failed to register functions: {}", e)))?;
        let mut scratch = base.clone();
        let mut seen = HashSet::new();
        let mut declarations = Vec::with_capacity(schema.len());

        for (name, expression) in schema {
            validate_name(name)?;
            if !seen.insert(name.as_str()) {
                return Err(VerifyError::Environment(format!("Duplicate variable '{}'", name)));
            }

            let node = build_operator_tree(expression).map_err(|e| {
                VerifyError::Environment(format!("Cannot parse default of '{}' ({}): {}", name, expression, e))
            })?;
            let value = node.eval_with_context(&scratch).map_err(|e| {
                VerifyError::Environment(format!("Cannot evaluate default of '{}' ({}): {}", name, expression, e))
            })?;
            let default = to_scalar(&value).ok_or_else(|| {
                VerifyError::Environment(format!("Default of '{}' has unsupported type: {}", name, value))
            })?;

            scratch
                .set_value(name.clone(), to_expr_value(&default))
                .map_err(|e| VerifyError::Environment(e.to_string()))?;
            declarations.push(Declaration { name: name.clone(), kind: default.kind(), default });
        }

        Ok(Self { declarations, base, compiled: DashMap::new() })
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn kind_of(&self, name: &str) -> Option<ValueKind> {
        self.declarations.iter().find(|d| d.name == name).map(|d| d.kind)
    }

    /// Write every declared default into `vars`.
    pub fn seed(&self, vars: &mut VariableSet) {
        for decl in &self.declarations {
            vars.insert(decl.name.clone(), decl.default.clone());
        }
    }

    pub(crate) fn node(&self, expression: &str) -> Result<Arc<Node>, EvalError> {
        if let Some(node) = self.compiled.get(expression) {
            return Ok(Arc::clone(node.value()));
        }
        let node = Arc::new(
            build_operator_tree(expression).map_err(|e| EvalError::Compile(e.to_string()))?,
        );
        trace!(expression, "Compiled expression");
        self.compiled.insert(expression.to_string(), Arc::clone(&node));
        Ok(node)
    }

    /// Build an evaluation context from `vars` without touching it.
    pub(crate) fn bind(&self, vars: &VariableSet) -> Result<HashMapContext, EvalError> {
        let mut ctx = self.base.clone();
        for (name, value) in vars.iter() {
            match value {
                Value::Request(req) if name == REQUEST_KEY => bind_request(&mut ctx, req)?,
                Value::Response(resp) if name == RESPONSE_KEY => bind_response(&mut ctx, resp)?,
                Value::Request(_) | Value::Response(_) => {}
                scalar => {
                    if let Some(expected) = self.kind_of(name) {
                        if scalar.kind() != expected {
                            return Err(EvalError::TypeMismatch {
                                name: name.to_string(),
                                expected,
                                found: scalar.kind(),
                            });
                        }
                    }
                    if let Some(s) = scalar.scalar() {
                        set(&mut ctx, name, to_expr_value(&s))?;
                    }
                }
            }
        }
        Ok(ctx)
    }
}

fn validate_name(name: &str) -> Result<(), VerifyError> {
    if name == REQUEST_KEY || name == RESPONSE_KEY {
        return Err(VerifyError::Environment(format!("'{}' is a reserved variable name", name)));
    }
    let mut chars = name.chars();
    let valid_start = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(VerifyError::Environment(format!("Invalid variable name '{}'", name)));
    }
    Ok(())
}

fn set(ctx: &mut HashMapContext, name: &str, value: ExprValue) -> Result<(), EvalError> {
    ctx.set_value(name.to_string(), value)
        .map_err(|e| EvalError::Bind(format!("{}: {}", name, e)))
}

fn bind_request(ctx: &mut HashMapContext, req: &RequestModel) -> Result<(), EvalError> {
    set(ctx, "request.method", ExprValue::String(req.method().to_string()))?;
    set(ctx, "request.url", ExprValue::String(req.url().map(|u| u.to_string()).unwrap_or_default()))?;
    set(ctx, "request.path", ExprValue::String(req.path().to_string()))?;
    set(ctx, "request.body", ExprValue::String(String::from_utf8_lossy(req.body()).into_owned()))?;
    bind_headers(ctx, "request.headers", req.headers())
}

fn bind_response(ctx: &mut HashMapContext, resp: &ResponseModel) -> Result<(), EvalError> {
    set(ctx, "response.status", ExprValue::Int(i64::from(resp.status())))?;
    set(ctx, "response.body", ExprValue::String(resp.body_text().into_owned()))?;
    set(ctx, "response.content_type", ExprValue::String(resp.content_type().to_string()))?;
    set(ctx, "response.url", ExprValue::String(resp.url().map(|u| u.to_string()).unwrap_or_default()))?;
    let latency = i64::try_from(resp.latency().as_millis()).unwrap_or(i64::MAX);
    set(ctx, "response.latency", ExprValue::Int(latency))?;
    bind_headers(ctx, "response.headers", resp.headers())
}

/// Headers become `<prefix>.<name>` with `-` turned into `_`; repeated headers are joined.
fn bind_headers(ctx: &mut HashMapContext, prefix: &str, headers: &HeaderMap) -> Result<(), EvalError> {
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        let key = format!("{}.{}", prefix, name.as_str().replace('-', "_"));
        set(ctx, &key, ExprValue::String(joined))?;
    }
    Ok(())
}

fn to_scalar(value: &ExprValue) -> Option<Scalar> {
    match value {
        ExprValue::String(s) => Some(Scalar::Str(s.clone())),
        ExprValue::Int(i) => Some(Scalar::Int(*i)),
        ExprValue::Float(f) => Some(Scalar::Float(*f)),
        ExprValue::Boolean(b) => Some(Scalar::Bool(*b)),
        _ => None,
    }
}

fn to_expr_value(scalar: &Scalar) -> ExprValue {
    match scalar {
        Scalar::Str(s) => ExprValue::String(s.clone()),
        Scalar::Int(i) => ExprValue::Int(*i),
        Scalar::Float(f) => ExprValue::Float(*f),
        Scalar::Bool(b) => ExprValue::Boolean(*b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_compile_types_from_defaults() {
        let env = Environment::compile(&schema(&[
            ("r1", "randomInt(1000, 9999)"),
            ("name", "\"admin\""),
            ("flag", "true"),
            ("ratio", "0.5"),
        ]))
        .unwrap();
        assert_eq!(env.kind_of("r1"), Some(ValueKind::Int));
        assert_eq!(env.kind_of("name"), Some(ValueKind::Str));
        assert_eq!(env.kind_of("flag"), Some(ValueKind::Bool));
        assert_eq!(env.kind_of("ratio"), Some(ValueKind::Float));
        assert_eq!(env.kind_of("missing"), None);
    }

    #[test]
    fn test_later_default_references_earlier() {
        let env = Environment::compile(&schema(&[("a", "2"), ("b", "a * 21")])).unwrap();
        assert_eq!(env.declarations()[1].default, Scalar::Int(42));
    }

    #[test]
    fn test_seed_writes_defaults() {
        let env = Environment::compile(&schema(&[("a", "\"x\""), ("n", "7")])).unwrap();
        let mut vars = VariableSet::new();
        env.seed(&mut vars);
        assert_eq!(vars.get_str("a"), Some("x"));
        assert_eq!(vars.get("n").and_then(Value::as_int), Some(7));
    }

    #[test]
    fn test_compile_errors() {
        assert!(matches!(Environment::compile(&schema(&[("a", "(")])), Err(VerifyError::Environment(_))));
        assert!(Environment::compile(&schema(&[("a", "undefined_var + 1")])).is_err());
        assert!(Environment::compile(&schema(&[("request", "1")])).is_err());
        assert!(Environment::compile(&schema(&[("bad-name", "1")])).is_err());
        assert!(Environment::compile(&schema(&[("a", "1"), ("a", "2")])).is_err());
        assert!(Environment::compile(&schema(&[("t", "(1, 2)")])).is_err());
    }

    #[test]
    fn test_empty_schema() {
        let env = Environment::compile(&[]).unwrap();
        assert!(env.declarations().is_empty());
    }

    #[test]
    fn test_bind_rejects_kind_mismatch() {
        let env = Environment::compile(&schema(&[("n", "1")])).unwrap();
        let mut vars = VariableSet::new();
        vars.insert("n", "not a number");
        let Err(err) = env.bind(&vars) else { panic!("expected a type mismatch") };
        assert!(matches!(err, EvalError::TypeMismatch { expected: ValueKind::Int, found: ValueKind::Str, .. }));
    }

    #[test]
    fn test_node_cache() {
        let env = Environment::compile(&[]).unwrap();
        let a = env.node("1 == 1").unwrap();
        let b = env.node("1 == 1").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(matches!(env.node("(1 == 1"), Err(EvalError::Compile(_))));
    }
}
