use thiserror::Error;
use crate::vars::{ValueKind, VariableSet};
use super::environment::Environment;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("cannot compile expression: {0}")]
    Compile(String),

    #[error("cannot bind variable {0}")]
    Bind(String),

    #[error("variable '{name}' is declared as {expected} but holds {found}")]
    TypeMismatch {
        name: String,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("evaluation failed: {0}")]
    Evaluate(String),
}

/// Evaluates a boolean rule expression. Must not mutate the variable set.
pub trait Evaluator: Send + Sync {
    fn evaluate(
        &self,
        env: &Environment,
        expression: &str,
        vars: &VariableSet,
    ) -> Result<bool, EvalError>;
}

/// Default evaluator backed by `evalexpr`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExprEvaluator;

impl Evaluator for ExprEvaluator {
    fn evaluate(
        &self,
        env: &Environment,
        expression: &str,
        vars: &VariableSet,
    ) -> Result<bool, EvalError> {
        let node = env.node(expression)?;
        let ctx = env.bind(vars)?;
        node.eval_boolean_with_context(&ctx)
            .map_err(|e| EvalError::Evaluate(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{RawResponse, RequestModel, ResponseModel};
    use crate::pool::Pool;
    use crate::vars::{Value, REQUEST_KEY, RESPONSE_KEY};
    use reqwest::header::{HeaderMap, HeaderValue};

    fn exchange_vars(requests: &Pool<RequestModel>, responses: &Pool<ResponseModel>) -> VariableSet {
        let mut req = requests.acquire();
        req.setup("GET", "http://a.test/ping", "", [("X-Probe", "1")]).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("text/plain"));
        headers.insert("x-powered-by", HeaderValue::from_static("PHP/5.4"));
        let mut resp = responses.acquire();
        resp.fill(RawResponse { status: 200, headers, body: b"pong root:x:0".to_vec(), ..Default::default() }, &req);

        let mut vars = VariableSet::new();
        vars.insert(REQUEST_KEY, Value::Request(req));
        vars.insert(RESPONSE_KEY, Value::Response(resp));
        vars
    }

    #[test]
    fn test_response_fields() {
        let requests = Pool::new("requests", 2);
        let responses = Pool::new("responses", 2);
        let vars = exchange_vars(&requests, &responses);
        let env = Environment::compile(&[]).unwrap();
        let eval = ExprEvaluator;

        assert!(eval.evaluate(&env, "response.status == 200", &vars).unwrap());
        assert!(eval.evaluate(&env, r#"bcontains(response.body, "root:x:0")"#, &vars).unwrap());
        assert!(eval.evaluate(&env, r#"response.content_type == "text/plain""#, &vars).unwrap());
        assert!(eval.evaluate(&env, r#"icontains(response.headers.x_powered_by, "php")"#, &vars).unwrap());
        assert!(eval.evaluate(&env, r#"request.method == "GET" && request.path == "/ping""#, &vars).unwrap());
        assert!(eval.evaluate(&env, r#"request.headers.x_probe == "1""#, &vars).unwrap());
        assert!(!eval.evaluate(&env, "response.status == 404", &vars).unwrap());
    }

    #[test]
    fn test_declared_and_extracted_variables() {
        let env = Environment::compile(&[("expected".to_string(), "\"abc123\"".to_string())]).unwrap();
        let mut vars = VariableSet::new();
        env.seed(&mut vars);
        vars.insert("token", "abc123");
        assert!(ExprEvaluator.evaluate(&env, "token == expected", &vars).unwrap());
    }

    #[test]
    fn test_non_boolean_result_is_error() {
        let env = Environment::compile(&[]).unwrap();
        let vars = VariableSet::new();
        assert!(matches!(ExprEvaluator.evaluate(&env, "1 + 1", &vars), Err(EvalError::Evaluate(_))));
        assert!(ExprEvaluator.evaluate(&env, "", &vars).is_err());
    }

    #[test]
    fn test_unknown_variable_is_error() {
        let env = Environment::compile(&[]).unwrap();
        let vars = VariableSet::new();
        assert!(ExprEvaluator.evaluate(&env, "response.status == 200", &vars).is_err());
    }

    #[test]
    fn test_evaluation_does_not_mutate_vars() {
        let requests = Pool::new("requests", 2);
        let responses = Pool::new("responses", 2);
        let vars = exchange_vars(&requests, &responses);
        let env = Environment::compile(&[]).unwrap();
        let before = vars.len();
        ExprEvaluator.evaluate(&env, "response.status == 200", &vars).unwrap();
        assert_eq!(vars.len(), before);
        assert_eq!(requests.stats().outstanding, 1);
    }
}
