use std::collections::HashMap;
use crate::http::{RequestModel, ResponseModel};
use super::template::render;
use super::value::{Scalar, Value};

/// Reserved name of the in-flight request model.
pub const REQUEST_KEY: &str = "request";
/// Reserved name of the in-flight response model.
pub const RESPONSE_KEY: &str = "response";

/// Name → value bag threaded through one target's rule chain.
#[derive(Debug, Default)]
pub struct VariableSet {
    values: HashMap<String, Value>,
}

impl VariableSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn request(&self) -> Option<&RequestModel> {
        match self.values.get(REQUEST_KEY)? {
            Value::Request(req) => Some(req),
            _ => None,
        }
    }

    pub fn response(&self) -> Option<&ResponseModel> {
        match self.values.get(RESPONSE_KEY)? {
            Value::Response(resp) => Some(resp),
            _ => None,
        }
    }

    /// Merge rule-local bindings. String values are rendered against the set first.
    pub fn merge_bindings(&mut self, bindings: &[(String, Scalar)]) {
        for (name, scalar) in bindings {
            let value = match scalar {
                Scalar::Str(s) => Value::Str(render(s, self).into_owned()),
                other => Value::from(other.clone()),
            };
            self.values.insert(name.clone(), value);
        }
    }

    /// Drop the transient `request`/`response` entries, returning pooled models to their pools.
    pub fn release_exchange(&mut self) {
        self.values.remove(REQUEST_KEY);
        self.values.remove(RESPONSE_KEY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Pool;

    #[test]
    fn test_insert_and_get() {
        let mut vars = VariableSet::new();
        vars.insert("a", "x");
        vars.insert("n", 3i64);
        assert_eq!(vars.get_str("a"), Some("x"));
        assert_eq!(vars.get("n").and_then(Value::as_int), Some(3));
        assert_eq!(vars.len(), 2);
        assert!(vars.contains("a"));
    }

    #[test]
    fn test_merge_bindings_renders_strings() {
        let mut vars = VariableSet::new();
        vars.insert("token", "abc");
        vars.merge_bindings(&[
            ("auth".to_string(), Scalar::Str("Bearer {{token}}".into())),
            ("retries".to_string(), Scalar::Int(2)),
        ]);
        assert_eq!(vars.get_str("auth"), Some("Bearer abc"));
        assert_eq!(vars.get("retries").and_then(Value::as_int), Some(2));
    }

    #[test]
    fn test_release_exchange_returns_models() {
        let requests: Pool<RequestModel> = Pool::new("requests", 4);
        let responses: Pool<ResponseModel> = Pool::new("responses", 4);
        let mut vars = VariableSet::new();
        vars.insert(REQUEST_KEY, Value::Request(requests.acquire()));
        vars.insert(RESPONSE_KEY, Value::Response(responses.acquire()));
        vars.insert("kept", 1i64);
        assert!(vars.request().is_some());
        assert!(vars.response().is_some());
        assert_eq!(requests.stats().outstanding, 1);

        vars.release_exchange();
        assert_eq!(requests.stats().outstanding, 0);
        assert_eq!(responses.stats().outstanding, 0);
        assert!(vars.request().is_none());
        assert!(vars.contains("kept"));
    }

    #[test]
    fn test_clear_releases_everything() {
        let requests: Pool<RequestModel> = Pool::new("requests", 4);
        let mut vars = VariableSet::new();
        vars.insert(REQUEST_KEY, Value::Request(requests.acquire()));
        vars.insert("a", "b");
        vars.clear();
        assert!(vars.is_empty());
        assert_eq!(requests.stats().outstanding, 0);
    }
}
