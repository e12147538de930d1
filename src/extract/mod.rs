//! Pattern-based extraction from response bodies.

use std::sync::Arc;
use dashmap::DashMap;
use regex::Regex;
use thiserror::Error;
use crate::vars::VariableSet;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// The pattern is valid but did not match. Not a failure of the check itself.
    #[error("pattern did not match")]
    NoMatch,

    #[error("invalid pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },
}

/// Runs a rule's `search` pattern against a response body.
pub trait Extractor: Send + Sync {
    /// On match, writes captures into `vars`.
    fn extract(&self, pattern: &str, text: &str, vars: &mut VariableSet) -> Result<(), ExtractError>;
}

/// Regex extractor. Named groups bind under their own name, unnamed groups as `search.<index>`.
#[derive(Debug, Default)]
pub struct RegexExtractor {
    cache: DashMap<String, Arc<Regex>>,
}

impl RegexExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    fn compiled(&self, pattern: &str) -> Result<Arc<Regex>, ExtractError> {
        if let Some(re) = self.cache.get(pattern) {
            return Ok(Arc::clone(re.value()));
        }
        let re = Regex::new(pattern).map_err(|e| ExtractError::Pattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        let re = Arc::new(re);
        self.cache.insert(pattern.to_string(), Arc::clone(&re));
        Ok(re)
    }
}

impl Extractor for RegexExtractor {
    fn extract(&self, pattern: &str, text: &str, vars: &mut VariableSet) -> Result<(), ExtractError> {
        let re = self.compiled(pattern)?;
        let caps = re.captures(text).ok_or(ExtractError::NoMatch)?;

        for (index, name) in re.capture_names().enumerate().skip(1) {
            let Some(m) = caps.get(index) else { continue };
            let key = match name {
                Some(name) => name.to_string(),
                None => format!("search.{}", index),
            };
            trace!(variable = %key, "Captured search variable");
            vars.insert(key, m.as_str());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_group_binds() {
        let mut vars = VariableSet::new();
        RegexExtractor::new()
            .extract(r"token=(?P<token>\w+)", "token=abc123", &mut vars)
            .unwrap();
        assert_eq!(vars.get_str("token"), Some("abc123"));
    }

    #[test]
    fn test_unnamed_group_binds_by_index() {
        let mut vars = VariableSet::new();
        RegexExtractor::new()
            .extract(r"token=(\w+); id=(\d+)", "token=abc123; id=7", &mut vars)
            .unwrap();
        assert_eq!(vars.get_str("search.1"), Some("abc123"));
        assert_eq!(vars.get_str("search.2"), Some("7"));
    }

    #[test]
    fn test_plain_token_pattern_binds_index_only() {
        let mut vars = VariableSet::new();
        RegexExtractor::new()
            .extract(r"token=(\w+)", "token=abc123", &mut vars)
            .unwrap();
        assert_eq!(vars.get_str("search.1"), Some("abc123"));
        assert!(!vars.contains("token"));
    }

    #[test]
    fn test_match_without_groups() {
        let mut vars = VariableSet::new();
        RegexExtractor::new().extract("root:x:0", "root:x:0:0", &mut vars).unwrap();
        assert!(vars.is_empty());
    }

    #[test]
    fn test_no_match() {
        let mut vars = VariableSet::new();
        let err = RegexExtractor::new().extract(r"token=(\w+)", "nothing", &mut vars).unwrap_err();
        assert_eq!(err, ExtractError::NoMatch);
        assert!(vars.is_empty());
    }

    #[test]
    fn test_invalid_pattern() {
        let mut vars = VariableSet::new();
        let err = RegexExtractor::new().extract("(unclosed", "x", &mut vars).unwrap_err();
        assert!(matches!(err, ExtractError::Pattern { .. }));
    }

    #[test]
    fn test_optional_group_skipped() {
        let mut vars = VariableSet::new();
        RegexExtractor::new()
            .extract(r"a(?P<opt>b)?c", "ac", &mut vars)
            .unwrap();
        assert!(!vars.contains("opt"));
    }

    #[test]
    fn test_pattern_cached() {
        let extractor = RegexExtractor::new();
        let a = extractor.compiled("x+").unwrap();
        let b = extractor.compiled("x+").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
