use std::path::Path;
use crate::errors::VerifyError;
use super::types::{Definition, Rule, RuleSet};
use tracing::{info, warn};

const MAX_DEFINITION_BYTES: u64 = 1_048_576;

pub fn parse_definition(content: &str) -> Result<Definition, VerifyError> {
    let definition: Definition = serde_yaml::from_str(content)?;
    validate_definition(&definition)?;
    Ok(definition)
}

pub fn load_definition(path: &Path) -> Result<Definition, VerifyError> {
    if !path.exists() {
        return Err(VerifyError::Definition(format!("Definition file not found: {}", path.display())));
    }
    if std::fs::metadata(path)?.len() > MAX_DEFINITION_BYTES {
        return Err(VerifyError::Definition(format!("Definition exceeds 1MB limit: {}", path.display())));
    }

    let content = std::fs::read_to_string(path)?;
    parse_definition(&content)
        .map_err(|e| VerifyError::Definition(format!("{}: {}", path.display(), e)))
}

/// Load every `*.yaml` / `*.yml` definition in `dir`, sorted by file name.
pub fn load_definitions(dir: &Path) -> Result<Vec<Definition>, VerifyError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();
    for ext in ["yaml", "yml"] {
        let pattern = dir.join(format!("*.{}", ext));
        let pattern_str = pattern.to_string_lossy();
        for entry in glob::glob(&pattern_str)
            .map_err(|e| VerifyError::Config(format!("Invalid glob pattern: {}", e)))?
        {
            paths.push(entry.map_err(|e| VerifyError::Config(format!("Glob error: {}", e)))?);
        }
    }
    paths.sort();

    let mut definitions = Vec::with_capacity(paths.len());
    for path in &paths {
        let definition = load_definition(path)?;
        info!(definition = %definition.name, rules = rule_count(&definition.rules), "Loaded definition");
        definitions.push(definition);
    }
    Ok(definitions)
}

/// Structural checks the engine itself does not make.
pub fn validate_definition(definition: &Definition) -> Result<(), VerifyError> {
    if definition.name.trim().is_empty() {
        return Err(VerifyError::Definition("Definition name is empty".into()));
    }

    match &definition.rules {
        RuleSet::Chain(rules) => validate_rules(&definition.name, None, rules),
        RuleSet::Groups(groups) => {
            if groups.is_empty() {
                return Err(VerifyError::Definition(format!("'{}' has no rule groups", definition.name)));
            }
            for group in groups {
                validate_rules(&definition.name, Some(&group.name), &group.rules)?;
            }
            Ok(())
        }
    }
}

fn validate_rules(name: &str, group: Option<&str>, rules: &[Rule]) -> Result<(), VerifyError> {
    let location = match group {
        Some(g) => format!("'{}' group '{}'", name, g),
        None => format!("'{}'", name),
    };
    if rules.is_empty() {
        return Err(VerifyError::Definition(format!("{} has no rules", location)));
    }
    for (index, rule) in rules.iter().enumerate() {
        let has_search = rule.search_pattern().is_some();
        let has_expression = !rule.expression.trim().is_empty();
        if !has_search && !has_expression {
            return Err(VerifyError::Definition(format!(
                "{} rule #{} has neither search nor expression",
                location, index
            )));
        }
        if has_search && has_expression {
            warn!(definition = name, rule = index, "Rule has both search and expression, expression is ignored");
        }
    }
    Ok(())
}

fn rule_count(rules: &RuleSet) -> usize {
    match rules {
        RuleSet::Chain(rules) => rules.len(),
        RuleSet::Groups(groups) => groups.iter().map(|g| g.rules.len()).sum(),
    }
}
