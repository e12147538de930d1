use std::borrow::Cow;
use std::sync::LazyLock;
use regex::{Captures, Regex};
use super::set::VariableSet;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.]*)\s*\}\}").expect("placeholder pattern is valid")
});

/// Replace `{{name}}` with the text of scalar variables. Unknown names are left as written.
pub fn render<'a>(template: &'a str, vars: &VariableSet) -> Cow<'a, str> {
    if !template.contains("{{") {
        return Cow::Borrowed(template);
    }
    PLACEHOLDER.replace_all(template, |caps: &Captures| {
        vars.get(&caps[1])
            .and_then(|v| v.to_text())
            .unwrap_or_else(|| caps[0].to_string())
    })
}

/// Returns true if the text still has unresolved {{placeholders}}
pub fn has_unresolved(text: &str) -> bool {
    PLACEHOLDER.is_match(text)
}
