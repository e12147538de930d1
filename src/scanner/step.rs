use crate::definition::Rule;
use crate::errors::VerifyError;
use crate::expr::Environment;
use crate::extract::ExtractError;
use crate::vars::{has_unresolved, render, Value, VariableSet, REQUEST_KEY, RESPONSE_KEY};
use super::toolkit::Toolkit;
use tracing::{debug, warn};

/// Join target and rule path with exactly one `/`.
pub fn compose_url(target: &str, path: &str) -> String {
    format!("{}/{}", target.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Run one rule against `target`.
///
/// `Ok(true)` / `Ok(false)` is the verification outcome; `Err` means the check
/// could not be performed. Models written to `vars` are released by the caller.
pub(crate) async fn execute(
    target: &str,
    index: usize,
    rule: &Rule,
    vars: &mut VariableSet,
    env: &Environment,
    toolkit: &Toolkit,
) -> Result<bool, VerifyError> {
    let url = compose_url(target, &render(&rule.path, vars));
    if has_unresolved(&url) {
        warn!(rule = index, url = %url, "Rule path has unbound placeholders");
    }
    let body = render(&rule.body, vars);
    let headers: Vec<(&str, String)> = rule
        .headers
        .iter()
        .map(|(name, value)| (name.as_str(), render(value, vars).into_owned()))
        .collect();

    let mut request = toolkit.requests.acquire();
    request.setup(&rule.method, &url, &body, headers.iter().map(|(n, v)| (*n, v.as_str())))?;

    debug!(rule = index, method = %request.method(), url = %url, "Executing rule");
    // A failed exchange drops `request` here, which returns it to its pool
    let raw = toolkit.transport.exchange(&request, rule.follow_redirects).await?;

    let mut response = toolkit.responses.acquire();
    response.fill(raw, &request);
    vars.insert(REQUEST_KEY, Value::Request(request));
    debug!(rule = index, status = response.status(), "Received response");

    if let Some(pattern) = rule.search_pattern() {
        let text = response.body_text();
        return match toolkit.extractor.extract(pattern, &text, vars) {
            Ok(()) => Ok(true),
            Err(ExtractError::NoMatch) => {
                debug!(rule = index, "Search pattern did not match");
                Ok(false)
            }
            Err(e) => Err(VerifyError::Extraction(e.to_string())),
        };
    }

    vars.insert(RESPONSE_KEY, Value::Response(response));
    match toolkit.evaluator.evaluate(env, &rule.expression, vars) {
        Ok(verified) => Ok(verified),
        Err(e) => {
            debug!(rule = index, expression = %rule.expression, error = %e, "Expression failed, treating as not verified");
            Ok(false)
        }
    }
}
