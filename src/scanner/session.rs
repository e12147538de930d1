use std::sync::Arc;
use crate::definition::{Definition, Rule, RuleGroup, RuleSet};
use crate::errors::VerifyError;
use crate::expr::Environment;
use crate::pool::Reset;
use crate::vars::VariableSet;
use super::step;
use super::toolkit::Toolkit;
use tracing::{debug, info, warn};

/// Per-target execution unit: one environment, one variable set.
///
/// Sessions come from a [`SessionPool`](super::SessionPool) already bound to a
/// definition. Rules run strictly in order; there is no parallelism inside a session.
#[derive(Default)]
pub struct ScanSession {
    definition: String,
    env: Option<Arc<Environment>>,
    toolkit: Option<Arc<Toolkit>>,
    vars: VariableSet,
}

impl std::fmt::Debug for ScanSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSession")
            .field("definition", &self.definition)
            .field("bound", &self.is_bound())
            .field("vars", &self.vars)
            .finish()
    }
}

impl Reset for ScanSession {
    fn reset(&mut self) {
        self.definition.clear();
        self.env = None;
        self.toolkit = None;
        self.vars.clear();
    }
}

impl ScanSession {
    pub(crate) fn bind(&mut self, definition: &str, env: Arc<Environment>, toolkit: Arc<Toolkit>) {
        self.definition.push_str(definition);
        env.seed(&mut self.vars);
        self.env = Some(env);
        self.toolkit = Some(toolkit);
    }

    pub fn is_bound(&self) -> bool {
        self.env.is_some() && self.toolkit.is_some()
    }

    pub fn definition_name(&self) -> &str {
        &self.definition
    }

    pub fn environment(&self) -> Option<&Environment> {
        self.env.as_deref()
    }

    pub fn variables(&self) -> &VariableSet {
        &self.vars
    }

    pub fn variables_mut(&mut self) -> &mut VariableSet {
        &mut self.vars
    }

    fn bound(&self) -> Result<(Arc<Environment>, Arc<Toolkit>), VerifyError> {
        match (&self.env, &self.toolkit) {
            (Some(env), Some(toolkit)) => Ok((Arc::clone(env), Arc::clone(toolkit))),
            _ => Err(VerifyError::Unbound),
        }
    }

    /// Run `rules` in order against `target`, stopping at the first rule that
    /// does not verify or errors. An empty chain is not verified.
    pub async fn start(&mut self, target: &str, rules: &[Rule]) -> Result<bool, VerifyError> {
        let (env, toolkit) = self.bound()?;
        let mut verified = false;

        for (index, rule) in rules.iter().enumerate() {
            self.vars.merge_bindings(&rule.set);
            let outcome = step::execute(target, index, rule, &mut self.vars, &env, &toolkit).await;
            self.vars.release_exchange();

            match outcome {
                Ok(true) => verified = true,
                Ok(false) => {
                    debug!(definition = %self.definition, host = target, rule = index, "Rule not verified");
                    return Ok(false);
                }
                Err(e) => {
                    warn!(definition = %self.definition, host = target, rule = index, error = %e, "Rule failed");
                    return Err(e);
                }
            }
        }

        Ok(verified)
    }

    /// Try each group until one verifies. Any error aborts the whole call.
    pub async fn start_by_groups(&mut self, target: &str, groups: &[RuleGroup]) -> Result<bool, VerifyError> {
        for group in groups {
            if self.start(target, &group.rules).await? {
                debug!(definition = %self.definition, host = target, group = %group.name, "Group verified");
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Run `definition`'s rules in whichever shape it declares.
    pub async fn verify(&mut self, target: &str, definition: &Definition) -> Result<bool, VerifyError> {
        let verified = match &definition.rules {
            RuleSet::Chain(rules) => self.start(target, rules).await?,
            RuleSet::Groups(groups) => self.start_by_groups(target, groups).await?,
        };
        if verified {
            info!(definition = %definition.name, host = target, "Target verified vulnerable");
        }
        Ok(verified)
    }
}
