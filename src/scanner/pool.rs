use std::sync::Arc;
use crate::config::EngineConfig;
use crate::definition::Definition;
use crate::errors::VerifyError;
use crate::expr::Environment;
use crate::pool::{Pool, PoolStats, Pooled};
use super::session::ScanSession;
use super::toolkit::Toolkit;
use tracing::{debug, warn};

/// Concurrency-safe pool of [`ScanSession`]s sharing one [`Toolkit`].
#[derive(Clone)]
pub struct SessionPool {
    sessions: Pool<ScanSession>,
    toolkit: Arc<Toolkit>,
}

impl SessionPool {
    /// Pool using the `reqwest` transport built from `config`.
    pub fn new(config: &EngineConfig) -> Result<Self, VerifyError> {
        let toolkit = Toolkit::from_config(config)?;
        Ok(Self::with_toolkit(toolkit, config.pool.max_idle_sessions))
    }

    pub fn with_toolkit(toolkit: Toolkit, max_idle_sessions: usize) -> Self {
        Self {
            sessions: Pool::new("sessions", max_idle_sessions),
            toolkit: Arc::new(toolkit),
        }
    }

    /// Take a session bound to `definition`, with its schema compiled and defaults seeded.
    /// On failure the session goes straight back to the pool.
    pub fn acquire(&self, definition: &Definition) -> Result<Pooled<ScanSession>, VerifyError> {
        let mut session = self.sessions.acquire();
        let env = Environment::compile(&definition.set).map_err(|e| {
            warn!(definition = %definition.name, error = %e, "Failed to compile environment");
            e
        })?;
        session.bind(&definition.name, Arc::new(env), Arc::clone(&self.toolkit));
        Ok(session)
    }

    /// Clear the session and return it. Dropping the guard has the same effect.
    pub fn release(&self, session: Pooled<ScanSession>) {
        debug!(definition = %session.definition_name(), "Releasing session");
        drop(session);
    }

    /// Acquire, run the definition against `target`, release.
    pub async fn verify(&self, target: &str, definition: &Definition) -> Result<bool, VerifyError> {
        let mut session = self.acquire(definition)?;
        let result = session.verify(target, definition).await;
        self.release(session);
        result
    }

    pub fn stats(&self) -> PoolStats {
        self.sessions.stats()
    }

    pub fn toolkit(&self) -> &Toolkit {
        &self.toolkit
    }
}
