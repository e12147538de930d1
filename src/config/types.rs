use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub http: HttpConfig,
    pub pool: PoolConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-exchange timeout. The engine has no other deadline of its own.
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Upper bound on hops when a rule asks to follow redirects.
    pub max_redirects: usize,
    pub accept_invalid_certs: bool,
    pub proxy: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: format!("poc-verify/{}", env!("CARGO_PKG_VERSION")),
            max_redirects: 5,
            accept_invalid_certs: true,
            proxy: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_idle_sessions: usize,
    pub max_idle_models: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_sessions: 64,
            max_idle_models: 256,
        }
    }
}
