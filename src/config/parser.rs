use std::path::Path;
use reqwest::Url;
use crate::errors::VerifyError;
use super::types::EngineConfig;
use tracing::warn;

const MAX_REDIRECTS_LIMIT: usize = 20;

pub async fn parse_config(path: &Path) -> Result<EngineConfig, VerifyError> {
    if !path.exists() {
        return Err(VerifyError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > 1_048_576 {
        return Err(VerifyError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    let config: EngineConfig = serde_yaml::from_str(&content)?;

    validate_config(&config)?;

    Ok(config)
}

/// Reject values the engine cannot run with.
pub fn validate_config(config: &EngineConfig) -> Result<(), VerifyError> {
    if config.http.timeout_secs == 0 {
        return Err(VerifyError::Config("http.timeout_secs must be greater than 0".into()));
    }

    if config.http.max_redirects > MAX_REDIRECTS_LIMIT {
        return Err(VerifyError::Config(format!(
            "http.max_redirects must be at most {}, got {}",
            MAX_REDIRECTS_LIMIT, config.http.max_redirects
        )));
    }

    if let Some(proxy) = &config.http.proxy {
        Url::parse(proxy)
            .map_err(|e| VerifyError::Config(format!("Invalid proxy '{}': {}", proxy, e)))?;
    }

    if config.pool.max_idle_sessions == 0 || config.pool.max_idle_models == 0 {
        warn!("Pool idle limit is 0, pooled objects will not be reused");
    }

    Ok(())
}
