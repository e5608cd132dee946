#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Downstream action capability: given an API identifier, return a
/// structured payload or fail. The resolver treats any failure, including
/// timeout, as recoverable.
pub trait ActionApi: Send + Sync {
    fn call(&self, identifier: &str) -> Result<Value>;
}

/// HTTP implementation of the downstream action capability. Each call has
/// a hard timeout; a timed-out call surfaces as an ordinary error.
#[derive(Debug, Clone)]
pub struct HttpActionApi {
    base_url: Url,
    agent: ureq::Agent,
}

impl HttpActionApi {
    #[inline]
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let mut base = endpoint.trim_end_matches('/').to_string();
        base.push('/');
        let base_url =
            Url::parse(&base).with_context(|| format!("Invalid action endpoint: {}", endpoint))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        Ok(Self { base_url, agent })
    }
}

impl ActionApi for HttpActionApi {
    #[inline]
    fn call(&self, identifier: &str) -> Result<Value> {
        let url = self
            .base_url
            .join(&format!("actions/{}", identifier))
            .with_context(|| format!("Failed to build action URL for '{}'", identifier))?;

        debug!("Calling downstream action: {}", url);

        let response_text = self
            .agent
            .get(url.as_str())
            .call()
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .with_context(|| format!("Action call '{}' failed", identifier))?;

        let payload: Value = serde_json::from_str(&response_text)
            .with_context(|| format!("Action call '{}' returned invalid JSON", identifier))?;

        debug!("Action call '{}' succeeded", identifier);
        Ok(payload)
    }
}
