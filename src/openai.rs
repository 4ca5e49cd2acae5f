//! Client construction for OpenAI-compatible endpoints (Gemini, OpenAI).

use crate::error::{Result, UzhavanError};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for HTTP requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Read an API credential from the named environment variable.
pub fn api_key_from_env(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        Ok(_) => Err(UzhavanError::Config(format!(
            "{} is empty. Set it with: export {}='...'",
            var, var
        ))),
        Err(_) => Err(UzhavanError::Config(format!(
            "{} not set. Set it with: export {}='...'",
            var, var
        ))),
    }
}

/// Create a client for `api_base`, authenticating with the key held in `api_key_env`.
pub fn create_client(api_base: &str, api_key_env: &str) -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(api_base, api_key_env, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create a client with a custom HTTP timeout.
pub fn create_client_with_timeout(
    api_base: &str,
    api_key_env: &str,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let api_key = api_key_from_env(api_key_env)?;

    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| UzhavanError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let config = OpenAIConfig::new()
        .with_api_base(api_base.trim_end_matches('/'))
        .with_api_key(api_key);

    Ok(Client::with_config(config).with_http_client(http_client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_config_error() {
        let result = api_key_from_env("UZHAVAN_TEST_KEY_THAT_IS_NEVER_SET");
        assert!(matches!(result, Err(UzhavanError::Config(_))));
    }
}
