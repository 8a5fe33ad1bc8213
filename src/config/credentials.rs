//! Credential resolution from the environment
//!
//! Secrets never live in the TOML file; the file names the environment
//! variables to read instead. Missing credentials are the fatal
//! configuration error of a run.

use crate::config::types::Config;
use crate::ConfigError;

/// Proxy user name and password
#[derive(Clone)]
pub struct ProxyCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for ProxyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Secrets needed by the transport and model adapters
#[derive(Clone, Default)]
pub struct Credentials {
    /// API key for the model service, present when the model is enabled
    pub model_api_key: Option<String>,

    /// Proxy credentials, present when the proxy names them
    pub proxy: Option<ProxyCredentials>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("model_api_key", &self.model_api_key.as_ref().map(|_| "***"))
            .field("proxy", &self.proxy)
            .finish()
    }
}

/// Reads every credential the config refers to from the process environment
pub fn resolve_credentials(config: &Config) -> Result<Credentials, ConfigError> {
    resolve_credentials_with(config, |name| std::env::var(name).ok())
}

/// Reads credentials through the given lookup function
///
/// Empty values count as missing.
pub fn resolve_credentials_with<F>(config: &Config, lookup: F) -> Result<Credentials, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let require = |name: &str| -> Result<String, ConfigError> {
        lookup(name)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingCredential(name.to_string()))
    };

    let model_api_key = if config.model.enabled {
        Some(require(&config.model.api_key_env)?)
    } else {
        None
    };

    let proxy = match &config.fetcher.proxy {
        Some(proxy) => match (&proxy.username_env, &proxy.password_env) {
            (Some(user_env), Some(pass_env)) => Some(ProxyCredentials {
                username: require(user_env)?,
                password: require(pass_env)?,
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Validation(
                    "proxy username-env and password-env must be set together".to_string(),
                ))
            }
        },
        None => None,
    };

    Ok(Credentials {
        model_api_key,
        proxy,
    })
}
