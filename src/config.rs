use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::PortalError;

pub const DEFAULT_BASE_URL: &str = "https://www.gut-microbes.org";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings a client reads on every request. Built once, never mutated by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub jwt_token: Option<String>,
    pub timeout_secs: u64,
    pub verify_ssl: bool,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            jwt_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            verify_ssl: true,
            user_agent: default_user_agent(),
        }
    }
}

impl ClientConfig {
    /// Bearer credential sent with every request. A JWT wins over an API key.
    pub fn bearer_token(&self) -> Option<&str> {
        self.jwt_token.as_deref().or(self.api_key.as_deref())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn apply(&mut self, layer: ConfigLayer) {
        if let Some(base_url) = non_empty(layer.base_url) {
            self.base_url = trim_base_url(&base_url);
        }
        if let Some(api_key) = non_empty(layer.api_key) {
            self.api_key = Some(api_key);
        }
        if let Some(jwt) = non_empty(layer.jwt_token) {
            self.jwt_token = Some(jwt);
        }
        if let Some(timeout) = layer.timeout {
            self.timeout_secs = timeout;
        }
        if let Some(verify) = layer.verify_ssl {
            self.verify_ssl = verify;
        }
        if let Some(user_agent) = non_empty(layer.user_agent) {
            self.user_agent = user_agent;
        }
    }
}

pub fn default_user_agent() -> String {
    format!("mett-dataportal-rs/{}", env!("CARGO_PKG_VERSION"))
}

/// One source of settings. Every field is optional; unset fields leave lower layers alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConfigLayer {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default, alias = "jwt")]
    pub jwt_token: Option<String>,
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub verify_ssl: Option<bool>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl ConfigLayer {
    /// Reads `METT_BASE_URL`, `METT_API_KEY`, `METT_JWT`, `METT_TIMEOUT` and `METT_VERIFY_SSL`.
    pub fn from_env() -> Result<Self, PortalError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, PortalError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout = match lookup("METT_TIMEOUT") {
            Some(raw) if !raw.trim().is_empty() => {
                Some(raw.trim().parse::<u64>().map_err(|_| {
                    PortalError::InvalidConfigValue {
                        key: "METT_TIMEOUT".to_string(),
                        value: raw.clone(),
                    }
                })?)
            }
            _ => None,
        };
        let verify_ssl = match lookup("METT_VERIFY_SSL") {
            Some(raw) if !raw.trim().is_empty() => Some(parse_bool(&raw).ok_or_else(|| {
                PortalError::InvalidConfigValue {
                    key: "METT_VERIFY_SSL".to_string(),
                    value: raw.clone(),
                }
            })?),
            _ => None,
        };

        Ok(Self {
            base_url: lookup("METT_BASE_URL"),
            api_key: lookup("METT_API_KEY"),
            jwt_token: lookup("METT_JWT"),
            timeout,
            verify_ssl,
            user_agent: None,
        })
    }
}

/// Explicit overrides, typically command-line flags.
pub type ConfigOverrides = ConfigLayer;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Resolves defaults, then the config file, then the environment, then `overrides`.
    ///
    /// Without an explicit `path` the file at `~/.mett/config.json` is used when present.
    pub fn resolve(
        path: Option<&Path>,
        overrides: ConfigOverrides,
    ) -> Result<ClientConfig, PortalError> {
        let file = match path {
            Some(path) => Some(Self::read_file(path)?),
            None => match default_config_path() {
                Some(path) if path.exists() => Some(Self::read_file(&path)?),
                _ => None,
            },
        };
        let env = ConfigLayer::from_env()?;
        Ok(Self::resolve_layers(file, env, overrides))
    }

    pub fn resolve_layers(
        file: Option<ConfigLayer>,
        env: ConfigLayer,
        overrides: ConfigOverrides,
    ) -> ClientConfig {
        let mut config = ClientConfig::default();
        if let Some(file) = file {
            config.apply(file);
        }
        config.apply(env);
        config.apply(overrides);
        config
    }

    pub fn read_file(path: &Path) -> Result<ConfigLayer, PortalError> {
        let content =
            fs::read_to_string(path).map_err(|_| PortalError::ConfigRead(path.to_path_buf()))?;
        serde_json::from_str(&content).map_err(|err| PortalError::ConfigParse(err.to_string()))
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().join(".mett").join("config.json"))
}

pub fn trim_base_url(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jwt_preferred_over_api_key() {
        let config = ClientConfig {
            api_key: Some("key".to_string()),
            jwt_token: Some("jwt".to_string()),
            ..ClientConfig::default()
        };
        assert_eq!(config.bearer_token(), Some("jwt"));
    }

    #[test]
    fn parse_bool_variants() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
