//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The login password is read from DASHBOARD_PASSWORD or `password_file`,
//! never stored in the TOML directly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use api_client::{ClientConfig, DEFAULT_BASE_URL};
use common::Secret;
use serde::Deserialize;

/// Environment variable holding the login password.
pub const PASSWORD_ENV: &str = "DASHBOARD_PASSWORD";

/// Config file looked up in the working directory when none is named.
pub const DEFAULT_CONFIG_FILE: &str = "foodsafe-dashboard.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub login: LoginConfig,
}

/// Dashboard API settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Sign-in settings
#[derive(Debug, Default, Deserialize)]
pub struct LoginConfig {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(skip)]
    pub password: Option<Secret<String>>,
    /// File containing the password (alternative to DASHBOARD_PASSWORD)
    #[serde(default)]
    pub password_file: Option<PathBuf>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}

fn default_timeout() -> u64 {
    30
}

impl Config {
    /// Load configuration from an optional TOML file, then overlay
    /// environment variables.
    ///
    /// Password resolution order:
    /// 1. DASHBOARD_PASSWORD env var
    /// 2. password_file path from config
    pub fn load(path: Option<&Path>) -> common::Result<Self> {
        let mut config: Config = match path {
            Some(path) => toml::from_str(&std::fs::read_to_string(path)?)?,
            None => Config::default(),
        };

        let base_url = api_client::base_url_from_env()
            .unwrap_or_else(|| std::mem::take(&mut config.api.base_url));
        config.set_base_url(&base_url)?;

        if config.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if let Ok(password) = std::env::var(PASSWORD_ENV) {
            config.login.password = Some(Secret::new(password));
        } else if let Some(ref password_file) = config.login.password_file {
            let password = std::fs::read_to_string(password_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read password_file {}: {e}",
                    password_file.display()
                ))
            })?;
            let password = password.trim_end_matches(['\r', '\n']).to_owned();
            if !password.is_empty() {
                config.login.password = Some(Secret::new(password));
            }
        }

        Ok(config)
    }

    /// Replace the API base URL (CLI override), normalizing and validating it.
    pub fn set_base_url(&mut self, url: &str) -> common::Result<()> {
        let url = url.trim().trim_end_matches('/');
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {url}"
            )));
        }
        self.api.base_url = url.to_owned();
        Ok(())
    }

    /// Resolve the config file from CLI arg, CONFIG_PATH env var, or the
    /// default file if it exists. `None` means run on defaults.
    pub fn resolve_path(cli_path: Option<&str>) -> Option<PathBuf> {
        if let Some(p) = cli_path {
            return Some(PathBuf::from(p));
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return Some(PathBuf::from(p));
        }
        let default = PathBuf::from(DEFAULT_CONFIG_FILE);
        default.exists().then_some(default)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(
            self.api.base_url.clone(),
            Duration::from_secs(self.api.timeout_secs),
        )
    }
}
