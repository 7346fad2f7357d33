//! Client configuration
//!
//! The API base URL is resolved once per process from `DASHBOARD_API_URL`,
//! falling back to the local development backend. Callers that load a config
//! file (the CLI) build a `ClientConfig` explicitly instead.

use std::sync::OnceLock;
use std::time::Duration;

/// Base URL used when `DASHBOARD_API_URL` is unset or blank.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

/// Environment variable naming the API base URL.
pub const BASE_URL_ENV: &str = "DASHBOARD_API_URL";

/// Upper bound for a single network call when nothing else is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

static BASE_URL: OnceLock<String> = OnceLock::new();

/// Resolve the API base URL. Reads the environment on first call only.
pub fn resolve_base_url() -> &'static str {
    BASE_URL.get_or_init(|| base_url_from_env().unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()))
}

/// `DASHBOARD_API_URL` as it reads right now, normalized; `None` when unset
/// or blank. Callers layering their own sources (a config file) use this
/// rather than the memoized `resolve_base_url`.
pub fn base_url_from_env() -> Option<String> {
    normalize(std::env::var(BASE_URL_ENV).ok())
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|url| url.trim().trim_end_matches('/').to_owned())
        .filter(|url| !url.is_empty())
}

/// Settings for constructing an `ApiClient`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Prefix for every endpoint, without a trailing slash
    pub base_url: String,
    /// Applied to every network call, including the session refresh
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            timeout,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(resolve_base_url(), DEFAULT_TIMEOUT)
    }
}
