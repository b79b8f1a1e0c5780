//! Configuration management for shiftplan.
//!
//! Loads configuration from ${SHIFTPLAN_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::routing::{LOGIN_KEY, Location};

/// Environment variable that overrides `api_url`.
pub const API_URL_ENV: &str = "SHIFTPLAN_API_URL";

/// Returns the default config template with comments.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for shiftplan configuration and state.
    //!
    //! SHIFTPLAN_HOME resolution order:
    //! 1. SHIFTPLAN_HOME environment variable (if set)
    //! 2. ~/.config/shiftplan (default)

    use std::path::PathBuf;

    /// Returns the shiftplan home directory.
    pub fn shiftplan_home() -> PathBuf {
        if let Ok(home) = std::env::var("SHIFTPLAN_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("shiftplan"))
            .unwrap_or_else(|| PathBuf::from(".shiftplan"))
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        shiftplan_home().join("config.toml")
    }

    /// Returns the path to the durable client state (credential, theme).
    pub fn state_path() -> PathBuf {
        shiftplan_home().join("state.json")
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the REST backend.
    pub api_url: String,
    /// Route key used after login and as the fallback for unknown keys.
    pub default_route: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Config {
    pub const DEFAULT_API_URL: &'static str = "http://localhost:8000/api";
    pub const DEFAULT_ROUTE: &'static str = "plans";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Loads configuration from the default path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config: Config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))?
        } else {
            Config::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Initializes a config file at the given path with the default template.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            bail!("Config file already exists at {}", path.display());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, default_config_template())
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }

    /// Resolves the API base URL with precedence: env > config > default.
    ///
    /// # Errors
    /// Returns an error if the resolved URL is not well-formed.
    pub fn effective_api_url(&self) -> Result<String> {
        let env_url = std::env::var(API_URL_ENV).ok();
        resolve_api_url(env_url.as_deref(), &self.api_url)
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    fn validate(&self) -> Result<()> {
        let route = Location::parse(&self.default_route);
        if route.key().is_empty() || route.key() == LOGIN_KEY {
            bail!(
                "default_route must name a protected route, got \"{}\"",
                self.default_route
            );
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: Self::DEFAULT_API_URL.to_string(),
            default_route: Self::DEFAULT_ROUTE.to_string(),
            request_timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
        }
    }
}

fn resolve_api_url(env_url: Option<&str>, config_url: &str) -> Result<String> {
    let candidate = env_url
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .or_else(|| Some(config_url.trim()).filter(|url| !url.is_empty()))
        .unwrap_or(Config::DEFAULT_API_URL);

    url::Url::parse(candidate).with_context(|| format!("Invalid API base URL: {candidate}"))?;
    Ok(candidate.trim_end_matches('/').to_string())
}
