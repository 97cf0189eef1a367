//! # Engine Configuration
//!
//! Loaded from environment variables or a YAML file. Every field has a
//! default, so an empty environment yields a working local configuration.
//!
//! | Variable | Field | Default |
//! |---|---|---|
//! | `OB_HOST_BASE_URL` | `host_base_url` | `http://localhost:8080` |
//! | `OB_STATUS_PAGE_CAPACITY` | `status.page_capacity` | `131072` |
//! | `OB_STATUS_MAX_PAGES` | `status.max_pages` | `1024` |
//! | `OB_ALLOCATION_RETRIES` | `status.allocation_retries` | `8` |
//! | `OB_HASH_RECIPIENTS` | `hash_recipients` | `false` |
//! | `OB_LOG_JSON` | `log_json` | `false` |
//! | `OB_ISSUER_KEY_SEED` | `issuer_key_seed` | unset |
//!
//! `issuer_key_seed` is a 64-hex-digit master seed. When set, each issuer's
//! first key is derived from it instead of drawn at random. It is redacted
//! from `Debug` output.

use std::path::Path;

use ob_status::StatusListConfig;
use serde::Deserialize;
use url::Url;

const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Engine configuration.
#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Base for every published IRI. An absolute http(s) URL.
    pub host_base_url: String,
    /// Status list paging.
    pub status: StatusListConfig,
    /// Hash recipient identities unless a request says otherwise.
    pub hash_recipients: bool,
    /// Emit logs as JSON lines.
    pub log_json: bool,
    /// Master seed for deterministic issuer keys.
    pub issuer_key_seed: Option<String>,
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("host_base_url", &self.host_base_url)
            .field("status", &self.status)
            .field("hash_recipients", &self.hash_recipients)
            .field("log_json", &self.log_json)
            .field(
                "issuer_key_seed",
                &self.issuer_key_seed.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host_base_url: DEFAULT_BASE_URL.to_string(),
            status: StatusListConfig::default(),
            hash_recipients: false,
            log_json: false,
            issuer_key_seed: None,
        }
    }
}

impl EngineConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from any variable source. Unset variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = lookup("OB_HOST_BASE_URL") {
            parse_url("OB_HOST_BASE_URL", &raw)?;
            config.host_base_url = raw;
        }
        if let Some(raw) = lookup("OB_STATUS_PAGE_CAPACITY") {
            config.status.page_capacity = parse_var("OB_STATUS_PAGE_CAPACITY", &raw)?;
        }
        if let Some(raw) = lookup("OB_STATUS_MAX_PAGES") {
            config.status.max_pages = parse_var("OB_STATUS_MAX_PAGES", &raw)?;
        }
        if let Some(raw) = lookup("OB_ALLOCATION_RETRIES") {
            config.status.allocation_retries = parse_var("OB_ALLOCATION_RETRIES", &raw)?;
        }
        if let Some(raw) = lookup("OB_HASH_RECIPIENTS") {
            config.hash_recipients = parse_bool("OB_HASH_RECIPIENTS", &raw)?;
        }
        if let Some(raw) = lookup("OB_LOG_JSON") {
            config.log_json = parse_bool("OB_LOG_JSON", &raw)?;
        }
        config.issuer_key_seed = lookup("OB_ISSUER_KEY_SEED").filter(|s| !s.is_empty());
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Load from YAML text. Missing keys keep their defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_url("host_base_url", &self.host_base_url)?;
        self.status
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if let Some(seed) = &self.issuer_key_seed {
            if seed.len() != 64 || !seed.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(ConfigError::Invalid(
                    "issuer_key_seed must be 64 hex digits".into(),
                ));
            }
        }
        Ok(())
    }
}

fn parse_url(var: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))?;
    check_base_url(var, &url)?;
    Ok(url)
}

fn check_base_url(var: &str, url: &Url) -> Result<(), ConfigError> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(
            var.to_string(),
            format!("scheme must be http or https, got {}", url.scheme()),
        ));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::InvalidUrl(
            var.to_string(),
            "base URL must not carry a query or fragment".into(),
        ));
    }
    Ok(())
}

fn parse_var<T: std::str::FromStr>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        var: var.to_string(),
        reason: e.to_string(),
    })
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            var: var.to_string(),
            reason: format!("expected a boolean, got {other:?}"),
        }),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A URL setting failed to parse or uses an unsupported form. Holds the
    /// setting name and the reason.
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),

    /// An environment variable held a value of the wrong shape.
    #[error("invalid value for {var}: {reason}")]
    InvalidValue {
        /// Variable name.
        var: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Values that parse but do not make a usable configuration together.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// The configuration file could not be read.
    #[error("cannot read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid YAML for [`EngineConfig`].
    #[error("cannot parse configuration YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
