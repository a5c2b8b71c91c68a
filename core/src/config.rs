//! Connection settings for an Etherpad instance.
//!
//! # Design
//! A `Configuration` can only be obtained through validation, so holding one
//! means every invariant already holds: the API key is 64 lowercase hex
//! characters, the URL is absolute, the version is `MAJOR.MINOR.PATCH`.
//!
//! Untyped input (`validate`, serde) is permissive: a `url`, `apiVersion` or
//! `timeout` of the wrong type is replaced by its default instead of being
//! rejected. Only well-typed but meaningless values are errors.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::ConfigError;
use crate::version::ApiVersion;

/// Default Etherpad listen address.
pub const DEFAULT_URL: &str = "http://0.0.0.0:9001";

/// Newest protocol version known to the method registry.
pub const DEFAULT_API_VERSION: ApiVersion = ApiVersion::new(1, 2, 15);

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

const API_KEY_LEN: usize = 64;

/// Validated, immutable connection settings.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub struct Configuration {
    url: String,
    api_key: String,
    api_version: ApiVersion,
    timeout: Duration,
}

impl Configuration {
    pub fn builder(api_key: impl Into<String>) -> ConfigurationBuilder {
        ConfigurationBuilder {
            api_key: api_key.into(),
            url: None,
            api_version: None,
            timeout: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_version(&self) -> ApiVersion {
        self.api_version
    }

    /// Per-call deadline. Zero disables it.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Versioned API root, e.g. `http://0.0.0.0:9001/api/1.2.15`.
    pub fn api_root(&self) -> Result<Url, ConfigError> {
        build_api_root(&self.url, self.api_version)
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl TryFrom<Value> for Configuration {
    type Error = ConfigError;

    fn try_from(raw: Value) -> Result<Self, Self::Error> {
        validate(&raw)
    }
}

/// Typed construction of a [`Configuration`]. Unset fields use the defaults.
#[derive(Clone)]
pub struct ConfigurationBuilder {
    api_key: String,
    url: Option<String>,
    api_version: Option<String>,
    timeout: Option<Duration>,
}

impl ConfigurationBuilder {
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<Configuration, ConfigError> {
        if self.api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        let api_key = self.api_key.trim();
        if !is_api_key(api_key) {
            return Err(ConfigError::InvalidApiKey);
        }

        let url = self.url.as_deref().map(str::trim).unwrap_or(DEFAULT_URL);
        if !is_absolute_url(url) {
            return Err(ConfigError::InvalidUrl);
        }

        let api_version = match self.api_version.as_deref() {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidVersion)?,
            None => DEFAULT_API_VERSION,
        };

        Ok(Configuration {
            url: url.to_string(),
            api_key: api_key.to_string(),
            api_version,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
        })
    }
}

/// Validate raw, caller-supplied settings (`apiKey`, `url`, `apiVersion`,
/// `timeout` in milliseconds).
pub fn validate(raw: &Value) -> Result<Configuration, ConfigError> {
    let fields = raw.as_object().ok_or(ConfigError::MissingConfig)?;

    let api_key = fields
        .get("apiKey")
        .and_then(non_empty_str)
        .ok_or(ConfigError::MissingApiKey)?;

    let mut builder = Configuration::builder(api_key);
    if let Some(url) = fields.get("url").and_then(non_empty_str) {
        builder = builder.url(url);
    }
    if let Some(api_version) = fields.get("apiVersion").and_then(non_empty_str) {
        builder = builder.api_version(api_version);
    }
    if let Some(ms) = fields.get("timeout").and_then(integer_millis) {
        builder = builder.timeout(Duration::from_millis(ms));
    }
    builder.build()
}

/// `true` for exactly 64 lowercase hexadecimal characters.
pub fn is_api_key(candidate: &str) -> bool {
    candidate.len() == API_KEY_LEN
        && candidate
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Replace the path of `url` with `api/{api_version}`.
///
/// Any existing path is discarded, so building from an already versioned root
/// swaps the version instead of nesting a second one.
pub fn build_api_root(url: &str, api_version: ApiVersion) -> Result<Url, ConfigError> {
    let mut root = Url::parse(url.trim()).map_err(|_| ConfigError::InvalidUrl)?;
    if !root.has_host() {
        return Err(ConfigError::InvalidUrl);
    }
    root.set_path(&format!("api/{api_version}"));
    Ok(root)
}

fn is_absolute_url(candidate: &str) -> bool {
    Url::parse(candidate).is_ok_and(|url| url.has_host())
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty())
}

fn integer_millis(value: &Value) -> Option<u64> {
    if let Some(ms) = value.as_u64() {
        return Some(ms);
    }
    // `1234.0` is still an integer.
    value
        .as_f64()
        .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
        .map(|f| f as u64)
}
