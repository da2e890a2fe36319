// crates/admin-verify-config/src/config.rs
// ============================================================================
// Module: Admin Verify Configuration
// Description: Configuration loading and validation for the verifier.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits,
//! then environment overrides are applied and the result is validated.
//! A missing *default* file yields all defaults; a missing explicit file
//! (from `--config` or `ADMIN_VERIFY_CONFIG`) is an error.
//! Token values never live in the file; `[credentials]` and `[webhook]` only
//! name the environment variables that carry them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::env::EnvOverrides;
use crate::env::EnvSource;
use crate::env::ProcessEnv;
use crate::env::VerifyEnv;
use crate::env::read_env_nonempty;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "admin-verify.toml";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default target base URL.
pub(crate) const DEFAULT_BASE_URL: &str = "http://localhost:3000";
/// Default request timeout in milliseconds.
pub(crate) const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Maximum request timeout in milliseconds.
pub(crate) const MAX_TIMEOUT_MS: u64 = 300_000;
/// Default env var carrying the admin token.
pub(crate) const DEFAULT_ADMIN_TOKEN_ENV: &str = "ADMIN_VERIFY_ADMIN_TOKEN";
/// Default env var carrying the user token.
pub(crate) const DEFAULT_USER_TOKEN_ENV: &str = "ADMIN_VERIFY_USER_TOKEN";
/// Default webhook receiver path.
pub(crate) const DEFAULT_WEBHOOK_PATH: &str = "/api/webhooks/clerk";
/// Default env var carrying the webhook signing secret.
pub(crate) const DEFAULT_WEBHOOK_SECRET_ENV: &str = "ADMIN_VERIFY_WEBHOOK_SECRET";
/// Default artifacts directory.
pub(crate) const DEFAULT_ARTIFACTS_DIR: &str = "target/admin-verify";

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Verifier configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct VerifyConfig {
    /// Target API settings.
    #[serde(default)]
    pub target: TargetConfig,
    /// Credential env var names.
    #[serde(default)]
    pub credentials: CredentialsConfig,
    /// Webhook replay settings.
    #[serde(default)]
    pub webhook: WebhookConfig,
    /// Run settings.
    #[serde(default)]
    pub run: RunConfig,
    /// Audit log settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Target API settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Base URL of the API under test.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Names of the environment variables carrying bearer tokens.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CredentialsConfig {
    /// Env var with the admin-tier token.
    #[serde(default = "default_admin_token_env")]
    pub admin_token_env: String,
    /// Env var with the user-tier token.
    #[serde(default = "default_user_token_env")]
    pub user_token_env: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            admin_token_env: default_admin_token_env(),
            user_token_env: default_user_token_env(),
        }
    }
}

/// Webhook replay settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Receiver path relative to the base URL.
    #[serde(default = "default_webhook_path")]
    pub path: String,
    /// Env var with the `whsec_` signing secret; unsigned when unset.
    #[serde(default = "default_webhook_secret_env")]
    pub secret_env: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            path: default_webhook_path(),
            secret_env: default_webhook_secret_env(),
        }
    }
}

/// Run settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Run resource-space groups concurrently.
    #[serde(default = "default_true")]
    pub parallel: bool,
    /// Scenario names to run; empty runs every registered scenario.
    #[serde(default)]
    pub scenarios: Vec<String>,
    /// Directory receiving per-run summary artifacts.
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            scenarios: Vec::new(),
            artifacts_dir: default_artifacts_dir(),
        }
    }
}

/// Audit log destination.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogSink {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to `log.path`.
    File,
    /// No audit output.
    #[serde(rename = "none")]
    Disabled,
}

/// Audit log settings.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Destination.
    #[serde(default)]
    pub sink: LogSink,
    /// File path, required when `sink = "file"`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Secrets resolved from the environment.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ResolvedSecrets {
    /// Admin-tier token.
    pub admin_token: Option<String>,
    /// User-tier token.
    pub user_token: Option<String>,
    /// Webhook signing secret.
    pub webhook_secret: Option<String>,
}

impl fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("admin_token", &self.admin_token.as_ref().map(|_| "<redacted>"))
            .field("user_token", &self.user_token.as_ref().map(|_| "<redacted>"))
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl VerifyConfig {
    /// Loads configuration using the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, &ProcessEnv)
    }

    /// Loads configuration, resolving the path and overrides through `env`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load_with_env(path: Option<&Path>, env: &dyn EnvSource) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path, env)?;
        validate_path(&resolved)?;
        let mut config = match fs::read(&resolved) {
            Ok(bytes) => Self::from_bytes(&bytes)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound && !explicit => Self::default(),
            Err(err) => {
                return Err(ConfigError::Io(format!("{}: {err}", resolved.display())));
            }
        };
        config.apply_overrides(&EnvOverrides::load(env)?);
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration bytes without applying overrides or validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the input is too large, not UTF-8, or not
    /// valid TOML for this model.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies environment overrides on top of file values.
    pub fn apply_overrides(&mut self, overrides: &EnvOverrides) {
        if let Some(base_url) = &overrides.base_url {
            self.target.base_url.clone_from(base_url);
        }
        if let Some(timeout) = overrides.timeout {
            self.target.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        }
        if let Some(parallel) = overrides.parallel {
            self.run.parallel = parallel;
        }
    }

    /// Trims the base URL so every consumer sees the validated form.
    pub fn normalize(&mut self) {
        let trimmed = self.target.base_url.trim();
        if trimmed.len() != self.target.base_url.len() {
            self.target.base_url = trimmed.to_string();
        }
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.target.validate()?;
        self.credentials.validate()?;
        self.webhook.validate()?;
        self.run.validate()?;
        self.log.validate()?;
        Ok(())
    }

    /// Reads bearer tokens and the webhook secret from `env`.
    ///
    /// Unset variables resolve to `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable is set but blank or
    /// not UTF-8.
    pub fn resolve_secrets(&self, env: &dyn EnvSource) -> Result<ResolvedSecrets, ConfigError> {
        Ok(ResolvedSecrets {
            admin_token: read_env_nonempty(env, &self.credentials.admin_token_env)?,
            user_token: read_env_nonempty(env, &self.credentials.user_token_env)?,
            webhook_secret: read_env_nonempty(env, &self.webhook.secret_env)?,
        })
    }
}

impl TargetConfig {
    /// Returns the request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validates the base URL and timeout.
    fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(self.base_url.trim())
            .map_err(|err| ConfigError::Invalid(format!("target.base_url is invalid: {err}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(
                "target.base_url must use http or https".to_string(),
            ));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(ConfigError::Invalid(
                "target.base_url must not embed credentials".to_string(),
            ));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(ConfigError::Invalid("target.base_url must include a host".to_string()));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(ConfigError::Invalid(
                "target.base_url must not carry a query or fragment".to_string(),
            ));
        }
        if self.timeout_ms == 0 || self.timeout_ms > MAX_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "target.timeout_ms must be between 1 and {MAX_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }
}

impl CredentialsConfig {
    /// Validates the env var names.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_env_name("credentials.admin_token_env", &self.admin_token_env)?;
        validate_env_name("credentials.user_token_env", &self.user_token_env)?;
        if self.admin_token_env == self.user_token_env {
            return Err(ConfigError::Invalid(
                "credentials.admin_token_env and credentials.user_token_env must differ"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

impl WebhookConfig {
    /// Validates the receiver path and secret env name.
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.path.starts_with('/') {
            return Err(ConfigError::Invalid("webhook.path must start with '/'".to_string()));
        }
        if self.path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("webhook.path exceeds max length".to_string()));
        }
        validate_env_name("webhook.secret_env", &self.secret_env)
    }
}

impl RunConfig {
    /// Validates scenario names and the artifacts directory.
    fn validate(&self) -> Result<(), ConfigError> {
        for (index, name) in self.scenarios.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("run.scenarios entries must be non-empty".to_string()));
            }
            if self.scenarios[..index].contains(name) {
                return Err(ConfigError::Invalid(format!("run.scenarios lists {name} twice")));
            }
        }
        validate_path_string("run.artifacts_dir", &self.artifacts_dir)
    }
}

impl LogConfig {
    /// Validates that a file sink names a path.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (LogSink::File, None) => {
                Err(ConfigError::Invalid("log.path is required when log.sink = \"file\"".to_string()))
            }
            (_, Some(path)) => validate_path_string("log.path", path),
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error while reading config.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parse error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Validation error.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path; the flag reports whether it was explicit.
fn resolve_path(path: Option<&Path>, env: &dyn EnvSource) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Some(env_path) = read_env_nonempty(env, VerifyEnv::ConfigPath.as_str())? {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured path against emptiness and length limits.
fn validate_path_string(field: &str, path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates an environment variable name.
fn validate_env_name(field: &str, name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if !name.bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'_') {
        return Err(ConfigError::Invalid(format!(
            "{field} must contain only ASCII letters, digits, and '_'"
        )));
    }
    Ok(())
}

/// Default for `target.base_url`.
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Default for `target.timeout_ms`.
const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Default for `credentials.admin_token_env`.
fn default_admin_token_env() -> String {
    DEFAULT_ADMIN_TOKEN_ENV.to_string()
}

/// Default for `credentials.user_token_env`.
fn default_user_token_env() -> String {
    DEFAULT_USER_TOKEN_ENV.to_string()
}

/// Default for `webhook.path`.
fn default_webhook_path() -> String {
    DEFAULT_WEBHOOK_PATH.to_string()
}

/// Default for `webhook.secret_env`.
fn default_webhook_secret_env() -> String {
    DEFAULT_WEBHOOK_SECRET_ENV.to_string()
}

/// Default for `run.artifacts_dir`.
fn default_artifacts_dir() -> PathBuf {
    PathBuf::from(DEFAULT_ARTIFACTS_DIR)
}

/// Serde default for `true` flags.
const fn default_true() -> bool {
    true
}
