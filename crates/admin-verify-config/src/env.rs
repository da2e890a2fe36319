// crates/admin-verify-config/src/env.rs
// ============================================================================
// Module: Environment Overrides
// Description: Strict environment parsing for overrides and secrets.
// Purpose: Centralize env reads behind a lookup seam with UTF-8 enforcement.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Every environment read goes through an [`EnvSource`]. The process
//! environment is the production source; [`MapEnv`] backs tests without
//! mutating global state. Values must be valid UTF-8 and non-empty.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::time::Duration;

use crate::config::ConfigError;

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Environment keys that override file configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyEnv {
    /// Config file path.
    ConfigPath,
    /// Target base URL override.
    BaseUrl,
    /// Request timeout override in seconds (positive integer).
    TimeoutSeconds,
    /// Parallel execution toggle (`true`/`false` or `1`/`0`).
    Parallel,
}

impl VerifyEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConfigPath => "ADMIN_VERIFY_CONFIG",
            Self::BaseUrl => "ADMIN_VERIFY_BASE_URL",
            Self::TimeoutSeconds => "ADMIN_VERIFY_TIMEOUT_SEC",
            Self::Parallel => "ADMIN_VERIFY_PARALLEL",
        }
    }
}

// ============================================================================
// SECTION: Sources
// ============================================================================

/// Lookup seam for environment variables.
pub trait EnvSource {
    /// Returns the raw value of `name`, if set.
    fn var_os(&self, name: &str) -> Option<OsString>;
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var_os(&self, name: &str) -> Option<OsString> {
        std::env::var_os(name)
    }
}

/// In-memory environment.
#[derive(Clone, Default)]
pub struct MapEnv {
    /// Variables by name.
    vars: BTreeMap<String, OsString>,
}

impl MapEnv {
    /// Creates an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the environment with `name` set to `value`.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<OsString>) -> Self {
        self.vars.insert(name.to_string(), value.into());
        self
    }
}

impl fmt::Debug for MapEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapEnv").field("vars", &self.vars.keys().collect::<Vec<_>>()).finish()
    }
}

impl EnvSource for MapEnv {
    fn var_os(&self, name: &str) -> Option<OsString> {
        self.vars.get(name).cloned()
    }
}

// ============================================================================
// SECTION: Overrides
// ============================================================================

/// Typed overrides read from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvOverrides {
    /// Base URL override.
    pub base_url: Option<String>,
    /// Timeout override.
    pub timeout: Option<Duration>,
    /// Parallel toggle override.
    pub parallel: Option<bool>,
}

impl EnvOverrides {
    /// Reads overrides from `env`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a value is not UTF-8, is empty,
    /// or does not parse.
    pub fn load(env: &dyn EnvSource) -> Result<Self, ConfigError> {
        let base_url = read_env_nonempty(env, VerifyEnv::BaseUrl.as_str())?;
        let timeout = read_env_nonempty(env, VerifyEnv::TimeoutSeconds.as_str())?
            .map(|value| parse_timeout_seconds(VerifyEnv::TimeoutSeconds.as_str(), &value))
            .transpose()?;
        let parallel = read_env_nonempty(env, VerifyEnv::Parallel.as_str())?
            .map(|value| parse_bool(VerifyEnv::Parallel.as_str(), &value))
            .transpose()?;
        Ok(Self {
            base_url,
            timeout,
            parallel,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the value contains invalid UTF-8.
pub fn read_env_strict(env: &dyn EnvSource, name: &str) -> Result<Option<String>, ConfigError> {
    env.var_os(name).map_or(Ok(None), |raw| {
        raw.into_string()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(format!("{name} must be valid UTF-8")))
    })
}

/// Reads an environment variable and rejects empty values.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the variable is set but blank.
pub fn read_env_nonempty(env: &dyn EnvSource, name: &str) -> Result<Option<String>, ConfigError> {
    match read_env_strict(env, name)? {
        Some(value) if value.trim().is_empty() => {
            Err(ConfigError::Invalid(format!("{name} must not be empty")))
        }
        Some(value) => Ok(Some(value)),
        None => Ok(None),
    }
}

/// Parses a positive number of seconds.
fn parse_timeout_seconds(name: &str, raw: &str) -> Result<Duration, ConfigError> {
    let secs: u64 = raw.trim().parse().map_err(|_| {
        ConfigError::Invalid(format!("{name} must be a positive integer number of seconds"))
    })?;
    if secs == 0 {
        return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
    }
    Ok(Duration::from_secs(secs))
}

/// Parses `1`, `0`, `true`, or `false`.
fn parse_bool(name: &str, raw: &str) -> Result<bool, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") || trimmed == "1" {
        return Ok(true);
    }
    if trimmed.eq_ignore_ascii_case("false") || trimmed == "0" {
        return Ok(false);
    }
    Err(ConfigError::Invalid(format!("{name} must be 1, 0, true, or false")))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
