// system-tests/src/config.rs
// ============================================================================
// Module: System Test Configuration
// Description: Harness settings read through the verifier's env seam.
// Purpose: Give every system-test binary one typed view of its environment.
// Dependencies: admin-verify-config
// ============================================================================

//! ## Overview
//! The harness reads three `ADMIN_VERIFY_SYSTEM_TEST_*` variables through the
//! same [`EnvSource`] the verifier config uses. Blank values, non-UTF-8 values,
//! zero timeouts and unknown flag literals are all rejected.

use std::path::PathBuf;
use std::time::Duration;

use admin_verify_config::EnvSource;
use admin_verify_config::ProcessEnv;
use admin_verify_config::env::read_env_nonempty;

/// Directory that receives per-test artifacts.
pub const RUN_ROOT_VAR: &str = "ADMIN_VERIFY_SYSTEM_TEST_RUN_ROOT";
/// Verifier request timeout in whole seconds.
pub const TIMEOUT_VAR: &str = "ADMIN_VERIFY_SYSTEM_TEST_TIMEOUT_SEC";
/// Lets a test reuse an existing artifact directory.
pub const ALLOW_OVERWRITE_VAR: &str = "ADMIN_VERIFY_SYSTEM_TEST_ALLOW_OVERWRITE";

/// Harness settings; every field falls back to its default when unset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SystemTestConfig {
    /// Artifact root override.
    pub run_root: Option<PathBuf>,
    /// Request timeout handed to the verifier.
    pub timeout: Option<Duration>,
    /// Reuse existing artifact directories.
    pub allow_overwrite: bool,
}

impl SystemTestConfig {
    /// Reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns a message naming the offending variable.
    pub fn load() -> Result<Self, String> {
        Self::from_env(&ProcessEnv)
    }

    /// Reads `env`.
    ///
    /// # Errors
    ///
    /// Returns a message naming the offending variable.
    pub fn from_env(env: &dyn EnvSource) -> Result<Self, String> {
        let read = |name: &str| read_env_nonempty(env, name).map_err(|err| err.to_string());
        let timeout = match read(TIMEOUT_VAR)? {
            Some(raw) => Some(seconds(&raw)?),
            None => None,
        };
        let allow_overwrite = match read(ALLOW_OVERWRITE_VAR)? {
            Some(raw) => flag(&raw)?,
            None => false,
        };
        Ok(Self {
            run_root: read(RUN_ROOT_VAR)?.map(PathBuf::from),
            timeout,
            allow_overwrite,
        })
    }
}

/// Parses a non-zero count of seconds.
fn seconds(raw: &str) -> Result<Duration, String> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(format!("{TIMEOUT_VAR} must be greater than zero")),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => Err(format!("{TIMEOUT_VAR} must be a whole number of seconds")),
    }
}

/// Parses `1`, `0`, `true` or `false`, ignoring case.
fn flag(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(format!("{ALLOW_OVERWRITE_VAR} must be 1, 0, true, or false")),
    }
}
