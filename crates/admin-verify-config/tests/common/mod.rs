// crates/admin-verify-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for admin-verify-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::path::PathBuf;

use admin_verify_config::ConfigError;
use admin_verify_config::VerifyConfig;

/// Result type used by config tests.
pub type TestResult = Result<(), String>;

/// Parses a TOML string into a `VerifyConfig` for tests.
pub fn config_from_toml(toml_str: &str) -> Result<VerifyConfig, ConfigError> {
    VerifyConfig::from_bytes(toml_str.as_bytes())
}

/// Returns a minimal config with all defaults applied.
pub fn minimal_config() -> Result<VerifyConfig, String> {
    config_from_toml("").map_err(|err| err.to_string())
}

/// Writes `content` to `admin-verify.toml` inside `dir`.
pub fn write_config(dir: &tempfile::TempDir, content: &[u8]) -> Result<PathBuf, String> {
    let path = dir.path().join("admin-verify.toml");
    std::fs::write(&path, content).map_err(|err| err.to_string())?;
    Ok(path)
}

/// Checks that `result` failed with a message containing `needle`.
pub fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}
