// crates/admin-verify-config/src/example.rs
// ============================================================================
// Module: Config Example
// Description: Canonical example configuration payload.
// Purpose: Deterministic starting point for `admin-verify config example`.
// Dependencies: std
// ============================================================================

//! ## Overview
//! The example spells out every key with its default value, so parsing it
//! yields the same configuration as an empty file.

/// Returns a canonical example `admin-verify.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[target]
base_url = "http://localhost:3000"
timeout_ms = 30000

[credentials]
admin_token_env = "ADMIN_VERIFY_ADMIN_TOKEN"
user_token_env = "ADMIN_VERIFY_USER_TOKEN"

[webhook]
path = "/api/webhooks/clerk"
secret_env = "ADMIN_VERIFY_WEBHOOK_SECRET"

[run]
parallel = true
scenarios = []
artifacts_dir = "target/admin-verify"

[log]
sink = "stderr"
# path = "admin-verify.log"
"#,
    )
}
