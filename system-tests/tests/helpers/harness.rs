// system-tests/tests/helpers/harness.rs
// ============================================================================
// Module: Verifier Harness
// Description: Builds scenario contexts and runs the suite against a stub.
// Purpose: Keep suite wiring identical across conformance and regression tests.
// Dependencies: admin-verify-core, system-tests
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use admin_verify_core::CredentialSet;
use admin_verify_core::ExecutionMode;
use admin_verify_core::HttpClient;
use admin_verify_core::NoopAuditSink;
use admin_verify_core::Report;
use admin_verify_core::ScenarioContext;
use admin_verify_core::SvixSigner;
use admin_verify_core::WebhookSettings;
use admin_verify_core::default_suite;
use system_tests::config::SystemTestConfig;

use super::admin_stub::ADMIN_TOKEN;
use super::admin_stub::USER_TOKEN;
use super::admin_stub::WEBHOOK_PATH;

/// Request timeout used when the environment sets none.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Webhook secret shared by signed stubs and signed contexts.
pub const WEBHOOK_SECRET: &str = "whsec_c3lzdGVtLXRlc3Qtc2lnbmluZy1rZXk=";

/// Which credentials a context carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tokens {
    /// Admin and user tokens.
    Both,
    /// Admin token only.
    AdminOnly,
    /// No tokens.
    None,
}

/// Builder inputs for a scenario context.
#[derive(Debug, Clone)]
pub struct ContextOptions {
    /// Target base URL.
    pub base_url: String,
    /// Tokens to carry.
    pub tokens: Tokens,
    /// Webhook secret, when events should be signed.
    pub webhook_secret: Option<String>,
    /// Fixture tag.
    pub run_tag: String,
}

impl ContextOptions {
    /// Context for `base_url` with both tokens and unsigned webhooks.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            tokens: Tokens::Both,
            webhook_secret: None,
            run_tag: "systest1".to_string(),
        }
    }
}

/// Builds a context from `options`.
pub fn build_context(options: &ContextOptions) -> Result<Arc<ScenarioContext>, String> {
    let config = SystemTestConfig::load()?;
    let timeout = config.timeout.unwrap_or(DEFAULT_TIMEOUT);
    let client = HttpClient::new(&options.base_url, timeout, Arc::new(NoopAuditSink))
        .map_err(|err| format!("client: {err}"))?;
    let (user, admin) = match options.tokens {
        Tokens::Both => (Some(USER_TOKEN.to_string()), Some(ADMIN_TOKEN.to_string())),
        Tokens::AdminOnly => (None, Some(ADMIN_TOKEN.to_string())),
        Tokens::None => (None, None),
    };
    let signer = options
        .webhook_secret
        .as_deref()
        .map(SvixSigner::from_secret)
        .transpose()
        .map_err(|err| format!("signer: {err}"))?;
    Ok(Arc::new(ScenarioContext {
        client,
        credentials: CredentialSet::from_tokens(user, admin),
        webhook: WebhookSettings {
            path: WEBHOOK_PATH.to_string(),
            signer,
        },
        run_tag: options.run_tag.clone(),
    }))
}

/// Runs the named scenarios (all when empty) and returns the report.
pub async fn run_suite(
    options: &ContextOptions,
    scenarios: &[&str],
    mode: ExecutionMode,
) -> Result<Report, String> {
    let names: Vec<String> = scenarios.iter().map(|name| (*name).to_string()).collect();
    let suite = default_suite()
        .select(&names)
        .map_err(|unknown| format!("unknown scenario(s): {}", unknown.join(", ")))?;
    let ctx = build_context(options)?;
    Ok(suite.run(ctx, mode).await)
}
