// crates/admin-verify-core/src/scenarios.rs
// ============================================================================
// Module: Conformance Scenarios
// Description: The registered scenarios of the admin API conformance suite.
// Purpose: Compose descriptors, matrices, lifecycles, and replays into checks.
// Dependencies: async-trait, serde_json
// ============================================================================

//! ## Overview
//! Each scenario is a small value implementing [`Scenario`]. Scenarios own
//! the resources they create and never mutate state they did not create,
//! with one exception: the settings round trip restores the representation
//! it observed before overriding it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;

use crate::catalog;
use crate::descriptor::EndpointDescriptor;
use crate::descriptor::ResourceSpace;
use crate::descriptor::Tier;
use crate::error::VerifyError;
use crate::error::VerifyResult;
use crate::lifecycle::run_lifecycle;
use crate::lifecycle::run_singleton_round_trip;
use crate::matrix::run_matrix;
use crate::suite::Scenario;
use crate::suite::ScenarioContext;
use crate::suite::Suite;
use crate::webhook::WebhookReplayer;

/// Identifier used to fill `{id}` in denial probes; never created.
const PROBE_ID: &str = "admin-verify-probe";

// ============================================================================
// SECTION: Registry
// ============================================================================

/// The full conformance suite in registration order.
#[must_use]
pub fn default_suite() -> Suite {
    Suite::new()
        .with(AuthorizationScenario {
            name: "public_plans_listing",
            space: ResourceSpace::Public,
            endpoint: catalog::public_plans,
        })
        .with(AuthorizationScenario {
            name: "dashboard_authorization",
            space: ResourceSpace::Metrics,
            endpoint: catalog::dashboard,
        })
        .with(PlansLifecycle)
        .with(AuthorizationScenario {
            name: "plans_refresh_pricing",
            space: ResourceSpace::Plans,
            endpoint: catalog::plans_refresh_pricing,
        })
        .with(UsersLifecycle)
        .with(SettingsRoundTrip)
        .with(AuthorizationScenario {
            name: "usage_authorization",
            space: ResourceSpace::Metrics,
            endpoint: catalog::usage,
        })
        .with(AuthorizationScenario {
            name: "storage_authorization",
            space: ResourceSpace::Metrics,
            endpoint: catalog::storage,
        })
        .with(AuthorizationScenario {
            name: "clerk_plans_listing",
            space: ResourceSpace::Billing,
            endpoint: catalog::clerk_plans,
        })
        .with(WebhookReplay)
        .with(AdminDenialSweep)
}

// ============================================================================
// SECTION: Authorization
// ============================================================================

/// Full tier matrix against one endpoint.
///
/// Admin-only endpoints require an admin credential, since the admin success
/// path and its body shape are part of the check.
struct AuthorizationScenario {
    /// Scenario name.
    name: &'static str,
    /// Resource space.
    space: ResourceSpace,
    /// Endpoint under test.
    endpoint: fn() -> EndpointDescriptor,
}

#[async_trait]
impl Scenario for AuthorizationScenario {
    fn name(&self) -> &'static str {
        self.name
    }

    fn space(&self) -> ResourceSpace {
        self.space
    }

    async fn run(&self, ctx: &ScenarioContext) -> VerifyResult<Vec<String>> {
        let endpoint = (self.endpoint)();
        if endpoint.tier == Tier::Admin {
            ctx.credentials.require_admin()?;
        }
        let report =
            run_matrix(&ctx.client, &endpoint, &[], &ctx.credentials, &Tier::ALL, None).await;
        report.verdict()?;
        Ok(report.notes())
    }
}

/// Denial probes for every admin-only endpoint under the lower tiers.
struct AdminDenialSweep;

#[async_trait]
impl Scenario for AdminDenialSweep {
    fn name(&self) -> &'static str {
        "admin_denial_sweep"
    }

    fn space(&self) -> ResourceSpace {
        ResourceSpace::Authorization
    }

    async fn run(&self, ctx: &ScenarioContext) -> VerifyResult<Vec<String>> {
        let tiers = [Tier::Anonymous, Tier::User];
        let mut first_failure: Option<VerifyError> = None;
        let endpoints = catalog::admin_endpoints();
        let total = endpoints.len();
        let mutating = endpoints.iter().filter(|endpoint| endpoint.is_mutating()).count();
        for endpoint in endpoints {
            let report = run_matrix(
                &ctx.client,
                &endpoint,
                &[("id", PROBE_ID)],
                &ctx.credentials,
                &tiers,
                None,
            )
            .await;
            if let Err(err) = report.verdict() {
                if matches!(err, VerifyError::AuthorizationLeak { .. }) {
                    return Err(err);
                }
                first_failure.get_or_insert(err);
            }
        }
        if let Some(err) = first_failure {
            return Err(err);
        }
        let mut notes = vec![format!(
            "{total} admin endpoints denied; {mutating} mutating probes sent without a body"
        )];
        if ctx.credentials.for_tier(Tier::User).is_none() {
            notes.push("tier user skipped for every endpoint: no credential configured".to_string());
        }
        Ok(notes)
    }
}

// ============================================================================
// SECTION: Lifecycles
// ============================================================================

/// Plan create, list, update, delete.
struct PlansLifecycle;

impl PlansLifecycle {
    /// Create payload with a run-unique name.
    fn create_payload(tag: &str) -> Value {
        json!({
            "name": format!("Test Plan {tag}"),
            "description": "Created by the admin API conformance suite",
            "price": 1999,
            "currency": "USD",
            "interval": "month",
            "trial_period_days": 14,
            "features": ["feature_a", "feature_b"],
            "active": true,
        })
    }

    /// Update payload overriding every create field.
    fn update_payload(tag: &str) -> Value {
        json!({
            "name": format!("Updated Test Plan {tag}"),
            "description": "Updated by the admin API conformance suite",
            "price": 2999,
            "currency": "USD",
            "interval": "month",
            "trial_period_days": 7,
            "features": ["feature_a", "feature_b", "feature_c"],
            "active": false,
        })
    }
}

#[async_trait]
impl Scenario for PlansLifecycle {
    fn name(&self) -> &'static str {
        "plans_lifecycle"
    }

    fn space(&self) -> ResourceSpace {
        ResourceSpace::Plans
    }

    async fn run(&self, ctx: &ScenarioContext) -> VerifyResult<Vec<String>> {
        let admin = ctx.credentials.require_admin()?;
        let result = run_lifecycle(
            &ctx.client,
            &admin,
            &catalog::plan_resource(),
            &Self::create_payload(&ctx.run_tag),
            &Self::update_payload(&ctx.run_tag),
        )
        .await?;
        Ok(vec![format!("plan {} reached verified-absent", result.id)])
    }
}

/// User invite, list, read, update, sync, activate, delete.
struct UsersLifecycle;

#[async_trait]
impl Scenario for UsersLifecycle {
    fn name(&self) -> &'static str {
        "users_lifecycle"
    }

    fn space(&self) -> ResourceSpace {
        ResourceSpace::Users
    }

    async fn run(&self, ctx: &ScenarioContext) -> VerifyResult<Vec<String>> {
        let admin = ctx.credentials.require_admin()?;
        let tag = &ctx.run_tag;
        let invite = json!({
            "email": format!("admin-verify+{tag}@example.com"),
            "permissionLevel": "USER",
        });
        let update = json!({ "name": format!("Verifier {tag}") });
        let result =
            run_lifecycle(&ctx.client, &admin, &catalog::user_resource(), &invite, &update).await?;
        Ok(vec![format!("user {} reached verified-absent", result.id)])
    }
}

/// Settings override, persistence check, and restore.
struct SettingsRoundTrip;

#[async_trait]
impl Scenario for SettingsRoundTrip {
    fn name(&self) -> &'static str {
        "settings_round_trip"
    }

    fn space(&self) -> ResourceSpace {
        ResourceSpace::Settings
    }

    async fn run(&self, ctx: &ScenarioContext) -> VerifyResult<Vec<String>> {
        let admin = ctx.credentials.require_admin()?;
        run_singleton_round_trip(
            &ctx.client,
            &admin,
            &catalog::settings_read(),
            &catalog::settings_update(),
            |current| {
                let flag = current.get("testUpdateFlag").and_then(Value::as_bool).unwrap_or(false);
                let mut patch = serde_json::Map::new();
                patch.insert("testUpdateFlag".to_string(), Value::Bool(!flag));
                patch
            },
        )
        .await?;
        Ok(vec!["settings restored to the observed representation".to_string()])
    }
}

// ============================================================================
// SECTION: Webhooks
// ============================================================================

/// Identity webhook replay including a duplicate delete.
struct WebhookReplay;

#[async_trait]
impl Scenario for WebhookReplay {
    fn name(&self) -> &'static str {
        "clerk_webhook_replay"
    }

    fn space(&self) -> ResourceSpace {
        ResourceSpace::Webhooks
    }

    async fn run(&self, ctx: &ScenarioContext) -> VerifyResult<Vec<String>> {
        let replayer = WebhookReplayer::new(
            ctx.client.clone(),
            &ctx.webhook.path,
            ctx.webhook.signer.clone(),
        );
        let subject = format!("user_verify_{}", ctx.run_tag);
        let acknowledgements = replayer.replay_sequence(&subject).await?;
        let mut notes = vec![format!("{} events acknowledged for {subject}", acknowledgements.len())];
        if ctx.webhook.signer.is_none() {
            notes.push("events sent unsigned: no webhook secret configured".to_string());
        }
        Ok(notes)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
