// crates/admin-verify-core/src/suite.rs
// ============================================================================
// Module: Scenario Suite Runner
// Description: Scenario trait, explicit run context, and the suite scheduler.
// Purpose: Produce exactly one result per registered scenario.
// Dependencies: async-trait, tokio
// ============================================================================

//! ## Overview
//! Scenarios receive a [`ScenarioContext`] explicitly; there is no
//! process-wide state. The [`Suite`] groups scenarios by
//! [`ResourceSpace`]: groups may run concurrently, while scenarios inside a
//! group run sequentially in registration order. Every scenario runs in its
//! own task so that a panic is reported as an `error` result rather than
//! tearing down the run.
//!
//! ## Invariants
//! - The report holds one result per registered scenario, in registration
//!   order, regardless of individual failures.
//! - Two scenarios never share a resource handle; handles are scenario-local.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use tokio::task::JoinSet;

use crate::audit::ScenarioEvent;
use crate::client::HttpClient;
use crate::descriptor::CredentialSet;
use crate::descriptor::ResourceSpace;
use crate::error::VerifyError;
use crate::error::VerifyResult;
use crate::report::Report;
use crate::report::ScenarioResult;
use crate::webhook::SvixSigner;

// ============================================================================
// SECTION: Context
// ============================================================================

/// Webhook target settings.
#[derive(Debug, Clone)]
pub struct WebhookSettings {
    /// Webhook path relative to the base URL.
    pub path: String,
    /// Signer, when a secret is configured.
    pub signer: Option<SvixSigner>,
}

/// Everything a scenario may use; passed into each invocation.
#[derive(Clone)]
pub struct ScenarioContext {
    /// HTTP client bound to the system under test.
    pub client: HttpClient,
    /// Credentials supplied for this run.
    pub credentials: CredentialSet,
    /// Webhook target.
    pub webhook: WebhookSettings,
    /// Per-run tag embedded in fixture names.
    pub run_tag: String,
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// One named conformance scenario.
#[async_trait]
pub trait Scenario: Send + Sync {
    /// Stable scenario name.
    fn name(&self) -> &'static str;

    /// Resource space the scenario touches.
    fn space(&self) -> ResourceSpace;

    /// Runs the scenario and returns informational notes on success.
    async fn run(&self, ctx: &ScenarioContext) -> VerifyResult<Vec<String>>;
}

// ============================================================================
// SECTION: Suite
// ============================================================================

/// Scheduling mode for scenario groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Resource-space groups run concurrently.
    Parallel,
    /// Groups run one after another.
    Sequential,
}

/// Registered scenarios in registration order.
#[derive(Clone, Default)]
pub struct Suite {
    /// Scenarios in registration order.
    scenarios: Vec<Arc<dyn Scenario>>,
}

impl std::fmt::Debug for Suite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Suite")
            .field(
                "scenarios",
                &self.scenarios.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Suite {
    /// Creates an empty suite.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a scenario.
    #[must_use]
    pub fn with(mut self, scenario: impl Scenario + 'static) -> Self {
        self.scenarios.push(Arc::new(scenario));
        self
    }

    /// Registered scenario names and spaces.
    #[must_use]
    pub fn entries(&self) -> Vec<(&'static str, ResourceSpace)> {
        self.scenarios.iter().map(|scenario| (scenario.name(), scenario.space())).collect()
    }

    /// Number of registered scenarios.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// Returns true when no scenario is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Keeps only the named scenarios; an empty filter keeps all.
    ///
    /// # Errors
    ///
    /// Returns the unknown names when any filter entry matches no scenario.
    pub fn select(self, names: &[String]) -> Result<Self, Vec<String>> {
        if names.is_empty() {
            return Ok(self);
        }
        let unknown: Vec<String> = names
            .iter()
            .filter(|name| !self.scenarios.iter().any(|scenario| scenario.name() == *name))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(unknown);
        }
        let scenarios = self
            .scenarios
            .into_iter()
            .filter(|scenario| names.iter().any(|name| name == scenario.name()))
            .collect();
        Ok(Self {
            scenarios,
        })
    }

    /// Runs every scenario and returns the report.
    pub async fn run(&self, ctx: Arc<ScenarioContext>, mode: ExecutionMode) -> Report {
        let mut groups: BTreeMap<ResourceSpace, Vec<(usize, Arc<dyn Scenario>)>> = BTreeMap::new();
        for (index, scenario) in self.scenarios.iter().enumerate() {
            groups.entry(scenario.space()).or_default().push((index, Arc::clone(scenario)));
        }

        let mut slots: Vec<Option<ScenarioResult>> = vec![None; self.scenarios.len()];
        match mode {
            ExecutionMode::Sequential => {
                for group in groups.into_values() {
                    for (index, result) in run_group(group, Arc::clone(&ctx)).await {
                        slots[index] = Some(result);
                    }
                }
            }
            ExecutionMode::Parallel => {
                let mut tasks = JoinSet::new();
                for group in groups.into_values() {
                    tasks.spawn(run_group(group, Arc::clone(&ctx)));
                }
                while let Some(joined) = tasks.join_next().await {
                    if let Ok(results) = joined {
                        for (index, result) in results {
                            slots[index] = Some(result);
                        }
                    }
                }
            }
        }

        let mut report = Report::new();
        for (slot, scenario) in slots.into_iter().zip(&self.scenarios) {
            report.record(slot.unwrap_or_else(|| {
                ScenarioResult::from_error(
                    scenario.name(),
                    scenario.space(),
                    Duration::ZERO,
                    &VerifyError::Aborted("scenario group did not complete".to_string()),
                )
            }));
        }
        report
    }
}

/// Runs one resource-space group sequentially.
async fn run_group(
    group: Vec<(usize, Arc<dyn Scenario>)>,
    ctx: Arc<ScenarioContext>,
) -> Vec<(usize, ScenarioResult)> {
    let mut results = Vec::with_capacity(group.len());
    for (index, scenario) in group {
        results.push((index, execute(scenario, Arc::clone(&ctx)).await));
    }
    results
}

/// Runs one scenario in its own task and folds the outcome into a result.
async fn execute(scenario: Arc<dyn Scenario>, ctx: Arc<ScenarioContext>) -> ScenarioResult {
    let name = scenario.name();
    let space = scenario.space();
    let audit = Arc::clone(ctx.client.audit());
    audit.record_scenario(&ScenarioEvent::started(name, space));
    let started = Instant::now();

    let task = tokio::spawn(async move { scenario.run(&ctx).await });
    let result = match task.await {
        Ok(Ok(notes)) => ScenarioResult::passed(name, space, started.elapsed(), notes),
        Ok(Err(err)) => ScenarioResult::from_error(name, space, started.elapsed(), &err),
        Err(join) => {
            let detail = if join.is_panic() { "scenario panicked" } else { "scenario cancelled" };
            ScenarioResult::from_error(
                name,
                space,
                started.elapsed(),
                &VerifyError::Aborted(detail.to_string()),
            )
        }
    };

    audit.record_scenario(&ScenarioEvent::finished(
        name,
        space,
        result.outcome,
        result.failure.as_ref().map(|failure| failure.kind),
        result.duration_ms,
    ));
    result
}

// ============================================================================
// SECTION: Tests
// ============================================================================
