// crates/admin-verify-core/src/report.rs
// ============================================================================
// Module: Test Report Aggregator
// Description: Scenario results, run summaries, and report rendering.
// Purpose: Reduce a run to pass/fail/error counts and a failure list.
// Dependencies: serde, serde_jcs, serde_json
// ============================================================================

//! ## Overview
//! Every scenario yields exactly one [`ScenarioResult`]. The [`Report`]
//! aggregates results in registration order and derives a [`Summary`] on
//! demand, so counts can never drift from the recorded results.
//!
//! ## Invariants
//! - `total == passed + failed + errored`.
//! - The failure list keeps the order in which results were recorded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;
use std::time::Duration;

use serde::Serialize;

use crate::descriptor::ResourceSpace;
use crate::error::FailureKind;
use crate::error::VerifyError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Scenario outcome class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Every check held.
    Pass,
    /// A contract check failed.
    Fail,
    /// The scenario could not execute.
    Error,
}

impl Outcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Error => "error",
        }
    }
}

/// Why a scenario did not pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    /// Failure classification.
    pub kind: FailureKind,
    /// Human-readable detail.
    pub detail: String,
}

/// Result of one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioResult {
    /// Scenario name.
    pub name: String,
    /// Resource space the scenario belongs to.
    pub space: ResourceSpace,
    /// Outcome class.
    pub outcome: Outcome,
    /// Failure detail, absent on pass.
    pub failure: Option<Failure>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Informational notes (skipped tiers, cleanup outcomes).
    pub notes: Vec<String>,
}

impl ScenarioResult {
    /// Builds a passing result.
    #[must_use]
    pub fn passed(name: &str, space: ResourceSpace, duration: Duration, notes: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            space,
            outcome: Outcome::Pass,
            failure: None,
            duration_ms: duration_millis(duration),
            notes,
        }
    }

    /// Builds a result from a scenario error; execution errors map to
    /// [`Outcome::Error`], everything else to [`Outcome::Fail`].
    #[must_use]
    pub fn from_error(
        name: &str,
        space: ResourceSpace,
        duration: Duration,
        error: &VerifyError,
    ) -> Self {
        let outcome = if error.is_execution_error() { Outcome::Error } else { Outcome::Fail };
        Self {
            name: name.to_string(),
            space,
            outcome,
            failure: Some(Failure {
                kind: error.kind(),
                detail: error.to_string(),
            }),
            duration_ms: duration_millis(duration),
            notes: Vec::new(),
        }
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
///
/// Serialized timings must stay `u64`; `serde_jcs` cannot encode `u128`.
#[must_use]
pub fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Run summary derived from recorded results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Number of scenarios.
    pub total: usize,
    /// Scenarios that passed.
    pub passed: usize,
    /// Scenarios that failed a contract check.
    pub failed: usize,
    /// Scenarios that could not execute.
    pub errored: usize,
    /// Non-passing results in recording order.
    pub failures: Vec<FailureEntry>,
}

impl Summary {
    /// Returns true when every scenario passed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }
}

/// One non-passing scenario in a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureEntry {
    /// Scenario name.
    pub scenario: String,
    /// Outcome (`fail` or `error`).
    pub outcome: Outcome,
    /// Failure classification.
    pub kind: FailureKind,
    /// Human-readable detail.
    pub detail: String,
}

// ============================================================================
// SECTION: Aggregator
// ============================================================================

/// Ordered collection of scenario results.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    /// Recorded results in registration order.
    results: Vec<ScenarioResult>,
}

impl Report {
    /// Creates an empty report.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            results: Vec::new(),
        }
    }

    /// Appends one result.
    pub fn record(&mut self, result: ScenarioResult) {
        self.results.push(result);
    }

    /// Returns recorded results.
    #[must_use]
    pub fn results(&self) -> &[ScenarioResult] {
        &self.results
    }

    /// Derives the summary from the current results.
    #[must_use]
    pub fn summarize(&self) -> Summary {
        let mut summary = Summary {
            total: self.results.len(),
            passed: 0,
            failed: 0,
            errored: 0,
            failures: Vec::new(),
        };
        for result in &self.results {
            match result.outcome {
                Outcome::Pass => summary.passed += 1,
                Outcome::Fail => summary.failed += 1,
                Outcome::Error => summary.errored += 1,
            }
            if let Some(failure) = &result.failure {
                summary.failures.push(FailureEntry {
                    scenario: result.name.clone(),
                    outcome: result.outcome,
                    kind: failure.kind,
                    detail: failure.detail.clone(),
                });
            }
        }
        summary
    }

    /// Serializes results and summary as canonical JSON.
    ///
    /// # Errors
    ///
    /// Returns the serializer message when encoding fails.
    pub fn to_canonical_json(&self) -> Result<Vec<u8>, String> {
        let document = ReportDocument {
            summary: self.summarize(),
            results: &self.results,
        };
        serde_jcs::to_vec(&document).map_err(|err| err.to_string())
    }

    /// Renders a Markdown report: counts first, then one row per scenario.
    #[must_use]
    pub fn render_markdown(&self) -> String {
        let summary = self.summarize();
        let mut out = String::new();
        out.push_str("# Admin API Conformance Report\n\n");
        let _ = writeln!(
            out,
            "- Total: {}\n- Passed: {}\n- Failed: {}\n- Errored: {}\n",
            summary.total, summary.passed, summary.failed, summary.errored
        );
        out.push_str("| Scenario | Space | Outcome | Duration (ms) | Detail |\n");
        out.push_str("| --- | --- | --- | --- | --- |\n");
        for result in &self.results {
            let detail = result
                .failure
                .as_ref()
                .map(|failure| format!("{}: {}", failure.kind.as_str(), failure.detail))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} |",
                result.name,
                result.space.as_str(),
                result.outcome.as_str(),
                result.duration_ms,
                detail.replace('|', "\\|")
            );
        }
        let noted: Vec<&ScenarioResult> =
            self.results.iter().filter(|result| !result.notes.is_empty()).collect();
        if !noted.is_empty() {
            out.push_str("\n## Notes\n\n");
            for result in noted {
                for note in &result.notes {
                    let _ = writeln!(out, "- {}: {note}", result.name);
                }
            }
        }
        out
    }
}

/// Serialized artifact layout.
#[derive(Serialize)]
struct ReportDocument<'a> {
    /// Derived counts and failure list.
    summary: Summary,
    /// Per-scenario results.
    results: &'a [ScenarioResult],
}

// ============================================================================
// SECTION: Tests
// ============================================================================
