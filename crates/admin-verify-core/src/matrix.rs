// crates/admin-verify-core/src/matrix.rs
// ============================================================================
// Module: Authorization Matrix Runner
// Description: Replays one endpoint under each credential tier.
// Purpose: Check per-tier status gating and flag authorization leaks.
// Dependencies: reqwest, serde_json
// ============================================================================

//! ## Overview
//! For each tier, [`run_matrix`] issues the same request with that tier's
//! credential. Tiers below the endpoint's required tier must be denied with
//! 401 or 403; either is acceptable. Tiers that satisfy the requirement must
//! receive a success status and a body matching the success descriptor.
//!
//! ## Invariants
//! - A 2xx under a tier that must be denied is an authorization leak and
//!   outranks every other failure in the matrix verdict.
//! - Denial probes against mutating endpoints never carry a body.
//! - Tiers without a configured credential are skipped and noted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use crate::client::ApiRequest;
use crate::client::HttpClient;
use crate::descriptor::Credential;
use crate::descriptor::CredentialSet;
use crate::descriptor::EndpointDescriptor;
use crate::descriptor::StatusSet;
use crate::descriptor::Tier;
use crate::error::FailureKind;
use crate::error::VerifyError;
use crate::error::VerifyResult;
use crate::shape::assert_body;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Verdict for one tier.
#[derive(Debug, Clone, PartialEq)]
pub enum TierVerdict {
    /// Status matched; for admitted tiers the body matched too.
    Passed {
        /// Observed status.
        status: u16,
        /// Parsed body for admitted tiers with a response descriptor.
        body: Option<Value>,
    },
    /// Tier was not exercised.
    Skipped(String),
    /// Tier check failed.
    Failed(VerifyError),
}

/// Outcome for one tier.
#[derive(Debug, Clone, PartialEq)]
pub struct TierOutcome {
    /// Tier exercised.
    pub tier: Tier,
    /// Statuses accepted for this tier.
    pub expected: StatusSet,
    /// Verdict.
    pub verdict: TierVerdict,
}

/// Per-tier outcomes for one endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixReport {
    /// Endpoint context (`METHOD path`).
    pub endpoint: String,
    /// Outcomes in the order tiers were requested.
    pub tiers: Vec<TierOutcome>,
}

impl MatrixReport {
    /// Collapses the matrix into one verdict.
    ///
    /// # Errors
    ///
    /// Returns the first authorization leak if any, else the first failure.
    pub fn verdict(&self) -> VerifyResult<()> {
        let failures = self.tiers.iter().filter_map(|outcome| match &outcome.verdict {
            TierVerdict::Failed(err) => Some(err),
            _ => None,
        });
        let mut first = None;
        for err in failures {
            if err.kind() == FailureKind::AuthorizationLeak {
                return Err(err.clone());
            }
            first.get_or_insert(err);
        }
        first.map_or(Ok(()), |err| Err(err.clone()))
    }

    /// Notes for skipped tiers.
    #[must_use]
    pub fn notes(&self) -> Vec<String> {
        self.tiers
            .iter()
            .filter_map(|outcome| match &outcome.verdict {
                TierVerdict::Skipped(reason) => {
                    Some(format!("{}: tier {} skipped: {reason}", self.endpoint, outcome.tier))
                }
                _ => None,
            })
            .collect()
    }

    /// Parsed success body observed for `tier`, if any.
    #[must_use]
    pub fn body_for(&self, tier: Tier) -> Option<&Value> {
        self.tiers.iter().find(|outcome| outcome.tier == tier).and_then(|outcome| {
            match &outcome.verdict {
                TierVerdict::Passed {
                    body,
                    ..
                } => body.as_ref(),
                _ => None,
            }
        })
    }
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Runs `descriptor` under each of `tiers`.
///
/// `params` fill the path template; `body` is sent only to admitted tiers.
/// Failures are recorded per tier rather than returned, so every tier is
/// exercised even after a leak.
pub async fn run_matrix(
    client: &HttpClient,
    descriptor: &EndpointDescriptor,
    params: &[(&str, &str)],
    credentials: &CredentialSet,
    tiers: &[Tier],
    body: Option<&Value>,
) -> MatrixReport {
    let endpoint = descriptor.context();
    let mut outcomes = Vec::with_capacity(tiers.len());
    for tier in tiers {
        let admitted = tier.satisfies(descriptor.tier);
        let expected = if admitted { descriptor.success.clone() } else { StatusSet::denied() };
        let verdict = match credentials.for_tier(*tier) {
            None => TierVerdict::Skipped("no credential configured".to_string()),
            Some(credential) => {
                match probe(client, descriptor, params, credential, admitted, body).await {
                    Ok((status, body)) => TierVerdict::Passed {
                        status,
                        body,
                    },
                    Err(err) => TierVerdict::Failed(err),
                }
            }
        };
        outcomes.push(TierOutcome {
            tier: *tier,
            expected,
            verdict,
        });
    }
    MatrixReport {
        endpoint,
        tiers: outcomes,
    }
}

/// Issues one request and checks it against the tier's expectation.
async fn probe(
    client: &HttpClient,
    descriptor: &EndpointDescriptor,
    params: &[(&str, &str)],
    credential: Credential,
    admitted: bool,
    body: Option<&Value>,
) -> VerifyResult<(u16, Option<Value>)> {
    let tier = credential.tier();
    let path = descriptor.path.render(params)?;
    let mut request = ApiRequest::new(descriptor.method.clone(), path, credential);
    if let (true, Some(body)) = (admitted, body) {
        request = request.with_json(body);
    }
    let context = request.context();
    let response = client.send(&request).await?;
    if !admitted {
        if response.is_success() {
            return Err(VerifyError::AuthorizationLeak {
                context,
                tier,
                status: response.status,
            });
        }
        if !StatusSet::denied().contains(response.status) {
            return Err(VerifyError::StatusMismatch {
                context,
                expected: StatusSet::denied().to_string(),
                found: response.status,
            });
        }
        return Ok((response.status, None));
    }
    if !descriptor.success.contains(response.status) {
        return Err(VerifyError::StatusMismatch {
            context,
            expected: descriptor.success.to_string(),
            found: response.status,
        });
    }
    let parsed = match &descriptor.response {
        Some(shape) => Some(assert_body(&context, &response.body, shape)?),
        None => None,
    };
    Ok((response.status, parsed))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
