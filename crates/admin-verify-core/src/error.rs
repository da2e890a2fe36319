// crates/admin-verify-core/src/error.rs
// ============================================================================
// Module: Verifier Errors
// Description: Failure taxonomy for conformance scenarios.
// Purpose: Give every scenario failure a stable kind and a readable detail.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Every check in the verifier returns [`VerifyError`] on failure. Errors are
//! caught at scenario granularity and folded into a scenario result, so each
//! variant maps onto a stable [`FailureKind`] label and an outcome class.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use thiserror::Error;

use crate::descriptor::Tier;

// ============================================================================
// SECTION: Failure Kinds
// ============================================================================

/// Stable failure classification used in reports and audit events.
///
/// # Invariants
/// - Labels are stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network failure, DNS failure, or request timeout.
    TransportError,
    /// Body was not JSON where JSON was required.
    MalformedBody,
    /// Body parsed but did not match its descriptor.
    ShapeViolation,
    /// A restricted tier received a success status.
    AuthorizationLeak,
    /// Round-trip mismatch, missing identifier, or leaked resource.
    LifecycleInconsistency,
    /// Webhook acknowledgement was not accepted.
    ReplayError,
    /// Status outside the accepted set with no more specific kind.
    StatusMismatch,
    /// A tier needed by the scenario has no credential.
    MissingCredential,
    /// The scenario task panicked or was cancelled.
    Aborted,
}

impl FailureKind {
    /// Returns the stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TransportError => "transport_error",
            Self::MalformedBody => "malformed_body",
            Self::ShapeViolation => "shape_violation",
            Self::AuthorizationLeak => "authorization_leak",
            Self::LifecycleInconsistency => "lifecycle_inconsistency",
            Self::ReplayError => "replay_error",
            Self::StatusMismatch => "status_mismatch",
            Self::MissingCredential => "missing_credential",
            Self::Aborted => "aborted",
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Verifier failure raised by a single check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// The request never produced an HTTP response.
    #[error("{method} {path}: transport failure: {message}")]
    Transport {
        /// HTTP method.
        method: String,
        /// Request path relative to the base URL.
        path: String,
        /// Underlying client error.
        message: String,
    },
    /// The body could not be parsed as JSON.
    #[error("{context}: malformed body: {message}")]
    MalformedBody {
        /// Request context (`METHOD path`).
        context: String,
        /// Parser error message.
        message: String,
    },
    /// A required key is missing or has the wrong type.
    #[error("{context}: shape violation at {pointer}: expected {expected}, found {found}")]
    ShapeViolation {
        /// Request context (`METHOD path`).
        context: String,
        /// JSON pointer to the offending value.
        pointer: String,
        /// Expected shape description.
        expected: String,
        /// Observed value description.
        found: String,
    },
    /// A tier that must be denied got a 2xx response.
    #[error("{context}: authorization leak: tier {tier} received status {status}")]
    AuthorizationLeak {
        /// Request context (`METHOD path`).
        context: String,
        /// Tier that was wrongly admitted.
        tier: Tier,
        /// Observed status code.
        status: u16,
    },
    /// Lifecycle step disagreed with the previous step.
    #[error("lifecycle inconsistency: {0}")]
    LifecycleInconsistency(String),
    /// Webhook acknowledgement was rejected.
    #[error("webhook replay error: {0}")]
    Replay(String),
    /// Status code outside the accepted set.
    #[error("{context}: expected status {expected}, found {found}")]
    StatusMismatch {
        /// Request context (`METHOD path`).
        context: String,
        /// Accepted statuses, human readable.
        expected: String,
        /// Observed status code.
        found: u16,
    },
    /// The scenario needs a credential for a tier that was not supplied.
    #[error("no credential supplied for tier {0}")]
    MissingCredential(Tier),
    /// The scenario task ended without producing a verdict.
    #[error("scenario aborted: {0}")]
    Aborted(String),
    /// A failed check whose cleanup delete also failed. Keeps the kind of
    /// the original failure.
    #[error("{error}; {leak}")]
    Leaked {
        /// Failure that triggered the cleanup.
        error: Box<VerifyError>,
        /// Cleanup outcome naming the leaked resource.
        leak: String,
    },
}

impl VerifyError {
    /// Returns the failure classification for this error.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Transport {
                ..
            } => FailureKind::TransportError,
            Self::MalformedBody {
                ..
            } => FailureKind::MalformedBody,
            Self::ShapeViolation {
                ..
            } => FailureKind::ShapeViolation,
            Self::AuthorizationLeak {
                ..
            } => FailureKind::AuthorizationLeak,
            Self::LifecycleInconsistency(_) => FailureKind::LifecycleInconsistency,
            Self::Replay(_) => FailureKind::ReplayError,
            Self::StatusMismatch {
                ..
            } => FailureKind::StatusMismatch,
            Self::MissingCredential(_) => FailureKind::MissingCredential,
            Self::Aborted(_) => FailureKind::Aborted,
            Self::Leaked {
                error,
                ..
            } => error.kind(),
        }
    }

    /// Returns true when the failure is an execution error rather than a
    /// contract failure.
    #[must_use]
    pub fn is_execution_error(&self) -> bool {
        matches!(
            self.kind(),
            FailureKind::TransportError | FailureKind::MissingCredential | FailureKind::Aborted
        )
    }
}

/// Result alias for verifier checks.
pub type VerifyResult<T> = Result<T, VerifyError>;
