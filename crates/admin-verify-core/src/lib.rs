// crates/admin-verify-core/src/lib.rs
// ============================================================================
// Module: Admin Verify Core
// Description: Role-aware contract verifier for the admin HTTP API.
// Purpose: Drive lifecycles, tier matrices, and webhook replays as scenarios.
// Dependencies: reqwest, serde, serde_json, tokio
// ============================================================================

//! ## Overview
//! This crate verifies a running admin API from the outside. Endpoints are
//! declared as [`EndpointDescriptor`] values; responses are checked against
//! structural [`Shape`] descriptors; tier gating is checked by
//! [`run_matrix`]; CRUD consistency by [`run_lifecycle`]; webhook handling by
//! [`WebhookReplayer`]. Scenarios combine these and the [`Suite`] folds every
//! scenario into exactly one [`ScenarioResult`].
//! Invariants:
//! - No error terminates a run; failures are caught per scenario.
//! - Every created resource receives exactly one delete attempt.
//!
//! Security posture: credentials are opaque, supplied externally, and never
//! logged.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod catalog;
pub mod client;
pub mod descriptor;
pub mod error;
pub mod lifecycle;
pub mod matrix;
pub mod report;
pub mod scenarios;
pub mod shape;
pub mod suite;
pub mod webhook;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditSink;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use client::ApiRequest;
pub use client::ApiResponse;
pub use client::DEFAULT_TIMEOUT;
pub use client::HttpClient;
pub use descriptor::Credential;
pub use descriptor::CredentialSet;
pub use descriptor::EndpointDescriptor;
pub use descriptor::ResourceSpace;
pub use descriptor::StatusSet;
pub use descriptor::Tier;
pub use error::FailureKind;
pub use error::VerifyError;
pub use error::VerifyResult;
pub use lifecycle::LifecycleResult;
pub use lifecycle::ResourceApi;
pub use lifecycle::run_lifecycle;
pub use matrix::MatrixReport;
pub use matrix::run_matrix;
pub use report::Outcome;
pub use report::Report;
pub use report::ScenarioResult;
pub use report::Summary;
pub use report::duration_millis;
pub use scenarios::default_suite;
pub use shape::Shape;
pub use shape::assert_shape;
pub use suite::ExecutionMode;
pub use suite::Scenario;
pub use suite::ScenarioContext;
pub use suite::Suite;
pub use suite::WebhookSettings;
pub use webhook::SvixSigner;
pub use webhook::WebhookReplayer;
