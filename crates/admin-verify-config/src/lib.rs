// crates/admin-verify-config/src/lib.rs
// ============================================================================
// Module: Admin Verify Config Library
// Description: Canonical config model, validation, and env overrides.
// Purpose: Single source of truth for admin-verify.toml semantics.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! `admin-verify-config` defines the configuration model for the verifier.
//! Files are size-capped, UTF-8 only, and reject unknown keys. A small set of
//! environment variables override file values; token material is only ever
//! read from the environment.
//!
//! Security posture: config inputs are untrusted and validated fail-closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod env;
pub mod example;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use env::EnvSource;
pub use env::MapEnv;
pub use env::ProcessEnv;
pub use example::config_toml_example;
