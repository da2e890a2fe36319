// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: System Test Helpers
// Description: Shared helpers for admin-verify system-tests.
// Purpose: Provide the admin API stub, context builders, and artifact utilities.
// Dependencies: system-tests, admin-verify-core
// ============================================================================

//! ## Overview
//! Shared helpers for admin-verify system-tests.
//! Invariants:
//! - Every test owns its stub; no state is shared between tests.
//! - Stubs bind loopback ports only.

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

pub mod admin_stub;
pub mod harness;
