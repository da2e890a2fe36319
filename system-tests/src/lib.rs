// system-tests/src/lib.rs
// ============================================================================
// Module: Admin Verify System Tests Library
// Description: Shared configuration for end-to-end verifier tests.
// Purpose: Provide common settings for the system-test binaries.
// Dependencies: admin-verify-config
// ============================================================================

//! ## Overview
//! This crate hosts shared configuration used by the admin-verify
//! system-test binaries in `system-tests/tests`. The binaries run the
//! verifier against an in-process stub of the admin API.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
