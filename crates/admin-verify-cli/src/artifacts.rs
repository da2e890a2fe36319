// crates/admin-verify-cli/src/artifacts.rs
// ============================================================================
// Module: Run Artifacts
// Description: Per-run summary artifacts on disk.
// Purpose: Persist canonical JSON and Markdown summaries for each run.
// Dependencies: admin-verify-core
// ============================================================================

//! ## Overview
//! Each run writes into its own directory under the configured artifacts
//! root, named from the start time and the run tag, so concurrent runs never
//! share files.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use admin_verify_core::Report;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Canonical JSON summary filename.
pub(crate) const SUMMARY_JSON: &str = "summary.json";
/// Markdown summary filename.
pub(crate) const SUMMARY_MD: &str = "summary.md";

// ============================================================================
// SECTION: Writers
// ============================================================================

/// Directory name for one run.
pub(crate) fn run_dir_name(started_ms: u64, run_tag: &str) -> String {
    format!("run-{started_ms}-{run_tag}")
}

/// Writes `summary.json` and `summary.md` into `root/dir_name`.
///
/// Returns the run directory.
pub(crate) fn write_run_artifacts(
    root: &Path,
    dir_name: &str,
    report: &Report,
) -> io::Result<PathBuf> {
    let run_dir = root.join(dir_name);
    fs::create_dir_all(&run_dir)?;
    let mut json = report.to_canonical_json().map_err(io::Error::other)?;
    json.push(b'\n');
    fs::write(run_dir.join(SUMMARY_JSON), json)?;
    fs::write(run_dir.join(SUMMARY_MD), report.render_markdown())?;
    Ok(run_dir)
}
