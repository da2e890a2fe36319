// system-tests/tests/suites/cli_run.rs
// ============================================================================
// Module: CLI Run Tests
// Description: End-to-end admin-verify CLI runs against the admin API stub.
// Purpose: Validate exit codes, JSON output, and run artifacts.
// Dependencies: system-tests helpers, serde_json, tempfile
// ============================================================================

//! CLI coverage for admin-verify system-tests.

use std::fs;
use std::path::Path;
use std::process::Output;

use helpers::admin_stub::ADMIN_TOKEN;
use helpers::admin_stub::AdminStubOptions;
use helpers::admin_stub::Fault;
use helpers::admin_stub::USER_TOKEN;
use helpers::admin_stub::spawn_admin_stub;
use helpers::artifacts::TestReporter;
use helpers::cli::cli_binary;
use helpers::cli::run_cli;
use serde_json::Value;
use tempfile::TempDir;

use crate::helpers;

/// Writes a verifier config targeting `base_url` with artifacts under `artifacts_dir`.
fn write_verify_config(path: &Path, base_url: &str, artifacts_dir: &Path) -> Result<(), String> {
    let contents = format!(
        r#"[target]
base_url = "{base_url}"
timeout_ms = 5000

[run]
artifacts_dir = '{}'

[log]
sink = "none"
"#,
        artifacts_dir.display()
    );
    fs::write(path, contents).map_err(|err| format!("write config failed: {err}"))
}

/// Token environment for both tiers.
const TOKENS: [(&str, &str); 2] =
    [("ADMIN_VERIFY_ADMIN_TOKEN", ADMIN_TOKEN), ("ADMIN_VERIFY_USER_TOKEN", USER_TOKEN)];

/// Saves process output next to the test summary.
fn save_output(reporter: &TestReporter, prefix: &str, output: &Output) -> Result<(), String> {
    let root = reporter.artifacts();
    root.write_text(&format!("{prefix}.stdout.log"), &String::from_utf8_lossy(&output.stdout))
        .map_err(|err| err.to_string())?;
    root.write_text(&format!("{prefix}.stderr.log"), &String::from_utf8_lossy(&output.stderr))
        .map_err(|err| err.to_string())?;
    Ok(())
}

/// Exit code as text; `signal` when the process was killed.
fn exit_code(output: &Output) -> String {
    output.status.code().map_or_else(|| "signal".to_string(), |code| code.to_string())
}

/// Finishes a test as skipped when the binary is unavailable.
fn skip(mut reporter: TestReporter) -> Result<(), Box<dyn std::error::Error>> {
    reporter.finish(
        "skip",
        vec!["admin-verify CLI binary unavailable".to_string()],
        vec!["summary.json".to_string(), "summary.md".to_string()],
    )?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn cli_run_succeeds_and_writes_artifacts() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("cli_run_succeeds_and_writes_artifacts")?;
    let Some(cli) = cli_binary() else {
        return skip(reporter);
    };
    let stub = spawn_admin_stub(AdminStubOptions::compliant())?;
    let temp_dir = TempDir::new()?;
    let artifacts_dir = temp_dir.path().join("runs");
    let config_path = temp_dir.path().join("admin-verify.toml");
    write_verify_config(&config_path, stub.base_url(), &artifacts_dir)?;
    let config_arg = config_path.display().to_string();

    let output = run_cli(&cli, &["run", "--config", &config_arg, "--format", "json"], &TOKENS)?;
    save_output(&reporter, "cli.run", &output)?;
    if output.status.code() != Some(0) {
        return Err(format!("expected exit 0, got {}", exit_code(&output)).into());
    }
    let document: Value = serde_json::from_slice(&output.stdout)?;
    if document.pointer("/summary/passed") != document.pointer("/summary/total") {
        return Err("stdout summary reports non-passing scenarios".into());
    }

    let runs: Vec<_> = fs::read_dir(&artifacts_dir)?.collect::<Result<_, _>>()?;
    let [run_dir] = runs.as_slice() else {
        return Err(format!("expected one run directory, found {}", runs.len()).into());
    };
    let run_path = run_dir.path();
    let name = run_dir.file_name().to_string_lossy().to_string();
    if !name.starts_with("run-") {
        return Err(format!("unexpected run directory name {name}").into());
    }
    let on_disk: Value = serde_json::from_slice(&fs::read(run_path.join("summary.json"))?)?;
    if on_disk != document {
        return Err("summary.json differs from stdout".into());
    }
    if !run_path.join("summary.md").exists() {
        return Err("summary.md missing".into());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.contains("artifacts: ") {
        return Err("stderr should name the artifacts directory".into());
    }

    reporter.finish(
        "pass",
        vec![format!("run artifacts written to {name}")],
        vec![
            "summary.json".to_string(),
            "summary.md".to_string(),
            "cli.run.stdout.log".to_string(),
            "cli.run.stderr.log".to_string(),
        ],
    )?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn cli_run_exits_one_on_contract_failure() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("cli_run_exits_one_on_contract_failure")?;
    let Some(cli) = cli_binary() else {
        return skip(reporter);
    };
    let stub = spawn_admin_stub(AdminStubOptions::with_fault(Fault::LeakUsageToUsers))?;
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("admin-verify.toml");
    write_verify_config(&config_path, stub.base_url(), &temp_dir.path().join("runs"))?;
    let config_arg = config_path.display().to_string();

    let output = run_cli(
        &cli,
        &["run", "--config", &config_arg, "--scenario", "usage_authorization", "--sequential"],
        &TOKENS,
    )?;
    save_output(&reporter, "cli.run", &output)?;
    if output.status.code() != Some(1) {
        return Err(format!("expected exit 1, got {}", exit_code(&output)).into());
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.contains("usage_authorization") || !stdout.contains("authorization_leak") {
        return Err("markdown summary should name the leaking scenario".into());
    }

    reporter.finish(
        "pass",
        vec!["leak reported with exit status 1".to_string()],
        vec!["summary.json".to_string(), "summary.md".to_string()],
    )?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn cli_rejects_invalid_config_and_unknown_scenarios()
-> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("cli_rejects_invalid_config_and_unknown_scenarios")?;
    let Some(cli) = cli_binary() else {
        return skip(reporter);
    };
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("admin-verify.toml");
    write_verify_config(&config_path, "ftp://admin.example.test", &temp_dir.path().join("runs"))?;
    let config_arg = config_path.display().to_string();

    let output = run_cli(&cli, &["run", "--config", &config_arg], &TOKENS)?;
    save_output(&reporter, "cli.bad_config", &output)?;
    if output.status.code() != Some(2) {
        return Err(format!("bad config: expected exit 2, got {}", exit_code(&output)).into());
    }
    if !String::from_utf8_lossy(&output.stderr).contains("target.base_url") {
        return Err("bad config error should name the field".into());
    }

    let output = run_cli(&cli, &["config", "validate", "--config", &config_arg], &[])?;
    if output.status.code() != Some(2) {
        return Err("config validate should reject the same file".into());
    }

    let stub = spawn_admin_stub(AdminStubOptions::compliant())?;
    write_verify_config(&config_path, stub.base_url(), &temp_dir.path().join("runs"))?;
    let output = run_cli(
        &cli,
        &["run", "--config", &config_arg, "--scenario", "no_such_scenario"],
        &TOKENS,
    )?;
    save_output(&reporter, "cli.unknown_scenario", &output)?;
    if output.status.code() != Some(2) {
        return Err(format!("unknown scenario: expected exit 2, got {}", exit_code(&output))
            .into());
    }
    if !String::from_utf8_lossy(&output.stderr).contains("no_such_scenario") {
        return Err("unknown scenario error should name the scenario".into());
    }
    if !stub.requests().is_empty() {
        return Err("no request should reach the target for an unknown scenario".into());
    }

    reporter.finish(
        "pass",
        vec!["configuration errors exit with status 2".to_string()],
        vec!["summary.json".to_string(), "summary.md".to_string()],
    )?;
    Ok(())
}
