// crates/admin-verify-cli/src/main.rs
// ============================================================================
// Module: Admin Verify CLI Entry Point
// Description: Command dispatcher for admin API verification runs.
// Purpose: Load config, build the scenario context, run, report, and exit.
// Dependencies: clap, admin-verify-config, admin-verify-core, rand, thiserror, tokio.
// ============================================================================

//! ## Overview
//! The `admin-verify` binary runs the registered scenario suite against a
//! target admin API and prints a Markdown or canonical JSON summary.
//! Exit codes: `0` when every scenario passed, `1` when any scenario failed
//! or errored, `2` on configuration or I/O errors.
//! Security posture: tokens come from the environment only and are never
//! printed.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod artifacts;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use admin_verify_config::LogConfig;
use admin_verify_config::LogSink;
use admin_verify_config::ProcessEnv;
use admin_verify_config::ResolvedSecrets;
use admin_verify_config::VerifyConfig;
use admin_verify_config::config_toml_example;
use admin_verify_core::AuditSink;
use admin_verify_core::CredentialSet;
use admin_verify_core::ExecutionMode;
use admin_verify_core::FileAuditSink;
use admin_verify_core::HttpClient;
use admin_verify_core::NoopAuditSink;
use admin_verify_core::ScenarioContext;
use admin_verify_core::StderrAuditSink;
use admin_verify_core::Suite;
use admin_verify_core::Summary;
use admin_verify_core::SvixSigner;
use admin_verify_core::WebhookSettings;
use admin_verify_core::default_suite;
use admin_verify_core::duration_millis;
use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use rand::Rng;
use rand::distributions::Alphanumeric;
use thiserror::Error;

use crate::artifacts::run_dir_name;
use crate::artifacts::write_run_artifacts;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Exit code for configuration and I/O errors.
const EXIT_CONFIG_ERROR: u8 = 2;
/// Exit code when any scenario failed or errored.
const EXIT_SCENARIO_FAILURE: u8 = 1;
/// Length of the per-run fixture tag.
const RUN_TAG_LEN: usize = 8;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "admin-verify", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the scenario suite against the configured target.
    Run(RunCommand),
    /// List registered scenarios.
    List(ListCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for a verification run.
#[derive(Args, Debug, Default)]
struct RunCommand {
    /// Optional config file path (defaults to admin-verify.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Run only the named scenario; repeatable. Replaces `run.scenarios`.
    #[arg(long = "scenario", value_name = "NAME")]
    scenarios: Vec<String>,
    /// Run resource-space groups one after another.
    #[arg(long, action = ArgAction::SetTrue)]
    sequential: bool,
    /// Summary format printed to stdout.
    #[arg(long, value_enum, default_value_t = SummaryFormat::Markdown)]
    format: SummaryFormat,
}

/// Arguments for listing scenarios.
#[derive(Args, Debug)]
struct ListCommand {
    /// Optional config file path (defaults to admin-verify.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate configuration and referenced secrets.
    Validate(ConfigValidateCommand),
    /// Print a canonical example configuration.
    Example,
}

/// Arguments for config validation.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to admin-verify.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Output formats for the run summary.
#[derive(ValueEnum, Copy, Clone, Debug, Default, PartialEq, Eq)]
enum SummaryFormat {
    /// Markdown report.
    #[default]
    Markdown,
    /// Canonical JSON report.
    Json,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper; always maps to the configuration exit code.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("admin-verify {version}"))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        write_stdout_line("usage: admin-verify <run|list|config> [--help]")
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Run(command) => command_run(command).await,
        Commands::List(command) => command_list(&command),
        Commands::Config {
            command,
        } => command_config(command),
    }
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

/// Runs the suite and writes the summary.
async fn command_run(command: RunCommand) -> CliResult<ExitCode> {
    let mut config = load_config(command.config.clone())?;
    apply_run_flags(&mut config, &command);
    let secrets = config
        .resolve_secrets(&ProcessEnv)
        .map_err(|err| CliError::new(format!("failed to resolve secrets: {err}")))?;
    let suite = select_suite(&config.run.scenarios)?;
    let audit = build_audit_sink(&config.log)?;
    let run_tag = new_run_tag();
    let ctx = build_context(&config, secrets, audit, run_tag.clone())?;
    let mode = if config.run.parallel { ExecutionMode::Parallel } else { ExecutionMode::Sequential };

    let report = suite.run(Arc::new(ctx), mode).await;

    let printed = match command.format {
        SummaryFormat::Markdown => write_stdout_line(&report.render_markdown()),
        SummaryFormat::Json => {
            let json = report
                .to_canonical_json()
                .map_err(|err| CliError::new(format!("failed to serialize report: {err}")))?;
            write_stdout_bytes(&json).and_then(|()| write_stdout_line(""))
        }
    };
    printed.map_err(|err| CliError::new(output_error("stdout", &err)))?;

    let dir_name = run_dir_name(now_millis(), &run_tag);
    let run_dir = write_run_artifacts(&config.run.artifacts_dir, &dir_name, &report)
        .map_err(|err| CliError::new(format!("failed to write run artifacts: {err}")))?;
    write_stderr_line(&format!("artifacts: {}", run_dir.display()))
        .map_err(|err| CliError::new(output_error("stderr", &err)))?;

    Ok(ExitCode::from(exit_status_for(&report.summarize())))
}

/// Applies `--scenario` and `--sequential` on top of the loaded config.
fn apply_run_flags(config: &mut VerifyConfig, command: &RunCommand) {
    if !command.scenarios.is_empty() {
        config.run.scenarios.clone_from(&command.scenarios);
    }
    if command.sequential {
        config.run.parallel = false;
    }
}

/// Selects scenarios by name from the default suite.
fn select_suite(names: &[String]) -> CliResult<Suite> {
    default_suite().select(names).map_err(|unknown| {
        CliError::new(format!("unknown scenario(s): {}", unknown.join(", ")))
    })
}

/// Builds the audit sink named by the log config.
fn build_audit_sink(log: &LogConfig) -> CliResult<Arc<dyn AuditSink>> {
    match (log.sink, &log.path) {
        (LogSink::Stderr, _) => Ok(Arc::new(StderrAuditSink)),
        (LogSink::Disabled, _) => Ok(Arc::new(NoopAuditSink)),
        (LogSink::File, Some(path)) => FileAuditSink::new(path)
            .map(|sink| Arc::new(sink) as Arc<dyn AuditSink>)
            .map_err(|err| {
                CliError::new(format!("failed to open audit log {}: {err}", path.display()))
            }),
        (LogSink::File, None) => {
            Err(CliError::new("log.path is required when log.sink = \"file\"".to_string()))
        }
    }
}

/// Builds the scenario context from config and resolved secrets.
fn build_context(
    config: &VerifyConfig,
    secrets: ResolvedSecrets,
    audit: Arc<dyn AuditSink>,
    run_tag: String,
) -> CliResult<ScenarioContext> {
    let client = HttpClient::new(&config.target.base_url, config.target.timeout(), audit)
        .map_err(|err| CliError::new(format!("failed to build http client: {err}")))?;
    let signer = secrets
        .webhook_secret
        .as_deref()
        .map(SvixSigner::from_secret)
        .transpose()
        .map_err(|err| CliError::new(format!("webhook.secret_env: {err}")))?;
    Ok(ScenarioContext {
        client,
        credentials: CredentialSet::from_tokens(secrets.user_token, secrets.admin_token),
        webhook: WebhookSettings {
            path: config.webhook.path.clone(),
            signer,
        },
        run_tag,
    })
}

/// Maps a run summary to the process exit status.
const fn exit_status_for(summary: &Summary) -> u8 {
    if summary.is_success() { 0 } else { EXIT_SCENARIO_FAILURE }
}

/// Random lower-case tag that keeps fixture names unique per run.
fn new_run_tag() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RUN_TAG_LEN)
        .map(|byte| char::from(byte).to_ascii_lowercase())
        .collect()
}

// ============================================================================
// SECTION: List Command
// ============================================================================

/// Lists registered scenarios, marking those excluded by config.
fn command_list(command: &ListCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.clone())?;
    select_suite(&config.run.scenarios)?;
    for line in scenario_listing(&default_suite(), &config.run.scenarios) {
        write_stdout_line(&line).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// One line per registered scenario: name, space, and selection state.
fn scenario_listing(suite: &Suite, selected: &[String]) -> Vec<String> {
    suite
        .entries()
        .into_iter()
        .map(|(name, space)| {
            let skipped = !selected.is_empty() && !selected.iter().any(|entry| entry == name);
            let marker = if skipped { "  (not selected)" } else { "" };
            format!("{name:<28} {}{marker}", space.as_str())
        })
        .collect()
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
        ConfigCommand::Example => {
            write_stdout_bytes(config_toml_example().as_bytes())
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Validates config, scenario names, and referenced secrets.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.clone())?;
    select_suite(&config.run.scenarios)?;
    let secrets = config
        .resolve_secrets(&ProcessEnv)
        .map_err(|err| CliError::new(format!("failed to resolve secrets: {err}")))?;
    if let Some(secret) = secrets.webhook_secret.as_deref() {
        SvixSigner::from_secret(secret)
            .map_err(|err| CliError::new(format!("webhook.secret_env: {err}")))?;
    }
    let tiers = CredentialSet::from_tokens(secrets.user_token, secrets.admin_token)
        .available_tiers()
        .iter()
        .map(|tier| tier.as_str())
        .collect::<Vec<_>>()
        .join(",");
    write_stdout_line(&format!("config ok: target={} tiers={tiers}", config.target.base_url))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Loads configuration, mapping failures to [`CliError`].
fn load_config(path: Option<PathBuf>) -> CliResult<VerifyConfig> {
    VerifyConfig::load(path.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes raw bytes to stdout without adding a newline.
fn write_stdout_bytes(bytes: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes)
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns the configuration exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::from(EXIT_CONFIG_ERROR)
}

/// Milliseconds since the Unix epoch; zero if the clock is before it.
fn now_millis() -> u64 {
    duration_millis(SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default())
}
