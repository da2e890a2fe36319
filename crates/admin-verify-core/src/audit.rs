// crates/admin-verify-core/src/audit.rs
// ============================================================================
// Module: Verifier Audit Logging
// Description: Structured audit events for HTTP exchanges and scenarios.
// Purpose: Emit JSON-line logs without hard dependencies on a log pipeline.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Audit events are serialized as one JSON object per line. Sinks decide the
//! destination: stderr, an append-only file, or nowhere. Credential material
//! never appears in an event; HTTP events carry the tier label only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::descriptor::ResourceSpace;
use crate::descriptor::Tier;
use crate::error::FailureKind;
use crate::report::Outcome;
use crate::report::duration_millis;

// ============================================================================
// SECTION: Types
// ============================================================================

/// One HTTP request/response exchange.
#[derive(Debug, Clone, Serialize)]
pub struct HttpExchangeEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u64,
    /// HTTP method.
    pub method: String,
    /// Request path relative to the base URL.
    pub path: String,
    /// Tier of the credential used.
    pub tier: Tier,
    /// Response status, absent on transport failure.
    pub status: Option<u16>,
    /// Transport error message, when the request failed.
    pub error: Option<String>,
    /// Elapsed time in milliseconds.
    pub elapsed_ms: u64,
}

impl HttpExchangeEvent {
    /// Creates an exchange event stamped with the current time.
    #[must_use]
    pub fn new(
        method: &str,
        path: &str,
        tier: Tier,
        status: Option<u16>,
        error: Option<String>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            event: "http_exchange",
            timestamp_ms: now_millis(),
            method: method.to_string(),
            path: path.to_string(),
            tier,
            status,
            error,
            elapsed_ms,
        }
    }
}

/// Scenario start or finish.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioEvent {
    /// Event identifier (`scenario_started` or `scenario_finished`).
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u64,
    /// Scenario name.
    pub scenario: String,
    /// Resource space the scenario belongs to.
    pub space: ResourceSpace,
    /// Outcome, present on finish.
    pub outcome: Option<Outcome>,
    /// Failure kind, present on failed or errored finish.
    pub failure_kind: Option<FailureKind>,
    /// Duration in milliseconds, present on finish.
    pub duration_ms: Option<u64>,
}

impl ScenarioEvent {
    /// Creates a `scenario_started` event.
    #[must_use]
    pub fn started(scenario: &str, space: ResourceSpace) -> Self {
        Self {
            event: "scenario_started",
            timestamp_ms: now_millis(),
            scenario: scenario.to_string(),
            space,
            outcome: None,
            failure_kind: None,
            duration_ms: None,
        }
    }

    /// Creates a `scenario_finished` event.
    #[must_use]
    pub fn finished(
        scenario: &str,
        space: ResourceSpace,
        outcome: Outcome,
        failure_kind: Option<FailureKind>,
        duration_ms: u64,
    ) -> Self {
        Self {
            event: "scenario_finished",
            timestamp_ms: now_millis(),
            scenario: scenario.to_string(),
            space,
            outcome: Some(outcome),
            failure_kind,
            duration_ms: Some(duration_ms),
        }
    }
}

/// Resource handle lifecycle event.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceEvent {
    /// Event identifier (`resource_created`, `resource_released`, `resource_leaked`).
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u64,
    /// Resource kind label.
    pub kind: String,
    /// Server-assigned identifier.
    pub id: String,
    /// Release reason (`lifecycle` or `cleanup`), present on release.
    pub reason: Option<&'static str>,
    /// Delete status, present on release when a response arrived.
    pub status: Option<u16>,
}

impl ResourceEvent {
    /// Creates a resource event stamped with the current time.
    #[must_use]
    pub fn new(
        event: &'static str,
        kind: &str,
        id: &str,
        reason: Option<&'static str>,
        status: Option<u16>,
    ) -> Self {
        Self {
            event,
            timestamp_ms: now_millis(),
            kind: kind.to_string(),
            id: id.to_string(),
            reason,
            status,
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for verifier events.
pub trait AuditSink: Send + Sync {
    /// Record an HTTP exchange.
    fn record_http(&self, event: &HttpExchangeEvent);

    /// Record a scenario start or finish.
    fn record_scenario(&self, _event: &ScenarioEvent) {}

    /// Record a resource handle event.
    fn record_resource(&self, _event: &ResourceEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record_http(&self, event: &HttpExchangeEvent) {
        write_json_line(&mut io::stderr(), event);
    }

    fn record_scenario(&self, event: &ScenarioEvent) {
        write_json_line(&mut io::stderr(), event);
    }

    fn record_resource(&self, event: &ResourceEvent) {
        write_json_line(&mut io::stderr(), event);
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Writes one event and flushes.
    fn append<T: Serialize>(&self, event: &T) {
        if let Ok(mut file) = self.file.lock() {
            write_json_line(&mut *file, event);
            let _ = file.flush();
        }
    }
}

impl AuditSink for FileAuditSink {
    fn record_http(&self, event: &HttpExchangeEvent) {
        self.append(event);
    }

    fn record_scenario(&self, event: &ScenarioEvent) {
        self.append(event);
    }

    fn record_resource(&self, event: &ResourceEvent) {
        self.append(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record_http(&self, _event: &HttpExchangeEvent) {}
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Serializes `event` and writes it as a single line, ignoring I/O failures.
fn write_json_line<W: Write, T: Serialize>(writer: &mut W, event: &T) {
    if let Ok(payload) = serde_json::to_string(event) {
        let _ = writeln!(writer, "{payload}");
    }
}

/// Milliseconds since the Unix epoch; zero if the clock is before it.
pub(crate) fn now_millis() -> u64 {
    duration_millis(SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
