// crates/admin-verify-core/src/client.rs
// ============================================================================
// Module: HTTP Client Adapter
// Description: Single-attempt HTTP exchanges against the admin API.
// Purpose: Turn requests into status, headers, and raw body, or a transport error.
// Dependencies: reqwest, serde_json
// ============================================================================

//! ## Overview
//! [`HttpClient`] issues exactly one attempt per request, with a per-request
//! timeout and no retries: a flaky endpoint must surface as a failure. The
//! response body is kept raw so the schema engine can tell unparseable bodies
//! from mis-shaped ones. Every exchange is reported to the audit sink.
//!
//! Security posture: bearer tokens are attached to the request only; audit
//! events carry the tier label.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use reqwest::Client;
use reqwest::Method;
use serde_json::Value;

use crate::audit::AuditSink;
use crate::audit::HttpExchangeEvent;
use crate::descriptor::Credential;
use crate::error::VerifyError;
use crate::error::VerifyResult;
use crate::report::duration_millis;
use crate::shape::parse_json;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// SECTION: Types
// ============================================================================

/// One outgoing request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the base URL, starting with `/`.
    pub path: String,
    /// Extra headers.
    pub headers: Vec<(String, String)>,
    /// Serialized JSON body, when present.
    pub body: Option<Vec<u8>>,
    /// Credential to present.
    pub credential: Credential,
}

impl ApiRequest {
    /// Creates a body-less request.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>, credential: Credential) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
            credential,
        }
    }

    /// Attaches a JSON body.
    #[must_use]
    pub fn with_json(mut self, body: &Value) -> Self {
        self.body = Some(body.to_string().into_bytes());
        self
    }

    /// Attaches pre-serialized JSON bytes, sent exactly as given.
    #[must_use]
    pub fn with_raw_json(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Returns `METHOD path` for error context.
    #[must_use]
    pub fn context(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Response as received: status, lower-cased headers, raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// Status code.
    pub status: u16,
    /// Response headers keyed by lower-case name.
    pub headers: BTreeMap<String, String>,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Returns true for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Returns true when the body is empty or whitespace only.
    #[must_use]
    pub fn is_empty_body(&self) -> bool {
        self.body.iter().all(u8::is_ascii_whitespace)
    }

    /// Returns the declared content type, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }

    /// Parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::MalformedBody`] when the body is empty or not JSON.
    /// A declared non-JSON content type is appended to the message.
    pub fn json(&self, context: &str) -> VerifyResult<Value> {
        parse_json(context, &self.body).map_err(|err| match (err, self.content_type()) {
            (
                VerifyError::MalformedBody {
                    context,
                    message,
                },
                Some(content_type),
            ) if !content_type.contains("json") => VerifyError::MalformedBody {
                context,
                message: format!("{message} (content-type {content_type})"),
            },
            (err, _) => err,
        })
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// HTTP client bound to one base URL.
#[derive(Clone)]
pub struct HttpClient {
    /// Base URL without a trailing slash.
    base_url: String,
    /// Underlying reqwest client.
    client: Client,
    /// Per-request timeout.
    timeout: Duration,
    /// Audit sink for exchanges.
    audit: Arc<dyn AuditSink>,
}

impl HttpClient {
    /// Creates a client for `base_url` with the given timeout.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Transport`] when the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration, audit: Arc<dyn AuditSink>) -> VerifyResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|err| {
            VerifyError::Transport {
                method: "-".to_string(),
                path: base_url.to_string(),
                message: format!("failed to build http client: {err}"),
            }
        })?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout,
            audit,
        })
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the audit sink shared by this client.
    #[must_use]
    pub fn audit(&self) -> &Arc<dyn AuditSink> {
        &self.audit
    }

    /// Sends one request. Any status is a successful exchange.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Transport`] when no response arrives within the
    /// timeout or the connection fails.
    pub async fn send(&self, request: &ApiRequest) -> VerifyResult<ApiResponse> {
        let started = Instant::now();
        let result = self.exchange(request).await;
        let (status, error) = match &result {
            Ok(response) => (Some(response.status), None),
            Err(err) => (None, Some(err.to_string())),
        };
        self.audit.record_http(&HttpExchangeEvent::new(
            request.method.as_str(),
            &request.path,
            request.credential.tier(),
            status,
            error,
            duration_millis(started.elapsed()),
        ));
        result
    }

    /// Performs the exchange without auditing.
    async fn exchange(&self, request: &ApiRequest) -> VerifyResult<ApiResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder =
            self.client.request(request.method.clone(), &url).timeout(self.timeout);
        if let Some(token) = request.credential.token() {
            builder = builder.bearer_auth(token);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.header("content-type", "application/json").body(body.clone());
        }
        let transport = |err: &reqwest::Error| VerifyError::Transport {
            method: request.method.to_string(),
            path: request.path.clone(),
            message: if err.is_timeout() {
                format!("timed out after {} ms", self.timeout.as_millis())
            } else {
                err.to_string()
            },
        };
        let response = builder.send().await.map_err(|err| transport(&err))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(|err| transport(&err))?.to_vec();
        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}
