// crates/admin-verify-core/src/webhook.rs
// ============================================================================
// Module: Webhook Replay Driver
// Description: Synthetic identity-provider events and acknowledgement checks.
// Purpose: Verify idempotent, side-effect-free webhook acknowledgement.
// Dependencies: base64, hmac, rand, serde_json, sha2
// ============================================================================

//! ## Overview
//! [`WebhookReplayer`] posts one synthetic event at a time to the webhook
//! endpoint and requires status 200 with an empty body or a JSON object.
//! Events for subjects the server has never seen must still be accepted.
//! When a signing secret is configured, each request carries `svix-id`,
//! `svix-timestamp`, and `svix-signature` headers.
//!
//! Security posture: the signing key is held in memory only and never logged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::Hmac;
use hmac::Mac;
use rand::Rng;
use rand::distributions::Alphanumeric;
use reqwest::Method;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use sha2::Sha256;

use crate::client::ApiRequest;
use crate::client::HttpClient;
use crate::descriptor::Credential;
use crate::error::VerifyError;
use crate::error::VerifyResult;

/// HMAC-SHA256 used for svix signatures.
type HmacSha256 = Hmac<Sha256>;

/// Prefix of svix signing secrets.
const SECRET_PREFIX: &str = "whsec_";

// ============================================================================
// SECTION: Events
// ============================================================================

/// Identity lifecycle event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookEventKind {
    /// `user.created`
    Created,
    /// `user.updated`
    Updated,
    /// `user.deleted`
    Deleted,
}

impl WebhookEventKind {
    /// Returns the wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "user.created",
            Self::Updated => "user.updated",
            Self::Deleted => "user.deleted",
        }
    }
}

/// One synthetic event; constructed per replay and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEvent {
    /// Event type.
    pub kind: WebhookEventKind,
    /// Subject identifier.
    pub subject: String,
    /// Event data; `id` is always set to the subject.
    pub payload: Map<String, Value>,
}

impl WebhookEvent {
    /// Builds a synthetic event with a plausible payload for `kind`.
    #[must_use]
    pub fn synthetic(kind: WebhookEventKind, subject: &str) -> Self {
        let payload = match kind {
            WebhookEventKind::Created => json!({
                "email_addresses": [{ "email_address": format!("{subject}+created@example.com") }],
                "first_name": "Replay",
                "last_name": "Created",
            }),
            WebhookEventKind::Updated => json!({
                "email_addresses": [{ "email_address": format!("{subject}+updated@example.com") }],
                "first_name": "Replay",
                "last_name": "Updated",
            }),
            WebhookEventKind::Deleted => json!({ "deleted": true }),
        };
        let payload = match payload {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            kind,
            subject: subject.to_string(),
            payload,
        }
    }

    /// Serializes the event envelope `{type, data}`.
    #[must_use]
    pub fn to_body(&self) -> Vec<u8> {
        let mut data = self.payload.clone();
        data.insert("id".to_string(), Value::String(self.subject.clone()));
        json!({ "type": self.kind.as_str(), "object": "event", "data": data })
            .to_string()
            .into_bytes()
    }
}

/// Accepted acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acknowledgement {
    /// Empty body.
    Empty,
    /// JSON object body.
    Object(Map<String, Value>),
}

// ============================================================================
// SECTION: Signing
// ============================================================================

/// Svix-style request signer.
#[derive(Clone)]
pub struct SvixSigner {
    /// Decoded signing key.
    key: Vec<u8>,
}

impl SvixSigner {
    /// Parses a `whsec_<base64>` secret.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Replay`] when the secret is not valid base64.
    pub fn from_secret(secret: &str) -> VerifyResult<Self> {
        let encoded = secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret);
        let key = STANDARD
            .decode(encoded.trim())
            .map_err(|err| VerifyError::Replay(format!("invalid webhook secret: {err}")))?;
        if key.is_empty() {
            return Err(VerifyError::Replay("webhook secret is empty".to_string()));
        }
        Ok(Self {
            key,
        })
    }

    /// Computes `v1,<base64 hmac>` over `"{id}.{timestamp}.{body}"`.
    #[must_use]
    pub fn sign(&self, message_id: &str, timestamp: u64, body: &[u8]) -> String {
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.key) else {
            return String::new();
        };
        mac.update(format!("{message_id}.{timestamp}.").as_bytes());
        mac.update(body);
        format!("v1,{}", STANDARD.encode(mac.finalize().into_bytes()))
    }
}

impl std::fmt::Debug for SvixSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SvixSigner").field("key", &"<redacted>").finish()
    }
}

// ============================================================================
// SECTION: Replayer
// ============================================================================

/// Posts synthetic events to the webhook endpoint.
#[derive(Clone)]
pub struct WebhookReplayer {
    /// HTTP client.
    client: HttpClient,
    /// Webhook path relative to the base URL.
    path: String,
    /// Optional signer.
    signer: Option<SvixSigner>,
}

impl WebhookReplayer {
    /// Creates a replayer for `path`.
    #[must_use]
    pub fn new(client: HttpClient, path: &str, signer: Option<SvixSigner>) -> Self {
        Self {
            client,
            path: path.to_string(),
            signer,
        }
    }

    /// Replays one event.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Replay`] for a non-200 status or an unacceptable
    /// body, and [`VerifyError::Transport`] when no response arrives.
    pub async fn replay(&self, event: &WebhookEvent) -> VerifyResult<Acknowledgement> {
        let body = event.to_body();
        let mut request = ApiRequest::new(Method::POST, self.path.clone(), Credential::anonymous());
        if let Some(signer) = &self.signer {
            let message_id = message_id();
            let timestamp =
                SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
            let signature = signer.sign(&message_id, timestamp, &body);
            request = request
                .with_header("svix-id", &message_id)
                .with_header("svix-timestamp", &timestamp.to_string())
                .with_header("svix-signature", &signature);
        }
        let request = request.with_raw_json(body);
        let response = self.client.send(&request).await?;
        let label = event.kind.as_str();
        if response.status != 200 {
            return Err(VerifyError::Replay(format!(
                "{label} for {}: expected status 200, found {}",
                event.subject, response.status
            )));
        }
        if response.is_empty_body() {
            return Ok(Acknowledgement::Empty);
        }
        match serde_json::from_slice::<Value>(&response.body) {
            Ok(Value::Object(map)) => Ok(Acknowledgement::Object(map)),
            Ok(other) => Err(VerifyError::Replay(format!(
                "{label} for {}: acknowledgement is JSON but not an object: {other}",
                event.subject
            ))),
            Err(err) => Err(VerifyError::Replay(format!(
                "{label} for {}: acknowledgement is neither empty nor JSON: {err}",
                event.subject
            ))),
        }
    }

    /// Replays created, updated, deleted, then deleted again for one subject.
    ///
    /// # Errors
    ///
    /// Returns the first failing replay.
    pub async fn replay_sequence(&self, subject: &str) -> VerifyResult<Vec<Acknowledgement>> {
        let sequence = [
            WebhookEventKind::Created,
            WebhookEventKind::Updated,
            WebhookEventKind::Deleted,
            WebhookEventKind::Deleted,
        ];
        let mut acknowledgements = Vec::with_capacity(sequence.len());
        for kind in sequence {
            acknowledgements.push(self.replay(&WebhookEvent::synthetic(kind, subject)).await?);
        }
        Ok(acknowledgements)
    }
}

/// Random `msg_` identifier for the `svix-id` header.
fn message_id() -> String {
    let suffix: String =
        rand::thread_rng().sample_iter(&Alphanumeric).take(24).map(char::from).collect();
    format!("msg_{suffix}")
}

// ============================================================================
// SECTION: Tests
// ============================================================================
