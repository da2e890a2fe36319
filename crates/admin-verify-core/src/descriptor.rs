// crates/admin-verify-core/src/descriptor.rs
// ============================================================================
// Module: Endpoint Descriptors
// Description: Declarative endpoint, tier, and credential model.
// Purpose: Let new endpoints be added as data instead of control flow.
// Dependencies: reqwest, serde
// ============================================================================

//! ## Overview
//! An [`EndpointDescriptor`] names a method, a path template, the tier the
//! endpoint requires, and the shapes of its request and response bodies.
//! Credentials are opaque bearer material supplied from outside the verifier.
//! Security posture: token material is never printed; `Debug` is redacted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use reqwest::Method;
use serde::Serialize;

use crate::error::VerifyError;
use crate::error::VerifyResult;
use crate::shape::Shape;

// ============================================================================
// SECTION: Tiers
// ============================================================================

/// Authorization level granted by a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// No credential at all.
    Anonymous,
    /// Authenticated, non-admin user.
    User,
    /// Authenticated admin.
    Admin,
}

impl Tier {
    /// All tiers, lowest privilege first.
    pub const ALL: [Self; 3] = [Self::Anonymous, Self::User, Self::Admin];

    /// Returns a stable label for the tier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Returns true when this tier satisfies `required`.
    #[must_use]
    pub fn satisfies(self, required: Self) -> bool {
        self >= required
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Credentials
// ============================================================================

/// Opaque bearer credential bound to a tier.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Tier the credential grants.
    tier: Tier,
    /// Bearer token, absent for the anonymous tier.
    token: Option<String>,
}

impl Credential {
    /// Returns the anonymous credential.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            tier: Tier::Anonymous,
            token: None,
        }
    }

    /// Creates a bearer credential for `tier`.
    #[must_use]
    pub const fn bearer(tier: Tier, token: String) -> Self {
        Self {
            tier,
            token: Some(token),
        }
    }

    /// Returns the tier this credential grants.
    #[must_use]
    pub const fn tier(&self) -> Tier {
        self.tier
    }

    /// Returns the bearer token, if any.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("tier", &self.tier)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Credentials available to a run, one per tier at most.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialSet {
    /// Non-admin user credential, when supplied.
    user: Option<Credential>,
    /// Admin credential, when supplied.
    admin: Option<Credential>,
}

impl CredentialSet {
    /// Builds a set from optional user and admin tokens.
    #[must_use]
    pub fn from_tokens(user: Option<String>, admin: Option<String>) -> Self {
        Self {
            user: user.map(|token| Credential::bearer(Tier::User, token)),
            admin: admin.map(|token| Credential::bearer(Tier::Admin, token)),
        }
    }

    /// Returns the credential for `tier`. Anonymous is always available.
    #[must_use]
    pub fn for_tier(&self, tier: Tier) -> Option<Credential> {
        match tier {
            Tier::Anonymous => Some(Credential::anonymous()),
            Tier::User => self.user.clone(),
            Tier::Admin => self.admin.clone(),
        }
    }

    /// Returns the admin credential.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::MissingCredential`] when no admin token was supplied.
    pub fn require_admin(&self) -> VerifyResult<Credential> {
        self.admin.clone().ok_or(VerifyError::MissingCredential(Tier::Admin))
    }

    /// Returns the tiers that can be exercised with this set.
    #[must_use]
    pub fn available_tiers(&self) -> Vec<Tier> {
        Tier::ALL.into_iter().filter(|tier| self.for_tier(*tier).is_some()).collect()
    }
}

// ============================================================================
// SECTION: Status Sets
// ============================================================================

/// Set of acceptable status codes for one condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSet(Vec<u16>);

impl StatusSet {
    /// Accepts exactly `status`.
    #[must_use]
    pub fn only(status: u16) -> Self {
        Self(vec![status])
    }

    /// Accepts any of `statuses`.
    #[must_use]
    pub fn any_of(statuses: &[u16]) -> Self {
        Self(statuses.to_vec())
    }

    /// Unauthorized or forbidden; both are valid denials.
    #[must_use]
    pub fn denied() -> Self {
        Self(vec![401, 403])
    }

    /// Returns true when `status` is accepted.
    #[must_use]
    pub fn contains(&self, status: u16) -> bool {
        self.0.contains(&status)
    }
}

impl fmt::Display for StatusSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<String> = self.0.iter().map(u16::to_string).collect();
        f.write_str(&labels.join("|"))
    }
}

// ============================================================================
// SECTION: Path Templates
// ============================================================================

/// Path with `{name}` placeholders, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate(String);

impl PathTemplate {
    /// Wraps a template string.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// Renders the template, percent-encoding substituted values.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::LifecycleInconsistency`] when a placeholder has
    /// no value, since the only placeholders are resource identifiers.
    pub fn render(&self, params: &[(&str, &str)]) -> VerifyResult<String> {
        let mut out = String::with_capacity(self.0.len());
        let mut rest = self.0.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[.. open]);
            let after = &rest[open + 1 ..];
            let Some(close) = after.find('}') else {
                return Err(VerifyError::LifecycleInconsistency(format!(
                    "path template {} has an unterminated placeholder",
                    self.0
                )));
            };
            let name = &after[.. close];
            let value = params
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
                .ok_or_else(|| {
                    VerifyError::LifecycleInconsistency(format!(
                        "path template {} has no value for {{{name}}}",
                        self.0
                    ))
                })?;
            out.push_str(&encode_segment(value));
            rest = &after[close + 1 ..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Percent-encodes everything outside the RFC 3986 unreserved set.
fn encode_segment(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

// ============================================================================
// SECTION: Endpoint Descriptors
// ============================================================================

/// Immutable description of one endpoint contract.
#[derive(Debug, Clone)]
pub struct EndpointDescriptor {
    /// Stable endpoint name used in reports.
    pub name: String,
    /// HTTP method.
    pub method: Method,
    /// Path template relative to the base URL.
    pub path: PathTemplate,
    /// Minimum tier the endpoint admits.
    pub tier: Tier,
    /// Expected request body shape, when the endpoint takes a body.
    pub request: Option<Shape>,
    /// Expected success response shape, when the body is checked.
    pub response: Option<Shape>,
    /// Statuses that count as success.
    pub success: StatusSet,
}

impl EndpointDescriptor {
    /// Creates a descriptor that accepts 200 and checks no bodies.
    #[must_use]
    pub fn new(name: impl Into<String>, method: Method, path: &str, tier: Tier) -> Self {
        Self {
            name: name.into(),
            method,
            path: PathTemplate::new(path),
            tier,
            request: None,
            response: None,
            success: StatusSet::only(200),
        }
    }

    /// Sets the request shape.
    #[must_use]
    pub fn with_request(mut self, shape: Shape) -> Self {
        self.request = Some(shape);
        self
    }

    /// Sets the success response shape.
    #[must_use]
    pub fn with_response(mut self, shape: Shape) -> Self {
        self.response = Some(shape);
        self
    }

    /// Sets the accepted success statuses.
    #[must_use]
    pub fn with_success(mut self, success: StatusSet) -> Self {
        self.success = success;
        self
    }

    /// Returns `METHOD template` for error context.
    #[must_use]
    pub fn context(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    /// Returns true when the endpoint changes server state.
    #[must_use]
    pub fn is_mutating(&self) -> bool {
        !matches!(self.method, Method::GET | Method::HEAD | Method::OPTIONS)
    }
}

// ============================================================================
// SECTION: Resource Spaces
// ============================================================================

/// Independent resource space; scenarios in different spaces may run concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceSpace {
    /// Public, unauthenticated reads.
    Public,
    /// Subscription plans.
    Plans,
    /// User accounts.
    Users,
    /// Global settings.
    Settings,
    /// Dashboard, usage, and storage metrics.
    Metrics,
    /// External billing provider views.
    Billing,
    /// External identity webhooks.
    Webhooks,
    /// Cross-cutting authorization probes.
    Authorization,
}

impl ResourceSpace {
    /// Returns a stable label for the space.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Plans => "plans",
            Self::Users => "users",
            Self::Settings => "settings",
            Self::Metrics => "metrics",
            Self::Billing => "billing",
            Self::Webhooks => "webhooks",
            Self::Authorization => "authorization",
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
