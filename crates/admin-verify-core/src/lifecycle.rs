// crates/admin-verify-core/src/lifecycle.rs
// ============================================================================
// Module: Resource Lifecycle Orchestrator
// Description: Create, verify, update, delete sequences with guaranteed cleanup.
// Purpose: Enforce referential consistency between CRUD steps on one resource.
// Dependencies: reqwest, serde_json
// ============================================================================

//! ## Overview
//! [`run_lifecycle`] drives one resource through
//! `absent → created → verified-listed → updated → verified-updated →
//! deleted → verified-absent`, carrying the server-assigned identifier
//! between steps. A successful create yields a [`ResourceHandle`]; the only
//! way to end a handle is [`ResourceHandle::release`], which consumes it and
//! issues exactly one delete. Any failure before the delete step is terminal:
//! the handle is released with reason `cleanup` and the original failure is
//! re-raised.
//!
//! [`run_singleton_round_trip`] covers resources that cannot be created or
//! deleted: it overrides fields, verifies persistence, and restores the
//! previously observed representation.
//!
//! ## Invariants
//! - A handle that is dropped without release emits `resource_leaked`.
//! - Round-trip checks compare every field of the update payload.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Map;
use serde_json::Value;

use crate::audit::AuditSink;
use crate::audit::ResourceEvent;
use crate::client::ApiRequest;
use crate::client::ApiResponse;
use crate::client::HttpClient;
use crate::descriptor::Credential;
use crate::descriptor::EndpointDescriptor;
use crate::error::VerifyError;
use crate::error::VerifyResult;
use crate::shape::assert_body;
use crate::shape::assert_shape;
use crate::shape::json_equivalent;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Lifecycle state of one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Nothing created yet.
    Absent,
    /// Create acknowledged with an identifier.
    Created,
    /// Identifier found in the collection.
    VerifiedListed,
    /// Update acknowledged.
    Updated,
    /// Re-read matches the update payload.
    VerifiedUpdated,
    /// Delete acknowledged.
    Deleted,
    /// Identifier no longer listed.
    VerifiedAbsent,
}

impl LifecycleState {
    /// Returns a stable label for the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Created => "created",
            Self::VerifiedListed => "verified-listed",
            Self::Updated => "updated",
            Self::VerifiedUpdated => "verified-updated",
            Self::Deleted => "deleted",
            Self::VerifiedAbsent => "verified-absent",
        }
    }
}

/// Extra call made between `verified-updated` and `deleted`.
#[derive(Debug, Clone)]
pub struct FollowUp {
    /// Endpoint; its path may reference `{id}`.
    pub endpoint: EndpointDescriptor,
    /// Optional request body.
    pub body: Option<Value>,
}

/// Endpoints that make up one resource's CRUD surface.
#[derive(Debug, Clone)]
pub struct ResourceApi {
    /// Resource kind label (`plan`, `user`).
    pub kind: String,
    /// Collection read.
    pub list: EndpointDescriptor,
    /// Envelope key for wrapped collections (`{"plans": [...]}`).
    pub collection_key: Option<String>,
    /// Create; must answer with an `id`.
    pub create: EndpointDescriptor,
    /// Item read by `{id}`, when the API exposes one.
    pub read: Option<EndpointDescriptor>,
    /// Update by `{id}`.
    pub update: EndpointDescriptor,
    /// Delete by `{id}`.
    pub delete: EndpointDescriptor,
    /// Follow-up calls before delete.
    pub follow_ups: Vec<FollowUp>,
}

/// Successful lifecycle trace.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleResult {
    /// Resource kind label.
    pub kind: String,
    /// Server-assigned identifier.
    pub id: String,
    /// States visited, in order.
    pub states: Vec<LifecycleState>,
    /// Last representation observed before delete.
    pub representation: Value,
}

// ============================================================================
// SECTION: Resource Handle
// ============================================================================

/// Scoped ownership of one created resource.
///
/// # Invariants
/// - [`ResourceHandle::release`] is the only way to end the handle and it
///   issues exactly one delete.
pub struct ResourceHandle {
    /// Resource kind label.
    kind: String,
    /// Server-assigned identifier.
    id: String,
    /// Last-known representation.
    representation: Value,
    /// Delete endpoint.
    delete: EndpointDescriptor,
    /// Credential used for the delete.
    credential: Credential,
    /// Sink for handle events.
    audit: Arc<dyn AuditSink>,
    /// Set once a delete has been attempted.
    released: bool,
}

impl ResourceHandle {
    /// Takes ownership of a created resource.
    fn acquire(
        kind: &str,
        id: String,
        representation: Value,
        delete: EndpointDescriptor,
        credential: Credential,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        audit.record_resource(&ResourceEvent::new("resource_created", kind, &id, None, None));
        Self {
            kind: kind.to_string(),
            id,
            representation,
            delete,
            credential,
            audit,
            released: false,
        }
    }

    /// Identifier of the resource.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Last-known representation.
    #[must_use]
    pub const fn representation(&self) -> &Value {
        &self.representation
    }

    /// `METHOD path` of the delete this handle issues.
    fn delete_context(&self) -> String {
        self.delete.path.render(&[("id", &self.id)]).map_or_else(
            |_| self.delete.context(),
            |path| format!("{} {path}", self.delete.method),
        )
    }

    /// Issues the single delete for this resource.
    ///
    /// # Errors
    ///
    /// Returns a transport or template error when no response arrives.
    pub async fn release(
        mut self,
        client: &HttpClient,
        reason: &'static str,
    ) -> VerifyResult<ApiResponse> {
        self.released = true;
        let result = async {
            let path = self.delete.path.render(&[("id", &self.id)])?;
            let request =
                ApiRequest::new(self.delete.method.clone(), path, self.credential.clone());
            client.send(&request).await
        }
        .await;
        self.audit.record_resource(&ResourceEvent::new(
            "resource_released",
            &self.kind,
            &self.id,
            Some(reason),
            result.as_ref().ok().map(|response| response.status),
        ));
        result
    }
}

impl Drop for ResourceHandle {
    fn drop(&mut self) {
        if !self.released {
            self.audit.record_resource(&ResourceEvent::new(
                "resource_leaked",
                &self.kind,
                &self.id,
                None,
                None,
            ));
        }
    }
}

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

/// Drives one resource through its full lifecycle.
///
/// # Errors
///
/// Returns the first failing transition. When the resource was created, the
/// error is returned only after the cleanup delete was attempted.
pub async fn run_lifecycle(
    client: &HttpClient,
    credential: &Credential,
    api: &ResourceApi,
    create_payload: &Value,
    update_payload: &Value,
) -> VerifyResult<LifecycleResult> {
    let mut states = vec![LifecycleState::Absent];
    let mut handle = create(client, credential, api, create_payload).await?;
    states.push(LifecycleState::Created);

    let verified =
        verify_and_update(client, credential, api, update_payload, &mut handle, &mut states).await;
    if let Err(err) = verified {
        return Err(match release_after_failure(client, api, handle).await {
            Some(leak) => VerifyError::Leaked {
                error: Box::new(err),
                leak,
            },
            None => err,
        });
    }

    let id = handle.id().to_string();
    let representation = handle.representation().clone();
    let context = api.delete.context();
    let response = handle.release(client, "lifecycle").await?;
    if !api.delete.success.contains(response.status) {
        return Err(VerifyError::StatusMismatch {
            context,
            expected: api.delete.success.to_string(),
            found: response.status,
        });
    }
    states.push(LifecycleState::Deleted);

    if find_listed(client, credential, api, &id).await?.is_some() {
        return Err(VerifyError::LifecycleInconsistency(format!(
            "{} {id} still listed after delete",
            api.kind
        )));
    }
    states.push(LifecycleState::VerifiedAbsent);

    Ok(LifecycleResult {
        kind: api.kind.clone(),
        id,
        states,
        representation,
    })
}

/// Issues the cleanup delete after a failed transition.
///
/// Returns a description of the leak when the delete got no response or an
/// unaccepted status.
async fn release_after_failure(
    client: &HttpClient,
    api: &ResourceApi,
    handle: ResourceHandle,
) -> Option<String> {
    let context = handle.delete_context();
    let leaked = format!("{} {} leaked", api.kind, handle.id());
    match handle.release(client, "cleanup").await {
        Ok(response) if api.delete.success.contains(response.status) => None,
        Ok(response) => Some(format!("cleanup {context} returned {}; {leaked}", response.status)),
        Err(err) => Some(format!("cleanup failed: {err}; {leaked}")),
    }
}

/// `absent → created`: requires 200/201 and an identifier.
async fn create(
    client: &HttpClient,
    credential: &Credential,
    api: &ResourceApi,
    payload: &Value,
) -> VerifyResult<ResourceHandle> {
    let endpoint = &api.create;
    if let Some(shape) = &endpoint.request {
        assert_shape(&format!("{} request", endpoint.context()), payload, shape)?;
    }
    let request =
        ApiRequest::new(endpoint.method.clone(), endpoint.path.render(&[])?, credential.clone())
            .with_json(payload);
    let context = request.context();
    let response = client.send(&request).await?;
    if !endpoint.success.contains(response.status) {
        return Err(VerifyError::StatusMismatch {
            context,
            expected: endpoint.success.to_string(),
            found: response.status,
        });
    }
    let body = match &endpoint.response {
        Some(shape) => assert_body(&context, &response.body, shape)?,
        None => response.json(&context)?,
    };
    let id = extract_id(&body).ok_or_else(|| {
        VerifyError::LifecycleInconsistency(format!("{context}: create response has no id"))
    })?;
    Ok(ResourceHandle::acquire(
        &api.kind,
        id,
        body,
        api.delete.clone(),
        credential.clone(),
        Arc::clone(client.audit()),
    ))
}

/// Steps from `created` through the follow-ups, short of delete.
async fn verify_and_update(
    client: &HttpClient,
    credential: &Credential,
    api: &ResourceApi,
    update_payload: &Value,
    handle: &mut ResourceHandle,
    states: &mut Vec<LifecycleState>,
) -> VerifyResult<()> {
    let id = handle.id().to_string();
    if find_listed(client, credential, api, &id).await?.is_none() {
        return Err(VerifyError::LifecycleInconsistency(format!(
            "{} {id} missing from {} after create",
            api.kind,
            api.list.context()
        )));
    }
    states.push(LifecycleState::VerifiedListed);

    let endpoint = &api.update;
    if let Some(shape) = &endpoint.request {
        assert_shape(&format!("{} request", endpoint.context()), update_payload, shape)?;
    }
    let request = ApiRequest::new(
        endpoint.method.clone(),
        endpoint.path.render(&[("id", &id)])?,
        credential.clone(),
    )
    .with_json(update_payload);
    let context = request.context();
    let response = client.send(&request).await?;
    if !endpoint.success.contains(response.status) {
        return Err(VerifyError::StatusMismatch {
            context,
            expected: endpoint.success.to_string(),
            found: response.status,
        });
    }
    if !response.is_empty_body() {
        let acknowledged = response.json(&context)?;
        if let Some(shape) = &endpoint.response {
            assert_shape(&context, &acknowledged, shape)?;
        }
        check_present_fields(&context, update_payload, &acknowledged)?;
    }
    states.push(LifecycleState::Updated);

    let current = match &api.read {
        Some(read) => {
            let request = ApiRequest::new(
                read.method.clone(),
                read.path.render(&[("id", &id)])?,
                credential.clone(),
            );
            let context = request.context();
            let response = client.send(&request).await?;
            if !read.success.contains(response.status) {
                return Err(VerifyError::StatusMismatch {
                    context,
                    expected: read.success.to_string(),
                    found: response.status,
                });
            }
            match &read.response {
                Some(shape) => assert_body(&context, &response.body, shape)?,
                None => response.json(&context)?,
            }
        }
        None => find_listed(client, credential, api, &id).await?.ok_or_else(|| {
            VerifyError::LifecycleInconsistency(format!(
                "{} {id} missing from {} after update",
                api.kind,
                api.list.context()
            ))
        })?,
    };
    check_round_trip(&format!("{} {id}", api.kind), update_payload, &current)?;
    handle.representation = current;
    states.push(LifecycleState::VerifiedUpdated);

    for follow_up in &api.follow_ups {
        run_follow_up(client, credential, follow_up, &id).await?;
    }
    Ok(())
}

/// Sends one follow-up call and checks its status and body.
async fn run_follow_up(
    client: &HttpClient,
    credential: &Credential,
    follow_up: &FollowUp,
    id: &str,
) -> VerifyResult<()> {
    let endpoint = &follow_up.endpoint;
    let mut request = ApiRequest::new(
        endpoint.method.clone(),
        endpoint.path.render(&[("id", id)])?,
        credential.clone(),
    );
    if let Some(body) = &follow_up.body {
        request = request.with_json(body);
    }
    let context = request.context();
    let response = client.send(&request).await?;
    if !endpoint.success.contains(response.status) {
        return Err(VerifyError::StatusMismatch {
            context,
            expected: endpoint.success.to_string(),
            found: response.status,
        });
    }
    if let Some(shape) = &endpoint.response {
        assert_body(&context, &response.body, shape)?;
    }
    Ok(())
}

/// Reads the collection and returns the entry with `id`, if listed.
async fn find_listed(
    client: &HttpClient,
    credential: &Credential,
    api: &ResourceApi,
    id: &str,
) -> VerifyResult<Option<Value>> {
    let endpoint = &api.list;
    let request =
        ApiRequest::new(endpoint.method.clone(), endpoint.path.render(&[])?, credential.clone());
    let context = request.context();
    let response = client.send(&request).await?;
    if !endpoint.success.contains(response.status) {
        return Err(VerifyError::StatusMismatch {
            context,
            expected: endpoint.success.to_string(),
            found: response.status,
        });
    }
    let body = match &endpoint.response {
        Some(shape) => assert_body(&context, &response.body, shape)?,
        None => response.json(&context)?,
    };
    let entries = collection_entries(&context, &body, api.collection_key.as_deref())?;
    Ok(entries.iter().find(|entry| extract_id(entry).as_deref() == Some(id)).cloned())
}

// ============================================================================
// SECTION: Singleton Round Trip
// ============================================================================

/// Overrides fields on a singleton resource, verifies persistence, restores it.
///
/// `read` and `write` share one path. The write sends the observed
/// representation merged with `overrides`.
///
/// # Errors
///
/// Returns the first round-trip failure; when the round trip passed, a
/// failed restore is reported instead.
pub async fn run_singleton_round_trip(
    client: &HttpClient,
    credential: &Credential,
    read: &EndpointDescriptor,
    write: &EndpointDescriptor,
    overrides: impl FnOnce(&Map<String, Value>) -> Map<String, Value>,
) -> VerifyResult<Value> {
    let original = read_object(client, credential, read).await?;
    let patch = overrides(&original);
    let mut updated = original.clone();
    updated.extend(patch.clone());
    let patch = Value::Object(patch);

    let round_trip = async {
        let acknowledged = write_object(client, credential, write, &updated).await?;
        check_present_fields(&write.context(), &patch, &Value::Object(acknowledged))?;
        let persisted = Value::Object(read_object(client, credential, read).await?);
        check_round_trip(&read.context(), &patch, &persisted)?;
        Ok(persisted)
    }
    .await;

    let restored = write_object(client, credential, write, &original).await;
    match (round_trip, restored) {
        (Err(err), _) | (Ok(_), Err(err)) => Err(err),
        (Ok(persisted), Ok(_)) => Ok(persisted),
    }
}

/// Reads a singleton and requires a JSON object.
async fn read_object(
    client: &HttpClient,
    credential: &Credential,
    endpoint: &EndpointDescriptor,
) -> VerifyResult<Map<String, Value>> {
    let request =
        ApiRequest::new(endpoint.method.clone(), endpoint.path.render(&[])?, credential.clone());
    let response = client.send(&request).await?;
    expect_object(&request.context(), endpoint, &response)
}

/// Writes a singleton and requires a JSON object acknowledgement.
async fn write_object(
    client: &HttpClient,
    credential: &Credential,
    endpoint: &EndpointDescriptor,
    body: &Map<String, Value>,
) -> VerifyResult<Map<String, Value>> {
    let request =
        ApiRequest::new(endpoint.method.clone(), endpoint.path.render(&[])?, credential.clone())
            .with_json(&Value::Object(body.clone()));
    let response = client.send(&request).await?;
    expect_object(&request.context(), endpoint, &response)
}

/// Checks status and shape, then unwraps the object body.
fn expect_object(
    context: &str,
    endpoint: &EndpointDescriptor,
    response: &ApiResponse,
) -> VerifyResult<Map<String, Value>> {
    if !endpoint.success.contains(response.status) {
        return Err(VerifyError::StatusMismatch {
            context: context.to_string(),
            expected: endpoint.success.to_string(),
            found: response.status,
        });
    }
    let body = match &endpoint.response {
        Some(shape) => assert_body(context, &response.body, shape)?,
        None => response.json(context)?,
    };
    match body {
        Value::Object(map) => Ok(map),
        other => Err(VerifyError::ShapeViolation {
            context: context.to_string(),
            pointer: "/".to_string(),
            expected: "object".to_string(),
            found: other.to_string(),
        }),
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the `id` field as a string; numeric ids are rendered in decimal.
#[must_use]
pub fn extract_id(value: &Value) -> Option<String> {
    match value.get("id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Returns the entries of a bare array or of an array wrapped under `key`.
///
/// # Errors
///
/// Returns [`VerifyError::ShapeViolation`] when neither form is present.
pub fn collection_entries<'a>(
    context: &str,
    body: &'a Value,
    key: Option<&str>,
) -> VerifyResult<&'a Vec<Value>> {
    if let Value::Array(items) = body {
        return Ok(items);
    }
    if let Some(Value::Array(items)) = key.and_then(|key| body.get(key)) {
        return Ok(items);
    }
    Err(VerifyError::ShapeViolation {
        context: context.to_string(),
        pointer: key.map_or_else(|| "/".to_string(), |key| format!("/{key}")),
        expected: "array".to_string(),
        found: "no collection".to_string(),
    })
}

/// Requires every field of `expected` to equal the field in `actual`.
fn check_round_trip(context: &str, expected: &Value, actual: &Value) -> VerifyResult<()> {
    let Some(fields) = expected.as_object() else {
        return Ok(());
    };
    for (key, value) in fields {
        match actual.get(key) {
            Some(found) if json_equivalent(value, found) => {}
            Some(found) => {
                return Err(VerifyError::LifecycleInconsistency(format!(
                    "{context}: field {key} expected {value}, found {found}"
                )));
            }
            None => {
                return Err(VerifyError::LifecycleInconsistency(format!(
                    "{context}: field {key} missing after update"
                )));
            }
        }
    }
    Ok(())
}

/// Like [`check_round_trip`] but only for fields that `actual` echoes back.
fn check_present_fields(context: &str, expected: &Value, actual: &Value) -> VerifyResult<()> {
    let (Some(fields), Some(echoed)) = (expected.as_object(), actual.as_object()) else {
        return Ok(());
    };
    for (key, value) in fields {
        if let Some(found) = echoed.get(key)
            && !json_equivalent(value, found)
        {
            return Err(VerifyError::LifecycleInconsistency(format!(
                "{context}: acknowledged {key} = {found}, sent {value}"
            )));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
