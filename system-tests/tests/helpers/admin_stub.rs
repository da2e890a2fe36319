// system-tests/tests/helpers/admin_stub.rs
// ============================================================================
// Module: Admin API Stub
// Description: In-process stub of the multi-tenant admin HTTP API.
// Purpose: Give the verifier a compliant target plus switchable defects.
// Dependencies: axum, admin-verify-core, serde_json, tokio
// ============================================================================

//! ## Overview
//! The stub implements every endpoint the verifier exercises with in-memory
//! state. Bearer tokens map to tiers: [`ADMIN_TOKEN`] is admin,
//! [`USER_TOKEN`] is a non-admin user, anything else is anonymous. Admin
//! routes answer 401 to anonymous callers and 403 to users. Each [`Fault`]
//! breaks one behavior so regression suites can check that the verifier
//! notices.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::thread;

use admin_verify_core::SvixSigner;
use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::Path;
use axum::extract::Request;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::middleware;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use tokio::runtime::Builder;
use tokio::sync::oneshot;

/// Bearer token the stub treats as admin.
pub const ADMIN_TOKEN: &str = "stub-admin-token";
/// Bearer token the stub treats as a non-admin user.
pub const USER_TOKEN: &str = "stub-user-token";
/// Webhook receiver path.
pub const WEBHOOK_PATH: &str = "/api/webhooks/clerk";

// ============================================================================
// SECTION: Options
// ============================================================================

/// Deliberate defects the stub can exhibit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Non-admin users receive 200 from the usage endpoint.
    LeakUsageToUsers,
    /// Plan updates acknowledge but never apply `price`.
    DropPlanPrice,
    /// User deletes answer 200 but keep the user listed.
    KeepDeletedUsers,
    /// Settings writes answer 200 without persisting.
    IgnoreSettingsWrites,
    /// A second `user.deleted` for the same subject answers 404.
    RejectRepeatDelete,
    /// Dashboard reports `totalUsers` as a string.
    MalformedDashboard,
    /// Storage answers 500 to admins.
    BrokenStorage,
}

/// Stub configuration.
#[derive(Debug, Clone, Default)]
pub struct AdminStubOptions {
    /// Active defects.
    pub faults: Vec<Fault>,
    /// When set, webhook deliveries must carry a valid svix signature.
    pub webhook_secret: Option<String>,
}

impl AdminStubOptions {
    /// Compliant stub without webhook signing.
    pub fn compliant() -> Self {
        Self::default()
    }

    /// Stub with a single defect.
    pub fn with_fault(fault: Fault) -> Self {
        Self {
            faults: vec![fault],
            webhook_secret: None,
        }
    }
}

// ============================================================================
// SECTION: State
// ============================================================================

/// One request as seen by the stub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: String,
    /// Request path.
    pub path: String,
}

/// Mutable stub data.
struct StubData {
    /// Plans by id.
    plans: BTreeMap<String, Value>,
    /// Users by id.
    users: BTreeMap<String, Value>,
    /// Global settings object.
    settings: Value,
    /// Next numeric suffix for created ids.
    next_id: u64,
    /// Webhook subjects already deleted.
    deleted_subjects: BTreeSet<String>,
    /// Webhook event types in arrival order.
    webhook_events: Vec<String>,
    /// Every request received.
    requests: Vec<RecordedRequest>,
}

/// Shared stub state.
#[derive(Clone)]
struct AdminStub {
    /// Data behind a lock.
    data: Arc<Mutex<StubData>>,
    /// Options fixed at spawn time.
    options: Arc<AdminStubOptions>,
    /// Verifier for webhook signatures.
    signer: Option<SvixSigner>,
}

impl AdminStub {
    /// Locks the data, recovering from poisoning.
    fn data(&self) -> MutexGuard<'_, StubData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns true when `fault` is active.
    fn has(&self, fault: Fault) -> bool {
        self.options.faults.contains(&fault)
    }

    /// Allocates an id with `prefix`.
    fn allocate_id(&self, prefix: &str) -> String {
        let mut data = self.data();
        data.next_id += 1;
        format!("{prefix}_{}", data.next_id)
    }
}

/// Initial settings object.
fn initial_settings() -> Value {
    json!({
        "featureCosts": { "ai_text_chat": 1, "receipt_scan": 2 },
        "maintenanceMode": false
    })
}

// ============================================================================
// SECTION: Handle
// ============================================================================

/// Handle for the running stub; shuts the server down on drop.
pub struct AdminStubHandle {
    /// Base URL (`http://127.0.0.1:port`).
    base_url: String,
    /// Shutdown signal.
    shutdown: Option<oneshot::Sender<()>>,
    /// Server thread.
    join: Option<thread::JoinHandle<()>>,
    /// Shared state.
    stub: AdminStub,
}

impl AdminStubHandle {
    /// Returns the stub base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns every request received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.stub.data().requests.clone()
    }

    /// Counts received requests with `method` whose path starts with `prefix`.
    pub fn count(&self, method: &str, prefix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.method == method && request.path.starts_with(prefix))
            .count()
    }

    /// Number of stored plans.
    pub fn plan_count(&self) -> usize {
        self.stub.data().plans.len()
    }

    /// Number of stored users.
    pub fn user_count(&self) -> usize {
        self.stub.data().users.len()
    }

    /// Current settings object.
    pub fn settings(&self) -> Value {
        self.stub.data().settings.clone()
    }

    /// Webhook event types received, in order.
    pub fn webhook_events(&self) -> Vec<String> {
        self.stub.data().webhook_events.clone()
    }
}

impl Drop for AdminStubHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Returns the settings the stub starts with.
pub fn default_settings() -> Value {
    initial_settings()
}

/// Spawns the stub on a loopback port in its own runtime thread.
pub fn spawn_admin_stub(options: AdminStubOptions) -> Result<AdminStubHandle, String> {
    let signer = options
        .webhook_secret
        .as_deref()
        .map(SvixSigner::from_secret)
        .transpose()
        .map_err(|err| format!("admin stub webhook secret invalid: {err}"))?;
    let listener = StdTcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("admin stub bind failed: {err}"))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| format!("admin stub listener nonblocking failed: {err}"))?;
    let addr = listener.local_addr().map_err(|err| format!("admin stub local addr failed: {err}"))?;

    let stub = AdminStub {
        data: Arc::new(Mutex::new(StubData {
            plans: BTreeMap::new(),
            users: BTreeMap::new(),
            settings: initial_settings(),
            next_id: 0,
            deleted_subjects: BTreeSet::new(),
            webhook_events: Vec::new(),
            requests: Vec::new(),
        })),
        options: Arc::new(options),
        signer,
    };
    let app = router(stub.clone());
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let join = thread::spawn(move || {
        let Ok(runtime) = Builder::new_current_thread().enable_all().build() else {
            return;
        };
        runtime.block_on(async move {
            let Ok(listener) = tokio::net::TcpListener::from_std(listener) else {
                return;
            };
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = server.await;
        });
    });
    Ok(AdminStubHandle {
        base_url: format!("http://{addr}"),
        shutdown: Some(shutdown_tx),
        join: Some(join),
        stub,
    })
}

/// Builds the router for every stubbed endpoint.
fn router(stub: AdminStub) -> Router {
    Router::new()
        .route("/api/public/plans", get(public_plans))
        .route("/api/admin/dashboard", get(dashboard))
        .route("/api/admin/usage", get(usage))
        .route("/api/admin/storage", get(storage))
        .route("/api/admin/plans", get(plans_list).post(plan_create))
        .route("/api/admin/plans/refresh-pricing", post(plans_refresh_pricing))
        .route("/api/admin/plans/{id}", put(plan_update).delete(plan_delete))
        .route("/api/admin/users", get(users_list))
        .route("/api/admin/users/invite", post(user_invite))
        .route("/api/admin/users/sync", post(users_sync))
        .route("/api/admin/users/{id}", get(user_read).patch(user_update).delete(user_delete))
        .route("/api/admin/users/{id}/activate", post(user_activate))
        .route("/api/admin/settings", get(settings_read).put(settings_update))
        .route("/api/admin/clerk/plans", get(clerk_plans))
        .route(WEBHOOK_PATH, post(webhook))
        .layer(middleware::from_fn_with_state(stub.clone(), record_request))
        .with_state(stub)
}

/// Records every request before routing.
async fn record_request(State(stub): State<AdminStub>, request: Request, next: Next) -> Response {
    stub.data().requests.push(RecordedRequest {
        method: request.method().as_str().to_string(),
        path: request.uri().path().to_string(),
    });
    next.run(request).await
}

// ============================================================================
// SECTION: Authorization
// ============================================================================

/// Caller tier derived from the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Caller {
    /// No or unknown token.
    Anonymous,
    /// Non-admin user token.
    User,
    /// Admin token.
    Admin,
}

/// Resolves the caller tier from `authorization`.
fn caller(headers: &HeaderMap) -> Caller {
    let token = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    match token {
        Some(ADMIN_TOKEN) => Caller::Admin,
        Some(USER_TOKEN) => Caller::User,
        _ => Caller::Anonymous,
    }
}

/// Admin gate: 401 for anonymous, 403 for users unless `leak` is set.
fn admin_gate(headers: &HeaderMap, leak: bool) -> Option<Response> {
    match caller(headers) {
        Caller::Admin => None,
        Caller::User if leak => None,
        Caller::User => Some(text(StatusCode::FORBIDDEN, "Forbidden")),
        Caller::Anonymous => Some(text(StatusCode::UNAUTHORIZED, "Unauthorized")),
    }
}

// ============================================================================
// SECTION: Responses
// ============================================================================

/// JSON response.
fn json_response(status: StatusCode, value: Value) -> Response {
    (status, Json(value)).into_response()
}

/// Plain-text response.
fn text(status: StatusCode, message: &'static str) -> Response {
    (status, message).into_response()
}

/// Parses a JSON object body or answers 400.
fn object_body(body: &Bytes) -> Result<Map<String, Value>, Response> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(text(StatusCode::BAD_REQUEST, "Bad Request")),
    }
}

// ============================================================================
// SECTION: Public and Metrics
// ============================================================================

/// `GET /api/public/plans`.
async fn public_plans(State(stub): State<AdminStub>) -> Response {
    let mut plans = vec![json!({ "id": "plan_free", "name": "Free", "price": 0 })];
    plans.extend(
        stub.data()
            .plans
            .values()
            .filter(|plan| plan.get("active") == Some(&Value::Bool(true)))
            .cloned(),
    );
    json_response(StatusCode::OK, Value::Array(plans))
}

/// `GET /api/admin/dashboard`.
async fn dashboard(State(stub): State<AdminStub>, headers: HeaderMap) -> Response {
    if let Some(denied) = admin_gate(&headers, false) {
        return denied;
    }
    let total_users: Value = if stub.has(Fault::MalformedDashboard) {
        Value::String("many".to_string())
    } else {
        json!(stub.data().users.len() + 3)
    };
    json_response(
        StatusCode::OK,
        json!({
            "userCounts": { "totalUsers": total_users, "activeUsers": 2 },
            "financialMetrics": {
                "totalIncome": 1250.5,
                "totalExpenses": 310,
                "totalInvestments": 0,
                "totalTithes": 125.05
            },
            "recentFeedbacks": [
                { "id": "fb_1", "message": "Great app", "createdAt": "2024-05-01T10:00:00Z" }
            ]
        }),
    )
}

/// `GET /api/admin/usage`.
async fn usage(State(stub): State<AdminStub>, headers: HeaderMap) -> Response {
    if let Some(denied) = admin_gate(&headers, stub.has(Fault::LeakUsageToUsers)) {
        return denied;
    }
    json_response(StatusCode::OK, json!({ "usageStatistics": { "requests": 42, "tokens": 1800 } }))
}

/// `GET /api/admin/storage`.
async fn storage(State(stub): State<AdminStub>, headers: HeaderMap) -> Response {
    if let Some(denied) = admin_gate(&headers, false) {
        return denied;
    }
    if stub.has(Fault::BrokenStorage) {
        return text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
    }
    json_response(StatusCode::OK, json!([{ "bucket": "receipts", "objects": 12 }]))
}

// ============================================================================
// SECTION: Plans
// ============================================================================

/// `GET /api/admin/plans`, wrapped as `{"plans": [...]}`.
async fn plans_list(State(stub): State<AdminStub>, headers: HeaderMap) -> Response {
    if let Some(denied) = admin_gate(&headers, false) {
        return denied;
    }
    let plans: Vec<Value> = stub.data().plans.values().cloned().collect();
    json_response(StatusCode::OK, json!({ "plans": plans }))
}

/// `POST /api/admin/plans`.
async fn plan_create(State(stub): State<AdminStub>, headers: HeaderMap, body: Bytes) -> Response {
    if let Some(denied) = admin_gate(&headers, false) {
        return denied;
    }
    let mut plan = match object_body(&body) {
        Ok(plan) => plan,
        Err(rejected) => return rejected,
    };
    let id = stub.allocate_id("plan");
    plan.insert("id".to_string(), Value::String(id.clone()));
    let plan = Value::Object(plan);
    stub.data().plans.insert(id, plan.clone());
    json_response(StatusCode::CREATED, plan)
}

/// `POST /api/admin/plans/refresh-pricing`.
async fn plans_refresh_pricing(State(stub): State<AdminStub>, headers: HeaderMap) -> Response {
    if let Some(denied) = admin_gate(&headers, false) {
        return denied;
    }
    let updated = stub.data().plans.len();
    json_response(StatusCode::OK, json!({ "success": true, "updated": updated }))
}

/// `PUT /api/admin/plans/{id}`.
async fn plan_update(
    State(stub): State<AdminStub>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(denied) = admin_gate(&headers, false) {
        return denied;
    }
    let update = match object_body(&body) {
        Ok(update) => update,
        Err(rejected) => return rejected,
    };
    let drop_price = stub.has(Fault::DropPlanPrice);
    let mut data = stub.data();
    let Some(Value::Object(plan)) = data.plans.get_mut(&id) else {
        return text(StatusCode::NOT_FOUND, "Not Found");
    };
    for (key, value) in update {
        if key == "id" || (drop_price && key == "price") {
            continue;
        }
        plan.insert(key, value);
    }
    json_response(StatusCode::OK, json!({ "success": true }))
}

/// `DELETE /api/admin/plans/{id}`.
async fn plan_delete(
    State(stub): State<AdminStub>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Some(denied) = admin_gate(&headers, false) {
        return denied;
    }
    if stub.data().plans.remove(&id).is_none() {
        return text(StatusCode::NOT_FOUND, "Not Found");
    }
    StatusCode::NO_CONTENT.into_response()
}

// ============================================================================
// SECTION: Users
// ============================================================================

/// `GET /api/admin/users`, as a bare array.
async fn users_list(State(stub): State<AdminStub>, headers: HeaderMap) -> Response {
    if let Some(denied) = admin_gate(&headers, false) {
        return denied;
    }
    let users: Vec<Value> = stub.data().users.values().cloned().collect();
    json_response(StatusCode::OK, Value::Array(users))
}

/// `POST /api/admin/users/invite`.
async fn user_invite(State(stub): State<AdminStub>, headers: HeaderMap, body: Bytes) -> Response {
    if let Some(denied) = admin_gate(&headers, false) {
        return denied;
    }
    let invite = match object_body(&body) {
        Ok(invite) => invite,
        Err(rejected) => return rejected,
    };
    let Some(email) = invite.get("email").and_then(Value::as_str) else {
        return text(StatusCode::BAD_REQUEST, "email is required");
    };
    let id = stub.allocate_id("user");
    let user = json!({
        "id": id,
        "email": email,
        "permissionLevel": invite.get("permissionLevel").cloned().unwrap_or(Value::Null),
        "name": Value::Null,
        "active": false
    });
    stub.data().users.insert(id, user.clone());
    json_response(StatusCode::CREATED, user)
}

/// `POST /api/admin/users/sync`.
async fn users_sync(State(stub): State<AdminStub>, headers: HeaderMap) -> Response {
    if let Some(denied) = admin_gate(&headers, false) {
        return denied;
    }
    let synced = stub.data().users.len();
    json_response(StatusCode::OK, json!({ "synced": synced }))
}

/// `GET /api/admin/users/{id}`.
async fn user_read(
    State(stub): State<AdminStub>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Some(denied) = admin_gate(&headers, false) {
        return denied;
    }
    match stub.data().users.get(&id) {
        Some(user) => json_response(StatusCode::OK, user.clone()),
        None => text(StatusCode::NOT_FOUND, "Not Found"),
    }
}

/// `PATCH /api/admin/users/{id}`; echoes the updated user.
async fn user_update(
    State(stub): State<AdminStub>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(denied) = admin_gate(&headers, false) {
        return denied;
    }
    let update = match object_body(&body) {
        Ok(update) => update,
        Err(rejected) => return rejected,
    };
    let mut data = stub.data();
    let Some(Value::Object(user)) = data.users.get_mut(&id) else {
        return text(StatusCode::NOT_FOUND, "Not Found");
    };
    for (key, value) in update {
        if key != "id" {
            user.insert(key, value);
        }
    }
    json_response(StatusCode::OK, Value::Object(user.clone()))
}

/// `POST /api/admin/users/{id}/activate`.
async fn user_activate(
    State(stub): State<AdminStub>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Some(denied) = admin_gate(&headers, false) {
        return denied;
    }
    let mut data = stub.data();
    let Some(Value::Object(user)) = data.users.get_mut(&id) else {
        return text(StatusCode::NOT_FOUND, "Not Found");
    };
    user.insert("active".to_string(), Value::Bool(true));
    StatusCode::NO_CONTENT.into_response()
}

/// `DELETE /api/admin/users/{id}`.
async fn user_delete(
    State(stub): State<AdminStub>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Some(denied) = admin_gate(&headers, false) {
        return denied;
    }
    let keep = stub.has(Fault::KeepDeletedUsers);
    let mut data = stub.data();
    if !data.users.contains_key(&id) {
        return text(StatusCode::NOT_FOUND, "Not Found");
    }
    if !keep {
        data.users.remove(&id);
    }
    json_response(StatusCode::OK, json!({ "deleted": true }))
}

// ============================================================================
// SECTION: Settings and Billing
// ============================================================================

/// `GET /api/admin/settings`.
async fn settings_read(State(stub): State<AdminStub>, headers: HeaderMap) -> Response {
    if let Some(denied) = admin_gate(&headers, false) {
        return denied;
    }
    let settings = stub.data().settings.clone();
    json_response(StatusCode::OK, settings)
}

/// `PUT /api/admin/settings`; replaces and echoes the settings object.
async fn settings_update(
    State(stub): State<AdminStub>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(denied) = admin_gate(&headers, false) {
        return denied;
    }
    let settings = match object_body(&body) {
        Ok(settings) => settings,
        Err(rejected) => return rejected,
    };
    let ignore = stub.has(Fault::IgnoreSettingsWrites);
    let mut data = stub.data();
    if !ignore {
        data.settings = Value::Object(settings);
    }
    json_response(StatusCode::OK, data.settings.clone())
}

/// `GET /api/admin/clerk/plans`.
async fn clerk_plans(headers: HeaderMap) -> Response {
    if let Some(denied) = admin_gate(&headers, false) {
        return denied;
    }
    json_response(
        StatusCode::OK,
        json!([
            { "id": "cplan_basic", "name": "Basic" },
            { "id": "cplan_pro", "name": "Pro" }
        ]),
    )
}

// ============================================================================
// SECTION: Webhooks
// ============================================================================

/// `POST /api/webhooks/clerk`.
async fn webhook(State(stub): State<AdminStub>, headers: HeaderMap, body: Bytes) -> Response {
    if let Some(signer) = &stub.signer
        && !signature_valid(signer, &headers, &body)
    {
        return text(StatusCode::UNAUTHORIZED, "invalid signature");
    }
    let Ok(event) = serde_json::from_slice::<Value>(&body) else {
        return text(StatusCode::BAD_REQUEST, "Bad Request");
    };
    let kind = event.get("type").and_then(Value::as_str).unwrap_or_default().to_string();
    let subject =
        event.pointer("/data/id").and_then(Value::as_str).unwrap_or_default().to_string();
    let reject_repeat = stub.has(Fault::RejectRepeatDelete);
    let mut data = stub.data();
    data.webhook_events.push(kind.clone());
    match kind.as_str() {
        "user.created" => {
            data.deleted_subjects.remove(&subject);
            json_response(StatusCode::OK, json!({ "received": true }))
        }
        "user.updated" => StatusCode::OK.into_response(),
        "user.deleted" => {
            if !data.deleted_subjects.insert(subject) && reject_repeat {
                return text(StatusCode::NOT_FOUND, "user not found");
            }
            StatusCode::OK.into_response()
        }
        _ => text(StatusCode::BAD_REQUEST, "unsupported event"),
    }
}

/// Checks the svix headers against the body.
fn signature_valid(signer: &SvixSigner, headers: &HeaderMap, body: &[u8]) -> bool {
    let header = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());
    let (Some(id), Some(timestamp), Some(signature)) =
        (header("svix-id"), header("svix-timestamp"), header("svix-signature"))
    else {
        return false;
    };
    let Ok(timestamp) = timestamp.parse::<u64>() else {
        return false;
    };
    signer.sign(id, timestamp, body) == signature
}
