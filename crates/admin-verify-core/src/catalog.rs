// crates/admin-verify-core/src/catalog.rs
// ============================================================================
// Module: Endpoint Catalog
// Description: Descriptors for the admin API surface under verification.
// Purpose: Keep endpoints as data so scenarios stay free of request plumbing.
// Dependencies: reqwest
// ============================================================================

//! ## Overview
//! One constructor per endpoint of the admin API, plus the two CRUD resource
//! surfaces (plans and users). Shapes are deliberately structural: they pin
//! the keys downstream consumers rely on and tolerate everything else.

// ============================================================================
// SECTION: Imports
// ============================================================================

use reqwest::Method;

use crate::descriptor::EndpointDescriptor;
use crate::descriptor::StatusSet;
use crate::descriptor::Tier;
use crate::lifecycle::FollowUp;
use crate::lifecycle::ResourceApi;
use crate::shape::Shape;

// ============================================================================
// SECTION: Shapes
// ============================================================================

/// Any object carrying an `id`.
fn identified() -> Shape {
    Shape::object().field("id", Shape::Any).into()
}

/// Dashboard aggregate statistics.
fn dashboard_shape() -> Shape {
    let counts = Shape::object()
        .field("totalUsers", Shape::integer_at_least(0))
        .field("activeUsers", Shape::integer_at_least(0));
    let finance = Shape::object()
        .field("totalIncome", Shape::Numeric)
        .field("totalExpenses", Shape::Numeric)
        .field("totalInvestments", Shape::Numeric)
        .field("totalTithes", Shape::Numeric);
    let feedback = Shape::object()
        .field("id", Shape::Any)
        .field("message", Shape::Any)
        .field("createdAt", Shape::Any);
    Shape::object()
        .field("userCounts", counts.into())
        .field("financialMetrics", finance.into())
        .field("recentFeedbacks", Shape::array_of(feedback.into()))
        .into()
}

/// Plan create payload.
fn plan_payload_shape() -> Shape {
    Shape::object()
        .field("name", Shape::String)
        .field("price", Shape::Numeric)
        .field("active", Shape::Boolean)
        .optional("description", Shape::String)
        .optional("currency", Shape::String)
        .optional("interval", Shape::String)
        .optional("trial_period_days", Shape::integer_at_least(0))
        .optional("features", Shape::array_of(Shape::String))
        .into()
}

// ============================================================================
// SECTION: Public
// ============================================================================

/// `GET /api/public/plans`
#[must_use]
pub fn public_plans() -> EndpointDescriptor {
    EndpointDescriptor::new("public_plans", Method::GET, "/api/public/plans", Tier::Anonymous)
        .with_response(Shape::list_or_envelope("plans", Shape::object().into()))
}

// ============================================================================
// SECTION: Metrics
// ============================================================================

/// `GET /api/admin/dashboard`
#[must_use]
pub fn dashboard() -> EndpointDescriptor {
    EndpointDescriptor::new("dashboard", Method::GET, "/api/admin/dashboard", Tier::Admin)
        .with_response(dashboard_shape())
}

/// `GET /api/admin/usage`
#[must_use]
pub fn usage() -> EndpointDescriptor {
    EndpointDescriptor::new("usage", Method::GET, "/api/admin/usage", Tier::Admin).with_response(
        Shape::object().any_of_keys(&["usageStatistics", "analytics", "metrics"]).into(),
    )
}

/// `GET /api/admin/storage`
#[must_use]
pub fn storage() -> EndpointDescriptor {
    EndpointDescriptor::new("storage", Method::GET, "/api/admin/storage", Tier::Admin)
        .with_response(Shape::OneOf(vec![Shape::array_of(Shape::Any), Shape::object().into()]))
}

// ============================================================================
// SECTION: Plans
// ============================================================================

/// `GET /api/admin/plans`
#[must_use]
pub fn plans_list() -> EndpointDescriptor {
    EndpointDescriptor::new("plans_list", Method::GET, "/api/admin/plans", Tier::Admin)
        .with_response(Shape::list_or_envelope("plans", identified()))
}

/// `POST /api/admin/plans`
#[must_use]
pub fn plan_create() -> EndpointDescriptor {
    EndpointDescriptor::new("plan_create", Method::POST, "/api/admin/plans", Tier::Admin)
        .with_request(plan_payload_shape())
        .with_response(identified())
        .with_success(StatusSet::any_of(&[200, 201]))
}

/// `PUT /api/admin/plans/{id}`
#[must_use]
pub fn plan_update() -> EndpointDescriptor {
    EndpointDescriptor::new("plan_update", Method::PUT, "/api/admin/plans/{id}", Tier::Admin)
        .with_request(plan_payload_shape())
}

/// `DELETE /api/admin/plans/{id}`
#[must_use]
pub fn plan_delete() -> EndpointDescriptor {
    EndpointDescriptor::new("plan_delete", Method::DELETE, "/api/admin/plans/{id}", Tier::Admin)
        .with_success(StatusSet::any_of(&[200, 204]))
}

/// `POST /api/admin/plans/refresh-pricing`
#[must_use]
pub fn plans_refresh_pricing() -> EndpointDescriptor {
    EndpointDescriptor::new(
        "plans_refresh_pricing",
        Method::POST,
        "/api/admin/plans/refresh-pricing",
        Tier::Admin,
    )
    .with_response(Shape::object().field("success", Shape::Equals(true.into())).into())
}

/// Plan CRUD surface; plans are re-read from the collection.
#[must_use]
pub fn plan_resource() -> ResourceApi {
    ResourceApi {
        kind: "plan".to_string(),
        list: plans_list(),
        collection_key: Some("plans".to_string()),
        create: plan_create(),
        read: None,
        update: plan_update(),
        delete: plan_delete(),
        follow_ups: Vec::new(),
    }
}

// ============================================================================
// SECTION: Users
// ============================================================================

/// `GET /api/admin/users`
#[must_use]
pub fn users_list() -> EndpointDescriptor {
    EndpointDescriptor::new("users_list", Method::GET, "/api/admin/users", Tier::Admin)
        .with_response(Shape::list_or_envelope("users", identified()))
}

/// `POST /api/admin/users/invite`
#[must_use]
pub fn user_invite() -> EndpointDescriptor {
    EndpointDescriptor::new("user_invite", Method::POST, "/api/admin/users/invite", Tier::Admin)
        .with_request(
            Shape::object()
                .field("email", Shape::String)
                .field("permissionLevel", Shape::String)
                .into(),
        )
        .with_response(identified())
        .with_success(StatusSet::any_of(&[200, 201]))
}

/// `POST /api/admin/users/sync`
#[must_use]
pub fn users_sync() -> EndpointDescriptor {
    EndpointDescriptor::new("users_sync", Method::POST, "/api/admin/users/sync", Tier::Admin)
        .with_response(Shape::object().into())
}

/// `GET /api/admin/users/{id}`
#[must_use]
pub fn user_read() -> EndpointDescriptor {
    EndpointDescriptor::new("user_read", Method::GET, "/api/admin/users/{id}", Tier::Admin)
        .with_response(identified())
}

/// `PATCH /api/admin/users/{id}`
#[must_use]
pub fn user_update() -> EndpointDescriptor {
    EndpointDescriptor::new("user_update", Method::PATCH, "/api/admin/users/{id}", Tier::Admin)
}

/// `POST /api/admin/users/{id}/activate`
#[must_use]
pub fn user_activate() -> EndpointDescriptor {
    EndpointDescriptor::new(
        "user_activate",
        Method::POST,
        "/api/admin/users/{id}/activate",
        Tier::Admin,
    )
    .with_success(StatusSet::any_of(&[200, 204]))
}

/// `DELETE /api/admin/users/{id}`
#[must_use]
pub fn user_delete() -> EndpointDescriptor {
    EndpointDescriptor::new("user_delete", Method::DELETE, "/api/admin/users/{id}", Tier::Admin)
        .with_success(StatusSet::any_of(&[200, 204]))
}

/// User surface: invite, then sync and activate before delete.
#[must_use]
pub fn user_resource() -> ResourceApi {
    ResourceApi {
        kind: "user".to_string(),
        list: users_list(),
        collection_key: Some("users".to_string()),
        create: user_invite(),
        read: Some(user_read()),
        update: user_update(),
        delete: user_delete(),
        follow_ups: vec![
            FollowUp {
                endpoint: users_sync(),
                body: None,
            },
            FollowUp {
                endpoint: user_activate(),
                body: None,
            },
        ],
    }
}

// ============================================================================
// SECTION: Settings
// ============================================================================

/// `GET /api/admin/settings`
#[must_use]
pub fn settings_read() -> EndpointDescriptor {
    EndpointDescriptor::new("settings_read", Method::GET, "/api/admin/settings", Tier::Admin)
        .with_response(Shape::object().into())
}

/// `PUT /api/admin/settings`
#[must_use]
pub fn settings_update() -> EndpointDescriptor {
    EndpointDescriptor::new("settings_update", Method::PUT, "/api/admin/settings", Tier::Admin)
        .with_response(Shape::object().into())
}

// ============================================================================
// SECTION: Billing
// ============================================================================

/// `GET /api/admin/clerk/plans`
#[must_use]
pub fn clerk_plans() -> EndpointDescriptor {
    let plan: Shape = Shape::object().field("id", Shape::Any).field("name", Shape::Any).into();
    EndpointDescriptor::new("clerk_plans", Method::GET, "/api/admin/clerk/plans", Tier::Admin)
        .with_response(Shape::OneOf(vec![
            Shape::non_empty_array_of(plan),
            Shape::object().non_empty().into(),
        ]))
}

// ============================================================================
// SECTION: Sweep
// ============================================================================

/// Every admin-only endpoint, for denial probing.
#[must_use]
pub fn admin_endpoints() -> Vec<EndpointDescriptor> {
    vec![
        dashboard(),
        plans_list(),
        plan_create(),
        plan_update(),
        plan_delete(),
        plans_refresh_pricing(),
        users_list(),
        user_invite(),
        users_sync(),
        user_read(),
        user_update(),
        user_activate(),
        user_delete(),
        settings_read(),
        settings_update(),
        usage(),
        storage(),
        clerk_plans(),
    ]
}

// ============================================================================
// SECTION: Tests
// ============================================================================
