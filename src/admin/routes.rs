//! REST endpoints for administrators.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::AdminError;
use crate::onboarding::model::{AccountStatus, Partition};
use crate::onboarding::routes::bearer_token;

use super::approval::AccountAdmin;

/// Shared state for admin routes.
#[derive(Clone)]
pub struct AdminRouteState {
    pub admin: Arc<AccountAdmin>,
    pub token: SecretString,
}

#[derive(Deserialize)]
struct ListQuery {
    partition: Option<String>,
    /// Account status, or `none` for records without one. Defaults to `pending`.
    status: Option<String>,
}

fn error_json(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({"error": message.into()}))).into_response()
}

fn authorized(state: &AdminRouteState, headers: &HeaderMap) -> bool {
    bearer_token(headers).is_some_and(|t| t == state.token.expose_secret())
}

fn parse_partition(raw: Option<&str>) -> Result<Partition, Response> {
    raw.unwrap_or("provider")
        .parse()
        .map_err(|e: String| error_json(StatusCode::BAD_REQUEST, e))
}

fn admin_error(err: AdminError) -> Response {
    let status = match &err {
        AdminError::NotFound { .. } => StatusCode::NOT_FOUND,
        AdminError::InvalidTransition { .. } => StatusCode::CONFLICT,
        AdminError::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    error_json(status, err.to_string())
}

/// GET /api/admin/accounts?partition=provider&status=pending
async fn list_accounts(
    State(state): State<AdminRouteState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Response {
    if !authorized(&state, &headers) {
        return error_json(StatusCode::UNAUTHORIZED, "Admin token required");
    }

    let partition = match parse_partition(query.partition.as_deref()) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    let status: Option<AccountStatus> = match query.status.as_deref().unwrap_or("pending") {
        "none" => None,
        raw => match raw.parse() {
            Ok(s) => Some(s),
            Err(e) => return error_json(StatusCode::BAD_REQUEST, e),
        },
    };

    match state.admin.list(partition, status).await {
        Ok(accounts) => (StatusCode::OK, Json(serde_json::json!({ "accounts": accounts }))).into_response(),
        Err(err) => admin_error(err),
    }
}

/// POST /api/admin/accounts/{partition}/{uid}/approve
async fn approve_account(
    State(state): State<AdminRouteState>,
    headers: HeaderMap,
    Path((partition, uid)): Path<(String, String)>,
) -> Response {
    if !authorized(&state, &headers) {
        return error_json(StatusCode::UNAUTHORIZED, "Admin token required");
    }

    let partition = match parse_partition(Some(&partition)) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match state.admin.approve(partition, &uid).await {
        Ok(account) => (StatusCode::OK, Json(serde_json::json!(account))).into_response(),
        Err(err) => admin_error(err),
    }
}

/// Build the admin REST routes.
pub fn admin_routes(state: AdminRouteState) -> Router {
    Router::new()
        .route("/api/admin/accounts", get(list_accounts))
        .route("/api/admin/accounts/{partition}/{uid}/approve", post(approve_account))
        .with_state(state)
}
