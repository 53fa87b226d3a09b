//! HTTP application assembly.

use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use crate::admin::{AdminRouteState, admin_routes};
use crate::onboarding::{OnboardingRouteState, onboarding_routes};

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Merge every route group into one router.
pub fn app_router(onboarding: OnboardingRouteState, admin: AdminRouteState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(onboarding_routes(onboarding))
        .merge(admin_routes(admin))
        .layer(CorsLayer::permissive())
}
