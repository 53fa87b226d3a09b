//! REST endpoints for the onboarding flow.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::OnboardingError;
use crate::identity::{Session, SessionTable};

use super::manager::{FlowEvent, OnboardingManager, Transition};
use super::model::ProfileForm;
use super::state::OnboardingStep;

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub manager: Arc<OnboardingManager>,
    pub sessions: Arc<SessionTable>,
}

#[derive(Deserialize)]
struct SignInRequest {
    credential: String,
}

/// Extract the session token from `Authorization: Bearer <uuid>`.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

fn status_for(err: &OnboardingError) -> StatusCode {
    match err {
        OnboardingError::Auth(_) => StatusCode::UNAUTHORIZED,
        OnboardingError::DuplicateAccount { .. } => StatusCode::CONFLICT,
        OnboardingError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        OnboardingError::Submission { .. } => StatusCode::BAD_REQUEST,
        OnboardingError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn failure(err: OnboardingError) -> (StatusCode, Json<FlowEvent>) {
    (status_for(&err), Json(FlowEvent::from(&err)))
}

/// Keep the session table in step with the transition.
async fn sync_session(sessions: &SessionTable, previous: Option<Uuid>, transition: &Transition) {
    if let Some(id) = previous {
        let kept = transition.session.as_ref().is_some_and(|s| s.id == id);
        if !kept {
            sessions.remove(id).await;
        }
    }
    if let Some(session) = &transition.session {
        if Some(session.id) != previous {
            sessions.insert(session.clone()).await;
        }
    }
}

async fn lookup_session(state: &OnboardingRouteState, headers: &HeaderMap) -> Option<Session> {
    let id = bearer_token(headers).and_then(|t| Uuid::parse_str(t).ok())?;
    state.sessions.get(id).await
}

/// An unreadable request body, reported as an event on `step`.
fn malformed(step: OnboardingStep, rejection: JsonRejection) -> (StatusCode, Json<FlowEvent>) {
    let detail = rejection.body_text();
    debug!(%step, error = %detail, "Malformed onboarding request");
    (
        rejection.status(),
        Json(FlowEvent::error(step, format!("Malformed request: {detail}"))),
    )
}

fn no_session() -> (StatusCode, Json<FlowEvent>) {
    let err = OnboardingError::Submission {
        reason: "no authenticated session".to_string(),
    };
    (StatusCode::UNAUTHORIZED, Json(FlowEvent::from(&err)))
}

/// POST /api/onboarding/sign-in
///
/// Verifies the credential and returns the next step. Steps that keep the
/// user signed in carry a `session_token`.
async fn sign_in(
    State(state): State<OnboardingRouteState>,
    body: Result<Json<SignInRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return malformed(OnboardingStep::SignIn, rejection),
    };

    match state.manager.sign_in(&body.credential).await {
        Ok(transition) => {
            sync_session(&state.sessions, None, &transition).await;
            (StatusCode::OK, Json(FlowEvent::from(transition)))
        }
        Err(err) => failure(err),
    }
}

/// POST /api/onboarding/profile
///
/// Submits the profile form for the session's account. On success the
/// session ends.
async fn submit_profile(
    State(state): State<OnboardingRouteState>,
    headers: HeaderMap,
    form: Result<Json<ProfileForm>, JsonRejection>,
) -> impl IntoResponse {
    let Some(session) = lookup_session(&state, &headers).await else {
        return no_session();
    };
    let Json(form) = match form {
        Ok(form) => form,
        Err(rejection) => return malformed(OnboardingStep::ProfileForm, rejection),
    };

    match state.manager.submit_profile(&session, &form).await {
        Ok(transition) => {
            sync_session(&state.sessions, Some(session.id), &transition).await;
            (StatusCode::OK, Json(FlowEvent::from(transition)))
        }
        Err(err) => failure(err),
    }
}

/// GET /api/onboarding/session
///
/// Returns the current step and account for a live session.
async fn get_session(
    State(state): State<OnboardingRouteState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let Some(session) = lookup_session(&state, &headers).await else {
        return no_session();
    };

    match state.manager.resume(&session).await {
        Ok(transition) => {
            sync_session(&state.sessions, Some(session.id), &transition).await;
            (StatusCode::OK, Json(FlowEvent::from(transition)))
        }
        Err(err) => failure(err),
    }
}

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/api/onboarding/sign-in", post(sign_in))
        .route("/api/onboarding/profile", post(submit_profile))
        .route("/api/onboarding/session", get(get_session))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc "));
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(bearer_token(&headers).is_none());
    }

    #[test]
    fn error_status_codes() {
        assert_eq!(
            status_for(&OnboardingError::DuplicateAccount { email: "a".into() }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&OnboardingError::Validation { missing: vec!["dob"] }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&OnboardingError::Submission { reason: "x".into() }),
            StatusCode::BAD_REQUEST
        );
    }
}
