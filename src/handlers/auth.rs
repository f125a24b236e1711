// handlers/auth.rs - signup, login and email verification
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::header::AUTHORIZATION,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{LoginRequest, ServiceError, SignupRequest};

/// POST /auth
///
/// Body: `{email, password, handle, firstName, lastName}`. Responds 201
/// with `{user: {id, email}, message}` once the verification email is on
/// its way.
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> ApiResult<serde_json::Value> {
    let Json(request) = payload?;
    let signup = state.services.auth.signup(&request).await?;

    Ok(ApiResponse::created(json!({
        "user": { "id": signup.user.id, "email": signup.user.email },
        "message": "Signup successful; Please verify your email."
    })))
}

/// POST /auth/login
///
/// Returns the session token in the body and as `Authorization: JWT <token>`.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let session = state.services.auth.login(&request).await.map_err(|e| match e {
        ServiceError::NotFound(_) => ApiError::unauthorized("User not found"),
        other => other.into(),
    })?;

    let header = format!("JWT {}", session.token);
    Ok((
        [(AUTHORIZATION, header)],
        ApiResponse::success(json!({
            "token": session.token,
            "message": "Login successful"
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub email: Option<String>,
    pub token: Option<String>,
}

/// GET /auth/verify?email=&token=
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> ApiResult<()> {
    let (Some(email), Some(token)) = (query.email.filter(|e| !e.is_empty()), query.token.filter(|t| !t.is_empty())) else {
        return Err(ApiError::bad_request("Missing email or token query parameters"));
    };

    match state.services.auth.verify_email(&email, &token).await? {
        None => Err(ApiError::not_found("User not found")),
        Some(false) => Err(ApiError::bad_request("Invalid verification token")),
        Some(true) => Ok(ApiResponse::no_content()),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ResendRequest {
    pub email: Option<String>,
}

/// POST /auth/verify/resend
pub async fn resend_verification(
    State(state): State<AppState>,
    payload: Result<Json<ResendRequest>, JsonRejection>,
) -> ApiResult<serde_json::Value> {
    let Json(request) = payload?;
    let Some(email) = request.email.filter(|e| !e.trim().is_empty()) else {
        return Err(ApiError::missing_fields(&["email".to_string()]));
    };

    match state.services.auth.request_new_email_token(&email).await? {
        None => Err(ApiError::not_found("No unverified user with that email")),
        Some(sent) => Ok(ApiResponse::success(json!({ "sent": sent }))),
    }
}
