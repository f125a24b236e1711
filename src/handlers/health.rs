// handlers/health.rs - GET / and GET /health
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::ApiResponse;

pub async fn root(State(state): State<AppState>) -> impl IntoResponse {
    ApiResponse::success(json!({
        "name": "Organizer API",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "endpoints": {
            "auth": "/auth, /auth/login, /auth/verify, /auth/verify/resend",
            "users": "/users/me, /users/handle",
            "profile": "/profile[/:id]",
            "items": "/items[/:id]",
            "tags": "/tags[/:id]",
            "contacts": "/contacts[/:id]",
            "directory": "/directory/:profile_id[/:category_id]"
        }
    }))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": true,
                    "message": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "status": "degraded",
                    "timestamp": now
                })),
            )
        }
    }
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
