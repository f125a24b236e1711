// handlers/users.rs - caller lookup, handle search and bulk clear
use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::{json, Value};

use super::utils::ensure_not_production;
use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// GET /users/me
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Value> {
    let user = state.services.users.me(auth.user_id).await?;
    Ok(ApiResponse::success(json!({
        "user": { "id": user.id, "email": user.email, "handle": user.handle }
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleQuery {
    pub user_handle: Option<String>,
}

/// GET /users/handle?userHandle=
pub async fn find_by_handle(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<HandleQuery>,
) -> ApiResult<Value> {
    let fragment = query.user_handle.unwrap_or_default();
    let users: Vec<Value> = state
        .services
        .users
        .find_by_handle(&fragment)
        .await?
        .into_iter()
        .map(|u| json!({ "id": u.id, "handle": u.handle }))
        .collect();
    Ok(ApiResponse::success(json!({ "users": users })))
}

/// DELETE /users - removes every user, profile and item
pub async fn clear_users(State(state): State<AppState>) -> ApiResult<Value> {
    ensure_not_production(&state.config)?;
    let deleted = state.services.users.clear_users().await?;
    Ok(ApiResponse::success(json!({ "deleted": deleted })))
}
