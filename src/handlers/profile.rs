// handlers/profile.rs - the caller's profile and public profile lookup
use axum::extract::{rejection::JsonRejection, Path, State};
use axum::Json;
use serde_json::{json, Value};

use super::utils::parse_id;
use crate::app::AppState;
use crate::database::models::{ProfilePatch, PublicProfile};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// GET /profile
pub async fn my_profile(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Value> {
    let profile = state.services.users.profile_for_user(auth.user_id).await?;
    Ok(ApiResponse::success(json!({ "profile": profile })))
}

/// GET /profile/:id - public fields only
pub async fn profile_by_id(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let id = parse_id(&id, "profile")?;
    let profile = PublicProfile::from(state.services.users.profile_by_id(id).await?);
    Ok(ApiResponse::success(json!({ "profile": profile })))
}

/// PATCH /profile - displayName and avatarImage
pub async fn edit_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<ProfilePatch>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(patch) = payload?;
    let profile = state.services.users.edit_profile(auth.user_id, &patch).await?;
    Ok(ApiResponse::success(json!({ "profile": profile })))
}
