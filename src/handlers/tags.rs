// handlers/tags.rs - /tags and /tags/:id
use axum::extract::{rejection::JsonRejection, Path, State};
use axum::Json;
use serde_json::{json, Value};

use super::utils::{ensure_not_production, parse_id};
use crate::app::AppState;
use crate::database::models::{NewTag, TagPatch};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Value> {
    let tags = state.services.tags.list().await?;
    Ok(ApiResponse::success(json!({ "tags": tags })))
}

pub async fn create_tag(
    State(state): State<AppState>,
    _auth: AuthUser,
    payload: Result<Json<NewTag>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(input) = payload?;
    let tag = state.services.tags.add(input).await?;
    Ok(ApiResponse::created(json!({ "tag": tag })))
}

pub async fn clear_tags(State(state): State<AppState>) -> ApiResult<Value> {
    ensure_not_production(&state.config)?;
    let deleted = state.services.tags.clear().await?;
    Ok(ApiResponse::success(json!({ "deleted": deleted })))
}

pub async fn get_tag(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let tag = state.services.tags.get(parse_id(&id, "tag")?).await?;
    Ok(ApiResponse::success(json!({ "tag": tag })))
}

pub async fn edit_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<TagPatch>, JsonRejection>,
) -> ApiResult<Value> {
    let id = parse_id(&id, "tag")?;
    let Json(patch) = payload?;
    let tag = state.services.tags.edit(id, &patch).await?;
    Ok(ApiResponse::success(json!({ "tag": tag })))
}

pub async fn delete_tag(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let tag = state.services.tags.delete(parse_id(&id, "tag")?).await?;
    Ok(ApiResponse::success(json!({ "deletedTag": tag })))
}
