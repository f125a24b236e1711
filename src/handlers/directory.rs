// handlers/directory.rs - categories embedded in a profile
use axum::extract::{rejection::JsonRejection, Path, State};
use axum::Json;
use serde_json::{json, Value};

use super::utils::parse_id;
use crate::app::AppState;
use crate::database::models::{CategoryPatch, NewCategory};
use crate::middleware::{ApiResponse, ApiResult};

/// GET /directory/:profile_id
pub async fn get_categories(State(state): State<AppState>, Path(profile_id): Path<String>) -> ApiResult<Value> {
    let profile_id = parse_id(&profile_id, "profile")?;
    let directory = state.services.directory.get_categories(profile_id).await?;
    Ok(ApiResponse::success(json!({ "directory": directory })))
}

/// POST /directory/:profile_id
pub async fn add_category(
    State(state): State<AppState>,
    Path(profile_id): Path<String>,
    payload: Result<Json<NewCategory>, JsonRejection>,
) -> ApiResult<Value> {
    let profile_id = parse_id(&profile_id, "profile")?;
    let Json(input) = payload?;
    let directory = state.services.directory.add_category(profile_id, input).await?;
    Ok(ApiResponse::created(json!({ "directory": directory })))
}

/// PATCH /directory/:profile_id/:category_id
pub async fn edit_category(
    State(state): State<AppState>,
    Path((profile_id, category_id)): Path<(String, String)>,
    payload: Result<Json<CategoryPatch>, JsonRejection>,
) -> ApiResult<Value> {
    let profile_id = parse_id(&profile_id, "profile")?;
    let category_id = parse_id(&category_id, "category")?;
    let Json(patch) = payload?;
    let directory = state.services.directory.edit_category(profile_id, category_id, &patch).await?;
    Ok(ApiResponse::success(json!({ "directory": directory })))
}

/// DELETE /directory/:profile_id/:category_id
pub async fn delete_category(
    State(state): State<AppState>,
    Path((profile_id, category_id)): Path<(String, String)>,
) -> ApiResult<Value> {
    let profile_id = parse_id(&profile_id, "profile")?;
    let category_id = parse_id(&category_id, "category")?;
    let directory = state.services.directory.delete_category(profile_id, category_id).await?;
    Ok(ApiResponse::success(json!({ "directory": directory })))
}
