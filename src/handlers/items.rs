// handlers/items.rs - item listing, lookup and owner-only mutation
use axum::extract::{rejection::JsonRejection, Path, RawQuery, State};
use axum::Json;
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use super::utils::parse_id;
use crate::app::AppState;
use crate::database::models::{ItemPatch, ItemType, NewItem};
use crate::error::ApiError;
use crate::filter::ItemFilter;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, OptionalAuthUser};
use crate::services::ServiceError;

/// GET /items
///
/// Query: `itemType`, `search`, `tags`, `category`, `section`, `priority`,
/// `startgt`/`startlt`/`endgt`/`endlt` (epoch ms), `durationgt`/`durationlt`,
/// `sortBy`, `limit`, `offset`. `mine=true` limits results to the caller's
/// items and needs a session.
pub async fn list_items(
    State(state): State<AppState>,
    OptionalAuthUser(caller): OptionalAuthUser,
    RawQuery(query): RawQuery,
) -> ApiResult<Value> {
    let filter = ItemFilter::from_query(query.as_deref());
    let item_type = filter.requested_type().map_err(ServiceError::from)?;

    let owned = if filter.mine {
        let caller = caller.ok_or_else(|| ApiError::unauthorized("Sign in to list your own items"))?;
        Some(state.services.items.owned_item_set(caller.user_id).await?)
    } else {
        None
    };

    let items = state.services.items.get_items(item_type, &filter, owned.as_deref()).await?;
    Ok(ApiResponse::success(json!({ "items": items })))
}

/// GET /items/:id
pub async fn get_item(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let id = parse_id(&id, "item")?;
    let item = state
        .services
        .items
        .get_item_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;
    Ok(ApiResponse::success(json!({ "item": item })))
}

/// POST /items - `itemType` in the body picks the subtype (default `item`)
pub async fn create_item(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<NewItem>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(input) = payload?;
    let item_type = match input.item_type.as_deref() {
        None | Some("") => ItemType::Item,
        Some(raw) => raw
            .parse()
            .map_err(|bad: String| ApiError::bad_request(format!("Invalid item type: {}", bad)))?,
    };

    let item = state.services.items.add_item(auth.user_id, item_type, input).await?;
    Ok(ApiResponse::created(json!({ "item": item })))
}

/// 404 when the item is missing, 403 when the caller does not own it.
async fn ensure_owner(state: &AppState, auth: &AuthUser, item_id: Uuid) -> Result<(), ApiError> {
    match state.services.items.owns_item(auth.user_id, item_id).await? {
        None => Err(ApiError::not_found("Item not found")),
        Some(false) => {
            warn!(user_id = %auth.user_id, %item_id, "Rejected change to an item owned by someone else");
            Err(ApiError::forbidden("You do not own this item"))
        }
        Some(true) => Ok(()),
    }
}

/// PATCH /items/:id
pub async fn edit_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<ItemPatch>, JsonRejection>,
) -> ApiResult<Value> {
    let id = parse_id(&id, "item")?;
    let Json(patch) = payload?;
    ensure_owner(&state, &auth, id).await?;

    let item = state.services.items.edit_item(id, &patch).await?;
    Ok(ApiResponse::success(json!({ "item": item, "message": "Item updated" })))
}

/// DELETE /items/:id
pub async fn delete_item(State(state): State<AppState>, auth: AuthUser, Path(id): Path<String>) -> ApiResult<Value> {
    let id = parse_id(&id, "item")?;
    ensure_owner(&state, &auth, id).await?;

    let deleted = state
        .services
        .items
        .deleted_item(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;
    Ok(ApiResponse::success(json!({ "deletedItem": deleted })))
}
