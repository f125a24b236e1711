// handlers/contacts.rs - /contacts and /contacts/:id
use axum::extract::{rejection::JsonRejection, Path, State};
use axum::Json;
use serde_json::{json, Value};

use super::utils::parse_id;
use crate::app::AppState;
use crate::database::models::{ContactPatch, NewContact};
use crate::middleware::{ApiResponse, ApiResult};

pub async fn list_contacts(State(state): State<AppState>) -> ApiResult<Value> {
    let contacts = state.services.contacts.list().await?;
    Ok(ApiResponse::success(json!({ "contacts": contacts })))
}

pub async fn create_contact(
    State(state): State<AppState>,
    payload: Result<Json<NewContact>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(input) = payload?;
    let contact = state.services.contacts.add(input).await?;
    Ok(ApiResponse::created(json!({ "contact": contact })))
}

pub async fn get_contact(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let contact = state.services.contacts.get(parse_id(&id, "contact")?).await?;
    Ok(ApiResponse::success(json!({ "contact": contact })))
}

pub async fn edit_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ContactPatch>, JsonRejection>,
) -> ApiResult<Value> {
    let id = parse_id(&id, "contact")?;
    let Json(patch) = payload?;
    let contact = state.services.contacts.edit(id, &patch).await?;
    Ok(ApiResponse::success(json!({ "contact": contact })))
}

pub async fn delete_contact(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let contact = state.services.contacts.delete(parse_id(&id, "contact")?).await?;
    Ok(ApiResponse::success(json!({ "deletedContact": contact })))
}
