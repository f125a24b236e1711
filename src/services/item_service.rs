use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use super::error::ServiceError;
use crate::database::models::{Item, ItemPatch, ItemType, NewItem};
use crate::database::Datastore;
use crate::filter::ItemFilter;

/// Item reads and writes. Ownership is checked here; callers decide when
/// to enforce it.
#[derive(Clone)]
pub struct ItemService {
    store: Arc<dyn Datastore>,
}

impl ItemService {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    /// Items of `item_type` matching `filter`. With `owner_item_set`, only
    /// those ids are candidates; an empty set yields nothing.
    pub async fn get_items(
        &self,
        item_type: ItemType,
        filter: &ItemFilter,
        owner_item_set: Option<&[Uuid]>,
    ) -> Result<Vec<Item>, ServiceError> {
        let filter_data = filter.to_filter_data(item_type, owner_item_set)?;
        debug!(item_type = %item_type, where_clause = ?filter_data.where_clause, "Finding items");
        Ok(self.store.find_items(&filter_data).await?)
    }

    pub async fn get_item_by_id(&self, id: Uuid) -> Result<Option<Item>, ServiceError> {
        Ok(self.store.find_item(id).await?)
    }

    /// Create an item owned by the author's profile.
    pub async fn add_item(&self, author_user_id: Uuid, item_type: ItemType, input: NewItem) -> Result<Item, ServiceError> {
        let profile = self
            .store
            .find_profile_by_user(author_user_id)
            .await?
            .ok_or(ServiceError::AuthorProfileNotFound(author_user_id))?;

        let item = input.into_item(item_type, profile.id, Utc::now())?;
        let item = self.store.insert_item(&item).await?;
        info!(item_id = %item.id, item_type = %item_type, owner = %profile.id, "Item created");
        Ok(item)
    }

    /// Apply a partial update. Fails without touching the store when
    /// nothing in the patch applies to the stored subtype.
    pub async fn edit_item(&self, id: Uuid, patch: &ItemPatch) -> Result<Item, ServiceError> {
        let mut item = self
            .store
            .find_item(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Item"))?;

        if patch.apply(&mut item)? == 0 {
            return Err(ServiceError::NoModifiableFields);
        }
        item.updated_at = Utc::now();

        self.store
            .update_item(&item)
            .await?
            .ok_or_else(|| ServiceError::not_found("Item"))
    }

    /// Remove the item; returns the deleted item, `None` when absent.
    pub async fn deleted_item(&self, id: Uuid) -> Result<Option<Item>, ServiceError> {
        let deleted = self.store.delete_item(id).await?;
        if let Some(ref item) = deleted {
            info!(item_id = %item.id, owner = %item.owner, "Item deleted");
        }
        Ok(deleted)
    }

    /// `None` when the item does not exist.
    pub async fn owns_item(&self, author_user_id: Uuid, item_id: Uuid) -> Result<Option<bool>, ServiceError> {
        let Some(item) = self.store.find_item(item_id).await? else {
            return Ok(None);
        };
        let owner = self.store.find_profile_by_id(item.owner).await?;
        Ok(Some(owner.is_some_and(|profile| profile.user == author_user_id)))
    }

    /// Ids of the items owned by the author's profile.
    pub async fn owned_item_set(&self, author_user_id: Uuid) -> Result<Vec<Uuid>, ServiceError> {
        let profile = self
            .store
            .find_profile_by_user(author_user_id)
            .await?
            .ok_or(ServiceError::AuthorProfileNotFound(author_user_id))?;
        Ok(profile.items)
    }
}
