use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::models::{Contact, EmailVerification, Item, Profile, Tag, User, ITEM_COLUMNS};
use super::{DatabaseError, Datastore};
use crate::filter::{Filter, FilterData, FilterMatch};

#[derive(Default)]
struct MemoryState {
    users: Vec<User>,
    profiles: Vec<Profile>,
    items: Vec<Item>,
    tags: Vec<Tag>,
    contacts: Vec<Contact>,
}

/// In-process datastore for development and tests. Collections keep
/// insertion order; every operation runs under one lock, so item dual
/// writes are atomic.
#[derive(Default)]
pub struct MemoryDatastore {
    state: RwLock<MemoryState>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn replace<T: Clone>(rows: &mut [T], matches: impl Fn(&T) -> bool, value: &T) -> Option<T> {
    let slot = rows.iter_mut().find(|row| matches(row))?;
    *slot = value.clone();
    Some(value.clone())
}

fn remove<T>(rows: &mut Vec<T>, matches: impl Fn(&T) -> bool) -> Option<T> {
    let index = rows.iter().position(matches)?;
    Some(rows.remove(index))
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn close(&self) {
        debug!("Memory datastore closed");
    }

    async fn insert_user(&self, user: &User) -> Result<User, DatabaseError> {
        let mut state = self.state.write().await;
        if state.users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(DatabaseError::Conflict("email".to_string()));
        }
        if state.users.iter().any(|u| u.handle == user.handle) {
            return Err(DatabaseError::Conflict("handle".to_string()));
        }
        state.users.push(user.clone());
        Ok(user.clone())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn find_users_by_handle(&self, fragment: &str) -> Result<Vec<User>, DatabaseError> {
        let needle = fragment.to_lowercase();
        let state = self.state.read().await;
        Ok(state
            .users
            .iter()
            .filter(|u| u.handle.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn update_user_verification(
        &self,
        id: Uuid,
        verification: &EmailVerification,
    ) -> Result<Option<User>, DatabaseError> {
        let mut state = self.state.write().await;
        Ok(state.users.iter_mut().find(|u| u.id == id).map(|user| {
            user.email_verification = verification.clone();
            user.updated_at = chrono::Utc::now();
            user.clone()
        }))
    }

    async fn clear_users(&self) -> Result<u64, DatabaseError> {
        let mut state = self.state.write().await;
        let removed = state.users.len() as u64;
        state.users.clear();
        state.profiles.clear();
        state.items.clear();
        Ok(removed)
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<Profile, DatabaseError> {
        let mut state = self.state.write().await;
        if !state.users.iter().any(|u| u.id == profile.user) {
            return Err(DatabaseError::NotFound(format!("user {}", profile.user)));
        }
        if state.profiles.iter().any(|p| p.user == profile.user) {
            return Err(DatabaseError::Conflict("profile user".to_string()));
        }
        state.profiles.push(profile.clone());
        Ok(profile.clone())
    }

    async fn find_profile_by_id(&self, id: Uuid) -> Result<Option<Profile>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state.profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn find_profile_by_user(&self, user_id: Uuid) -> Result<Option<Profile>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state.profiles.iter().find(|p| p.user == user_id).cloned())
    }

    async fn save_profile(&self, profile: &Profile) -> Result<Option<Profile>, DatabaseError> {
        let mut state = self.state.write().await;
        Ok(state.profiles.iter_mut().find(|p| p.id == profile.id).map(|stored| {
            let items = std::mem::take(&mut stored.items);
            *stored = Profile { items, ..profile.clone() };
            stored.clone()
        }))
    }

    async fn find_items(&self, filter_data: &FilterData) -> Result<Vec<Item>, DatabaseError> {
        let mut filter = Filter::new("items", ITEM_COLUMNS)?;
        filter.assign(filter_data)?;

        let items = self.state.read().await.items.clone();
        Ok(FilterMatch::apply(&filter, items, Item::filter_row)?)
    }

    async fn find_item(&self, id: Uuid) -> Result<Option<Item>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state.items.iter().find(|i| i.id == id).cloned())
    }

    async fn insert_item(&self, item: &Item) -> Result<Item, DatabaseError> {
        let mut state = self.state.write().await;
        if state.items.iter().any(|i| i.id == item.id) {
            return Err(DatabaseError::Conflict("item id".to_string()));
        }
        let owner = state
            .profiles
            .iter_mut()
            .find(|p| p.id == item.owner)
            .ok_or_else(|| DatabaseError::NotFound(format!("profile {}", item.owner)))?;
        if !owner.items.contains(&item.id) {
            owner.items.push(item.id);
        }
        state.items.push(item.clone());
        Ok(item.clone())
    }

    async fn update_item(&self, item: &Item) -> Result<Option<Item>, DatabaseError> {
        let mut state = self.state.write().await;
        Ok(replace(&mut state.items, |i| i.id == item.id, item))
    }

    async fn delete_item(&self, id: Uuid) -> Result<Option<Item>, DatabaseError> {
        let mut state = self.state.write().await;
        let Some(removed) = remove(&mut state.items, |i| i.id == id) else {
            return Ok(None);
        };
        if let Some(owner) = state.profiles.iter_mut().find(|p| p.id == removed.owner) {
            owner.items.retain(|item_id| *item_id != id);
        }
        Ok(Some(removed))
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, DatabaseError> {
        Ok(self.state.read().await.tags.clone())
    }

    async fn find_tag(&self, id: Uuid) -> Result<Option<Tag>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state.tags.iter().find(|t| t.id == id).cloned())
    }

    async fn insert_tag(&self, tag: &Tag) -> Result<Tag, DatabaseError> {
        self.state.write().await.tags.push(tag.clone());
        Ok(tag.clone())
    }

    async fn update_tag(&self, tag: &Tag) -> Result<Option<Tag>, DatabaseError> {
        let mut state = self.state.write().await;
        Ok(replace(&mut state.tags, |t| t.id == tag.id, tag))
    }

    async fn delete_tag(&self, id: Uuid) -> Result<Option<Tag>, DatabaseError> {
        let mut state = self.state.write().await;
        Ok(remove(&mut state.tags, |t| t.id == id))
    }

    async fn clear_tags(&self) -> Result<u64, DatabaseError> {
        let mut state = self.state.write().await;
        let removed = state.tags.len() as u64;
        state.tags.clear();
        Ok(removed)
    }

    async fn list_contacts(&self) -> Result<Vec<Contact>, DatabaseError> {
        Ok(self.state.read().await.contacts.clone())
    }

    async fn find_contact(&self, id: Uuid) -> Result<Option<Contact>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state.contacts.iter().find(|c| c.id == id).cloned())
    }

    async fn insert_contact(&self, contact: &Contact) -> Result<Contact, DatabaseError> {
        self.state.write().await.contacts.push(contact.clone());
        Ok(contact.clone())
    }

    async fn update_contact(&self, contact: &Contact) -> Result<Option<Contact>, DatabaseError> {
        let mut state = self.state.write().await;
        Ok(replace(&mut state.contacts, |c| c.id == contact.id, contact))
    }

    async fn delete_contact(&self, id: Uuid) -> Result<Option<Contact>, DatabaseError> {
        let mut state = self.state.write().await;
        let removed = remove(&mut state.contacts, |c| c.id == id);
        if removed.is_some() {
            for profile in state.profiles.iter_mut() {
                if profile.contact_card == Some(id) {
                    profile.contact_card = None;
                }
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{NewItem, ItemType, VerificationToken};
    use chrono::Utc;

    fn user(email: &str, handle: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            handle: handle.to_string(),
            email_verification: EmailVerification {
                is_verified: false,
                token: VerificationToken { value: "digest".to_string(), expires_at: now },
            },
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_unique_email_and_handle() {
        let store = MemoryDatastore::new();
        store.insert_user(&user("a@example.com", "ada")).await.unwrap();

        let dup_email = store.insert_user(&user("A@Example.com", "other")).await.unwrap_err();
        assert!(matches!(dup_email, DatabaseError::Conflict(ref f) if f == "email"));

        let dup_handle = store.insert_user(&user("b@example.com", "ada")).await.unwrap_err();
        assert!(matches!(dup_handle, DatabaseError::Conflict(ref f) if f == "handle"));
    }

    #[tokio::test]
    async fn test_item_insert_and_delete_maintain_owner_set() {
        let store = MemoryDatastore::new();
        let owner = store.insert_user(&user("a@example.com", "ada")).await.unwrap();
        let profile = store
            .insert_profile(&Profile::new(owner.id, &owner.email, None, None, Utc::now()))
            .await
            .unwrap();

        let fields = NewItem { title: Some("Buy milk".into()), ..Default::default() };
        let item = fields.into_item(ItemType::Item, profile.id, Utc::now()).unwrap();
        store.insert_item(&item).await.unwrap();
        let stored = store.find_profile_by_id(profile.id).await.unwrap().unwrap();
        assert_eq!(stored.items, vec![item.id]);

        // Saving the profile document never clobbers the item set
        store.save_profile(&profile).await.unwrap();
        let stored = store.find_profile_by_id(profile.id).await.unwrap().unwrap();
        assert_eq!(stored.items, vec![item.id]);

        assert_eq!(store.delete_item(item.id).await.unwrap(), Some(item.clone()));
        assert!(store.find_item(item.id).await.unwrap().is_none());
        let stored = store.find_profile_by_id(profile.id).await.unwrap().unwrap();
        assert!(stored.items.is_empty());
        assert!(store.delete_item(item.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_item_without_owner_profile_fails_cleanly() {
        let store = MemoryDatastore::new();
        let fields = NewItem { title: Some("Orphan".into()), ..Default::default() };
        let item = fields.into_item(ItemType::Item, Uuid::new_v4(), Utc::now()).unwrap();
        assert!(matches!(store.insert_item(&item).await, Err(DatabaseError::NotFound(_))));
        assert!(store.find_item(item.id).await.unwrap().is_none());
    }
}
