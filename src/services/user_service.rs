use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::error::ServiceError;
use crate::database::models::{Profile, ProfilePatch, User};
use crate::database::Datastore;

/// User lookups and the caller's profile.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Datastore>,
}

impl UserService {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    pub async fn me(&self, user_id: Uuid) -> Result<User, ServiceError> {
        self.store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))
    }

    /// Case-insensitive substring search on handles.
    pub async fn find_by_handle(&self, fragment: &str) -> Result<Vec<User>, ServiceError> {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return Err(ServiceError::MissingFields(vec!["userHandle".to_string()]));
        }
        Ok(self.store.find_users_by_handle(fragment).await?)
    }

    /// Remove every user with their profiles and items.
    pub async fn clear_users(&self) -> Result<u64, ServiceError> {
        let deleted = self.store.clear_users().await?;
        info!(deleted, "Cleared all users");
        Ok(deleted)
    }

    pub async fn profile_for_user(&self, user_id: Uuid) -> Result<Profile, ServiceError> {
        self.store
            .find_profile_by_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Profile"))
    }

    pub async fn profile_by_id(&self, profile_id: Uuid) -> Result<Profile, ServiceError> {
        self.store
            .find_profile_by_id(profile_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Profile"))
    }

    pub async fn edit_profile(&self, user_id: Uuid, patch: &ProfilePatch) -> Result<Profile, ServiceError> {
        let mut profile = self.profile_for_user(user_id).await?;
        if patch.apply(&mut profile) == 0 {
            return Err(ServiceError::NoModifiableFields);
        }
        profile.updated_at = Utc::now();

        self.store
            .save_profile(&profile)
            .await?
            .ok_or_else(|| ServiceError::not_found("Profile"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{EmailVerification, VerificationToken};
    use crate::database::MemoryDatastore;

    async fn seed(store: &MemoryDatastore, email: &str, handle: &str) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: "x".to_string(),
            handle: handle.to_string(),
            email_verification: EmailVerification {
                is_verified: false,
                token: VerificationToken { value: String::new(), expires_at: now },
            },
            created_at: now,
            updated_at: now,
        };
        store.insert_user(&user).await.unwrap();
        store.insert_profile(&Profile::new(user.id, email, None, None, now)).await.unwrap();
        user
    }

    #[tokio::test]
    async fn test_handle_search_is_case_insensitive_substring() {
        let store = Arc::new(MemoryDatastore::new());
        seed(&store, "a@example.com", "GraceHopper").await;
        seed(&store, "b@example.com", "alan").await;
        let service = UserService::new(store);

        let found = service.find_by_handle("hop").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].handle, "GraceHopper");
        assert!(matches!(service.find_by_handle("  ").await, Err(ServiceError::MissingFields(_))));
    }

    #[tokio::test]
    async fn test_edit_profile() {
        let store = Arc::new(MemoryDatastore::new());
        let user = seed(&store, "a@example.com", "a").await;
        let service = UserService::new(store);

        let patch = ProfilePatch { display_name: Some("Grace".into()), avatar_image: None };
        let profile = service.edit_profile(user.id, &patch).await.unwrap();
        assert_eq!(profile.display_name.as_deref(), Some("Grace"));
        assert_eq!(service.profile_by_id(profile.id).await.unwrap().display_name.as_deref(), Some("Grace"));

        assert!(matches!(
            service.edit_profile(user.id, &ProfilePatch::default()).await,
            Err(ServiceError::NoModifiableFields)
        ));
    }

    #[tokio::test]
    async fn test_clear_users() {
        let store = Arc::new(MemoryDatastore::new());
        let user = seed(&store, "a@example.com", "a").await;
        let service = UserService::new(store);

        assert_eq!(service.clear_users().await.unwrap(), 1);
        assert!(matches!(service.me(user.id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(service.profile_for_user(user.id).await, Err(ServiceError::NotFound(_))));
    }
}
