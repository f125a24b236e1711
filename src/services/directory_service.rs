use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::error::ServiceError;
use crate::database::models::profile::DEFAULT_CATEGORY_COLOR;
use crate::database::models::{Category, CategoryPatch, NewCategory, Profile, Section};
use crate::database::Datastore;

/// Categories embedded in a profile. Each change loads the profile,
/// edits the list and saves the whole document back.
#[derive(Clone)]
pub struct DirectoryService {
    store: Arc<dyn Datastore>,
}

impl DirectoryService {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    async fn load(&self, profile_id: Uuid) -> Result<Profile, ServiceError> {
        self.store
            .find_profile_by_id(profile_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Profile"))
    }

    async fn save(&self, mut profile: Profile) -> Result<Vec<Category>, ServiceError> {
        profile.updated_at = Utc::now();
        let saved = self
            .store
            .save_profile(&profile)
            .await?
            .ok_or_else(|| ServiceError::not_found("Profile"))?;
        Ok(saved.directory)
    }

    fn ensure_unique_title(directory: &[Category], title: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
        let taken = directory
            .iter()
            .filter(|c| Some(c.id) != except)
            .any(|c| c.title.eq_ignore_ascii_case(title));
        if taken {
            return Err(ServiceError::Conflict(format!("Category title '{}'", title)));
        }
        Ok(())
    }

    pub async fn get_categories(&self, profile_id: Uuid) -> Result<Vec<Category>, ServiceError> {
        Ok(self.load(profile_id).await?.directory)
    }

    pub async fn add_category(&self, profile_id: Uuid, input: NewCategory) -> Result<Vec<Category>, ServiceError> {
        let title = match input.title {
            Some(ref t) if !t.trim().is_empty() => t.trim().to_string(),
            _ => return Err(ServiceError::MissingFields(vec!["title".to_string()])),
        };

        let mut profile = self.load(profile_id).await?;
        Self::ensure_unique_title(&profile.directory, &title, None)?;

        let category = Category {
            id: Uuid::new_v4(),
            title,
            color: input.color.unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string()),
            sections: input.sections.unwrap_or_default().into_iter().map(Section::from).collect(),
        };
        info!(profile_id = %profile_id, category_id = %category.id, "Category added");
        profile.directory.push(category);
        self.save(profile).await
    }

    pub async fn edit_category(
        &self,
        profile_id: Uuid,
        category_id: Uuid,
        patch: &CategoryPatch,
    ) -> Result<Vec<Category>, ServiceError> {
        if matches!(patch.title, Some(ref t) if t.trim().is_empty()) {
            return Err(ServiceError::validation("title cannot be blank"));
        }

        let mut profile = self.load(profile_id).await?;
        let index = profile
            .directory
            .iter()
            .position(|c| c.id == category_id)
            .ok_or_else(|| ServiceError::not_found("Category"))?;
        if let Some(ref title) = patch.title {
            Self::ensure_unique_title(&profile.directory, title.trim(), Some(category_id))?;
        }

        if patch.apply(&mut profile.directory[index]) == 0 {
            return Err(ServiceError::NoModifiableFields);
        }
        self.save(profile).await
    }

    pub async fn delete_category(&self, profile_id: Uuid, category_id: Uuid) -> Result<Vec<Category>, ServiceError> {
        let mut profile = self.load(profile_id).await?;
        let before = profile.directory.len();
        profile.directory.retain(|c| c.id != category_id);
        if profile.directory.len() == before {
            return Err(ServiceError::not_found("Category"));
        }
        info!(profile_id = %profile_id, category_id = %category_id, "Category deleted");
        self.save(profile).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::database::models::{EmailVerification, User, VerificationToken};
    use crate::database::MemoryDatastore;

    async fn setup() -> (DirectoryService, Uuid) {
        let store = Arc::new(MemoryDatastore::new());
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: "d@example.com".to_string(),
            password_hash: "x".to_string(),
            handle: "d".to_string(),
            email_verification: EmailVerification {
                is_verified: true,
                token: VerificationToken { value: String::new(), expires_at: now },
            },
            created_at: now,
            updated_at: now,
        };
        store.insert_user(&user).await.unwrap();
        let profile = Profile::new(user.id, &user.email, None, None, now);
        store.insert_profile(&profile).await.unwrap();
        (DirectoryService::new(store), profile.id)
    }

    #[tokio::test]
    async fn test_add_category_and_reject_duplicate_titles() {
        let (service, profile_id) = setup().await;
        let input: NewCategory = serde_json::from_value(json!({
            "title": "Work",
            "sections": [{ "title": "Inbox" }]
        }))
        .unwrap();
        let directory = service.add_category(profile_id, input).await.unwrap();

        let work = directory.last().unwrap();
        assert_eq!(work.title, "Work");
        assert_eq!(work.color, "#E0E0E0");
        assert_eq!(work.sections[0].view, "list");

        let dup: NewCategory = serde_json::from_value(json!({ "title": "backlog" })).unwrap();
        assert!(matches!(service.add_category(profile_id, dup).await, Err(ServiceError::Conflict(_))));

        let untitled = NewCategory::default();
        assert!(matches!(service.add_category(profile_id, untitled).await, Err(ServiceError::MissingFields(_))));
    }

    #[tokio::test]
    async fn test_edit_and_delete_category() {
        let (service, profile_id) = setup().await;
        let backlog = service.get_categories(profile_id).await.unwrap()[0].id;

        let patch: CategoryPatch = serde_json::from_value(json!({ "color": "#000000" })).unwrap();
        let directory = service.edit_category(profile_id, backlog, &patch).await.unwrap();
        assert_eq!(directory[0].color, "#000000");

        let keep_title: CategoryPatch = serde_json::from_value(json!({ "title": "BACKLOG" })).unwrap();
        assert!(service.edit_category(profile_id, backlog, &keep_title).await.is_ok());

        assert!(matches!(
            service.edit_category(profile_id, backlog, &CategoryPatch::default()).await,
            Err(ServiceError::NoModifiableFields)
        ));

        let directory = service.delete_category(profile_id, backlog).await.unwrap();
        assert_eq!(directory.len(), 2);
        assert!(matches!(service.delete_category(profile_id, backlog).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(service.get_categories(Uuid::new_v4()).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_edit_category_trims_title_and_reports_missing_first() {
        let (service, profile_id) = setup().await;
        let journal = service.get_categories(profile_id).await.unwrap()[2].id;

        let padded: CategoryPatch = serde_json::from_value(json!({ "title": "  Diary  " })).unwrap();
        let directory = service.edit_category(profile_id, journal, &padded).await.unwrap();
        assert_eq!(directory[2].title, "Diary");

        let clash: CategoryPatch = serde_json::from_value(json!({ "title": " backlog " })).unwrap();
        assert!(matches!(service.edit_category(profile_id, journal, &clash).await, Err(ServiceError::Conflict(_))));

        let missing = service.edit_category(profile_id, Uuid::new_v4(), &clash).await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));
    }
}
