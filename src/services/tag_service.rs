use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::error::ServiceError;
use crate::database::models::tag::DEFAULT_TAG_COLOR;
use crate::database::models::{NewTag, Tag, TagPatch};
use crate::database::Datastore;

#[derive(Clone)]
pub struct TagService {
    store: Arc<dyn Datastore>,
}

impl TagService {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Tag>, ServiceError> {
        Ok(self.store.list_tags().await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Tag, ServiceError> {
        self.store
            .find_tag(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Tag"))
    }

    pub async fn add(&self, input: NewTag) -> Result<Tag, ServiceError> {
        let title = match input.title {
            Some(t) if !t.trim().is_empty() => t,
            _ => return Err(ServiceError::MissingFields(vec!["title".to_string()])),
        };
        let tag = Tag {
            id: Uuid::new_v4(),
            title,
            color: input.color.unwrap_or_else(|| DEFAULT_TAG_COLOR.to_string()),
        };
        Ok(self.store.insert_tag(&tag).await?)
    }

    pub async fn edit(&self, id: Uuid, patch: &TagPatch) -> Result<Tag, ServiceError> {
        let mut tag = self.get(id).await?;
        if patch.apply(&mut tag) == 0 {
            return Err(ServiceError::NoModifiableFields);
        }
        self.store
            .update_tag(&tag)
            .await?
            .ok_or_else(|| ServiceError::not_found("Tag"))
    }

    pub async fn delete(&self, id: Uuid) -> Result<Tag, ServiceError> {
        self.store
            .delete_tag(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Tag"))
    }

    pub async fn clear(&self) -> Result<u64, ServiceError> {
        let deleted = self.store.clear_tags().await?;
        info!(deleted, "Cleared all tags");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryDatastore;

    fn service() -> TagService {
        TagService::new(Arc::new(MemoryDatastore::new()))
    }

    #[tokio::test]
    async fn test_tag_lifecycle() {
        let tags = service();
        let tag = tags.add(NewTag { title: Some("urgent".into()), color: None }).await.unwrap();
        assert_eq!(tag.color, "#FAFAFC");

        let patch = TagPatch { title: None, color: Some("#FF0000".into()) };
        assert_eq!(tags.edit(tag.id, &patch).await.unwrap().color, "#FF0000");
        assert!(matches!(tags.edit(tag.id, &TagPatch::default()).await, Err(ServiceError::NoModifiableFields)));

        assert_eq!(tags.delete(tag.id).await.unwrap().id, tag.id);
        assert!(matches!(tags.get(tag.id).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_title_required_and_clear() {
        let tags = service();
        assert!(matches!(tags.add(NewTag::default()).await, Err(ServiceError::MissingFields(_))));

        tags.add(NewTag { title: Some("a".into()), color: None }).await.unwrap();
        tags.add(NewTag { title: Some("b".into()), color: None }).await.unwrap();
        assert_eq!(tags.clear().await.unwrap(), 2);
        assert!(tags.list().await.unwrap().is_empty());
    }
}
