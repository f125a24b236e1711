use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::error::ServiceError;
use crate::database::models::{Contact, ContactPatch, NewContact};
use crate::database::Datastore;

#[derive(Clone)]
pub struct ContactService {
    store: Arc<dyn Datastore>,
}

impl ContactService {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Contact>, ServiceError> {
        Ok(self.store.list_contacts().await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Contact, ServiceError> {
        self.store
            .find_contact(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Contact"))
    }

    pub async fn add(&self, input: NewContact) -> Result<Contact, ServiceError> {
        let name = match input.name {
            Some(n) if !n.trim().is_empty() => n,
            _ => return Err(ServiceError::MissingFields(vec!["name".to_string()])),
        };
        let now = Utc::now();
        let contact = Contact {
            id: Uuid::new_v4(),
            name,
            handle: input.handle,
            company: input.company,
            birthday: input.birthday,
            phone_number: input.phone_number,
            notes: input.notes,
            address: input.address,
            created_at: now,
            updated_at: now,
        };
        Ok(self.store.insert_contact(&contact).await?)
    }

    pub async fn edit(&self, id: Uuid, patch: &ContactPatch) -> Result<Contact, ServiceError> {
        if matches!(patch.name, Some(ref n) if n.trim().is_empty()) {
            return Err(ServiceError::validation("name cannot be blank"));
        }
        let mut contact = self.get(id).await?;
        if patch.apply(&mut contact) == 0 {
            return Err(ServiceError::NoModifiableFields);
        }
        contact.updated_at = Utc::now();
        self.store
            .update_contact(&contact)
            .await?
            .ok_or_else(|| ServiceError::not_found("Contact"))
    }

    pub async fn delete(&self, id: Uuid) -> Result<Contact, ServiceError> {
        self.store
            .delete_contact(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Contact"))
    }
}
