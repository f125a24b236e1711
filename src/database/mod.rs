pub mod item_query;
pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::filter::FilterData;
use models::{Contact, EmailVerification, Item, Profile, Tag, User};

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryDatastore;
pub use postgres::PgDatastore;

/// Persistence boundary for every collection. Constructed once at startup,
/// shared through `AppState`, and closed at shutdown.
///
/// Item inserts and deletes also maintain the owner profile's `items` set;
/// adapters perform both writes atomically.
#[async_trait]
pub trait Datastore: Send + Sync {
    async fn health_check(&self) -> Result<(), DatabaseError>;
    async fn close(&self);

    // Users
    async fn insert_user(&self, user: &User) -> Result<User, DatabaseError>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;
    /// Case-insensitive.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;
    /// Case-insensitive substring match on the handle.
    async fn find_users_by_handle(&self, fragment: &str) -> Result<Vec<User>, DatabaseError>;
    async fn update_user_verification(
        &self,
        id: Uuid,
        verification: &EmailVerification,
    ) -> Result<Option<User>, DatabaseError>;
    /// Removes every user together with their profiles and items.
    async fn clear_users(&self) -> Result<u64, DatabaseError>;

    // Profiles
    async fn insert_profile(&self, profile: &Profile) -> Result<Profile, DatabaseError>;
    async fn find_profile_by_id(&self, id: Uuid) -> Result<Option<Profile>, DatabaseError>;
    async fn find_profile_by_user(&self, user_id: Uuid) -> Result<Option<Profile>, DatabaseError>;
    /// Rewrites the whole profile document except `items`, which only the
    /// item operations change.
    async fn save_profile(&self, profile: &Profile) -> Result<Option<Profile>, DatabaseError>;

    // Items
    async fn find_items(&self, filter: &FilterData) -> Result<Vec<Item>, DatabaseError>;
    async fn find_item(&self, id: Uuid) -> Result<Option<Item>, DatabaseError>;
    /// Inserts the item and adds its id to the owner's `items` set.
    async fn insert_item(&self, item: &Item) -> Result<Item, DatabaseError>;
    async fn update_item(&self, item: &Item) -> Result<Option<Item>, DatabaseError>;
    /// Removes the item and pulls its id from the owner's `items` set.
    async fn delete_item(&self, id: Uuid) -> Result<Option<Item>, DatabaseError>;

    // Tags
    async fn list_tags(&self) -> Result<Vec<Tag>, DatabaseError>;
    async fn find_tag(&self, id: Uuid) -> Result<Option<Tag>, DatabaseError>;
    async fn insert_tag(&self, tag: &Tag) -> Result<Tag, DatabaseError>;
    async fn update_tag(&self, tag: &Tag) -> Result<Option<Tag>, DatabaseError>;
    async fn delete_tag(&self, id: Uuid) -> Result<Option<Tag>, DatabaseError>;
    async fn clear_tags(&self) -> Result<u64, DatabaseError>;

    // Contacts
    async fn list_contacts(&self) -> Result<Vec<Contact>, DatabaseError>;
    async fn find_contact(&self, id: Uuid) -> Result<Option<Contact>, DatabaseError>;
    async fn insert_contact(&self, contact: &Contact) -> Result<Contact, DatabaseError>;
    async fn update_contact(&self, contact: &Contact) -> Result<Option<Contact>, DatabaseError>;
    async fn delete_contact(&self, id: Uuid) -> Result<Option<Contact>, DatabaseError>;
}
