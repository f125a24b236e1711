use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use tracing::error;
use uuid::Uuid;

use super::item_query::ItemQuery;
use super::manager::DatabaseManager;
use super::models::{
    Address, Category, Contact, EmailInfo, EmailVerification, Favicon, Item, ItemBase, ItemKind, Priority, Profile,
    Repeat, Tag, User, VerificationToken,
};
use super::{DatabaseError, Datastore};
use crate::filter::FilterData;

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    handle: String,
    email_verified: bool,
    token_hash: String,
    token_expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            handle: row.handle,
            email_verification: EmailVerification {
                is_verified: row.email_verified,
                token: VerificationToken { value: row.token_hash, expires_at: row.token_expires_at },
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct ProfileRow {
    id: Uuid,
    user_id: Uuid,
    display_name: Option<String>,
    avatar_image: Option<String>,
    email: String,
    email_verified: bool,
    items: Vec<Uuid>,
    directory: Json<Vec<Category>>,
    contact_card: Option<Uuid>,
    contacts: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Profile {
            id: row.id,
            user: row.user_id,
            display_name: row.display_name,
            avatar_image: row.avatar_image,
            email_info: EmailInfo { is_verified: row.email_verified, email: row.email },
            items: row.items,
            directory: row.directory.0,
            contact_card: row.contact_card,
            contacts: row.contacts,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct ItemRow {
    id: Uuid,
    owner: Uuid,
    item_type: String,
    title: String,
    category: String,
    section: String,
    icon: String,
    favicon: Option<Json<Favicon>>,
    tags: Vec<String>,
    description: Option<String>,
    notes: Option<String>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    duration: Option<f64>,
    repeat: Option<String>,
    priority: Option<String>,
    data: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ItemRow> for Item {
    type Error = DatabaseError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str| DatabaseError::QueryError(format!("corrupt item {}: {}", row.id, what));
        let kind: ItemKind = serde_json::from_value(row.data.clone()).map_err(|e| corrupt(&e.to_string()))?;
        if kind.item_type().as_str() != row.item_type {
            return Err(corrupt("item_type does not match data"));
        }
        let repeat: Result<Option<Repeat>, _> =
            row.repeat.as_ref().map(|r| serde_json::from_value(Value::String(r.clone()))).transpose();
        let priority: Result<Option<Priority>, _> =
            row.priority.as_ref().map(|p| serde_json::from_value(Value::String(p.clone()))).transpose();

        Ok(Item {
            id: row.id,
            owner: row.owner,
            base: ItemBase {
                title: row.title,
                category: row.category,
                section: row.section,
                icon: row.icon,
                favicon: row.favicon.map(|f| f.0),
                tags: row.tags,
                description: row.description,
                notes: row.notes,
                start_date: row.start_date,
                end_date: row.end_date,
                duration: row.duration,
                repeat: repeat.map_err(|e| corrupt(&e.to_string()))?,
                priority: priority.map_err(|e| corrupt(&e.to_string()))?,
            },
            kind,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ContactRow {
    id: Uuid,
    name: String,
    handle: Option<String>,
    company: Option<String>,
    birthday: Option<DateTime<Utc>>,
    phone_number: Option<String>,
    notes: Option<String>,
    address: Option<Json<Address>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ContactRow> for Contact {
    fn from(row: ContactRow) -> Self {
        Contact {
            id: row.id,
            name: row.name,
            handle: row.handle,
            company: row.company,
            birthday: row.birthday,
            phone_number: row.phone_number,
            notes: row.notes,
            address: row.address.map(|a| a.0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct TagRow {
    id: Uuid,
    title: String,
    color: String,
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Tag { id: row.id, title: row.title, color: row.color }
    }
}

/// Enum columns hold the same SCREAMING_CASE text the JSON API uses.
fn enum_text<T: serde::Serialize>(value: &Option<T>) -> Option<String> {
    value
        .as_ref()
        .and_then(|v| serde_json::to_value(v).ok())
        .and_then(|v| v.as_str().map(str::to_string))
}

fn item_data(item: &Item) -> Result<Value, DatabaseError> {
    serde_json::to_value(&item.kind).map_err(|e| DatabaseError::QueryError(e.to_string()))
}

const ITEM_INSERT: &str = r#"INSERT INTO items (
        id, owner, item_type, title, category, section, icon, favicon, tags, description, notes,
        start_date, end_date, duration, repeat, priority, data, created_at, updated_at
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
    RETURNING *"#;

const ITEM_UPDATE: &str = r#"UPDATE items SET
        item_type = $2, title = $3, category = $4, section = $5, icon = $6, favicon = $7, tags = $8,
        description = $9, notes = $10, start_date = $11, end_date = $12, duration = $13, repeat = $14,
        priority = $15, data = $16, updated_at = $17
    WHERE id = $1
    RETURNING *"#;

/// Postgres datastore over a `DatabaseManager` pool.
pub struct PgDatastore {
    db: DatabaseManager,
}

impl PgDatastore {
    pub fn new(db: DatabaseManager) -> Self {
        Self { db }
    }

    pub async fn ensure_schema(&self) -> Result<(), DatabaseError> {
        self.db.ensure_schema().await
    }
}

#[async_trait]
impl Datastore for PgDatastore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        self.db.health_check().await
    }

    async fn close(&self) {
        self.db.close().await
    }

    async fn insert_user(&self, user: &User) -> Result<User, DatabaseError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"INSERT INTO users (id, email, password_hash, handle, email_verified, token_hash, token_expires_at, created_at, updated_at)
               VALUES ($1, lower($2), $3, $4, $5, $6, $7, $8, $9)
               RETURNING *"#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.handle)
        .bind(user.email_verification.is_verified)
        .bind(&user.email_verification.token.value)
        .bind(user.email_verification.token.expires_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(self.db.pool())
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(row.into())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.map(User::from))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE lower(email) = lower($1)")
            .bind(email)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.map(User::from))
    }

    async fn find_users_by_handle(&self, fragment: &str) -> Result<Vec<User>, DatabaseError> {
        let escaped = fragment.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
        let rows = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE handle ILIKE $1 ORDER BY created_at")
            .bind(format!("%{}%", escaped))
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn update_user_verification(
        &self,
        id: Uuid,
        verification: &EmailVerification,
    ) -> Result<Option<User>, DatabaseError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"UPDATE users SET email_verified = $2, token_hash = $3, token_expires_at = $4, updated_at = now()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(verification.is_verified)
        .bind(&verification.token.value)
        .bind(verification.token.expires_at)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.map(User::from))
    }

    async fn clear_users(&self) -> Result<u64, DatabaseError> {
        // Profiles and their items cascade
        let result = sqlx::query("DELETE FROM users").execute(self.db.pool()).await?;
        Ok(result.rows_affected())
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<Profile, DatabaseError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"INSERT INTO profiles (id, user_id, display_name, avatar_image, email, email_verified, items, directory, contact_card, contacts, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
               RETURNING *"#,
        )
        .bind(profile.id)
        .bind(profile.user)
        .bind(&profile.display_name)
        .bind(&profile.avatar_image)
        .bind(&profile.email_info.email)
        .bind(profile.email_info.is_verified)
        .bind(&profile.items)
        .bind(Json(&profile.directory))
        .bind(profile.contact_card)
        .bind(&profile.contacts)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .fetch_one(self.db.pool())
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(row.into())
    }

    async fn find_profile_by_id(&self, id: Uuid) -> Result<Option<Profile>, DatabaseError> {
        let row = sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.map(Profile::from))
    }

    async fn find_profile_by_user(&self, user_id: Uuid) -> Result<Option<Profile>, DatabaseError> {
        let row = sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.map(Profile::from))
    }

    async fn save_profile(&self, profile: &Profile) -> Result<Option<Profile>, DatabaseError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"UPDATE profiles SET display_name = $2, avatar_image = $3, email = $4, email_verified = $5,
                   directory = $6, contact_card = $7, contacts = $8, updated_at = $9
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(profile.id)
        .bind(&profile.display_name)
        .bind(&profile.avatar_image)
        .bind(&profile.email_info.email)
        .bind(profile.email_info.is_verified)
        .bind(Json(&profile.directory))
        .bind(profile.contact_card)
        .bind(&profile.contacts)
        .bind(profile.updated_at)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.map(Profile::from))
    }

    async fn find_items(&self, filter: &FilterData) -> Result<Vec<Item>, DatabaseError> {
        let rows: Vec<ItemRow> = ItemQuery::compile(filter)?.fetch(self.db.pool()).await?;
        rows.into_iter().map(Item::try_from).collect()
    }

    async fn find_item(&self, id: Uuid) -> Result<Option<Item>, DatabaseError> {
        let row = sqlx::query_as::<_, ItemRow>("SELECT * FROM items WHERE id = $1")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        row.map(Item::try_from).transpose()
    }

    async fn insert_item(&self, item: &Item) -> Result<Item, DatabaseError> {
        let data = item_data(item)?;
        let mut tx = self.db.pool().begin().await?;

        let row = sqlx::query_as::<_, ItemRow>(ITEM_INSERT)
            .bind(item.id)
            .bind(item.owner)
            .bind(item.item_type().as_str())
            .bind(&item.base.title)
            .bind(&item.base.category)
            .bind(&item.base.section)
            .bind(&item.base.icon)
            .bind(item.base.favicon.as_ref().map(Json))
            .bind(&item.base.tags)
            .bind(&item.base.description)
            .bind(&item.base.notes)
            .bind(item.base.start_date)
            .bind(item.base.end_date)
            .bind(item.base.duration)
            .bind(enum_text(&item.base.repeat))
            .bind(enum_text(&item.base.priority))
            .bind(&data)
            .bind(item.created_at)
            .bind(item.updated_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        let linked = sqlx::query(
            r#"UPDATE profiles
               SET items = CASE WHEN $2 = ANY(items) THEN items ELSE array_append(items, $2) END
               WHERE id = $1"#,
        )
        .bind(item.owner)
        .bind(item.id)
        .execute(&mut *tx)
        .await?;

        if linked.rows_affected() != 1 {
            error!("Owner profile {} vanished while adding item {}", item.owner, item.id);
            tx.rollback().await?;
            return Err(DatabaseError::NotFound(format!("profile {}", item.owner)));
        }

        tx.commit().await?;
        Item::try_from(row)
    }

    async fn update_item(&self, item: &Item) -> Result<Option<Item>, DatabaseError> {
        let data = item_data(item)?;
        let row = sqlx::query_as::<_, ItemRow>(ITEM_UPDATE)
            .bind(item.id)
            .bind(item.item_type().as_str())
            .bind(&item.base.title)
            .bind(&item.base.category)
            .bind(&item.base.section)
            .bind(&item.base.icon)
            .bind(item.base.favicon.as_ref().map(Json))
            .bind(&item.base.tags)
            .bind(&item.base.description)
            .bind(&item.base.notes)
            .bind(item.base.start_date)
            .bind(item.base.end_date)
            .bind(item.base.duration)
            .bind(enum_text(&item.base.repeat))
            .bind(enum_text(&item.base.priority))
            .bind(&data)
            .bind(item.updated_at)
            .fetch_optional(self.db.pool())
            .await?;
        row.map(Item::try_from).transpose()
    }

    async fn delete_item(&self, id: Uuid) -> Result<Option<Item>, DatabaseError> {
        let mut tx = self.db.pool().begin().await?;

        let row = sqlx::query_as::<_, ItemRow>("DELETE FROM items WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query("UPDATE profiles SET items = array_remove(items, $2) WHERE id = $1")
            .bind(row.owner)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Item::try_from(row).map(Some)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, DatabaseError> {
        let rows = sqlx::query_as::<_, TagRow>("SELECT * FROM tags ORDER BY title")
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows.into_iter().map(Tag::from).collect())
    }

    async fn find_tag(&self, id: Uuid) -> Result<Option<Tag>, DatabaseError> {
        let row = sqlx::query_as::<_, TagRow>("SELECT * FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.map(Tag::from))
    }

    async fn insert_tag(&self, tag: &Tag) -> Result<Tag, DatabaseError> {
        let row = sqlx::query_as::<_, TagRow>("INSERT INTO tags (id, title, color) VALUES ($1, $2, $3) RETURNING *")
            .bind(tag.id)
            .bind(&tag.title)
            .bind(&tag.color)
            .fetch_one(self.db.pool())
            .await
            .map_err(DatabaseError::from_sqlx)?;
        Ok(row.into())
    }

    async fn update_tag(&self, tag: &Tag) -> Result<Option<Tag>, DatabaseError> {
        let row = sqlx::query_as::<_, TagRow>("UPDATE tags SET title = $2, color = $3 WHERE id = $1 RETURNING *")
            .bind(tag.id)
            .bind(&tag.title)
            .bind(&tag.color)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.map(Tag::from))
    }

    async fn delete_tag(&self, id: Uuid) -> Result<Option<Tag>, DatabaseError> {
        let row = sqlx::query_as::<_, TagRow>("DELETE FROM tags WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.map(Tag::from))
    }

    async fn clear_tags(&self) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM tags").execute(self.db.pool()).await?;
        Ok(result.rows_affected())
    }

    async fn list_contacts(&self) -> Result<Vec<Contact>, DatabaseError> {
        let rows = sqlx::query_as::<_, ContactRow>("SELECT * FROM contacts ORDER BY created_at")
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows.into_iter().map(Contact::from).collect())
    }

    async fn find_contact(&self, id: Uuid) -> Result<Option<Contact>, DatabaseError> {
        let row = sqlx::query_as::<_, ContactRow>("SELECT * FROM contacts WHERE id = $1")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.map(Contact::from))
    }

    async fn insert_contact(&self, contact: &Contact) -> Result<Contact, DatabaseError> {
        let row = sqlx::query_as::<_, ContactRow>(
            r#"INSERT INTO contacts (id, name, handle, company, birthday, phone_number, notes, address, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               RETURNING *"#,
        )
        .bind(contact.id)
        .bind(&contact.name)
        .bind(&contact.handle)
        .bind(&contact.company)
        .bind(contact.birthday)
        .bind(&contact.phone_number)
        .bind(&contact.notes)
        .bind(contact.address.as_ref().map(Json))
        .bind(contact.created_at)
        .bind(contact.updated_at)
        .fetch_one(self.db.pool())
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(row.into())
    }

    async fn update_contact(&self, contact: &Contact) -> Result<Option<Contact>, DatabaseError> {
        let row = sqlx::query_as::<_, ContactRow>(
            r#"UPDATE contacts SET name = $2, handle = $3, company = $4, birthday = $5, phone_number = $6,
                   notes = $7, address = $8, updated_at = $9
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(contact.id)
        .bind(&contact.name)
        .bind(&contact.handle)
        .bind(&contact.company)
        .bind(contact.birthday)
        .bind(&contact.phone_number)
        .bind(&contact.notes)
        .bind(contact.address.as_ref().map(Json))
        .bind(contact.updated_at)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.map(Contact::from))
    }

    async fn delete_contact(&self, id: Uuid) -> Result<Option<Contact>, DatabaseError> {
        let row = sqlx::query_as::<_, ContactRow>("DELETE FROM contacts WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.map(Contact::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_columns_use_wire_spelling() {
        assert_eq!(enum_text(&Some(Priority::High)), Some("HIGH".to_string()));
        assert_eq!(enum_text(&Some(Repeat::Weekly)), Some("WEEKLY".to_string()));
        assert_eq!(enum_text::<Priority>(&None), None);
    }
}
