use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::flexible_datetime;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    pub handle: Option<String>,
    pub company: Option<String>,
    pub birthday: Option<DateTime<Utc>>,
    pub phone_number: Option<String>,
    pub notes: Option<String>,
    pub address: Option<Address>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    pub name: Option<String>,
    pub handle: Option<String>,
    pub company: Option<String>,
    #[serde(default, deserialize_with = "flexible_datetime::option")]
    pub birthday: Option<DateTime<Utc>>,
    pub phone_number: Option<String>,
    pub notes: Option<String>,
    pub address: Option<Address>,
}

impl NewContact {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), ..Default::default() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactPatch {
    pub name: Option<String>,
    pub handle: Option<String>,
    pub company: Option<String>,
    #[serde(default, deserialize_with = "flexible_datetime::option")]
    pub birthday: Option<DateTime<Utc>>,
    pub phone_number: Option<String>,
    pub notes: Option<String>,
    pub address: Option<Address>,
}

impl ContactPatch {
    /// Apply to `contact` in place and return how many fields were applied.
    pub fn apply(&self, contact: &mut Contact) -> usize {
        let mut applied = 0;
        if let Some(ref name) = self.name {
            contact.name = name.clone();
            applied += 1;
        }
        for (slot, value) in [
            (&mut contact.handle, &self.handle),
            (&mut contact.company, &self.company),
            (&mut contact.phone_number, &self.phone_number),
            (&mut contact.notes, &self.notes),
        ] {
            if value.is_some() {
                *slot = value.clone();
                applied += 1;
            }
        }
        if self.birthday.is_some() {
            contact.birthday = self.birthday;
            applied += 1;
        }
        if self.address.is_some() {
            contact.address = self.address.clone();
            applied += 1;
        }
        applied
    }
}
