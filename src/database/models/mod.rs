pub mod contact;
pub mod item;
pub mod profile;
pub mod tag;
pub mod user;

pub use contact::{Address, Contact, ContactPatch, NewContact};
pub use item::{
    ChecklistEntry, EventData, Favicon, Item, ItemBase, ItemInputError, ItemKind, ItemPatch, ItemType, NewItem,
    PageData, Priority, RecipeData, Repeat, ScheduledData, TaskData, ITEM_COLUMNS,
};
pub use profile::{
    Category, CategoryPatch, EmailInfo, NewCategory, Profile, ProfilePatch, PublicProfile, Section, SectionInput,
};
pub use tag::{NewTag, Tag, TagPatch};
pub use user::{EmailVerification, User, VerificationToken};

/// Serde helpers for timestamps supplied by clients, which send either
/// RFC 3339 strings or epoch milliseconds.
pub mod flexible_datetime {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{de, Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Text(String),
    }

    fn convert<E: de::Error>(raw: Raw) -> Result<DateTime<Utc>, E> {
        match raw {
            Raw::Millis(ms) => Utc
                .timestamp_millis_opt(ms)
                .single()
                .ok_or_else(|| E::custom(format!("timestamp out of range: {}", ms))),
            Raw::Text(s) => {
                if let Ok(ms) = s.trim().parse::<i64>() {
                    return convert(Raw::Millis(ms));
                }
                DateTime::parse_from_rfc3339(s.trim())
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|_| E::custom(format!("invalid date: {}", s)))
            }
        }
    }

    pub fn option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Raw>::deserialize(deserializer)? {
            Some(raw) => convert(raw).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "super::flexible_datetime::option")]
        at: Option<DateTime<Utc>>,
    }

    #[test]
    fn test_accepts_rfc3339_and_millis() {
        let a: Probe = serde_json::from_value(json!({ "at": "2021-01-02T00:00:00Z" })).unwrap();
        let b: Probe = serde_json::from_value(json!({ "at": 1609545600000i64 })).unwrap();
        let c: Probe = serde_json::from_value(json!({ "at": "1609545600000" })).unwrap();
        assert_eq!(a.at, b.at);
        assert_eq!(b.at, c.at);

        let missing: Probe = serde_json::from_value(json!({})).unwrap();
        assert!(missing.at.is_none());
        assert!(serde_json::from_value::<Probe>(json!({ "at": "yesterday" })).is_err());
    }
}
