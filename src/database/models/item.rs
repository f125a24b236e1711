use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use super::contact::Address;
use super::flexible_datetime;
use crate::filter::types::{ColumnSpec, ColumnType};
use crate::filter::FilterRow;

pub const DEFAULT_CATEGORY: &str = "Backlog";
pub const DEFAULT_SECTION: &str = "All";
pub const DEFAULT_ICON: &str = "📍";

/// Columns of the `items` table that filters and orderings may reference.
pub const ITEM_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("id", ColumnType::Uuid),
    ColumnSpec::new("owner", ColumnType::Uuid),
    ColumnSpec::new("item_type", ColumnType::Text),
    ColumnSpec::new("title", ColumnType::Text),
    ColumnSpec::new("category", ColumnType::Text),
    ColumnSpec::new("section", ColumnType::Text),
    ColumnSpec::new("icon", ColumnType::Text),
    ColumnSpec::new("tags", ColumnType::TextArray),
    ColumnSpec::new("description", ColumnType::Text),
    ColumnSpec::new("notes", ColumnType::Text),
    ColumnSpec::new("start_date", ColumnType::Timestamp),
    ColumnSpec::new("end_date", ColumnType::Timestamp),
    ColumnSpec::new("duration", ColumnType::Number),
    ColumnSpec::new("repeat", ColumnType::Text),
    ColumnSpec::new("priority", ColumnType::Text),
    ColumnSpec::new("created_at", ColumnType::Timestamp),
    ColumnSpec::new("updated_at", ColumnType::Timestamp),
];

/// Item discriminator, stored in the `item_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Item,
    Task,
    Scheduled,
    Event,
    Page,
    Recipe,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Item => "item",
            ItemType::Task => "task",
            ItemType::Scheduled => "scheduled",
            ItemType::Event => "event",
            ItemType::Page => "page",
            ItemType::Recipe => "recipe",
        }
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "item" => Ok(ItemType::Item),
            "task" => Ok(ItemType::Task),
            "scheduled" => Ok(ItemType::Scheduled),
            "event" => Ok(ItemType::Event),
            "page" => Ok(ItemType::Page),
            "recipe" => Ok(ItemType::Recipe),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    #[serde(alias = "none")]
    None,
    #[serde(alias = "low")]
    Low,
    #[serde(alias = "medium")]
    Medium,
    #[serde(alias = "high")]
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Repeat {
    #[serde(alias = "once")]
    Once,
    #[serde(alias = "daily")]
    Daily,
    #[serde(alias = "weekly")]
    Weekly,
    #[serde(alias = "monthly")]
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favicon {
    /// Base64 image payload.
    pub data: String,
    pub content_type: String,
}

/// A checkable line: task subtasks, recipe ingredients and directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistEntry {
    #[serde(default)]
    pub is_checked: bool,
    pub task: String,
}

/// Fields shared by every item subtype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemBase {
    pub title: String,
    pub category: String,
    pub section: String,
    pub icon: String,
    #[serde(default)]
    pub favicon: Option<Favicon>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub repeat: Option<Repeat>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskData {
    #[serde(default)]
    pub is_checked: bool,
    #[serde(default)]
    pub subtasks: Vec<ChecklistEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledData {
    #[serde(default)]
    pub is_checked: bool,
    pub scheduled_item: Uuid,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventData {
    #[serde(default)]
    pub is_checked: bool,
    #[serde(default)]
    pub scheduled_item: Option<Uuid>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub contacts: Vec<Uuid>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub subtasks: Vec<ChecklistEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeData {
    #[serde(default)]
    pub ingredients: Vec<ChecklistEntry>,
    #[serde(default, alias = "instructions")]
    pub directions: Vec<ChecklistEntry>,
    #[serde(default)]
    pub servings: Option<f64>,
}

/// Subtype-specific payload. Serialized with an `itemType` tag, which is
/// also how it is kept in the `data` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "itemType", rename_all = "lowercase")]
pub enum ItemKind {
    Item,
    Task(TaskData),
    Scheduled(ScheduledData),
    Event(EventData),
    Page(PageData),
    Recipe(RecipeData),
}

impl ItemKind {
    pub fn item_type(&self) -> ItemType {
        match self {
            ItemKind::Item => ItemType::Item,
            ItemKind::Task(_) => ItemType::Task,
            ItemKind::Scheduled(_) => ItemType::Scheduled,
            ItemKind::Event(_) => ItemType::Event,
            ItemKind::Page(_) => ItemType::Page,
            ItemKind::Recipe(_) => ItemType::Recipe,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: Uuid,
    /// Owning profile.
    pub owner: Uuid,
    #[serde(flatten)]
    pub base: ItemBase,
    #[serde(flatten)]
    pub kind: ItemKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn item_type(&self) -> ItemType {
        self.kind.item_type()
    }

    /// Flatten to the filterable columns, using the same names and
    /// representations as the `items` table.
    pub fn filter_row(&self) -> FilterRow {
        let mut row = FilterRow::new();
        row.insert("id".into(), json!(self.id));
        row.insert("owner".into(), json!(self.owner));
        row.insert("item_type".into(), json!(self.item_type().as_str()));
        row.insert("title".into(), json!(self.base.title));
        row.insert("category".into(), json!(self.base.category));
        row.insert("section".into(), json!(self.base.section));
        row.insert("icon".into(), json!(self.base.icon));
        row.insert("tags".into(), json!(self.base.tags));
        row.insert("description".into(), json!(self.base.description));
        row.insert("notes".into(), json!(self.base.notes));
        row.insert("start_date".into(), json!(self.base.start_date));
        row.insert("end_date".into(), json!(self.base.end_date));
        row.insert("duration".into(), json!(self.base.duration));
        row.insert("repeat".into(), json!(self.base.repeat));
        row.insert("priority".into(), json!(self.base.priority));
        row.insert("created_at".into(), json!(self.created_at));
        row.insert("updated_at".into(), json!(self.updated_at));
        row
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemInputError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{0} cannot be blank")]
    BlankField(&'static str),
}

/// Fields accepted when creating an item. Fields that do not belong to the
/// requested subtype are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub item_type: Option<String>,
    pub title: Option<String>,
    pub category: Option<String>,
    pub section: Option<String>,
    pub icon: Option<String>,
    pub favicon: Option<Favicon>,
    pub tags: Option<Vec<String>>,
    pub description: Option<String>,
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "flexible_datetime::option")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_datetime::option")]
    pub end_date: Option<DateTime<Utc>>,
    pub duration: Option<f64>,
    pub repeat: Option<Repeat>,
    pub priority: Option<Priority>,

    pub is_checked: Option<bool>,
    pub subtasks: Option<Vec<ChecklistEntry>>,
    pub scheduled_item: Option<Uuid>,
    pub location: Option<String>,
    pub contacts: Option<Vec<Uuid>>,
    pub address: Option<Address>,
    pub text: Option<String>,
    pub ingredients: Option<Vec<ChecklistEntry>>,
    #[serde(alias = "instructions")]
    pub directions: Option<Vec<ChecklistEntry>>,
    pub servings: Option<f64>,
}

impl NewItem {
    /// Validate and build the stored item, applying base defaults.
    pub fn into_item(self, item_type: ItemType, owner: Uuid, now: DateTime<Utc>) -> Result<Item, ItemInputError> {
        let title = match self.title {
            None => return Err(ItemInputError::MissingField("title")),
            Some(t) if t.trim().is_empty() => return Err(ItemInputError::BlankField("title")),
            Some(t) => t,
        };
        let non_blank = |v: Option<String>, default: &str| v.filter(|s| !s.trim().is_empty()).unwrap_or_else(|| default.to_string());

        let kind = match item_type {
            ItemType::Item => ItemKind::Item,
            ItemType::Task => ItemKind::Task(TaskData {
                is_checked: self.is_checked.unwrap_or(false),
                subtasks: self.subtasks.unwrap_or_default(),
            }),
            ItemType::Scheduled => ItemKind::Scheduled(ScheduledData {
                is_checked: self.is_checked.unwrap_or(false),
                scheduled_item: self.scheduled_item.ok_or(ItemInputError::MissingField("scheduledItem"))?,
            }),
            ItemType::Event => ItemKind::Event(EventData {
                is_checked: self.is_checked.unwrap_or(false),
                scheduled_item: self.scheduled_item,
                location: self.location,
                contacts: self.contacts.unwrap_or_default(),
                address: self.address,
                subtasks: self.subtasks.unwrap_or_default(),
            }),
            ItemType::Page => ItemKind::Page(PageData { text: self.text }),
            ItemType::Recipe => ItemKind::Recipe(RecipeData {
                ingredients: self.ingredients.unwrap_or_default(),
                directions: self.directions.unwrap_or_default(),
                servings: self.servings,
            }),
        };

        Ok(Item {
            id: Uuid::new_v4(),
            owner,
            base: ItemBase {
                title,
                category: non_blank(self.category, DEFAULT_CATEGORY),
                section: non_blank(self.section, DEFAULT_SECTION),
                icon: non_blank(self.icon, DEFAULT_ICON),
                favicon: self.favicon,
                tags: self.tags.unwrap_or_default(),
                description: self.description,
                notes: self.notes,
                start_date: self.start_date,
                end_date: self.end_date,
                duration: self.duration,
                repeat: self.repeat,
                priority: self.priority,
            },
            kind,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update of an item. Base fields always apply; subtype fields apply
/// only when they belong to the stored subtype.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPatch {
    pub title: Option<String>,
    pub category: Option<String>,
    pub section: Option<String>,
    pub icon: Option<String>,
    pub favicon: Option<Favicon>,
    pub tags: Option<Vec<String>>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "flexible_datetime::option")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_datetime::option")]
    pub end_date: Option<DateTime<Utc>>,
    pub duration: Option<f64>,
    pub repeat: Option<Repeat>,
    pub priority: Option<Priority>,
    pub notes: Option<String>,

    pub is_checked: Option<bool>,
    pub subtasks: Option<Vec<ChecklistEntry>>,
    pub contacts: Option<Vec<Uuid>>,
    pub address: Option<Address>,
    pub location: Option<String>,
    pub text: Option<String>,
    pub ingredients: Option<Vec<ChecklistEntry>>,
    #[serde(alias = "instructions")]
    pub directions: Option<Vec<ChecklistEntry>>,
    pub servings: Option<f64>,
}

fn set<T: Clone>(slot: &mut T, value: &Option<T>, applied: &mut usize) {
    if let Some(v) = value {
        *slot = v.clone();
        *applied += 1;
    }
}

fn set_some<T: Clone>(slot: &mut Option<T>, value: &Option<T>, applied: &mut usize) {
    if let Some(v) = value {
        *slot = Some(v.clone());
        *applied += 1;
    }
}

impl ItemPatch {
    /// Apply to `item` in place and return how many fields were applied.
    pub fn apply(&self, item: &mut Item) -> Result<usize, ItemInputError> {
        if matches!(self.title, Some(ref t) if t.trim().is_empty()) {
            return Err(ItemInputError::BlankField("title"));
        }

        let mut applied = 0;
        let base = &mut item.base;
        set(&mut base.title, &self.title, &mut applied);
        set(&mut base.category, &self.category, &mut applied);
        set(&mut base.section, &self.section, &mut applied);
        set(&mut base.icon, &self.icon, &mut applied);
        set_some(&mut base.favicon, &self.favicon, &mut applied);
        set(&mut base.tags, &self.tags, &mut applied);
        set_some(&mut base.description, &self.description, &mut applied);
        set_some(&mut base.start_date, &self.start_date, &mut applied);
        set_some(&mut base.end_date, &self.end_date, &mut applied);
        set_some(&mut base.duration, &self.duration, &mut applied);
        set_some(&mut base.repeat, &self.repeat, &mut applied);
        set_some(&mut base.priority, &self.priority, &mut applied);
        set_some(&mut base.notes, &self.notes, &mut applied);

        match &mut item.kind {
            ItemKind::Item => {}
            ItemKind::Task(task) => {
                set(&mut task.is_checked, &self.is_checked, &mut applied);
                set(&mut task.subtasks, &self.subtasks, &mut applied);
            }
            ItemKind::Scheduled(scheduled) => {
                set(&mut scheduled.is_checked, &self.is_checked, &mut applied);
            }
            ItemKind::Event(event) => {
                set(&mut event.is_checked, &self.is_checked, &mut applied);
                set(&mut event.contacts, &self.contacts, &mut applied);
                set_some(&mut event.address, &self.address, &mut applied);
                set_some(&mut event.location, &self.location, &mut applied);
                set(&mut event.subtasks, &self.subtasks, &mut applied);
            }
            ItemKind::Page(page) => {
                set_some(&mut page.text, &self.text, &mut applied);
            }
            ItemKind::Recipe(recipe) => {
                set(&mut recipe.ingredients, &self.ingredients, &mut applied);
                set(&mut recipe.directions, &self.directions, &mut applied);
                set_some(&mut recipe.servings, &self.servings, &mut applied);
            }
        }

        Ok(applied)
    }
}
