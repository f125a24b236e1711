use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_CATEGORY_COLOR: &str = "#E0E0E0";
pub const DEFAULT_SECTION_VIEW: &str = "list";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: Uuid,
    pub title: String,
    pub view: String,
}

impl Section {
    fn seeded(title: &str, view: &str) -> Self {
        Self { id: Uuid::new_v4(), title: title.to_string(), view: view.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub title: String,
    pub color: String,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailInfo {
    pub is_verified: bool,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub user: Uuid,
    pub display_name: Option<String>,
    pub avatar_image: Option<String>,
    pub email_info: EmailInfo,
    /// Ids of items owned by this profile, without duplicates.
    pub items: Vec<Uuid>,
    pub directory: Vec<Category>,
    pub contact_card: Option<Uuid>,
    pub contacts: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What anyone may see of a profile: no email address and no item ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: Uuid,
    pub display_name: Option<String>,
    pub avatar_image: Option<String>,
    pub directory: Vec<Category>,
    pub contact_card: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<Profile> for PublicProfile {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id,
            display_name: profile.display_name,
            avatar_image: profile.avatar_image,
            directory: profile.directory,
            contact_card: profile.contact_card,
            created_at: profile.created_at,
        }
    }
}

impl Profile {
    pub fn new(user: Uuid, email: &str, display_name: Option<String>, contact_card: Option<Uuid>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user,
            display_name,
            avatar_image: None,
            email_info: EmailInfo { is_verified: false, email: email.to_string() },
            items: vec![],
            directory: Self::default_directory(),
            contact_card,
            contacts: contact_card.into_iter().collect(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn default_directory() -> Vec<Category> {
        vec![
            Category {
                id: Uuid::new_v4(),
                title: "Backlog".to_string(),
                color: "#E0E0E0".to_string(),
                sections: vec![Section::seeded("All", "list")],
            },
            Category {
                id: Uuid::new_v4(),
                title: "Cookbook".to_string(),
                color: "#FFE0B2".to_string(),
                sections: vec![Section::seeded("All", "gallery"), Section::seeded("Favorites", "gallery")],
            },
            Category {
                id: Uuid::new_v4(),
                title: "Journal".to_string(),
                color: "#C8E6C9".to_string(),
                sections: vec![Section::seeded("All", "list"), Section::seeded("Daily", "calendar")],
            },
        ]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub display_name: Option<String>,
    pub avatar_image: Option<String>,
}

impl ProfilePatch {
    pub fn apply(&self, profile: &mut Profile) -> usize {
        let mut applied = 0;
        if self.display_name.is_some() {
            profile.display_name = self.display_name.clone();
            applied += 1;
        }
        if self.avatar_image.is_some() {
            profile.avatar_image = self.avatar_image.clone();
            applied += 1;
        }
        applied
    }
}

/// Section as supplied by clients; a missing id is generated.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionInput {
    pub id: Option<Uuid>,
    pub title: String,
    pub view: Option<String>,
}

impl From<SectionInput> for Section {
    fn from(input: SectionInput) -> Self {
        Section {
            id: input.id.unwrap_or_else(Uuid::new_v4),
            title: input.title,
            view: input.view.unwrap_or_else(|| DEFAULT_SECTION_VIEW.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub title: Option<String>,
    pub color: Option<String>,
    pub sections: Option<Vec<SectionInput>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPatch {
    pub title: Option<String>,
    pub color: Option<String>,
    pub sections: Option<Vec<SectionInput>>,
}

impl CategoryPatch {
    pub fn apply(&self, category: &mut Category) -> usize {
        let mut applied = 0;
        if let Some(ref title) = self.title {
            category.title = title.trim().to_string();
            applied += 1;
        }
        if let Some(ref color) = self.color {
            category.color = color.clone();
            applied += 1;
        }
        if let Some(ref sections) = self.sections {
            category.sections = sections.iter().cloned().map(Section::from).collect();
            applied += 1;
        }
        applied
    }
}
