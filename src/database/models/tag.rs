use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_TAG_COLOR: &str = "#FAFAFC";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub title: String,
    pub color: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTag {
    pub title: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagPatch {
    pub title: Option<String>,
    pub color: Option<String>,
}

impl TagPatch {
    pub fn apply(&self, tag: &mut Tag) -> usize {
        let mut applied = 0;
        if let Some(ref title) = self.title {
            tag.title = title.clone();
            applied += 1;
        }
        if let Some(ref color) = self.color {
            tag.color = color.clone();
            applied += 1;
        }
        applied
    }
}
