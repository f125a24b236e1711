use chrono::{TimeZone, Utc};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::error::FilterError;
use super::types::FilterData;
use crate::database::models::ItemType;

/// Client-facing item query, parsed from the `/items` query string.
///
/// Every present field narrows the result; empty values are treated as
/// absent. Numeric bounds stay raw until translation so that a malformed
/// bound is reported instead of ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemFilter {
    pub item_type: Option<String>,
    pub search: Option<String>,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub section: Option<String>,
    pub priority: Option<String>,
    pub start_gt: Option<String>,
    pub start_lt: Option<String>,
    pub end_gt: Option<String>,
    pub end_lt: Option<String>,
    pub duration_gt: Option<String>,
    pub duration_lt: Option<String>,
    pub sort_by: Option<String>,
    pub mine: bool,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl ItemFilter {
    /// Parse a raw query string. `tags` may repeat or be comma separated;
    /// unknown keys are ignored.
    pub fn from_query(query: Option<&str>) -> Self {
        let mut filter = Self::default();
        let Some(query) = query else { return filter };

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim().to_string();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "itemType" | "item_type" => filter.item_type = Some(value),
                "search" => filter.search = Some(value),
                "tags" | "tags[]" => filter
                    .tags
                    .extend(value.split(',').map(str::trim).filter(|t| !t.is_empty()).map(str::to_string)),
                "category" => filter.category = Some(value),
                "section" => filter.section = Some(value),
                "priority" => filter.priority = Some(value),
                "startgt" => filter.start_gt = Some(value),
                "startlt" => filter.start_lt = Some(value),
                "endgt" => filter.end_gt = Some(value),
                "endlt" => filter.end_lt = Some(value),
                "durationgt" => filter.duration_gt = Some(value),
                "durationlt" => filter.duration_lt = Some(value),
                "sortBy" | "sort_by" => filter.sort_by = Some(value),
                "mine" => filter.mine = matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
                "limit" => filter.limit = Some(value),
                "offset" => filter.offset = Some(value),
                _ => {}
            }
        }
        filter
    }

    /// Requested discriminator, defaulting to `item` (every subtype).
    pub fn requested_type(&self) -> Result<ItemType, FilterError> {
        match self.item_type {
            Some(ref raw) => raw.parse().map_err(FilterError::InvalidItemType),
            None => Ok(ItemType::Item),
        }
    }

    /// Translate into a where-tree over the `items` columns. When
    /// `owner_item_set` is given, only those ids can match.
    pub fn to_filter_data(&self, item_type: ItemType, owner_item_set: Option<&[Uuid]>) -> Result<FilterData, FilterError> {
        let mut where_clause = Map::new();

        match item_type {
            ItemType::Item => {}
            ItemType::Scheduled => {
                where_clause.insert("item_type".into(), json!({ "$in": ["scheduled", "event"] }));
            }
            other => {
                where_clause.insert("item_type".into(), json!(other.as_str()));
            }
        }

        if let Some(ids) = owner_item_set {
            where_clause.insert("id".into(), json!({ "$in": ids }));
        }

        if let Some(ref search) = self.search {
            let pattern = format!("%{}%", escape_like(search));
            where_clause.insert(
                "$or".into(),
                json!([
                    { "title": { "$ilike": pattern } },
                    { "description": { "$ilike": pattern } },
                    { "notes": { "$ilike": pattern } }
                ]),
            );
        }

        if !self.tags.is_empty() {
            where_clause.insert("tags".into(), json!({ "$any": self.tags }));
        }
        if let Some(ref category) = self.category {
            where_clause.insert("category".into(), json!(category));
        }
        if let Some(ref section) = self.section {
            where_clause.insert("section".into(), json!(section));
        }
        if let Some(ref priority) = self.priority {
            where_clause.insert("priority".into(), json!(priority.to_ascii_uppercase()));
        }

        let start = Self::range("startgt", &self.start_gt, "startlt", &self.start_lt, Self::timestamp_bound)?;
        if let Some(range) = start {
            where_clause.insert("start_date".into(), range);
        }
        let end = Self::range("endgt", &self.end_gt, "endlt", &self.end_lt, Self::timestamp_bound)?;
        if let Some(range) = end {
            where_clause.insert("end_date".into(), range);
        }
        let duration = Self::range("durationgt", &self.duration_gt, "durationlt", &self.duration_lt, |field, raw| {
            Ok(json!(parse_integer(field, raw)?))
        })?;
        if let Some(range) = duration {
            where_clause.insert("duration".into(), range);
        }

        Ok(FilterData {
            where_clause: Some(Value::Object(where_clause)),
            order: Some(self.order()?),
            limit: Self::paging("limit", &self.limit)?,
            offset: Self::paging("offset", &self.offset)?,
        })
    }

    /// `startDate`/`endDate` sort ascending, a `-desc` suffix descending.
    /// Creation order breaks ties and is the default.
    fn order(&self) -> Result<Value, FilterError> {
        let Some(ref sort_by) = self.sort_by else {
            return Ok(json!(["created_at asc"]));
        };
        let (field, direction) = match sort_by.strip_suffix("-desc") {
            Some(field) => (field, "desc"),
            None => (sort_by.strip_suffix("-asc").unwrap_or(sort_by), "asc"),
        };
        let column = match field {
            "startDate" => "start_date",
            "endDate" => "end_date",
            _ => return Err(FilterError::InvalidSort(sort_by.clone())),
        };
        Ok(json!([format!("{} {}", column, direction), "created_at asc"]))
    }

    fn range(
        gt_field: &str,
        gt: &Option<String>,
        lt_field: &str,
        lt: &Option<String>,
        bound: impl Fn(&str, &str) -> Result<Value, FilterError>,
    ) -> Result<Option<Value>, FilterError> {
        let mut range = Map::new();
        if let Some(ref raw) = gt {
            range.insert("$gte".into(), bound(gt_field, raw)?);
        }
        if let Some(ref raw) = lt {
            range.insert("$lte".into(), bound(lt_field, raw)?);
        }
        Ok(if range.is_empty() { None } else { Some(Value::Object(range)) })
    }

    fn timestamp_bound(field: &str, raw: &str) -> Result<Value, FilterError> {
        let millis = parse_integer(field, raw)?;
        let at = Utc.timestamp_millis_opt(millis).single().ok_or_else(|| FilterError::InvalidBound {
            field: field.to_string(),
            value: raw.to_string(),
        })?;
        Ok(json!(at))
    }

    fn paging(field: &str, raw: &Option<String>) -> Result<Option<i32>, FilterError> {
        match raw {
            None => Ok(None),
            Some(raw) => {
                let invalid = || match field {
                    "limit" => FilterError::InvalidLimit(raw.clone()),
                    _ => FilterError::InvalidOffset(raw.clone()),
                };
                match raw.parse::<i32>() {
                    Ok(value) if value >= 0 => Ok(Some(value)),
                    _ => Err(invalid()),
                }
            }
        }
    }
}

fn parse_integer(field: &str, raw: &str) -> Result<i64, FilterError> {
    raw.trim().parse::<i64>().map_err(|_| FilterError::InvalidBound {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

/// Escape LIKE metacharacters so user input matches literally.
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
