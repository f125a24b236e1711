use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::{FilterNode, FilterWhere};
use super::types::{ColumnSpec, FilterData, FilterOrderInfo, SqlResult};

/// Validated query over one table: a WHERE tree, ordering and paging,
/// all checked against the table's column registry.
pub struct Filter {
    table_name: String,
    columns: &'static [ColumnSpec],
    where_node: Option<FilterNode>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i32>,
    offset: Option<i32>,
}

impl Filter {
    pub fn new(table_name: impl Into<String>, columns: &'static [ColumnSpec]) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        Self::validate_table_name(&table_name)?;
        Ok(Self {
            table_name,
            columns,
            where_node: None,
            order_data: vec![],
            limit: None,
            offset: None,
        })
    }

    pub fn assign(&mut self, data: &FilterData) -> Result<&mut Self, FilterError> {
        if let Some(ref where_clause) = data.where_clause { self.where_clause(where_clause)?; }
        if let Some(ref order) = data.order { self.order(order)?; }
        if data.limit.is_some() || data.offset.is_some() { self.limit(data.limit, data.offset)?; }
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: &Value) -> Result<&mut Self, FilterError> {
        self.where_node = Some(FilterWhere::parse(conditions, self.columns)?);
        Ok(self)
    }

    pub fn order(&mut self, order_spec: &Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(order_spec, self.columns)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: Option<i32>, offset: Option<i32>) -> Result<&mut Self, FilterError> {
        if let Some(l) = limit { if l < 0 { return Err(FilterError::InvalidLimit(l.to_string())); } }
        if let Some(off) = offset { if off < 0 { return Err(FilterError::InvalidOffset(off.to_string())); } }

        // Apply max limit from config
        let max_limit = crate::config::CONFIG.filter.max_limit.unwrap_or(i32::MAX);
        let applied_limit = match limit {
            Some(l) if l > max_limit => {
                if crate::config::CONFIG.filter.debug_logging {
                    tracing::warn!("Limit {} exceeds max {}, capping to max", l, max_limit);
                }
                Some(max_limit)
            }
            other => other,
        };

        self.limit = applied_limit;
        self.offset = offset;
        Ok(self)
    }

    pub fn where_node(&self) -> Option<&FilterNode> {
        self.where_node.as_ref()
    }

    pub fn order_data(&self) -> &[FilterOrderInfo] {
        &self.order_data
    }

    pub fn limit_value(&self) -> Option<i32> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<i32> {
        self.offset
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = match self.where_node {
            Some(ref node) => FilterWhere::generate(node, 0)?,
            None => ("1=1".to_string(), vec![]),
        };
        let order_clause = FilterOrder::generate(&self.order_data);
        let limit_clause = self.build_limit_clause();

        let query = [
            "SELECT *".to_string(),
            format!("FROM \"{}\"", self.table_name),
            format!("WHERE {}", where_clause),
            order_clause,
            limit_clause,
        ].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");

        Ok(SqlResult { query, params })
    }

    fn validate_table_name(name: &str) -> Result<(), FilterError> {
        let mut chars = name.chars();
        let valid_start = matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_');
        if !valid_start || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(FilterError::InvalidTableName(name.to_string()));
        }
        Ok(())
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("OFFSET {}", o),
            (None, None) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::types::ColumnType;
    use serde_json::json;

    const COLUMNS: &[ColumnSpec] = &[
        ColumnSpec::new("item_type", ColumnType::Text),
        ColumnSpec::new("start_date", ColumnType::Timestamp),
        ColumnSpec::new("created_at", ColumnType::Timestamp),
    ];

    #[test]
    fn test_full_select() {
        let mut filter = Filter::new("items", COLUMNS).unwrap();
        filter
            .assign(&FilterData {
                where_clause: Some(json!({ "item_type": "task" })),
                order: Some(json!(["start_date desc", "created_at asc"])),
                limit: Some(10),
                offset: Some(20),
            })
            .unwrap();

        let sql = filter.to_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT * FROM \"items\" WHERE \"item_type\" = $1::text \
             ORDER BY \"start_date\" DESC NULLS LAST, \"created_at\" ASC NULLS LAST LIMIT 10 OFFSET 20"
        );
        assert_eq!(sql.params, vec![json!("task")]);
    }

    #[test]
    fn test_rejects_bad_table_and_order_column() {
        assert!(Filter::new("items; drop", COLUMNS).is_err());
        let mut filter = Filter::new("items", COLUMNS).unwrap();
        assert!(matches!(filter.order(&json!("password desc")), Err(FilterError::InvalidColumn(_))));
    }

    #[test]
    fn test_negative_limit_rejected() {
        let mut filter = Filter::new("items", COLUMNS).unwrap();
        assert!(filter.limit(Some(-1), None).is_err());
    }
}
