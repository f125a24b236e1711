use serde_json::Value;

use super::error::FilterError;
use super::types::{lookup_column, ColumnSpec, FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    pub fn validate_and_parse(order: &Value, columns: &[ColumnSpec]) -> Result<Vec<FilterOrderInfo>, FilterError> {
        match order {
            Value::Null => Ok(vec![]),
            Value::String(s) => Self::parse_order_string(s, columns),
            Value::Array(arr) => {
                // Expect array of strings like ["start_date desc", "created_at asc"]
                let mut out = Vec::new();
                for v in arr {
                    match v {
                        Value::String(s) => out.extend(Self::parse_order_string(s, columns)?),
                        other => return Err(FilterError::InvalidWhereClause(format!("Invalid order entry: {}", other))),
                    }
                }
                Ok(out)
            }
            Value::Object(obj) => {
                // { "start_date": "desc" }
                let mut out = Vec::new();
                for (k, v) in obj {
                    let sort = Self::parse_direction(v.as_str().unwrap_or("asc"));
                    out.push(FilterOrderInfo { column: Self::column(k, columns)?, sort });
                }
                Ok(out)
            }
            other => Err(FilterError::InvalidWhereClause(format!("Invalid order: {}", other))),
        }
    }

    fn parse_order_string(s: &str, columns: &[ColumnSpec]) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let mut out = Vec::new();
        for part in s.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() { continue; }
            let mut it = trimmed.split_whitespace();
            if let Some(col) = it.next() {
                let sort = Self::parse_direction(it.next().unwrap_or("asc"));
                out.push(FilterOrderInfo { column: Self::column(col, columns)?, sort });
            }
        }
        Ok(out)
    }

    fn parse_direction(dir: &str) -> SortDirection {
        if dir.eq_ignore_ascii_case("desc") { SortDirection::Desc } else { SortDirection::Asc }
    }

    fn column(name: &str, columns: &[ColumnSpec]) -> Result<ColumnSpec, FilterError> {
        lookup_column(columns, name).ok_or_else(|| FilterError::InvalidColumn(name.to_string()))
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() { return String::new(); }
        // Nulls sort after values in both directions
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("\"{}\" {} NULLS LAST", i.column.name, i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}
