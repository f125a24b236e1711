use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::error::FilterError;
use super::filter::Filter;
use super::filter_where::{FilterNode, FilterWhere};
use super::types::{ColumnType, FilterOp, FilterOrderInfo, FilterWhereInfo, SortDirection};

/// A record flattened to its filterable columns. Timestamps are RFC 3339
/// strings, numbers are JSON numbers, array columns are string arrays.
pub type FilterRow = Map<String, Value>;

/// Evaluates a compiled `Filter` against in-process rows with the same
/// semantics the SQL compiler produces (SQL NULL rules, NULLS LAST).
pub struct FilterMatch;

impl FilterMatch {
    pub fn apply<T>(filter: &Filter, records: Vec<T>, row_of: impl Fn(&T) -> FilterRow) -> Result<Vec<T>, FilterError> {
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let row = row_of(&record);
            let keep = match filter.where_node() {
                Some(node) => Self::matches(node, &row)?,
                None => true,
            };
            if keep {
                rows.push((row, record));
            }
        }

        let order = filter.order_data();
        if !order.is_empty() {
            rows.sort_by(|(a, _), (b, _)| Self::compare_rows(order, a, b));
        }

        let offset = filter.offset_value().unwrap_or(0).max(0) as usize;
        let limit = filter.limit_value().map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(offset).take(limit).map(|(_, record)| record).collect())
    }

    pub fn matches(node: &FilterNode, row: &FilterRow) -> Result<bool, FilterError> {
        match node {
            FilterNode::And(children) => {
                for child in children {
                    if !Self::matches(child, row)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            FilterNode::Or(children) => {
                for child in children {
                    if Self::matches(child, row)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            FilterNode::Not(inner) => Ok(!Self::matches(inner, row)?),
            FilterNode::Condition(condition) => Self::matches_condition(condition, row),
        }
    }

    fn matches_condition(condition: &FilterWhereInfo, row: &FilterRow) -> Result<bool, FilterError> {
        let value = row.get(condition.column.name).unwrap_or(&Value::Null);
        let column_type = condition.column.column_type;
        let data = &condition.data;

        if column_type == ColumnType::TextArray {
            let present: Vec<&str> = value.as_array().map(|a| a.iter().filter_map(Value::as_str).collect()).unwrap_or_default();
            let wanted = FilterWhere::as_list(data);
            let wanted: Vec<&str> = wanted.iter().filter_map(Value::as_str).collect();
            return Ok(match condition.operator {
                FilterOp::Eq => wanted.iter().any(|w| present.contains(w)),
                FilterOp::Ne => value.is_array() && !wanted.iter().any(|w| present.contains(w)),
                FilterOp::Any | FilterOp::In => wanted.iter().any(|w| present.contains(w)),
                FilterOp::All => wanted.iter().all(|w| present.contains(w)),
                other => {
                    return Err(FilterError::InvalidOperatorData(format!(
                        "operator {:?} is not supported on array column '{}'",
                        other, condition.column.name
                    )))
                }
            });
        }

        match condition.operator {
            FilterOp::Eq if data.is_null() => return Ok(value.is_null()),
            FilterOp::Ne if data.is_null() => return Ok(!value.is_null()),
            _ => {}
        }

        // SQL comparison with NULL never holds
        if value.is_null() {
            return Ok(false);
        }

        let ordering = |rhs: &Value| compare_values(column_type, value, rhs);
        Ok(match condition.operator {
            FilterOp::Eq => ordering(data)? == Ordering::Equal,
            FilterOp::Ne => ordering(data)? != Ordering::Equal,
            FilterOp::Gt => ordering(data)? == Ordering::Greater,
            FilterOp::Gte => ordering(data)? != Ordering::Less,
            FilterOp::Lt => ordering(data)? == Ordering::Less,
            FilterOp::Lte => ordering(data)? != Ordering::Greater,
            FilterOp::Like | FilterOp::ILike => {
                let text = value.as_str().unwrap_or_default();
                let pattern = data.as_str().unwrap_or_default();
                like_match(pattern, text, condition.operator == FilterOp::ILike)
            }
            FilterOp::In => {
                for candidate in FilterWhere::as_list(data) {
                    if !candidate.is_null() && ordering(&candidate)? == Ordering::Equal {
                        return Ok(true);
                    }
                }
                false
            }
            FilterOp::Any | FilterOp::All => {
                return Err(FilterError::InvalidOperatorData(format!("array operator on scalar column '{}'", condition.column.name)));
            }
        })
    }

    fn compare_rows(order: &[FilterOrderInfo], a: &FilterRow, b: &FilterRow) -> Ordering {
        for info in order {
            let left = a.get(info.column.name).unwrap_or(&Value::Null);
            let right = b.get(info.column.name).unwrap_or(&Value::Null);
            let ordering = match (left.is_null(), right.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => {
                    let ord = compare_values(info.column.column_type, left, right).unwrap_or(Ordering::Equal);
                    if info.sort == SortDirection::Desc { ord.reverse() } else { ord }
                }
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

fn compare_values(column_type: ColumnType, left: &Value, right: &Value) -> Result<Ordering, FilterError> {
    let invalid = || FilterError::InvalidOperatorData(format!("cannot compare {} with {} as {:?}", left, right, column_type));
    match column_type {
        ColumnType::Text | ColumnType::TextArray => {
            let (l, r) = (left.as_str().ok_or_else(invalid)?, right.as_str().ok_or_else(invalid)?);
            Ok(l.cmp(r))
        }
        ColumnType::Uuid => {
            let (l, r) = (left.as_str().ok_or_else(invalid)?, right.as_str().ok_or_else(invalid)?);
            Ok(l.to_ascii_lowercase().cmp(&r.to_ascii_lowercase()))
        }
        ColumnType::Timestamp => {
            let (l, r) = (as_timestamp(left).ok_or_else(invalid)?, as_timestamp(right).ok_or_else(invalid)?);
            Ok(l.cmp(&r))
        }
        ColumnType::Number => {
            let (l, r) = (as_number(left).ok_or_else(invalid)?, as_number(right).ok_or_else(invalid)?);
            l.partial_cmp(&r).ok_or_else(invalid)
        }
    }
}

fn as_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Debug, PartialEq)]
enum LikeToken {
    Any,
    One,
    Lit(char),
}

fn like_tokens(pattern: &str) -> Vec<LikeToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => LikeToken::Any,
            '_' => LikeToken::One,
            '\\' => LikeToken::Lit(chars.next().unwrap_or('\\')),
            other => LikeToken::Lit(other),
        });
    }
    tokens
}

/// SQL LIKE with `%`, `_` and backslash escapes.
pub fn like_match(pattern: &str, text: &str, case_insensitive: bool) -> bool {
    let (pattern, text) = if case_insensitive {
        (pattern.to_lowercase(), text.to_lowercase())
    } else {
        (pattern.to_string(), text.to_string())
    };
    let tokens = like_tokens(&pattern);
    let text: Vec<char> = text.chars().collect();

    let (mut t, mut p) = (0usize, 0usize);
    let mut backtrack: Option<(usize, usize)> = None;
    while t < text.len() {
        match tokens.get(p) {
            Some(LikeToken::One) => {
                t += 1;
                p += 1;
            }
            Some(LikeToken::Lit(c)) if *c == text[t] => {
                t += 1;
                p += 1;
            }
            Some(LikeToken::Any) => {
                backtrack = Some((p, t));
                p += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    t = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }
    while tokens.get(p) == Some(&LikeToken::Any) {
        p += 1;
    }
    p == tokens.len()
}
