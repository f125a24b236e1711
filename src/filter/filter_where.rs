use serde_json::Value;

use super::error::FilterError;
use super::types::{lookup_column, ColumnSpec, ColumnType, FilterOp, FilterWhereInfo};

/// Parsed WHERE tree. Shared by the SQL compiler below and the in-process
/// matcher in `filter_match`.
#[derive(Debug, Clone)]
pub enum FilterNode {
    And(Vec<FilterNode>),
    Or(Vec<FilterNode>),
    Not(Box<FilterNode>),
    Condition(FilterWhereInfo),
}

pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    /// Parse a where document against the allowed columns.
    pub fn parse(where_data: &Value, columns: &[ColumnSpec]) -> Result<FilterNode, FilterError> {
        match where_data {
            Value::Null => Ok(FilterNode::And(vec![])),
            Value::Object(obj) => {
                let mut nodes = Vec::new();
                for (key, value) in obj {
                    if key.starts_with('$') {
                        nodes.push(Self::parse_logical_operator(key, value, columns)?);
                    } else {
                        nodes.extend(Self::parse_field_condition(key, value, columns)?);
                    }
                }
                Ok(FilterNode::And(nodes))
            }
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn parse_logical_operator(op: &str, value: &Value, columns: &[ColumnSpec]) -> Result<FilterNode, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value.as_array().ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                let children = arr.iter().map(|v| Self::parse(v, columns)).collect::<Result<Vec<_>, _>>()?;
                Ok(if op == "$and" { FilterNode::And(children) } else { FilterNode::Or(children) })
            }
            "$not" => Ok(FilterNode::Not(Box::new(Self::parse(value, columns)?))),
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn parse_field_condition(field: &str, value: &Value, columns: &[ColumnSpec]) -> Result<Vec<FilterNode>, FilterError> {
        let column = lookup_column(columns, field).ok_or_else(|| FilterError::InvalidColumn(field.to_string()))?;

        let mut nodes = Vec::new();
        match value {
            Value::Object(obj) => {
                for (op_key, op_val) in obj {
                    let operator = FilterOp::parse(op_key).ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
                    Self::check_operator(&column, operator, op_val)?;
                    nodes.push(FilterNode::Condition(FilterWhereInfo { column, operator, data: op_val.clone() }));
                }
            }
            // Implicit equality: { field: value }
            _ => nodes.push(FilterNode::Condition(FilterWhereInfo { column, operator: FilterOp::Eq, data: value.clone() })),
        }
        Ok(nodes)
    }

    fn check_operator(column: &ColumnSpec, operator: FilterOp, data: &Value) -> Result<(), FilterError> {
        let bad = |reason: &str| Err(FilterError::InvalidOperatorData(format!("{} on '{}': {}", reason, column.name, data)));
        match operator {
            FilterOp::Like | FilterOp::ILike => {
                if column.column_type != ColumnType::Text {
                    return bad("pattern match requires a text column");
                }
                if !data.is_string() {
                    return bad("pattern must be a string");
                }
            }
            op if op.is_comparison() => {
                if column.column_type == ColumnType::TextArray {
                    return bad("ordering comparison on an array column");
                }
                if data.is_null() {
                    return bad("comparison against null");
                }
            }
            FilterOp::Any | FilterOp::All => {
                if column.column_type != ColumnType::TextArray {
                    return bad("array operator requires an array column");
                }
            }
            FilterOp::Eq | FilterOp::Ne => {
                if column.column_type == ColumnType::TextArray && !data.is_string() {
                    return bad("membership test requires a string");
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Compile a parsed tree into a SQL predicate and its parameters.
    pub fn generate(node: &FilterNode, starting_param_index: usize) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        let sql = filter_where.build(node)?;
        Ok((sql, filter_where.param_values))
    }

    fn build(&mut self, node: &FilterNode) -> Result<String, FilterError> {
        match node {
            FilterNode::And(children) | FilterNode::Or(children) => {
                if children.is_empty() {
                    return Ok(if matches!(node, FilterNode::And(_)) { "1=1" } else { "1=0" }.to_string());
                }
                if children.len() == 1 {
                    return self.build(&children[0]);
                }
                let joiner = if matches!(node, FilterNode::And(_)) { " AND " } else { " OR " };
                let parts = children
                    .iter()
                    .map(|child| self.build(child).map(|sql| format!("({})", sql)))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(parts.join(joiner))
            }
            FilterNode::Not(inner) => Ok(format!("NOT ({})", self.build(inner)?)),
            FilterNode::Condition(condition) => self.build_sql_condition(condition),
        }
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let quoted_column = format!("\"{}\"", condition.column.name);
        let column_type = condition.column.column_type;
        let data = &condition.data;

        if column_type == ColumnType::TextArray {
            return self.build_array_condition(&quoted_column, condition);
        }

        Ok(match condition.operator {
            FilterOp::Eq => {
                if data.is_null() { format!("{} IS NULL", quoted_column) }
                else { format!("{} = {}", quoted_column, self.param(data.clone(), column_type)) }
            }
            FilterOp::Ne => {
                if data.is_null() { format!("{} IS NOT NULL", quoted_column) }
                else { format!("{} <> {}", quoted_column, self.param(data.clone(), column_type)) }
            }
            FilterOp::Gt => format!("{} > {}", quoted_column, self.param(data.clone(), column_type)),
            FilterOp::Gte => format!("{} >= {}", quoted_column, self.param(data.clone(), column_type)),
            FilterOp::Lt => format!("{} < {}", quoted_column, self.param(data.clone(), column_type)),
            FilterOp::Lte => format!("{} <= {}", quoted_column, self.param(data.clone(), column_type)),
            FilterOp::Like => format!("{} LIKE {}", quoted_column, self.param(data.clone(), column_type)),
            FilterOp::ILike => format!("{} ILIKE {}", quoted_column, self.param(data.clone(), column_type)),
            FilterOp::In => {
                let values = Self::as_list(data);
                if values.is_empty() { return Ok("1=0".to_string()); }
                let params: Vec<String> = values.into_iter().map(|v| self.param(v, column_type)).collect();
                format!("{} IN ({})", quoted_column, params.join(", "))
            }
            FilterOp::Any | FilterOp::All => {
                return Err(FilterError::InvalidOperatorData(format!("array operator on scalar column '{}'", condition.column.name)));
            }
        })
    }

    fn build_array_condition(&mut self, quoted_column: &str, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let values = Self::as_list(&condition.data);
        Ok(match condition.operator {
            // Scalar equality against an array column means membership
            FilterOp::Eq => format!("{} = ANY({})", self.param(condition.data.clone(), ColumnType::TextArray), quoted_column),
            FilterOp::Ne => format!("NOT ({} = ANY({}))", self.param(condition.data.clone(), ColumnType::TextArray), quoted_column),
            FilterOp::Any | FilterOp::In => {
                if values.is_empty() { return Ok("1=0".to_string()); }
                let params: Vec<String> = values.into_iter().map(|v| self.param(v, ColumnType::TextArray)).collect();
                format!("{} && ARRAY[{}]", quoted_column, params.join(", "))
            }
            FilterOp::All => {
                if values.is_empty() { return Ok("1=1".to_string()); }
                let params: Vec<String> = values.into_iter().map(|v| self.param(v, ColumnType::TextArray)).collect();
                format!("{} @> ARRAY[{}]", quoted_column, params.join(", "))
            }
            _ => {
                return Err(FilterError::InvalidOperatorData(format!(
                    "operator {:?} is not supported on array column '{}'",
                    condition.operator, condition.column.name
                )))
            }
        })
    }

    pub(crate) fn as_list(data: &Value) -> Vec<Value> {
        match data {
            Value::Array(values) => values.clone(),
            other => vec![other.clone()],
        }
    }

    fn param(&mut self, value: Value, column_type: ColumnType) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}{}", self.param_index, column_type.sql_cast())
    }
}
