use thiserror::Error;

/// Rejections raised while parsing an item query or compiling a where-tree.
/// All of them are the caller's fault and surface as 400s.
#[derive(Error, Debug)]
pub enum FilterError {
    // Query string
    #[error("Invalid item type: {0}")]
    InvalidItemType(String),

    #[error("Invalid value for '{field}': {value} is not an integer")]
    InvalidBound { field: String, value: String },

    #[error("Invalid sortBy: {0} (expected startDate, endDate, startDate-desc or endDate-desc)")]
    InvalidSort(String),

    #[error("limit must be a non-negative integer, got {0}")]
    InvalidLimit(String),

    #[error("offset must be a non-negative integer, got {0}")]
    InvalidOffset(String),

    // Where-tree
    #[error("Unknown table: {0}")]
    InvalidTableName(String),

    #[error("Unknown column: {0}")]
    InvalidColumn(String),

    #[error("Malformed where clause: {0}")]
    InvalidWhereClause(String),

    #[error("Operator {0} is not supported")]
    UnsupportedOperator(String),

    #[error("Bad operand: {0}")]
    InvalidOperatorData(String),
}
