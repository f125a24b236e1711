use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::QueryAs;
use sqlx::{FromRow, PgPool, Postgres};

use super::manager::DatabaseError;
use super::models::ITEM_COLUMNS;
use crate::filter::types::SqlResult;
use crate::filter::{Filter, FilterData, FilterError};

impl From<FilterError> for DatabaseError {
    fn from(err: FilterError) -> Self {
        DatabaseError::QueryError(err.to_string())
    }
}

/// Compiled `SELECT` over the `items` table.
pub struct ItemQuery {
    sql: SqlResult,
}

impl ItemQuery {
    /// Validate the where-tree against the item columns and render SQL.
    pub fn compile(data: &FilterData) -> Result<Self, DatabaseError> {
        let mut filter = Filter::new("items", ITEM_COLUMNS)?;
        filter.assign(data)?;
        Ok(Self { sql: filter.to_sql()? })
    }

    pub async fn fetch<R>(&self, pool: &PgPool) -> Result<Vec<R>, DatabaseError>
    where
        R: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        if crate::config::CONFIG.filter.debug_logging {
            tracing::debug!(query = %self.sql.query, params = self.sql.params.len(), "item query");
        }
        let query = self
            .sql
            .params
            .iter()
            .fold(sqlx::query_as::<_, R>(&self.sql.query), bind_value);
        Ok(query.fetch_all(pool).await?)
    }
}

fn bind_value<'q, R>(query: QueryAs<'q, Postgres, R, PgArguments>, value: &'q Value) -> QueryAs<'q, Postgres, R, PgArguments>
where
    R: for<'r> FromRow<'r, PgRow>,
{
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => query.bind(i),
            (None, Some(f)) => query.bind(f),
            (None, None) => query.bind(n.to_string()),
        },
        Value::String(s) => query.bind(s.as_str()),
        // Lists expand to one placeholder per element before binding.
        Value::Array(_) | Value::Object(_) => query.bind(value.to_string()),
    }
}
