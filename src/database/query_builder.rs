use sqlx::{self, postgres::{PgArguments, PgRow}, FromRow, PgPool, Postgres};

use crate::database::manager::DatabaseError;
use crate::filter::{SqlParam, SqlResult};

/// Runs a generated statement with its positional parameters bound in order.
pub struct QueryBuilder<T> {
    sql: SqlResult,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> QueryBuilder<T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    pub fn new(sql: SqlResult) -> Self {
        tracing::debug!(
            query = %sql.query,
            params = sql.params.len(),
            nulls = sql.params.iter().filter(|p| p.is_null()).count(),
            "prepared statement"
        );
        Self {
            sql,
            _phantom: std::marker::PhantomData,
        }
    }

    pub async fn select_all(&self, pool: &PgPool) -> Result<Vec<T>, DatabaseError> {
        let mut q = sqlx::query_as::<_, T>(&self.sql.query);
        for p in self.sql.params.iter() {
            q = bind_param_query_as(q, p);
        }
        Ok(q.fetch_all(pool).await?)
    }

    pub async fn select_optional(&self, pool: &PgPool) -> Result<Option<T>, DatabaseError> {
        let mut q = sqlx::query_as::<_, T>(&self.sql.query);
        for p in self.sql.params.iter() {
            q = bind_param_query_as(q, p);
        }
        Ok(q.fetch_optional(pool).await?)
    }
}

fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, Postgres, O, PgArguments>,
    p: &SqlParam,
) -> sqlx::query::QueryAs<'q, Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    match p {
        SqlParam::Text(v) => q.bind(v.clone()),
        SqlParam::Int(v) => q.bind(*v),
        SqlParam::Decimal(v) => q.bind(*v),
    }
}
