use sqlx::PgPool;

use crate::error::AppError;

pub const PUZZLE_ID: &str = "puzzle_id";

/// Increment the named counter and return its new value. The first call
/// for a name returns 1.
pub async fn next_value(pool: &PgPool, name: &str) -> Result<i64, AppError> {
    let row: (i64,) = sqlx::query_as(
        r#"INSERT INTO counters (name, value) VALUES ($1, 1)
           ON CONFLICT (name) DO UPDATE SET value = counters.value + 1
           RETURNING value"#,
    )
    .bind(name)
    .fetch_one(pool)
    .await
    .map_err(AppError::Sqlx)?;

    Ok(row.0)
}
