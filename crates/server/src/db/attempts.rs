use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::error::AppError;

/// One rated attempt at a puzzle.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub user_id: i64,
    pub puzzle_id: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub success: bool,
    pub user_rating_before: f64,
    pub user_rating_after: f64,
}

pub async fn record_attempt(conn: &mut PgConnection, attempt: &Attempt) -> Result<(), AppError> {
    sqlx::query(
        r#"INSERT INTO puzzle_attempts
               (user_id, puzzle_id, started_at, ended_at, success, user_rating_before, user_rating_after)
           VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
    )
    .bind(attempt.user_id)
    .bind(attempt.puzzle_id)
    .bind(attempt.started_at)
    .bind(attempt.ended_at)
    .bind(attempt.success)
    .bind(attempt.user_rating_before)
    .bind(attempt.user_rating_after)
    .execute(conn)
    .await
    .map_err(AppError::Sqlx)?;
    Ok(())
}
