use chrono::{DateTime, Utc};
use puzzle_core::{Puzzle, RatedParty, Rating, Variant};
use sqlx::{PgConnection, PgPool};

use crate::error::AppError;

const PUZZLE_COLUMNS: &str = "id, variant, initial_fen, solutions, rating_value, rating_deviation, \
    rating_volatility, rating_updated_at, author, reviewers, in_review, approved, explanation, date_submitted";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PuzzleRow {
    pub id: i64,
    pub variant: String,
    pub initial_fen: String,
    pub solutions: Vec<String>,
    pub rating_value: f64,
    pub rating_deviation: f64,
    pub rating_volatility: f64,
    pub rating_updated_at: Option<DateTime<Utc>>,
    pub author: i64,
    pub reviewers: Vec<i64>,
    pub in_review: bool,
    pub approved: bool,
    pub explanation: String,
    pub date_submitted: DateTime<Utc>,
}

impl TryFrom<PuzzleRow> for Puzzle {
    type Error = AppError;

    fn try_from(row: PuzzleRow) -> Result<Self, Self::Error> {
        let variant = row.variant.parse::<Variant>().map_err(|_| {
            AppError::Internal(format!("Puzzle {} has unknown variant '{}'", row.id, row.variant))
        })?;
        Ok(Puzzle {
            id: row.id,
            variant,
            initial_fen: row.initial_fen,
            solutions: row.solutions,
            rating: Rating::new(row.rating_value, row.rating_deviation, row.rating_volatility),
            rating_updated_at: row.rating_updated_at,
            author: row.author,
            reviewers: row.reviewers,
            in_review: row.in_review,
            approved: row.approved,
            explanation_unsafe: row.explanation,
            date_submitted_utc: Some(row.date_submitted),
        })
    }
}

pub async fn get_puzzle(pool: &PgPool, id: i64) -> Result<Option<Puzzle>, AppError> {
    let query = format!("SELECT {PUZZLE_COLUMNS} FROM puzzles WHERE id = $1");
    sqlx::query_as::<_, PuzzleRow>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Sqlx)?
        .map(Puzzle::try_from)
        .transpose()
}

/// Insert a new puzzle. Returns `false` when a puzzle with the same ID
/// already exists; nothing is written in that case.
pub async fn insert_puzzle(pool: &PgPool, puzzle: &Puzzle) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"INSERT INTO puzzles
               (id, variant, initial_fen, solutions, rating_value, rating_deviation, rating_volatility,
                rating_updated_at, author, reviewers, in_review, approved, explanation, date_submitted)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, COALESCE($14, NOW()))
           ON CONFLICT (id) DO NOTHING"#,
    )
    .bind(puzzle.id)
    .bind(puzzle.variant.as_str())
    .bind(&puzzle.initial_fen)
    .bind(&puzzle.solutions)
    .bind(puzzle.rating.value)
    .bind(puzzle.rating.deviation)
    .bind(puzzle.rating.volatility)
    .bind(puzzle.rating_updated_at)
    .bind(puzzle.author)
    .bind(&puzzle.reviewers)
    .bind(puzzle.in_review)
    .bind(puzzle.approved)
    .bind(&puzzle.explanation_unsafe)
    .bind(puzzle.date_submitted_utc)
    .execute(pool)
    .await
    .map_err(AppError::Sqlx)?;

    Ok(result.rows_affected() == 1)
}

/// Pick a random approved puzzle of `variant` whose ID is not in `exclude`
/// and which was not written by `requester`.
pub async fn random_puzzle_id(
    pool: &PgPool,
    variant: Variant,
    exclude: &[i64],
    requester: Option<i64>,
) -> Result<Option<i64>, AppError> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"SELECT id FROM puzzles
           WHERE variant = $1
             AND approved
             AND NOT (id = ANY($2))
             AND ($3::BIGINT IS NULL OR author <> $3)
           ORDER BY random()
           LIMIT 1"#,
    )
    .bind(variant.as_str())
    .bind(exclude)
    .bind(requester)
    .fetch_optional(pool)
    .await
    .map_err(AppError::Sqlx)?;

    Ok(row.map(|r| r.0))
}

/// Lock and read a puzzle's current rating.
pub async fn get_rating_for_update(
    conn: &mut PgConnection,
    id: i64,
) -> Result<Option<RatedParty>, AppError> {
    let row: Option<(f64, f64, f64, Option<DateTime<Utc>>)> = sqlx::query_as(
        r#"SELECT rating_value, rating_deviation, rating_volatility, rating_updated_at
           FROM puzzles WHERE id = $1
           FOR UPDATE"#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await
    .map_err(AppError::Sqlx)?;

    Ok(row.map(|(value, deviation, volatility, updated_at)| {
        RatedParty::new(Rating::new(value, deviation, volatility), updated_at)
    }))
}

pub async fn update_rating(
    conn: &mut PgConnection,
    id: i64,
    rating: &Rating,
    updated_at: DateTime<Utc>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"UPDATE puzzles SET
               rating_value = $2, rating_deviation = $3, rating_volatility = $4, rating_updated_at = $5
           WHERE id = $1"#,
    )
    .bind(id)
    .bind(rating.value)
    .bind(rating.deviation)
    .bind(rating.volatility)
    .bind(updated_at)
    .execute(conn)
    .await
    .map_err(AppError::Sqlx)?;
    Ok(())
}
