//! Rating adjustment after a finished training attempt.

use chrono::{DateTime, Utc};
use puzzle_core::{Puzzle, Rating, RatingUpdater};
use sqlx::PgPool;

use crate::db::{attempts, puzzles, ratings, users};
use crate::error::AppError;

/// Rate one finished attempt and persist the result: both ratings, the
/// attempt record and, on success, the solved list. Runs in one transaction
/// with the two rating rows locked, so concurrent attempts on the same puzzle
/// or by the same user apply one after another.
///
/// Returns the puzzle's new rating.
pub async fn adjust_ratings(
    pool: &PgPool,
    updater: &RatingUpdater,
    user_id: i64,
    puzzle: &Puzzle,
    solved: bool,
    started: DateTime<Utc>,
    ended: DateTime<Utc>,
) -> Result<Rating, AppError> {
    let mut tx = pool.begin().await.map_err(AppError::Sqlx)?;

    let puzzle_before = puzzles::get_rating_for_update(&mut tx, puzzle.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Puzzle {} no longer exists", puzzle.id)))?;
    let user_before = ratings::get_user_rating_for_update(&mut tx, user_id, puzzle.variant).await?;

    let update = updater.update(&user_before, &puzzle_before, solved, started, ended);

    ratings::upsert_user_rating(&mut tx, user_id, puzzle.variant, &update.solver, ended).await?;
    puzzles::update_rating(&mut tx, puzzle.id, &update.puzzle, ended).await?;
    attempts::record_attempt(
        &mut tx,
        &attempts::Attempt {
            user_id,
            puzzle_id: puzzle.id,
            started_at: started,
            ended_at: ended,
            success: solved,
            user_rating_before: user_before.rating.value,
            user_rating_after: update.solver.value,
        },
    )
    .await?;
    if solved {
        users::add_solved_puzzle(&mut tx, user_id, puzzle.id).await?;
    }

    tx.commit().await.map_err(AppError::Sqlx)?;

    tracing::info!(
        user_id,
        puzzle_id = puzzle.id,
        variant = %puzzle.variant,
        solved,
        user_before = user_before.rating.value,
        user_after = update.solver.value,
        puzzle_after = update.puzzle.value,
        "Ratings adjusted"
    );

    Ok(update.puzzle)
}
