use axum::{extract::Path, Extension, Json};
use puzzle_core::Puzzle;
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;

use crate::auth::middleware::{AuthUser, MaybeAuthUser};
use crate::db::{puzzles, users};
use crate::error::AppError;

/// Unapproved puzzles are only visible to their author and reviewers.
pub(crate) fn visible_to(puzzle: &Puzzle, user: Option<&AuthUser>) -> bool {
    puzzle.approved
        || user.is_some_and(|u| {
            u.id == puzzle.author || u.role().can_review() || puzzle.reviewers.contains(&u.id)
        })
}

/// Load a puzzle the user may see. Hidden puzzles look missing.
pub(crate) async fn visible_puzzle(
    pool: &PgPool,
    id: i64,
    user: Option<&AuthUser>,
) -> Result<Puzzle, AppError> {
    let not_found = || AppError::NotFound(format!("Puzzle {id} not found"));
    let puzzle = puzzles::get_puzzle(pool, id).await?.ok_or_else(not_found)?;
    if !visible_to(&puzzle, user) {
        return Err(not_found());
    }
    Ok(puzzle)
}

/// GET /api/puzzles/{id}
/// Public data for one puzzle.
pub async fn get_puzzle(
    Extension(pool): Extension<PgPool>,
    MaybeAuthUser(user): MaybeAuthUser,
    Path(id): Path<i64>,
) -> Result<Json<JsonValue>, AppError> {
    let puzzle = visible_puzzle(&pool, id, user.as_ref()).await?;
    let author = users::get_username(&pool, puzzle.author).await?;
    Ok(Json(json!({
        "id": puzzle.id,
        "variant": puzzle.variant,
        "initialFen": puzzle.initial_fen,
        "author": author,
        "rating": puzzle.rating.value.round() as i64,
        "explanation": puzzle.explanation_safe(),
        "approved": puzzle.approved,
        "inReview": puzzle.in_review,
        "dateSubmitted": puzzle.date_submitted_utc.map(|d| d.to_rfc3339()),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use puzzle_core::{Rating, Variant};

    fn user(id: i64, role: &str) -> AuthUser {
        AuthUser {
            id,
            username: format!("user{id}"),
            email: format!("user{id}@example.com"),
            role: role.into(),
            created_at: chrono::Utc::now(),
        }
    }

    fn pending_puzzle() -> Puzzle {
        Puzzle {
            id: 3,
            variant: Variant::Atomic,
            initial_fen: "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1".into(),
            solutions: vec!["e2e4".into()],
            rating: Rating::default(),
            rating_updated_at: None,
            author: 1,
            reviewers: vec![4],
            in_review: true,
            approved: false,
            explanation_unsafe: String::new(),
            date_submitted_utc: None,
        }
    }

    #[test]
    fn test_pending_puzzle_visibility() {
        let puzzle = pending_puzzle();
        assert!(!visible_to(&puzzle, None));
        assert!(!visible_to(&puzzle, Some(&user(2, "none"))));
        assert!(visible_to(&puzzle, Some(&user(1, "none"))));
        assert!(visible_to(&puzzle, Some(&user(4, "none"))));
        assert!(visible_to(&puzzle, Some(&user(5, "puzzle_reviewer"))));

        let approved = Puzzle {
            approved: true,
            ..puzzle
        };
        assert!(visible_to(&approved, None));
    }
}
