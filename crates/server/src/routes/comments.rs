//! Threaded comments under a puzzle.

use axum::{extract::Path, Extension, Json};
use chrono::Utc;
use puzzle_core::PuzzleError;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;

use crate::auth::middleware::{AuthUser, MaybeAuthUser};
use crate::db::comments::{self, Comment};
use crate::error::AppError;
use crate::routes::puzzles::visible_puzzle;

const MAX_COMMENT_CHARS: usize = 2000;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostCommentRequest {
    pub body: String,
    pub parent_id: Option<i64>,
}

fn validate_body(body: &str) -> Result<&str, AppError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(AppError::BadRequest("Comment cannot be empty".into()));
    }
    if body.chars().count() > MAX_COMMENT_CHARS {
        return Err(AppError::BadRequest(format!(
            "Comment must be at most {MAX_COMMENT_CHARS} characters"
        )));
    }
    Ok(body)
}

/// The comment's author and comment moderators may delete it.
fn can_delete(user: &AuthUser, comment: &Comment) -> bool {
    comment.author == user.id || user.role().can_moderate_comments()
}

/// GET /api/puzzles/{id}/comments
pub async fn list_comments(
    Extension(pool): Extension<PgPool>,
    MaybeAuthUser(user): MaybeAuthUser,
    Path(id): Path<i64>,
) -> Result<Json<JsonValue>, AppError> {
    let puzzle = visible_puzzle(&pool, id, user.as_ref()).await?;
    let all = comments::get_comments_for_puzzle(&pool, puzzle.id).await?;
    let threaded: Vec<JsonValue> = comments::thread_comments(&all)
        .into_iter()
        .map(|(depth, c)| c.to_json(depth))
        .collect();

    Ok(Json(json!({ "success": true, "comments": threaded })))
}

/// POST /api/puzzles/{id}/comments
pub async fn post_comment(
    Extension(pool): Extension<PgPool>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<PostCommentRequest>,
) -> Result<Json<JsonValue>, AppError> {
    let body = validate_body(&req.body)?;
    let puzzle = visible_puzzle(&pool, id, Some(&user)).await?;

    if let Some(parent_id) = req.parent_id {
        let parent = comments::get_comment(&pool, parent_id).await?;
        if !parent.is_some_and(|p| p.puzzle_id == puzzle.id) {
            return Err(AppError::BadRequest(
                "The comment being replied to does not exist".into(),
            ));
        }
    }

    let comment_id =
        comments::create_comment(&pool, user.id, puzzle.id, req.parent_id, body, Utc::now())
            .await?;
    tracing::debug!(comment_id, puzzle_id = puzzle.id, author = user.id, "Comment posted");

    Ok(Json(json!({ "success": true, "id": comment_id })))
}

/// DELETE /api/comments/{id}
pub async fn delete_comment(
    Extension(pool): Extension<PgPool>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<JsonValue>, AppError> {
    let comment = comments::get_comment(&pool, id)
        .await?
        .ok_or_else(|| PuzzleError::NotFound("The given comment could not be found.".into()))?;
    if !can_delete(&user, &comment) {
        return Err(PuzzleError::Unauthorized.into());
    }

    if comments::soft_delete_comment(&pool, id).await? {
        tracing::info!(comment_id = id, deleted_by = user.id, "Comment deleted");
    }
    Ok(Json(json!({ "success": true })))
}
