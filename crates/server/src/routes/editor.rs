//! Puzzle editor: authors register a position, play out lines on the board,
//! then submit the solution text for publication or review.

use axum::{extract::Path, Extension, Json};
use chrono::Utc;
use puzzle_core::variant::color_name;
use puzzle_core::{PuzzleError, Variant};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;

use crate::auth::middleware::AuthUser;
use crate::db::{counters, puzzles};
use crate::error::AppError;
use crate::store::EditorStore;

#[derive(Deserialize)]
pub struct RegisterDraftRequest {
    pub fen: String,
    pub variant: String,
}

#[derive(Deserialize)]
pub struct MoveRequest {
    pub origin: String,
    pub destination: String,
    pub promotion: Option<String>,
}

#[derive(Deserialize)]
pub struct SubmitRequest {
    pub solution: String,
    #[serde(default)]
    pub explanation: String,
}

fn parse_draft_id(raw: &str) -> Result<i32, PuzzleError> {
    raw.trim().parse().map_err(|_| PuzzleError::InvalidId)
}

/// POST /api/puzzles/editor/register
pub async fn register(
    Extension(editor): Extension<EditorStore>,
    user: AuthUser,
    Json(req): Json<RegisterDraftRequest>,
) -> Result<Json<JsonValue>, AppError> {
    let variant: Variant = req.variant.parse()?;
    let id = editor.register(user.id, variant, &req.fen).await?;
    Ok(Json(json!({ "success": true, "id": id })))
}

/// GET /api/puzzles/editor/{id}/moves
pub async fn valid_moves(
    Extension(editor): Extension<EditorStore>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<JsonValue>, AppError> {
    let draft = editor.get(parse_draft_id(&id)?).await?;
    let draft = draft.lock().await;
    draft.ensure_author(user.id)?;
    Ok(Json(json!({
        "success": true,
        "dests": draft.dests(),
        "whoseturn": color_name(draft.whose_turn()),
    })))
}

/// POST /api/puzzles/editor/{id}/move
pub async fn submit_move(
    Extension(editor): Extension<EditorStore>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<JsonValue>, AppError> {
    let draft = editor.get(parse_draft_id(&id)?).await?;
    let mut draft = draft.lock().await;
    draft.ensure_author(user.id)?;
    let fen = draft.submit_move(&req.origin, &req.destination, req.promotion.as_deref())?;
    Ok(Json(json!({ "success": true, "fen": fen })))
}

/// POST /api/puzzles/editor/{id}/variation
pub async fn new_variation(
    Extension(editor): Extension<EditorStore>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<JsonValue>, AppError> {
    let draft = editor.get(parse_draft_id(&id)?).await?;
    let mut draft = draft.lock().await;
    draft.ensure_author(user.id)?;
    let fen = draft.new_variation()?;
    Ok(Json(json!({ "success": true, "fen": fen })))
}

/// POST /api/puzzles/editor/{id}/submit
pub async fn submit(
    Extension(pool): Extension<PgPool>,
    Extension(editor): Extension<EditorStore>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<JsonValue>, AppError> {
    let draft_id = parse_draft_id(&id)?;
    let can_review = user.role().can_review();
    let pool = &pool;

    let puzzle = editor
        .publish(
            draft_id,
            user.id,
            |draft| draft.to_puzzle(&req.solution, &req.explanation, can_review, Utc::now()),
            |mut puzzle| async move {
                puzzle.id = counters::next_value(pool, counters::PUZZLE_ID).await?;
                if !puzzles::insert_puzzle(pool, &puzzle).await? {
                    return Err(AppError::from(PuzzleError::PersistenceConflict(
                        "Something went wrong, please try again.".into(),
                    )));
                }
                Ok(puzzle)
            },
        )
        .await?;

    tracing::info!(
        puzzle_id = puzzle.id,
        author = user.id,
        variant = %puzzle.variant,
        approved = puzzle.approved,
        "Puzzle submitted"
    );
    Ok(Json(json!({
        "success": true,
        "link": format!("/Puzzle/{}", puzzle.id),
    })))
}
