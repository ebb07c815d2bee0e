//! Puzzle training: pick a puzzle, set it up in a session, submit moves.

use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use puzzle_core::dests::{dests_for_moves, DestinationMap};
use puzzle_core::variant::color_name;
use puzzle_core::{MoveOutcome, PuzzleError, RatingUpdater, Variant};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;

use crate::auth::middleware::MaybeAuthUser;
use crate::config::Config;
use crate::db::{puzzles, users};
use crate::error::AppError;
use crate::ratings;
use crate::store::SessionStore;

const SESSION_NOT_FOUND: &str = "The training session could not be found.";
const PUZZLE_NOT_FOUND: &str = "The given puzzle could not be found.";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RandomQuery {
    pub training_session_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupRequest {
    pub id: String,
    pub training_session_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitMoveRequest {
    pub training_session_id: String,
    pub origin: String,
    pub destination: String,
    pub promotion: Option<String>,
}

/// Response to one submitted move. Which fields are present depends on the
/// outcome: `correct` is -1 (failed), 0 (keep going) or 1 (solved).
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitMoveResponse {
    pub success: bool,
    pub correct: i8,
    pub check: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fen: Option<String>,
    /// Board after every move of this turn, the opponent's reply included.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_fen: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub play: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fen_after_play: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_after_auto_move: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dests: Option<DestinationMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replay_fens: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replay_checks: Option<Vec<bool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replay_moves: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i64>,
}

impl From<&MoveOutcome> for SubmitMoveResponse {
    fn from(outcome: &MoveOutcome) -> Self {
        let mut response = SubmitMoveResponse {
            success: true,
            correct: outcome.correct(),
            final_fen: outcome.final_fen().map(str::to_string),
            ..Default::default()
        };
        match outcome {
            MoveOutcome::Continue {
                fen,
                check,
                play,
                moves,
            } => {
                response.fen = Some(fen.clone());
                response.check = *check;
                response.play = Some(play.mv.clone());
                response.fen_after_play = Some(play.fen.clone());
                response.check_after_auto_move = Some(play.check);
                response.dests = Some(dests_for_moves(moves));
            }
            MoveOutcome::Solved { fen, check, play } => {
                response.fen = Some(fen.clone());
                response.check = *check;
                if let Some(play) = play {
                    response.play = Some(play.mv.clone());
                    response.fen_after_play = Some(play.fen.clone());
                    response.check_after_auto_move = Some(play.check);
                }
            }
            MoveOutcome::Failed {
                replay,
                explanation,
            } => {
                response.explanation = Some(explanation.clone());
                response.replay_fens = Some(replay.fens.clone());
                response.replay_checks = Some(replay.checks.clone());
                response.replay_moves = Some(replay.moves.clone());
            }
        }
        response
    }
}

/// `Mixed` picks one of the supported variants at random.
fn pick_variant(name: &str) -> Result<Variant, PuzzleError> {
    if name.trim().eq_ignore_ascii_case("mixed") {
        return Variant::ALL
            .choose(&mut rand::thread_rng())
            .copied()
            .ok_or_else(|| PuzzleError::UnsupportedVariant(name.to_string()));
    }
    name.parse()
}

/// GET /api/puzzles/train/random/{variant}?trainingSessionId=...
pub async fn random_puzzle(
    Extension(pool): Extension<PgPool>,
    Extension(sessions): Extension<SessionStore>,
    MaybeAuthUser(user): MaybeAuthUser,
    Path(variant): Path<String>,
    Query(q): Query<RandomQuery>,
) -> Result<Json<JsonValue>, AppError> {
    let variant = pick_variant(&variant)?;

    let exclude = match (&user, &q.training_session_id) {
        (Some(user), _) => users::solved_puzzle_ids(&pool, user.id).await?,
        (None, Some(token)) => match sessions.get(token).await {
            Some(session) => session.lock().await.past_puzzle_ids().to_vec(),
            None => Vec::new(),
        },
        (None, None) => Vec::new(),
    };

    let requester = user.as_ref().map(|u| u.id);
    match puzzles::random_puzzle_id(&pool, variant, &exclude, requester).await? {
        Some(id) => Ok(Json(json!({ "success": true, "id": id }))),
        None => Ok(Json(json!({ "success": true, "allDone": true }))),
    }
}

/// POST /api/puzzles/train/setup
pub async fn setup(
    Extension(pool): Extension<PgPool>,
    Extension(sessions): Extension<SessionStore>,
    Json(req): Json<SetupRequest>,
) -> Result<Json<JsonValue>, AppError> {
    let id: i64 = req.id.trim().parse().map_err(|_| PuzzleError::InvalidId)?;
    let puzzle = puzzles::get_puzzle(&pool, id)
        .await?
        .ok_or_else(|| PuzzleError::NotFound(PUZZLE_NOT_FOUND.into()))?;
    let author = users::get_username(&pool, puzzle.author).await?;

    let (token, session) = match req.training_session_id {
        Some(token) => {
            let session = sessions
                .get(&token)
                .await
                .ok_or_else(|| PuzzleError::NotFound(SESSION_NOT_FOUND.into()))?;
            (token, session)
        }
        None => sessions.create().await,
    };

    let mut session = session.lock().await;
    session.setup(Arc::new(puzzle))?;

    let whose_turn = session.whose_turn().map(color_name);
    let variant = session.current().map(|p| p.variant);
    Ok(Json(json!({
        "success": true,
        "trainingSessionId": token,
        "author": author,
        "fen": session.fen(),
        "dests": dests_for_moves(&session.legal_moves()),
        "whoseTurn": whose_turn,
        "variant": variant,
    })))
}

/// POST /api/puzzles/train/move
pub async fn submit_move(
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Config>,
    Extension(sessions): Extension<SessionStore>,
    MaybeAuthUser(user): MaybeAuthUser,
    Json(req): Json<SubmitMoveRequest>,
) -> Result<Json<SubmitMoveResponse>, AppError> {
    let session = sessions
        .get(&req.training_session_id)
        .await
        .ok_or_else(|| PuzzleError::NotFound(SESSION_NOT_FOUND.into()))?;
    // Held until the rating update is written, so the next move waits for it.
    let mut session = session.lock().await;

    let outcome = session.apply_move(&req.origin, &req.destination, req.promotion.as_deref())?;
    let mut response = SubmitMoveResponse::from(&outcome);
    if !outcome.is_terminal() {
        return Ok(Json(response));
    }

    let Some(puzzle) = session.current().cloned() else {
        return Ok(Json(response));
    };
    let mut rating = puzzle.rating;

    if let (Some(user), Some(started), Some(ended)) =
        (user, session.started_utc(), session.ended_utc())
    {
        let updater = RatingUpdater::new(config.rating_config());
        rating = ratings::adjust_ratings(
            &pool,
            &updater,
            user.id,
            &puzzle,
            outcome.correct() == 1,
            started,
            ended,
        )
        .await?;
    }

    response.rating = Some(rating.value.round() as i64);
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use puzzle_core::{AutoPlay, Replay};

    #[test]
    fn test_continue_response_fields() {
        let outcome = MoveOutcome::Continue {
            fen: "after-solver".into(),
            check: true,
            play: AutoPlay {
                mv: "e7e5".into(),
                fen: "after-reply".into(),
                check: false,
            },
            moves: Vec::new(),
        };
        let json = serde_json::to_value(SubmitMoveResponse::from(&outcome)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["correct"], 0);
        assert_eq!(json["check"], true);
        assert_eq!(json["play"], "e7e5");
        assert_eq!(json["fenAfterPlay"], "after-reply");
        assert_eq!(json["checkAfterAutoMove"], false);
        assert!(json["dests"].is_object());
        assert!(json.get("replayFens").is_none());
        assert!(json.get("rating").is_none());
        assert_eq!(json["finalFen"], "after-reply");
    }

    #[test]
    fn test_solved_with_reply_reports_both_positions() {
        let outcome = MoveOutcome::Solved {
            fen: "after-solver".into(),
            check: false,
            play: Some(AutoPlay {
                mv: "e7e5".into(),
                fen: "after-reply".into(),
                check: false,
            }),
        };
        let json = serde_json::to_value(SubmitMoveResponse::from(&outcome)).unwrap();
        assert_eq!(json["correct"], 1);
        assert_eq!(json["fen"], "after-solver");
        assert_eq!(json["fenAfterPlay"], "after-reply");
        assert_eq!(json["finalFen"], "after-reply");
    }

    #[test]
    fn test_solved_without_reply_omits_play() {
        let outcome = MoveOutcome::Solved {
            fen: "final".into(),
            check: false,
            play: None,
        };
        let json = serde_json::to_value(SubmitMoveResponse::from(&outcome)).unwrap();
        assert_eq!(json["correct"], 1);
        assert_eq!(json["fen"], "final");
        assert_eq!(json["finalFen"], "final");
        assert!(json.get("play").is_none());
        assert!(json.get("dests").is_none());
    }

    #[test]
    fn test_failed_response_carries_replay() {
        let outcome = MoveOutcome::Failed {
            replay: Replay {
                fens: vec!["a".into(), "b".into(), "c".into()],
                checks: vec![false, false, true],
                moves: vec!["e2e4".into(), "e7e5".into()],
            },
            explanation: "&lt;why&gt;".into(),
        };
        let json = serde_json::to_value(SubmitMoveResponse::from(&outcome)).unwrap();
        assert_eq!(json["correct"], -1);
        assert_eq!(json["check"], false);
        assert_eq!(json["replayFens"].as_array().unwrap().len(), 3);
        assert_eq!(json["replayChecks"][2], true);
        assert_eq!(json["replayMoves"][1], "e7e5");
        assert_eq!(json["explanation"], "&lt;why&gt;");
        assert!(json.get("fen").is_none());
        assert!(json.get("finalFen").is_none());
    }

    #[test]
    fn test_pick_variant() {
        assert_eq!(pick_variant("atomic"), Ok(Variant::Atomic));
        assert!(Variant::ALL.contains(&pick_variant("Mixed").unwrap()));
        assert!(matches!(
            pick_variant("Chess960"),
            Err(PuzzleError::UnsupportedVariant(_))
        ));
    }
}
