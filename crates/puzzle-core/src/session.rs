//! Puzzle training session: one solver working through puzzles one at a time.
//!
//! The session owns its own `VariantGame`, rebuilt from the puzzle's initial
//! FEN on every setup, and a cursor into the puzzle's solution tree. Submitted
//! moves are matched against the tree, the opponent's replies are played
//! automatically, and the first mismatch ends the attempt with a replay of the
//! reference line.
//!
//! States: `Idle -> Active -> Resolved(Correct | Incorrect) -> Active -> ...`.
//! A setup while `Active` starts the new puzzle over the unfinished one.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use shakmaty::{Color, Move};

use crate::error::PuzzleError;
use crate::moves::HalfMove;
use crate::puzzle::Puzzle;
use crate::solution_tree::{Cursor, SolutionTree};
use crate::variant::VariantGame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Correct,
    Incorrect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active,
    Resolved(Resolution),
}

/// The opponent move played automatically after an accepted solver move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoPlay {
    pub mv: String,
    pub fen: String,
    pub check: bool,
}

/// The reference line played out from the initial position.
/// `fens` and `checks` have one more entry than `moves`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Replay {
    pub fens: Vec<String>,
    pub checks: Vec<bool>,
    pub moves: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum MoveOutcome {
    /// Move accepted, opponent replied, more solver moves remain.
    Continue {
        fen: String,
        check: bool,
        play: AutoPlay,
        /// Legal moves for the solver's next ply.
        moves: Vec<Move>,
    },
    /// Puzzle solved. `play` is set when the line ended on an opponent reply.
    Solved {
        fen: String,
        check: bool,
        play: Option<AutoPlay>,
    },
    /// Wrong move; the attempt is over.
    Failed { replay: Replay, explanation: String },
}

impl MoveOutcome {
    /// `1` solved, `0` still active, `-1` failed.
    pub fn correct(&self) -> i8 {
        match self {
            MoveOutcome::Continue { .. } => 0,
            MoveOutcome::Solved { .. } => 1,
            MoveOutcome::Failed { .. } => -1,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, MoveOutcome::Continue { .. })
    }

    /// Position after every automatically played move, if the attempt is
    /// still on the board.
    pub fn final_fen(&self) -> Option<&str> {
        match self {
            MoveOutcome::Continue { play, .. } => Some(play.fen.as_str()),
            MoveOutcome::Solved { fen, play, .. } => {
                Some(play.as_ref().map_or(fen.as_str(), |p| p.fen.as_str()))
            }
            MoveOutcome::Failed { .. } => None,
        }
    }
}

/// The puzzle currently on the board.
#[derive(Debug, Clone)]
struct InPlay {
    puzzle: Arc<Puzzle>,
    tree: Arc<SolutionTree>,
    game: VariantGame,
    solver: Color,
    cursor: Cursor,
    played: Vec<HalfMove>,
}

#[derive(Debug, Clone)]
pub struct TrainingSession {
    session_id: String,
    state: SessionState,
    current: Option<InPlay>,
    started_utc: Option<DateTime<Utc>>,
    ended_utc: Option<DateTime<Utc>>,
    past_puzzle_ids: Vec<i64>,
}

impl TrainingSession {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            state: SessionState::Idle,
            current: None,
            started_utc: None,
            ended_utc: None,
            past_puzzle_ids: Vec::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn current(&self) -> Option<&Arc<Puzzle>> {
        self.current.as_ref().map(|c| &c.puzzle)
    }

    pub fn started_utc(&self) -> Option<DateTime<Utc>> {
        self.started_utc
    }

    pub fn ended_utc(&self) -> Option<DateTime<Utc>> {
        self.ended_utc
    }

    /// Puzzles set up in this session, oldest first.
    pub fn past_puzzle_ids(&self) -> &[i64] {
        &self.past_puzzle_ids
    }

    /// Half-moves on the board so far, solver and opponent alike.
    pub fn played(&self) -> &[HalfMove] {
        match &self.current {
            Some(current) => &current.played,
            None => &[],
        }
    }

    pub fn fen(&self) -> Option<String> {
        self.current.as_ref().map(|c| c.game.fen())
    }

    pub fn whose_turn(&self) -> Option<Color> {
        self.current.as_ref().map(|c| c.game.whose_turn())
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        self.current
            .as_ref()
            .map(|c| c.game.legal_moves())
            .unwrap_or_default()
    }

    pub fn setup(&mut self, puzzle: Arc<Puzzle>) -> Result<(), PuzzleError> {
        self.setup_at(puzzle, Utc::now())
    }

    /// Put a new puzzle on the board. An attempt still in progress is
    /// abandoned unrated; nothing is recorded for it.
    pub fn setup_at(&mut self, puzzle: Arc<Puzzle>, now: DateTime<Utc>) -> Result<(), PuzzleError> {
        let tree = Arc::new(puzzle.solution_tree()?);
        let game = VariantGame::construct(puzzle.variant, &puzzle.initial_fen)?;
        let solver = game.whose_turn();

        if let (SessionState::Active, Some(abandoned)) = (self.state, self.current.as_ref()) {
            tracing::debug!(
                session_id = %self.session_id,
                puzzle_id = abandoned.puzzle.id,
                "Active puzzle abandoned"
            );
        }
        tracing::debug!(
            session_id = %self.session_id,
            puzzle_id = puzzle.id,
            variant = %puzzle.variant,
            lines = tree.line_count(),
            "Training session setup"
        );

        if !self.past_puzzle_ids.contains(&puzzle.id) {
            self.past_puzzle_ids.push(puzzle.id);
        }
        self.current = Some(InPlay {
            cursor: tree.root(),
            puzzle,
            tree,
            game,
            solver,
            played: Vec::new(),
        });
        self.state = SessionState::Active;
        self.started_utc = Some(now);
        self.ended_utc = None;
        Ok(())
    }

    pub fn apply_move(
        &mut self,
        origin: &str,
        destination: &str,
        promotion: Option<&str>,
    ) -> Result<MoveOutcome, PuzzleError> {
        self.apply_move_at(origin, destination, promotion, Utc::now())
    }

    /// Submit the solver's next move. Errors leave the session unchanged.
    pub fn apply_move_at(
        &mut self,
        origin: &str,
        destination: &str,
        promotion: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<MoveOutcome, PuzzleError> {
        if self.state != SessionState::Active {
            return Err(PuzzleError::InvalidState("There is no active puzzle to play."));
        }
        let submitted = HalfMove::from_parts(origin, destination, promotion)?;
        let current = self
            .current
            .as_ref()
            .ok_or(PuzzleError::InvalidState("There is no active puzzle to play."))?;

        let Some(after_solver) = current.tree.advance(current.cursor, &submitted) else {
            let replay = build_replay(&current.puzzle, &current.tree)?;
            let explanation = current.puzzle.explanation_safe();
            tracing::debug!(
                session_id = %self.session_id,
                puzzle_id = current.puzzle.id,
                submitted = %submitted,
                "Puzzle failed"
            );
            self.resolve(Resolution::Incorrect, now);
            return Ok(MoveOutcome::Failed {
                replay,
                explanation,
            });
        };

        let mut game = current.game.clone();
        game.apply(&submitted)?;
        let fen = game.fen();
        let check = game.is_check();
        let mut played = current.played.clone();
        played.push(submitted);

        // Some variants end the game before the authored line runs out.
        if current.tree.is_complete_at(after_solver) || game.is_winner(current.solver) {
            self.commit(game, after_solver, played);
            self.resolve(Resolution::Correct, now);
            return Ok(MoveOutcome::Solved {
                fen,
                check,
                play: None,
            });
        }

        let Some(reply) = current.tree.forced_reply_at(after_solver) else {
            tracing::warn!(
                session_id = %self.session_id,
                "Solution line continues without an opponent reply"
            );
            self.commit(game, after_solver, played);
            self.resolve(Resolution::Correct, now);
            return Ok(MoveOutcome::Solved {
                fen,
                check,
                play: None,
            });
        };

        game.apply(&reply).map_err(|_| {
            PuzzleError::InvalidMove(format!("The authored reply {reply} is not a legal move."))
        })?;
        let after_reply = current
            .tree
            .advance(after_solver, &reply)
            .unwrap_or(after_solver);
        played.push(reply);
        let play = AutoPlay {
            mv: reply.to_string(),
            fen: game.fen(),
            check: game.is_check(),
        };

        if current.tree.is_complete_at(after_reply) {
            self.commit(game, after_reply, played);
            self.resolve(Resolution::Correct, now);
            return Ok(MoveOutcome::Solved {
                fen,
                check,
                play: Some(play),
            });
        }

        tracing::debug!(
            session_id = %self.session_id,
            ply = after_reply.ply(),
            reply = %play.mv,
            "Move accepted"
        );
        let moves = game.legal_moves();
        self.commit(game, after_reply, played);
        Ok(MoveOutcome::Continue {
            fen,
            check,
            play,
            moves,
        })
    }

    fn commit(&mut self, game: VariantGame, cursor: Cursor, played: Vec<HalfMove>) {
        if let Some(current) = self.current.as_mut() {
            current.game = game;
            current.cursor = cursor;
            current.played = played;
        }
    }

    fn resolve(&mut self, resolution: Resolution, now: DateTime<Utc>) {
        self.state = SessionState::Resolved(resolution);
        self.ended_utc = Some(now);
        if let Some(current) = &self.current {
            tracing::debug!(
                session_id = %self.session_id,
                puzzle_id = current.puzzle.id,
                ?resolution,
                "Puzzle resolved"
            );
        }
    }
}

/// Play the reference line on a fresh engine. The session's own game is never
/// touched, so a replay can be rebuilt any number of times.
fn build_replay(puzzle: &Puzzle, tree: &SolutionTree) -> Result<Replay, PuzzleError> {
    let mut game = VariantGame::construct(puzzle.variant, &puzzle.initial_fen)?;
    let mut replay = Replay {
        fens: vec![puzzle.initial_fen.clone()],
        checks: vec![game.is_check()],
        moves: Vec::new(),
    };
    for mv in tree.reference_line() {
        if game.apply(mv).is_err() {
            tracing::warn!(puzzle_id = puzzle.id, mv = %mv, "Reference line contains an illegal move");
            break;
        }
        replay.fens.push(game.fen());
        replay.checks.push(game.is_check());
        replay.moves.push(mv.to_string());
    }
    Ok(replay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rating::Rating;
    use crate::variant::Variant;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    fn puzzle(id: i64, variant: Variant, fen: &str, solutions: &[&str]) -> Arc<Puzzle> {
        Arc::new(Puzzle {
            id,
            variant,
            initial_fen: fen.to_string(),
            solutions: solutions.iter().map(|s| s.to_string()).collect(),
            rating: Rating::default(),
            rating_updated_at: None,
            author: 1,
            reviewers: Vec::new(),
            in_review: false,
            approved: true,
            explanation_unsafe: "Central control.".into(),
            date_submitted_utc: None,
        })
    }

    #[test]
    fn test_apply_before_setup_is_invalid_state() {
        let mut session = TrainingSession::new("s");
        let err = session.apply_move("e2", "e4", None).unwrap_err();
        assert!(matches!(err, PuzzleError::InvalidState(_)));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_malformed_move_changes_nothing() {
        let mut session = TrainingSession::new("s");
        session
            .setup(puzzle(1, Variant::Atomic, START, &["e2e4 e7e5"]))
            .unwrap();
        let err = session.apply_move("e9", "e4", None).unwrap_err();
        assert!(matches!(err, PuzzleError::InvalidMove(_)));
        let err = session.apply_move("e2", "e4", Some("queen")).unwrap_err();
        assert!(matches!(err, PuzzleError::InvalidMove(_)));
        assert_eq!(session.state(), SessionState::Active);
        assert!(session.played().is_empty());
    }

    #[test]
    fn test_single_solver_ply_with_reply() {
        let mut session = TrainingSession::new("s");
        session
            .setup(puzzle(1, Variant::Atomic, START, &["e2e4 e7e5"]))
            .unwrap();

        let outcome = session.apply_move("e2", "e4", None).unwrap();
        assert_eq!(outcome.correct(), 1);
        match &outcome {
            MoveOutcome::Solved { fen, play, .. } => {
                assert!(fen.starts_with("rnbqkbnr/pppppppp/8/8/4P3/8/"));
                let play = play.as_ref().unwrap();
                assert_eq!(play.mv, "e7e5");
                assert!(play.fen.starts_with("rnbqkbnr/pppp1ppp/8/4p3/4P3/8/"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(session.state(), SessionState::Resolved(Resolution::Correct));
        assert!(session.ended_utc().is_some());
        assert_eq!(session.played().len(), 2);
    }

    #[test]
    fn test_wrong_move_fails_with_replay() {
        let mut session = TrainingSession::new("s");
        session
            .setup(puzzle(1, Variant::Atomic, START, &["e2e4 e7e5"]))
            .unwrap();

        let outcome = session.apply_move("d2", "d4", None).unwrap();
        assert_eq!(outcome.correct(), -1);
        let MoveOutcome::Failed { replay, explanation } = outcome else {
            panic!("expected failure");
        };
        assert_eq!(replay.fens.len(), 3);
        assert_eq!(replay.fens[0], START);
        assert_eq!(replay.checks, vec![false, false, false]);
        assert_eq!(replay.moves, vec!["e2e4", "e7e5"]);
        assert_eq!(explanation, "Central control.");
        // The session's own board did not move.
        assert_eq!(session.fen().unwrap(), START);
        assert_eq!(session.state(), SessionState::Resolved(Resolution::Incorrect));
    }

    #[test]
    fn test_resolved_session_rejects_moves() {
        let mut session = TrainingSession::new("s");
        session
            .setup(puzzle(1, Variant::Atomic, START, &["e2e4 e7e5"]))
            .unwrap();
        session.apply_move("d2", "d4", None).unwrap();
        let ended = session.ended_utc();

        for _ in 0..2 {
            let err = session.apply_move("e2", "e4", None).unwrap_err();
            assert!(matches!(err, PuzzleError::InvalidState(_)));
        }
        assert_eq!(session.state(), SessionState::Resolved(Resolution::Incorrect));
        assert_eq!(session.ended_utc(), ended);
    }

    #[test]
    fn test_setup_while_active_abandons_attempt() {
        let mut session = TrainingSession::new("s");
        session
            .setup(puzzle(1, Variant::Atomic, START, &["e2e4 e7e5 g1f3 b8c6"]))
            .unwrap();
        session.apply_move("e2", "e4", None).unwrap();
        assert_eq!(session.state(), SessionState::Active);

        session
            .setup(puzzle(2, Variant::Atomic, START, &["d2d4"]))
            .unwrap();
        assert_eq!(session.current().unwrap().id, 2);
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.fen().unwrap(), START);
        assert!(session.played().is_empty());
        assert_eq!(session.past_puzzle_ids(), &[1, 2]);
        assert_eq!(session.apply_move("d2", "d4", None).unwrap().correct(), 1);
    }

    #[test]
    fn test_session_reused_across_puzzles() {
        let mut session = TrainingSession::new("s");
        session
            .setup(puzzle(1, Variant::Atomic, START, &["e2e4"]))
            .unwrap();
        assert_eq!(session.apply_move("e2", "e4", None).unwrap().correct(), 1);

        session
            .setup(puzzle(2, Variant::KingOfTheHill, START, &["d2d4 d7d5 c2c4"]))
            .unwrap();
        assert_eq!(session.state(), SessionState::Active);
        assert!(session.ended_utc().is_none());
        assert_eq!(session.fen().unwrap(), START);
        assert_eq!(session.past_puzzle_ids(), &[1, 2]);
    }

    #[test]
    fn test_variant_win_ends_puzzle_early() {
        // The authored line keeps going, but d4 is already a center square.
        let mut session = TrainingSession::new("s");
        session
            .setup(puzzle(
                1,
                Variant::KingOfTheHill,
                "4k3/8/8/8/8/3K4/8/8 w - - 0 1",
                &["d3d4 e8e7 d4d5"],
            ))
            .unwrap();
        let outcome = session.apply_move("d3", "d4", None).unwrap();
        assert_eq!(outcome.correct(), 1);
        assert_eq!(session.state(), SessionState::Resolved(Resolution::Correct));
    }

    #[test]
    fn test_illegal_authored_move_is_invalid() {
        let mut session = TrainingSession::new("s");
        session
            .setup(puzzle(1, Variant::Atomic, START, &["e2e5 e7e5"]))
            .unwrap();
        let err = session.apply_move("e2", "e5", None).unwrap_err();
        assert!(matches!(err, PuzzleError::InvalidMove(_)));
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.fen().unwrap(), START);

        // The broken puzzle can still be left behind.
        session
            .setup(puzzle(2, Variant::Atomic, START, &["e2e4"]))
            .unwrap();
        assert_eq!(session.apply_move("e2", "e4", None).unwrap().correct(), 1);
    }
}
