//! Supported variants and the rules engine wrapper the training session drives.
//!
//! Move generation, variant win conditions and FEN handling all come from
//! shakmaty; `VariantGame` only narrows its API to what puzzles need.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use shakmaty::fen::Fen;
use shakmaty::variant::VariantPosition;
use shakmaty::{CastlingMode, Color, EnPassantMode, KnownOutcome, Move, Outcome, Position};

use crate::error::PuzzleError;
use crate::moves::HalfMove;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variant {
    Atomic,
    KingOfTheHill,
    ThreeCheck,
    Antichess,
    Horde,
    RacingKings,
}

impl Variant {
    pub const ALL: [Variant; 6] = [
        Variant::Atomic,
        Variant::KingOfTheHill,
        Variant::ThreeCheck,
        Variant::Antichess,
        Variant::Horde,
        Variant::RacingKings,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Atomic => "Atomic",
            Variant::KingOfTheHill => "KingOfTheHill",
            Variant::ThreeCheck => "ThreeCheck",
            Variant::Antichess => "Antichess",
            Variant::Horde => "Horde",
            Variant::RacingKings => "RacingKings",
        }
    }

    /// Case-insensitive lookup; `kingofthehill` and `KINGOFTHEHILL` both work.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(name))
    }

    fn rules(self) -> shakmaty::variant::Variant {
        use shakmaty::variant::Variant as Rules;
        match self {
            Variant::Atomic => Rules::Atomic,
            Variant::KingOfTheHill => Rules::KingOfTheHill,
            Variant::ThreeCheck => Rules::ThreeCheck,
            Variant::Antichess => Rules::Antichess,
            Variant::Horde => Rules::Horde,
            Variant::RacingKings => Rules::RacingKings,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = PuzzleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| PuzzleError::UnsupportedVariant(s.to_string()))
    }
}

/// Lowercase side name as the board UI expects it.
pub fn color_name(color: Color) -> &'static str {
    match color {
        Color::White => "white",
        Color::Black => "black",
    }
}

/// A live game in one variant. Never persisted: rebuilt from a FEN whenever a
/// session or editor draft needs one.
#[derive(Debug, Clone)]
pub struct VariantGame {
    variant: Variant,
    pos: VariantPosition,
}

impl VariantGame {
    pub fn construct(variant: Variant, fen: &str) -> Result<Self, PuzzleError> {
        let parsed: Fen = fen
            .trim()
            .parse()
            .map_err(|e| PuzzleError::InvalidFen(format!("{e}")))?;
        let pos = VariantPosition::from_setup(
            variant.rules(),
            parsed.into_setup(),
            CastlingMode::Standard,
        )
        .map_err(|e| PuzzleError::InvalidFen(format!("{e}")))?;
        Ok(Self { variant, pos })
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Legal moves for the side to move; empty once the game is over.
    pub fn legal_moves(&self) -> Vec<Move> {
        if self.pos.is_game_over() {
            return Vec::new();
        }
        self.pos.legal_moves().into_iter().collect()
    }

    /// Look up the legal move a half-move describes, if any.
    pub fn find_move(&self, half_move: &HalfMove) -> Option<Move> {
        self.pos
            .legal_moves()
            .into_iter()
            .find(|m| half_move.matches_move(m))
    }

    /// Play a half-move. Illegal moves leave the position untouched.
    pub fn apply(&mut self, half_move: &HalfMove) -> Result<Move, PuzzleError> {
        let mv = self
            .find_move(half_move)
            .ok_or_else(|| PuzzleError::InvalidMove("The given move is invalid.".into()))?;
        self.pos.play_unchecked(mv.clone());
        Ok(mv)
    }

    /// Whether `side` has won under the variant's own rules (mate included).
    pub fn is_winner(&self, side: Color) -> bool {
        matches!(
            self.pos.outcome(),
            Outcome::Known(KnownOutcome::Decisive { winner }) if winner == side
        )
    }

    pub fn whose_turn(&self) -> Color {
        self.pos.turn()
    }

    pub fn is_check(&self) -> bool {
        self.pos.is_check()
    }

    pub fn fen(&self) -> String {
        Fen::from_position(&self.pos, EnPassantMode::Legal).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::Square;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn test_variant_names() {
        assert_eq!(Variant::from_name("kingofthehill"), Some(Variant::KingOfTheHill));
        assert_eq!(Variant::from_name(" Atomic "), Some(Variant::Atomic));
        assert_eq!(Variant::from_name("Chess960"), None);
        assert!("Crazyhouse".parse::<Variant>().is_err());
    }

    #[test]
    fn test_construct_and_apply() {
        let mut game = VariantGame::construct(Variant::KingOfTheHill, START).unwrap();
        assert_eq!(game.whose_turn(), Color::White);
        assert_eq!(game.legal_moves().len(), 20);

        game.apply(&HalfMove::new(Square::E2, Square::E4, None)).unwrap();
        assert_eq!(game.whose_turn(), Color::Black);
        assert!(game.fen().starts_with("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b"));
    }

    #[test]
    fn test_illegal_move_leaves_position() {
        let mut game = VariantGame::construct(Variant::Atomic, START).unwrap();
        let before = game.fen();
        assert!(game.apply(&HalfMove::new(Square::E2, Square::E5, None)).is_err());
        assert_eq!(game.fen(), before);
    }

    #[test]
    fn test_invalid_fen() {
        assert!(matches!(
            VariantGame::construct(Variant::Atomic, "not a fen"),
            Err(PuzzleError::InvalidFen(_))
        ));
    }

    #[test]
    fn test_king_of_the_hill_win() {
        // White king steps onto e4, a center square.
        let mut game =
            VariantGame::construct(Variant::KingOfTheHill, "4k3/8/8/8/8/4K3/8/8 w - - 0 1").unwrap();
        game.apply(&HalfMove::new(Square::E3, Square::E4, None)).unwrap();
        assert!(game.is_winner(Color::White));
        assert!(!game.is_winner(Color::Black));
        assert!(game.legal_moves().is_empty());
    }

    #[test]
    fn test_atomic_explosion_is_a_win() {
        let mut game =
            VariantGame::construct(Variant::Atomic, "8/8/4k3/3p4/8/4N3/8/4K3 w - - 0 1").unwrap();
        assert!(!game.is_winner(Color::White));
        let mv = game.apply(&HalfMove::new(Square::E3, Square::D5, None)).unwrap();
        assert!(mv.is_capture());
        assert!(game.is_winner(Color::White));
        assert!(game.fen().starts_with("8/8/8/8/8/8/8/4K3 b"));
    }
}
