//! Half-moves as authored in solution lines and as submitted by solvers.
//!
//! A half-move is the (origin, destination, promotion) triple the board UI
//! sends. Castling is expressed king-to-target-square (`e1g1`), the same way
//! UCI writes it.

use std::fmt;
use std::str::FromStr;

use shakmaty::{File, Move, Role, Square};

use crate::error::PuzzleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HalfMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Role>,
}

impl HalfMove {
    pub fn new(from: Square, to: Square, promotion: Option<Role>) -> Self {
        Self { from, to, promotion }
    }

    /// Build a half-move from the raw fields of a move submission.
    pub fn from_parts(
        origin: &str,
        destination: &str,
        promotion: Option<&str>,
    ) -> Result<Self, PuzzleError> {
        let from = parse_square(origin)?;
        let to = parse_square(destination)?;
        let promotion = match promotion.map(str::trim).filter(|p| !p.is_empty()) {
            None => None,
            Some(p) => {
                let mut chars = p.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(parse_promotion(c)?),
                    _ => {
                        return Err(PuzzleError::InvalidMove(
                            "Invalid 'promotion' parameter.".into(),
                        ))
                    }
                }
            }
        };
        Ok(Self { from, to, promotion })
    }

    /// Convert a legal engine move into the half-move a UI would submit.
    pub fn from_move(mv: &Move) -> Option<Self> {
        let from = mv.from()?;
        Some(Self {
            from,
            to: uci_destination(mv),
            promotion: mv.promotion(),
        })
    }

    /// Whether `submitted` is this authored half-move.
    ///
    /// The promotion piece only counts when the authored move names one; an
    /// authored promotion without a piece accepts any piece.
    pub fn accepts(&self, submitted: &HalfMove) -> bool {
        if self.from != submitted.from || self.to != submitted.to {
            return false;
        }
        match self.promotion {
            Some(role) => submitted.promotion == Some(role),
            None => true,
        }
    }

    /// Whether an engine move is the one described by this half-move.
    /// A promotion without a piece resolves to a queen.
    pub fn matches_move(&self, mv: &Move) -> bool {
        let Some(from) = mv.from() else {
            return false;
        };
        if from != self.from {
            return false;
        }
        let to_matches = match mv {
            Move::Castle { rook, .. } => uci_destination(mv) == self.to || *rook == self.to,
            _ => mv.to() == self.to,
        };
        if !to_matches {
            return false;
        }
        match mv.promotion() {
            None => true,
            Some(role) => role == self.promotion.unwrap_or(Role::Queen),
        }
    }
}

impl fmt::Display for HalfMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(role) = self.promotion {
            write!(f, "{}", role.char())?;
        }
        Ok(())
    }
}

impl FromStr for HalfMove {
    type Err = PuzzleError;

    /// Parses authored tokens such as `e2e4`, `e2-e4`, `e7e8q` and `e7-e8=Q`.
    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let cleaned: String = token
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        if cleaned.len() != 4 && cleaned.len() != 5 {
            return Err(PuzzleError::InvalidMove(format!(
                "'{token}' is not a valid move."
            )));
        }
        let promotion = cleaned.get(4..).filter(|p| !p.is_empty());
        Self::from_parts(&cleaned[0..2], &cleaned[2..4], promotion)
    }
}

/// Destination square as UCI writes it: castling goes to the king's target file.
pub fn uci_destination(mv: &Move) -> Square {
    match mv {
        Move::Castle { king, rook } => {
            let file = if rook.file() > king.file() { File::G } else { File::C };
            Square::from_coords(file, king.rank())
        }
        _ => mv.to(),
    }
}

fn parse_square(raw: &str) -> Result<Square, PuzzleError> {
    raw.trim()
        .to_ascii_lowercase()
        .parse::<Square>()
        .map_err(|_| PuzzleError::InvalidMove(format!("'{raw}' is not a valid square.")))
}

fn parse_promotion(c: char) -> Result<Role, PuzzleError> {
    match Role::from_char(c.to_ascii_lowercase()) {
        Some(Role::Pawn) | None => Err(PuzzleError::InvalidMove(
            "Invalid 'promotion' parameter.".into(),
        )),
        Some(role) => Ok(role),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_authored_tokens() {
        let plain: HalfMove = "e2e4".parse().unwrap();
        assert_eq!(plain, HalfMove::new(Square::E2, Square::E4, None));

        let dashed: HalfMove = "e2-e4".parse().unwrap();
        assert_eq!(dashed, plain);

        let promo: HalfMove = "e7-e8=Q".parse().unwrap();
        assert_eq!(promo.promotion, Some(Role::Queen));
        assert_eq!(promo.to_string(), "e7e8q");
    }

    #[test]
    fn test_reject_malformed() {
        assert!("e2".parse::<HalfMove>().is_err());
        assert!("z9e4".parse::<HalfMove>().is_err());
        assert!(HalfMove::from_parts("e7", "e8", Some("qq")).is_err());
        assert!(HalfMove::from_parts("e7", "e8", Some("p")).is_err());
        assert!(HalfMove::from_parts("e7", "e8", Some("x")).is_err());
    }

    #[test]
    fn test_promotion_only_compared_when_authored() {
        let authored = HalfMove::new(Square::E7, Square::E8, Some(Role::Knight));
        let as_queen = HalfMove::new(Square::E7, Square::E8, Some(Role::Queen));
        let as_knight = HalfMove::new(Square::E7, Square::E8, Some(Role::Knight));
        assert!(!authored.accepts(&as_queen));
        assert!(authored.accepts(&as_knight));

        let quiet = HalfMove::new(Square::G1, Square::F3, None);
        let with_letter = HalfMove::new(Square::G1, Square::F3, Some(Role::Queen));
        assert!(quiet.accepts(&with_letter));
    }
}
