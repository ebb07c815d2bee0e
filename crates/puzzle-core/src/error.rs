//! Puzzle error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PuzzleError {
    #[error("The given ID is invalid.")]
    InvalidId,

    #[error("{0}")]
    NotFound(String),

    #[error("Only the puzzle author can access this right now.")]
    Unauthorized,

    #[error("{0}")]
    InvalidMove(String),

    #[error("{0}")]
    InvalidState(&'static str),

    #[error("There are no accepted variations.")]
    NoAcceptedSolutions,

    #[error("{0}")]
    PersistenceConflict(String),

    #[error("Invalid FEN: {0}")]
    InvalidFen(String),

    #[error("Unsupported variant.")]
    UnsupportedVariant(String),
}
