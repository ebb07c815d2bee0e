//! Puzzle training core: solution trees, the training session state machine,
//! and the Glicko-2 rating updater.

pub mod dests;
pub mod error;
pub mod moves;
pub mod puzzle;
pub mod rating;
pub mod session;
pub mod solution_tree;
pub mod variant;

pub use error::PuzzleError;
pub use moves::HalfMove;
pub use puzzle::Puzzle;
pub use rating::{RatedParty, Rating, RatingConfig, RatingUpdate, RatingUpdater};
pub use session::{AutoPlay, MoveOutcome, Replay, Resolution, SessionState, TrainingSession};
pub use solution_tree::{Cursor, SolutionTree};
pub use variant::{Variant, VariantGame};
