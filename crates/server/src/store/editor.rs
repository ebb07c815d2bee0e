use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use puzzle_core::dests::{dests_for_moves, DestinationMap};
use puzzle_core::puzzle::solutions_from_submission;
use puzzle_core::{HalfMove, Puzzle, PuzzleError, Rating, Variant, VariantGame};
use rand::Rng;
use shakmaty::Color;
use tokio::sync::{Mutex, RwLock};

pub type SharedDraft = Arc<Mutex<PuzzleDraft>>;

/// A puzzle an author is still building. The board lets the author play out
/// variations from the initial position before submitting.
#[derive(Debug, Clone)]
pub struct PuzzleDraft {
    pub id: i32,
    pub author: i64,
    pub variant: Variant,
    pub initial_fen: String,
    game: VariantGame,
    published: bool,
}

impl PuzzleDraft {
    pub fn new(id: i32, author: i64, variant: Variant, fen: &str) -> Result<Self, PuzzleError> {
        let game = VariantGame::construct(variant, fen)?;
        Ok(Self {
            id,
            author,
            variant,
            initial_fen: fen.trim().to_string(),
            game,
            published: false,
        })
    }

    /// A published draft is gone for every caller, including ones that
    /// fetched it before it was removed from the store.
    pub fn ensure_author(&self, user_id: i64) -> Result<(), PuzzleError> {
        if self.published {
            Err(draft_not_found())
        } else if self.author == user_id {
            Ok(())
        } else {
            Err(PuzzleError::Unauthorized)
        }
    }

    pub fn fen(&self) -> String {
        self.game.fen()
    }

    pub fn whose_turn(&self) -> Color {
        self.game.whose_turn()
    }

    /// Destinations for the side to move, empty once either side has won.
    pub fn dests(&self) -> DestinationMap {
        if self.game.is_winner(Color::White) || self.game.is_winner(Color::Black) {
            return DestinationMap::new();
        }
        dests_for_moves(&self.game.legal_moves())
    }

    pub fn submit_move(
        &mut self,
        origin: &str,
        destination: &str,
        promotion: Option<&str>,
    ) -> Result<String, PuzzleError> {
        let half_move = HalfMove::from_parts(origin, destination, promotion)?;
        self.game.apply(&half_move)?;
        Ok(self.game.fen())
    }

    /// Back to the initial position to author another line.
    pub fn new_variation(&mut self) -> Result<String, PuzzleError> {
        self.game = VariantGame::construct(self.variant, &self.initial_fen)?;
        Ok(self.game.fen())
    }

    /// Turn the draft into a puzzle ready to insert. `id` is left at 0 for the
    /// caller to fill from the persistent counter.
    ///
    /// Authors who can review publish directly; everyone else goes through
    /// the review queue.
    pub fn to_puzzle(
        &self,
        solution: &str,
        explanation: &str,
        author_can_review: bool,
        now: DateTime<Utc>,
    ) -> Result<Puzzle, PuzzleError> {
        let solutions = solutions_from_submission(solution)?;
        let puzzle = Puzzle {
            id: 0,
            variant: self.variant,
            initial_fen: self.initial_fen.clone(),
            solutions,
            rating: Rating::default(),
            rating_updated_at: None,
            author: self.author,
            reviewers: if author_can_review {
                vec![self.author]
            } else {
                Vec::new()
            },
            in_review: !author_can_review,
            approved: author_can_review,
            explanation_unsafe: explanation.to_string(),
            date_submitted_utc: Some(now),
        };
        puzzle.verify_solutions()?;
        Ok(puzzle)
    }
}

fn draft_not_found() -> PuzzleError {
    PuzzleError::NotFound("The given puzzle could not be found.".into())
}

/// Drafts keyed by a random editing ID.
///
/// Only a successful publish removes a draft. Abandoned drafts stay until
/// the process exits.
#[derive(Clone, Default)]
pub struct EditorStore {
    drafts: Arc<RwLock<HashMap<i32, SharedDraft>>>,
}

impl EditorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the position and store a new draft under an unused random ID.
    pub async fn register(
        &self,
        author: i64,
        variant: Variant,
        fen: &str,
    ) -> Result<i32, PuzzleError> {
        let mut draft = PuzzleDraft::new(0, author, variant, fen)?;
        let mut drafts = self.drafts.write().await;
        loop {
            let id = rand::thread_rng().gen_range(1..i32::MAX);
            if let Entry::Vacant(slot) = drafts.entry(id) {
                draft.id = id;
                slot.insert(Arc::new(Mutex::new(draft)));
                tracing::debug!(draft_id = id, author, %variant, "Puzzle registered for editing");
                return Ok(id);
            }
        }
    }

    pub async fn get(&self, id: i32) -> Result<SharedDraft, PuzzleError> {
        self.drafts
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(draft_not_found)
    }

    /// Build a puzzle from the author's draft and hand it to `insert`. The
    /// draft stays locked until `insert` finishes and is removed once it
    /// succeeds, so a draft is published at most once. A failed build or
    /// insert leaves the draft in place for another try.
    pub async fn publish<B, F, Fut, E>(
        &self,
        id: i32,
        author: i64,
        build: B,
        insert: F,
    ) -> Result<Puzzle, E>
    where
        B: FnOnce(&PuzzleDraft) -> Result<Puzzle, PuzzleError>,
        F: FnOnce(Puzzle) -> Fut,
        Fut: Future<Output = Result<Puzzle, E>>,
        E: From<PuzzleError>,
    {
        let shared = self.get(id).await?;
        let mut draft = shared.lock().await;
        draft.ensure_author(author)?;

        let puzzle = insert(build(&draft)?).await?;
        draft.published = true;
        drop(draft);

        self.remove(id).await;
        Ok(puzzle)
    }

    pub async fn remove(&self, id: i32) {
        self.drafts.write().await.remove(&id);
    }
}
