#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use puzzle_core::{Puzzle, Rating, Variant};

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Build an approved puzzle from a FEN and its solution lines.
pub fn puzzle(id: i64, variant: Variant, fen: &str, solutions: &[&str]) -> Arc<Puzzle> {
    Arc::new(Puzzle {
        id,
        variant,
        initial_fen: fen.to_string(),
        solutions: solutions.iter().map(|s| s.to_string()).collect(),
        rating: Rating::default(),
        rating_updated_at: None,
        author: 1,
        reviewers: vec![1],
        in_review: false,
        approved: true,
        explanation_unsafe: "See the reference line.".to_string(),
        date_submitted_utc: None,
    })
}

/// Split a UCI-style move like `e7e8q` into submission fields.
pub fn parts(uci: &str) -> (&str, &str, Option<&str>) {
    let promotion = uci.get(4..).filter(|p| !p.is_empty());
    (&uci[0..2], &uci[2..4], promotion)
}

/// Fixed point in time for deterministic sessions.
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 17, hour, minute, 0).unwrap()
}
