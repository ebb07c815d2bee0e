//! Puzzle records and publish-time validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PuzzleError;
use crate::rating::Rating;
use crate::solution_tree::SolutionTree;
use crate::variant::{Variant, VariantGame};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Puzzle {
    pub id: i64,
    pub variant: Variant,
    pub initial_fen: String,
    /// One entry per accepted line, half-moves separated by spaces.
    pub solutions: Vec<String>,
    pub rating: Rating,
    pub rating_updated_at: Option<DateTime<Utc>>,
    pub author: i64,
    pub reviewers: Vec<i64>,
    pub in_review: bool,
    pub approved: bool,
    pub explanation_unsafe: String,
    pub date_submitted_utc: Option<DateTime<Utc>>,
}

impl Puzzle {
    pub fn solution_tree(&self) -> Result<SolutionTree, PuzzleError> {
        SolutionTree::parse(&self.solutions)
    }

    /// Explanation text safe to embed in HTML.
    pub fn explanation_safe(&self) -> String {
        escape_html(&self.explanation_unsafe)
    }

    /// Check that every solution line can actually be played from the
    /// starting position.
    pub fn verify_solutions(&self) -> Result<SolutionTree, PuzzleError> {
        let tree = self.solution_tree()?;
        for (i, line) in self.solutions.iter().enumerate() {
            let mut game = VariantGame::construct(self.variant, &self.initial_fen)?;
            for token in line.split_whitespace() {
                let mv = token.parse()?;
                game.apply(&mv).map_err(|_| {
                    PuzzleError::InvalidMove(format!(
                        "Solution line {} contains an illegal move: {token}",
                        i + 1
                    ))
                })?;
            }
        }
        Ok(tree)
    }
}

/// Split the editor's solution text (lines separated by `;`) into lines,
/// dropping blank ones.
pub fn solutions_from_submission(text: &str) -> Result<Vec<String>, PuzzleError> {
    let lines: Vec<String> = text
        .split(';')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect();
    if lines.is_empty() {
        return Err(PuzzleError::NoAcceptedSolutions);
    }
    Ok(lines)
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
