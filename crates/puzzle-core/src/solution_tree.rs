//! Solution tree: every authored solution line merged into one trie of half-moves.
//!
//! Even plies (0, 2, 4, ...) belong to the solver, odd plies to the opponent.
//! Lines sharing a prefix share nodes, so a fork in the solver's options is a
//! node with several children.

use crate::error::PuzzleError;
use crate::moves::HalfMove;

/// Position in the tree after some sequence of half-moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    node: usize,
    ply: usize,
}

impl Cursor {
    /// Half-moves played so far.
    pub fn ply(&self) -> usize {
        self.ply
    }

    pub fn is_solver_turn(&self) -> bool {
        self.ply % 2 == 0
    }
}

#[derive(Debug, Clone)]
struct Node {
    mv: Option<HalfMove>,
    /// Children in the order their lines were authored.
    children: Vec<usize>,
    /// An authored line ends exactly here.
    line_end: bool,
}

#[derive(Debug, Clone)]
pub struct SolutionTree {
    nodes: Vec<Node>,
    reference: Vec<HalfMove>,
    line_count: usize,
}

impl SolutionTree {
    /// Parse raw solution strings, one line per entry, half-moves separated by
    /// whitespace. Blank lines are skipped.
    pub fn parse<S: AsRef<str>>(lines: &[S]) -> Result<Self, PuzzleError> {
        let parsed = lines
            .iter()
            .map(|l| l.as_ref().trim())
            .filter(|l| !l.is_empty())
            .map(|l| {
                l.split_whitespace()
                    .map(str::parse::<HalfMove>)
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_lines(parsed)
    }

    pub fn from_lines(lines: Vec<Vec<HalfMove>>) -> Result<Self, PuzzleError> {
        if lines.is_empty() || lines.iter().any(|l| l.is_empty()) {
            return Err(PuzzleError::NoAcceptedSolutions);
        }

        let mut tree = Self {
            nodes: vec![Node {
                mv: None,
                children: Vec::new(),
                line_end: false,
            }],
            reference: lines[0].clone(),
            line_count: lines.len(),
        };
        for line in &lines {
            tree.insert(line);
        }
        Ok(tree)
    }

    fn insert(&mut self, line: &[HalfMove]) {
        let mut current = 0;
        for mv in line {
            let existing = self.nodes[current]
                .children
                .iter()
                .copied()
                .find(|&c| self.nodes[c].mv.as_ref() == Some(mv));
            current = match existing {
                Some(child) => child,
                None => {
                    let id = self.nodes.len();
                    self.nodes.push(Node {
                        mv: Some(*mv),
                        children: Vec::new(),
                        line_end: false,
                    });
                    self.nodes[current].children.push(id);
                    id
                }
            };
        }
        self.nodes[current].line_end = true;
    }

    pub fn root(&self) -> Cursor {
        Cursor { node: 0, ply: 0 }
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// Follow one half-move from `cursor`. The first authored child that
    /// accepts the move wins.
    pub fn advance(&self, cursor: Cursor, mv: &HalfMove) -> Option<Cursor> {
        self.nodes[cursor.node]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c].mv.as_ref().is_some_and(|a| a.accepts(mv)))
            .map(|node| Cursor {
                node,
                ply: cursor.ply + 1,
            })
    }

    /// Walk a played prefix from the root; `None` once it leaves every line.
    pub fn walk(&self, played: &[HalfMove]) -> Option<Cursor> {
        played
            .iter()
            .try_fold(self.root(), |cursor, mv| self.advance(cursor, mv))
    }

    /// Half-moves the solver may play next at `cursor`.
    pub fn accepted_at(&self, cursor: Cursor) -> Vec<HalfMove> {
        if !cursor.is_solver_turn() {
            return Vec::new();
        }
        self.child_moves(cursor)
    }

    /// The opponent's reply at `cursor`. When authored lines disagree on the
    /// reply, the line authored first is followed.
    pub fn forced_reply_at(&self, cursor: Cursor) -> Option<HalfMove> {
        if cursor.is_solver_turn() {
            return None;
        }
        let replies = self.child_moves(cursor);
        if replies.len() > 1 {
            tracing::warn!(
                ply = cursor.ply,
                replies = replies.len(),
                "Solution lines diverge on an opponent move; following the first authored line"
            );
        }
        replies.first().copied()
    }

    pub fn is_complete_at(&self, cursor: Cursor) -> bool {
        self.nodes[cursor.node].line_end
    }

    /// Every half-move valid at the next solver ply after `played`.
    pub fn accepted_moves(&self, played: &[HalfMove]) -> Vec<HalfMove> {
        self.walk(played)
            .map(|c| self.accepted_at(c))
            .unwrap_or_default()
    }

    /// The opponent reply that follows `played` (which ends on a solver move).
    pub fn forced_reply(&self, played: &[HalfMove]) -> Option<HalfMove> {
        self.walk(played).and_then(|c| self.forced_reply_at(c))
    }

    /// True when `played` is exactly one full authored line.
    pub fn is_line_complete(&self, played: &[HalfMove]) -> bool {
        self.walk(played).is_some_and(|c| self.is_complete_at(c))
    }

    /// The first authored line in full, used for replays.
    pub fn reference_line(&self) -> &[HalfMove] {
        &self.reference
    }

    fn child_moves(&self, cursor: Cursor) -> Vec<HalfMove> {
        self.nodes[cursor.node]
            .children
            .iter()
            .filter_map(|&c| self.nodes[c].mv)
            .collect()
    }
}
