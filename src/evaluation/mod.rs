//! Static board evaluation used at the leaves of the search.
//!
//! A live board scores
//! `order * orderScore + average * averageScore + merge * mergeScore + empty * emptyScore`
//! with default weights 2/1/40/30. A board with no legal move scores exactly
//! [`GAME_OVER`] regardless of its tiles.

use serde::Deserialize;

use crate::engine::{Board, Move};
use crate::error::EngineError;

mod pattern;

pub use pattern::{select_pattern, Tolerance, WeightPattern, WEIGHT_PATTERNS};

/// Signed board desirability.
pub type Score = i64;

/// Score of a board with no legal move. Below every live board.
pub const GAME_OVER: Score = -9_999_999_999;

/// Search bound. Above every real score; never returned for a board.
pub const INFINITY: Score = 999_999_999_999;

/// Weighted order term for a post-move board whose only legal move is Up.
pub const LOCKED_ORDER_TERM: Score = GAME_OVER / 2;

/// Upper bound for any single evaluation weight. Keeps live scores well
/// inside `(GAME_OVER, INFINITY)`.
pub const MAX_WEIGHT: Score = 100;

/// Multipliers for the four sub-scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvalWeights {
    pub order: Score,
    pub average: Score,
    pub merge: Score,
    pub empty: Score,
}

impl Default for EvalWeights {
    fn default() -> Self { Self { order: 2, average: 1, merge: 40, empty: 30 } }
}

impl EvalWeights {
    pub fn validate(&self) -> Result<(), EngineError> {
        let named = [
            ("order", self.order),
            ("average", self.average),
            ("merge", self.merge),
            ("empty", self.empty),
        ];
        for (name, value) in named {
            if !(1..=MAX_WEIGHT).contains(&value) {
                return Err(EngineError::InvalidWeight { name, value, max: MAX_WEIGHT });
            }
        }
        Ok(())
    }
}

/// Evaluator settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvalConfig {
    pub weights: EvalWeights,
    pub tolerance: Tolerance,
}

/// Stateless board scorer.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    cfg: EvalConfig,
}

impl Evaluator {
    pub fn new() -> Self { Self::default() }

    pub fn with_config(cfg: EvalConfig) -> Self { Self { cfg } }

    #[inline]
    pub fn config(&self) -> &EvalConfig { &self.cfg }

    /// Score `board`. `is_after_move` marks a board the agent is about to
    /// move from, which enables the corner-lock penalty.
    ///
    /// ```
    /// use minimax_2048::engine::Board;
    /// use minimax_2048::evaluation::{Evaluator, GAME_OVER};
    /// let ev = Evaluator::new();
    /// let live = Board::from_rows([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]).unwrap();
    /// assert!(ev.evaluate(live, false) > GAME_OVER);
    /// assert_eq!(ev.evaluate(Board::EMPTY, false), GAME_OVER);
    /// ```
    pub fn evaluate(&self, board: Board, is_after_move: bool) -> Score {
        if board.is_game_over() {
            return GAME_OVER;
        }
        let w = &self.cfg.weights;
        self.order_term(board, is_after_move)
            + w.average * average_score(board)
            + w.merge * merge_score(board)
            + w.empty * empty_score(board)
    }

    fn order_term(&self, board: Board, is_after_move: bool) -> Score {
        if is_after_move && is_corner_locked(board) {
            return LOCKED_ORDER_TERM;
        }
        self.cfg.weights.order * order_score(board, self.cfg.tolerance)
    }
}

/// Dot product of the tile values with the pattern the selector picks.
pub fn order_score(board: Board, tolerance: Tolerance) -> Score {
    let pattern = &WEIGHT_PATTERNS[select_pattern(board, tolerance)];
    pattern
        .iter()
        .flatten()
        .enumerate()
        .map(|(idx, &weight)| weight * board.value(idx) as Score)
        .sum()
}

/// Mean of the nonzero tiles (integer division).
///
/// # Panics
/// On a board with no tiles.
pub fn average_score(board: Board) -> Score {
    let (sum, count) = (0..16)
        .map(|idx| board.value(idx) as Score)
        .filter(|&v| v > 0)
        .fold((0, 0), |(sum, count), v| (sum + v, count + 1));
    assert!(count > 0, "average_score called on a board with no tiles");
    sum / count
}

/// `2 * value` for every adjacent pair of equal tiles. Within each direction
/// a cell that already paired up is not paired again.
pub fn merge_score(board: Board) -> Score {
    let mut used_vertical = [false; 16];
    let mut used_horizontal = [false; 16];
    let mut total = 0;
    for row in 0..4 {
        for col in 0..4 {
            let idx = row * 4 + col;
            let value = board.value(idx) as Score;
            if value == 0 {
                continue;
            }
            let below = idx + 4;
            if row + 1 < 4
                && board.value(below) as Score == value
                && !used_vertical[idx]
                && !used_vertical[below]
            {
                total += 2 * value;
                used_vertical[idx] = true;
                used_vertical[below] = true;
            }
            let right = idx + 1;
            if col + 1 < 4
                && board.value(right) as Score == value
                && !used_horizontal[idx]
                && !used_horizontal[right]
            {
                total += 2 * value;
                used_horizontal[idx] = true;
                used_horizontal[right] = true;
            }
        }
    }
    total
}

/// Number of empty cells.
#[inline]
pub fn empty_score(board: Board) -> Score { board.count_empty() as Score }

/// Only Up is legal: the bottom row would have to be pulled apart.
fn is_corner_locked(board: Board) -> bool {
    [Move::Left, Move::Right, Move::Down].iter().all(|&dir| !board.can_move(dir))
}
