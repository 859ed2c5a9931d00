//! Depth-limited minimax with alpha-beta pruning over agent and chance plies.
//!
//! The agent ply tries Up, Down, Left, Right in that order and keeps the
//! strictly best score, so the earliest direction wins ties. The chance ply
//! drops a 2 and a 4 into every empty cell and, by default, assumes the worst
//! of all of them.
//!
//! Two searchers share the same surface:
//! - [`Minimax`]: single-threaded, pruning shared across the whole tree.
//! - [`MinimaxParallel`]: the four root branches on rayon workers.
//!
//! Quick start
//! ```
//! use minimax_2048::engine::{Board, Move};
//! use minimax_2048::search::{self, Minimax, SearchConfig};
//!
//! let b = Board::from_rows([[2, 4, 8, 16], [0; 4], [0; 4], [0; 4]]).unwrap();
//! // Only Down moves anything here.
//! assert_eq!(search::best_move(b, 1).unwrap(), Some(Move::Down));
//!
//! let mut mm = Minimax::with_config(SearchConfig { depth: 2, ..Default::default() }).unwrap();
//! assert_eq!(mm.best_move(b), Some(Move::Down));
//! assert!(search::best_move(b, 0).is_err());
//! ```

use serde::Deserialize;

use crate::engine::{Board, Move};
use crate::error::EngineError;
use crate::evaluation::Score;

mod search_par;
mod search_seq;

pub use search_par::MinimaxParallel;
pub use search_seq::Minimax;

/// Deepest search accepted by [`SearchConfig::validate`].
pub const MAX_SEARCH_DEPTH: u32 = 8;

/// Depth used when none is configured.
pub const DEFAULT_SEARCH_DEPTH: u32 = 3;

/// How the chance ply folds the 2-spawn and 4-spawn outcomes of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ChanceModel {
    /// Worst of the two outcomes, as if the environment were an opponent.
    #[default]
    Conservative,
    /// `(s2 * (100 - p) + s4 * p) / 100` with `p = four_percent`. The minimum
    /// over cells is still taken.
    Weighted { four_percent: u8 },
}

/// Search knobs. Defaults: depth 3, pruning on, conservative chance model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Agent plies plus chance plies to look ahead from the root.
    pub depth: u32,
    /// Alpha-beta cutoffs. Off runs the same recursion exhaustively.
    pub pruning: bool,
    pub chance: ChanceModel,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { depth: DEFAULT_SEARCH_DEPTH, pruning: true, chance: ChanceModel::default() }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(1..=MAX_SEARCH_DEPTH).contains(&self.depth) {
            return Err(EngineError::DepthOutOfRange { depth: self.depth, max: MAX_SEARCH_DEPTH });
        }
        if let ChanceModel::Weighted { four_percent } = self.chance {
            if four_percent > 100 {
                return Err(EngineError::InvalidFourRate(four_percent));
            }
        }
        Ok(())
    }
}

/// Root value of one direction.
///
/// `legal` is false when the move would not change the board; `value` is
/// then meaningless and left at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchEval {
    pub dir: Move,
    pub value: Score,
    pub legal: bool,
}

impl BranchEval {
    fn illegal(dir: Move) -> Self { Self { dir, value: 0, legal: false } }
}

/// Chosen direction (`None` when nothing is legal) and its backed-up score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOutcome {
    pub best_move: Option<Move>,
    pub score: Score,
}

/// Counters for the most recent search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Agent and chance plies entered.
    pub nodes: u64,
    /// Leaf evaluations.
    pub evaluations: u64,
    /// Plies abandoned early by alpha-beta.
    pub cutoffs: u64,
}

impl SearchStats {
    fn absorb(&mut self, other: SearchStats) {
        self.nodes += other.nodes;
        self.evaluations += other.evaluations;
        self.cutoffs += other.cutoffs;
    }
}

/// Best move for `board` at `depth` with default evaluation settings.
///
/// Rejects a depth outside `1..=MAX_SEARCH_DEPTH`.
pub fn best_move(board: Board, depth: u32) -> Result<Option<Move>, EngineError> {
    let mut minimax = Minimax::with_config(SearchConfig { depth, ..Default::default() })?;
    Ok(minimax.best_move(board))
}

/// Earliest legal branch with the strictly greatest value.
fn pick_best(branches: &[BranchEval; 4]) -> Option<&BranchEval> {
    branches.iter().filter(|b| b.legal).fold(None, |best: Option<&BranchEval>, b| match best {
        Some(current) if current.value >= b.value => Some(current),
        _ => Some(b),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SearchConfig::default().validate().is_ok());
    }

    #[test]
    fn depth_must_be_in_range() {
        for depth in [0, MAX_SEARCH_DEPTH + 1] {
            let cfg = SearchConfig { depth, ..Default::default() };
            assert!(matches!(cfg.validate(), Err(EngineError::DepthOutOfRange { .. })));
        }
        let cfg = SearchConfig { depth: MAX_SEARCH_DEPTH, ..Default::default() };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn four_rate_must_be_a_percentage() {
        let cfg = SearchConfig { chance: ChanceModel::Weighted { four_percent: 101 }, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(EngineError::InvalidFourRate(101))));
    }

    #[test]
    fn pick_best_prefers_earliest_on_ties() {
        let branches = [
            BranchEval::illegal(Move::Up),
            BranchEval { dir: Move::Down, value: 5, legal: true },
            BranchEval { dir: Move::Left, value: 5, legal: true },
            BranchEval { dir: Move::Right, value: 9, legal: false },
        ];
        assert_eq!(pick_best(&branches).map(|b| b.dir), Some(Move::Down));
        let none = Move::ALL.map(BranchEval::illegal);
        assert!(pick_best(&none).is_none());
    }
}
