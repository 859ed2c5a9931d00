use log::debug;
use rayon::prelude::*;

use crate::engine::{self, Board, Move};
use crate::error::EngineError;
use crate::evaluation::{Evaluator, Score};

use super::search_seq::{root_branch, Searcher};
use super::{pick_best, BranchEval, SearchConfig, SearchStats};

/// Minimax with the four root branches searched on rayon workers.
///
/// Each worker owns its board copy and counters. Pruning still runs inside a
/// branch, but branches cannot tighten each other's window, so this visits
/// more nodes than [`super::Minimax`] while choosing the same move.
pub struct MinimaxParallel {
    cfg: SearchConfig,
    evaluator: Evaluator,
    stats: SearchStats,
}

impl MinimaxParallel {
    pub fn new() -> Self {
        engine::warm();
        Self { cfg: SearchConfig::default(), evaluator: Evaluator::new(), stats: SearchStats::default() }
    }

    pub fn with_config(cfg: SearchConfig) -> Result<Self, EngineError> {
        Self::with_evaluator(cfg, Evaluator::new())
    }

    pub fn with_evaluator(cfg: SearchConfig, evaluator: Evaluator) -> Result<Self, EngineError> {
        cfg.validate()?;
        engine::warm();
        Ok(Self { cfg, evaluator, stats: SearchStats::default() })
    }

    #[inline]
    pub fn config(&self) -> &SearchConfig { &self.cfg }

    /// Best direction, or `None` when no move is legal.
    #[inline]
    pub fn best_move(&mut self, board: Board) -> Option<Move> { self.best_move_with_branches(board).0 }

    /// Best move and all root branches from a single parallel pass.
    pub fn best_move_with_branches(&mut self, board: Board) -> (Option<Move>, [BranchEval; 4]) {
        let branches = self.branch_evals(board);
        let best = pick_best(&branches);
        debug!(
            "minimax_par depth={} move={:?} score={:?} nodes={}",
            self.cfg.depth,
            best.map(|b| b.dir),
            best.map(|b| b.value),
            self.stats.nodes
        );
        (best.map(|b| b.dir), branches)
    }

    /// Value of every root direction in order `[Up, Down, Left, Right]`.
    pub fn branch_evals(&mut self, board: Board) -> [BranchEval; 4] {
        let evaluator = &self.evaluator;
        let cfg = &self.cfg;
        let results: Vec<(BranchEval, SearchStats)> = Move::ALL
            .par_iter()
            .map(|&dir| {
                let mut searcher = Searcher::new(evaluator, cfg);
                let branch = root_branch(&mut searcher, board, dir, cfg.depth);
                (branch, searcher.stats)
            })
            .collect();

        let mut out = Move::ALL.map(BranchEval::illegal);
        let mut stats = SearchStats::default();
        for (branch, branch_stats) in results {
            out[branch.dir.index()] = branch;
            stats.absorb(branch_stats);
        }
        self.stats = stats;
        out
    }

    /// Value of the best legal root branch, or the leaf score of a blocked board.
    pub fn state_value(&mut self, board: Board) -> Score {
        match pick_best(&self.branch_evals(board)) {
            Some(best) => best.value,
            None => self.evaluator.evaluate(board, true),
        }
    }

    /// Counters summed over all workers for the last search.
    #[inline]
    pub fn last_stats(&self) -> SearchStats { self.stats }

    #[inline]
    pub fn reset_stats(&mut self) { self.stats = SearchStats::default(); }
}

impl Default for MinimaxParallel {
    fn default() -> Self { Self::new() }
}
