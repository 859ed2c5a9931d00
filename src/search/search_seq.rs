use log::{debug, trace};

use crate::engine::{self, Board, Move, Role};
use crate::error::EngineError;
use crate::evaluation::{Evaluator, Score, INFINITY};

use super::{pick_best, BranchEval, ChanceModel, SearchConfig, SearchOutcome, SearchStats};

/// One recursion over a single mutable board.
///
/// Every ply takes a snapshot before it touches the board and restores it
/// before returning, so siblings and the caller never see a hypothetical
/// position.
pub(super) struct Searcher<'a> {
    evaluator: &'a Evaluator,
    cfg: &'a SearchConfig,
    pub(super) stats: SearchStats,
}

impl<'a> Searcher<'a> {
    pub(super) fn new(evaluator: &'a Evaluator, cfg: &'a SearchConfig) -> Self {
        Self { evaluator, cfg, stats: SearchStats::default() }
    }

    /// Agent ply: maximize over legal directions.
    pub(super) fn max_move(&mut self, board: &mut Board, mut alpha: Score, beta: Score, depth: u32) -> SearchOutcome {
        self.stats.nodes += 1;
        if depth == 0 || board.is_terminal(Role::Agent) {
            return SearchOutcome { best_move: None, score: self.leaf(*board, true) };
        }
        let mut best = SearchOutcome { best_move: None, score: -INFINITY };
        for dir in Move::ALL {
            let snapshot = board.snapshot();
            if !board.apply_move(dir) {
                continue;
            }
            let score = self.min_move(board, alpha, beta, depth - 1);
            board.restore(snapshot);
            if score > best.score {
                best = SearchOutcome { best_move: Some(dir), score };
            }
            if self.cfg.pruning {
                alpha = alpha.max(best.score);
                if beta <= alpha {
                    self.stats.cutoffs += 1;
                    break;
                }
            }
        }
        best
    }

    /// Chance ply: minimize over every empty cell and spawn value.
    pub(super) fn min_move(&mut self, board: &mut Board, alpha: Score, mut beta: Score, depth: u32) -> Score {
        self.stats.nodes += 1;
        if depth == 0 || board.is_terminal(Role::Chance) {
            return self.leaf(*board, false);
        }
        let mut worst = INFINITY;
        for idx in board.empty_cells() {
            let estimate = self.cell_estimate(board, idx, alpha, beta, depth - 1);
            worst = worst.min(estimate);
            if self.cfg.pruning {
                if worst <= alpha {
                    self.stats.cutoffs += 1;
                    return worst;
                }
                beta = beta.min(worst);
            }
        }
        worst
    }

    fn cell_estimate(&mut self, board: &mut Board, idx: usize, alpha: Score, beta: Score, depth: u32) -> Score {
        match self.cfg.chance {
            ChanceModel::Conservative => {
                let two = self.spawn(board, idx, 1, alpha, beta, depth);
                if self.cfg.pruning && two <= alpha {
                    return two;
                }
                let four = self.spawn(board, idx, 2, alpha, beta.min(two), depth);
                two.min(four)
            }
            ChanceModel::Weighted { four_percent } => {
                // Averaging bounds is unsound, so both children get a full window.
                let two = self.spawn(board, idx, 1, -INFINITY, INFINITY, depth);
                let four = self.spawn(board, idx, 2, -INFINITY, INFINITY, depth);
                let p = four_percent as Score;
                (two * (100 - p) + four * p) / 100
            }
        }
    }

    fn spawn(&mut self, board: &mut Board, idx: usize, exponent: u8, alpha: Score, beta: Score, depth: u32) -> Score {
        let snapshot = board.snapshot();
        board.place(idx, exponent);
        let score = self.max_move(board, alpha, beta, depth).score;
        board.restore(snapshot);
        score
    }

    #[inline]
    fn leaf(&mut self, board: Board, is_after_move: bool) -> Score {
        self.stats.evaluations += 1;
        self.evaluator.evaluate(board, is_after_move)
    }
}

/// Root value of one direction, searched with a full window.
pub(super) fn root_branch(searcher: &mut Searcher<'_>, board: Board, dir: Move, depth: u32) -> BranchEval {
    let mut work = board;
    if !work.apply_move(dir) {
        return BranchEval::illegal(dir);
    }
    let value = searcher.min_move(&mut work, -INFINITY, INFINITY, depth - 1);
    BranchEval { dir, value, legal: true }
}

/// Single-threaded alpha-beta minimax.
///
/// Constructors warm the engine tables.
pub struct Minimax {
    cfg: SearchConfig,
    evaluator: Evaluator,
    stats: SearchStats,
}

impl Minimax {
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

    #[inline]
    pub fn evaluator(&self) -> &Evaluator { &self.evaluator }

    /// Best direction, or `None` when no move is legal.
    ///
    /// ```
    /// use minimax_2048::engine::Board;
    /// use minimax_2048::search::Minimax;
    /// let blocked = Board::from_rows([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]).unwrap();
    /// assert_eq!(Minimax::new().best_move(blocked), None);
    /// ```
    #[inline]
    pub fn best_move(&mut self, board: Board) -> Option<Move> { self.search(board).best_move }

    /// Run the agent ply at the root with an open window.
    pub fn search(&mut self, board: Board) -> SearchOutcome {
        let mut work = board;
        let mut searcher = Searcher::new(&self.evaluator, &self.cfg);
        let outcome = searcher.max_move(&mut work, -INFINITY, INFINITY, self.cfg.depth);
        let stats = searcher.stats;
        debug_assert_eq!(work, board, "search left the root board mutated");
        self.stats = stats;
        debug!(
            "minimax depth={} move={:?} score={} nodes={} evals={} cutoffs={}",
            self.cfg.depth, outcome.best_move, outcome.score, stats.nodes, stats.evaluations, stats.cutoffs
        );
        outcome
    }

    /// Value of every root direction in order `[Up, Down, Left, Right]`.
    ///
    /// Each branch gets its own full window, so the values are exact rather
    /// than the bounds pruning would leave behind.
    pub fn branch_evals(&mut self, board: Board) -> [BranchEval; 4] {
        let mut searcher = Searcher::new(&self.evaluator, &self.cfg);
        let out = Move::ALL.map(|dir| root_branch(&mut searcher, board, dir, self.cfg.depth));
        self.stats = searcher.stats;
        for branch in out.iter().filter(|b| b.legal) {
            trace!("branch {} value={}", branch.dir, branch.value);
        }
        out
    }

    /// Best move picked from [`Self::branch_evals`], plus the branches themselves.
    pub fn best_move_with_branches(&mut self, board: Board) -> (Option<Move>, [BranchEval; 4]) {
        let branches = self.branch_evals(board);
        (pick_best(&branches).map(|b| b.dir), branches)
    }

    /// Backed-up value of the root agent ply.
    pub fn state_value(&mut self, board: Board) -> Score { self.search(board).score }

    /// Counters from the last search.
    #[inline]
    pub fn last_stats(&self) -> SearchStats { self.stats }

    #[inline]
    pub fn reset_stats(&mut self) { self.stats = SearchStats::default(); }
}

impl Default for Minimax {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::GAME_OVER;
    use rand::{rngs::StdRng, SeedableRng};

    fn rows(r: [[u32; 4]; 4]) -> Board { Board::from_rows(r).unwrap() }

    fn minimax(depth: u32, pruning: bool) -> Minimax {
        Minimax::with_config(SearchConfig { depth, pruning, ..Default::default() }).unwrap()
    }

    /// Boards reached by a short seeded game with a fixed move cycle.
    fn corpus(seed: u64, len: usize) -> Vec<Board> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
        let seq = [Move::Left, Move::Down, Move::Right, Move::Down, Move::Up];
        let mut boards = vec![b];
        for i in 0..len {
            let nb = b.make_move(seq[i % seq.len()], &mut rng);
            if nb != b {
                b = nb;
                boards.push(b);
            }
        }
        boards
    }

    #[test]
    fn scenario_top_row_moves_down() {
        let board = rows([[2, 4, 8, 16], [0; 4], [0; 4], [0; 4]]);
        let mut mm = minimax(1, true);
        let outcome = mm.search(board);
        assert_eq!(outcome.best_move, Some(Move::Down));
        // Depth 1 evaluates the slid board from the chance side.
        let slid = board.shift(Move::Down);
        assert_eq!(outcome.score, Evaluator::new().evaluate(slid, false));
    }

    #[test]
    fn single_legal_direction_wins_at_any_depth() {
        let board = rows([[2, 4, 8, 16], [0; 4], [0; 4], [0; 4]]);
        for depth in 1..=3 {
            assert_eq!(minimax(depth, true).best_move(board), Some(Move::Down));
            assert_eq!(minimax(depth, false).best_move(board), Some(Move::Down));
        }
    }

    #[test]
    fn blocked_board_has_no_move() {
        let board = rows([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        let mut mm = minimax(3, true);
        let outcome = mm.search(board);
        assert_eq!(outcome.best_move, None);
        assert_eq!(outcome.score, GAME_OVER);
        assert_eq!(mm.last_stats().evaluations, 1);
    }

    #[test]
    fn pruning_never_changes_the_chosen_move() {
        for depth in 1..=3 {
            let mut pruned = minimax(depth, true);
            let mut full = minimax(depth, false);
            for board in corpus(17, 40) {
                let a = pruned.search(board);
                let b = full.search(board);
                assert_eq!(a.best_move, b.best_move, "depth {depth} board {board:?}");
                assert_eq!(a.score, b.score, "depth {depth} board {board:?}");
            }
        }
    }

    #[test]
    fn pruning_visits_fewer_nodes() {
        let board = rows([[0, 2, 0, 0], [0, 0, 4, 0], [2, 0, 0, 0], [8, 4, 0, 0]]);
        let mut pruned = minimax(3, true);
        let mut full = minimax(3, false);
        pruned.search(board);
        full.search(board);
        assert!(pruned.last_stats().nodes < full.last_stats().nodes);
        assert!(pruned.last_stats().cutoffs > 0);
        assert_eq!(full.last_stats().cutoffs, 0);
    }

    #[test]
    fn branch_evals_agree_with_search() {
        for board in corpus(3, 20) {
            let mut mm = minimax(3, true);
            let (best, branches) = mm.best_move_with_branches(board);
            let outcome = mm.search(board);
            assert_eq!(best, outcome.best_move);
            for (branch, dir) in branches.iter().zip(Move::ALL) {
                assert_eq!(branch.dir, dir);
                assert_eq!(branch.legal, board.can_move(dir));
            }
            if let Some(dir) = best {
                assert_eq!(branches[dir.index()].value, outcome.score);
            }
        }
    }

    #[test]
    fn state_value_matches_best_branch() {
        let board = rows([[2, 2, 0, 0], [0, 4, 0, 0], [0; 4], [8, 0, 0, 0]]);
        let mut mm = minimax(2, false);
        let best = mm
            .branch_evals(board)
            .iter()
            .filter(|b| b.legal)
            .map(|b| b.value)
            .max()
            .unwrap();
        assert_eq!(mm.state_value(board), best);
    }

    #[test]
    fn search_leaves_the_board_untouched() {
        let board = rows([[2, 2, 4, 0], [0, 4, 0, 8], [16, 0, 0, 0], [32, 8, 2, 0]]);
        let mut work = board;
        let evaluator = Evaluator::new();
        let cfg = SearchConfig { depth: 3, ..Default::default() };
        let mut searcher = Searcher::new(&evaluator, &cfg);
        searcher.max_move(&mut work, -INFINITY, INFINITY, cfg.depth);
        assert_eq!(work, board);
        searcher.min_move(&mut work, -INFINITY, INFINITY, cfg.depth);
        assert_eq!(work, board);
    }

    #[test]
    fn chance_ply_takes_the_worst_spawn() {
        // One empty cell: the chance ply's value is the worse of its two spawns.
        let board = rows([[2, 4, 8, 16], [32, 64, 128, 256], [512, 1024, 2048, 4], [8192, 16384, 2, 0]]);
        let evaluator = Evaluator::new();
        let cfg = SearchConfig { depth: 1, pruning: false, ..Default::default() };
        let mut searcher = Searcher::new(&evaluator, &cfg);
        let mut work = board;
        let value = searcher.min_move(&mut work, -INFINITY, INFINITY, 1);
        let mut two = board;
        two.set_tile(3, 3, 2).unwrap();
        let mut four = board;
        four.set_tile(3, 3, 4).unwrap();
        let expected = evaluator.evaluate(two, true).min(evaluator.evaluate(four, true));
        assert_eq!(value, expected);
    }

    #[test]
    fn chance_ply_returns_early_once_below_alpha() {
        // Empty cells 11, 14 and 15; cell 11 is tried first.
        let board = rows([[2, 4, 8, 16], [32, 64, 128, 256], [512, 1024, 2048, 0], [8192, 16384, 0, 0]]);
        let evaluator = Evaluator::new();
        let cfg = SearchConfig { depth: 1, pruning: true, ..Default::default() };

        // Open window: every cell and both spawns are searched.
        let mut open = Searcher::new(&evaluator, &cfg);
        let mut work = board;
        open.min_move(&mut work, -INFINITY, INFINITY, 1);
        assert_eq!(open.stats.evaluations, 6);
        assert_eq!(open.stats.cutoffs, 0);

        // Any real score is below this alpha, so the first 2-spawn ends the ply.
        let mut tight = Searcher::new(&evaluator, &cfg);
        let value = tight.min_move(&mut work, INFINITY - 1, INFINITY, 1);
        let mut first = board;
        first.set_tile(2, 3, 2).unwrap();
        assert_eq!(value, evaluator.evaluate(first, true));
        assert_eq!(tight.stats.cutoffs, 1);
        assert_eq!(tight.stats.evaluations, 1);
        // The chance ply plus one agent leaf.
        assert_eq!(tight.stats.nodes, 2);
        assert_eq!(work, board);
    }

    #[test]
    fn weighted_model_blends_spawn_outcomes() {
        let board = rows([[2, 4, 8, 16], [32, 64, 128, 256], [512, 1024, 2048, 4], [8192, 16384, 2, 0]]);
        let evaluator = Evaluator::new();
        let cfg = SearchConfig { depth: 1, pruning: true, chance: ChanceModel::Weighted { four_percent: 10 } };
        let mut searcher = Searcher::new(&evaluator, &cfg);
        let mut work = board;
        let value = searcher.min_move(&mut work, -INFINITY, INFINITY, 1);
        let mut two = board;
        two.set_tile(3, 3, 2).unwrap();
        let mut four = board;
        four.set_tile(3, 3, 4).unwrap();
        let expected = (evaluator.evaluate(two, true) * 90 + evaluator.evaluate(four, true) * 10) / 100;
        assert_eq!(value, expected);
    }

    #[test]
    fn weighted_model_is_unaffected_by_pruning() {
        for board in corpus(29, 25) {
            let chance = ChanceModel::Weighted { four_percent: 10 };
            let mut pruned = Minimax::with_config(SearchConfig { depth: 3, pruning: true, chance }).unwrap();
            let mut full = Minimax::with_config(SearchConfig { depth: 3, pruning: false, chance }).unwrap();
            assert_eq!(pruned.best_move(board), full.best_move(board));
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(Minimax::with_config(SearchConfig { depth: 0, ..Default::default() }).is_err());
        assert!(crate::search::best_move(Board::EMPTY, 99).is_err());
    }

    #[test]
    fn stats_reset() {
        let mut mm = minimax(2, true);
        mm.best_move(rows([[2, 0, 0, 2], [0; 4], [0; 4], [0; 4]]));
        assert!(mm.last_stats().nodes > 0);
        mm.reset_stats();
        assert_eq!(mm.last_stats(), SearchStats::default());
    }
}
