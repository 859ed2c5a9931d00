//! Snake weight patterns and the selector that picks one per board.
//!
//! All four patterns pull the biggest tile into the bottom-left corner and
//! lay the rest out along a serpentine path: bottom row left-to-right, the row
//! above right-to-left, and so on. The selector counts how many rows, from the
//! bottom up, already follow that path; pattern `i` is tuned for a board with
//! `i` finished rows and shifts weight onto the next row to fill.

use serde::Deserialize;

use crate::engine::Board;

use super::Score;

/// Positional weights, top row first.
pub type WeightPattern = [[Score; 4]; 4];

pub const WEIGHT_PATTERNS: [WeightPattern; 4] = [
    [
        [10, 7, 3, 1],
        [100, 70, 30, 10],
        [1000, 700, 300, 100],
        [40000, 7000, 3000, 1000],
    ],
    [
        [1, 3, 7, 10],
        [10, 30, 70, 100],
        [200, 600, 1400, 2000],
        [40000, 7000, 3000, 2000],
    ],
    [
        [10, 7, 3, 1],
        [200, 140, 60, 20],
        [200, 600, 1400, 2000],
        [40000, 7000, 3000, 2000],
    ],
    [
        [2, 6, 14, 20],
        [200, 140, 60, 20],
        [200, 600, 1400, 2000],
        [40000, 7000, 3000, 2000],
    ],
];

/// How forgiving the row matcher is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tolerance {
    /// After three exact matches in a row, the fourth cell may take the
    /// second-largest remaining tile instead of the largest.
    #[default]
    Lenient,
    /// Every cell must hold the largest remaining tile.
    Strict,
}

/// Index into [`WEIGHT_PATTERNS`]: the number of consecutive bottom rows
/// (at most three, row 0 is never checked) that follow the snake order.
///
/// ```
/// use minimax_2048::engine::Board;
/// use minimax_2048::evaluation::{select_pattern, Tolerance};
/// let b = Board::from_rows([
///     [0, 0, 0, 0],
///     [0, 0, 0, 0],
///     [0, 0, 0, 0],
///     [64, 32, 16, 8],
/// ]).unwrap();
/// assert_eq!(select_pattern(b, Tolerance::Lenient), 1);
/// ```
pub fn select_pattern(board: Board, tolerance: Tolerance) -> usize {
    let mut targets: Vec<u8> = (0..16).map(|idx| board.exponent(idx)).collect();
    targets.sort_unstable_by(|a, b| b.cmp(a));

    let mut finished = 0;
    for row in (1..4).rev() {
        let left_to_right = row % 2 == 1;
        if !row_follows_snake(board, row, left_to_right, &mut targets, tolerance) {
            break;
        }
        finished += 1;
    }
    finished
}

/// Match one row against the front of `targets`, consuming what matched.
fn row_follows_snake(
    board: Board,
    row: usize,
    left_to_right: bool,
    targets: &mut Vec<u8>,
    tolerance: Tolerance,
) -> bool {
    let cols: [usize; 4] = if left_to_right { [0, 1, 2, 3] } else { [3, 2, 1, 0] };
    let mut streak = 0;
    for col in cols {
        let cell = board.exponent(row * 4 + col);
        let front = match targets.first() {
            Some(&t) if t != 0 => t,
            _ => return false,
        };
        if cell == front {
            targets.remove(0);
            streak += 1;
        } else if tolerance == Tolerance::Lenient
            && streak == 3
            && targets.get(1).is_some_and(|&second| second != 0 && second == cell)
        {
            targets.remove(1);
        } else {
            return false;
        }
    }
    true
}
