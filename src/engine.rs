//! Packed 4x4 board: the game-state collaborator the search runs against.
//!
//! Cells are stored as sixteen 4-bit exponents in a `u64`, row-major, with
//! cell 0 (top-left) in the highest nibble. An exponent of 0 is an empty cell
//! and `e > 0` is the tile `2^e`, so the largest representable tile is 32768.
//!
//! Slides are served from 65,536-entry line tables built once on first use.

use std::fmt;
use std::sync::OnceLock;

use rand::Rng;

use crate::error::EngineError;

/// A direction to slide/merge tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

impl Move {
    /// All directions in the fixed order the search tries them.
    pub const ALL: [Move; 4] = [Move::Up, Move::Down, Move::Left, Move::Right];

    #[inline]
    pub fn index(self) -> usize { self as usize }
}

impl TryFrom<u8> for Move {
    type Error = EngineError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Move::Up),
            1 => Ok(Move::Down),
            2 => Ok(Move::Left),
            3 => Ok(Move::Right),
            other => Err(EngineError::InvalidDirection(other)),
        }
    }
}

impl From<Move> for u8 {
    fn from(dir: Move) -> u8 { dir as u8 }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Move::Up => "up",
            Move::Down => "down",
            Move::Left => "left",
            Move::Right => "right",
        };
        f.write_str(name)
    }
}

/// Which side of the game tree is about to act.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The player choosing a slide direction.
    Agent,
    /// The environment dropping a new tile into an empty cell.
    Chance,
}

/// Percentage of random spawns that are a 4 rather than a 2.
pub const SPAWN_FOUR_PERCENT: u32 = 10;

/// Largest storable exponent (tile 32768).
pub const MAX_EXPONENT: u8 = 15;

const LINE_TABLE_SIZE: usize = 0x1_0000; // every possible 16-bit row

type BoardRaw = u64;
type Line = u16;

struct Tables {
    slide_left: Box<[Line]>,
    slide_right: Box<[Line]>,
    score: Box<[u64]>,
}

static TABLES: OnceLock<Tables> = OnceLock::new();

/// Build the line tables now instead of on the first move. Safe to call repeatedly.
pub fn warm() {
    let _ = tables();
}

#[inline(always)]
fn tables() -> &'static Tables { TABLES.get_or_init(build_tables) }

fn build_tables() -> Tables {
    let mut slide_left = vec![0 as Line; LINE_TABLE_SIZE];
    let mut slide_right = vec![0 as Line; LINE_TABLE_SIZE];
    let mut score = vec![0u64; LINE_TABLE_SIZE];

    for idx in 0..LINE_TABLE_SIZE {
        let tiles = unpack_line(idx as Line);
        slide_left[idx] = pack_line(slide_towards_start(tiles));

        let mut reversed = tiles;
        reversed.reverse();
        let mut slid = slide_towards_start(reversed);
        slid.reverse();
        slide_right[idx] = pack_line(slid);

        score[idx] = line_score(tiles);
    }

    Tables {
        slide_left: slide_left.into_boxed_slice(),
        slide_right: slide_right.into_boxed_slice(),
        score: score.into_boxed_slice(),
    }
}

fn unpack_line(line: Line) -> [u8; 4] {
    [
        ((line >> 12) & 0xf) as u8,
        ((line >> 8) & 0xf) as u8,
        ((line >> 4) & 0xf) as u8,
        (line & 0xf) as u8,
    ]
}

fn pack_line(tiles: [u8; 4]) -> Line {
    (tiles[0] as Line) << 12 | (tiles[1] as Line) << 8 | (tiles[2] as Line) << 4 | tiles[3] as Line
}

/// Slide toward index 0, merging equal neighbours once per move.
///
/// Two 32768 tiles stay apart: their sum does not fit in a nibble.
fn slide_towards_start(tiles: [u8; 4]) -> [u8; 4] {
    let mut out = [0u8; 4];
    let mut len = 0;
    let mut can_merge = false;
    for &tile in tiles.iter().filter(|&&t| t != 0) {
        if can_merge && out[len - 1] == tile && tile < MAX_EXPONENT {
            out[len - 1] += 1;
            can_merge = false;
        } else {
            out[len] = tile;
            len += 1;
            can_merge = true;
        }
    }
    out
}

// Credit to Nneonneo: every tile of exponent e >= 2 was built by merges worth
// (e - 1) * 2^e in total.
fn line_score(tiles: [u8; 4]) -> u64 {
    tiles
        .iter()
        .filter(|&&e| e >= 2)
        .map(|&e| (e as u64 - 1) * (1u64 << e))
        .sum()
}

// Credit to Nneonneo
fn transpose(x: BoardRaw) -> BoardRaw {
    let a1 = x & 0xF0F00F0FF0F00F0F;
    let a2 = x & 0x0000F0F00000F0F0;
    let a3 = x & 0x0F0F00000F0F0000;
    let a = a1 | (a2 << 12) | (a3 >> 12);
    let b1 = a & 0xFF00FF0000FF00FF;
    let b2 = a & 0x00FF00FF00000000;
    let b3 = a & 0x00000000FF00FF00;
    b1 | (b2 >> 24) | (b3 << 24)
}

#[inline]
fn row_shift(row: usize) -> u32 { 48 - 16 * row as u32 }

fn slide_rows(raw: BoardRaw, table: &[Line]) -> BoardRaw {
    (0..4).fold(0, |acc, row| {
        let shift = row_shift(row);
        let line = ((raw >> shift) & 0xffff) as usize;
        acc | (table[line] as BoardRaw) << shift
    })
}

/// Packed 4x4 board of tile exponents.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Board(BoardRaw);

/// Exclusive copy of a board's contents taken before a hypothetical move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot(Board);

impl Board {
    /// A board with no tiles.
    pub const EMPTY: Board = Board(0);

    #[inline]
    pub fn from_raw(raw: BoardRaw) -> Self { Board(raw) }

    #[inline]
    pub fn raw(&self) -> BoardRaw { self.0 }

    /// Build a board from tile values, top row first.
    ///
    /// ```
    /// use minimax_2048::engine::Board;
    /// let b = Board::from_rows([[2, 4, 8, 16], [0; 4], [0; 4], [0; 4]]).unwrap();
    /// assert_eq!(b.tile(0, 3), 16);
    /// assert_eq!(b.count_empty(), 12);
    /// assert!(Board::from_rows([[3, 0, 0, 0], [0; 4], [0; 4], [0; 4]]).is_err());
    /// ```
    pub fn from_rows(rows: [[u32; 4]; 4]) -> Result<Self, EngineError> {
        let mut board = Board::EMPTY;
        for (row, values) in rows.iter().enumerate() {
            for (col, &value) in values.iter().enumerate() {
                board.set_tile(row, col, value)?;
            }
        }
        Ok(board)
    }

    /// Tile values, top row first.
    pub fn to_rows(self) -> [[u32; 4]; 4] {
        let mut rows = [[0u32; 4]; 4];
        for (row, values) in rows.iter_mut().enumerate() {
            for (col, value) in values.iter_mut().enumerate() {
                *value = self.tile(row, col);
            }
        }
        rows
    }

    /// Exponent stored at row-major cell `idx` (0 when empty).
    ///
    /// # Panics
    /// If `idx >= 16`.
    #[inline]
    pub fn exponent(self, idx: usize) -> u8 {
        assert!(idx < 16, "cell index {idx} outside the 4x4 board");
        ((self.0 >> (60 - 4 * idx)) & 0xf) as u8
    }

    /// Tile value at row-major cell `idx` (0 when empty). Panics like [`Self::exponent`].
    #[inline]
    pub fn value(self, idx: usize) -> u32 {
        match self.exponent(idx) {
            0 => 0,
            e => 1 << e,
        }
    }

    /// Tile value at (`row`, `col`) (0 when empty).
    ///
    /// # Panics
    /// If `row` or `col` is 4 or more. [`Self::set_tile`] reports the same
    /// misuse as [`EngineError::CellOutOfRange`] instead.
    #[inline]
    pub fn tile(self, row: usize, col: usize) -> u32 {
        assert!(row < 4 && col < 4, "cell ({row}, {col}) outside the 4x4 board");
        self.value(row * 4 + col)
    }

    /// Overwrite one cell in place. `value` must be 0 or a power of two in `2..=32768`.
    pub fn set_tile(&mut self, row: usize, col: usize, value: u32) -> Result<(), EngineError> {
        if row >= 4 || col >= 4 {
            return Err(EngineError::CellOutOfRange { row, col });
        }
        let exponent = match value {
            0 => 0,
            v if v >= 2 && v.is_power_of_two() && v.trailing_zeros() <= MAX_EXPONENT as u32 => {
                v.trailing_zeros() as u8
            }
            _ => return Err(EngineError::InvalidTile { row, col, value }),
        };
        self.place(row * 4 + col, exponent);
        Ok(())
    }

    /// Unchecked in-place write of an exponent; used by the search's chance ply.
    #[inline]
    pub(crate) fn place(&mut self, idx: usize, exponent: u8) {
        debug_assert!(idx < 16 && exponent <= MAX_EXPONENT);
        let shift = 60 - 4 * idx;
        self.0 = (self.0 & !(0xf << shift)) | ((exponent as BoardRaw) << shift);
    }

    /// The board after sliding/merging in `dir` (no tile spawned).
    #[inline]
    pub fn shift(self, dir: Move) -> Self {
        let t = tables();
        let raw = match dir {
            Move::Left => slide_rows(self.0, &t.slide_left),
            Move::Right => slide_rows(self.0, &t.slide_right),
            Move::Up => transpose(slide_rows(transpose(self.0), &t.slide_left)),
            Move::Down => transpose(slide_rows(transpose(self.0), &t.slide_right)),
        };
        Board(raw)
    }

    /// True if sliding in `dir` changes at least one cell.
    #[inline]
    pub fn can_move(self, dir: Move) -> bool { self.shift(dir) != self }

    /// Slide in place. Returns false (and leaves the board alone) for an illegal move.
    #[inline]
    pub fn apply_move(&mut self, dir: Move) -> bool {
        let moved = self.shift(dir);
        let changed = moved != *self;
        *self = moved;
        changed
    }

    /// True if no direction changes the board.
    ///
    /// ```
    /// use minimax_2048::engine::Board;
    /// // Nothing to slide on an empty board.
    /// assert!(Board::EMPTY.is_game_over());
    /// ```
    #[inline]
    pub fn is_game_over(self) -> bool { Move::ALL.iter().all(|&dir| !self.can_move(dir)) }

    /// Whether `role` has nothing left to do on this board.
    ///
    /// The agent is stuck when no move is legal. The chance side is also
    /// stuck when there is no empty cell to drop a tile into.
    pub fn is_terminal(self, role: Role) -> bool {
        match role {
            Role::Agent => self.is_game_over(),
            Role::Chance => self.count_empty() == 0 || self.is_game_over(),
        }
    }

    #[inline]
    pub fn snapshot(&self) -> Snapshot { Snapshot(*self) }

    #[inline]
    pub fn restore(&mut self, snapshot: Snapshot) { *self = snapshot.0; }

    // https://stackoverflow.com/questions/38225571/count-number-of-zero-nibbles-in-an-unsigned-64-bit-integer
    /// Number of empty cells.
    #[inline]
    pub fn count_empty(self) -> u32 {
        let mut x = self.0;
        x |= x >> 1;
        x |= x >> 2;
        x &= 0x1111111111111111;
        16 - x.count_ones()
    }

    /// Row-major indices of the empty cells, in ascending order.
    pub fn empty_cells(self) -> impl Iterator<Item = usize> {
        (0..16).filter(move |&idx| self.exponent(idx) == 0)
    }

    /// Largest tile value on the board (0 for an empty board).
    pub fn highest_tile(self) -> u32 { (0..16).map(|idx| self.value(idx)).max().unwrap_or(0) }

    /// Game score implied by the tiles on the board.
    pub fn score(self) -> u64 {
        let t = tables();
        (0..4).map(|row| t.score[((self.0 >> row_shift(row)) & 0xffff) as usize]).sum()
    }

    /// Drop a 2 (90%) or a 4 (10%) into a uniformly chosen empty cell.
    ///
    /// A full board is returned unchanged.
    ///
    /// ```
    /// use minimax_2048::engine::Board;
    /// use rand::{rngs::StdRng, SeedableRng};
    /// let mut rng = StdRng::seed_from_u64(123);
    /// let b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
    /// assert_eq!(b.count_empty(), 14);
    /// ```
    pub fn with_random_tile<R: Rng + ?Sized>(self, rng: &mut R) -> Self {
        let empty = self.count_empty();
        if empty == 0 {
            return self;
        }
        let target = rng.gen_range(0..empty) as usize;
        let exponent = if rng.gen_range(0..100) < SPAWN_FOUR_PERCENT { 2 } else { 1 };
        let mut next = self;
        if let Some(idx) = self.empty_cells().nth(target) {
            next.place(idx, exponent);
        }
        next
    }

    /// Slide in `dir`, then spawn a random tile if the slide changed anything.
    pub fn make_move<R: Rng + ?Sized>(self, dir: Move, rng: &mut R) -> Self {
        let moved = self.shift(dir);
        if moved != self { moved.with_random_tile(rng) } else { self }
    }
}

/// Recover which direction turns `before` into `after`.
///
/// `after` may be the bare slide result or the slide plus one freshly
/// spawned 2 or 4. Directions are tried in [`Move::ALL`] order.
///
/// ```
/// use minimax_2048::engine::{move_between, Board, Move};
/// let before = Board::from_rows([[0, 0, 0, 2], [0; 4], [0; 4], [0; 4]]).unwrap();
/// let after = Board::from_rows([[2, 0, 0, 4], [0; 4], [0; 4], [0; 4]]).unwrap();
/// assert_eq!(move_between(before, after), Some(Move::Left));
/// ```
pub fn move_between(before: Board, after: Board) -> Option<Move> {
    Move::ALL.into_iter().find(|&dir| {
        let slid = before.shift(dir);
        slid != before && (slid == after || is_single_spawn(slid, after))
    })
}

fn is_single_spawn(base: Board, next: Board) -> bool {
    let mut changed = (0..16).filter(|&idx| base.exponent(idx) != next.exponent(idx));
    match (changed.next(), changed.next()) {
        (Some(idx), None) => base.exponent(idx) == 0 && matches!(next.exponent(idx), 1 | 2),
        _ => false,
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({:#018x})", self.0)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..4 {
            if row > 0 {
                writeln!(f, "{}", "-".repeat(31))?;
            }
            let cells: Vec<String> = (0..4)
                .map(|col| match self.tile(row, col) {
                    0 => " ".repeat(7),
                    v => format!("{:^7}", v),
                })
                .collect();
            writeln!(f, "{}", cells.join("|"))?;
        }
        Ok(())
    }
}
