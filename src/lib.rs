//! minimax-2048: alpha-beta move search for the 4x4 game of 2048
//!
//! This crate provides:
//! - A compact `Board` type (`engine` module) with slides, legality checks,
//!   snapshots and seeded tile spawning
//! - A static evaluator (`evaluation` module) built on snake weight patterns,
//!   merge potential, empty cells and average tile value
//! - A depth-limited minimax with alpha-beta pruning (`search` module), in
//!   single-threaded and root-parallel variants
//! - TOML-backed settings (`config` module)
//!
//! Quick start:
//! ```
//! use minimax_2048::engine::{Board, Move};
//! use minimax_2048::search;
//!
//! let b = Board::from_rows([
//!     [2, 4, 8, 16],
//!     [0, 0, 0, 0],
//!     [0, 0, 0, 0],
//!     [0, 0, 0, 0],
//! ]).unwrap();
//! assert_eq!(search::best_move(b, 1).unwrap(), Some(Move::Down));
//! ```
//!
//! Full loop
//! ```
//! use minimax_2048::engine::Board;
//! use minimax_2048::search::{Minimax, SearchConfig};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut policy = Minimax::with_config(SearchConfig { depth: 2, ..Default::default() }).unwrap();
//! let mut rng = StdRng::seed_from_u64(123);
//! let mut b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
//! let mut moves = 0u32;
//! while moves < 4 {
//!     match policy.best_move(b) {
//!         Some(dir) => b = b.make_move(dir, &mut rng),
//!         None => break,
//!     }
//!     moves += 1;
//! }
//! assert!(moves > 0);
//! ```
//!
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluation;
pub mod search;

pub use error::EngineError;
