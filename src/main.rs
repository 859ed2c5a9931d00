use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use minimax_2048::config::EngineConfig;
use minimax_2048::engine::{Board, Move};
use rand::{rngs::StdRng, SeedableRng};
use rayon::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "minimax-2048", version, about = "Play 2048 with an alpha-beta minimax policy")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args, Debug, Clone)]
struct EngineArgs {
    /// TOML config file (defaults apply when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Override the configured search depth
    #[arg(short, long)]
    depth: Option<u32>,
    /// Stop after this many moves
    #[arg(long)]
    max_moves: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play one game, printing the board after every move
    Play {
        #[command(flatten)]
        engine: EngineArgs,
        /// RNG seed for tile spawns
        #[arg(short, long, default_value_t = 42)]
        seed: u64,
        /// Search the four root moves in parallel
        #[arg(long)]
        parallel: bool,
        /// Only print the final summary
        #[arg(short, long)]
        quiet: bool,
    },
    /// Play many games concurrently and report the tile distribution
    Batch {
        #[command(flatten)]
        engine: EngineArgs,
        /// Number of games
        #[arg(short, long, default_value_t = 16)]
        games: u64,
        /// Seed of the first game; game i uses seed + i
        #[arg(short, long, default_value_t = 0)]
        seed: u64,
    },
}

struct GameSummary {
    moves: u64,
    score: u64,
    highest_tile: u32,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Play { engine, seed, parallel, quiet } => {
            let cfg = load_config(&engine)?;
            let start = Instant::now();
            let summary = if parallel {
                let mut policy = cfg.minimax_parallel()?;
                play_game(seed, engine.max_moves, quiet, |b| policy.best_move(b))
            } else {
                let mut policy = cfg.minimax()?;
                play_game(seed, engine.max_moves, quiet, |b| policy.best_move(b))
            };
            println!(
                "Moves: {} | score: {} | highest tile: {} | {:.1} moves/sec",
                summary.moves,
                summary.score,
                summary.highest_tile,
                summary.moves as f64 / start.elapsed().as_secs_f64().max(1e-6)
            );
        }
        Command::Batch { engine, games, seed } => {
            let cfg = load_config(&engine)?;
            // Fail on a bad config before spawning workers.
            cfg.minimax()?;
            let pb = ProgressBar::new(games);
            pb.set_style(
                ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} games ({eta})")?
                    .progress_chars("=>-"),
            );
            let summaries = (0..games)
                .into_par_iter()
                .map(|i| -> anyhow::Result<GameSummary> {
                    let mut policy = cfg.minimax()?;
                    let summary = play_game(game_seed(seed, i), engine.max_moves, true, |b| policy.best_move(b));
                    pb.inc(1);
                    Ok(summary)
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            pb.finish_and_clear();
            report(&summaries);
        }
    }
    Ok(())
}

fn load_config(args: &EngineArgs) -> anyhow::Result<EngineConfig> {
    let mut cfg = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(depth) = args.depth {
        cfg.search.depth = depth;
    }
    cfg.validate()?;
    info!("engine config: {:?}", cfg);
    Ok(cfg)
}

/// Seed of game `i` in a batch; wraps instead of overflowing near `u64::MAX`.
fn game_seed(base: u64, i: u64) -> u64 { base.wrapping_add(i) }

fn play_game<F>(seed: u64, max_moves: Option<u64>, quiet: bool, mut next_move: F) -> GameSummary
where
    F: FnMut(Board) -> Option<Move>,
{
    let mut rng = StdRng::seed_from_u64(seed);
    let mut board = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
    if !quiet {
        println!("{}", board);
    }
    let mut moves = 0u64;
    while !board.is_game_over() {
        if max_moves.is_some_and(|limit| moves >= limit) {
            break;
        }
        let Some(dir) = next_move(board) else { break };
        board = board.make_move(dir, &mut rng);
        moves += 1;
        if !quiet {
            println!("{}: {}\n{}", moves, dir, board);
        }
    }
    GameSummary { moves, score: board.score(), highest_tile: board.highest_tile() }
}

fn report(summaries: &[GameSummary]) {
    let mut tiles: BTreeMap<u32, usize> = BTreeMap::new();
    for s in summaries {
        *tiles.entry(s.highest_tile).or_default() += 1;
    }
    let n = summaries.len().max(1) as f64;
    let mean_score = summaries.iter().map(|s| s.score as f64).sum::<f64>() / n;
    let mean_moves = summaries.iter().map(|s| s.moves as f64).sum::<f64>() / n;
    println!("games: {} | mean score: {:.0} | mean moves: {:.0}", summaries.len(), mean_score, mean_moves);
    for (tile, count) in tiles.iter().rev() {
        println!("{:>6}: {:>4} ({:.1}%)", tile, count, 100.0 * *count as f64 / n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_seeds_wrap_at_the_top_of_the_range() {
        assert_eq!(game_seed(7, 3), 10);
        assert_eq!(game_seed(u64::MAX, 0), u64::MAX);
        assert_eq!(game_seed(u64::MAX, 1), 0);
        assert_eq!(game_seed(u64::MAX - 1, 5), 3);
    }

    #[test]
    fn play_game_stops_at_the_move_limit() {
        let summary = play_game(game_seed(u64::MAX, 2), Some(5), true, |b| {
            Move::ALL.into_iter().find(|&dir| b.can_move(dir))
        });
        assert_eq!(summary.moves, 5);
        assert!(summary.highest_tile >= 2);
    }
}
