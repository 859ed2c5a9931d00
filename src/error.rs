use std::io;

/// Caller-side misuse and config failures. A lost game is not an error.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("invalid direction code {0} (expected 0..=3)")]
    InvalidDirection(u8),
    #[error("search depth {depth} outside 1..={max}")]
    DepthOutOfRange { depth: u32, max: u32 },
    #[error("invalid tile value {value} at ({row}, {col})")]
    InvalidTile { row: usize, col: usize, value: u32 },
    #[error("cell ({row}, {col}) is outside the 4x4 board")]
    CellOutOfRange { row: usize, col: usize },
    #[error("four-tile spawn rate {0}% is not a percentage")]
    InvalidFourRate(u8),
    #[error("evaluation weight `{name}` = {value} outside 1..={max}")]
    InvalidWeight { name: &'static str, value: i64, max: i64 },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}
