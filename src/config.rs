//! TOML-backed engine settings.
//!
//! Every field has a default, so an empty file is a valid config:
//!
//! ```toml
//! [search]
//! depth = 4
//! pruning = true
//! chance = { model = "weighted", four_percent = 10 }
//!
//! [eval]
//! tolerance = "strict"
//! weights = { order = 2, average = 1, merge = 40, empty = 30 }
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::EngineError;
use crate::evaluation::{EvalConfig, Evaluator};
use crate::search::{Minimax, MinimaxParallel, SearchConfig};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub search: SearchConfig,
    pub eval: EvalConfig,
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, EngineError> {
        let cfg: EngineConfig = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        self.search.validate()?;
        self.eval.weights.validate()
    }

    pub fn evaluator(&self) -> Evaluator { Evaluator::with_config(self.eval) }

    pub fn minimax(&self) -> Result<Minimax, EngineError> {
        Minimax::with_evaluator(self.search, self.evaluator())
    }

    pub fn minimax_parallel(&self) -> Result<MinimaxParallel, EngineError> {
        MinimaxParallel::with_evaluator(self.search, self.evaluator())
    }
}
