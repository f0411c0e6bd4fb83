//! Ledger configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{COINBASE_REWARD, CUTOFF_AGE};
use crate::error::{LedgerError, Result};
use crate::handler::SelectionPolicy;
use crate::types::{Integer, Natural};

/// Tunables for a [`BlockChain`](crate::chain::BlockChain).
///
/// Missing fields fall back to their defaults, so `{}` is a valid document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Fork-depth cutoff: blocks at or below `tip height - cutoff_age` are
    /// rejected and evicted
    pub cutoff_age: Natural,
    /// Coinbase value used when building blocks
    pub coinbase_reward: Integer,
    /// Candidate ordering used when building blocks from pending transactions
    pub selection_policy: SelectionPolicy,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            cutoff_age: CUTOFF_AGE,
            coinbase_reward: COINBASE_REWARD,
            selection_policy: SelectionPolicy::FirstFit,
        }
    }
}

impl ChainConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ChainConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cutoff_age == 0 {
            return Err(LedgerError::Config("cutoff_age must be at least 1".to_string()));
        }
        if self.coinbase_reward < 0 {
            return Err(LedgerError::Config(format!(
                "coinbase_reward must be non-negative, got {}",
                self.coinbase_reward
            )));
        }
        Ok(())
    }
}
