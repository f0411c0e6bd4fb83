//! Ledger constants

/// Maximum number of heights a new block may trail the best tip by
pub const CUTOFF_AGE: u64 = 10;

/// Value minted by a block's coinbase when no configuration overrides it
pub const COINBASE_REWARD: i64 = 25;

/// Height of the genesis block
pub const GENESIS_HEIGHT: u64 = 1;
