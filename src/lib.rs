//! # Fork-Ledger
//!
//! A minimal UTXO ledger: transaction validation against an unspent output
//! pool, atomic block validation, and a bounded-depth fork tree that always
//! knows its best tip and the pool to build the next block on.
//!
//! ## Architecture
//!
//! Leaves first:
//! - [`utxo::UtxoPool`]: output identity → unspent output
//! - [`transaction`]: single-transaction validity against a pool
//! - [`handler`]: batch acceptance, first-fit or max-fee-greedy
//! - [`txpool::TransactionPool`]: pending transactions
//! - [`chain::BlockChain`]: the fork tree, best tip and block acceptance
//!
//! Hashing ([`hashing`]) and signature checking ([`crypto`]) are concrete
//! here but sit behind narrow seams; the chain only compares identities and
//! asks a [`crypto::SignatureVerifier`] for yes or no.
//!
//! ## Usage
//!
//! ```rust
//! use fork_ledger::{Block, BlockChain, KeyPair, OutPoint, Transaction};
//!
//! let alice = KeyPair::from_secret_bytes(&[1u8; 32]).unwrap();
//! let bob = KeyPair::from_secret_bytes(&[2u8; 32]).unwrap();
//!
//! let mut genesis = Block::new(None, &alice.public_key(), 100);
//! genesis.finalize();
//! let chain = BlockChain::new(genesis.clone()).unwrap();
//!
//! // Alice pays Bob 40 out of the genesis coinbase
//! let coin = OutPoint::new(genesis.coinbase.hash.unwrap(), 0);
//! let mut tx = Transaction::new();
//! tx.add_input(coin.hash, coin.index);
//! tx.add_output(40, &bob.public_key());
//! tx.add_output(60, &alice.public_key());
//! let sig = alice.sign(&tx.raw_data_to_sign(0).unwrap());
//! tx.add_signature(sig, 0);
//! tx.finalize();
//!
//! let mut block = Block::new(genesis.hash, &bob.public_key(), 10);
//! block.add_transaction(tx);
//! block.finalize();
//!
//! assert!(chain.add_block(&block));
//! assert_eq!(chain.best_tip(), block);
//! assert_eq!(chain.pool_for_mining().balance_of(&bob.public_key()), Some(50));
//! ```

pub mod types;
pub mod constants;
pub mod error;
pub mod hashing;
pub mod crypto;
pub mod utxo;
pub mod transaction;
pub mod handler;
pub mod txpool;
pub mod config;
pub mod chain;
pub mod block_handler;

// Re-export commonly used types
pub use types::*;
pub use constants::*;
pub use error::{LedgerError, Result};
pub use crypto::{KeyPair, Secp256k1Verifier, SignatureVerifier};
pub use utxo::UtxoPool;
pub use transaction::{calculate_fee, check_tx, is_valid_tx};
pub use handler::{handle_txs, SelectionPolicy, TxHandler};
pub use txpool::TransactionPool;
pub use config::ChainConfig;
pub use chain::BlockChain;
pub use block_handler::BlockHandler;
