//! Bounded-depth fork tree of validated blocks
//!
//! Every retained block is stored with its height and the UTXO pool that
//! results from applying it on top of its parent. A block may only extend a
//! retained parent, its transactions must all be valid against that parent's
//! pool, and its height must stay within `cutoff_age` of the best tip.
//! Whenever the tip advances, nodes at or below `tip height - cutoff_age` are
//! evicted: no block could ever be accepted on top of them again.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, instrument};

use crate::config::ChainConfig;
use crate::constants::GENESIS_HEIGHT;
use crate::crypto::{Secp256k1Verifier, SignatureVerifier};
use crate::error::{LedgerError, Result};
use crate::handler::{SelectionPolicy, TxHandler};
use crate::txpool::TransactionPool;
use crate::types::*;
use crate::utxo::UtxoPool;

/// A retained block. The pool is owned by this node alone and never mutated
/// after construction; children start from a clone of it.
#[derive(Debug)]
struct BlockNode {
    block: Block,
    height: Natural,
    utxo_pool: UtxoPool,
}

#[derive(Debug)]
struct ChainState {
    nodes: HashMap<Hash, BlockNode>,
    /// Height → hashes at that height, for eviction
    heights: BTreeMap<Natural, Vec<Hash>>,
    tip: Hash,
    tip_height: Natural,
}

impl ChainState {
    fn insert(&mut self, hash: Hash, node: BlockNode) {
        self.heights.entry(node.height).or_default().push(hash);
        self.nodes.insert(hash, node);
    }

    fn tip_node(&self) -> &BlockNode {
        // The tip is never evicted: cutoff_age >= 1 keeps it above the threshold
        &self.nodes[&self.tip]
    }

    /// Transaction identities in `hash` and every retained ancestor.
    fn branch_transactions(&self, hash: Hash) -> Vec<Hash> {
        let mut included = Vec::new();
        let mut cursor = Some(hash);
        while let Some(node) = cursor.and_then(|h| self.nodes.get(&h)) {
            included.extend(node.block.transactions.iter().filter_map(|tx| tx.hash));
            cursor = node.block.prev_block_hash;
        }
        included
    }

    /// Drop every node at or below `threshold`. Returns how many were removed.
    fn evict_through(&mut self, threshold: Natural) -> usize {
        let retained = self.heights.split_off(&(threshold + 1));
        let expired = std::mem::replace(&mut self.heights, retained);

        expired
            .into_values()
            .flatten()
            .filter(|hash| self.nodes.remove(hash).is_some())
            .count()
    }
}

/// The ledger: fork tree, best tip and pending transactions.
///
/// All mutation happens inside [`BlockChain::add_block`] under one write lock;
/// readers take the read lock and receive owned copies.
pub struct BlockChain {
    state: RwLock<ChainState>,
    tx_pool: Arc<TransactionPool>,
    config: ChainConfig,
    verifier: Arc<dyn SignatureVerifier>,
}

impl BlockChain {
    /// Create a chain holding only `genesis` at height 1.
    ///
    /// The genesis pool is empty apart from the genesis coinbase outputs.
    pub fn new(genesis: Block) -> Result<Self> {
        Self::with_config(genesis, ChainConfig::default())
    }

    pub fn with_config(genesis: Block, config: ChainConfig) -> Result<Self> {
        config.validate()?;
        if !genesis.is_genesis() {
            return Err(LedgerError::GenesisHasParent);
        }
        let hash = genesis.id()?;

        let mut utxo_pool = UtxoPool::new();
        if !utxo_pool.add_transaction_outputs(&genesis.coinbase) {
            return Err(LedgerError::UnfinalizedTransaction);
        }

        let mut state = ChainState {
            nodes: HashMap::new(),
            heights: BTreeMap::new(),
            tip: hash,
            tip_height: GENESIS_HEIGHT,
        };
        state.insert(hash, BlockNode { block: genesis, height: GENESIS_HEIGHT, utxo_pool });

        Ok(Self {
            state: RwLock::new(state),
            tx_pool: Arc::new(TransactionPool::new()),
            config,
            verifier: Arc::new(Secp256k1Verifier::new()),
        })
    }

    /// Replace the signature verifier.
    pub fn with_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn verifier(&self) -> &dyn SignatureVerifier {
        self.verifier.as_ref()
    }

    /// Block at the greatest height. On equal heights the first accepted wins.
    pub fn best_tip(&self) -> Block {
        self.read_state().tip_node().block.clone()
    }

    /// Independent copy of the best tip's pool, to build the next block against.
    pub fn pool_for_mining(&self) -> UtxoPool {
        self.read_state().tip_node().utxo_pool.clone()
    }

    /// Best tip and its pool, read under one lock so they always agree.
    pub fn tip_snapshot(&self) -> (Block, UtxoPool) {
        let state = self.read_state();
        let tip = state.tip_node();
        (tip.block.clone(), tip.utxo_pool.clone())
    }

    pub fn pending_transaction_pool(&self) -> Arc<TransactionPool> {
        Arc::clone(&self.tx_pool)
    }

    /// Queue a transaction for a future block. Not validated here.
    pub fn add_transaction(&self, tx: Transaction) -> bool {
        self.tx_pool.add_transaction(tx)
    }

    /// Height of the best tip.
    pub fn height(&self) -> Natural {
        self.read_state().tip_height
    }

    /// Number of retained blocks.
    pub fn block_count(&self) -> usize {
        self.read_state().nodes.len()
    }

    pub fn contains_block(&self, hash: &Hash) -> bool {
        self.read_state().nodes.contains_key(hash)
    }

    pub fn block_height(&self, hash: &Hash) -> Option<Natural> {
        self.read_state().nodes.get(hash).map(|node| node.height)
    }

    pub fn get_block(&self, hash: &Hash) -> Option<Block> {
        self.read_state().nodes.get(hash).map(|node| node.block.clone())
    }

    /// Copy of the pool that results from applying the retained block `hash`.
    pub fn utxo_pool_at(&self, hash: &Hash) -> Option<UtxoPool> {
        self.read_state().nodes.get(hash).map(|node| node.utxo_pool.clone())
    }

    /// Attach `block` to the tree if it is valid. All-or-nothing.
    pub fn add_block(&self, block: &Block) -> bool {
        self.try_add_block(block).is_valid()
    }

    /// [`add_block`](Self::add_block) with the rejection reason.
    ///
    /// A rejected block leaves the ledger exactly as it was.
    #[instrument(skip_all, fields(block = %short_id(block.hash)))]
    pub fn try_add_block(&self, block: &Block) -> ValidationResult {
        let result = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            self.connect_block(&mut state, block)
        };

        match result {
            Ok(confirmed) => {
                let pruned = self.tx_pool.remove_batch(&confirmed);
                if pruned > 0 {
                    debug!(pruned, "Removed confirmed transactions from pending pool");
                }
                ValidationResult::Valid
            }
            Err(reason) => {
                debug!(%reason, "Block rejected");
                ValidationResult::Invalid(reason)
            }
        }
    }

    /// Validate `block` against `state` and index it. Nothing in `state`
    /// changes unless the block is accepted.
    ///
    /// On success returns the transactions that just joined the best chain:
    /// empty when the block lands on a side branch, and the whole newly
    /// preferred branch when a side branch overtakes the tip.
    fn connect_block(
        &self,
        state: &mut ChainState,
        block: &Block,
    ) -> std::result::Result<Vec<Hash>, String> {
        // 1. Only genesis may lack a parent, and genesis is never added here
        let Some(prev_hash) = block.prev_block_hash else {
            return Err("Block has no parent".to_string());
        };
        let Some(hash) = block.hash else {
            return Err("Block identity not finalized".to_string());
        };
        if state.nodes.contains_key(&hash) {
            return Err("Block already in chain".to_string());
        }

        // 2. Parent must be retained; evicted ancestors count as unknown
        let Some(parent) = state.nodes.get(&prev_hash) else {
            return Err("Unknown parent block".to_string());
        };
        let parent_height = parent.height;

        // 3. Every transaction must be accepted, in block order
        let mut handler = TxHandler::new(
            &parent.utxo_pool,
            self.verifier.as_ref(),
            SelectionPolicy::FirstFit,
        );
        let accepted = handler.handle_txs(&block.transactions);
        if accepted.len() != block.transactions.len() {
            return Err(format!(
                "Only {} of {} transactions valid",
                accepted.len(),
                block.transactions.len()
            ));
        }

        // 4. Fork-depth cutoff: reject height <= tip height - cutoff_age.
        // Eviction already keeps such parents out of the tree, so this only
        // guards the invariant.
        let height = parent_height + 1;
        if height.saturating_add(self.config.cutoff_age) <= state.tip_height {
            return Err(format!(
                "Height {} too far behind tip height {}",
                height, state.tip_height
            ));
        }

        // 5. Coinbase mints unconditionally
        let mut utxo_pool = handler.into_utxo_pool();
        if !utxo_pool.add_transaction_outputs(&block.coinbase) {
            return Err("Coinbase identity not finalized".to_string());
        }

        // 6. Index, advancing the tip only on strictly greater height
        let extends_tip = prev_hash == state.tip;
        state.insert(hash, BlockNode { block: block.clone(), height, utxo_pool });
        if height <= state.tip_height {
            info!(height, "Block added on a side branch");
            return Ok(Vec::new());
        }

        state.tip = hash;
        state.tip_height = height;
        info!(height, "Best tip advanced");

        // 7. Transactions now on the best chain leave the pending pool
        let confirmed = if extends_tip {
            block.transactions.iter().filter_map(|tx| tx.hash).collect()
        } else {
            state.branch_transactions(hash)
        };

        // 8. Nothing at or below the new threshold can gain a child
        if let Some(threshold) = height.checked_sub(self.config.cutoff_age) {
            let evicted = state.evict_through(threshold);
            if evicted > 0 {
                debug!(evicted, threshold, "Evicted blocks outside cutoff window");
            }
        }

        Ok(confirmed)
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, ChainState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// First four bytes of a block identity, for logs.
fn short_id(hash: Option<Hash>) -> String {
    match hash {
        Some(h) => h[..4].iter().map(|b| format!("{:02x}", b)).collect(),
        None => "unfinalized".to_string(),
    }
}
