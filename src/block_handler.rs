//! Driver for a node working against a [`BlockChain`]
//!
//! Builds blocks on the best tip from pending transactions and forwards
//! received blocks and transactions to the chain.

use tracing::{debug, info};

use crate::chain::BlockChain;
use crate::handler::TxHandler;
use crate::types::*;

pub struct BlockHandler<'a> {
    chain: &'a BlockChain,
}

impl<'a> BlockHandler<'a> {
    pub fn new(chain: &'a BlockChain) -> Self {
        Self { chain }
    }

    /// Add a block received from elsewhere. Returns whether it was accepted.
    pub fn process_block(&self, block: &Block) -> bool {
        self.chain.add_block(block)
    }

    /// Queue a transaction received from elsewhere.
    pub fn process_tx(&self, tx: Transaction) -> bool {
        self.chain.add_transaction(tx)
    }

    /// Build a block on the best tip paying the coinbase to `owner` and add it.
    ///
    /// Pending transactions are filtered with the configured selection policy
    /// against the tip's pool. Returns the block if the chain accepted it.
    pub fn create_block(&self, owner: &[u8]) -> Option<Block> {
        let config = self.chain.config();
        let (parent, pool) = self.chain.tip_snapshot();

        let candidates = self.chain.pending_transaction_pool().transactions();
        let mut handler = TxHandler::new(&pool, self.chain.verifier(), config.selection_policy);
        let accepted = handler.handle_txs(&candidates);
        debug!(
            candidates = candidates.len(),
            accepted = accepted.len(),
            "Selected transactions for new block"
        );

        let mut block = Block::new(parent.hash, owner, config.coinbase_reward);
        for tx in accepted {
            block.add_transaction(tx);
        }
        block.finalize();

        if self.chain.add_block(&block) {
            info!(transactions = block.transactions.len(), "Created block");
            Some(block)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainConfig;
    use crate::crypto::KeyPair;
    use crate::handler::SelectionPolicy;

    fn keys(seed: u8) -> KeyPair {
        KeyPair::from_secret_bytes(&[seed; 32]).unwrap()
    }

    fn spend(prev: OutPoint, signer: &KeyPair, outputs: &[(Integer, &KeyPair)]) -> Transaction {
        let mut tx = Transaction::new();
        tx.add_input(prev.hash, prev.index);
        for (value, owner) in outputs {
            tx.add_output(*value, &owner.public_key());
        }
        let sig = signer.sign(&tx.raw_data_to_sign(0).unwrap());
        tx.add_signature(sig, 0);
        tx.finalize();
        tx
    }

    #[test]
    fn test_create_block_on_empty_pool() {
        let alice = keys(1);
        let mut genesis = Block::new(None, &alice.public_key(), 25);
        genesis.finalize();
        let chain = BlockChain::new(genesis.clone()).unwrap();
        let handler = BlockHandler::new(&chain);

        let block = handler.create_block(&alice.public_key()).unwrap();
        assert_eq!(block.prev_block_hash, genesis.hash);
        assert!(block.transactions.is_empty());
        assert_eq!(chain.best_tip(), block);
        assert_eq!(chain.pool_for_mining().balance_of(&alice.public_key()), Some(50));
    }

    #[test]
    fn test_create_block_includes_valid_pending() {
        let alice = keys(1);
        let bob = keys(2);
        let mut genesis = Block::new(None, &alice.public_key(), 25);
        genesis.finalize();
        let chain = BlockChain::new(genesis.clone()).unwrap();
        let handler = BlockHandler::new(&chain);

        let coin = OutPoint::new(genesis.coinbase.hash.unwrap(), 0);
        let good = spend(coin, &alice, &[(20, &bob)]);
        let forged = spend(coin, &bob, &[(25, &bob)]);
        assert!(handler.process_tx(forged.clone()));
        assert!(handler.process_tx(good.clone()));

        let block = handler.create_block(&bob.public_key()).unwrap();
        assert_eq!(block.transactions, vec![good]);

        // Included transaction leaves the pending pool, the forged one stays
        let pending = chain.pending_transaction_pool();
        assert_eq!(pending.len(), 1);
        assert!(pending.contains(&forged.hash.unwrap()));
    }

    #[test]
    fn test_create_block_max_fee_policy() {
        let alice = keys(1);
        let bob = keys(2);
        let carol = keys(3);
        let mut genesis = Block::new(None, &alice.public_key(), 25);
        genesis.finalize();
        let config = ChainConfig { selection_policy: SelectionPolicy::MaxFee, ..ChainConfig::default() };
        let chain = BlockChain::with_config(genesis.clone(), config).unwrap();
        let handler = BlockHandler::new(&chain);

        let coin = OutPoint::new(genesis.coinbase.hash.unwrap(), 0);
        let cheap = spend(coin, &alice, &[(24, &bob)]);
        let generous = spend(coin, &alice, &[(15, &carol)]);
        handler.process_tx(cheap);
        handler.process_tx(generous.clone());

        let block = handler.create_block(&alice.public_key()).unwrap();
        assert_eq!(block.transactions, vec![generous]);
    }

    #[test]
    fn test_side_branch_transaction_reaches_next_block() {
        let alice = keys(1);
        let bob = keys(2);
        let mut genesis = Block::new(None, &alice.public_key(), 25);
        genesis.finalize();
        let chain = BlockChain::new(genesis.clone()).unwrap();
        let handler = BlockHandler::new(&chain);

        let coin = OutPoint::new(genesis.coinbase.hash.unwrap(), 0);
        let tx = spend(coin, &alice, &[(20, &bob)]);
        assert!(handler.process_tx(tx.clone()));

        // An empty block claims height 2 first, then a rival carries the transaction
        let mut empty = Block::new(genesis.hash, &alice.public_key(), 25);
        empty.finalize();
        let mut side = Block::new(genesis.hash, &bob.public_key(), 25);
        side.add_transaction(tx.clone());
        side.finalize();
        assert!(handler.process_block(&empty));
        assert!(handler.process_block(&side));
        assert_eq!(chain.best_tip(), empty);

        let next = handler.create_block(&alice.public_key()).unwrap();
        assert_eq!(next.prev_block_hash, empty.hash);
        assert_eq!(next.transactions, vec![tx]);
        assert!(chain.pending_transaction_pool().is_empty());
    }

    #[test]
    fn test_process_block_rejects_unknown_parent() {
        let alice = keys(1);
        let mut genesis = Block::new(None, &alice.public_key(), 25);
        genesis.finalize();
        let chain = BlockChain::new(genesis).unwrap();
        let handler = BlockHandler::new(&chain);

        let mut orphan = Block::new(Some([7; 32]), &alice.public_key(), 25);
        orphan.finalize();
        assert!(!handler.process_block(&orphan));
        assert_eq!(chain.block_count(), 1);
    }
}
