//! Pending transactions awaiting inclusion in a block.
//!
//! Thread-safe: one lock guards both the hash index and the insertion order,
//! so `drain` hands each transaction out exactly once.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use crate::types::*;

#[derive(Debug, Default)]
struct PoolInner {
    transactions: HashMap<Hash, Transaction>,
    /// Insertion order for deterministic block construction
    order: Vec<Hash>,
}

#[derive(Debug, Default)]
pub struct TransactionPool {
    inner: RwLock<PoolInner>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transaction without validating it.
    ///
    /// Returns false if the transaction has no identity or is already pending.
    pub fn add_transaction(&self, tx: Transaction) -> bool {
        let Some(hash) = tx.hash else {
            debug!("Ignoring pending transaction without identity");
            return false;
        };

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.transactions.contains_key(&hash) {
            return false;
        }
        inner.order.push(hash);
        inner.transactions.insert(hash, tx);
        true
    }

    pub fn remove_transaction(&self, hash: &Hash) -> Option<Transaction> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let removed = inner.transactions.remove(hash)?;
        inner.order.retain(|h| h != hash);
        Some(removed)
    }

    /// Remove every transaction in `hashes`, returning how many were pending.
    pub fn remove_batch(&self, hashes: &[Hash]) -> usize {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let removed = hashes
            .iter()
            .filter(|hash| inner.transactions.remove(*hash).is_some())
            .count();
        if removed > 0 {
            let PoolInner { transactions, order } = &mut *inner;
            order.retain(|h| transactions.contains_key(h));
        }
        removed
    }

    pub fn get_transaction(&self, hash: &Hash) -> Option<Transaction> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.transactions.get(hash).cloned()
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.transactions.contains_key(hash)
    }

    /// Copy of every pending transaction in insertion order.
    pub fn transactions(&self) -> Vec<Transaction> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .order
            .iter()
            .filter_map(|h| inner.transactions.get(h).cloned())
            .collect()
    }

    /// Atomically remove and return every pending transaction in insertion order.
    pub fn drain(&self) -> Vec<Transaction> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let PoolInner { mut transactions, order } = std::mem::take(&mut *inner);
        order
            .into_iter()
            .filter_map(|h| transactions.remove(&h))
            .collect()
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(seed: u8) -> Transaction {
        let mut tx = Transaction::new();
        tx.add_input([seed; 32], 0);
        tx.add_output(seed as Integer, &[seed; 33]);
        tx.finalize();
        tx
    }

    #[test]
    fn test_add_and_order() {
        let pool = TransactionPool::new();
        assert!(pool.add_transaction(tx(3)));
        assert!(pool.add_transaction(tx(1)));
        assert!(pool.add_transaction(tx(2)));

        let hashes: Vec<_> = pool.transactions().iter().map(|t| t.hash).collect();
        assert_eq!(hashes, vec![tx(3).hash, tx(1).hash, tx(2).hash]);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_duplicate_and_unfinalized_ignored() {
        let pool = TransactionPool::new();
        assert!(pool.add_transaction(tx(1)));
        assert!(!pool.add_transaction(tx(1)));

        let mut unfinalized = Transaction::new();
        unfinalized.add_output(1, &[1u8; 33]);
        assert!(!pool.add_transaction(unfinalized));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_drain_empties_pool() {
        let pool = TransactionPool::new();
        pool.add_transaction(tx(1));
        pool.add_transaction(tx(2));

        let drained = pool.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].hash, tx(1).hash);
        assert!(pool.is_empty());
        assert!(pool.drain().is_empty());

        // Drained transactions may be offered again later
        assert!(pool.add_transaction(tx(1)));
    }

    #[test]
    fn test_remove() {
        let pool = TransactionPool::new();
        let a = tx(1);
        let b = tx(2);
        let c = tx(3);
        pool.add_transaction(a.clone());
        pool.add_transaction(b.clone());
        pool.add_transaction(c.clone());

        assert_eq!(pool.remove_transaction(&a.hash.unwrap()), Some(a.clone()));
        assert!(pool.remove_transaction(&a.hash.unwrap()).is_none());
        assert_eq!(pool.remove_batch(&[c.hash.unwrap(), [0; 32]]), 1);

        assert!(pool.contains(&b.hash.unwrap()));
        assert_eq!(pool.get_transaction(&b.hash.unwrap()), Some(b));
        assert_eq!(pool.transactions().len(), 1);
    }
}
