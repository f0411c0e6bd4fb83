//! Unspent transaction output pool
//!
//! UtxoPool: 𝒰𝒫 = 𝒪 → 𝒯

use std::collections::HashMap;

use crate::types::*;

/// Mapping from output identity to the unspent output it names.
///
/// `Clone` is a deep copy: no two pools ever share storage, so a clone can be
/// mutated freely without affecting the pool it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtxoPool {
    utxos: HashMap<OutPoint, TransactionOutput>,
}

impl UtxoPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the output at `outpoint`.
    pub fn add_utxo(&mut self, outpoint: OutPoint, output: TransactionOutput) {
        self.utxos.insert(outpoint, output);
    }

    pub fn remove_utxo(&mut self, outpoint: &OutPoint) -> Option<TransactionOutput> {
        self.utxos.remove(outpoint)
    }

    pub fn get_tx_output(&self, outpoint: &OutPoint) -> Option<&TransactionOutput> {
        self.utxos.get(outpoint)
    }

    pub fn contains(&self, outpoint: &OutPoint) -> bool {
        self.utxos.contains_key(outpoint)
    }

    /// All output identities currently unspent, in no particular order.
    pub fn all_utxo(&self) -> Vec<OutPoint> {
        self.utxos.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OutPoint, &TransactionOutput)> {
        self.utxos.iter()
    }

    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }

    /// Add every output of a finalized transaction under `(tx.hash, i)`.
    ///
    /// Returns false and leaves the pool untouched if `tx` has no identity.
    pub fn add_transaction_outputs(&mut self, tx: &Transaction) -> bool {
        let Some(hash) = tx.hash else {
            return false;
        };
        for (i, output) in tx.outputs.iter().enumerate() {
            self.add_utxo(OutPoint::new(hash, i as Natural), output.clone());
        }
        true
    }

    /// Sum of all unspent values, `None` on overflow.
    pub fn total_value(&self) -> Option<Integer> {
        self.utxos
            .values()
            .try_fold(0i64, |acc, output| acc.checked_add(output.value))
    }

    /// Total value owned by `owner`, `None` on overflow.
    pub fn balance_of(&self, owner: &[u8]) -> Option<Integer> {
        self.utxos
            .values()
            .filter(|output| output.owner == owner)
            .try_fold(0i64, |acc, output| acc.checked_add(output.value))
    }
}

impl FromIterator<(OutPoint, TransactionOutput)> for UtxoPool {
    fn from_iter<I: IntoIterator<Item = (OutPoint, TransactionOutput)>>(iter: I) -> Self {
        Self { utxos: iter.into_iter().collect() }
    }
}
