//! Batch transaction handling
//!
//! Turns an unordered set of candidate transactions into a mutually
//! consistent accepted sequence, updating a private copy of the pool as each
//! candidate is accepted. Outputs of an accepted candidate are spendable by
//! later candidates in the same batch.
//!
//! The max-fee policy is greedy by per-batch fee ordering. It is not a
//! globally optimal packing: when candidates conflict over shared inputs the
//! first one processed wins, which can leave total fees or batch size below
//! the best achievable.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::crypto::SignatureVerifier;
use crate::transaction::{calculate_fee, check_tx};
use crate::types::*;
use crate::utxo::UtxoPool;

/// Order in which candidates are considered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Candidates in the order given.
    #[default]
    FirstFit,
    /// Candidates by fee descending, arrival order breaking ties.
    MaxFee,
}

pub struct TxHandler<'a> {
    utxo_pool: UtxoPool,
    verifier: &'a dyn SignatureVerifier,
    policy: SelectionPolicy,
}

impl<'a> TxHandler<'a> {
    /// Start from a private copy of `utxo_pool`.
    pub fn new(
        utxo_pool: &UtxoPool,
        verifier: &'a dyn SignatureVerifier,
        policy: SelectionPolicy,
    ) -> Self {
        Self { utxo_pool: utxo_pool.clone(), verifier, policy }
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Validate `tx` against the handler's current working pool.
    pub fn is_valid_tx(&self, tx: &Transaction) -> bool {
        check_tx(tx, &self.utxo_pool, self.verifier).is_valid()
    }

    /// Accept every candidate that is valid at the point it is considered.
    ///
    /// Invalid candidates are skipped silently. The returned sequence is in
    /// processing order, so replaying it first-fit against the starting pool
    /// accepts every entry.
    pub fn handle_txs(&mut self, candidates: &[Transaction]) -> Vec<Transaction> {
        let mut accepted = Vec::new();

        for index in self.processing_order(candidates) {
            let tx = &candidates[index];
            let result = check_tx(tx, &self.utxo_pool, self.verifier);
            if let ValidationResult::Invalid(reason) = result {
                trace!(candidate = index, %reason, "Skipping candidate");
                continue;
            }

            self.apply(tx);
            accepted.push(tx.clone());
        }

        accepted
    }

    pub fn utxo_pool(&self) -> &UtxoPool {
        &self.utxo_pool
    }

    pub fn into_utxo_pool(self) -> UtxoPool {
        self.utxo_pool
    }

    /// Spend the inputs of a validated transaction and add its outputs.
    fn apply(&mut self, tx: &Transaction) {
        for input in &tx.inputs {
            self.utxo_pool.remove_utxo(&input.prevout);
        }
        self.utxo_pool.add_transaction_outputs(tx);
    }

    /// Candidate indices in the order the policy considers them.
    ///
    /// Equal fees never collapse: every index appears exactly once and ties
    /// keep arrival order.
    fn processing_order(&self, candidates: &[Transaction]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..candidates.len()).collect();

        if self.policy == SelectionPolicy::MaxFee {
            // Candidates spending outputs not yet in the pool rank as zero fee
            let fees: Vec<Integer> = candidates
                .iter()
                .map(|tx| calculate_fee(tx, &self.utxo_pool).unwrap_or(0))
                .collect();
            order.sort_by(|&a, &b| fees[b].cmp(&fees[a]).then(a.cmp(&b)));
        }

        order
    }
}

/// handleTxs: 𝒯𝒳* × 𝒰𝒫 → 𝒯𝒳* × 𝒰𝒫
pub fn handle_txs(
    candidates: &[Transaction],
    pool: &UtxoPool,
    verifier: &dyn SignatureVerifier,
    policy: SelectionPolicy,
) -> (Vec<Transaction>, UtxoPool) {
    let mut handler = TxHandler::new(pool, verifier, policy);
    let accepted = handler.handle_txs(candidates);
    (accepted, handler.into_utxo_pool())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{KeyPair, Secp256k1Verifier};

    fn keys(seed: u8) -> KeyPair {
        KeyPair::from_secret_bytes(&[seed; 32]).unwrap()
    }

    fn pool_with(entries: &[(OutPoint, Integer, &KeyPair)]) -> UtxoPool {
        let mut pool = UtxoPool::new();
        for (op, value, owner) in entries {
            pool.add_utxo(*op, TransactionOutput { value: *value, owner: owner.public_key() });
        }
        pool
    }

    fn signed(prevouts: &[OutPoint], signer: &KeyPair, outputs: &[(Integer, &KeyPair)]) -> Transaction {
        let mut tx = Transaction::new();
        for op in prevouts {
            tx.add_input(op.hash, op.index);
        }
        for (value, owner) in outputs {
            tx.add_output(*value, &owner.public_key());
        }
        for i in 0..prevouts.len() {
            let sig = signer.sign(&tx.raw_data_to_sign(i).unwrap());
            tx.add_signature(sig, i);
        }
        tx.finalize();
        tx
    }

    #[test]
    fn test_first_fit_resolves_double_spend_by_order() {
        let alice = keys(1);
        let bob = keys(2);
        let carol = keys(3);
        let op = OutPoint::new([1; 32], 0);
        let pool = pool_with(&[(op, 100, &alice)]);

        let to_bob = signed(&[op], &alice, &[(100, &bob)]);
        let to_carol = signed(&[op], &alice, &[(90, &carol)]);

        let verifier = Secp256k1Verifier::new();
        let (accepted, updated) = handle_txs(
            &[to_bob.clone(), to_carol],
            &pool,
            &verifier,
            SelectionPolicy::FirstFit,
        );

        assert_eq!(accepted, vec![to_bob.clone()]);
        assert!(!updated.contains(&op));
        assert!(updated.contains(&OutPoint::new(to_bob.hash.unwrap(), 0)));
        // Caller's pool is untouched
        assert!(pool.contains(&op));
    }

    #[test]
    fn test_max_fee_prefers_higher_fee_conflict() {
        let alice = keys(1);
        let bob = keys(2);
        let carol = keys(3);
        let op = OutPoint::new([1; 32], 0);
        let pool = pool_with(&[(op, 100, &alice)]);

        let low_fee = signed(&[op], &alice, &[(99, &bob)]);
        let high_fee = signed(&[op], &alice, &[(80, &carol)]);

        let verifier = Secp256k1Verifier::new();
        let (accepted, _) = handle_txs(
            &[low_fee, high_fee.clone()],
            &pool,
            &verifier,
            SelectionPolicy::MaxFee,
        );

        assert_eq!(accepted, vec![high_fee]);
    }

    #[test]
    fn test_max_fee_keeps_equal_fee_candidates() {
        let alice = keys(1);
        let bob = keys(2);
        let a = OutPoint::new([1; 32], 0);
        let b = OutPoint::new([2; 32], 0);
        let pool = pool_with(&[(a, 50, &alice), (b, 70, &alice)]);

        // Both pay a fee of 5 and touch disjoint inputs
        let first = signed(&[a], &alice, &[(45, &bob)]);
        let second = signed(&[b], &alice, &[(65, &bob)]);

        let verifier = Secp256k1Verifier::new();
        let (accepted, updated) = handle_txs(
            &[first.clone(), second.clone()],
            &pool,
            &verifier,
            SelectionPolicy::MaxFee,
        );

        assert_eq!(accepted, vec![first, second]);
        assert_eq!(updated.len(), 2);
    }

    #[test]
    fn test_chained_spend_within_batch() {
        let alice = keys(1);
        let bob = keys(2);
        let carol = keys(3);
        let op = OutPoint::new([1; 32], 0);
        let pool = pool_with(&[(op, 100, &alice)]);

        let parent = signed(&[op], &alice, &[(100, &bob)]);
        let child = signed(&[OutPoint::new(parent.hash.unwrap(), 0)], &bob, &[(100, &carol)]);

        let verifier = Secp256k1Verifier::new();

        // Child first: rejected in first-fit because its input does not exist yet
        let (accepted, _) = handle_txs(
            &[child.clone(), parent.clone()],
            &pool,
            &verifier,
            SelectionPolicy::FirstFit,
        );
        assert_eq!(accepted, vec![parent.clone()]);

        let (accepted, updated) = handle_txs(
            &[parent.clone(), child.clone()],
            &pool,
            &verifier,
            SelectionPolicy::FirstFit,
        );
        assert_eq!(accepted, vec![parent.clone(), child.clone()]);
        assert!(!updated.contains(&OutPoint::new(parent.hash.unwrap(), 0)));
        assert_eq!(updated.balance_of(&carol.public_key()), Some(100));
    }

    #[test]
    fn test_handler_skips_invalid_without_side_effects() {
        let alice = keys(1);
        let mallory = keys(9);
        let op = OutPoint::new([1; 32], 0);
        let pool = pool_with(&[(op, 100, &alice)]);

        let forged = signed(&[op], &mallory, &[(100, &mallory)]);
        let verifier = Secp256k1Verifier::new();
        let mut handler = TxHandler::new(&pool, &verifier, SelectionPolicy::FirstFit);

        assert!(!handler.is_valid_tx(&forged));
        assert!(handler.handle_txs(&[forged]).is_empty());
        assert_eq!(handler.utxo_pool(), &pool);
    }

    #[test]
    fn test_processing_order_stable_for_ties() {
        let verifier = Secp256k1Verifier::new();
        let pool = UtxoPool::new();
        let handler = TxHandler::new(&pool, &verifier, SelectionPolicy::MaxFee);

        // None of these inputs exist, every candidate ranks as zero fee
        let candidates: Vec<Transaction> = (0..5u8)
            .map(|i| {
                let mut tx = Transaction::new();
                tx.add_input([i; 32], 0);
                tx.finalize();
                tx
            })
            .collect();

        assert_eq!(handler.processing_order(&candidates), vec![0, 1, 2, 3, 4]);
    }
}
