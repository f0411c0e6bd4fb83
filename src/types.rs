//! Core ledger types for transaction and block validation

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::hashing;

/// Hash type: 256-bit content identity
pub type Hash = [u8; 32];

/// Byte string type
pub type ByteString = Vec<u8>;

/// Natural number type
pub type Natural = u64;

/// Integer type
pub type Integer = i64;

/// Sentinel index carried by the pseudo-input of a coinbase transaction
pub const COINBASE_INDEX: Natural = 0xffff_ffff;

/// OutPoint: 𝒪 = ℍ × ℕ
///
/// Identity of a transaction output: the producing transaction's hash and the
/// output's position in that transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub hash: Hash,
    pub index: Natural,
}

impl OutPoint {
    pub fn new(hash: Hash, index: Natural) -> Self {
        Self { hash, index }
    }

    /// The outpoint referenced by a coinbase pseudo-input. Never present in a pool.
    pub fn null() -> Self {
        Self { hash: [0u8; 32], index: COINBASE_INDEX }
    }

    pub fn is_null(&self) -> bool {
        self.hash == [0u8; 32] && self.index == COINBASE_INDEX
    }
}

/// Transaction Input: ℐ = 𝒪 × 𝕊
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub prevout: OutPoint,
    /// DER signature over `Transaction::raw_data_to_sign(i)` for this input's position `i`
    pub signature: ByteString,
}

/// Transaction Output: 𝒯 = ℤ × 𝕂
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub value: Integer,
    /// SEC1-encoded verification key of the output's owner
    pub owner: ByteString,
}

/// Transaction: 𝒯𝒳 = ℐ* × 𝒯* × ℍ?
///
/// The identity is `None` until [`Transaction::finalize`] is called. Any
/// mutation of inputs or outputs through the builder methods clears it again,
/// so a finalized hash always describes the current content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub hash: Option<Hash>,
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl Transaction {
    pub fn new() -> Self {
        Self { inputs: Vec::new(), outputs: Vec::new(), hash: None }
    }

    /// Build a finalized coinbase minting `value` to `owner`.
    ///
    /// The coinbase carries a single pseudo-input on [`OutPoint::null`] whose
    /// signature slot holds `tag`. Blocks pass their parent hash as the tag so
    /// two blocks minting the same amount to the same owner still produce
    /// distinct output identities.
    pub fn coinbase(value: Integer, owner: &[u8], tag: &[u8]) -> Self {
        let mut tx = Self::new();
        tx.inputs.push(TransactionInput { prevout: OutPoint::null(), signature: tag.to_vec() });
        tx.outputs.push(TransactionOutput { value, owner: owner.to_vec() });
        tx.finalize();
        tx
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].prevout.is_null()
    }

    pub fn add_input(&mut self, prev_tx_hash: Hash, output_index: Natural) {
        self.inputs.push(TransactionInput {
            prevout: OutPoint::new(prev_tx_hash, output_index),
            signature: Vec::new(),
        });
        self.hash = None;
    }

    pub fn add_output(&mut self, value: Integer, owner: &[u8]) {
        self.outputs.push(TransactionOutput { value, owner: owner.to_vec() });
        self.hash = None;
    }

    pub fn remove_input(&mut self, index: usize) -> Option<TransactionInput> {
        if index >= self.inputs.len() {
            return None;
        }
        self.hash = None;
        Some(self.inputs.remove(index))
    }

    /// Attach `signature` to input `index`. Returns false if there is no such input.
    pub fn add_signature(&mut self, signature: ByteString, index: usize) -> bool {
        match self.inputs.get_mut(index) {
            Some(input) => {
                input.signature = signature;
                self.hash = None;
                true
            }
            None => false,
        }
    }

    /// Message the owner of input `index`'s referenced output must sign.
    pub fn raw_data_to_sign(&self, index: usize) -> Option<ByteString> {
        hashing::signing_payload(self, index)
    }

    /// Fix the content identity. Must be called after the last mutation.
    pub fn finalize(&mut self) {
        self.hash = Some(hashing::hash_transaction(self));
    }

    pub fn is_finalized(&self) -> bool {
        self.hash.is_some()
    }

    pub fn id(&self) -> Result<Hash> {
        self.hash.ok_or(LedgerError::UnfinalizedTransaction)
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// Identities of the outputs this transaction produces.
    pub fn outpoints(&self) -> Result<Vec<OutPoint>> {
        let hash = self.id()?;
        Ok((0..self.outputs.len())
            .map(|i| OutPoint::new(hash, i as Natural))
            .collect())
    }
}

/// Block: ℬ = ℍ? × ℍ? × 𝒯𝒳 × 𝒯𝒳*
///
/// `prev_block_hash == None` marks the genesis block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub hash: Option<Hash>,
    pub prev_block_hash: Option<Hash>,
    pub coinbase: Transaction,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Start a block on `prev_block_hash` whose coinbase mints `reward` to `owner`.
    pub fn new(prev_block_hash: Option<Hash>, owner: &[u8], reward: Integer) -> Self {
        let tag = prev_block_hash.map(|h| h.to_vec()).unwrap_or_default();
        Self {
            hash: None,
            prev_block_hash,
            coinbase: Transaction::coinbase(reward, owner, &tag),
            transactions: Vec::new(),
        }
    }

    pub fn add_transaction(&mut self, tx: Transaction) {
        self.transactions.push(tx);
        self.hash = None;
    }

    pub fn finalize(&mut self) {
        self.hash = Some(hashing::hash_block(self));
    }

    pub fn id(&self) -> Result<Hash> {
        self.hash.ok_or(LedgerError::UnfinalizedBlock)
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_block_hash.is_none()
    }
}

/// Validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(String),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}
