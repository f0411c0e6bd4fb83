//! Canonical byte encodings and content identities
//!
//! Integers are little-endian, variable-length fields are prefixed with a
//! Bitcoin-style varint, identities are double SHA-256.

use bitcoin_hashes::{sha256d, Hash as BitcoinHash, HashEngine};

use crate::types::*;

/// Message signed by the owner of the output referenced by input `index`.
///
/// Covers that input's outpoint and every output, so each input signs a
/// distinct message and no output can be altered after signing.
pub fn signing_payload(tx: &Transaction, index: usize) -> Option<ByteString> {
    let input = tx.inputs.get(index)?;
    let mut data = Vec::new();

    encode_outpoint(&mut data, &input.prevout);
    for output in &tx.outputs {
        encode_output(&mut data, output);
    }

    Some(data)
}

/// Full serialized form of a transaction, signatures included.
pub fn serialize_transaction(tx: &Transaction) -> ByteString {
    let mut data = Vec::new();

    data.extend_from_slice(&encode_varint(tx.inputs.len() as u64));
    for input in &tx.inputs {
        encode_outpoint(&mut data, &input.prevout);
        data.extend_from_slice(&encode_varint(input.signature.len() as u64));
        data.extend_from_slice(&input.signature);
    }

    data.extend_from_slice(&encode_varint(tx.outputs.len() as u64));
    for output in &tx.outputs {
        encode_output(&mut data, output);
    }

    data
}

/// Serialized form of a block: parent, coinbase, then each transaction in order.
pub fn serialize_block(block: &Block) -> ByteString {
    let mut data = Vec::new();

    // Genesis commits to an all-zero parent
    data.extend_from_slice(&block.prev_block_hash.unwrap_or([0u8; 32]));
    data.extend_from_slice(&serialize_transaction(&block.coinbase));

    data.extend_from_slice(&encode_varint(block.transactions.len() as u64));
    for tx in &block.transactions {
        data.extend_from_slice(&serialize_transaction(tx));
    }

    data
}

pub fn hash_transaction(tx: &Transaction) -> Hash {
    double_sha256(&serialize_transaction(tx))
}

pub fn hash_block(block: &Block) -> Hash {
    double_sha256(&serialize_block(block))
}

pub fn double_sha256(data: &[u8]) -> Hash {
    let mut hasher = sha256d::Hash::engine();
    hasher.input(data);
    sha256d::Hash::from_engine(hasher).into_inner()
}

fn encode_outpoint(data: &mut Vec<u8>, outpoint: &OutPoint) {
    data.extend_from_slice(&outpoint.hash);
    data.extend_from_slice(&outpoint.index.to_le_bytes());
}

fn encode_output(data: &mut Vec<u8>, output: &TransactionOutput) {
    data.extend_from_slice(&output.value.to_le_bytes());
    data.extend_from_slice(&encode_varint(output.owner.len() as u64));
    data.extend_from_slice(&output.owner);
}

/// Encode a number as a Bitcoin varint
fn encode_varint(value: u64) -> Vec<u8> {
    if value < 0xfd {
        vec![value as u8]
    } else if value <= 0xffff {
        let mut result = vec![0xfd];
        result.extend_from_slice(&(value as u16).to_le_bytes());
        result
    } else if value <= 0xffffffff {
        let mut result = vec![0xfe];
        result.extend_from_slice(&(value as u32).to_le_bytes());
        result
    } else {
        let mut result = vec![0xff];
        result.extend_from_slice(&value.to_le_bytes());
        result
    }
}
