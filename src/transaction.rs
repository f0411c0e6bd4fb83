//! Transaction validation against an unspent output pool

use std::collections::HashSet;

use crate::crypto::SignatureVerifier;
use crate::types::*;
use crate::utxo::UtxoPool;

/// CheckTx: 𝒯𝒳 × 𝒰𝒫 → {valid, invalid}
///
/// A finalized transaction tx = (ins, outs) is valid against pool up if and only if:
/// 1. ∀i ∈ ins: i.prevout ∈ up
/// 2. ∀i ∈ ins: verify(up(i.prevout).owner, payload(tx, i), i.signature)
/// 3. no outpoint is claimed by two inputs of tx
/// 4. ∀o ∈ outs: o.value ≥ 0
/// 5. Σᵢ up(i.prevout).value ≥ Σₒ o.value
///
/// Pure: `pool` is only read.
pub fn check_tx(
    tx: &Transaction,
    pool: &UtxoPool,
    verifier: &dyn SignatureVerifier,
) -> ValidationResult {
    if !tx.is_finalized() {
        return ValidationResult::Invalid("Transaction identity not finalized".to_string());
    }

    let mut claimed: HashSet<OutPoint> = HashSet::with_capacity(tx.inputs.len());
    let mut total_input_value = 0i64;

    for (i, input) in tx.inputs.iter().enumerate() {
        // 1. Referenced output must be unspent
        let Some(utxo) = pool.get_tx_output(&input.prevout) else {
            return ValidationResult::Invalid(format!("Input {} not found in UTXO pool", i));
        };

        // 2. Owner of the referenced output must have signed this position
        let Some(message) = tx.raw_data_to_sign(i) else {
            return ValidationResult::Invalid(format!("No signing payload for input {}", i));
        };
        if !verifier.verify(&utxo.owner, &message, &input.signature) {
            return ValidationResult::Invalid(format!("Invalid signature at input {}", i));
        }

        // 3. Intra-transaction double spend
        if !claimed.insert(input.prevout) {
            return ValidationResult::Invalid(format!("Input {} claims an output twice", i));
        }

        total_input_value = match total_input_value.checked_add(utxo.value) {
            Some(sum) => sum,
            None => return ValidationResult::Invalid("Input value overflow".to_string()),
        };
    }

    let mut total_output_value = 0i64;
    for (i, output) in tx.outputs.iter().enumerate() {
        // 4. Non-negative outputs
        if output.value < 0 {
            return ValidationResult::Invalid(format!(
                "Negative output value {} at index {}",
                output.value, i
            ));
        }
        total_output_value = match total_output_value.checked_add(output.value) {
            Some(sum) => sum,
            None => return ValidationResult::Invalid("Output value overflow".to_string()),
        };
    }

    // 5. Inputs cover outputs
    if total_input_value < total_output_value {
        return ValidationResult::Invalid(format!(
            "Insufficient input value: {} < {}",
            total_input_value, total_output_value
        ));
    }

    ValidationResult::Valid
}

/// Boolean form of [`check_tx`].
pub fn is_valid_tx(tx: &Transaction, pool: &UtxoPool, verifier: &dyn SignatureVerifier) -> bool {
    check_tx(tx, pool, verifier).is_valid()
}

/// Fee: Σᵢ up(i.prevout).value − Σₒ o.value
///
/// Returns `None` when any referenced input is missing from `pool` or the
/// sums overflow: such a transaction has no comparable fee.
pub fn calculate_fee(tx: &Transaction, pool: &UtxoPool) -> Option<Integer> {
    let total_in = tx.inputs.iter().try_fold(0i64, |acc, input| {
        pool.get_tx_output(&input.prevout)
            .and_then(|utxo| acc.checked_add(utxo.value))
    })?;
    let total_out = tx
        .outputs
        .iter()
        .try_fold(0i64, |acc, output| acc.checked_add(output.value))?;
    total_in.checked_sub(total_out)
}
