//! UTXO transaction model shared by both chains.
//!
//! A transaction's identity (`txid`) covers only its structure: the spent
//! outpoints and the outputs, in order. Signatures live beside each input
//! and never feed into the txid, so a payout template keeps the same id
//! while federation members add their signatures to it.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::amount::Amount;
use crate::hash::TxHash;
use crate::keys::{PublicKey, Signature};
use crate::script::Script;

type Blake2b256 = Blake2b<U32>;

const TXID_DOMAIN: &[u8] = b"twinpeg:txid:v1";
const SIGHASH_DOMAIN: &[u8] = b"twinpeg:sighash:v1";

/// Reference to an output of a previous transaction.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: TxHash,
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: TxHash, vout: u32) -> Self {
        Self { txid, vout }
    }
}

impl fmt::Debug for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutPoint({:?}:{})", self.txid, self.vout)
    }
}

/// One member's signature over one input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSignature {
    pub signer: PublicKey,
    pub signature: Signature,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    pub previous_output: OutPoint,
    #[serde(default)]
    pub signatures: Vec<InputSignature>,
}

impl TxIn {
    pub fn unsigned(previous_output: OutPoint) -> Self {
        Self {
            previous_output,
            signatures: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub value: Amount,
    pub script: Script,
}

impl TxOut {
    pub fn new(value: Amount, script: Script) -> Self {
        Self { value, script }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
}

impl Transaction {
    /// Structural hash: outpoints and outputs only, signatures excluded.
    pub fn txid(&self) -> TxHash {
        let mut hasher = Blake2b256::new();
        hasher.update(TXID_DOMAIN);
        hasher.update((self.inputs.len() as u64).to_le_bytes());
        for input in &self.inputs {
            hasher.update(input.previous_output.txid.as_bytes());
            hasher.update(input.previous_output.vout.to_le_bytes());
        }
        hasher.update((self.outputs.len() as u64).to_le_bytes());
        for output in &self.outputs {
            hasher.update(output.value.units().to_le_bytes());
            hasher.update((output.script.len() as u64).to_le_bytes());
            hasher.update(output.script.as_bytes());
        }
        TxHash::new(finalize(hasher))
    }

    /// The message a member signs to authorize spending input `index`.
    pub fn sighash(&self, index: usize) -> [u8; 32] {
        let mut hasher = Blake2b256::new();
        hasher.update(SIGHASH_DOMAIN);
        hasher.update(self.txid().as_bytes());
        hasher.update((index as u64).to_le_bytes());
        finalize(hasher)
    }

    /// Whether `other` spends the same outpoints and creates the same
    /// outputs, in the same order. Signatures are ignored.
    pub fn same_structure(&self, other: &Transaction) -> bool {
        self.inputs.len() == other.inputs.len()
            && self
                .inputs
                .iter()
                .zip(&other.inputs)
                .all(|(a, b)| a.previous_output == b.previous_output)
            && self.outputs == other.outputs
    }

    /// The same transaction with every signature stripped.
    pub fn without_signatures(&self) -> Transaction {
        Transaction {
            inputs: self
                .inputs
                .iter()
                .map(|input| TxIn::unsigned(input.previous_output))
                .collect(),
            outputs: self.outputs.clone(),
        }
    }

    pub fn outpoints(&self) -> impl Iterator<Item = &OutPoint> {
        self.inputs.iter().map(|input| &input.previous_output)
    }

    /// The lowest-ordered outpoint this transaction spends.
    pub fn earliest_input(&self) -> Option<OutPoint> {
        self.outpoints().min().copied()
    }

    /// The deposit id named by this transaction's withdrawal tag, if any.
    pub fn deposit_id(&self) -> Option<TxHash> {
        self.outputs
            .iter()
            .find_map(|output| output.script.deposit_id_from_tag())
    }

    pub fn total_output(&self) -> Amount {
        self.outputs.iter().map(|output| output.value).sum()
    }

    pub fn signature_count(&self) -> usize {
        self.inputs.iter().map(|input| input.signatures.len()).sum()
    }
}

fn finalize(hasher: Blake2b256) -> [u8; 32] {
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transaction {
        Transaction {
            inputs: vec![
                TxIn::unsigned(OutPoint::new(TxHash::new([2u8; 32]), 0)),
                TxIn::unsigned(OutPoint::new(TxHash::new([1u8; 32]), 3)),
            ],
            outputs: vec![
                TxOut::new(Amount::new(90), Script::new(vec![1, 2, 3])),
                TxOut::new(Amount::ZERO, Script::withdrawal_tag(&TxHash::new([9u8; 32]))),
            ],
        }
    }

    #[test]
    fn txid_ignores_signatures() {
        let tx = sample();
        let mut signed = tx.clone();
        signed.inputs[0].signatures.push(InputSignature {
            signer: PublicKey([5u8; 32]),
            signature: Signature([6u8; 64]),
        });
        assert_eq!(tx.txid(), signed.txid());
        assert!(tx.same_structure(&signed));
        assert_ne!(tx, signed);
    }

    #[test]
    fn txid_changes_with_outputs() {
        let tx = sample();
        let mut other = tx.clone();
        other.outputs[0].value = Amount::new(91);
        assert_ne!(tx.txid(), other.txid());
        assert!(!tx.same_structure(&other));
    }

    #[test]
    fn input_order_matters() {
        let tx = sample();
        let mut swapped = tx.clone();
        swapped.inputs.swap(0, 1);
        assert!(!tx.same_structure(&swapped));
        assert_ne!(tx.txid(), swapped.txid());
    }

    #[test]
    fn sighash_differs_per_input() {
        let tx = sample();
        assert_ne!(tx.sighash(0), tx.sighash(1));
    }

    #[test]
    fn earliest_input_is_lowest_outpoint() {
        let tx = sample();
        assert_eq!(
            tx.earliest_input(),
            Some(OutPoint::new(TxHash::new([1u8; 32]), 3))
        );
    }

    #[test]
    fn deposit_id_read_from_tag() {
        assert_eq!(sample().deposit_id(), Some(TxHash::new([9u8; 32])));
        assert_eq!(Transaction::default().deposit_id(), None);
    }
}
