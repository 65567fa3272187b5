//! The federation wallet as seen by the transfer store.
//!
//! The wallet owns the multisig UTXO set, the reservation bookkeeping and
//! the local member's key. The store only reads it, asks it to sign, and
//! notifies it when outputs are reserved for (or released from) a payout.

use twinpeg_types::{Amount, OutPoint, PublicKey, Script, Transaction, TxHash};

use crate::error::WalletError;

/// An unspent output of the federation multisig.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct WalletUtxo {
    pub outpoint: OutPoint,
    pub value: Amount,
}

pub trait WalletManager: Send + Sync {
    /// The script every federation-controlled output pays to.
    fn multisig_script(&self) -> Script;

    /// The local member's public key.
    fn local_member(&self) -> PublicKey;

    /// Unspent multisig outputs not reserved by any payout.
    fn spendable_outputs(&self) -> Vec<WalletUtxo>;

    /// Reserve `outpoints` for the payout with id `txid`.
    fn reserve(&self, txid: TxHash, outpoints: &[OutPoint]) -> Result<(), WalletError>;

    /// Drop every reservation held by `txid`.
    fn release(&self, txid: &TxHash);

    /// The payout currently holding `outpoint`, if any.
    fn reserved_by(&self, outpoint: &OutPoint) -> Option<TxHash>;

    /// Add the local member's signature to every input of `tx`.
    fn sign_transaction(&self, tx: &Transaction) -> Result<Transaction, WalletError>;
}
