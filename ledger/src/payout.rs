//! Deterministic payout templates.
//!
//! Every member builds the template for a deposit on its own, from the
//! same deposit and the same multisig UTXO set, and must arrive at the same
//! transaction. Nothing here may depend on local state beyond those inputs.

use twinpeg_types::{Amount, Script, Transaction, TxHash, TxIn, TxOut};

use crate::wallet::WalletUtxo;

#[derive(Clone, Debug)]
pub struct PayoutBuilder {
    multisig_script: Script,
    fee: Amount,
}

impl PayoutBuilder {
    pub fn new(multisig_script: Script, fee: Amount) -> Self {
        Self {
            multisig_script,
            fee,
        }
    }

    pub fn fee(&self) -> Amount {
        self.fee
    }

    /// Build the payout for a deposit of `amount` from `spendable` outputs.
    ///
    /// Outputs, in order: `amount - fee` to `target`, change back to the
    /// multisig (omitted when zero), and a zero-value withdrawal tag naming
    /// `deposit_id`. Returns `None` when the deposit does not cover the fee
    /// or the outputs do not cover the deposit.
    pub fn build(
        &self,
        deposit_id: &TxHash,
        amount: Amount,
        target: &Script,
        spendable: &[WalletUtxo],
    ) -> Option<Transaction> {
        let payout = amount.checked_sub(self.fee)?;
        if payout.is_zero() {
            return None;
        }

        let mut candidates = spendable.to_vec();
        candidates.sort_by_key(|utxo| utxo.outpoint);

        let mut inputs = Vec::new();
        let mut funded = Amount::ZERO;
        for utxo in candidates {
            if funded >= amount {
                break;
            }
            funded = funded.checked_add(utxo.value)?;
            inputs.push(TxIn::unsigned(utxo.outpoint));
        }
        if funded < amount {
            return None;
        }

        let mut outputs = vec![TxOut::new(payout, target.clone())];
        let change = funded.checked_sub(amount)?;
        if !change.is_zero() {
            outputs.push(TxOut::new(change, self.multisig_script.clone()));
        }
        outputs.push(TxOut::new(Amount::ZERO, Script::withdrawal_tag(deposit_id)));

        Some(Transaction { inputs, outputs })
    }
}
