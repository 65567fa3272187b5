//! Recognizing deposits on the source chain and payouts on the target chain.

use twinpeg_types::{
    Amount, ChainBlock, ChainTip, Deposit, MultisigParams, Script, Transaction, Withdrawal,
};

use crate::chain::DepositExtractor;
use crate::multisig;

/// Deposits are transactions paying the multisig script that also carry a
/// destination marker naming the payout script.
#[derive(Clone, Debug)]
pub struct TaggedDepositExtractor {
    multisig_script: Script,
    min_deposit: Amount,
}

impl TaggedDepositExtractor {
    pub fn new(multisig_script: Script, min_deposit: Amount) -> Self {
        Self {
            multisig_script,
            min_deposit,
        }
    }

    pub fn extract_deposit(&self, tx: &Transaction, block: ChainTip) -> Option<Deposit> {
        let target_address = tx
            .outputs
            .iter()
            .find_map(|output| output.script.target_from_marker())?;
        let amount: Amount = tx
            .outputs
            .iter()
            .filter(|output| output.script == self.multisig_script)
            .map(|output| output.value)
            .sum();
        if amount.is_zero() || amount < self.min_deposit {
            return None;
        }
        Some(Deposit {
            id: tx.txid(),
            amount,
            target_address,
            block_number: block.height,
            block_hash: block.hash,
        })
    }
}

impl DepositExtractor for TaggedDepositExtractor {
    fn extract_deposits(&self, block: &ChainBlock) -> Vec<Deposit> {
        block
            .transactions
            .iter()
            .filter_map(|tx| self.extract_deposit(tx, block.tip()))
            .collect()
    }
}

/// Payouts are transactions carrying a withdrawal tag and a quorum of
/// federation signatures on every input. A tag alone is not enough.
#[derive(Clone, Debug)]
pub struct WithdrawalExtractor {
    multisig_script: Script,
    params: MultisigParams,
}

impl WithdrawalExtractor {
    pub fn new(multisig_script: Script, params: MultisigParams) -> Self {
        Self {
            multisig_script,
            params,
        }
    }

    pub fn extract_withdrawal(&self, tx: &Transaction, block: ChainTip) -> Option<Withdrawal> {
        let deposit_id = tx.deposit_id()?;
        if !multisig::has_quorum(tx, &self.params) {
            tracing::debug!(%deposit_id, "ignoring tagged payout without quorum signatures");
            return None;
        }
        let payout = tx
            .outputs
            .iter()
            .find(|output| !output.script.is_op_return() && output.script != self.multisig_script)?;
        Some(Withdrawal {
            deposit_id,
            id: tx.txid(),
            amount: payout.value,
            target_address: payout.script.clone(),
            block_number: block.height,
            block_hash: block.hash,
        })
    }

    pub fn extract_withdrawals(&self, block: &ChainBlock) -> Vec<Withdrawal> {
        block
            .transactions
            .iter()
            .filter_map(|tx| self.extract_withdrawal(tx, block.tip()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use twinpeg_crypto::{keypair_from_seed, sign_input};
    use twinpeg_types::{BlockHash, OutPoint, TxHash, TxIn, TxOut};

    fn multisig() -> Script {
        Script::new(vec![0xbb])
    }

    fn block(transactions: Vec<Transaction>) -> ChainBlock {
        ChainBlock {
            hash: BlockHash::new([5u8; 32]),
            previous: BlockHash::new([4u8; 32]),
            height: 100,
            transactions,
        }
    }

    fn deposit_tx(value: u64) -> Transaction {
        Transaction {
            inputs: vec![TxIn::unsigned(OutPoint::new(TxHash::new([1u8; 32]), 0))],
            outputs: vec![
                TxOut::new(Amount::new(value), multisig()),
                TxOut::new(
                    Amount::ZERO,
                    Script::target_marker(&Script::new(vec![0xaa])).unwrap(),
                ),
            ],
        }
    }

    #[test]
    fn tagged_deposit_recognized() {
        let extractor = TaggedDepositExtractor::new(multisig(), Amount::new(5));
        let tx = deposit_tx(10);
        let deposits = extractor.extract_deposits(&block(vec![tx.clone()]));
        assert_eq!(deposits.len(), 1);
        assert_eq!(deposits[0].id, tx.txid());
        assert_eq!(deposits[0].amount, Amount::new(10));
        assert_eq!(deposits[0].target_address, Script::new(vec![0xaa]));
        assert_eq!(deposits[0].block_number, 100);
    }

    #[test]
    fn small_or_unmarked_deposits_ignored() {
        let extractor = TaggedDepositExtractor::new(multisig(), Amount::new(5));
        let mut unmarked = deposit_tx(10);
        unmarked.outputs.pop();
        let found = extractor.extract_deposits(&block(vec![deposit_tx(4), unmarked]));
        assert!(found.is_empty());
    }

    #[test]
    fn withdrawal_requires_quorum() {
        let keys: Vec<_> = (1u8..=3).map(|i| keypair_from_seed(&[i; 32])).collect();
        let params =
            MultisigParams::new(keys.iter().map(|k| k.public.clone()).collect(), 2).unwrap();
        let extractor = WithdrawalExtractor::new(multisig(), params);

        let deposit_id = TxHash::new([9u8; 32]);
        let mut payout = Transaction {
            inputs: vec![TxIn::unsigned(OutPoint::new(TxHash::new([2u8; 32]), 0))],
            outputs: vec![
                TxOut::new(Amount::new(9), Script::new(vec![0xaa])),
                TxOut::new(Amount::new(1), multisig()),
                TxOut::new(Amount::ZERO, Script::withdrawal_tag(&deposit_id)),
            ],
        };
        assert!(extractor.extract_withdrawal(&payout, block(vec![]).tip()).is_none());

        let unsigned = payout.clone();
        for key in &keys[..2] {
            let sig = sign_input(&unsigned, 0, key);
            payout.inputs[0].signatures.push(sig);
        }
        let withdrawal = extractor
            .extract_withdrawal(&payout, block(vec![]).tip())
            .unwrap();
        assert_eq!(withdrawal.deposit_id, deposit_id);
        assert_eq!(withdrawal.amount, Amount::new(9));
        assert_eq!(withdrawal.target_address, Script::new(vec![0xaa]));
        assert_eq!(withdrawal.id, unsigned.txid());
    }
}
