//! Deposit and withdrawal facts extracted from chain blocks.

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::block::{BlockHash, ChainTip};
use crate::hash::TxHash;
use crate::script::Script;

/// A payment into the federation multisig on the source chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    /// Hash of the source-chain transaction carrying the deposit.
    pub id: TxHash,
    pub amount: Amount,
    /// Payout destination on the target chain.
    pub target_address: Script,
    pub block_number: u64,
    pub block_hash: BlockHash,
}

/// A payout observed on the target chain settling a deposit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub deposit_id: TxHash,
    /// Hash of the payout transaction.
    pub id: TxHash,
    pub amount: Amount,
    pub target_address: Script,
    pub block_number: u64,
    pub block_hash: BlockHash,
}

/// All deposits found in one matured source-chain block.
///
/// Blocks without deposits still appear (with an empty list) so that the
/// receiving store can advance its height counter without gaps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaturedBlockDeposits {
    pub block: ChainTip,
    pub deposits: Vec<Deposit>,
}
