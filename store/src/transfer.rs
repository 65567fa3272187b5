//! The persisted transfer record.
//!
//! One record per deposit id. The status-conditional fields live inside
//! [`TransferState`], so a record cannot carry a block hash unless it is
//! `SeenInBlock`, and cannot lack a payout transaction unless it is
//! `Suspended`.

use serde::{Deserialize, Serialize};
use std::fmt;

use twinpeg_types::{Amount, BlockHash, ChainTip, Deposit, Script, Transaction, TxHash};

/// Lifecycle status of a transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TransferStatus {
    /// The payout cannot currently be built (e.g. insufficient funds).
    Suspended,
    /// Payout template exists, signatures below quorum.
    Partial,
    /// Every input carries a quorum of valid signatures.
    FullySigned,
    /// The payout was observed in a target-chain block.
    SeenInBlock,
    /// The payout block is final.
    Complete,
    /// The template lost its UTXO reservation and will never be used.
    Rejected,
}

impl TransferStatus {
    /// Every status, in declaration order. Index structures are seeded from
    /// this list.
    pub const ALL: [TransferStatus; 6] = [
        TransferStatus::Suspended,
        TransferStatus::Partial,
        TransferStatus::FullySigned,
        TransferStatus::SeenInBlock,
        TransferStatus::Complete,
        TransferStatus::Rejected,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Complete | TransferStatus::Rejected)
    }

    /// Statuses whose UTXO reservation must be re-checked before use.
    pub fn needs_sanity_check(&self) -> bool {
        matches!(self, TransferStatus::Partial | TransferStatus::FullySigned)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Suspended => "suspended",
            TransferStatus::Partial => "partial",
            TransferStatus::FullySigned => "fully_signed",
            TransferStatus::SeenInBlock => "seen_in_block",
            TransferStatus::Complete => "complete",
            TransferStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status plus the fields that are only valid in that status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferState {
    Suspended,
    Partial {
        transaction: Transaction,
    },
    FullySigned {
        transaction: Transaction,
    },
    SeenInBlock {
        transaction: Transaction,
        block_hash: BlockHash,
        block_height: u64,
    },
    Complete {
        transaction: Transaction,
    },
    Rejected {
        transaction: Transaction,
    },
}

impl TransferState {
    pub fn status(&self) -> TransferStatus {
        match self {
            TransferState::Suspended => TransferStatus::Suspended,
            TransferState::Partial { .. } => TransferStatus::Partial,
            TransferState::FullySigned { .. } => TransferStatus::FullySigned,
            TransferState::SeenInBlock { .. } => TransferStatus::SeenInBlock,
            TransferState::Complete { .. } => TransferStatus::Complete,
            TransferState::Rejected { .. } => TransferStatus::Rejected,
        }
    }

    pub fn transaction(&self) -> Option<&Transaction> {
        match self {
            TransferState::Suspended => None,
            TransferState::Partial { transaction }
            | TransferState::FullySigned { transaction }
            | TransferState::SeenInBlock { transaction, .. }
            | TransferState::Complete { transaction }
            | TransferState::Rejected { transaction } => Some(transaction),
        }
    }
}

/// One deposit and the lifecycle of its payout.
#[derive(Clone, Serialize, Deserialize)]
pub struct Transfer {
    pub deposit_id: TxHash,
    pub deposit_target_address: Script,
    pub deposit_amount: Amount,
    /// Source-chain height the deposit matured at. `None` when the record
    /// was created because its payout was observed on the target chain
    /// before (or without) the deposit maturing locally.
    pub deposit_height: Option<u64>,
    pub state: TransferState,
    /// Status as last read from (or written to) storage. Only the status
    /// change tracker reads this.
    #[serde(skip)]
    pub db_status: Option<TransferStatus>,
}

impl Transfer {
    /// A freshly matured deposit whose payout could not be built yet.
    pub fn suspended(deposit: &Deposit) -> Self {
        Self {
            deposit_id: deposit.id,
            deposit_target_address: deposit.target_address.clone(),
            deposit_amount: deposit.amount,
            deposit_height: Some(deposit.block_number),
            state: TransferState::Suspended,
            db_status: None,
        }
    }

    /// A freshly matured deposit with its payout template.
    pub fn partial(deposit: &Deposit, transaction: Transaction) -> Self {
        Self {
            state: TransferState::Partial { transaction },
            ..Self::suspended(deposit)
        }
    }

    /// A transfer first learned of from a payout in a target-chain block.
    pub fn observed(
        deposit_id: TxHash,
        target_address: Script,
        amount: Amount,
        transaction: Transaction,
        block: ChainTip,
    ) -> Self {
        Self {
            deposit_id,
            deposit_target_address: target_address,
            deposit_amount: amount,
            deposit_height: None,
            state: TransferState::SeenInBlock {
                transaction,
                block_hash: block.hash,
                block_height: block.height,
            },
            db_status: None,
        }
    }

    pub fn status(&self) -> TransferStatus {
        self.state.status()
    }

    /// The payout template (or observed payout). `None` only while suspended.
    pub fn partial_transaction(&self) -> Option<&Transaction> {
        self.state.transaction()
    }

    pub fn block_hash(&self) -> Option<BlockHash> {
        match &self.state {
            TransferState::SeenInBlock { block_hash, .. } => Some(*block_hash),
            _ => None,
        }
    }

    pub fn block_height(&self) -> Option<u64> {
        match &self.state {
            TransferState::SeenInBlock { block_height, .. } => Some(*block_height),
            _ => None,
        }
    }

    /// Whether this record exists only because its payout was observed.
    pub fn is_observed_only(&self) -> bool {
        self.deposit_height.is_none()
    }

    /// Mark the record as matching what storage holds.
    pub fn mark_persisted(&mut self) {
        self.db_status = Some(self.status());
    }
}

impl PartialEq for Transfer {
    fn eq(&self, other: &Self) -> bool {
        self.deposit_id == other.deposit_id
            && self.deposit_target_address == other.deposit_target_address
            && self.deposit_amount == other.deposit_amount
            && self.deposit_height == other.deposit_height
            && self.state == other.state
    }
}

impl Eq for Transfer {}

impl fmt::Debug for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transfer")
            .field("deposit_id", &self.deposit_id)
            .field("amount", &self.deposit_amount)
            .field("status", &self.status())
            .field("block_height", &self.block_height())
            .finish()
    }
}
