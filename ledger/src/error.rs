use thiserror::Error;

use twinpeg_store::{StoreError, TransferStatus};
use twinpeg_types::{BlockHash, OutPoint, TxHash};

/// Coarse classification used by callers to decide how to react.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request or batch; rejected before any mutation.
    Validation,
    NotFound,
    /// Reservation lost, template mismatch or a finalized transfer.
    Consistency,
    Storage,
    Network,
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("output {outpoint:?} is already reserved by {owner}")]
    AlreadyReserved { outpoint: OutPoint, owner: TxHash },

    #[error("output {0:?} is not owned by the federation wallet")]
    UnknownOutput(OutPoint),

    #[error("signing failed: {0}")]
    Signing(String),
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("transfer store is not initialized")]
    NotInitialized,

    #[error("deposit height {actual} does not match next mature height {expected}")]
    HeightMismatch { expected: u64, actual: u64 },

    #[error("invalid deposit batch: {0}")]
    InvalidBatch(String),

    #[error("unknown deposit {0}")]
    UnknownDeposit(TxHash),

    #[error("block at height {height} does not extend store tip {tip}")]
    Discontinuity { height: u64, tip: BlockHash },

    #[error("candidate does not match the stored template for deposit {0}")]
    TemplateMismatch(TxHash),

    #[error("transfer {deposit_id} is {status}")]
    InvalidStatus {
        deposit_id: TxHash,
        status: TransferStatus,
    },

    #[error("wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl TransferError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferError::NotInitialized
            | TransferError::HeightMismatch { .. }
            | TransferError::InvalidBatch(_) => ErrorKind::Validation,
            TransferError::UnknownDeposit(_) => ErrorKind::NotFound,
            TransferError::Discontinuity { .. }
            | TransferError::TemplateMismatch(_)
            | TransferError::InvalidStatus { .. }
            | TransferError::Wallet(_) => ErrorKind::Consistency,
            TransferError::Storage(_) => ErrorKind::Storage,
        }
    }
}
