use thiserror::Error;

use twinpeg_ledger::{ErrorKind, TransferError};
use twinpeg_types::{PublicKey, TxHash};

#[derive(Debug, Error)]
pub enum FederationError {
    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("peer {peer} unreachable: {reason}")]
    PeerUnreachable { peer: PublicKey, reason: String },

    #[error("counter-chain request failed: {0}")]
    CounterChain(String),

    #[error("{0} is not a federation member")]
    NotAMember(PublicKey),

    #[error("transaction {0} carries no withdrawal tag")]
    UntaggedCandidate(TxHash),
}

impl FederationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FederationError::Transfer(e) => e.kind(),
            FederationError::PeerUnreachable { .. } | FederationError::CounterChain(_) => {
                ErrorKind::Network
            }
            FederationError::NotAMember(_) | FederationError::UntaggedCandidate(_) => {
                ErrorKind::Validation
            }
        }
    }
}
