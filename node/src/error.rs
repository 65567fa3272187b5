use thiserror::Error;

use twinpeg_federation::FederationError;
use twinpeg_ledger::TransferError;
use twinpeg_store_lmdb::LmdbError;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Lmdb(#[from] LmdbError),

    #[error("store integrity check failed: {0}")]
    Integrity(String),

    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("federation error: {0}")]
    Federation(#[from] FederationError),

    #[error("wallet key {actual} does not match configured member {configured}")]
    WalletMismatch {
        configured: twinpeg_types::PublicKey,
        actual: twinpeg_types::PublicKey,
    },

    #[error("node already started")]
    AlreadyStarted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
