//! Errors raised while parsing or validating fundamental types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid multisig parameters: {0}")]
    InvalidMultisig(String),

    #[error("amount overflow")]
    AmountOverflow,
}
