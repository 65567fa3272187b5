//! Fundamental types for the twinpeg federation bridge.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! hashes, amounts, keys, scripts, transactions, blocks, deposits and the
//! federation multisig parameters.

pub mod amount;
pub mod block;
pub mod deposit;
pub mod error;
pub mod hash;
pub mod hex;
pub mod keys;
pub mod params;
pub mod script;
pub mod time;
pub mod transaction;

pub use amount::Amount;
pub use block::{BlockHash, ChainBlock, ChainTip};
pub use deposit::{Deposit, MaturedBlockDeposits, Withdrawal};
pub use error::TypesError;
pub use hash::TxHash;
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use params::MultisigParams;
pub use script::Script;
pub use time::{Clock, SystemClock, Timestamp};
pub use transaction::{InputSignature, OutPoint, Transaction, TxIn, TxOut};
