//! Cross-chain transfer ledger.
//!
//! One [`Transfer`](twinpeg_store::Transfer) per source-chain deposit, moved
//! through its lifecycle by the [`TransferStore`] engine: payout template
//! built when the deposit matures, signatures merged until quorum, payout
//! observed on the target chain, and completion once final. Reorgs of the
//! target chain are undone by rewinding to a common ancestor.

pub mod chain;
pub mod error;
pub mod extraction;
pub mod indices;
pub mod matured;
pub mod multisig;
pub mod payout;
pub mod status_tracker;
pub mod transfer_store;
pub mod wallet;

pub use chain::{BlockSource, DepositExtractor};
pub use error::{ErrorKind, TransferError, WalletError};
pub use extraction::{TaggedDepositExtractor, WithdrawalExtractor};
pub use indices::TransferIndices;
pub use matured::MaturedBlocksProvider;
pub use payout::PayoutBuilder;
pub use status_tracker::StatusChangeTracker;
pub use transfer_store::{StoreSettings, TransferStore};
pub use wallet::{WalletManager, WalletUtxo};
