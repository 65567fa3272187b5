//! Nullable infrastructure for deterministic testing.
//!
//! Every outside dependency of the bridge (clock, storage, wallet, both
//! chains, peers) sits behind a trait. This crate provides test-friendly
//! implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod chain;
pub mod clock;
pub mod network;
pub mod store;
pub mod wallet;

pub use chain::NullChain;
pub use clock::NullClock;
pub use network::{NullCounterChain, NullPeers};
pub use store::NullTransferDb;
pub use wallet::NullWallet;
