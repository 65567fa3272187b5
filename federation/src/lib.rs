//! Federation side of the peg.
//!
//! The [`BossTable`] decides which member drives a transfer at any moment,
//! the [`SignatureProvider`] answers co-signing requests from other members,
//! and the [`FederationCoordinator`] runs the periodic cycle that moves
//! transfers from matured deposit to broadcast payout.

pub mod boss_table;
pub mod coordinator;
pub mod error;
pub mod network;
pub mod signature_provider;

pub use boss_table::{BossTable, LeadershipSession};
pub use coordinator::{CycleReport, FederationCoordinator};
pub use error::FederationError;
pub use network::{CounterChainClient, PayoutBroadcaster, PeerClient};
pub use signature_provider::SignatureProvider;
