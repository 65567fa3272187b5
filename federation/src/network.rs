//! Outbound collaborators of the coordinator.
//!
//! Implementations wrap whatever transport reaches peers and chain nodes.
//! Every failure is reported as a [`FederationError`] of the network kind;
//! the coordinator logs it and retries on its next cycle.

use async_trait::async_trait;

use twinpeg_types::{MaturedBlockDeposits, PublicKey, Transaction};

use crate::error::FederationError;

/// Reaches the other federation members.
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Ask `peer` to co-sign `candidate`. `Ok(None)` means the peer refused.
    async fn request_signature(
        &self,
        peer: &PublicKey,
        candidate: &Transaction,
    ) -> Result<Option<Transaction>, FederationError>;
}

/// Reaches the source chain node that reports matured deposits.
#[async_trait]
pub trait CounterChainClient: Send + Sync {
    async fn matured_block_deposits(
        &self,
        start_height: u64,
        max_blocks: usize,
    ) -> Result<Vec<MaturedBlockDeposits>, FederationError>;
}

/// Submits fully signed payouts to the target chain.
#[async_trait]
pub trait PayoutBroadcaster: Send + Sync {
    async fn broadcast(&self, payout: &Transaction) -> Result<(), FederationError>;
}
