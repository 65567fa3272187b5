//! One federation cycle: catch up, record deposits, collect signatures and
//! broadcast finished payouts.
//!
//! The store lock is never held across a network call. Network failures are
//! logged and leave the affected transfer where it is for the next cycle.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use twinpeg_ledger::{ErrorKind, TransferError, TransferStore};
use twinpeg_store::{Transfer, TransferStatus};
use twinpeg_types::{ChainTip, Clock, MultisigParams, PublicKey, Timestamp, TxHash};

use crate::boss_table::{BossTable, LeadershipSession};
use crate::error::FederationError;
use crate::network::{CounterChainClient, PayoutBroadcaster, PeerClient};

/// What one cycle achieved.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub caught_up: bool,
    /// Matured source-chain blocks recorded.
    pub deposit_blocks: usize,
    /// Partial transfers this member drove as boss.
    pub signature_rounds: usize,
    /// Rounds whose peer signatures reached the store.
    pub merged: usize,
    pub broadcasts: usize,
}

pub struct FederationCoordinator {
    store: Arc<Mutex<TransferStore>>,
    peers: Arc<dyn PeerClient>,
    counter_chain: Arc<dyn CounterChainClient>,
    broadcaster: Arc<dyn PayoutBroadcaster>,
    clock: Arc<dyn Clock>,
    boss_table: BossTable,
    local_member: PublicKey,
    deposit_batch_size: usize,
    sessions: Mutex<BTreeMap<TxHash, LeadershipSession>>,
    current_tip: Mutex<Option<(ChainTip, LeadershipSession)>>,
}

impl FederationCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<Mutex<TransferStore>>,
        params: &MultisigParams,
        local_member: PublicKey,
        peers: Arc<dyn PeerClient>,
        counter_chain: Arc<dyn CounterChainClient>,
        broadcaster: Arc<dyn PayoutBroadcaster>,
        clock: Arc<dyn Clock>,
        boss_slot: Duration,
        deposit_batch_size: usize,
    ) -> Result<Self, FederationError> {
        if !params.is_member(&local_member) {
            return Err(FederationError::NotAMember(local_member));
        }
        Ok(Self {
            store,
            peers,
            counter_chain,
            broadcaster,
            clock,
            boss_table: BossTable::new(params, boss_slot),
            local_member,
            deposit_batch_size,
            sessions: Mutex::new(BTreeMap::new()),
            current_tip: Mutex::new(None),
        })
    }

    pub fn boss_table(&self) -> &BossTable {
        &self.boss_table
    }

    pub fn local_member(&self) -> &PublicKey {
        &self.local_member
    }

    pub fn store(&self) -> &Arc<Mutex<TransferStore>> {
        &self.store
    }

    /// Record the current source-chain tip and return the boss of the
    /// session anchored at its height.
    pub async fn push_current_block_tip(&self, tip: ChainTip) -> PublicKey {
        let now = self.clock.now();
        let mut current = self.current_tip.lock().await;
        let session = match *current {
            Some((known, session)) if known.height == tip.height => session,
            _ => LeadershipSession::new(tip.height, now),
        };
        *current = Some((tip, session));
        let boss = self.boss_table.boss_card(&session, now).clone();
        tracing::debug!(%tip, %boss, "current block tip updated");
        boss
    }

    /// Whether this member is the boss for the current tip's session.
    pub async fn am_i_the_boss(&self) -> bool {
        let now = self.clock.now();
        match *self.current_tip.lock().await {
            Some((_, session)) => self.boss_table.am_i_the_boss(&self.local_member, &session, now),
            None => false,
        }
    }

    pub async fn run_cycle(&self) -> Result<CycleReport, FederationError> {
        let mut report = CycleReport {
            caught_up: self.store.lock().await.synchronize()?,
            ..CycleReport::default()
        };
        report.deposit_blocks = self.pull_matured_deposits().await?;

        let now = self.clock.now();
        let partial = self.store.lock().await.get_by_status(TransferStatus::Partial)?;
        self.track_sessions(&partial, now).await;
        for transfer in &partial {
            if !self.is_boss_for(transfer, now).await {
                continue;
            }
            report.signature_rounds += 1;
            if self.request_signatures(transfer).await? {
                report.merged += 1;
            }
        }

        let fully_signed = self
            .store
            .lock()
            .await
            .get_by_status(TransferStatus::FullySigned)?;
        self.track_sessions(&fully_signed, now).await;
        for transfer in &fully_signed {
            if !self.is_boss_for(transfer, now).await {
                continue;
            }
            let Some(payout) = transfer.partial_transaction() else {
                continue;
            };
            match self.broadcaster.broadcast(payout).await {
                Ok(()) => {
                    tracing::info!(deposit_id = %transfer.deposit_id, txid = %payout.txid(), "payout broadcast");
                    report.broadcasts += 1;
                }
                Err(e) => {
                    tracing::warn!(deposit_id = %transfer.deposit_id, error = %e, "payout broadcast failed");
                }
            }
        }

        let active: Vec<TxHash> = partial
            .iter()
            .chain(&fully_signed)
            .map(|t| t.deposit_id)
            .collect();
        self.sessions
            .lock()
            .await
            .retain(|id, _| active.contains(id));

        tracing::debug!(?report, "federation cycle finished");
        Ok(report)
    }

    async fn pull_matured_deposits(&self) -> Result<usize, FederationError> {
        let start = self.store.lock().await.next_mature_deposit_height()?;
        let blocks = match self
            .counter_chain
            .matured_block_deposits(start, self.deposit_batch_size)
            .await
        {
            Ok(blocks) => blocks,
            Err(e) => {
                tracing::warn!(start, error = %e, "could not fetch matured deposits");
                return Ok(0);
            }
        };
        if blocks.is_empty() {
            return Ok(0);
        }
        match self.store.lock().await.record_latest_mature_deposits(&blocks) {
            Ok(()) => Ok(blocks.len()),
            Err(e) if e.kind() == ErrorKind::Validation => {
                tracing::warn!(start, error = %e, "discarding matured deposit batch");
                Ok(0)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Ask every other member to co-sign, then merge what came back.
    async fn request_signatures(&self, transfer: &Transfer) -> Result<bool, FederationError> {
        let Some(template) = transfer.partial_transaction() else {
            return Ok(false);
        };
        let mut candidates = Vec::new();
        for peer in self
            .boss_table
            .members()
            .iter()
            .filter(|m| **m != self.local_member)
        {
            match self.peers.request_signature(peer, template).await {
                Ok(Some(signed)) => candidates.push(signed),
                Ok(None) => tracing::debug!(%peer, deposit_id = %transfer.deposit_id, "peer declined to sign"),
                Err(e) => tracing::warn!(%peer, error = %e, "signature request failed"),
            }
        }
        if candidates.is_empty() {
            return Ok(false);
        }

        let merged = self
            .store
            .lock()
            .await
            .merge_transaction_signatures(transfer.deposit_id, &candidates);
        match merged {
            Ok(status) => {
                tracing::debug!(deposit_id = %transfer.deposit_id, %status, candidates = candidates.len(), "merged peer signatures");
                Ok(true)
            }
            Err(e @ TransferError::Storage(_)) => Err(e.into()),
            Err(e) => {
                tracing::warn!(deposit_id = %transfer.deposit_id, error = %e, "could not merge signatures");
                Ok(false)
            }
        }
    }

    async fn track_sessions(&self, transfers: &[Transfer], now: Timestamp) {
        let mut sessions = self.sessions.lock().await;
        for transfer in transfers {
            sessions.entry(transfer.deposit_id).or_insert_with(|| {
                LeadershipSession::new(transfer.deposit_height.unwrap_or_default(), now)
            });
        }
    }

    async fn is_boss_for(&self, transfer: &Transfer, now: Timestamp) -> bool {
        let sessions = self.sessions.lock().await;
        sessions
            .get(&transfer.deposit_id)
            .is_some_and(|session| self.boss_table.am_i_the_boss(&self.local_member, session, now))
    }
}
