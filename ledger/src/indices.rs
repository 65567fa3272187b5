//! In-memory indices over the persisted transfers.
//!
//! Rebuilt from storage by one full scan on initialization and updated only
//! from a [`StatusChangeTracker`] after a successful commit.

use std::collections::{BTreeMap, BTreeSet};

use twinpeg_store::{Transfer, TransferStatus};
use twinpeg_types::{BlockHash, TxHash};

use crate::status_tracker::{IndexEntry, StatusChangeTracker};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockEntry {
    pub height: u64,
    pub deposits: BTreeSet<TxHash>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferIndices {
    by_status: BTreeMap<TransferStatus, BTreeSet<TxHash>>,
    by_block_hash: BTreeMap<BlockHash, BlockEntry>,
    block_of: BTreeMap<TxHash, BlockHash>,
}

impl Default for TransferIndices {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferIndices {
    pub fn new() -> Self {
        let by_status = TransferStatus::ALL
            .iter()
            .map(|status| (*status, BTreeSet::new()))
            .collect();
        Self {
            by_status,
            by_block_hash: BTreeMap::new(),
            block_of: BTreeMap::new(),
        }
    }

    pub fn rebuild<'a>(transfers: impl IntoIterator<Item = &'a Transfer>) -> Self {
        let mut indices = Self::new();
        for transfer in transfers {
            indices.insert(transfer.deposit_id, IndexEntry::of(transfer));
        }
        indices
    }

    pub fn with_status(&self, status: TransferStatus) -> &BTreeSet<TxHash> {
        // Seeded with every status in `new`.
        &self.by_status[&status]
    }

    pub fn count(&self, status: TransferStatus) -> usize {
        self.with_status(status).len()
    }

    pub fn in_block(&self, hash: &BlockHash) -> Option<&BlockEntry> {
        self.by_block_hash.get(hash)
    }

    /// Every recorded block, `(hash, height)`.
    pub fn blocks(&self) -> impl Iterator<Item = (&BlockHash, u64)> {
        self.by_block_hash.iter().map(|(hash, entry)| (hash, entry.height))
    }

    pub fn apply(&mut self, tracker: &StatusChangeTracker) {
        for (id, change) in tracker.changes() {
            if let Some(previous) = change.previous {
                self.remove(id, previous);
            }
            if let Some(current) = change.current {
                self.insert(*id, current);
            }
        }
    }

    fn insert(&mut self, id: TxHash, entry: IndexEntry) {
        if let Some(set) = self.by_status.get_mut(&entry.status) {
            set.insert(id);
        }
        if let Some((hash, height)) = entry.block {
            self.by_block_hash
                .entry(hash)
                .or_insert_with(|| BlockEntry {
                    height,
                    deposits: BTreeSet::new(),
                })
                .deposits
                .insert(id);
            self.block_of.insert(id, hash);
        }
    }

    fn remove(&mut self, id: &TxHash, status: TransferStatus) {
        if let Some(set) = self.by_status.get_mut(&status) {
            set.remove(id);
        }
        if let Some(hash) = self.block_of.remove(id) {
            if let Some(entry) = self.by_block_hash.get_mut(&hash) {
                entry.deposits.remove(id);
                if entry.deposits.is_empty() {
                    self.by_block_hash.remove(&hash);
                }
            }
        }
    }
}
