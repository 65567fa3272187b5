//! Per-operation record of status and block changes.
//!
//! The engine tracks every transfer it writes or deletes during one
//! operation. After the storage commit succeeds the tracked changes are
//! applied to the in-memory indices; on failure they are discarded.

use std::collections::BTreeMap;

use twinpeg_store::{Transfer, TransferStatus};
use twinpeg_types::{BlockHash, TxHash};

/// Where a transfer sat in the indices, or ends up after the operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    pub status: TransferStatus,
    pub block: Option<(BlockHash, u64)>,
}

impl IndexEntry {
    pub fn of(transfer: &Transfer) -> Self {
        Self {
            status: transfer.status(),
            block: transfer.block_hash().zip(transfer.block_height()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusChange {
    /// Status as last read from storage; `None` for new transfers.
    pub previous: Option<TransferStatus>,
    /// `None` when the transfer is deleted.
    pub current: Option<IndexEntry>,
}

#[derive(Debug, Default)]
pub struct StatusChangeTracker {
    changes: BTreeMap<TxHash, StatusChange>,
}

impl StatusChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a write of `transfer`.
    pub fn record(&mut self, transfer: &Transfer) {
        let entry = IndexEntry::of(transfer);
        self.changes
            .entry(transfer.deposit_id)
            .and_modify(|change| change.current = Some(entry))
            .or_insert(StatusChange {
                previous: transfer.db_status,
                current: Some(entry),
            });
    }

    /// Track deletion of `transfer`.
    pub fn record_delete(&mut self, transfer: &Transfer) {
        self.changes
            .entry(transfer.deposit_id)
            .and_modify(|change| change.current = None)
            .or_insert(StatusChange {
                previous: transfer.db_status,
                current: None,
            });
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn changes(&self) -> impl Iterator<Item = (&TxHash, &StatusChange)> {
        self.changes.iter()
    }

    /// Deposit ids that end this operation in `status`.
    pub fn entering(&self, status: TransferStatus) -> impl Iterator<Item = &TxHash> + '_ {
        self.changes
            .iter()
            .filter(move |(_, change)| change.current.map(|c| c.status) == Some(status))
            .map(|(id, _)| id)
    }
}
