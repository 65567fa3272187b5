//! Nullable store: thread-safe in-memory transfer storage for testing.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use twinpeg_store::{BlockLocator, StoreError, Transfer, TransferBatch, TransferDb};
use twinpeg_types::TxHash;

#[derive(Default)]
struct Tables {
    transfers: BTreeMap<TxHash, Transfer>,
    locator: Option<BlockLocator>,
    next_mature_height: Option<u64>,
}

/// An in-memory [`TransferDb`].
///
/// Commits are all-or-nothing like the real backend. A commit can be made
/// to fail on demand to exercise rollback paths.
#[derive(Default)]
pub struct NullTransferDb {
    tables: Mutex<Tables>,
    fail_next_commit: AtomicBool,
    commits: AtomicUsize,
}

impl NullTransferDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call to `commit` fail without writing anything.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// A copy of every stored transfer, ordered by deposit id.
    pub fn snapshot(&self) -> Vec<Transfer> {
        self.tables
            .lock()
            .unwrap()
            .transfers
            .values()
            .cloned()
            .collect()
    }

    /// Overwrite a record behind the engine's back.
    pub fn put_raw(&self, transfer: Transfer) {
        self.tables
            .lock()
            .unwrap()
            .transfers
            .insert(transfer.deposit_id, transfer);
    }
}

impl TransferDb for NullTransferDb {
    fn load_locator(&self) -> Result<Option<BlockLocator>, StoreError> {
        Ok(self.tables.lock().unwrap().locator.clone())
    }

    fn load_next_mature_height(&self) -> Result<Option<u64>, StoreError> {
        Ok(self.tables.lock().unwrap().next_mature_height)
    }

    fn get_transfer(&self, deposit_id: &TxHash) -> Result<Option<Transfer>, StoreError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .transfers
            .get(deposit_id)
            .cloned()
            .map(|mut t| {
                t.mark_persisted();
                t
            }))
    }

    fn iter_transfers(&self) -> Result<Vec<Transfer>, StoreError> {
        Ok(self
            .snapshot()
            .into_iter()
            .map(|mut t| {
                t.mark_persisted();
                t
            })
            .collect())
    }

    fn transfer_count(&self) -> Result<u64, StoreError> {
        Ok(self.tables.lock().unwrap().transfers.len() as u64)
    }

    fn commit(&self, batch: &TransferBatch) -> Result<(), StoreError> {
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("injected commit failure".into()));
        }
        let mut tables = self.tables.lock().unwrap();
        for id in &batch.deletes {
            tables.transfers.remove(id);
        }
        for transfer in &batch.puts {
            tables
                .transfers
                .insert(transfer.deposit_id, transfer.clone());
        }
        if let Some(locator) = &batch.locator {
            tables.locator = Some(locator.clone());
        }
        if let Some(height) = batch.next_mature_height {
            tables.next_mature_height = Some(height);
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
