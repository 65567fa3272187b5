//! Persisted records and the abstract storage trait for the transfer ledger.
//!
//! The ledger engine depends only on [`TransferDb`]. The LMDB backend lives in
//! `twinpeg-store-lmdb`; an in-memory double lives in `twinpeg-nullables`.

pub mod common;
pub mod error;
pub mod transfer;

pub use common::{BlockLocator, StoreCursor};
pub use error::StoreError;
pub use transfer::{Transfer, TransferState, TransferStatus};

use twinpeg_types::TxHash;

/// Durable storage for transfers and the store cursor.
///
/// Reads return committed data only. Writes happen exclusively through
/// [`TransferDb::commit`], which applies a whole [`TransferBatch`] or nothing.
pub trait TransferDb: Send + Sync {
    /// The persisted block locator, if the store was ever initialized.
    fn load_locator(&self) -> Result<Option<BlockLocator>, StoreError>;

    /// The persisted next mature deposit height, if any.
    fn load_next_mature_height(&self) -> Result<Option<u64>, StoreError>;

    /// Look up a transfer. Returned records have `db_status` set.
    fn get_transfer(&self, deposit_id: &TxHash) -> Result<Option<Transfer>, StoreError>;

    /// Every stored transfer, ordered by deposit id. Returned records have
    /// `db_status` set.
    fn iter_transfers(&self) -> Result<Vec<Transfer>, StoreError>;

    fn transfer_count(&self) -> Result<u64, StoreError>;

    /// Atomically apply every change in `batch`.
    fn commit(&self, batch: &TransferBatch) -> Result<(), StoreError>;
}

/// A set of changes committed as one unit.
#[derive(Clone, Debug, Default)]
pub struct TransferBatch {
    pub puts: Vec<Transfer>,
    pub deletes: Vec<TxHash>,
    pub locator: Option<BlockLocator>,
    pub next_mature_height: Option<u64>,
}

impl TransferBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, transfer: Transfer) {
        self.deletes.retain(|id| *id != transfer.deposit_id);
        self.puts.retain(|t| t.deposit_id != transfer.deposit_id);
        self.puts.push(transfer);
    }

    pub fn delete(&mut self, deposit_id: TxHash) {
        self.puts.retain(|t| t.deposit_id != deposit_id);
        if !self.deletes.contains(&deposit_id) {
            self.deletes.push(deposit_id);
        }
    }

    pub fn set_locator(&mut self, locator: BlockLocator) {
        self.locator = Some(locator);
    }

    pub fn set_next_mature_height(&mut self, height: u64) {
        self.next_mature_height = Some(height);
    }

    pub fn is_empty(&self) -> bool {
        self.puts.is_empty()
            && self.deletes.is_empty()
            && self.locator.is_none()
            && self.next_mature_height.is_none()
    }
}
