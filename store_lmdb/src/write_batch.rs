//! Write batching: groups transfer and cursor updates into a single LMDB
//! write transaction.
//!
//! If the batch is dropped without calling [`WriteBatch::commit`], all
//! operations are rolled back (the underlying LMDB transaction is aborted).

use heed::RwTxn;

use twinpeg_store::common::{NEXT_MATURE_HEIGHT_KEY, REPOSITORY_TIP_KEY};
use twinpeg_store::{BlockLocator, StoreError, Transfer};
use twinpeg_types::TxHash;

use crate::environment::LmdbEnvironment;
use crate::LmdbError;

pub struct WriteBatch<'a> {
    txn: RwTxn<'a>,
    env: &'a LmdbEnvironment,
}

impl<'a> WriteBatch<'a> {
    pub(crate) fn new(env: &'a LmdbEnvironment) -> Result<Self, StoreError> {
        let txn = env.env().write_txn().map_err(LmdbError::from)?;
        Ok(Self { txn, env })
    }

    /// Insert or replace a transfer, keyed by deposit id.
    pub fn put_transfer(&mut self, transfer: &Transfer) -> Result<(), StoreError> {
        let bytes = bincode::serialize(transfer).map_err(LmdbError::from)?;
        self.env
            .transfers_db
            .put(&mut self.txn, transfer.deposit_id.as_bytes().as_slice(), &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    pub fn delete_transfer(&mut self, deposit_id: &TxHash) -> Result<(), StoreError> {
        self.env
            .transfers_db
            .delete(&mut self.txn, deposit_id.as_bytes().as_slice())
            .map_err(LmdbError::from)?;
        Ok(())
    }

    pub fn put_locator(&mut self, locator: &BlockLocator) -> Result<(), StoreError> {
        let bytes = bincode::serialize(locator).map_err(LmdbError::from)?;
        self.env
            .common_db
            .put(&mut self.txn, REPOSITORY_TIP_KEY, &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    pub fn put_next_mature_height(&mut self, height: u64) -> Result<(), StoreError> {
        self.env
            .common_db
            .put(&mut self.txn, NEXT_MATURE_HEIGHT_KEY, &height.to_be_bytes())
            .map_err(LmdbError::from)?;
        Ok(())
    }

    /// Commit all batched operations in a single write transaction.
    pub fn commit(self) -> Result<(), StoreError> {
        self.txn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}
