//! LMDB environment setup and the [`TransferDb`] implementation.

use std::path::{Path, PathBuf};

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use twinpeg_store::common::{NEXT_MATURE_HEIGHT_KEY, REPOSITORY_TIP_KEY};
use twinpeg_store::{BlockLocator, StoreError, Transfer, TransferBatch, TransferDb};
use twinpeg_types::TxHash;

use crate::write_batch::WriteBatch;
use crate::LmdbError;

pub const TRANSFERS_DB: &str = "transfers";
pub const COMMON_DB: &str = "common";

/// Number of named databases the environment may hold.
const MAX_DBS: u32 = 4;

/// Wraps the LMDB environment and both database handles.
pub struct LmdbEnvironment {
    env: Env,
    path: PathBuf,
    pub(crate) transfers_db: Database<Bytes, Bytes>,
    pub(crate) common_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment is opened once per directory by this process.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let transfers_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some(TRANSFERS_DB))?;
        let common_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some(COMMON_DB))?;
        wtxn.commit()?;

        tracing::debug!(path = %path.display(), map_size, "opened LMDB environment");

        Ok(Self {
            env,
            path: path.to_path_buf(),
            transfers_db,
            common_db,
        })
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Begin a write batch. Dropping it without committing rolls back.
    pub fn write_batch(&self) -> Result<WriteBatch<'_>, StoreError> {
        WriteBatch::new(self)
    }

    fn decode_transfer(bytes: &[u8]) -> Result<Transfer, LmdbError> {
        let mut transfer: Transfer = bincode::deserialize(bytes)?;
        transfer.mark_persisted();
        Ok(transfer)
    }
}

impl TransferDb for LmdbEnvironment {
    fn load_locator(&self) -> Result<Option<BlockLocator>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let value = self
            .common_db
            .get(&rtxn, REPOSITORY_TIP_KEY)
            .map_err(LmdbError::from)?;
        match value {
            Some(bytes) => {
                let locator = bincode::deserialize(bytes).map_err(LmdbError::from)?;
                Ok(Some(locator))
            }
            None => Ok(None),
        }
    }

    fn load_next_mature_height(&self) -> Result<Option<u64>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let value = self
            .common_db
            .get(&rtxn, NEXT_MATURE_HEIGHT_KEY)
            .map_err(LmdbError::from)?;
        match value {
            Some(bytes) => {
                let arr: [u8; 8] = bytes.try_into().map_err(|_| {
                    LmdbError::Serialization("next_mature_height has unexpected byte length".into())
                })?;
                Ok(Some(u64::from_be_bytes(arr)))
            }
            None => Ok(None),
        }
    }

    fn get_transfer(&self, deposit_id: &TxHash) -> Result<Option<Transfer>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let value = self
            .transfers_db
            .get(&rtxn, deposit_id.as_bytes().as_slice())
            .map_err(LmdbError::from)?;
        match value {
            Some(bytes) => Ok(Some(Self::decode_transfer(bytes)?)),
            None => Ok(None),
        }
    }

    fn iter_transfers(&self) -> Result<Vec<Transfer>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut transfers = Vec::new();
        let iter = self.transfers_db.iter(&rtxn).map_err(LmdbError::from)?;
        for result in iter {
            let (_key, value) = result.map_err(LmdbError::from)?;
            transfers.push(Self::decode_transfer(value)?);
        }
        Ok(transfers)
    }

    fn transfer_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.transfers_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }

    fn commit(&self, batch: &TransferBatch) -> Result<(), StoreError> {
        let mut write = self.write_batch()?;
        for deposit_id in &batch.deletes {
            write.delete_transfer(deposit_id)?;
        }
        for transfer in &batch.puts {
            write.put_transfer(transfer)?;
        }
        if let Some(locator) = &batch.locator {
            write.put_locator(locator)?;
        }
        if let Some(height) = batch.next_mature_height {
            write.put_next_mature_height(height)?;
        }
        write.commit()?;
        tracing::trace!(
            puts = batch.puts.len(),
            deletes = batch.deletes.len(),
            "committed transfer batch"
        );
        Ok(())
    }
}
