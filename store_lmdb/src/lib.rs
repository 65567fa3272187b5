//! LMDB storage backend for the twinpeg transfer ledger.
//!
//! Implements [`twinpeg_store::TransferDb`] using the `heed` LMDB bindings.
//! One environment holds two databases: `transfers`, keyed by deposit id,
//! and `common`, holding the store cursor.

pub mod environment;
pub mod error;
pub mod integrity;
pub mod write_batch;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use write_batch::WriteBatch;
