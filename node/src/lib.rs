//! twinpeg federation member node.
//!
//! Wires one member together from a [`NodeConfig`]:
//! - an LMDB-backed transfer store
//! - the federation coordinator and signature provider
//! - the [`FederationApi`] wire contract
//! - a [`SyncWorker`] driving the federation cycle on a timer
//! - graceful shutdown on SIGINT/SIGTERM

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod node;
pub mod shutdown;
pub mod worker;

pub use api::{
    ApiError, ApiResponse, BlockTipRequest, BlockTipResponse, ErrorBody, FederationApi,
    MaturedBlockDepositsRequest, OneOrMany, PushMaturedBlocksResponse,
};
pub use config::NodeConfig;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use node::{NodeServices, TwinpegNode};
pub use shutdown::ShutdownController;
pub use worker::SyncWorker;
