//! A federation member: LMDB-backed transfer store, coordinator, signature
//! provider, wire API and the periodic worker, wired from one config.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use twinpeg_federation::{
    CounterChainClient, FederationCoordinator, PayoutBroadcaster, PeerClient, SignatureProvider,
};
use twinpeg_ledger::{
    BlockSource, MaturedBlocksProvider, TaggedDepositExtractor, TransferStore, WalletManager,
};
use twinpeg_store_lmdb::integrity::{check_data_dir, check_integrity};
use twinpeg_store_lmdb::LmdbEnvironment;
use twinpeg_types::Clock;

use crate::api::FederationApi;
use crate::config::NodeConfig;
use crate::shutdown::ShutdownController;
use crate::worker::SyncWorker;
use crate::NodeError;

/// Everything outside the process a member talks to.
pub struct NodeServices {
    pub wallet: Arc<dyn WalletManager>,
    /// The chain payouts are made on.
    pub payout_chain: Arc<dyn BlockSource>,
    /// The chain deposits are made on, when this member reads it directly
    /// and serves `get_matured_block_deposits`.
    pub source_chain: Option<Arc<dyn BlockSource>>,
    pub peers: Arc<dyn PeerClient>,
    pub counter_chain: Arc<dyn CounterChainClient>,
    pub broadcaster: Arc<dyn PayoutBroadcaster>,
    pub clock: Arc<dyn Clock>,
}

pub struct TwinpegNode {
    config: NodeConfig,
    store: Arc<Mutex<TransferStore>>,
    coordinator: Arc<FederationCoordinator>,
    provider: Arc<SignatureProvider>,
    api: Arc<FederationApi>,
    worker: Arc<SyncWorker>,
    shutdown: Arc<ShutdownController>,
    task_handles: Vec<JoinHandle<()>>,
}

impl TwinpegNode {
    /// Open the store under `config.data_dir`, load it and wire the member.
    /// Nothing runs until [`start`](Self::start).
    pub fn new(config: NodeConfig, services: NodeServices) -> Result<Self, NodeError> {
        let params = config.multisig_params()?;
        let local_member = config.local_member_key()?;
        let wallet_member = services.wallet.local_member();
        if wallet_member != local_member {
            return Err(NodeError::WalletMismatch {
                configured: local_member,
                actual: wallet_member,
            });
        }

        check_data_dir(&config.data_dir).map_err(NodeError::Integrity)?;
        let env = LmdbEnvironment::open(&config.data_dir, config.lmdb_map_size)?;
        let report = check_integrity(env.env())?;
        if !report.is_healthy() {
            return Err(NodeError::Integrity(report.errors.join("; ")));
        }
        tracing::info!(
            path = %config.data_dir.display(),
            databases = report.databases_checked,
            entries = report.total_entries,
            "transfer store opened"
        );

        let mut store = TransferStore::new(
            Arc::new(env),
            services.wallet.clone(),
            services.payout_chain,
            params.clone(),
            config.store_settings(),
        );
        store.initialize()?;
        let store = Arc::new(Mutex::new(store));

        let coordinator = Arc::new(FederationCoordinator::new(
            store.clone(),
            &params,
            local_member.clone(),
            services.peers,
            services.counter_chain,
            services.broadcaster,
            services.clock,
            config.boss_slot(),
            config.matured_batch_size,
        )?);
        let provider = Arc::new(SignatureProvider::new(store.clone(), services.wallet.clone()));
        let matured = services.source_chain.map(|source| {
            let extractor = Arc::new(TaggedDepositExtractor::new(
                services.wallet.multisig_script(),
                config.min_deposit,
            ));
            Arc::new(MaturedBlocksProvider::new(
                source,
                extractor,
                config.min_deposit_confirmations,
            ))
        });
        let api = Arc::new(FederationApi::new(
            coordinator.clone(),
            provider.clone(),
            matured,
            config.matured_batch_size,
        ));
        let worker = Arc::new(SyncWorker::new(coordinator.clone(), config.sync_interval()));

        tracing::info!(
            member = %local_member,
            members = params.size(),
            quorum = params.quorum(),
            "federation member ready"
        );

        Ok(Self {
            config,
            store,
            coordinator,
            provider,
            api,
            worker,
            shutdown: Arc::new(ShutdownController::new()),
            task_handles: Vec::new(),
        })
    }

    /// Spawn the periodic worker.
    pub fn start(&mut self) -> Result<(), NodeError> {
        if !self.task_handles.is_empty() {
            return Err(NodeError::AlreadyStarted);
        }
        let handle = self.worker.clone().spawn(self.shutdown.subscribe());
        self.task_handles.push(handle);
        tracing::info!(
            interval_secs = self.worker.interval().as_secs(),
            "sync worker started"
        );
        Ok(())
    }

    /// Signal shutdown and wait for every task to finish its current cycle.
    pub async fn stop(&mut self) {
        self.shutdown.shutdown();
        for handle in self.task_handles.drain(..) {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "node task ended abnormally");
            }
        }
        tracing::info!("node stopped");
    }

    /// Start, then run until SIGINT or SIGTERM.
    pub async fn run_until_signal(&mut self) -> Result<(), NodeError> {
        self.start()?;
        self.shutdown.wait_for_signal().await?;
        self.stop().await;
        Ok(())
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<Mutex<TransferStore>> {
        &self.store
    }

    pub fn coordinator(&self) -> &Arc<FederationCoordinator> {
        &self.coordinator
    }

    pub fn signature_provider(&self) -> &Arc<SignatureProvider> {
        &self.provider
    }

    pub fn api(&self) -> &Arc<FederationApi> {
        &self.api
    }

    pub fn worker(&self) -> &Arc<SyncWorker> {
        &self.worker
    }

    pub fn shutdown_controller(&self) -> &Arc<ShutdownController> {
        &self.shutdown
    }

    pub fn is_running(&self) -> bool {
        !self.task_handles.is_empty()
    }
}
