//! Nullable network: peers and chain clients that never leave the process.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use twinpeg_crypto::sign_input;
use twinpeg_federation::{
    CounterChainClient, FederationError, PayoutBroadcaster, PeerClient, SignatureProvider,
};
use twinpeg_ledger::MaturedBlocksProvider;
use twinpeg_types::{KeyPair, MaturedBlockDeposits, PublicKey, Transaction, TxHash};

enum Peer {
    /// Another member's real signature provider.
    Provider(Arc<SignatureProvider>),
    /// Signs whatever it is sent.
    Signer(KeyPair),
}

/// Routes signature requests to in-process peers.
#[derive(Default)]
pub struct NullPeers {
    peers: Mutex<BTreeMap<PublicKey, Arc<Peer>>>,
    offline: Mutex<BTreeSet<PublicKey>>,
    requests: Mutex<Vec<(PublicKey, TxHash)>>,
}

impl NullPeers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route requests for `member` to its signature provider.
    pub fn connect(&self, member: PublicKey, provider: Arc<SignatureProvider>) {
        self.peers
            .lock()
            .unwrap()
            .insert(member, Arc::new(Peer::Provider(provider)));
    }

    /// A peer that signs every request with `keypair`, unchecked.
    pub fn add_signer(&self, keypair: KeyPair) {
        self.peers
            .lock()
            .unwrap()
            .insert(keypair.public.clone(), Arc::new(Peer::Signer(keypair)));
    }

    pub fn set_offline(&self, member: &PublicKey, offline: bool) {
        let mut set = self.offline.lock().unwrap();
        if offline {
            set.insert(member.clone());
        } else {
            set.remove(member);
        }
    }

    /// Every `(peer, txid)` request made so far.
    pub fn requests(&self) -> Vec<(PublicKey, TxHash)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PeerClient for NullPeers {
    async fn request_signature(
        &self,
        peer: &PublicKey,
        candidate: &Transaction,
    ) -> Result<Option<Transaction>, FederationError> {
        self.requests
            .lock()
            .unwrap()
            .push((peer.clone(), candidate.txid()));

        let unreachable = |reason: &str| FederationError::PeerUnreachable {
            peer: peer.clone(),
            reason: reason.into(),
        };
        if self.offline.lock().unwrap().contains(peer) {
            return Err(unreachable("offline"));
        }
        let target = self.peers.lock().unwrap().get(peer).cloned();
        match target.as_deref() {
            None => Err(unreachable("not connected")),
            Some(Peer::Provider(provider)) => provider.sign(candidate).await,
            Some(Peer::Signer(keypair)) => {
                let mut signed = candidate.clone();
                for (index, input) in signed.inputs.iter_mut().enumerate() {
                    input.signatures.push(sign_input(candidate, index, keypair));
                }
                Ok(Some(signed))
            }
        }
    }
}

/// Serves matured deposits and records broadcast payouts.
///
/// Matured blocks come from a [`MaturedBlocksProvider`] when one is
/// attached, otherwise from blocks queued with `push_matured`.
#[derive(Default)]
pub struct NullCounterChain {
    provider: Option<Arc<MaturedBlocksProvider>>,
    queued: Mutex<Vec<MaturedBlockDeposits>>,
    broadcasts: Mutex<Vec<Transaction>>,
    offline: AtomicBool,
}

impl NullCounterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(provider: Arc<MaturedBlocksProvider>) -> Self {
        Self {
            provider: Some(provider),
            ..Self::default()
        }
    }

    pub fn push_matured(&self, block: MaturedBlockDeposits) {
        self.queued.lock().unwrap().push(block);
    }

    pub fn broadcasts(&self) -> Vec<Transaction> {
        self.broadcasts.lock().unwrap().clone()
    }

    /// Fail every request while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), FederationError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(FederationError::CounterChain("node offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CounterChainClient for NullCounterChain {
    async fn matured_block_deposits(
        &self,
        start_height: u64,
        max_blocks: usize,
    ) -> Result<Vec<MaturedBlockDeposits>, FederationError> {
        self.check_online()?;
        if let Some(provider) = &self.provider {
            return Ok(provider.get_matured_block_deposits(start_height, max_blocks));
        }
        let queued = self.queued.lock().unwrap();
        let mut result = Vec::new();
        let mut expected = start_height;
        for block in queued.iter().filter(|b| b.block.height >= start_height) {
            if block.block.height != expected || result.len() == max_blocks {
                break;
            }
            result.push(block.clone());
            expected += 1;
        }
        Ok(result)
    }
}

#[async_trait]
impl PayoutBroadcaster for NullCounterChain {
    async fn broadcast(&self, payout: &Transaction) -> Result<(), FederationError> {
        self.check_online()?;
        self.broadcasts.lock().unwrap().push(payout.clone());
        Ok(())
    }
}
