//! Gatekeeper for co-signing requests and combiner of collected signatures.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use twinpeg_ledger::{TransferError, TransferStore, WalletManager};
use twinpeg_store::{Transfer, TransferStatus};
use twinpeg_types::{Transaction, TxHash};

use crate::error::FederationError;

pub struct SignatureProvider {
    store: Arc<Mutex<TransferStore>>,
    wallet: Arc<dyn WalletManager>,
}

impl SignatureProvider {
    pub fn new(store: Arc<Mutex<TransferStore>>, wallet: Arc<dyn WalletManager>) -> Self {
        Self { store, wallet }
    }

    /// The stored transfer `candidate` may be signed for, or why not.
    ///
    /// The deposit must be known, its payout not yet seen on chain (or
    /// final or rejected), and the candidate must spend and pay exactly
    /// what the stored template does.
    pub async fn authorize(&self, candidate: &Transaction) -> Result<Transfer, FederationError> {
        let deposit_id = candidate
            .deposit_id()
            .ok_or_else(|| FederationError::UntaggedCandidate(candidate.txid()))?;
        let transfer = {
            let mut store = self.store.lock().await;
            store.get(&[deposit_id])?.into_iter().next().flatten()
        }
        .ok_or(TransferError::UnknownDeposit(deposit_id))?;

        match transfer.status() {
            TransferStatus::Partial | TransferStatus::FullySigned => {}
            status => return Err(TransferError::InvalidStatus { deposit_id, status }.into()),
        }
        let matches = transfer
            .partial_transaction()
            .is_some_and(|template| template.same_structure(candidate));
        if !matches {
            return Err(TransferError::TemplateMismatch(deposit_id).into());
        }
        Ok(transfer)
    }

    pub async fn is_authorized(&self, candidate: &Transaction) -> bool {
        match self.authorize(candidate).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(txid = %candidate.txid(), error = %e, "co-signing refused");
                false
            }
        }
    }

    /// Add the local signature to `candidate` if it is authorized.
    pub async fn sign(&self, candidate: &Transaction) -> Result<Option<Transaction>, FederationError> {
        if !self.is_authorized(candidate).await {
            return Ok(None);
        }
        let signed = self
            .wallet
            .sign_transaction(candidate)
            .map_err(TransferError::from)?;
        tracing::info!(txid = %candidate.txid(), "co-signed payout");
        Ok(Some(signed))
    }

    /// Merge `candidates` into their stored transfers, grouped by the
    /// deposit each one names. Untagged candidates are ignored.
    pub async fn combine(
        &self,
        candidates: &[Transaction],
    ) -> Result<Vec<(TxHash, TransferStatus)>, FederationError> {
        let mut by_deposit: BTreeMap<TxHash, Vec<Transaction>> = BTreeMap::new();
        for candidate in candidates {
            if let Some(deposit_id) = candidate.deposit_id() {
                by_deposit.entry(deposit_id).or_default().push(candidate.clone());
            }
        }

        let mut store = self.store.lock().await;
        let mut outcome = Vec::with_capacity(by_deposit.len());
        for (deposit_id, group) in by_deposit {
            let status = store.merge_transaction_signatures(deposit_id, &group)?;
            outcome.push((deposit_id, status));
        }
        Ok(outcome)
    }
}
