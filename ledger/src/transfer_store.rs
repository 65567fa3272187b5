//! The transfer store engine.
//!
//! Owns the persisted transfers, the store cursor and the in-memory
//! indices. Every mutating operation runs as one unit: changes are staged in
//! an [`Update`], committed to storage in a single batch, and only then
//! applied to the indices. On any error the cursor is restored to its
//! pre-call snapshot, wallet reservations made during the call are released
//! (and those it dropped are taken again), and nothing is written.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use twinpeg_store::{
    BlockLocator, StoreCursor, StoreError, Transfer, TransferBatch, TransferDb, TransferState,
    TransferStatus,
};
use twinpeg_types::{
    Amount, ChainBlock, ChainTip, Deposit, MaturedBlockDeposits, MultisigParams, OutPoint,
    Script, Transaction, TxHash, Withdrawal,
};

use crate::chain::BlockSource;
use crate::error::TransferError;
use crate::extraction::WithdrawalExtractor;
use crate::indices::TransferIndices;
use crate::multisig;
use crate::payout::PayoutBuilder;
use crate::status_tracker::StatusChangeTracker;
use crate::wallet::WalletManager;

/// Tunables of the engine.
#[derive(Clone, Debug)]
pub struct StoreSettings {
    /// Maximum blocks handed to `process_blocks` per synchronization step.
    pub sync_batch_size: usize,
    /// Blocks a payout must be buried under before it is `Complete`.
    pub finality_depth: u64,
    /// Initial value of the next mature deposit height on a fresh store.
    pub first_mature_height: u64,
    /// Fixed fee deducted from every payout.
    pub payout_fee: Amount,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            sync_batch_size: 100,
            finality_depth: 12,
            first_mature_height: 1,
            payout_fee: Amount::ZERO,
        }
    }
}

/// Changes staged by one operation.
#[derive(Debug, Default)]
struct Update {
    /// `None` marks a deletion.
    overlay: BTreeMap<TxHash, Option<Transfer>>,
    tracker: StatusChangeTracker,
    /// Reservations made during the operation, undone on failure.
    reserved: Vec<TxHash>,
    /// Reservations to drop once the commit succeeded.
    release_after_commit: Vec<TxHash>,
    /// Reservations dropped during the operation, restored on failure.
    released: Vec<(TxHash, Vec<OutPoint>)>,
}

impl Update {
    fn write(&mut self, transfer: Transfer) {
        self.tracker.record(&transfer);
        self.overlay.insert(transfer.deposit_id, Some(transfer));
    }

    fn delete(&mut self, transfer: &Transfer) {
        self.tracker.record_delete(transfer);
        self.overlay.insert(transfer.deposit_id, None);
    }
}

pub struct TransferStore {
    db: Arc<dyn TransferDb>,
    wallet: Arc<dyn WalletManager>,
    chain: Arc<dyn BlockSource>,
    params: MultisigParams,
    payouts: PayoutBuilder,
    withdrawals: WithdrawalExtractor,
    settings: StoreSettings,
    /// `None` until [`TransferStore::initialize`] ran.
    cursor: Option<StoreCursor>,
    indices: TransferIndices,
}

impl TransferStore {
    pub fn new(
        db: Arc<dyn TransferDb>,
        wallet: Arc<dyn WalletManager>,
        chain: Arc<dyn BlockSource>,
        params: MultisigParams,
        settings: StoreSettings,
    ) -> Self {
        let multisig_script = wallet.multisig_script();
        Self {
            payouts: PayoutBuilder::new(multisig_script.clone(), settings.payout_fee),
            withdrawals: WithdrawalExtractor::new(multisig_script, params.clone()),
            db,
            wallet,
            chain,
            params,
            settings,
            cursor: None,
            indices: TransferIndices::new(),
        }
    }

    pub fn params(&self) -> &MultisigParams {
        &self.params
    }

    pub fn wallet(&self) -> &Arc<dyn WalletManager> {
        &self.wallet
    }

    pub fn is_initialized(&self) -> bool {
        self.cursor.is_some()
    }

    /// Load the cursor and rebuild the indices with one scan of storage.
    ///
    /// A fresh store starts at the genesis of the payout chain and at the
    /// configured first mature height. Safe to call again at any time.
    pub fn initialize(&mut self) -> Result<(), TransferError> {
        let locator = match self.db.load_locator()? {
            Some(locator) => locator,
            None => BlockLocator::new(self.chain.genesis()),
        };
        let next_mature_deposit_height = self
            .db
            .load_next_mature_height()?
            .unwrap_or(self.settings.first_mature_height);
        let transfers = self.db.iter_transfers()?;

        self.indices = TransferIndices::rebuild(&transfers);
        self.cursor = Some(StoreCursor {
            locator,
            next_mature_deposit_height,
        });

        tracing::info!(
            tip = %self.cursor()?.tip(),
            next_mature_deposit_height,
            transfers = transfers.len(),
            "transfer store initialized"
        );
        Ok(())
    }

    pub fn next_mature_deposit_height(&self) -> Result<u64, TransferError> {
        Ok(self.cursor()?.next_mature_deposit_height)
    }

    pub fn tip_hash_and_height(&self) -> Result<ChainTip, TransferError> {
        Ok(self.cursor()?.tip())
    }

    /// Number of transfers per status, from the indices.
    pub fn status_counts(&self) -> Result<Vec<(TransferStatus, usize)>, TransferError> {
        self.cursor()?;
        Ok(TransferStatus::ALL
            .iter()
            .map(|status| (*status, self.indices.count(*status)))
            .collect())
    }

    // ── Deposits ────────────────────────────────────────────────────────

    /// Record the deposits of the next matured source-chain blocks.
    ///
    /// Block heights must run contiguously from the next mature deposit
    /// height, and every deposit must belong to its block. A violating batch
    /// is rejected before anything changes. Suspended transfers are retried
    /// first, so they take precedence over new deposits for funds.
    pub fn record_latest_mature_deposits(
        &mut self,
        blocks: &[MaturedBlockDeposits],
    ) -> Result<(), TransferError> {
        let expected = self.cursor()?.next_mature_deposit_height;
        validate_batch(expected, blocks)?;

        self.run("record_latest_mature_deposits", |store, update| {
            store.retry_suspended(update)?;
            for block in blocks {
                for deposit in &block.deposits {
                    store.record_deposit(update, deposit)?;
                }
            }
            store.cursor_mut()?.next_mature_deposit_height = expected + blocks.len() as u64;
            Ok(())
        })?;

        if !blocks.is_empty() {
            tracing::info!(
                blocks = blocks.len(),
                deposits = blocks.iter().map(|b| b.deposits.len()).sum::<usize>(),
                next_mature_deposit_height = expected + blocks.len() as u64,
                "recorded matured deposits"
            );
        }
        Ok(())
    }

    fn record_deposit(&self, update: &mut Update, deposit: &Deposit) -> Result<(), TransferError> {
        if let Some(mut existing) = self.load(update, &deposit.id)? {
            if existing.is_observed_only() {
                existing.deposit_height = Some(deposit.block_number);
                existing.deposit_amount = deposit.amount;
                existing.deposit_target_address = deposit.target_address.clone();
                if let TransferState::SeenInBlock { transaction, .. } = &existing.state {
                    self.reserve_observed(update, &deposit.id, transaction);
                }
                update.write(existing);
                tracing::debug!(deposit_id = %deposit.id, "matured deposit joins observed payout");
            } else {
                tracing::debug!(deposit_id = %deposit.id, "deposit already recorded");
            }
            return Ok(());
        }

        let state =
            self.build_state(update, &deposit.id, deposit.amount, &deposit.target_address)?;
        if state == TransferState::Suspended {
            tracing::info!(
                deposit_id = %deposit.id,
                amount = %deposit.amount,
                "payout cannot be built yet, transfer suspended"
            );
        }
        let transfer = match state {
            TransferState::Partial { transaction } => Transfer::partial(deposit, transaction),
            state => Transfer {
                state,
                ..Transfer::suspended(deposit)
            },
        };
        update.write(transfer);
        Ok(())
    }

    fn retry_suspended(&self, update: &mut Update) -> Result<(), TransferError> {
        let mut suspended = Vec::new();
        for id in self.ids_with_status(update, TransferStatus::Suspended) {
            suspended.push(self.load_indexed(update, &id)?);
        }
        suspended.sort_by_key(|t| (t.deposit_height, t.deposit_id));

        for mut transfer in suspended {
            let state = self.build_state(
                update,
                &transfer.deposit_id,
                transfer.deposit_amount,
                &transfer.deposit_target_address,
            )?;
            if state != TransferState::Suspended {
                tracing::info!(deposit_id = %transfer.deposit_id, "suspended transfer funded");
                transfer.state = state;
                update.write(transfer);
            }
        }
        Ok(())
    }

    /// Build, reserve and locally sign the payout template.
    fn build_state(
        &self,
        update: &mut Update,
        deposit_id: &TxHash,
        amount: Amount,
        target: &Script,
    ) -> Result<TransferState, TransferError> {
        let spendable = self.wallet.spendable_outputs();
        let Some(template) = self.payouts.build(deposit_id, amount, target, &spendable) else {
            return Ok(TransferState::Suspended);
        };

        let txid = template.txid();
        let outpoints: Vec<OutPoint> = template.outpoints().copied().collect();
        self.wallet.reserve(txid, &outpoints)?;
        update.reserved.push(txid);

        let signed = self.wallet.sign_transaction(&template)?;
        let transaction = multisig::merge_signatures(&template, &[signed], &self.params);
        if multisig::has_quorum(&transaction, &self.params) {
            Ok(TransferState::FullySigned { transaction })
        } else {
            Ok(TransferState::Partial { transaction })
        }
    }

    // ── Signatures ──────────────────────────────────────────────────────

    /// Merge member signatures from `candidates` into the stored template.
    ///
    /// Candidates whose structure differs from the template are ignored.
    /// Returns the resulting status: `FullySigned` once every input has a
    /// quorum, `Partial` before that, or `Rejected` if the transfer failed
    /// its sanity check. Repeating a call changes nothing.
    pub fn merge_transaction_signatures(
        &mut self,
        deposit_id: TxHash,
        candidates: &[Transaction],
    ) -> Result<TransferStatus, TransferError> {
        self.run("merge_transaction_signatures", |store, update| {
            let mut transfer = store
                .load(update, &deposit_id)?
                .ok_or(TransferError::UnknownDeposit(deposit_id))?;
            let template = match &transfer.state {
                TransferState::Partial { transaction }
                | TransferState::FullySigned { transaction } => transaction.clone(),
                _ => {
                    return Err(TransferError::InvalidStatus {
                        deposit_id,
                        status: transfer.status(),
                    })
                }
            };

            if !store.passes_sanity_check(&transfer) {
                store.reject(update, transfer);
                return Ok(TransferStatus::Rejected);
            }

            let matching: Vec<Transaction> = candidates
                .iter()
                .filter(|candidate| template.same_structure(candidate))
                .cloned()
                .collect();
            if matching.len() < candidates.len() {
                tracing::warn!(
                    %deposit_id,
                    ignored = candidates.len() - matching.len(),
                    "ignoring candidates that do not match the stored template"
                );
            }

            let transaction = multisig::merge_signatures(&template, &matching, &store.params);
            let state = if multisig::has_quorum(&transaction, &store.params) {
                TransferState::FullySigned { transaction }
            } else {
                TransferState::Partial { transaction }
            };
            let status = state.status();
            if state != transfer.state {
                tracing::info!(
                    %deposit_id,
                    from = %transfer.status(),
                    to = %status,
                    "merged transfer signatures"
                );
                transfer.state = state;
                update.write(transfer);
            }
            Ok(status)
        })
    }

    // ── Payout chain ────────────────────────────────────────────────────

    /// Apply consecutive payout-chain blocks on top of the store tip.
    ///
    /// Payouts found in the blocks move their transfers to `SeenInBlock`;
    /// payouts for unknown deposits create observed-only transfers. The
    /// first block must extend the tip.
    pub fn process_blocks(&mut self, blocks: &[ChainBlock]) -> Result<(), TransferError> {
        let mut previous = self.cursor()?.tip();
        for block in blocks {
            if block.previous != previous.hash || block.height != previous.height + 1 {
                return Err(TransferError::Discontinuity {
                    height: block.height,
                    tip: previous.hash,
                });
            }
            previous = block.tip();
        }
        if blocks.is_empty() {
            return Ok(());
        }

        self.run("process_blocks", |store, update| {
            for block in blocks {
                for tx in &block.transactions {
                    if let Some(withdrawal) = store.withdrawals.extract_withdrawal(tx, block.tip()) {
                        store.mark_seen(update, &withdrawal, tx)?;
                    }
                }
                store.cursor_mut()?.locator.push(block.tip());
            }
            store.complete_final(update)
        })?;

        tracing::debug!(tip = %previous, blocks = blocks.len(), "processed payout-chain blocks");
        Ok(())
    }

    fn mark_seen(
        &self,
        update: &mut Update,
        withdrawal: &Withdrawal,
        tx: &Transaction,
    ) -> Result<(), TransferError> {
        let deposit_id = withdrawal.deposit_id;
        let block = ChainTip::new(withdrawal.block_hash, withdrawal.block_number);

        let Some(mut transfer) = self.load(update, &deposit_id)? else {
            tracing::info!(%deposit_id, %block, "observed payout for an unrecorded deposit");
            update.write(Transfer::observed(
                deposit_id,
                withdrawal.target_address.clone(),
                withdrawal.amount,
                tx.clone(),
                block,
            ));
            return Ok(());
        };

        match transfer.status() {
            TransferStatus::Suspended | TransferStatus::Partial | TransferStatus::FullySigned => {
                if let Some(template) = transfer.partial_transaction() {
                    if !template.same_structure(tx) {
                        tracing::warn!(
                            %deposit_id,
                            "observed payout differs from the local template"
                        );
                        let txid = template.txid();
                        self.wallet.release(&txid);
                        update
                            .released
                            .push((txid, template.outpoints().copied().collect()));
                    }
                }
                self.reserve_observed(update, &deposit_id, tx);
                tracing::info!(%deposit_id, %block, from = %transfer.status(), "payout seen in block");
                transfer.state = TransferState::SeenInBlock {
                    transaction: tx.clone(),
                    block_hash: block.hash,
                    block_height: block.height,
                };
                update.write(transfer);
            }
            status => {
                tracing::debug!(%deposit_id, %status, "payout already accounted for");
            }
        }
        Ok(())
    }

    /// Hold the inputs of an adopted payout under its own txid, so the
    /// transfer still passes the sanity check if a reorg sends it back to
    /// `FullySigned`. Outputs the wallet does not track stay unreserved.
    fn reserve_observed(&self, update: &mut Update, deposit_id: &TxHash, tx: &Transaction) {
        let txid = tx.txid();
        let outpoints: Vec<OutPoint> = tx.outpoints().copied().collect();
        if outpoints
            .iter()
            .all(|outpoint| self.wallet.reserved_by(outpoint) == Some(txid))
        {
            return;
        }
        match self.wallet.reserve(txid, &outpoints) {
            Ok(()) => update.reserved.push(txid),
            Err(e) => {
                tracing::warn!(%deposit_id, %txid, error = %e, "observed payout inputs not reserved");
            }
        }
    }

    /// Move payouts buried at least `finality_depth` blocks to `Complete`.
    fn complete_final(&self, update: &mut Update) -> Result<(), TransferError> {
        let tip_height = self.cursor()?.tip().height;
        for id in self.ids_with_status(update, TransferStatus::SeenInBlock) {
            let mut transfer = self.load_indexed(update, &id)?;
            let TransferState::SeenInBlock {
                transaction,
                block_height,
                ..
            } = &transfer.state
            else {
                continue;
            };
            if block_height.saturating_add(self.settings.finality_depth) > tip_height {
                continue;
            }
            let transaction = transaction.clone();
            update.release_after_commit.push(transaction.txid());
            tracing::info!(deposit_id = %id, block_height, "transfer complete");
            transfer.state = TransferState::Complete { transaction };
            update.write(transfer);
        }
        Ok(())
    }

    /// Undo payout-chain state beyond the common ancestor with the chased
    /// chain. Returns whether anything was rewound.
    pub fn rewind_if_required(&mut self) -> Result<bool, TransferError> {
        let tip = self.cursor()?.tip();
        if self.chain.contains(&tip) {
            return Ok(false);
        }
        let ancestor = self.find_common_ancestor()?;
        tracing::warn!(from = %tip, to = %ancestor, "rewinding transfer store");

        self.run("rewind_if_required", |store, update| {
            for id in store.ids_with_status(update, TransferStatus::SeenInBlock) {
                let mut transfer = store.load_indexed(update, &id)?;
                let TransferState::SeenInBlock {
                    transaction,
                    block_height,
                    ..
                } = &transfer.state
                else {
                    continue;
                };
                if *block_height <= ancestor.height {
                    continue;
                }
                if transfer.is_observed_only() {
                    tracing::info!(deposit_id = %id, "dropping observed-only transfer");
                    update.delete(&transfer);
                } else {
                    tracing::info!(deposit_id = %id, "payout block reorged out, back to fully signed");
                    transfer.state = TransferState::FullySigned {
                        transaction: transaction.clone(),
                    };
                    update.write(transfer);
                }
            }
            store.cursor_mut()?.locator.rewind_to(ancestor);
            Ok(true)
        })
    }

    /// The highest recorded block still on the chased chain, or genesis.
    fn find_common_ancestor(&self) -> Result<ChainTip, TransferError> {
        let cursor = self.cursor()?;
        let mut candidates: Vec<ChainTip> = cursor.locator.entries().to_vec();
        candidates.extend(
            self.indices
                .blocks()
                .map(|(hash, height)| ChainTip::new(*hash, height)),
        );
        candidates.sort_by(|a, b| b.height.cmp(&a.height));

        match candidates.into_iter().find(|c| self.chain.contains(c)) {
            Some(ancestor) => Ok(ancestor),
            None => {
                tracing::warn!("no recorded block is on the chased chain, resyncing from genesis");
                Ok(self.chain.genesis())
            }
        }
    }

    /// Rewind if needed, then apply blocks in bounded batches until the
    /// store reaches the chased tip. Returns whether it is caught up.
    pub fn synchronize(&mut self) -> Result<bool, TransferError> {
        self.rewind_if_required()?;
        loop {
            let tip = self.cursor()?.tip();
            let chase = self.chain.tip_to_chase();
            if tip.height >= chase.height {
                return Ok(self.chain.contains(&tip));
            }

            let blocks = self
                .chain
                .blocks_from(tip.height + 1, self.settings.sync_batch_size);
            if blocks.is_empty() {
                return Ok(false);
            }
            match self.process_blocks(&blocks) {
                Ok(()) => {}
                Err(TransferError::Discontinuity { .. }) => {
                    if !self.rewind_if_required()? {
                        return Ok(false);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Look up transfers, demoting any that fail the sanity check.
    pub fn get(&mut self, deposit_ids: &[TxHash]) -> Result<Vec<Option<Transfer>>, TransferError> {
        self.run("get", |store, update| {
            let mut result = Vec::with_capacity(deposit_ids.len());
            for id in deposit_ids {
                let transfer = match store.load(update, id)? {
                    Some(t) if !store.passes_sanity_check(&t) => Some(store.reject(update, t)),
                    other => other,
                };
                result.push(transfer);
            }
            Ok(result)
        })
    }

    /// Every transfer in `status`, ordered by earliest funding input.
    ///
    /// Transfers failing the sanity check are demoted on the way and left
    /// out of a `Partial` or `FullySigned` listing.
    pub fn get_by_status(
        &mut self,
        status: TransferStatus,
    ) -> Result<Vec<Transfer>, TransferError> {
        self.run("get_by_status", |store, update| {
            let ids: Vec<TxHash> = store.indices.with_status(status).iter().copied().collect();
            let mut result = Vec::with_capacity(ids.len());
            for id in ids {
                let mut transfer = store.load_indexed(update, &id)?;
                if !store.passes_sanity_check(&transfer) {
                    transfer = store.reject(update, transfer);
                }
                if transfer.status() == status {
                    result.push(transfer);
                }
            }
            result.sort_by_key(|t| {
                (
                    t.partial_transaction().and_then(Transaction::earliest_input),
                    t.deposit_id,
                )
            });
            Ok(result)
        })
    }

    /// `(deposit_id, transaction)` for every transfer in `status` that has
    /// a transaction, in [`TransferStore::get_by_status`] order.
    pub fn get_transactions_by_status(
        &mut self,
        status: TransferStatus,
    ) -> Result<Vec<(TxHash, Transaction)>, TransferError> {
        Ok(self
            .get_by_status(status)?
            .into_iter()
            .filter_map(|t| {
                let tx = t.partial_transaction()?.clone();
                Some((t.deposit_id, tx))
            })
            .collect())
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn cursor(&self) -> Result<&StoreCursor, TransferError> {
        self.cursor.as_ref().ok_or(TransferError::NotInitialized)
    }

    fn cursor_mut(&mut self) -> Result<&mut StoreCursor, TransferError> {
        self.cursor.as_mut().ok_or(TransferError::NotInitialized)
    }

    /// Read through the staged changes to storage.
    fn load(&self, update: &Update, id: &TxHash) -> Result<Option<Transfer>, TransferError> {
        match update.overlay.get(id) {
            Some(staged) => Ok(staged.clone()),
            None => Ok(self.db.get_transfer(id)?),
        }
    }

    /// Load a transfer the indices claim exists.
    fn load_indexed(&self, update: &Update, id: &TxHash) -> Result<Transfer, TransferError> {
        self.load(update, id)?.ok_or_else(|| {
            StoreError::Corruption(format!("indexed transfer {} missing from storage", id)).into()
        })
    }

    /// Ids in `status` once the staged changes are applied.
    fn ids_with_status(&self, update: &Update, status: TransferStatus) -> BTreeSet<TxHash> {
        let mut ids = self.indices.with_status(status).clone();
        for (id, change) in update.tracker.changes() {
            if change.current.map(|c| c.status) == Some(status) {
                ids.insert(*id);
            } else {
                ids.remove(id);
            }
        }
        ids
    }

    /// A `Partial` or `FullySigned` transfer must still hold the
    /// reservation on every input, and a `FullySigned` one must carry a
    /// quorum. Other statuses always pass.
    fn passes_sanity_check(&self, transfer: &Transfer) -> bool {
        let status = transfer.status();
        if !status.needs_sanity_check() {
            return true;
        }
        let Some(tx) = transfer.partial_transaction() else {
            return false;
        };
        let txid = tx.txid();
        let reserved = tx
            .outpoints()
            .all(|outpoint| self.wallet.reserved_by(outpoint) == Some(txid));
        reserved && (status != TransferStatus::FullySigned || multisig::has_quorum(tx, &self.params))
    }

    fn reject(&self, update: &mut Update, mut transfer: Transfer) -> Transfer {
        let Some(transaction) = transfer.partial_transaction().cloned() else {
            return transfer;
        };
        tracing::warn!(
            deposit_id = %transfer.deposit_id,
            from = %transfer.status(),
            "sanity check failed, transfer rejected"
        );
        update.release_after_commit.push(transaction.txid());
        transfer.state = TransferState::Rejected { transaction };
        update.write(transfer.clone());
        transfer
    }

    /// Run `body` as one atomic operation.
    fn run<T>(
        &mut self,
        operation: &'static str,
        body: impl FnOnce(&mut Self, &mut Update) -> Result<T, TransferError>,
    ) -> Result<T, TransferError> {
        let snapshot = self.cursor()?.clone();
        let mut update = Update::default();

        let outcome = match body(self, &mut update) {
            Ok(value) => self.commit(&snapshot, &update).map(|()| value),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(value) => {
                self.indices.apply(&update.tracker);
                for txid in &update.release_after_commit {
                    self.wallet.release(txid);
                }
                Ok(value)
            }
            Err(e) => {
                self.cursor = Some(snapshot);
                for txid in &update.reserved {
                    self.wallet.release(txid);
                }
                for (txid, outpoints) in &update.released {
                    if let Err(e) = self.wallet.reserve(*txid, outpoints) {
                        tracing::warn!(%txid, error = %e, "could not restore reservation");
                    }
                }
                tracing::warn!(operation, error = %e, "transfer store operation rolled back");
                Err(e)
            }
        }
    }

    fn commit(&self, snapshot: &StoreCursor, update: &Update) -> Result<(), TransferError> {
        let cursor = self.cursor()?;
        let mut batch = TransferBatch::new();
        for (id, staged) in &update.overlay {
            match staged {
                Some(transfer) => batch.put(transfer.clone()),
                None => batch.delete(*id),
            }
        }
        if cursor.locator != snapshot.locator {
            batch.set_locator(cursor.locator.clone());
        }
        if cursor.next_mature_deposit_height != snapshot.next_mature_deposit_height {
            batch.set_next_mature_height(cursor.next_mature_deposit_height);
        }
        if batch.is_empty() {
            return Ok(());
        }
        self.db.commit(&batch)?;
        tracing::trace!(
            puts = batch.puts.len(),
            deletes = batch.deletes.len(),
            "transfer store commit"
        );
        Ok(())
    }
}

/// Check a deposit batch against the next mature deposit height.
fn validate_batch(expected: u64, blocks: &[MaturedBlockDeposits]) -> Result<(), TransferError> {
    let mut seen = BTreeSet::new();
    for (offset, block) in blocks.iter().enumerate() {
        let height = expected + offset as u64;
        if block.block.height != height {
            return Err(TransferError::HeightMismatch {
                expected: height,
                actual: block.block.height,
            });
        }
        for deposit in &block.deposits {
            if deposit.block_number != height {
                return Err(TransferError::HeightMismatch {
                    expected: height,
                    actual: deposit.block_number,
                });
            }
            if deposit.block_hash != block.block.hash {
                return Err(TransferError::InvalidBatch(format!(
                    "deposit {} does not belong to block {}",
                    deposit.id, block.block.hash
                )));
            }
            if !seen.insert(deposit.id) {
                return Err(TransferError::InvalidBatch(format!(
                    "deposit {} appears twice",
                    deposit.id
                )));
            }
        }
    }
    Ok(())
}
