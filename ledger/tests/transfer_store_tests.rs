//! Transfer store behavior over nullable collaborators: deposit batches,
//! signature merging, payout-chain processing, reorgs and restarts.

use std::sync::Arc;

use proptest::prelude::*;

use twinpeg_crypto::{keypair_from_seed, sign_input};
use twinpeg_ledger::{
    ErrorKind, MaturedBlocksProvider, StoreSettings, TaggedDepositExtractor, TransferError,
    TransferStore, WalletManager,
};
use twinpeg_nullables::{NullChain, NullTransferDb, NullWallet};
use twinpeg_store::{Transfer, TransferStatus};
use twinpeg_store_lmdb::LmdbEnvironment;
use twinpeg_types::{
    Amount, BlockHash, ChainBlock, ChainTip, Deposit, KeyPair, MaturedBlockDeposits,
    MultisigParams, OutPoint, Script, Transaction, TxHash, TxIn, TxOut,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn multisig_script() -> Script {
    Script::new(vec![0xbb])
}

fn target() -> Script {
    Script::new(vec![0xaa])
}

fn outpoint(byte: u8) -> OutPoint {
    OutPoint::new(TxHash::new([byte; 32]), 0)
}

fn deposit_id(byte: u8) -> TxHash {
    TxHash::new([byte; 32])
}

fn source_hash(height: u64) -> BlockHash {
    BlockHash::new([height as u8; 32])
}

/// A deposit of `amount`; its block fields are filled in by `Harness::record`.
fn deposit(byte: u8, amount: u64) -> Deposit {
    Deposit {
        id: deposit_id(byte),
        amount: Amount::new(amount),
        target_address: target(),
        block_number: 0,
        block_hash: BlockHash::ZERO,
    }
}

struct Harness {
    db: Arc<NullTransferDb>,
    wallet: Arc<NullWallet>,
    chain: Arc<NullChain>,
    keys: Vec<KeyPair>,
    store: TransferStore,
}

impl Harness {
    /// Local member seed 1 of three, quorum two, one 50-unit output.
    fn new() -> Self {
        let harness = Self::unfunded();
        harness.wallet.add_utxo(outpoint(0xf0), Amount::new(50));
        harness
    }

    fn unfunded() -> Self {
        let keys: Vec<KeyPair> = (1u8..=3).map(|i| keypair_from_seed(&[i; 32])).collect();
        let params = MultisigParams::new(keys.iter().map(|k| k.public.clone()).collect(), 2).unwrap();
        let db = Arc::new(NullTransferDb::new());
        let wallet = Arc::new(NullWallet::from_seed(1, multisig_script()));
        let chain = Arc::new(NullChain::new("target"));
        let mut store = TransferStore::new(
            db.clone(),
            wallet.clone(),
            chain.clone(),
            params,
            StoreSettings::default(),
        );
        store.initialize().unwrap();
        Self {
            db,
            wallet,
            chain,
            keys,
            store,
        }
    }

    /// Record one matured block at the next expected height.
    fn record(&mut self, deposits: Vec<Deposit>) -> Result<(), TransferError> {
        let height = self.store.next_mature_deposit_height().unwrap();
        let deposits = deposits
            .into_iter()
            .map(|d| Deposit {
                block_number: height,
                block_hash: source_hash(height),
                ..d
            })
            .collect();
        self.store.record_latest_mature_deposits(&[MaturedBlockDeposits {
            block: ChainTip::new(source_hash(height), height),
            deposits,
        }])
    }

    fn transfer(&mut self, byte: u8) -> Option<Transfer> {
        self.store.get(&[deposit_id(byte)]).unwrap().remove(0)
    }

    fn status(&mut self, byte: u8) -> Option<TransferStatus> {
        self.transfer(byte).map(|t| t.status())
    }

    fn template(&mut self, byte: u8) -> Transaction {
        self.transfer(byte)
            .and_then(|t| t.partial_transaction().cloned())
            .unwrap()
    }

    /// `tx` with a signature by member `member` on every input.
    fn co_sign(&self, tx: &Transaction, member: usize) -> Transaction {
        let mut signed = tx.clone();
        for (index, input) in signed.inputs.iter_mut().enumerate() {
            input.signatures.push(sign_input(tx, index, &self.keys[member]));
        }
        signed
    }

    /// Record deposit `byte` and bring it to `FullySigned`.
    fn fully_signed(&mut self, byte: u8) -> Transaction {
        self.record(vec![deposit(byte, 10)]).unwrap();
        let template = self.template(byte);
        let status = self
            .store
            .merge_transaction_signatures(deposit_id(byte), &[self.co_sign(&template, 1)])
            .unwrap();
        assert_eq!(status, TransferStatus::FullySigned);
        self.template(byte)
    }

    /// A quorum-signed payout for a deposit this store never recorded.
    fn foreign_payout(&self, byte: u8) -> Transaction {
        let unsigned = Transaction {
            inputs: vec![TxIn::unsigned(outpoint(0xee))],
            outputs: vec![
                TxOut::new(Amount::new(5), target()),
                TxOut::new(Amount::ZERO, Script::withdrawal_tag(&deposit_id(byte))),
            ],
        };
        let signed = self.co_sign(&unsigned, 1);
        self.co_sign(&signed, 2)
    }
}

// ---------------------------------------------------------------------------
// 1. Recording deposits
// ---------------------------------------------------------------------------

#[test]
fn deposit_batch_builds_signed_template() {
    let mut h = Harness::new();
    h.record(vec![deposit(1, 10)]).unwrap();

    assert_eq!(h.status(1), Some(TransferStatus::Partial));
    assert_eq!(h.store.next_mature_deposit_height().unwrap(), 2);

    let template = h.template(1);
    assert_eq!(template.deposit_id(), Some(deposit_id(1)));
    assert_eq!(template.outputs[0], TxOut::new(Amount::new(10), target()));
    assert_eq!(template.signature_count(), 1);
    assert_eq!(h.wallet.reserved_by(&outpoint(0xf0)), Some(template.txid()));
}

#[test]
fn contiguous_batches_advance_height() {
    let mut h = Harness::new();
    let batch: Vec<MaturedBlockDeposits> = (1..=3)
        .map(|height| MaturedBlockDeposits {
            block: ChainTip::new(source_hash(height), height),
            deposits: vec![],
        })
        .collect();
    h.store.record_latest_mature_deposits(&batch).unwrap();
    assert_eq!(h.store.next_mature_deposit_height().unwrap(), 4);

    let commits = h.db.commit_count();
    let skipped = [MaturedBlockDeposits {
        block: ChainTip::new(source_hash(5), 5),
        deposits: vec![],
    }];
    let err = h.store.record_latest_mature_deposits(&skipped).unwrap_err();
    assert!(matches!(err, TransferError::HeightMismatch { expected: 4, actual: 5 }));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(h.store.next_mature_deposit_height().unwrap(), 4);
    assert_eq!(h.db.commit_count(), commits);
}

#[test]
fn failed_commit_leaves_state_untouched() {
    let mut h = Harness::new();
    h.db.fail_next_commit();

    let err = h.record(vec![deposit(1, 10)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert!(h.db.snapshot().is_empty());
    assert_eq!(h.store.next_mature_deposit_height().unwrap(), 1);
    assert_eq!(h.wallet.reservation_count(), 0);
    assert!(h.store.get_by_status(TransferStatus::Partial).unwrap().is_empty());

    h.record(vec![deposit(1, 10)]).unwrap();
    assert_eq!(h.status(1), Some(TransferStatus::Partial));
    assert_eq!(h.store.next_mature_deposit_height().unwrap(), 2);
}

#[test]
fn unfunded_deposit_suspended_until_funds_arrive() {
    let mut h = Harness::unfunded();
    h.record(vec![deposit(1, 10)]).unwrap();
    h.record(vec![deposit(2, 10)]).unwrap();
    assert_eq!(h.status(1), Some(TransferStatus::Suspended));
    assert_eq!(h.status(2), Some(TransferStatus::Suspended));

    h.wallet.add_utxo(outpoint(0xf0), Amount::new(10));
    h.store.record_latest_mature_deposits(&[]).unwrap();

    // The older deposit is funded first.
    assert_eq!(h.status(1), Some(TransferStatus::Partial));
    assert_eq!(h.status(2), Some(TransferStatus::Suspended));
    assert_eq!(h.store.next_mature_deposit_height().unwrap(), 3);
}

#[test]
fn duplicate_deposit_recorded_once() {
    let mut h = Harness::new();
    h.record(vec![deposit(1, 10)]).unwrap();
    let template = h.template(1);

    h.record(vec![deposit(1, 10)]).unwrap();
    assert_eq!(h.template(1), template);
    assert_eq!(h.db.snapshot().len(), 1);
}

#[test]
fn uninitialized_store_refuses_work() {
    let wallet = Arc::new(NullWallet::from_seed(1, multisig_script()));
    let params = MultisigParams::new(vec![wallet.keypair().public.clone()], 1).unwrap();
    let mut store = TransferStore::new(
        Arc::new(NullTransferDb::new()),
        wallet,
        Arc::new(NullChain::new("target")),
        params,
        StoreSettings::default(),
    );
    assert!(!store.is_initialized());
    assert!(matches!(
        store.record_latest_mature_deposits(&[]),
        Err(TransferError::NotInitialized)
    ));
    assert!(matches!(
        store.get_by_status(TransferStatus::Partial),
        Err(TransferError::NotInitialized)
    ));
}

// ---------------------------------------------------------------------------
// 2. Signatures
// ---------------------------------------------------------------------------

#[test]
fn quorum_makes_transfer_fully_signed() {
    let mut h = Harness::new();
    let payout = h.fully_signed(1);
    assert_eq!(payout.signature_count(), 2);
    assert_eq!(h.status(1), Some(TransferStatus::FullySigned));

    // A third signature is still merged in.
    let third = h.co_sign(&payout.without_signatures(), 2);
    h.store
        .merge_transaction_signatures(deposit_id(1), &[third])
        .unwrap();
    assert_eq!(h.template(1).signature_count(), 3);
}

#[test]
fn candidates_with_other_structure_ignored() {
    let mut h = Harness::new();
    h.record(vec![deposit(1, 10)]).unwrap();
    let template = h.template(1);

    let mut altered = template.without_signatures();
    altered.outputs[0].value = Amount::new(9);
    let altered = h.co_sign(&altered, 1);

    let status = h
        .store
        .merge_transaction_signatures(deposit_id(1), &[altered])
        .unwrap();
    assert_eq!(status, TransferStatus::Partial);
    assert_eq!(h.template(1), template);
}

#[test]
fn merging_unknown_deposit_fails() {
    let mut h = Harness::new();
    let err = h
        .store
        .merge_transaction_signatures(deposit_id(9), &[])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn lost_reservation_rejects_for_good() {
    let mut h = Harness::new();
    h.record(vec![deposit(1, 10)]).unwrap();
    let template = h.template(1);

    h.wallet.drop_reservation(&outpoint(0xf0));
    assert_eq!(h.status(1), Some(TransferStatus::Rejected));
    assert!(h.store.get_by_status(TransferStatus::Partial).unwrap().is_empty());

    let err = h
        .store
        .merge_transaction_signatures(deposit_id(1), &[h.co_sign(&template, 1)])
        .unwrap_err();
    assert!(matches!(
        err,
        TransferError::InvalidStatus { status: TransferStatus::Rejected, .. }
    ));

    // Even the payout showing up on chain does not revive it.
    let payout = h.co_sign(&template, 1);
    h.chain.push_block(vec![payout]);
    h.store.synchronize().unwrap();
    assert_eq!(h.status(1), Some(TransferStatus::Rejected));
    assert_eq!(
        h.store.get_by_status(TransferStatus::Rejected).unwrap().len(),
        1
    );
}

// ---------------------------------------------------------------------------
// 3. Payout chain
// ---------------------------------------------------------------------------

#[test]
fn payout_seen_then_complete_after_finality() {
    let mut h = Harness::new();
    let payout = h.fully_signed(1);

    let block = h.chain.push_block(vec![payout]);
    h.chain.push_empty_blocks(11);
    assert!(h.store.synchronize().unwrap());

    let transfer = h.transfer(1).unwrap();
    assert_eq!(transfer.status(), TransferStatus::SeenInBlock);
    assert_eq!(transfer.block_hash(), Some(block.hash));
    assert_eq!(transfer.block_height(), Some(1));
    assert_eq!(h.wallet.reservation_count(), 1);

    h.chain.push_empty_blocks(1);
    assert!(h.store.synchronize().unwrap());
    assert_eq!(h.status(1), Some(TransferStatus::Complete));
    assert_eq!(h.wallet.reservation_count(), 0);
    assert_eq!(h.store.tip_hash_and_height().unwrap(), h.chain.tip());
}

#[test]
fn reorg_rewinds_seen_payout_to_fully_signed() {
    let mut h = Harness::new();
    let payout = h.fully_signed(1);

    h.chain.push_empty_blocks(9);
    h.chain.push_block(vec![payout]);
    h.chain.push_empty_blocks(2);
    assert!(h.store.synchronize().unwrap());
    assert_eq!(h.transfer(1).unwrap().block_height(), Some(10));

    h.chain.fork_at(9);
    h.chain.push_empty_blocks(4);
    assert!(h.store.rewind_if_required().unwrap());
    assert_eq!(h.store.tip_hash_and_height().unwrap().height, 9);
    assert_eq!(h.status(1), Some(TransferStatus::FullySigned));

    assert!(h.store.synchronize().unwrap());
    assert_eq!(h.store.tip_hash_and_height().unwrap(), h.chain.tip());
    assert_eq!(h.status(1), Some(TransferStatus::FullySigned));
    assert!(!h.store.rewind_if_required().unwrap());
}

#[test]
fn chase_tip_behind_store_rewinds_every_later_payout() {
    let mut h = Harness::unfunded();
    for byte in [0xf1, 0xf2, 0xf3] {
        h.wallet.add_utxo(outpoint(byte), Amount::new(10));
    }
    let payouts: Vec<Transaction> = (1..=3).map(|byte| h.fully_signed(byte)).collect();

    h.chain.push_empty_blocks(9);
    for payout in payouts {
        h.chain.push_block(vec![payout]);
    }
    assert!(h.store.synchronize().unwrap());
    for (byte, height) in [(1, 10), (2, 11), (3, 12)] {
        assert_eq!(h.transfer(byte).unwrap().block_height(), Some(height));
    }

    h.chain.set_chase_limit(Some(9));
    assert!(h.store.rewind_if_required().unwrap());
    let ninth = h.chain.block_at(9).unwrap().tip();
    assert_eq!(h.store.tip_hash_and_height().unwrap(), ninth);
    for byte in 1..=3 {
        assert_eq!(h.status(byte), Some(TransferStatus::FullySigned));
    }
    assert_eq!(h.wallet.reservation_count(), 3);
}

#[test]
fn observed_only_transfer_dropped_on_reorg() {
    let mut h = Harness::new();
    h.chain.push_empty_blocks(4);
    h.chain.push_block(vec![h.foreign_payout(7)]);
    h.store.synchronize().unwrap();

    let observed = h.transfer(7).unwrap();
    assert_eq!(observed.status(), TransferStatus::SeenInBlock);
    assert!(observed.is_observed_only());
    assert_eq!(observed.deposit_amount, Amount::new(5));

    h.chain.fork_at(4);
    h.chain.push_empty_blocks(2);
    h.store.synchronize().unwrap();
    assert_eq!(h.transfer(7), None);
    assert!(h.db.snapshot().is_empty());
}

#[test]
fn matured_deposit_joins_observed_payout() {
    let mut h = Harness::new();
    h.chain.push_block(vec![h.foreign_payout(7)]);
    h.store.synchronize().unwrap();

    h.record(vec![deposit(7, 10)]).unwrap();
    let transfer = h.transfer(7).unwrap();
    assert_eq!(transfer.status(), TransferStatus::SeenInBlock);
    assert_eq!(transfer.deposit_height, Some(1));
    assert!(!transfer.is_observed_only());
    assert_eq!(h.wallet.reservation_count(), 0);
}

#[test]
fn joined_payout_survives_reorg_and_is_seen_again() {
    let mut h = Harness::new();
    h.wallet.add_utxo(outpoint(0xee), Amount::new(5));
    let payout = h.foreign_payout(7);
    h.chain.push_empty_blocks(4);
    h.chain.push_block(vec![payout.clone()]);
    h.store.synchronize().unwrap();

    h.record(vec![deposit(7, 10)]).unwrap();
    assert_eq!(h.wallet.reserved_by(&outpoint(0xee)), Some(payout.txid()));

    h.chain.fork_at(4);
    h.chain.push_empty_blocks(1);
    assert!(h.store.rewind_if_required().unwrap());
    assert_eq!(h.status(7), Some(TransferStatus::FullySigned));

    h.chain.push_block(vec![payout]);
    assert!(h.store.synchronize().unwrap());
    let transfer = h.transfer(7).unwrap();
    assert_eq!(transfer.status(), TransferStatus::SeenInBlock);
    assert_eq!(transfer.block_height(), Some(6));
}

#[test]
fn diverging_payout_takes_over_template_reservation() {
    let mut h = Harness::new();
    h.record(vec![deposit(1, 10)]).unwrap();
    let template = h.template(1);

    let mut diverging = template.without_signatures();
    diverging.outputs[0].value = Amount::new(9);
    let diverging = h.co_sign(&h.co_sign(&diverging, 1), 2);
    h.chain.push_block(vec![diverging.clone()]);
    h.store.synchronize().unwrap();
    assert_eq!(h.status(1), Some(TransferStatus::SeenInBlock));
    assert_eq!(h.wallet.reserved_by(&outpoint(0xf0)), Some(diverging.txid()));
    assert_eq!(h.wallet.reservation_count(), 1);

    h.chain.fork_at(0);
    h.chain.push_empty_blocks(1);
    assert!(h.store.rewind_if_required().unwrap());
    let transfer = h.transfer(1).unwrap();
    assert_eq!(transfer.status(), TransferStatus::FullySigned);
    assert_eq!(transfer.partial_transaction(), Some(&diverging));
}

#[test]
fn failed_commit_restores_template_reservation() {
    let mut h = Harness::new();
    h.record(vec![deposit(1, 10)]).unwrap();
    let template = h.template(1);

    let mut diverging = template.without_signatures();
    diverging.outputs[0].value = Amount::new(9);
    let diverging = h.co_sign(&h.co_sign(&diverging, 1), 2);
    h.chain.push_block(vec![diverging]);

    h.db.fail_next_commit();
    assert!(h.store.synchronize().is_err());
    assert_eq!(h.wallet.reserved_by(&outpoint(0xf0)), Some(template.txid()));
    assert_eq!(h.status(1), Some(TransferStatus::Partial));
}

#[test]
fn unsigned_tagged_transaction_not_a_payout() {
    let mut h = Harness::new();
    h.record(vec![deposit(1, 10)]).unwrap();
    let template = h.template(1);

    h.chain.push_block(vec![template]);
    h.store.synchronize().unwrap();
    assert_eq!(h.status(1), Some(TransferStatus::Partial));
}

#[test]
fn discontinuous_blocks_rejected() {
    let mut h = Harness::new();
    let stray = ChainBlock {
        hash: BlockHash::new([0x77; 32]),
        previous: BlockHash::new([0x66; 32]),
        height: 1,
        transactions: vec![],
    };
    let before = h.store.tip_hash_and_height().unwrap();
    assert!(matches!(
        h.store.process_blocks(&[stray]),
        Err(TransferError::Discontinuity { height: 1, .. })
    ));
    assert_eq!(h.store.tip_hash_and_height().unwrap(), before);
}

#[test]
fn synchronize_stops_at_chase_limit() {
    let mut h = Harness::new();
    h.chain.push_empty_blocks(5);
    h.chain.set_chase_limit(Some(3));
    assert!(h.store.synchronize().unwrap());
    assert_eq!(h.store.tip_hash_and_height().unwrap().height, 3);

    h.chain.set_chase_limit(None);
    assert!(h.store.synchronize().unwrap());
    assert_eq!(h.store.tip_hash_and_height().unwrap().height, 5);
}

// ---------------------------------------------------------------------------
// 4. Queries
// ---------------------------------------------------------------------------

#[test]
fn listing_ordered_by_earliest_input() {
    let mut h = Harness::unfunded();
    h.wallet.add_utxo(outpoint(0x01), Amount::new(10));
    h.wallet.add_utxo(outpoint(0x02), Amount::new(10));

    // Deposit 0xd2 comes first in the block and takes the lower outpoint.
    h.record(vec![deposit(0xd2, 10), deposit(0xd1, 10)]).unwrap();

    let listed: Vec<TxHash> = h
        .store
        .get_by_status(TransferStatus::Partial)
        .unwrap()
        .iter()
        .map(|t| t.deposit_id)
        .collect();
    assert_eq!(listed, vec![deposit_id(0xd2), deposit_id(0xd1)]);

    let counts = h.store.status_counts().unwrap();
    assert!(counts.contains(&(TransferStatus::Partial, 2)));
    assert!(counts.contains(&(TransferStatus::Complete, 0)));

    let txs = h
        .store
        .get_transactions_by_status(TransferStatus::Partial)
        .unwrap();
    assert_eq!(txs[0].1.earliest_input(), Some(outpoint(0x01)));
}

#[test]
fn get_preserves_request_order_and_misses() {
    let mut h = Harness::new();
    h.record(vec![deposit(1, 10)]).unwrap();
    let found = h.store.get(&[deposit_id(9), deposit_id(1)]).unwrap();
    assert_eq!(found.len(), 2);
    assert!(found[0].is_none());
    assert_eq!(found[1].as_ref().map(|t| t.deposit_id), Some(deposit_id(1)));
}

// ---------------------------------------------------------------------------
// 5. Persistence
// ---------------------------------------------------------------------------

#[test]
fn lmdb_store_survives_restart() {
    let dir = tempfile::tempdir().expect("temp dir");
    let wallet = Arc::new(NullWallet::from_seed(1, multisig_script()));
    wallet.add_utxo(outpoint(0xf0), Amount::new(50));
    let chain = Arc::new(NullChain::new("target"));
    chain.push_empty_blocks(3);
    let params = MultisigParams::new(
        (1u8..=3)
            .map(|i| keypair_from_seed(&[i; 32]).public)
            .collect(),
        2,
    )
    .unwrap();

    let open = || {
        let env = LmdbEnvironment::open(dir.path(), 16 * 1024 * 1024).expect("open env");
        let mut store = TransferStore::new(
            Arc::new(env),
            wallet.clone(),
            chain.clone(),
            params.clone(),
            StoreSettings::default(),
        );
        store.initialize().unwrap();
        store
    };

    let template = {
        let mut store = open();
        store
            .record_latest_mature_deposits(&[MaturedBlockDeposits {
                block: ChainTip::new(source_hash(1), 1),
                deposits: vec![Deposit {
                    block_number: 1,
                    block_hash: source_hash(1),
                    ..deposit(1, 10)
                }],
            }])
            .unwrap();
        store.synchronize().unwrap();
        let transfer = store.get(&[deposit_id(1)]).unwrap().remove(0).unwrap();
        transfer.partial_transaction().cloned().unwrap()
    };

    let mut store = open();
    assert_eq!(store.next_mature_deposit_height().unwrap(), 2);
    assert_eq!(store.tip_hash_and_height().unwrap(), chain.tip());
    let listed = store.get_by_status(TransferStatus::Partial).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].partial_transaction(), Some(&template));
}

// ---------------------------------------------------------------------------
// 6. Matured blocks
// ---------------------------------------------------------------------------

fn deposit_tx(value: u64, salt: u8) -> Transaction {
    Transaction {
        inputs: vec![TxIn::unsigned(outpoint(salt))],
        outputs: vec![
            TxOut::new(Amount::new(value), multisig_script()),
            TxOut::new(Amount::ZERO, Script::target_marker(&target()).unwrap()),
        ],
    }
}

#[test]
fn matured_blocks_respect_confirmations() {
    let source = Arc::new(NullChain::new("source"));
    source.push_empty_blocks(1);
    let tx = deposit_tx(10, 0x31);
    source.push_block(vec![tx.clone()]);
    source.push_empty_blocks(3);

    let provider = MaturedBlocksProvider::new(
        source.clone(),
        Arc::new(TaggedDepositExtractor::new(multisig_script(), Amount::new(1))),
        3,
    );
    assert_eq!(provider.matured_height(), Some(3));

    let matured = provider.get_matured_block_deposits(1, 10);
    let heights: Vec<u64> = matured.iter().map(|m| m.block.height).collect();
    assert_eq!(heights, vec![1, 2, 3]);
    assert!(matured[0].deposits.is_empty());
    assert_eq!(matured[1].deposits.len(), 1);
    assert_eq!(matured[1].deposits[0].id, tx.txid());
    assert_eq!(matured[1].deposits[0].block_hash, matured[1].block.hash);

    assert_eq!(provider.get_matured_block_deposits(2, 1).len(), 1);
    assert!(provider.get_matured_block_deposits(4, 10).is_empty());
}

#[test]
fn matured_batches_feed_the_store() {
    let source = Arc::new(NullChain::new("source"));
    source.push_block(vec![deposit_tx(10, 0x31)]);
    source.push_empty_blocks(5);
    let provider = MaturedBlocksProvider::new(
        source,
        Arc::new(TaggedDepositExtractor::new(multisig_script(), Amount::new(1))),
        2,
    );

    let mut h = Harness::new();
    let first = provider.get_matured_block_deposits(1, 2);
    h.store.record_latest_mature_deposits(&first).unwrap();
    let rest = provider.get_matured_block_deposits(h.store.next_mature_deposit_height().unwrap(), 10);
    h.store.record_latest_mature_deposits(&rest).unwrap();

    assert_eq!(h.store.next_mature_deposit_height().unwrap(), 6);
    assert_eq!(
        h.store.get_by_status(TransferStatus::Partial).unwrap().len(),
        1
    );
}

// ---------------------------------------------------------------------------
// 7. Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Merging the same candidates in any order, split over any number of
    /// calls, yields the same stored transaction.
    #[test]
    fn merge_independent_of_order_and_batching(
        order in Just(vec![0usize, 1, 1, 2, 2, 0]).prop_shuffle(),
        split in 0usize..=6,
    ) {
        let mut reference = Harness::new();
        reference.record(vec![deposit(1, 10)]).unwrap();
        let template = reference.template(1);
        let all = vec![
            reference.co_sign(&template, 1),
            reference.co_sign(&template, 2),
            template.clone(),
        ];
        reference.store.merge_transaction_signatures(deposit_id(1), &all).unwrap();
        let expected = reference.template(1);

        let mut h = Harness::new();
        h.record(vec![deposit(1, 10)]).unwrap();
        prop_assert_eq!(&h.template(1), &template);
        let ordered: Vec<Transaction> = order.iter().map(|i| all[*i].clone()).collect();
        let (head, tail) = ordered.split_at(split);
        h.store.merge_transaction_signatures(deposit_id(1), head).unwrap();
        let status = h.store.merge_transaction_signatures(deposit_id(1), tail).unwrap();

        prop_assert_eq!(status, TransferStatus::FullySigned);
        prop_assert_eq!(h.template(1), expected);
    }
}
