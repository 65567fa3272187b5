//! Nullable wallet: an in-memory multisig UTXO set with real signing.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use twinpeg_crypto::{keypair_from_seed, sign_input};
use twinpeg_ledger::{WalletError, WalletManager, WalletUtxo};
use twinpeg_types::{Amount, KeyPair, OutPoint, PublicKey, Script, Transaction, TxHash};

#[derive(Default)]
struct WalletState {
    utxos: BTreeMap<OutPoint, Amount>,
    reservations: BTreeMap<OutPoint, TxHash>,
}

/// One member's view of the federation wallet.
///
/// Signatures are real Ed25519 signatures by the member key, so quorum
/// checks behave exactly as in production.
pub struct NullWallet {
    keypair: KeyPair,
    multisig_script: Script,
    state: Mutex<WalletState>,
    refuse_signing: AtomicBool,
}

impl NullWallet {
    pub fn new(keypair: KeyPair, multisig_script: Script) -> Self {
        Self {
            keypair,
            multisig_script,
            state: Mutex::new(WalletState::default()),
            refuse_signing: AtomicBool::new(false),
        }
    }

    /// A wallet whose member key derives from `[seed; 32]`.
    pub fn from_seed(seed: u8, multisig_script: Script) -> Self {
        Self::new(keypair_from_seed(&[seed; 32]), multisig_script)
    }

    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    pub fn add_utxo(&self, outpoint: OutPoint, value: Amount) {
        self.state.lock().unwrap().utxos.insert(outpoint, value);
    }

    /// Forget a reservation without the store's knowledge.
    pub fn drop_reservation(&self, outpoint: &OutPoint) {
        self.state.lock().unwrap().reservations.remove(outpoint);
    }

    pub fn reservation_count(&self) -> usize {
        self.state.lock().unwrap().reservations.len()
    }

    /// Make every later `sign_transaction` call fail.
    pub fn refuse_signing(&self, refuse: bool) {
        self.refuse_signing.store(refuse, Ordering::SeqCst);
    }
}

impl WalletManager for NullWallet {
    fn multisig_script(&self) -> Script {
        self.multisig_script.clone()
    }

    fn local_member(&self) -> PublicKey {
        self.keypair.public.clone()
    }

    fn spendable_outputs(&self) -> Vec<WalletUtxo> {
        let state = self.state.lock().unwrap();
        state
            .utxos
            .iter()
            .filter(|(outpoint, _)| !state.reservations.contains_key(outpoint))
            .map(|(outpoint, value)| WalletUtxo {
                outpoint: *outpoint,
                value: *value,
            })
            .collect()
    }

    fn reserve(&self, txid: TxHash, outpoints: &[OutPoint]) -> Result<(), WalletError> {
        let mut state = self.state.lock().unwrap();
        for outpoint in outpoints {
            if !state.utxos.contains_key(outpoint) {
                return Err(WalletError::UnknownOutput(*outpoint));
            }
            match state.reservations.get(outpoint) {
                Some(owner) if *owner != txid => {
                    return Err(WalletError::AlreadyReserved {
                        outpoint: *outpoint,
                        owner: *owner,
                    })
                }
                _ => {}
            }
        }
        for outpoint in outpoints {
            state.reservations.insert(*outpoint, txid);
        }
        Ok(())
    }

    fn release(&self, txid: &TxHash) {
        self.state
            .lock()
            .unwrap()
            .reservations
            .retain(|_, owner| owner != txid);
    }

    fn reserved_by(&self, outpoint: &OutPoint) -> Option<TxHash> {
        self.state.lock().unwrap().reservations.get(outpoint).copied()
    }

    fn sign_transaction(&self, tx: &Transaction) -> Result<Transaction, WalletError> {
        if self.refuse_signing.load(Ordering::SeqCst) {
            return Err(WalletError::Signing("signing disabled".into()));
        }
        {
            let state = self.state.lock().unwrap();
            if let Some(unknown) = tx.outpoints().find(|o| !state.utxos.contains_key(o)) {
                return Err(WalletError::UnknownOutput(*unknown));
            }
        }
        let mut signed = tx.clone();
        for (index, input) in signed.inputs.iter_mut().enumerate() {
            if input.signatures.iter().any(|s| s.signer == self.keypair.public) {
                continue;
            }
            input.signatures.push(sign_input(tx, index, &self.keypair));
        }
        Ok(signed)
    }
}
