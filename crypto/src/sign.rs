//! Ed25519 message signing and verification.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use twinpeg_types::{InputSignature, KeyPair, PrivateKey, PublicKey, Signature, Transaction};

/// Sign a message with a private key, returning the signature.
pub fn sign_message(message: &[u8], private_key: &PrivateKey) -> Signature {
    let signing_key = SigningKey::from_bytes(&private_key.0);
    let sig = signing_key.sign(message);
    Signature(sig.to_bytes())
}

/// Verify a signature against a message and public key.
///
/// Returns `true` if the signature is valid, `false` otherwise.
/// Also rejects non-canonical signatures (malleability protection).
pub fn verify_signature(message: &[u8], signature: &Signature, public_key: &PublicKey) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(&public_key.0) else {
        return false;
    };
    let dalek_sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    verifying_key.verify(message, &dalek_sig).is_ok()
}

/// Sign input `index` of `tx`.
pub fn sign_input(tx: &Transaction, index: usize, keypair: &KeyPair) -> InputSignature {
    InputSignature {
        signer: keypair.public.clone(),
        signature: sign_message(&tx.sighash(index), &keypair.private),
    }
}

/// Verify that `signature` authorizes spending input `index` of `tx`.
pub fn verify_input_signature(tx: &Transaction, index: usize, signature: &InputSignature) -> bool {
    index < tx.inputs.len()
        && verify_signature(&tx.sighash(index), &signature.signature, &signature.signer)
}
