//! Member key derivation.

use ed25519_dalek::SigningKey;
use twinpeg_types::{KeyPair, PrivateKey, PublicKey};

/// The member key pair behind a 32-byte seed. The same seed always yields
/// the same keys.
pub fn keypair_from_seed(seed: &[u8; 32]) -> KeyPair {
    let signing_key = SigningKey::from_bytes(seed);
    KeyPair {
        public: PublicKey(signing_key.verifying_key().to_bytes()),
        private: PrivateKey(signing_key.to_bytes()),
    }
}
