//! Cryptographic primitives for twinpeg.
//!
//! - **Ed25519** for member signatures over payout inputs
//! - **Blake2b** for hashing (block headers, commitments)

pub mod hash;
pub mod keys;
pub mod sign;

pub use hash::{blake2b_256, blake2b_256_multi, hash_block_header};
pub use keys::keypair_from_seed;
pub use sign::{sign_input, sign_message, verify_input_signature, verify_signature};
