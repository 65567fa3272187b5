//! Output scripts and the tags the bridge embeds in them.
//!
//! Address encoding is out of scope here: a script is an opaque byte string
//! compared by value. The only structure the bridge relies on is the
//! data-carrier form `OP_RETURN <push>` used for two tags:
//!
//! - on the source chain, a deposit names its payout destination with
//!   `OP_RETURN "twinpeg:target:" ++ <target script bytes>`;
//! - on the target chain, a payout names the deposit it settles with
//!   `OP_RETURN "twinpeg:deposit:" ++ <deposit id>`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::hash::TxHash;

pub const OP_RETURN: u8 = 0x6a;

/// Largest payload a single-byte push can carry.
pub const MAX_TAG_PAYLOAD: usize = 75;

pub const DEPOSIT_TAG_PREFIX: &[u8] = b"twinpeg:deposit:";
pub const TARGET_TAG_PREFIX: &[u8] = b"twinpeg:target:";

/// An output script.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Script(#[serde(with = "crate::hex::bytes")] Vec<u8>);

impl Script {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build an `OP_RETURN <data>` script. Returns `None` if `data` does not
    /// fit in a single push.
    pub fn op_return(data: &[u8]) -> Option<Self> {
        if data.len() > MAX_TAG_PAYLOAD {
            return None;
        }
        let mut bytes = Vec::with_capacity(data.len() + 2);
        bytes.push(OP_RETURN);
        bytes.push(data.len() as u8);
        bytes.extend_from_slice(data);
        Some(Self(bytes))
    }

    /// The pushed payload if this is a well-formed `OP_RETURN <data>` script.
    pub fn op_return_data(&self) -> Option<&[u8]> {
        match self.0.as_slice() {
            [OP_RETURN, len, rest @ ..] if *len as usize == rest.len() => Some(rest),
            _ => None,
        }
    }

    pub fn is_op_return(&self) -> bool {
        self.op_return_data().is_some()
    }

    /// The tag a payout carries to name the deposit it settles.
    pub fn withdrawal_tag(deposit_id: &TxHash) -> Self {
        let mut data = DEPOSIT_TAG_PREFIX.to_vec();
        data.extend_from_slice(deposit_id.as_bytes());
        Self::op_return(&data).expect("deposit tag is always below the push limit")
    }

    /// The deposit id carried by a withdrawal tag.
    pub fn deposit_id_from_tag(&self) -> Option<TxHash> {
        let payload = self.op_return_data()?.strip_prefix(DEPOSIT_TAG_PREFIX)?;
        let arr: [u8; 32] = payload.try_into().ok()?;
        Some(TxHash::new(arr))
    }

    /// The marker a deposit carries to name its payout destination.
    pub fn target_marker(target: &Script) -> Option<Self> {
        let mut data = TARGET_TAG_PREFIX.to_vec();
        data.extend_from_slice(target.as_bytes());
        Self::op_return(&data)
    }

    /// The payout destination carried by a target marker.
    pub fn target_from_marker(&self) -> Option<Script> {
        let payload = self.op_return_data()?.strip_prefix(TARGET_TAG_PREFIX)?;
        if payload.is_empty() {
            return None;
        }
        Some(Script(payload.to_vec()))
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", crate::hex::encode(&self.0))
    }
}
