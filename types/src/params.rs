//! Federation multisig parameters.

use serde::{Deserialize, Serialize};

use crate::error::TypesError;
use crate::keys::PublicKey;

/// The M-of-N federation: its members and the signature quorum.
///
/// Members are kept sorted and deduplicated so every node derives the same
/// ordering from the same key set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisigParams {
    members: Vec<PublicKey>,
    quorum: usize,
}

impl MultisigParams {
    pub fn new(mut members: Vec<PublicKey>, quorum: usize) -> Result<Self, TypesError> {
        members.sort();
        members.dedup();
        if members.is_empty() {
            return Err(TypesError::InvalidMultisig("no federation members".into()));
        }
        if quorum == 0 || quorum > members.len() {
            return Err(TypesError::InvalidMultisig(format!(
                "quorum {} out of range for {} members",
                quorum,
                members.len()
            )));
        }
        Ok(Self { members, quorum })
    }

    /// Members in lexicographic key order.
    pub fn members(&self) -> &[PublicKey] {
        &self.members
    }

    pub fn quorum(&self) -> usize {
        self.quorum
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn is_member(&self, key: &PublicKey) -> bool {
        self.members.binary_search(key).is_ok()
    }

    /// Position of `key` in the ordered member list.
    pub fn position(&self, key: &PublicKey) -> Option<usize> {
        self.members.binary_search(key).ok()
    }
}
