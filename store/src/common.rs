//! The store cursor: the persisted "Common" table contents.
//!
//! Two fixed keys live in that table: the repository tip, stored as a
//! [`BlockLocator`], and the next source-chain height expected to yield
//! matured deposits.

use serde::{Deserialize, Serialize};

use twinpeg_types::ChainTip;

pub const REPOSITORY_TIP_KEY: &[u8] = b"repository_tip";
pub const NEXT_MATURE_HEIGHT_KEY: &[u8] = b"next_mature_height";

/// Number of most recent blocks kept without gaps.
pub const DENSE_LOCATOR_ENTRIES: u64 = 16;

/// Recently processed target-chain blocks, newest first.
///
/// The newest entry is the store tip. The most recent
/// [`DENSE_LOCATOR_ENTRIES`] blocks are kept densely; older entries are
/// thinned to at most one per power-of-two distance bucket so that a
/// common ancestor can still be found after a deep reorg. The oldest entry
/// is never thinned away.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockLocator {
    entries: Vec<ChainTip>,
}

impl BlockLocator {
    /// A locator whose only entry is `tip` (typically the genesis block).
    pub fn new(tip: ChainTip) -> Self {
        Self { entries: vec![tip] }
    }

    pub fn tip(&self) -> ChainTip {
        self.entries[0]
    }

    /// Entries newest first.
    pub fn entries(&self) -> &[ChainTip] {
        &self.entries
    }

    /// Record `tip` as the new store tip.
    pub fn push(&mut self, tip: ChainTip) {
        self.entries.insert(0, tip);
        self.thin();
    }

    /// Drop every entry above `ancestor` and make it the tip.
    pub fn rewind_to(&mut self, ancestor: ChainTip) {
        self.entries.retain(|entry| entry.height < ancestor.height);
        self.entries.insert(0, ancestor);
    }

    fn thin(&mut self) {
        let tip_height = self.tip().height;
        let oldest = self.entries.len() - 1;
        let mut last_bucket = None;
        let mut kept = Vec::with_capacity(self.entries.len());
        for (i, entry) in self.entries.iter().enumerate() {
            let distance = tip_height.saturating_sub(entry.height);
            if distance < DENSE_LOCATOR_ENTRIES || i == oldest {
                kept.push(*entry);
                continue;
            }
            let bucket = u64::BITS - distance.leading_zeros();
            if last_bucket != Some(bucket) {
                kept.push(*entry);
                last_bucket = Some(bucket);
            }
        }
        self.entries = kept;
    }
}

/// Everything the store persists besides transfers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreCursor {
    pub locator: BlockLocator,
    pub next_mature_deposit_height: u64,
}

impl StoreCursor {
    pub fn new(genesis: ChainTip, first_mature_height: u64) -> Self {
        Self {
            locator: BlockLocator::new(genesis),
            next_mature_deposit_height: first_mature_height,
        }
    }

    pub fn tip(&self) -> ChainTip {
        self.locator.tip()
    }
}
