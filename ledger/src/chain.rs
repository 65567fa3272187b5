//! Chain-facing collaborators: block sources and deposit extraction.

use twinpeg_types::{BlockHash, ChainBlock, ChainTip, Deposit};

/// Sequential access to one chain.
///
/// For the payout chain the "tip to chase" is the best block the wallet
/// has synced to; for the source chain it is the best known block.
pub trait BlockSource: Send + Sync {
    fn genesis(&self) -> ChainTip;

    fn tip_to_chase(&self) -> ChainTip;

    /// Hash of the block at `height` on the chased chain.
    fn hash_at(&self, height: u64) -> Option<BlockHash>;

    /// Up to `max` consecutive blocks starting at `start`, ascending. Empty
    /// when nothing is available yet.
    fn blocks_from(&self, start: u64, max: usize) -> Vec<ChainBlock>;

    /// Whether `tip` is part of the chased chain.
    fn contains(&self, tip: &ChainTip) -> bool {
        tip.height <= self.tip_to_chase().height && self.hash_at(tip.height) == Some(tip.hash)
    }
}

/// Finds qualifying deposits in a source-chain block.
pub trait DepositExtractor: Send + Sync {
    fn extract_deposits(&self, block: &ChainBlock) -> Vec<Deposit>;
}
