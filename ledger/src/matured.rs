//! Serving matured source-chain blocks with their deposits.

use std::sync::Arc;

use twinpeg_types::MaturedBlockDeposits;

use crate::chain::{BlockSource, DepositExtractor};

/// Reads the source chain and reports deposits from blocks that have
/// reached `min_confirmations`.
pub struct MaturedBlocksProvider {
    source: Arc<dyn BlockSource>,
    extractor: Arc<dyn DepositExtractor>,
    min_confirmations: u64,
}

impl MaturedBlocksProvider {
    pub fn new(
        source: Arc<dyn BlockSource>,
        extractor: Arc<dyn DepositExtractor>,
        min_confirmations: u64,
    ) -> Self {
        Self {
            source,
            extractor,
            min_confirmations,
        }
    }

    /// Height of the newest block with enough confirmations, if any. A block
    /// at the tip has one confirmation.
    pub fn matured_height(&self) -> Option<u64> {
        let tip = self.source.tip_to_chase();
        (tip.height + 1).checked_sub(self.min_confirmations.max(1))
    }

    /// Up to `max_blocks` matured blocks starting at `start_height`, each
    /// with its (possibly empty) deposit list.
    pub fn get_matured_block_deposits(
        &self,
        start_height: u64,
        max_blocks: usize,
    ) -> Vec<MaturedBlockDeposits> {
        let Some(matured) = self.matured_height() else {
            return Vec::new();
        };
        if start_height > matured || max_blocks == 0 {
            return Vec::new();
        }
        let available = usize::try_from(matured - start_height + 1).unwrap_or(usize::MAX);
        let blocks = self
            .source
            .blocks_from(start_height, max_blocks.min(available));

        let mut result = Vec::with_capacity(blocks.len());
        let mut expected = start_height;
        for block in blocks {
            if block.height != expected || block.height > matured {
                break;
            }
            result.push(MaturedBlockDeposits {
                block: block.tip(),
                deposits: self.extractor.extract_deposits(&block),
            });
            expected += 1;
        }
        tracing::debug!(
            start_height,
            returned = result.len(),
            matured_height = matured,
            "served matured block deposits"
        );
        result
    }
}
