//! Nullable chain: an in-memory block source that can be extended and
//! reorganized at will.

use std::sync::Mutex;

use twinpeg_crypto::hash_block_header;
use twinpeg_ledger::BlockSource;
use twinpeg_types::{BlockHash, ChainBlock, ChainTip, Transaction};

struct ChainState {
    /// Index equals height; entry 0 is genesis.
    blocks: Vec<ChainBlock>,
    /// Mixed into block hashes so a fork never reuses the hashes it replaced.
    fork_salt: u64,
    /// Caps what the chain reports as its tip, simulating a lagging sync.
    chase_limit: Option<u64>,
}

pub struct NullChain {
    state: Mutex<ChainState>,
}

impl NullChain {
    /// A chain holding only its genesis block. Different labels yield
    /// different genesis hashes.
    pub fn new(label: &str) -> Self {
        let genesis = ChainBlock {
            hash: hash_block_header(&BlockHash::ZERO, 0, label.as_bytes()),
            previous: BlockHash::ZERO,
            height: 0,
            transactions: Vec::new(),
        };
        Self {
            state: Mutex::new(ChainState {
                blocks: vec![genesis],
                fork_salt: 0,
                chase_limit: None,
            }),
        }
    }

    /// Append a block confirming `transactions` and return its position.
    pub fn push_block(&self, transactions: Vec<Transaction>) -> ChainTip {
        let mut state = self.state.lock().unwrap();
        let parent = state.blocks[state.blocks.len() - 1].tip();
        let height = parent.height + 1;

        let mut payload = state.fork_salt.to_le_bytes().to_vec();
        for tx in &transactions {
            payload.extend_from_slice(tx.txid().as_bytes());
        }
        let block = ChainBlock {
            hash: hash_block_header(&parent.hash, height, &payload),
            previous: parent.hash,
            height,
            transactions,
        };
        let tip = block.tip();
        state.blocks.push(block);
        tip
    }

    /// Append `count` empty blocks and return the new tip.
    pub fn push_empty_blocks(&self, count: u64) -> ChainTip {
        let mut tip = self.tip();
        for _ in 0..count {
            tip = self.push_block(Vec::new());
        }
        tip
    }

    /// Drop every block above `height`. Blocks pushed afterwards form a
    /// competing branch with fresh hashes.
    pub fn fork_at(&self, height: u64) {
        let mut state = self.state.lock().unwrap();
        state.blocks.truncate(height as usize + 1);
        state.fork_salt += 1;
    }

    /// Report at most `height` as the tip to chase. `None` lifts the cap.
    pub fn set_chase_limit(&self, height: Option<u64>) {
        self.state.lock().unwrap().chase_limit = height;
    }

    /// The real tip, ignoring any chase limit.
    pub fn tip(&self) -> ChainTip {
        let state = self.state.lock().unwrap();
        state.blocks[state.blocks.len() - 1].tip()
    }

    pub fn block_at(&self, height: u64) -> Option<ChainBlock> {
        self.state
            .lock()
            .unwrap()
            .blocks
            .get(height as usize)
            .cloned()
    }
}

impl ChainState {
    fn chase_height(&self) -> u64 {
        let top = (self.blocks.len() - 1) as u64;
        self.chase_limit.map_or(top, |limit| limit.min(top))
    }
}

impl BlockSource for NullChain {
    fn genesis(&self) -> ChainTip {
        self.state.lock().unwrap().blocks[0].tip()
    }

    fn tip_to_chase(&self) -> ChainTip {
        let state = self.state.lock().unwrap();
        state.blocks[state.chase_height() as usize].tip()
    }

    fn hash_at(&self, height: u64) -> Option<BlockHash> {
        let state = self.state.lock().unwrap();
        if height > state.chase_height() {
            return None;
        }
        state.blocks.get(height as usize).map(|b| b.hash)
    }

    fn blocks_from(&self, start: u64, max: usize) -> Vec<ChainBlock> {
        let state = self.state.lock().unwrap();
        let end = state.chase_height();
        if start > end {
            return Vec::new();
        }
        state.blocks[start as usize..=end as usize]
            .iter()
            .take(max)
            .cloned()
            .collect()
    }
}
