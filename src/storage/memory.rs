//! In-memory stores
//!
//! Used by tests and by nodes that do not need to survive a restart.

use parking_lot::RwLock;
use std::collections::HashMap;

use super::stores::*;
use crate::consensus::{AcceptanceData, Block, GhostdagData};
use crate::crypto::Hash;

#[derive(Debug, Default)]
pub struct MemoryStores {
    ghostdag_data: RwLock<HashMap<Hash, GhostdagData>>,
    trusted_ghostdag_data: RwLock<HashMap<Hash, GhostdagData>>,
    acceptance_data: RwLock<HashMap<Hash, AcceptanceData>>,
    daa_scores: RwLock<HashMap<Hash, u64>>,
    daa_added_blocks: RwLock<HashMap<Hash, Vec<Hash>>>,
    blocks: RwLock<HashMap<Hash, Block>>,
    tip: RwLock<Option<Hash>>,
}

impl MemoryStores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.read().len()
    }
}

impl TipStore for MemoryStores {
    fn tip(&self) -> StoreResult<Option<Hash>> {
        Ok(*self.tip.read())
    }

    fn set_tip(&self, tip: &Hash) -> StoreResult<()> {
        *self.tip.write() = Some(*tip);
        Ok(())
    }
}

impl GhostdagDataStore for MemoryStores {
    fn get_committed_ghostdag_data(&self, hash: &Hash, is_trusted: bool) -> StoreResult<GhostdagData> {
        let (map, store) = if is_trusted {
            (&self.trusted_ghostdag_data, TRUSTED_GHOSTDAG_STORE)
        } else {
            (&self.ghostdag_data, GHOSTDAG_STORE)
        };
        map.read()
            .get(hash)
            .cloned()
            .ok_or_else(|| StoreError::not_found(store, hash))
    }

    fn insert_ghostdag_data(&self, hash: Hash, data: GhostdagData, is_trusted: bool) -> StoreResult<()> {
        let map = if is_trusted {
            &self.trusted_ghostdag_data
        } else {
            &self.ghostdag_data
        };
        map.write().insert(hash, data);
        Ok(())
    }
}

impl AcceptanceDataStore for MemoryStores {
    fn get_committed_acceptance_data(&self, hash: &Hash) -> StoreResult<AcceptanceData> {
        self.acceptance_data
            .read()
            .get(hash)
            .cloned()
            .ok_or_else(|| StoreError::not_found(ACCEPTANCE_STORE, hash))
    }

    fn insert_acceptance_data(&self, hash: Hash, data: AcceptanceData) -> StoreResult<()> {
        self.acceptance_data.write().insert(hash, data);
        Ok(())
    }
}

impl DaaBlocksStore for MemoryStores {
    fn get_committed_daa_score(&self, hash: &Hash) -> StoreResult<u64> {
        self.daa_scores
            .read()
            .get(hash)
            .copied()
            .ok_or_else(|| StoreError::not_found(DAA_SCORE_STORE, hash))
    }

    fn get_committed_daa_added_blocks(&self, hash: &Hash) -> StoreResult<Vec<Hash>> {
        self.daa_added_blocks
            .read()
            .get(hash)
            .cloned()
            .ok_or_else(|| StoreError::not_found(DAA_ADDED_STORE, hash))
    }

    fn insert_daa_data(&self, hash: Hash, daa_score: u64, daa_added_blocks: Vec<Hash>) -> StoreResult<()> {
        self.daa_scores.write().insert(hash, daa_score);
        self.daa_added_blocks.write().insert(hash, daa_added_blocks);
        Ok(())
    }
}

impl BlockStore for MemoryStores {
    fn get_committed_block(&self, hash: &Hash) -> StoreResult<Block> {
        self.blocks
            .read()
            .get(hash)
            .cloned()
            .ok_or_else(|| StoreError::not_found(BLOCK_STORE, hash))
    }

    fn insert_block(&self, block: Block) -> StoreResult<()> {
        self.blocks.write().insert(block.hash(), block);
        Ok(())
    }
}
