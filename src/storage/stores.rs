//! Store contracts consumed by the reward manager
//!
//! Every read goes through a [`StagingArea`] first: data staged for a block
//! that is still being built or validated shadows whatever is committed.
//! A missing entry is always reported as [`StoreError::NotFound`] so callers
//! can branch on it.

use std::collections::HashMap;
use thiserror::Error;

use crate::consensus::{AcceptanceData, Block, GhostdagData};
use crate::crypto::Hash;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{store}: key {key} not found")]
    NotFound { store: &'static str, key: Hash },

    #[error("database error: {0}")]
    Db(#[from] sled::Error),

    #[error("failed to decode stored value: {0}")]
    Codec(#[from] bincode::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub(crate) fn not_found(store: &'static str, key: &Hash) -> Self {
        StoreError::NotFound { store, key: *key }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

pub const GHOSTDAG_STORE: &str = "ghostdag-data";
pub const TRUSTED_GHOSTDAG_STORE: &str = "trusted-ghostdag-data";
pub const ACCEPTANCE_STORE: &str = "acceptance-data";
pub const DAA_SCORE_STORE: &str = "daa-scores";
pub const DAA_ADDED_STORE: &str = "daa-added-blocks";
pub const BLOCK_STORE: &str = "blocks";

/// Writes for one unit of work that are not committed yet
#[derive(Debug, Default, Clone)]
pub struct StagingArea {
    ghostdag_data: HashMap<Hash, GhostdagData>,
    trusted_ghostdag_data: HashMap<Hash, GhostdagData>,
    acceptance_data: HashMap<Hash, AcceptanceData>,
    daa_scores: HashMap<Hash, u64>,
    daa_added_blocks: HashMap<Hash, Vec<Hash>>,
    blocks: HashMap<Hash, Block>,
}

impl StagingArea {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage_ghostdag_data(&mut self, hash: Hash, data: GhostdagData, is_trusted: bool) {
        if is_trusted {
            self.trusted_ghostdag_data.insert(hash, data);
        } else {
            self.ghostdag_data.insert(hash, data);
        }
    }

    pub fn stage_acceptance_data(&mut self, hash: Hash, data: AcceptanceData) {
        self.acceptance_data.insert(hash, data);
    }

    pub fn stage_daa_data(&mut self, hash: Hash, daa_score: u64, daa_added_blocks: Vec<Hash>) {
        self.daa_scores.insert(hash, daa_score);
        self.daa_added_blocks.insert(hash, daa_added_blocks);
    }

    pub fn stage_block(&mut self, block: Block) {
        self.blocks.insert(block.hash(), block);
    }

    pub fn is_empty(&self) -> bool {
        self.ghostdag_data.is_empty()
            && self.trusted_ghostdag_data.is_empty()
            && self.acceptance_data.is_empty()
            && self.daa_scores.is_empty()
            && self.daa_added_blocks.is_empty()
            && self.blocks.is_empty()
    }

    /// Move everything staged under `from` to `to`.
    /// Blocks are keyed by their own hash and are left alone.
    pub fn rekey(&mut self, from: &Hash, to: Hash) {
        fn move_entry<V>(map: &mut HashMap<Hash, V>, from: &Hash, to: Hash) {
            if let Some(value) = map.remove(from) {
                map.insert(to, value);
            }
        }
        move_entry(&mut self.ghostdag_data, from, to);
        move_entry(&mut self.trusted_ghostdag_data, from, to);
        move_entry(&mut self.acceptance_data, from, to);
        move_entry(&mut self.daa_scores, from, to);
        move_entry(&mut self.daa_added_blocks, from, to);
    }

    /// Write every staged entry to `stores`, leaving the area empty
    pub fn commit<S: ConsensusStores + ?Sized>(&mut self, stores: &S) -> StoreResult<()> {
        for (hash, data) in self.ghostdag_data.drain() {
            stores.insert_ghostdag_data(hash, data, false)?;
        }
        for (hash, data) in self.trusted_ghostdag_data.drain() {
            stores.insert_ghostdag_data(hash, data, true)?;
        }
        for (hash, data) in self.acceptance_data.drain() {
            stores.insert_acceptance_data(hash, data)?;
        }
        for (hash, score) in self.daa_scores.drain() {
            let added = self.daa_added_blocks.remove(&hash).unwrap_or_default();
            stores.insert_daa_data(hash, score, added)?;
        }
        self.daa_added_blocks.clear();
        for (_, block) in self.blocks.drain() {
            stores.insert_block(block)?;
        }
        Ok(())
    }
}

/// GHOSTDAG data per block, in a trusted and a non-trusted variant
pub trait GhostdagDataStore: Send + Sync {
    fn get_committed_ghostdag_data(&self, hash: &Hash, is_trusted: bool) -> StoreResult<GhostdagData>;

    fn insert_ghostdag_data(&self, hash: Hash, data: GhostdagData, is_trusted: bool) -> StoreResult<()>;

    fn ghostdag_data(&self, staging: &StagingArea, hash: &Hash, is_trusted: bool) -> StoreResult<GhostdagData> {
        let staged = if is_trusted {
            staging.trusted_ghostdag_data.get(hash)
        } else {
            staging.ghostdag_data.get(hash)
        };
        match staged {
            Some(data) => Ok(data.clone()),
            None => self.get_committed_ghostdag_data(hash, is_trusted),
        }
    }
}

/// Acceptance data per block
pub trait AcceptanceDataStore: Send + Sync {
    fn get_committed_acceptance_data(&self, hash: &Hash) -> StoreResult<AcceptanceData>;

    fn insert_acceptance_data(&self, hash: Hash, data: AcceptanceData) -> StoreResult<()>;

    fn acceptance_data(&self, staging: &StagingArea, hash: &Hash) -> StoreResult<AcceptanceData> {
        match staging.acceptance_data.get(hash) {
            Some(data) => Ok(data.clone()),
            None => self.get_committed_acceptance_data(hash),
        }
    }
}

/// DAA score and DAA-added blocks per block
pub trait DaaBlocksStore: Send + Sync {
    fn get_committed_daa_score(&self, hash: &Hash) -> StoreResult<u64>;

    fn get_committed_daa_added_blocks(&self, hash: &Hash) -> StoreResult<Vec<Hash>>;

    fn insert_daa_data(&self, hash: Hash, daa_score: u64, daa_added_blocks: Vec<Hash>) -> StoreResult<()>;

    fn daa_score(&self, staging: &StagingArea, hash: &Hash) -> StoreResult<u64> {
        match staging.daa_scores.get(hash) {
            Some(score) => Ok(*score),
            None => self.get_committed_daa_score(hash),
        }
    }

    fn daa_added_blocks(&self, staging: &StagingArea, hash: &Hash) -> StoreResult<Vec<Hash>> {
        match staging.daa_added_blocks.get(hash) {
            Some(added) => Ok(added.clone()),
            None => self.get_committed_daa_added_blocks(hash),
        }
    }
}

/// Full blocks by hash
pub trait BlockStore: Send + Sync {
    fn get_committed_block(&self, hash: &Hash) -> StoreResult<Block>;

    fn insert_block(&self, block: Block) -> StoreResult<()>;

    fn block(&self, staging: &StagingArea, hash: &Hash) -> StoreResult<Block> {
        match staging.blocks.get(hash) {
            Some(block) => Ok(block.clone()),
            None => self.get_committed_block(hash),
        }
    }
}

/// Selected tip of the local chain
pub trait TipStore: Send + Sync {
    fn tip(&self) -> StoreResult<Option<Hash>>;

    fn set_tip(&self, tip: &Hash) -> StoreResult<()>;
}

/// Every store the consensus core reads
pub trait ConsensusStores: GhostdagDataStore + AcceptanceDataStore + DaaBlocksStore + BlockStore {}

impl<T: GhostdagDataStore + AcceptanceDataStore + DaaBlocksStore + BlockStore + ?Sized> ConsensusStores for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStores;

    #[test]
    fn test_staged_data_shadows_committed() {
        let stores = MemoryStores::new();
        let hash = Hash::from_u64_word(1);
        stores.insert_daa_data(hash, 10, vec![]).unwrap();

        let mut staging = StagingArea::new();
        assert_eq!(stores.daa_score(&staging, &hash).unwrap(), 10);

        staging.stage_daa_data(hash, 11, vec![hash]);
        assert_eq!(stores.daa_score(&staging, &hash).unwrap(), 11);
        assert_eq!(stores.daa_added_blocks(&staging, &hash).unwrap(), vec![hash]);
        assert_eq!(stores.daa_score(&StagingArea::new(), &hash).unwrap(), 10);
    }

    #[test]
    fn test_trusted_and_untrusted_are_separate() {
        let stores = MemoryStores::new();
        let hash = Hash::from_u64_word(2);
        let mut staging = StagingArea::new();
        staging.stage_ghostdag_data(hash, GhostdagData::default(), false);

        assert!(stores.ghostdag_data(&staging, &hash, false).is_ok());
        let err = stores.ghostdag_data(&staging, &hash, true).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_rekey_and_commit() {
        let stores = MemoryStores::new();
        let from = Hash::from_u64_word(3);
        let to = Hash::from_u64_word(4);

        let mut staging = StagingArea::new();
        staging.stage_daa_data(from, 5, vec![from]);
        staging.stage_acceptance_data(from, vec![]);
        staging.rekey(&from, to);
        staging.commit(&stores).unwrap();
        assert!(staging.is_empty());

        let empty = StagingArea::new();
        assert_eq!(stores.daa_score(&empty, &to).unwrap(), 5);
        assert_eq!(stores.daa_added_blocks(&empty, &to).unwrap(), vec![from]);
        assert!(stores.acceptance_data(&empty, &to).unwrap().is_empty());
        assert!(stores.daa_score(&empty, &from).unwrap_err().is_not_found());
    }
}
