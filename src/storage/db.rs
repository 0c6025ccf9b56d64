//! Database persistence layer using Sled
//!
//! One tree per store; values are bincode, keys are the 32 hash bytes.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::{Db, Tree};
use std::path::Path;

use super::stores::*;
use crate::consensus::{AcceptanceData, Block, GhostdagData};
use crate::crypto::Hash;

const TIP_KEY: &str = "tip_hash";

/// Sled-backed stores
#[derive(Debug, Clone)]
pub struct DbStores {
    db: Db,
    ghostdag_tree: Tree,
    trusted_ghostdag_tree: Tree,
    acceptance_tree: Tree,
    daa_score_tree: Tree,
    daa_added_tree: Tree,
    blocks_tree: Tree,
    metadata_tree: Tree,
}

impl DbStores {
    /// Open or create the database
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Ok(Self {
            ghostdag_tree: db.open_tree(GHOSTDAG_STORE)?,
            trusted_ghostdag_tree: db.open_tree(TRUSTED_GHOSTDAG_STORE)?,
            acceptance_tree: db.open_tree(ACCEPTANCE_STORE)?,
            daa_score_tree: db.open_tree(DAA_SCORE_STORE)?,
            daa_added_tree: db.open_tree(DAA_ADDED_STORE)?,
            blocks_tree: db.open_tree(BLOCK_STORE)?,
            metadata_tree: db.open_tree("metadata")?,
            db,
        })
    }

    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

fn get<T: DeserializeOwned>(tree: &Tree, store: &'static str, hash: &Hash) -> StoreResult<T> {
    match tree.get(hash.0)? {
        Some(bytes) => Ok(bincode::deserialize(&bytes)?),
        None => Err(StoreError::not_found(store, hash)),
    }
}

fn put<T: Serialize>(tree: &Tree, hash: &Hash, value: &T) -> StoreResult<()> {
    let bytes = bincode::serialize(value)?;
    tree.insert(hash.0, bytes)?;
    Ok(())
}

impl TipStore for DbStores {
    fn tip(&self) -> StoreResult<Option<Hash>> {
        Ok(self.metadata_tree.get(TIP_KEY)?.and_then(|bytes| {
            let arr: [u8; 32] = bytes.as_ref().try_into().ok()?;
            Some(Hash(arr))
        }))
    }

    /// Flushes, so the tip never points past what is on disk
    fn set_tip(&self, tip: &Hash) -> StoreResult<()> {
        self.metadata_tree.insert(TIP_KEY, tip.0.as_ref())?;
        self.flush()
    }
}

impl GhostdagDataStore for DbStores {
    fn get_committed_ghostdag_data(&self, hash: &Hash, is_trusted: bool) -> StoreResult<GhostdagData> {
        if is_trusted {
            get(&self.trusted_ghostdag_tree, TRUSTED_GHOSTDAG_STORE, hash)
        } else {
            get(&self.ghostdag_tree, GHOSTDAG_STORE, hash)
        }
    }

    fn insert_ghostdag_data(&self, hash: Hash, data: GhostdagData, is_trusted: bool) -> StoreResult<()> {
        let tree = if is_trusted {
            &self.trusted_ghostdag_tree
        } else {
            &self.ghostdag_tree
        };
        put(tree, &hash, &data)
    }
}

impl AcceptanceDataStore for DbStores {
    fn get_committed_acceptance_data(&self, hash: &Hash) -> StoreResult<AcceptanceData> {
        get(&self.acceptance_tree, ACCEPTANCE_STORE, hash)
    }

    fn insert_acceptance_data(&self, hash: Hash, data: AcceptanceData) -> StoreResult<()> {
        put(&self.acceptance_tree, &hash, &data)
    }
}

impl DaaBlocksStore for DbStores {
    fn get_committed_daa_score(&self, hash: &Hash) -> StoreResult<u64> {
        get(&self.daa_score_tree, DAA_SCORE_STORE, hash)
    }

    fn get_committed_daa_added_blocks(&self, hash: &Hash) -> StoreResult<Vec<Hash>> {
        get(&self.daa_added_tree, DAA_ADDED_STORE, hash)
    }

    fn insert_daa_data(&self, hash: Hash, daa_score: u64, daa_added_blocks: Vec<Hash>) -> StoreResult<()> {
        put(&self.daa_score_tree, &hash, &daa_score)?;
        put(&self.daa_added_tree, &hash, &daa_added_blocks)
    }
}

impl BlockStore for DbStores {
    fn get_committed_block(&self, hash: &Hash) -> StoreResult<Block> {
        get(&self.blocks_tree, BLOCK_STORE, hash)
    }

    fn insert_block(&self, block: Block) -> StoreResult<()> {
        put(&self.blocks_tree, &block.hash(), &block)
    }
}
