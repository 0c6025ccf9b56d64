//! Chain state management
//!
//! Drives a single selected-parent chain on top of the consensus stores.
//! Every new block merges exactly the current tip: its GHOSTDAG data,
//! DAA data and acceptance data are staged under [`VIRTUAL_HASH`] while
//! the block is built and mined, then re-keyed to the real block hash and
//! committed once the block validates.

use num_traits::ToPrimitive;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use super::stores::*;
use crate::consensus::{
    calc_work, validate_block, AcceptanceData, Block, BlockAcceptanceData, CoinbaseManager, GhostdagData, Params,
    Transaction, TransactionAcceptanceData, ValidationError,
};
use crate::crypto::{Hash, HASH_SIZE};
use crate::node::genesis_block;
use crate::pow::PowContext;

/// Key of the block being built on top of the tip
pub const VIRTUAL_HASH: Hash = Hash::from_bytes([0xff; HASH_SIZE]);

#[derive(Debug, Error)]
pub enum ChainError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("block rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error("block {block} does not extend the tip {tip}")]
    NotOnTip { block: Hash, tip: Hash },

    #[error("block {block} has bits {got:#010x}, expected {expected:#010x}")]
    UnexpectedBits { block: Hash, expected: u32, got: u32 },
}

pub type ChainResult<T> = Result<T, ChainError>;

/// Consensus data of the next block, staged under [`VIRTUAL_HASH`]
#[derive(Debug, Clone)]
pub struct VirtualBlock {
    pub staging: StagingArea,
    pub parent: Hash,
    pub bits: u32,
    pub daa_score: u64,
    pub ghostdag_data: GhostdagData,
    /// Transactions the next block accepts: those of the tip
    pub accepted: Vec<Transaction>,
}

/// Current state of the local chain
pub struct ChainState<S> {
    params: Params,
    stores: Arc<S>,
    coinbase_manager: CoinbaseManager,
    tip: Hash,
    tip_ghostdag_data: GhostdagData,
    tip_daa_score: u64,
}

impl<S: ConsensusStores + TipStore + 'static> ChainState<S> {
    /// Resume from the stored tip, or commit genesis into empty stores
    pub fn open(params: Params, stores: Arc<S>) -> ChainResult<Self> {
        let tip = match stores.tip()? {
            Some(tip) => {
                info!(tip = %tip, "resuming chain from stored tip");
                tip
            }
            None => commit_genesis(&params, stores.as_ref())?,
        };

        let committed = StagingArea::new();
        let tip_ghostdag_data = stores.ghostdag_data(&committed, &tip, false)?;
        let tip_daa_score = stores.daa_score(&committed, &tip)?;
        let coinbase_manager = CoinbaseManager::from_stores(&params, stores.clone());

        Ok(Self {
            params,
            stores,
            coinbase_manager,
            tip,
            tip_ghostdag_data,
            tip_daa_score,
        })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn stores(&self) -> &Arc<S> {
        &self.stores
    }

    pub fn coinbase_manager(&self) -> &CoinbaseManager {
        &self.coinbase_manager
    }

    pub fn tip(&self) -> Hash {
        self.tip
    }

    pub fn tip_blue_score(&self) -> u64 {
        self.tip_ghostdag_data.blue_score
    }

    pub fn tip_daa_score(&self) -> u64 {
        self.tip_daa_score
    }

    /// Stage the consensus data of a block merging the tip
    pub fn stage_virtual(&self) -> ChainResult<VirtualBlock> {
        let tip_block = self.stores.block(&StagingArea::new(), &self.tip)?;
        let bits = self.params.genesis_bits;

        let work = calc_work(bits).to_u128().unwrap_or(u128::MAX);
        let ghostdag_data = GhostdagData::new(
            self.tip_ghostdag_data.blue_score + 1,
            self.tip_ghostdag_data.blue_work.saturating_add(work),
            self.tip,
            vec![self.tip],
            Vec::new(),
        );
        let daa_score = self.tip_daa_score + 1;

        let accepted = tip_block.transactions;
        let acceptance: AcceptanceData = vec![BlockAcceptanceData {
            block_hash: self.tip,
            transaction_acceptance_data: accepted
                .iter()
                .cloned()
                .map(|transaction| TransactionAcceptanceData {
                    transaction,
                    fee: 0,
                    is_accepted: true,
                })
                .collect(),
        }];

        let mut staging = StagingArea::new();
        staging.stage_ghostdag_data(VIRTUAL_HASH, ghostdag_data.clone(), false);
        staging.stage_daa_data(VIRTUAL_HASH, daa_score, vec![self.tip]);
        staging.stage_acceptance_data(VIRTUAL_HASH, acceptance);

        Ok(VirtualBlock {
            staging,
            parent: self.tip,
            bits,
            daa_score,
            ghostdag_data,
            accepted,
        })
    }

    /// Validate a block built from `virtual_block` and make it the new tip
    pub fn accept_block(
        &mut self,
        block: Block,
        mut virtual_block: VirtualBlock,
        context: &Arc<PowContext>,
    ) -> ChainResult<Hash> {
        let hash = block.hash();
        if virtual_block.parent != self.tip || block.header.direct_parents() != [self.tip].as_slice() {
            return Err(ChainError::NotOnTip { block: hash, tip: self.tip });
        }
        if block.header.bits != virtual_block.bits {
            return Err(ChainError::UnexpectedBits {
                block: hash,
                expected: virtual_block.bits,
                got: block.header.bits,
            });
        }

        virtual_block.staging.rekey(&VIRTUAL_HASH, hash);
        validate_block(
            &block,
            &self.params,
            context,
            &self.coinbase_manager,
            &virtual_block.staging,
            &virtual_block.accepted,
        )?;

        virtual_block.staging.stage_block(block);
        virtual_block.staging.commit(self.stores.as_ref())?;
        self.stores.set_tip(&hash)?;

        self.tip = hash;
        self.tip_ghostdag_data = virtual_block.ghostdag_data;
        self.tip_daa_score = virtual_block.daa_score;
        debug!(block = %hash, blue_score = self.tip_blue_score(), "new tip");
        Ok(hash)
    }

    /// Get statistics about the chain state
    pub fn get_stats(&self) -> ChainStats {
        ChainStats {
            tip_hash: self.tip,
            blue_score: self.tip_ghostdag_data.blue_score,
            daa_score: self.tip_daa_score,
            blue_work: self.tip_ghostdag_data.blue_work,
        }
    }
}

fn commit_genesis<S: ConsensusStores + TipStore>(params: &Params, stores: &S) -> ChainResult<Hash> {
    let genesis = genesis_block(params.network);
    let hash = genesis.hash();

    let mut staging = StagingArea::new();
    staging.stage_ghostdag_data(hash, GhostdagData::new(0, 0, Hash::zero(), Vec::new(), Vec::new()), false);
    staging.stage_daa_data(hash, 0, Vec::new());
    staging.stage_acceptance_data(hash, Vec::new());
    staging.stage_block(genesis);
    staging.commit(stores)?;
    stores.set_tip(&hash)?;

    info!(genesis = %hash, network = %params.network, "genesis committed");
    Ok(hash)
}

/// Statistics about the chain state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStats {
    pub tip_hash: Hash,
    pub blue_score: u64,
    pub daa_score: u64,
    pub blue_work: u128,
}
