//! Block templates
//!
//! A template is a fully assembled candidate block on top of the tip, plus
//! the staged consensus data needed to accept it once a nonce is found.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::trace;

use super::MiningResult;
use crate::consensus::{Block, BlockHeader, CoinbaseData, Transaction};
use crate::crypto::{calculate_hash_merkle_root, calculate_id_merkle_root};
use crate::pow::State;
use crate::storage::{ChainState, ConsensusStores, TipStore, VirtualBlock, VIRTUAL_HASH};

/// Candidate block and the staged data it was built from
#[derive(Debug, Clone)]
pub struct BlockTemplate {
    pub block: Block,
    pub virtual_block: VirtualBlock,
    /// Whether the coinbase pays aggregated red rewards
    pub has_red_reward: bool,
}

/// Current time in milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}

/// Assemble a candidate block on top of the chain tip.
///
/// The coinbase comes first and is exactly the one the reward manager
/// expects for the staged merge set; `transactions` follow it.
pub fn build_block_template<S: ConsensusStores + TipStore + 'static>(
    chain: &ChainState<S>,
    coinbase_data: &CoinbaseData,
    transactions: Vec<Transaction>,
    timestamp: i64,
) -> MiningResult<BlockTemplate> {
    let virtual_block = chain.stage_virtual()?;
    let (coinbase, has_red_reward) =
        chain
            .coinbase_manager()
            .expected_coinbase_transaction(&virtual_block.staging, &VIRTUAL_HASH, coinbase_data)?;

    let mut all_txs = Vec::with_capacity(transactions.len() + 1);
    all_txs.push(coinbase);
    all_txs.extend(transactions);

    let mut header = BlockHeader::new(
        chain.params().block_version,
        vec![virtual_block.parent],
        calculate_hash_merkle_root(&all_txs),
        timestamp,
        virtual_block.bits,
        0, // nonce is set by the miner
    );
    header.accepted_id_merkle_root = calculate_id_merkle_root(&virtual_block.accepted);
    header.daa_score = virtual_block.daa_score;
    header.blue_score = virtual_block.ghostdag_data.blue_score;
    header.blue_work = virtual_block.ghostdag_data.blue_work;
    header.pruning_point = chain.params().genesis_hash;

    trace!(parent = %virtual_block.parent, daa_score = header.daa_score, "built block template");

    Ok(BlockTemplate {
        block: Block::new(header, all_txs),
        virtual_block,
        has_red_reward,
    })
}

/// The template miners currently work on
pub struct TemplateManager {
    current: Mutex<Option<(Arc<BlockTemplate>, State)>>,
    generation: AtomicU64,
}

impl TemplateManager {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Replace the current template; returns its generation
    pub fn set(&self, template: BlockTemplate, state: State) -> u64 {
        let mut current = self.current.lock();
        *current = Some((Arc::new(template), state));
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// A copy of the current template and its proof-of-work state, so a
    /// worker can change the nonce without affecting anyone else.
    pub fn get(&self) -> Option<(Arc<BlockTemplate>, State, u64)> {
        let current = self.current.lock();
        current
            .as_ref()
            .map(|(template, state)| (template.clone(), state.clone(), self.generation.load(Ordering::SeqCst)))
    }

    /// Bumped on every `set`; zero until the first template arrives
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        *self.current.lock() = None;
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for TemplateManager {
    fn default() -> Self {
        Self::new()
    }
}
