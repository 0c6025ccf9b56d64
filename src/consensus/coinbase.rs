//! Coinbase reward manager
//!
//! Builds the coinbase transaction a block must carry. Every merged block
//! that the merging block newly adds to its DAA window is paid once: blues
//! to the script in their own coinbase payload, reds aggregated to the
//! merging block's miner.

use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};

use super::payload::{extract_coinbase_data_blue_score_and_subsidy, serialize_coinbase_payload, PayloadError};
use super::{
    acceptance_data_by_block, BlockAcceptanceData, CoinbaseData, GhostdagData, Params, ScriptPublicKey,
    SubnetworkId, SubsidySchedule, Transaction, TransactionOutput,
};
use crate::constants::MAX_TRANSACTION_VERSION;
use crate::crypto::address::pay_to_pubkey_script;
use crate::crypto::Hash;
use crate::storage::{
    AcceptanceDataStore, BlockStore, ConsensusStores, DaaBlocksStore, GhostdagDataStore, StagingArea, StoreError,
};

#[derive(Debug, Error)]
pub enum CoinbaseError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid coinbase payload: {0}")]
    Payload(#[from] PayloadError),

    #[error("acceptance data is expected to be of block {expected} but belongs to {got}")]
    AcceptanceBlockMismatch { expected: Hash, got: Hash },

    #[error("no acceptance data for merged block {0}")]
    MissingAcceptanceData(Hash),

    #[error("merged block {0} has no coinbase transaction")]
    MissingCoinbaseTransaction(Hash),
}

pub type CoinbaseResult<T> = Result<T, CoinbaseError>;

/// How a merged block's reward is paid out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewardPolicy {
    /// Block version 1: the whole reward goes to the miner
    Standard,
    /// Block version 2: a percentage of every reward goes to the dev fund
    DevFee {
        percent: u64,
        script_public_key: ScriptPublicKey,
    },
}

impl RewardPolicy {
    pub fn for_params(params: &Params) -> Self {
        match params.block_version {
            1 => RewardPolicy::Standard,
            _ => RewardPolicy::DevFee {
                percent: params.dev_fee_percent,
                script_public_key: pay_to_pubkey_script(&params.dev_fee_pubkey),
            },
        }
    }

    /// Split a reward into `(miner_share, dev_share)`.
    ///
    /// The dev share is computed in double precision and truncated, the
    /// same way on every node.
    pub fn split(&self, reward: u64) -> (u64, Option<u64>) {
        match self {
            RewardPolicy::Standard => (reward, None),
            RewardPolicy::DevFee { percent, .. } => {
                let dev = (*percent as f64 / 100.0 * reward as f64) as u64;
                (reward - dev.min(reward), Some(dev.min(reward)))
            }
        }
    }

    /// Outputs paying `reward` to `script_public_key`, plus the dev output.
    /// Nothing is paid when the miner's share is zero.
    fn outputs(&self, reward: u64, script_public_key: &ScriptPublicKey) -> Vec<TransactionOutput> {
        let (miner, dev) = self.split(reward);
        if miner == 0 {
            return Vec::new();
        }
        let mut outputs = vec![TransactionOutput::new(miner, script_public_key.clone())];
        if let (Some(dev), RewardPolicy::DevFee { script_public_key, .. }) = (dev, self) {
            outputs.push(TransactionOutput::new(dev, script_public_key.clone()));
        }
        outputs
    }
}

pub struct CoinbaseManager {
    genesis_hash: Hash,
    schedule: SubsidySchedule,
    policy: RewardPolicy,
    script_public_key_max_len: u8,
    ghostdag_store: Arc<dyn GhostdagDataStore>,
    acceptance_store: Arc<dyn AcceptanceDataStore>,
    daa_store: Arc<dyn DaaBlocksStore>,
    block_store: Arc<dyn BlockStore>,
}

impl CoinbaseManager {
    pub fn new(
        params: &Params,
        ghostdag_store: Arc<dyn GhostdagDataStore>,
        acceptance_store: Arc<dyn AcceptanceDataStore>,
        daa_store: Arc<dyn DaaBlocksStore>,
        block_store: Arc<dyn BlockStore>,
    ) -> Self {
        Self {
            genesis_hash: params.genesis_hash,
            schedule: SubsidySchedule::new(params),
            policy: RewardPolicy::for_params(params),
            script_public_key_max_len: params.coinbase_payload_script_public_key_max_len,
            ghostdag_store,
            acceptance_store,
            daa_store,
            block_store,
        }
    }

    /// Manager reading every store from one backend
    pub fn from_stores<S: ConsensusStores + 'static>(params: &Params, stores: Arc<S>) -> Self {
        Self::new(params, stores.clone(), stores.clone(), stores.clone(), stores)
    }

    pub fn policy(&self) -> &RewardPolicy {
        &self.policy
    }

    /// The coinbase transaction `block_hash` must carry, and whether it pays
    /// an aggregated red reward.
    pub fn expected_coinbase_transaction(
        &self,
        staging: &StagingArea,
        block_hash: &Hash,
        coinbase_data: &CoinbaseData,
    ) -> CoinbaseResult<(Transaction, bool)> {
        let ghostdag_data = self.ghostdag_data(staging, block_hash)?;
        let acceptance_data = self.acceptance_store.acceptance_data(staging, block_hash)?;
        let acceptance_map = acceptance_data_by_block(&acceptance_data);
        let daa_added_blocks: HashSet<Hash> =
            self.daa_store.daa_added_blocks(staging, block_hash)?.into_iter().collect();

        let mut outputs = Vec::with_capacity(ghostdag_data.merge_set_blues.len());
        for blue in &ghostdag_data.merge_set_blues {
            let acceptance = acceptance_map
                .get(blue)
                .copied()
                .ok_or(CoinbaseError::MissingAcceptanceData(*blue))?;
            let reward = self.calc_merged_block_reward(staging, blue, acceptance, &daa_added_blocks)?;
            if reward == 0 {
                continue;
            }
            let script_public_key = self.merged_block_script(blue, acceptance)?;
            outputs.extend(self.policy.outputs(reward, &script_public_key));
        }

        let mut total_red_reward = 0u64;
        for red in &ghostdag_data.merge_set_reds {
            let acceptance = acceptance_map
                .get(red)
                .copied()
                .ok_or(CoinbaseError::MissingAcceptanceData(*red))?;
            let reward = self.calc_merged_block_reward(staging, red, acceptance, &daa_added_blocks)?;
            total_red_reward = total_red_reward.saturating_add(reward);
        }
        let red_outputs = self.policy.outputs(total_red_reward, &coinbase_data.script_public_key);
        let has_red_reward = !red_outputs.is_empty();
        outputs.extend(red_outputs);

        let subsidy = self.calc_block_subsidy(staging, block_hash)?;
        let payload = self.serialize_coinbase_payload(ghostdag_data.blue_score, coinbase_data, subsidy)?;

        debug!(
            block = %block_hash,
            outputs = outputs.len(),
            subsidy,
            has_red_reward,
            "built expected coinbase"
        );

        let transaction = Transaction::new(
            MAX_TRANSACTION_VERSION,
            Vec::new(),
            outputs,
            0,
            SubnetworkId::COINBASE,
            0,
            payload,
        );
        Ok((transaction, has_red_reward))
    }

    /// Trusted GHOSTDAG data keeps the original, non-pruned merge set, so it
    /// wins when present.
    fn ghostdag_data(&self, staging: &StagingArea, block_hash: &Hash) -> CoinbaseResult<GhostdagData> {
        match self.ghostdag_store.ghostdag_data(staging, block_hash, true) {
            Ok(data) => Ok(data),
            Err(err) if err.is_not_found() => {
                trace!(block = %block_hash, "no trusted ghostdag data, using the regular one");
                Ok(self.ghostdag_store.ghostdag_data(staging, block_hash, false)?)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Subsidy plus accepted fees of a merged block, or zero if the merging
    /// block does not add it to its DAA window.
    pub fn calc_merged_block_reward(
        &self,
        staging: &StagingArea,
        block_hash: &Hash,
        acceptance: &BlockAcceptanceData,
        daa_added_blocks: &HashSet<Hash>,
    ) -> CoinbaseResult<u64> {
        if *block_hash != acceptance.block_hash {
            return Err(CoinbaseError::AcceptanceBlockMismatch {
                expected: *block_hash,
                got: acceptance.block_hash,
            });
        }

        if !daa_added_blocks.contains(block_hash) {
            return Ok(0);
        }

        let total_fees = acceptance.accepted_fees();

        let block = self.block_store.block(staging, block_hash)?;
        let coinbase = block
            .coinbase()
            .ok_or(CoinbaseError::MissingCoinbaseTransaction(*block_hash))?;
        let (_, _, subsidy) = self.extract_coinbase_data_blue_score_and_subsidy(coinbase)?;

        Ok(subsidy + total_fees)
    }

    /// The miner script of a merged block, read from its own coinbase payload
    fn merged_block_script(&self, block_hash: &Hash, acceptance: &BlockAcceptanceData) -> CoinbaseResult<ScriptPublicKey> {
        let coinbase = acceptance
            .transaction_acceptance_data
            .first()
            .map(|record| &record.transaction)
            .ok_or(CoinbaseError::MissingCoinbaseTransaction(*block_hash))?;
        let (_, coinbase_data, _) = self.extract_coinbase_data_blue_score_and_subsidy(coinbase)?;
        Ok(coinbase_data.script_public_key)
    }

    /// Subsidy of `block_hash`, reading its DAA score from the store
    pub fn calc_block_subsidy(&self, staging: &StagingArea, block_hash: &Hash) -> CoinbaseResult<u64> {
        if *block_hash == self.genesis_hash {
            return Ok(self.schedule.calc_block_subsidy(block_hash, 0));
        }
        let daa_score = self.daa_store.daa_score(staging, block_hash)?;
        Ok(self.schedule.calc_block_subsidy(block_hash, daa_score))
    }

    pub fn serialize_coinbase_payload(
        &self,
        blue_score: u64,
        coinbase_data: &CoinbaseData,
        subsidy: u64,
    ) -> CoinbaseResult<Vec<u8>> {
        Ok(serialize_coinbase_payload(
            blue_score,
            coinbase_data,
            subsidy,
            self.script_public_key_max_len,
        )?)
    }

    pub fn extract_coinbase_data_blue_score_and_subsidy(
        &self,
        coinbase: &Transaction,
    ) -> CoinbaseResult<(u64, CoinbaseData, u64)> {
        Ok(extract_coinbase_data_blue_score_and_subsidy(
            coinbase,
            self.script_public_key_max_len,
        )?)
    }
}
