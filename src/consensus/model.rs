//! Per-block consensus data consumed by the reward manager
//!
//! GHOSTDAG data and acceptance data are produced by the DAG processor and
//! read back through the stores; they are immutable once written.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{ScriptPublicKey, Transaction};
use crate::crypto::Hash;

/// GHOSTDAG classification of a block's merge set
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GhostdagData {
    pub blue_score: u64,
    pub blue_work: u128,
    pub selected_parent: Hash,
    /// Merge-set blues in GHOSTDAG order; the order is consensus-relevant
    pub merge_set_blues: Vec<Hash>,
    pub merge_set_reds: Vec<Hash>,
}

impl GhostdagData {
    pub fn new(
        blue_score: u64,
        blue_work: u128,
        selected_parent: Hash,
        merge_set_blues: Vec<Hash>,
        merge_set_reds: Vec<Hash>,
    ) -> Self {
        Self {
            blue_score,
            blue_work,
            selected_parent,
            merge_set_blues,
            merge_set_reds,
        }
    }
}

/// Acceptance record of one transaction of a merged block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionAcceptanceData {
    pub transaction: Transaction,
    pub fee: u64,
    pub is_accepted: bool,
}

/// Acceptance of every transaction of one merged block.
/// The first record is always the merged block's coinbase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockAcceptanceData {
    pub block_hash: Hash,
    pub transaction_acceptance_data: Vec<TransactionAcceptanceData>,
}

impl BlockAcceptanceData {
    /// Sum of the fees of accepted transactions
    pub fn accepted_fees(&self) -> u64 {
        self.transaction_acceptance_data
            .iter()
            .filter(|tx| tx.is_accepted)
            .map(|tx| tx.fee)
            .sum()
    }
}

/// Acceptance data of a block: one entry per merged block, in merge order
pub type AcceptanceData = Vec<BlockAcceptanceData>;

/// Index acceptance data by merged block hash
pub fn acceptance_data_by_block(acceptance_data: &AcceptanceData) -> HashMap<Hash, &BlockAcceptanceData> {
    acceptance_data
        .iter()
        .map(|data| (data.block_hash, data))
        .collect()
}

/// Miner-supplied data recorded in the coinbase payload
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CoinbaseData {
    pub script_public_key: ScriptPublicKey,
    pub extra_data: Vec<u8>,
}

impl CoinbaseData {
    pub fn new(script_public_key: ScriptPublicKey, extra_data: Vec<u8>) -> Self {
        Self {
            script_public_key,
            extra_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::SubnetworkId;

    fn record(fee: u64, is_accepted: bool) -> TransactionAcceptanceData {
        TransactionAcceptanceData {
            transaction: Transaction::new(0, vec![], vec![], 0, SubnetworkId::NATIVE, 0, vec![fee as u8]),
            fee,
            is_accepted,
        }
    }

    #[test]
    fn test_accepted_fees_skip_rejected() {
        let data = BlockAcceptanceData {
            block_hash: Hash::from_u64_word(1),
            transaction_acceptance_data: vec![record(0, true), record(10, true), record(99, false), record(5, true)],
        };
        assert_eq!(data.accepted_fees(), 15);
    }

    #[test]
    fn test_acceptance_map_keys() {
        let data = vec![
            BlockAcceptanceData {
                block_hash: Hash::from_u64_word(1),
                transaction_acceptance_data: vec![],
            },
            BlockAcceptanceData {
                block_hash: Hash::from_u64_word(2),
                transaction_acceptance_data: vec![record(3, true)],
            },
        ];
        let map = acceptance_data_by_block(&data);
        assert_eq!(map.len(), 2);
        assert_eq!(map[&Hash::from_u64_word(2)].accepted_fees(), 3);
    }
}
