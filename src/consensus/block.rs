//! Block structure for the HARBI blockDAG
//!
//! Defines the block header and block. A header names its parents per
//! level; level 0 holds the direct parents.

use serde::{Deserialize, Serialize};

use super::Transaction;
use crate::crypto::{Hash, HashDomain, HashWriter};

/// Block header containing all metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockHeader {
    /// Protocol version, also selects the proof-of-work kernel
    pub version: u16,
    /// Parents per block level; level 0 holds the direct parents
    pub parents_by_level: Vec<Vec<Hash>>,
    /// Merkle root of the transaction hashes
    pub hash_merkle_root: Hash,
    /// Merkle root of the ids of the transactions accepted by this block
    pub accepted_id_merkle_root: Hash,
    pub utxo_commitment: Hash,
    /// Block timestamp in milliseconds since Unix epoch
    pub timestamp: i64,
    /// Difficulty target (compact representation)
    pub bits: u32,
    /// Nonce used for PoW
    pub nonce: u64,
    pub daa_score: u64,
    pub blue_work: u128,
    pub blue_score: u64,
    pub pruning_point: Hash,
}

impl BlockHeader {
    /// Create a header with a single level of parents and empty commitments
    pub fn new(
        version: u16,
        parents: Vec<Hash>,
        hash_merkle_root: Hash,
        timestamp: i64,
        bits: u32,
        nonce: u64,
    ) -> Self {
        let parents_by_level = if parents.is_empty() {
            Vec::new()
        } else {
            vec![parents]
        };
        Self {
            version,
            parents_by_level,
            hash_merkle_root,
            accepted_id_merkle_root: Hash::zero(),
            utxo_commitment: Hash::zero(),
            timestamp,
            bits,
            nonce,
            daa_score: 0,
            blue_work: 0,
            blue_score: 0,
            pruning_point: Hash::zero(),
        }
    }

    /// Direct parents of this block (empty for genesis)
    pub fn direct_parents(&self) -> &[Hash] {
        self.parents_by_level
            .first()
            .map(|level| level.as_slice())
            .unwrap_or(&[])
    }

    /// Feed the header into a hash writer
    pub(crate) fn write_to(&self, writer: &mut HashWriter) {
        writer.write_u16(self.version);
        writer.write_u64(self.parents_by_level.len() as u64);
        for level in &self.parents_by_level {
            writer.write_u64(level.len() as u64);
            for parent in level {
                writer.update(&parent.0);
            }
        }
        writer.update(&self.hash_merkle_root.0);
        writer.update(&self.accepted_id_merkle_root.0);
        writer.update(&self.utxo_commitment.0);
        writer.write_i64(self.timestamp);
        writer.write_u32(self.bits);
        writer.write_u64(self.nonce);
        writer.write_u64(self.daa_score);
        writer.write_var_bytes(&blue_work_bytes(self.blue_work));
        writer.write_u64(self.blue_score);
        writer.update(&self.pruning_point.0);
    }

    /// Calculate the hash of this header
    pub fn hash(&self) -> Hash {
        let mut writer = HashWriter::new(HashDomain::BlockHash);
        self.write_to(&mut writer);
        writer.finalize()
    }
}

/// Big-endian blue work without leading zero bytes
fn blue_work_bytes(blue_work: u128) -> Vec<u8> {
    let bytes = blue_work.to_be_bytes();
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[start..].to_vec()
}

/// A complete block containing header and transactions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    /// Transactions; the coinbase always comes first
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(header: BlockHeader, transactions: Vec<Transaction>) -> Self {
        Self {
            header,
            transactions,
        }
    }

    /// Get the block hash
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    /// The coinbase transaction, if the block has any transactions
    pub fn coinbase(&self) -> Option<&Transaction> {
        self.transactions.first()
    }

    /// Check if this is the genesis block
    pub fn is_genesis(&self) -> bool {
        self.header.direct_parents().is_empty()
    }
}
