//! Consensus parameters per network
//!
//! These values are part of consensus: two nodes with different parameters
//! are on different networks. They are selected by network name, never read
//! from user configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::LEOR_PER_HARBI;
use crate::crypto::Hash;
use crate::node::genesis_block;

/// Network a node participates in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Devnet,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Devnet => write!(f, "devnet"),
        }
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "devnet" => Ok(Network::Devnet),
            other => Err(format!("unknown network '{other}'")),
        }
    }
}

/// Schnorr key that receives the developer share on block version 2
pub const DEV_FEE_PUBKEY: [u8; 32] = [
    0x5c, 0x1f, 0x8e, 0x2a, 0x94, 0x07, 0xd3, 0x61, 0xbb, 0x3e, 0x70, 0x12, 0xc8, 0x4d, 0xa6, 0x0f,
    0x29, 0xe5, 0x33, 0x9a, 0x71, 0x0c, 0xfe, 0x48, 0x86, 0x2b, 0xd7, 0x54, 0x13, 0xaf, 0x6e, 0x90,
];

/// Consensus parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Params {
    pub network: Network,
    pub genesis_hash: Hash,
    /// Version stamped on new headers; also selects the reward policy
    pub block_version: u16,
    pub genesis_bits: u32,
    pub subsidy_genesis_reward: u64,
    pub pre_deflationary_phase_base_subsidy: u64,
    pub deflationary_phase_daa_score: u64,
    /// Base of the halving formula the subsidy table was generated from
    pub deflationary_phase_base_subsidy: u64,
    pub coinbase_payload_script_public_key_max_len: u8,
    pub max_block_level: u8,
    /// Developer share of every merged reward on block version 2, in percent
    pub dev_fee_percent: u64,
    pub dev_fee_pubkey: [u8; 32],
}

impl Params {
    pub fn mainnet() -> Self {
        Self {
            network: Network::Mainnet,
            genesis_hash: genesis_block(Network::Mainnet).hash(),
            block_version: 2,
            genesis_bits: 0x1e7fffff,
            subsidy_genesis_reward: LEOR_PER_HARBI,
            pre_deflationary_phase_base_subsidy: 50 * LEOR_PER_HARBI,
            deflationary_phase_daa_score: 15_519_600,
            deflationary_phase_base_subsidy: 34 * LEOR_PER_HARBI,
            coinbase_payload_script_public_key_max_len: 150,
            max_block_level: 225,
            dev_fee_percent: 2,
            dev_fee_pubkey: DEV_FEE_PUBKEY,
        }
    }

    /// Single-miner development network: trivial difficulty and an early
    /// deflationary phase so the whole subsidy path gets exercised.
    pub fn devnet() -> Self {
        Self {
            network: Network::Devnet,
            genesis_hash: genesis_block(Network::Devnet).hash(),
            block_version: 1,
            genesis_bits: 0x207fffff,
            deflationary_phase_daa_score: 1_000,
            ..Self::mainnet()
        }
    }

    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Mainnet => Self::mainnet(),
            Network::Devnet => Self::devnet(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_parse() {
        assert_eq!("DevNet".parse::<Network>().unwrap(), Network::Devnet);
        assert!("testnet-9".parse::<Network>().is_err());
        assert_eq!(Network::Mainnet.to_string(), "mainnet");
    }

    #[test]
    fn test_networks_have_distinct_genesis() {
        assert_ne!(Params::mainnet().genesis_hash, Params::devnet().genesis_hash);
        assert_eq!(Params::for_network(Network::Devnet), Params::devnet());
    }
}
