//! Genesis block generation for the HARBI blockDAG
//!
//! Creates the immutable genesis block of each network. Genesis has no
//! parents and its coinbase has no outputs; the payload only records the
//! genesis reward and a message.

use crate::consensus::{
    serialize_coinbase_payload, Block, BlockHeader, CoinbaseData, Network, ScriptPublicKey, SubnetworkId,
    Transaction,
};
use crate::constants::{GENESIS_MESSAGE, GENESIS_TIMESTAMP, LEOR_PER_HARBI, MAX_TRANSACTION_VERSION};
use crate::crypto::{calculate_hash_merkle_root, Hash};

/// Script recorded in the genesis payload: `OP_TRUE`, spendable by nobody
/// in particular and paid nothing.
const GENESIS_SCRIPT: [u8; 1] = [0x51];

/// Genesis block version
const GENESIS_VERSION: u16 = 1;

fn genesis_bits(network: Network) -> u32 {
    match network {
        Network::Mainnet => 0x1e7fffff,
        Network::Devnet => 0x207fffff,
    }
}

fn genesis_coinbase(network: Network) -> Transaction {
    let mut extra_data = GENESIS_MESSAGE.to_vec();
    extra_data.extend_from_slice(network.to_string().as_bytes());
    let data = CoinbaseData::new(ScriptPublicKey::new(0, GENESIS_SCRIPT.to_vec()), extra_data);

    // The script is far below any length limit, so this never falls back
    let payload = serialize_coinbase_payload(0, &data, LEOR_PER_HARBI, u8::MAX).unwrap_or_default();

    Transaction::new(
        MAX_TRANSACTION_VERSION,
        Vec::new(),
        Vec::new(),
        0,
        SubnetworkId::COINBASE,
        0,
        payload,
    )
}

/// Create the genesis block of `network`
///
/// This function produces a reproducible, byte-for-byte identical genesis
/// block for each network.
pub fn genesis_block(network: Network) -> Block {
    let transactions = vec![genesis_coinbase(network)];
    let merkle_root = calculate_hash_merkle_root(&transactions);

    let header = BlockHeader::new(
        GENESIS_VERSION,
        Vec::new(), // No parents
        merkle_root,
        GENESIS_TIMESTAMP,
        genesis_bits(network),
        0, // Genesis is never mined
    );

    Block::new(header, transactions)
}

/// Verify genesis block matches expected hash
pub fn verify_genesis_hash(block: &Block, expected_hash: &Hash) -> bool {
    block.hash() == *expected_hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::{extract_coinbase_data_blue_score_and_subsidy, Params};

    #[test]
    fn test_genesis_is_deterministic() {
        let a = genesis_block(Network::Mainnet);
        let b = genesis_block(Network::Mainnet);
        assert_eq!(a, b);
        assert!(verify_genesis_hash(&a, &b.hash()));
        assert_eq!(Params::mainnet().genesis_hash, a.hash());
    }

    #[test]
    fn test_networks_have_distinct_genesis() {
        let mainnet = genesis_block(Network::Mainnet);
        let devnet = genesis_block(Network::Devnet);
        assert_ne!(mainnet.hash(), devnet.hash());
        assert!(mainnet.is_genesis());
        assert!(devnet.is_genesis());
    }

    #[test]
    fn test_genesis_coinbase_payload() {
        let genesis = genesis_block(Network::Devnet);
        let coinbase = genesis.coinbase().unwrap();
        assert!(coinbase.is_coinbase());
        assert!(coinbase.outputs.is_empty());

        let (blue_score, data, subsidy) = extract_coinbase_data_blue_score_and_subsidy(coinbase, 150).unwrap();
        assert_eq!(blue_score, 0);
        assert_eq!(subsidy, LEOR_PER_HARBI);
        assert_eq!(data.script_public_key.script, GENESIS_SCRIPT.to_vec());
        assert!(data.extra_data.starts_with(GENESIS_MESSAGE));
        assert_eq!(genesis.header.hash_merkle_root, calculate_hash_merkle_root(&genesis.transactions));
    }
}
