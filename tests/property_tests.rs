//! Property-based and adversarial tests for the HARBI core
//!
//! These tests verify invariants hold under random inputs and attack scenarios.

use once_cell::sync::Lazy;
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

use harbi_core::consensus::{
    serialize_coinbase_payload, subsidy_for_month, BlockAcceptanceData, BlockHeader, CoinbaseData,
    CoinbaseManager, Network, Params, PayloadError, RewardPolicy, ScriptPublicKey, ValidationError,
    MONTHS_IN_TABLE,
};
use harbi_core::crypto::{hash_merkle_branches, merkle_root, Hash};
use harbi_core::mining::{build_block_template, Miner, TemplateManager};
use harbi_core::node::genesis_block;
use harbi_core::pow::{PowConfig, PowContext, State};
use harbi_core::storage::{ChainError, ChainState, MemoryStores, StagingArea};

/// Index of the month whose subsidy sits below its successor
const DIP_MONTH: u64 = 47;

static CONTEXT: Lazy<Arc<PowContext>> = Lazy::new(|| {
    let config = PowConfig {
        light_cache_items: 257,
        full_dataset_items: 97,
        dataset_file: None,
        build_threads: 1,
    };
    Arc::new(PowContext::build(&config, false).unwrap())
});

fn hash_strategy() -> impl Strategy<Value = Hash> {
    any::<[u8; 32]>().prop_map(Hash::from_bytes)
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

proptest! {
    /// Subsidies never grow with time, apart from the one month below its successor
    #[test]
    fn prop_subsidy_non_increasing(
        a in 0u64..(MONTHS_IN_TABLE as u64 + 50),
        b in 0u64..(MONTHS_IN_TABLE as u64 + 50)
    ) {
        let (early, late) = if a <= b { (a, b) } else { (b, a) };
        prop_assume!(early != DIP_MONTH);
        prop_assert!(subsidy_for_month(late) <= subsidy_for_month(early));
    }

    /// Past the table every lookup returns the terminal entry
    #[test]
    fn prop_subsidy_clamps(month in (MONTHS_IN_TABLE as u64)..u64::MAX) {
        prop_assert_eq!(subsidy_for_month(month), subsidy_for_month(MONTHS_IN_TABLE as u64 - 1));
    }

    /// Swapping two distinct leaves changes the root
    #[test]
    fn prop_merkle_order_sensitive(
        leaves in prop::collection::vec(hash_strategy(), 2..24),
        i in any::<prop::sample::Index>(),
        j in any::<prop::sample::Index>()
    ) {
        let i = i.index(leaves.len());
        let j = j.index(leaves.len());
        prop_assume!(leaves[i] != leaves[j]);

        let mut swapped = leaves.clone();
        swapped.swap(i, j);
        prop_assert_ne!(merkle_root(&leaves), merkle_root(&swapped));
    }

    /// An odd node is paired with the zero hash
    #[test]
    fn prop_three_leaf_root(a in hash_strategy(), b in hash_strategy(), c in hash_strategy()) {
        let expected = hash_merkle_branches(
            &hash_merkle_branches(&a, &b),
            &hash_merkle_branches(&c, &Hash::zero()),
        );
        prop_assert_eq!(merkle_root(&[a, b, c]), expected);
    }

    /// The dev fee split never creates or destroys value
    #[test]
    fn prop_reward_split_conserves_value(reward in any::<u64>(), percent in 0u64..=100) {
        let policy = RewardPolicy::DevFee {
            percent,
            script_public_key: ScriptPublicKey::new(0, vec![1; 34]),
        };
        let (miner, dev) = policy.split(reward);
        let dev = dev.unwrap_or_default();
        prop_assert_eq!(miner as u128 + dev as u128, reward as u128);

        prop_assert_eq!(RewardPolicy::Standard.split(reward), (reward, None));
    }

    /// A merged block the merging block does not add to its DAA window earns nothing
    #[test]
    fn prop_block_outside_daa_window_earns_nothing(
        merged in hash_strategy(),
        window in prop::collection::vec(hash_strategy(), 0..8)
    ) {
        let window: HashSet<Hash> = window.into_iter().filter(|hash| *hash != merged).collect();
        let manager = CoinbaseManager::from_stores(&Params::devnet(), Arc::new(MemoryStores::new()));
        let acceptance = BlockAcceptanceData {
            block_hash: merged,
            transaction_acceptance_data: Vec::new(),
        };
        let reward = manager
            .calc_merged_block_reward(&StagingArea::new(), &merged, &acceptance, &window)
            .unwrap();
        prop_assert_eq!(reward, 0);
    }

    /// Distinct nonces never give the same proof-of-work value
    #[test]
    fn prop_different_nonce_different_value(
        first in any::<u64>(),
        second in any::<u64>(),
        version in 1u16..3
    ) {
        prop_assume!(first != second);
        let header = BlockHeader::new(version, vec![Hash::from_u64_word(1)], Hash::zero(), 1_700_000_000_000, 0x207fffff, 0);

        let mut state = State::with_context(&header, CONTEXT.clone());
        state.nonce = first;
        let a = state.calculate_proof_of_work_value();
        state.nonce = second;
        let b = state.calculate_proof_of_work_value();
        prop_assert_ne!(a, b);
    }
}

// ============================================================================
// ADVERSARIAL TESTS
// ============================================================================

/// A miner paying itself more than the expected coinbase is rejected even
/// with valid proof of work
#[test]
fn test_excess_reward_rejected() {
    let mut chain = ChainState::open(Params::devnet(), Arc::new(MemoryStores::new())).unwrap();
    let data = CoinbaseData::new(ScriptPublicKey::new(0, vec![5; 34]), vec![]);
    let mut template = build_block_template(&chain, &data, vec![], 1_700_000_000_000).unwrap();

    template.block.transactions[0].outputs[0].value *= 2;
    template.block.header.hash_merkle_root =
        harbi_core::crypto::calculate_hash_merkle_root(&template.block.transactions);

    let miner = Miner::new(Arc::new(TemplateManager::new()));
    let state = State::with_context(&template.block.header, CONTEXT.clone());
    let block = miner.mine_block(&template, state, 10_000).unwrap();

    let genesis = chain.tip();
    let result = chain.accept_block(block, template.virtual_block.clone(), &CONTEXT);
    assert!(matches!(
        result,
        Err(ChainError::Validation(ValidationError::BadCoinbaseTransaction { .. }))
    ));
    assert_eq!(chain.tip(), genesis);
}

/// A block carrying another block's merkle root is rejected
#[test]
fn test_mismatched_merkle_root_rejected() {
    let mut chain = ChainState::open(Params::devnet(), Arc::new(MemoryStores::new())).unwrap();
    let data = CoinbaseData::new(ScriptPublicKey::new(0, vec![5; 34]), vec![]);
    let mut template = build_block_template(&chain, &data, vec![], 1_700_000_000_000).unwrap();
    template.block.header.hash_merkle_root = Hash::from_u64_word(0xbad);

    let miner = Miner::new(Arc::new(TemplateManager::new()));
    let state = State::with_context(&template.block.header, CONTEXT.clone());
    let block = miner.mine_block(&template, state, 10_000).unwrap();

    assert!(matches!(
        chain.accept_block(block, template.virtual_block.clone(), &CONTEXT),
        Err(ChainError::Validation(ValidationError::InvalidHashMerkleRoot { .. }))
    ));
}

/// Oversized miner scripts cannot be smuggled into a coinbase payload
#[test]
fn test_oversized_script_rejected() {
    let params = Params::mainnet();
    let max = params.coinbase_payload_script_public_key_max_len;
    let data = CoinbaseData::new(ScriptPublicKey::new(0, vec![0; max as usize + 1]), vec![]);
    assert!(matches!(
        serialize_coinbase_payload(1, &data, 1, max),
        Err(PayloadError::ScriptTooLong { .. })
    ));
}

/// The subsidy runs out at the end of the table
#[test]
fn test_subsidy_exhaustion() {
    assert_eq!(subsidy_for_month(MONTHS_IN_TABLE as u64 - 1), 0);
    assert_eq!(subsidy_for_month(u64::MAX), 0);
}

#[test]
fn test_genesis_determinism() {
    for network in [Network::Mainnet, Network::Devnet] {
        let a = genesis_block(network);
        let b = genesis_block(network);
        assert_eq!(a.hash(), b.hash());
        assert_eq!(Params::for_network(network).genesis_hash, a.hash());
    }
}

#[test]
fn test_dev_fee_follows_block_version() {
    assert_eq!(RewardPolicy::for_params(&Params::devnet()), RewardPolicy::Standard);
    assert!(matches!(
        RewardPolicy::for_params(&Params::mainnet()),
        RewardPolicy::DevFee { percent: 2, .. }
    ));
}
