//! Proof-of-work state of a candidate header

use num_bigint::BigUint;
use std::sync::Arc;
use tracing::trace;

use super::*;
use crate::consensus::{compact_to_target, BlockHeader};
use crate::crypto::{Hash, HashDomain, HashWriter};

/// Precomputed values for hashing one header with varying time and nonce
#[derive(Clone)]
pub struct State {
    pub timestamp: i64,
    pub nonce: u64,
    target: BigUint,
    pre_pow_hash: Hash,
    kernel: KernelVersion,
    context: Arc<PowContext>,
}

impl State {
    /// State backed by the process-wide context. Miners pass
    /// `generate_dataset` to get the full dataset built or loaded.
    pub fn new(header: &BlockHeader, generate_dataset: bool) -> PowResult<Self> {
        let context = shared_context_cache().get(generate_dataset)?;
        Ok(Self::with_context(header, context))
    }

    pub fn with_context(header: &BlockHeader, context: Arc<PowContext>) -> Self {
        let target = compact_to_target(header.bits);

        let mut unsealed = header.clone();
        unsealed.timestamp = 0;
        unsealed.nonce = 0;
        let pre_pow_hash = unsealed.hash();

        trace!(
            blue_work = header.blue_work,
            blue_score = header.blue_score,
            daa_score = header.daa_score,
            version = header.version,
            "new proof-of-work state"
        );

        Self {
            timestamp: header.timestamp,
            nonce: header.nonce,
            target,
            pre_pow_hash,
            kernel: KernelVersion::for_block_version(header.version),
            context,
        }
    }

    pub fn target(&self) -> &BigUint {
        &self.target
    }

    pub fn pre_pow_hash(&self) -> Hash {
        self.pre_pow_hash
    }

    pub fn kernel(&self) -> KernelVersion {
        self.kernel
    }

    /// Whether the context holds the full dataset
    pub fn is_context_ready(&self) -> bool {
        self.context.is_full()
    }

    /// `pre_pow_hash ‖ timestamp ‖ 32 zero bytes ‖ nonce`
    fn pow_hash(&self) -> Hash {
        HashWriter::new(HashDomain::ProofOfWork)
            .update(&self.pre_pow_hash.0)
            .write_i64(self.timestamp)
            .update(&[0u8; 32])
            .write_u64(self.nonce)
            .finalize()
    }

    /// Final proof-of-work hash read as a little-endian integer
    pub fn calculate_proof_of_work_value(&self) -> BigUint {
        let pow_hash = self.pow_hash();
        let middle = middle_hash(&self.context, self.kernel, &pow_hash);
        let final_hash = HashWriter::new(HashDomain::ProofOfWork).update(&middle.0).finalize();
        BigUint::from_bytes_le(&final_hash.0)
    }

    pub fn increment_nonce(&mut self) {
        self.nonce = self.nonce.wrapping_add(1);
    }

    /// Whether the proof-of-work value meets the target. The difficulty
    /// itself is not checked against the network's rules.
    pub fn check_proof_of_work(&self) -> bool {
        self.calculate_proof_of_work_value() <= self.target
    }
}

/// Check a header against the target in its own bits
pub fn check_proof_of_work_by_bits(header: &BlockHeader) -> PowResult<bool> {
    Ok(State::new(header, false)?.check_proof_of_work())
}

/// Level of a block in the proof hierarchy. Genesis sits at every level.
pub fn block_level(header: &BlockHeader, max_block_level: u8) -> PowResult<u8> {
    if header.direct_parents().is_empty() {
        return Ok(max_block_level);
    }
    let value = State::new(header, false)?.calculate_proof_of_work_value();
    Ok(level_from_value(&value, max_block_level))
}

/// Same as [`block_level`] with an explicit context
pub fn block_level_with_context(header: &BlockHeader, max_block_level: u8, context: Arc<PowContext>) -> u8 {
    if header.direct_parents().is_empty() {
        return max_block_level;
    }
    let value = State::with_context(header, context).calculate_proof_of_work_value();
    level_from_value(&value, max_block_level)
}

fn level_from_value(value: &BigUint, max_block_level: u8) -> u8 {
    (max_block_level as u64).saturating_sub(value.bits()) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn small_config() -> PowConfig {
        PowConfig {
            light_cache_items: 257,
            full_dataset_items: 97,
            dataset_file: None,
            build_threads: 1,
        }
    }

    fn context() -> Arc<PowContext> {
        Arc::new(PowContext::build(&small_config(), false).unwrap())
    }

    fn header(bits: u32) -> BlockHeader {
        BlockHeader::new(1, vec![Hash::from_u64_word(1)], Hash::zero(), 1_700_000_000_000, bits, 0)
    }

    #[test]
    fn test_pre_pow_hash_ignores_time_and_nonce() {
        let ctx = context();
        let a = header(0x207fffff);
        let mut b = a.clone();
        b.timestamp += 1000;
        b.nonce = 99;
        let sa = State::with_context(&a, ctx.clone());
        let sb = State::with_context(&b, ctx);
        assert_eq!(sa.pre_pow_hash(), sb.pre_pow_hash());
        assert_eq!(sb.nonce, 99);
        assert_ne!(sa.calculate_proof_of_work_value(), sb.calculate_proof_of_work_value());
    }

    #[test]
    fn test_check_matches_value_against_target() {
        let ctx = context();
        let mut state = State::with_context(&header(0x207fffff), ctx.clone());
        for _ in 0..20 {
            let value = state.calculate_proof_of_work_value();
            assert_eq!(state.check_proof_of_work(), value <= *state.target());
            state.increment_nonce();
        }

        // A sign-bit target is zero and can never be met
        let impossible = State::with_context(&header(0x20800000), ctx);
        assert!(!impossible.check_proof_of_work());
    }

    #[test]
    fn test_easiest_target_accepts_most_nonces() {
        let ctx = context();
        let mut state = State::with_context(&header(0x2100ffff), ctx);
        let mut found = 0;
        for _ in 0..16 {
            if state.check_proof_of_work() {
                found += 1;
            }
            state.increment_nonce();
        }
        assert_eq!(found, 16);
    }

    #[test]
    fn test_nonces_do_not_collide() {
        let ctx = context();
        let mut state = State::with_context(&header(0x207fffff), ctx);
        let mut seen = HashSet::new();
        for _ in 0..64 {
            assert!(seen.insert(state.calculate_proof_of_work_value()));
            state.increment_nonce();
        }
    }

    #[test]
    fn test_kernel_follows_header_version() {
        let ctx = context();
        let v1 = header(0x207fffff);
        let mut v2 = v1.clone();
        v2.version = 2;
        assert_eq!(State::with_context(&v1, ctx.clone()).kernel(), KernelVersion::FishHash);
        assert_eq!(State::with_context(&v2, ctx).kernel(), KernelVersion::HarHashV2);
    }

    #[test]
    fn test_genesis_block_level_is_max() {
        let genesis = BlockHeader::new(1, vec![], Hash::zero(), 0, 0x1e7fffff, 0);
        assert_eq!(block_level(&genesis, 225).unwrap(), 225);
        assert_eq!(block_level_with_context(&genesis, 7, context()), 7);
    }

    #[test]
    fn test_block_level_bounds() {
        let ctx = context();
        let level = block_level_with_context(&header(0x207fffff), 225, ctx.clone());
        assert!(level <= 225);
        // Almost every 256-bit value is longer than 10 bits
        assert_eq!(block_level_with_context(&header(0x207fffff), 10, ctx), 0);
        assert_eq!(level_from_value(&BigUint::from(0u8), 225), 225);
        assert_eq!(level_from_value(&BigUint::from(0xffu8), 225), 217);
    }

    #[test]
    fn test_context_ready_after_full_dataset() {
        let cache = ContextCache::new(small_config());
        let lazy = State::with_context(&header(0x207fffff), cache.get(false).unwrap());
        assert!(!lazy.is_context_ready());

        let full = State::with_context(&header(0x207fffff), cache.get(true).unwrap());
        assert!(full.is_context_ready());
        assert!(!lazy.is_context_ready());
        assert_eq!(lazy.calculate_proof_of_work_value(), full.calculate_proof_of_work_value());
    }

    #[test]
    fn test_check_by_bits_uses_shared_context() {
        // Keeps the process-wide context small for every test in this binary
        init_shared_context(small_config());

        let mut easy = header(0x207fffff);
        for nonce in 0..16 {
            easy.nonce = nonce;
            let expected = State::new(&easy, false).unwrap().check_proof_of_work();
            assert_eq!(check_proof_of_work_by_bits(&easy).unwrap(), expected);
        }

        assert!(check_proof_of_work_by_bits(&header(0x2100ffff)).unwrap());
        assert!(!check_proof_of_work_by_bits(&header(0x20800000)).unwrap());
        assert!(!State::new(&header(0x20800000), false).unwrap().check_proof_of_work());
    }
}
