//! Hashing kernels
//!
//! Both kernels run 32 rounds of three dataset reads folded into a 128-byte
//! mix. They only differ in how the three dataset indices are derived.

use super::*;
use crate::crypto::Hash;

/// Kernel selected by the header version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelVersion {
    /// Header version 1
    FishHash,
    /// Every later header version
    HarHashV2,
}

impl KernelVersion {
    pub fn for_block_version(version: u16) -> Self {
        match version {
            1 => KernelVersion::FishHash,
            _ => KernelVersion::HarHashV2,
        }
    }

    fn dataset_indices(self, mix: &Hash1024, round: u32, limit: u32) -> [u32; 3] {
        match self {
            KernelVersion::FishHash => [mix.word32(0) % limit, mix.word32(4) % limit, mix.word32(8) % limit],
            KernelVersion::HarHashV2 => {
                let mut group = [0u32; 8];
                for (c, g) in group.iter_mut().enumerate() {
                    *g = mix.word32(4 * c) ^ mix.word32(4 * c + 1) ^ mix.word32(4 * c + 2) ^ mix.word32(4 * c + 3);
                }
                [
                    (group[0] ^ group[3] ^ group[6]) % limit,
                    (group[1] ^ group[4] ^ group[7]) % limit,
                    (group[2] ^ group[5] ^ round) % limit,
                ]
            }
        }
    }
}

/// Run the kernel over a 64-byte seed and reduce the mix to 32 bytes
pub fn hash_kernel(context: &PowContext, version: KernelVersion, seed: &Hash512) -> [u8; 32] {
    let limit = context.dataset_items().max(1);
    let mut mix = Hash1024::merge(seed, seed);

    for round in 0..NUM_DATASET_ACCESSES {
        let [p0, p1, p2] = version.dataset_indices(&mix, round, limit);

        let fetch0 = context.lookup(p0);
        let mut fetch1 = context.lookup(p1);
        let mut fetch2 = context.lookup(p2);

        for j in 0..32 {
            fetch1.set_word32(j, fnv1(mix.word32(j), fetch1.word32(j)));
            fetch2.set_word32(j, mix.word32(j) ^ fetch2.word32(j));
        }

        for j in 0..16 {
            mix.set_word64(j, fetch0.word64(j).wrapping_mul(fetch1.word64(j)).wrapping_add(fetch2.word64(j)));
        }
    }

    let mut out = [0u8; 32];
    for i in (0..32).step_by(4) {
        let h1 = fnv1(mix.word32(i), mix.word32(i + 1));
        let h2 = fnv1(h1, mix.word32(i + 2));
        let h3 = fnv1(h2, mix.word32(i + 3));
        out[i..i + 4].copy_from_slice(&h3.to_le_bytes());
    }
    out
}

/// Memory-hard middle step of the proof-of-work hash.
/// The 32-byte input fills the first half of the seed; the rest is zero.
pub fn middle_hash(context: &PowContext, version: KernelVersion, pow_hash: &Hash) -> Hash {
    let mut seed = Hash512::zero();
    seed.0[..32].copy_from_slice(&pow_hash.0);
    Hash(hash_kernel(context, version, &seed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> PowContext {
        let config = PowConfig {
            light_cache_items: 257,
            full_dataset_items: 97,
            dataset_file: None,
            build_threads: 1,
        };
        PowContext::build(&config, false).unwrap()
    }

    #[test]
    fn test_version_dispatch() {
        assert_eq!(KernelVersion::for_block_version(1), KernelVersion::FishHash);
        assert_eq!(KernelVersion::for_block_version(2), KernelVersion::HarHashV2);
        assert_eq!(KernelVersion::for_block_version(0), KernelVersion::HarHashV2);
    }

    #[test]
    fn test_index_derivation() {
        let mut mix = Hash1024::zero();
        mix.set_word32(0, 5);
        mix.set_word32(4, 7);
        mix.set_word32(8, 103);
        assert_eq!(KernelVersion::FishHash.dataset_indices(&mix, 0, 100), [5, 7, 3]);

        // group 0 = 5, group 1 = 7, group 2 = 103, rest zero
        assert_eq!(KernelVersion::HarHashV2.dataset_indices(&mix, 0, 100), [5, 7, 3]);
        assert_eq!(KernelVersion::HarHashV2.dataset_indices(&mix, 4, 100), [5, 7, 99]);

        mix.set_word32(1, 1);
        assert_eq!(KernelVersion::FishHash.dataset_indices(&mix, 0, 100), [5, 7, 3]);
        assert_eq!(KernelVersion::HarHashV2.dataset_indices(&mix, 0, 100), [4, 7, 3]);
    }

    #[test]
    fn test_kernels_are_deterministic_and_distinct() {
        let ctx = context();
        let input = Hash::from_u64_word(0xfeed);
        let fish = middle_hash(&ctx, KernelVersion::FishHash, &input);
        assert_eq!(fish, middle_hash(&ctx, KernelVersion::FishHash, &input));
        assert_ne!(fish, middle_hash(&ctx, KernelVersion::HarHashV2, &input));
        assert_ne!(fish, middle_hash(&ctx, KernelVersion::FishHash, &Hash::from_u64_word(0xfeee)));
    }

    #[test]
    fn test_full_and_lazy_contexts_agree() {
        let config = PowConfig {
            light_cache_items: 257,
            full_dataset_items: 97,
            dataset_file: None,
            build_threads: 2,
        };
        let lazy = PowContext::build(&config, false).unwrap();
        let full = PowContext::build(&config, true).unwrap();
        let input = Hash::from_u64_word(42);
        for version in [KernelVersion::FishHash, KernelVersion::HarHashV2] {
            assert_eq!(middle_hash(&lazy, version, &input), middle_hash(&full, version, &input));
        }
    }
}
