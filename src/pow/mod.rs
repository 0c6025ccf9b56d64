//! FishHash proof of work
//!
//! A memory-hard hash over a 4.8 GB dataset derived from a 75 MB light
//! cache. Miners build the whole dataset up front; validators only touch
//! the handful of items each header needs and compute those on demand.

mod context;
mod dataset;
mod kernel;
mod state;

pub use context::*;
pub use dataset::*;
pub use kernel::*;
pub use state::*;

use once_cell::sync::OnceCell;
use sha3::{Digest, Keccak512};
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

pub const HASHING_ALGO_VERSION: &str = "fishhash-kls-0.0.2";

pub const FNV_PRIME: u32 = 0x0100_0193;
pub const FULL_DATASET_ITEM_PARENTS: u32 = 512;
pub const NUM_DATASET_ACCESSES: u32 = 32;
pub const LIGHT_CACHE_ROUNDS: usize = 3;
pub const LIGHT_CACHE_NUM_ITEMS: u32 = 1_179_641;
pub const FULL_DATASET_NUM_ITEMS: u32 = 37_748_717;

/// Light cache seed, shared with the FishHash reference parameters
pub const SEED: [u8; 32] = [
    0xeb, 0x01, 0x63, 0xae, 0xf2, 0xab, 0x1c, 0x5a, 0x66, 0x31, 0x0c, 0x1c, 0x14, 0xd6, 0x0f, 0x42,
    0x55, 0xa9, 0xb3, 0x9b, 0x0e, 0xdf, 0x26, 0x53, 0x98, 0x44, 0xf1, 0x17, 0xad, 0x67, 0x21, 0x19,
];

#[derive(Debug, Error)]
pub enum PowError {
    #[error("dataset file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start dataset builder threads: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type PowResult<T> = Result<T, PowError>;

/// Sizes and storage of the proof-of-work context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowConfig {
    pub light_cache_items: u32,
    pub full_dataset_items: u32,
    /// Where the full dataset is loaded from and saved to; `None` keeps it
    /// in memory only
    pub dataset_file: Option<PathBuf>,
    /// Threads used to generate the full dataset
    pub build_threads: usize,
}

impl PowConfig {
    pub fn mainnet() -> Self {
        Self {
            light_cache_items: LIGHT_CACHE_NUM_ITEMS,
            full_dataset_items: FULL_DATASET_NUM_ITEMS,
            dataset_file: None,
            build_threads: 8,
        }
    }

    pub fn with_dataset_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.dataset_file = Some(path.into());
        self
    }

    pub fn with_build_threads(mut self, threads: usize) -> Self {
        self.build_threads = threads.max(1);
        self
    }
}

impl Default for PowConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}

/// 64-byte light cache item
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Hash512(pub [u8; 64]);

impl Hash512 {
    pub const fn zero() -> Self {
        Hash512([0u8; 64])
    }

    #[inline]
    pub fn word32(&self, i: usize) -> u32 {
        u32::from_le_bytes([self.0[4 * i], self.0[4 * i + 1], self.0[4 * i + 2], self.0[4 * i + 3]])
    }

    #[inline]
    pub fn set_word32(&mut self, i: usize, value: u32) {
        self.0[4 * i..4 * i + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub fn xor(&self, other: &Hash512) -> Hash512 {
        let mut out = [0u8; 64];
        for (o, (a, b)) in out.iter_mut().zip(self.0.iter().zip(other.0.iter())) {
            *o = a ^ b;
        }
        Hash512(out)
    }
}

impl std::fmt::Debug for Hash512 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// 128-byte full dataset item
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Hash1024(pub [u8; 128]);

impl Hash1024 {
    pub const SIZE: usize = 128;

    pub const fn zero() -> Self {
        Hash1024([0u8; 128])
    }

    /// `first ‖ second`
    pub fn merge(first: &Hash512, second: &Hash512) -> Self {
        let mut out = [0u8; 128];
        out[..64].copy_from_slice(&first.0);
        out[64..].copy_from_slice(&second.0);
        Hash1024(out)
    }

    #[inline]
    pub fn word32(&self, i: usize) -> u32 {
        u32::from_le_bytes([self.0[4 * i], self.0[4 * i + 1], self.0[4 * i + 2], self.0[4 * i + 3]])
    }

    #[inline]
    pub fn set_word32(&mut self, i: usize, value: u32) {
        self.0[4 * i..4 * i + 4].copy_from_slice(&value.to_le_bytes());
    }

    #[inline]
    pub fn word64(&self, i: usize) -> u64 {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.0[8 * i..8 * i + 8]);
        u64::from_le_bytes(buf)
    }

    #[inline]
    pub fn set_word64(&mut self, i: usize, value: u64) {
        self.0[8 * i..8 * i + 8].copy_from_slice(&value.to_le_bytes());
    }
}

impl std::fmt::Debug for Hash1024 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Legacy Keccak-512 (pre-NIST padding)
pub fn keccak512(data: &[u8]) -> Hash512 {
    let digest = Keccak512::digest(data);
    let mut out = [0u8; 64];
    out.copy_from_slice(&digest);
    Hash512(out)
}

#[inline]
pub fn fnv1(u: u32, v: u32) -> u32 {
    u.wrapping_mul(FNV_PRIME) ^ v
}

/// Word-wise FNV-1 of two 64-byte items
pub fn fnv1_hash512(u: &Hash512, v: &Hash512) -> Hash512 {
    let mut out = Hash512::zero();
    for j in 0..16 {
        out.set_word32(j, fnv1(u.word32(j), v.word32(j)));
    }
    out
}

static SHARED_CONTEXT: OnceCell<ContextCache> = OnceCell::new();

/// Install the process-wide context cache. The first call wins; later calls
/// with a different configuration are ignored with a warning.
pub fn init_shared_context(config: PowConfig) -> &'static ContextCache {
    let cache = SHARED_CONTEXT.get_or_init(|| ContextCache::new(config.clone()));
    if cache.config() != &config {
        warn!("proof-of-work context already initialized, ignoring new configuration");
    }
    cache
}

/// The process-wide context cache, mainnet sized unless
/// [`init_shared_context`] ran first
pub fn shared_context_cache() -> &'static ContextCache {
    SHARED_CONTEXT.get_or_init(|| ContextCache::new(PowConfig::mainnet()))
}
