//! BLAKE3 hashing
//!
//! Every consensus hash in HARBI is BLAKE3 in derive-key mode, one key per
//! domain, so a transaction hash can never collide with a merkle branch or a
//! proof-of-work hash built from the same bytes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of a hash in bytes
pub const HASH_SIZE: usize = 32;

/// 32-byte hash output
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash(pub [u8; HASH_SIZE]);

impl Hash {
    /// The all-zero hash
    pub const fn zero() -> Self {
        Hash([0u8; HASH_SIZE])
    }

    /// Create hash from bytes
    pub const fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }

    /// Build a hash whose first eight bytes are `value` in little-endian.
    /// Handy for tests and synthetic keys.
    pub fn from_u64_word(value: u64) -> Self {
        let mut bytes = [0u8; HASH_SIZE];
        bytes[..8].copy_from_slice(&value.to_le_bytes());
        Hash(bytes)
    }

    /// Create hash from hex string
    pub fn from_hex(hex: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(hex)?;
        if bytes.len() != HASH_SIZE {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; HASH_SIZE];
        arr.copy_from_slice(&bytes);
        Ok(Hash(arr))
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Get as bytes
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_SIZE]
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Default for Hash {
    fn default() -> Self {
        Self::zero()
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Hash domains. Each one is a distinct BLAKE3 derive-key context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashDomain {
    TransactionHash,
    TransactionId,
    MerkleBranch,
    BlockHash,
    ProofOfWork,
}

impl HashDomain {
    fn context(self) -> &'static str {
        match self {
            HashDomain::TransactionHash => "harbi 2023 TransactionHash",
            HashDomain::TransactionId => "harbi 2023 TransactionID",
            HashDomain::MerkleBranch => "harbi 2023 MerkleBranchHash",
            HashDomain::BlockHash => "harbi 2023 BlockHash",
            HashDomain::ProofOfWork => "harbi 2023 ProofOfWorkHash",
        }
    }
}

/// Incremental writer for a domain-separated hash.
///
/// Integers are always written little-endian.
#[derive(Clone)]
pub struct HashWriter {
    hasher: blake3::Hasher,
}

impl HashWriter {
    pub fn new(domain: HashDomain) -> Self {
        Self {
            hasher: blake3::Hasher::new_derive_key(domain.context()),
        }
    }

    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.hasher.update(data);
        self
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.update(&[value])
    }

    pub fn write_u16(&mut self, value: u16) -> &mut Self {
        self.update(&value.to_le_bytes())
    }

    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        self.update(&value.to_le_bytes())
    }

    pub fn write_u64(&mut self, value: u64) -> &mut Self {
        self.update(&value.to_le_bytes())
    }

    pub fn write_i64(&mut self, value: i64) -> &mut Self {
        self.update(&value.to_le_bytes())
    }

    /// Write a u64 length prefix followed by the bytes
    pub fn write_var_bytes(&mut self, data: &[u8]) -> &mut Self {
        self.write_u64(data.len() as u64);
        self.update(data)
    }

    pub fn finalize(&self) -> Hash {
        Hash(*self.hasher.finalize().as_bytes())
    }
}

/// Hash arbitrary bytes in the given domain
pub fn hash_in_domain(domain: HashDomain, data: &[u8]) -> Hash {
    HashWriter::new(domain).update(data).finalize()
}

/// Hash two merkle nodes together
pub fn hash_merkle_branches(left: &Hash, right: &Hash) -> Hash {
    HashWriter::new(HashDomain::MerkleBranch)
        .update(&left.0)
        .update(&right.0)
        .finalize()
}

/// Plain BLAKE3 of arbitrary bytes, used for checksums only
pub fn hash_bytes(data: &[u8]) -> Hash {
    Hash(*blake3::hash(data).as_bytes())
}

/// Double hash (hash of hash) for address checksums
pub fn double_hash(data: &[u8]) -> Hash {
    let first = hash_bytes(data);
    hash_bytes(&first.0)
}
