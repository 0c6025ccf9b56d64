//! Cryptography module - BLAKE3 domain hashing, Merkle commitments, addresses

mod hash;
mod merkle;
pub mod address;

pub use hash::*;
pub use merkle::*;
