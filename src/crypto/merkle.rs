//! Merkle tree commitments over block transactions
//!
//! The tree is stored as a linear array of `2P - 1` slots where `P` is the
//! leaf count rounded up to a power of two. A node without a right sibling is
//! hashed with 32 zero bytes, never with a copy of itself.

use super::{hash_merkle_branches, Hash};
use crate::consensus::Transaction;

/// Round `n` up to the next power of two (returns `n` if it already is one)
fn next_power_of_two(n: usize) -> usize {
    if n & n.wrapping_sub(1) == 0 {
        return n;
    }
    n.next_power_of_two()
}

/// Compute the merkle root of an ordered list of hashes.
///
/// An empty list commits to the zero hash. A single hash is its own root.
pub fn merkle_root(hashes: &[Hash]) -> Hash {
    if hashes.is_empty() {
        return Hash::zero();
    }

    let next_pot = next_power_of_two(hashes.len());
    let array_size = next_pot * 2 - 1;
    let mut merkles: Vec<Option<Hash>> = vec![None; array_size];

    for (slot, hash) in merkles.iter_mut().zip(hashes) {
        *slot = Some(*hash);
    }

    let zero = Hash::zero();
    let mut offset = next_pot;
    let mut i = 0;
    while i + 1 < array_size {
        merkles[offset] = match (merkles[i], merkles[i + 1]) {
            (None, _) => None,
            (Some(left), None) => Some(hash_merkle_branches(&left, &zero)),
            (Some(left), Some(right)) => Some(hash_merkle_branches(&left, &right)),
        };
        offset += 1;
        i += 2;
    }

    merkles[array_size - 1].unwrap_or_default()
}

/// Merkle root over the full transaction hashes (the header's `hash_merkle_root`)
pub fn calculate_hash_merkle_root(transactions: &[Transaction]) -> Hash {
    let hashes: Vec<Hash> = transactions.iter().map(|tx| tx.hash()).collect();
    merkle_root(&hashes)
}

/// Merkle root over transaction ids (the header's `accepted_id_merkle_root`).
/// No transactions commit to the zero hash.
pub fn calculate_id_merkle_root(transactions: &[Transaction]) -> Hash {
    if transactions.is_empty() {
        return Hash::zero();
    }
    let ids: Vec<Hash> = transactions.iter().map(|tx| tx.id()).collect();
    merkle_root(&ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash_bytes;

    fn make_hashes(n: usize) -> Vec<Hash> {
        (0..n).map(|i| hash_bytes(&i.to_le_bytes())).collect()
    }

    #[test]
    fn test_next_power_of_two() {
        assert_eq!(next_power_of_two(1), 1);
        assert_eq!(next_power_of_two(2), 2);
        assert_eq!(next_power_of_two(3), 4);
        assert_eq!(next_power_of_two(5), 8);
        assert_eq!(next_power_of_two(8), 8);
    }

    #[test]
    fn test_empty_merkle_root() {
        assert_eq!(merkle_root(&[]), Hash::zero());
        assert_eq!(calculate_id_merkle_root(&[]), Hash::zero());
        assert_eq!(calculate_hash_merkle_root(&[]), Hash::zero());
    }

    #[test]
    fn test_single_element() {
        let hashes = make_hashes(1);
        assert_eq!(merkle_root(&hashes), hashes[0]);
    }

    #[test]
    fn test_two_elements() {
        let hashes = make_hashes(2);
        assert_eq!(merkle_root(&hashes), hash_merkle_branches(&hashes[0], &hashes[1]));
    }

    #[test]
    fn test_odd_leaf_is_paired_with_zero() {
        let h = make_hashes(3);
        let left = hash_merkle_branches(&h[0], &h[1]);
        let right = hash_merkle_branches(&h[2], &Hash::zero());
        assert_eq!(merkle_root(&h), hash_merkle_branches(&left, &right));

        let duplicated = hash_merkle_branches(&h[2], &h[2]);
        assert_ne!(merkle_root(&h), hash_merkle_branches(&left, &duplicated));
    }

    #[test]
    fn test_five_leaves_layout() {
        let h = make_hashes(5);
        let zero = Hash::zero();
        let l1 = [
            hash_merkle_branches(&h[0], &h[1]),
            hash_merkle_branches(&h[2], &h[3]),
            hash_merkle_branches(&h[4], &zero),
        ];
        // the fourth level-1 node is absent, so its parent only sees the left child
        let l2 = [
            hash_merkle_branches(&l1[0], &l1[1]),
            hash_merkle_branches(&l1[2], &zero),
        ];
        assert_eq!(merkle_root(&h), hash_merkle_branches(&l2[0], &l2[1]));
    }

    #[test]
    fn test_merkle_root_order_sensitive() {
        let mut hashes = make_hashes(6);
        let root = merkle_root(&hashes);
        hashes.swap(1, 4);
        assert_ne!(root, merkle_root(&hashes));
    }
}
