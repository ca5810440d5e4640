use serde::{Deserialize, Serialize};

use crate::crypto::sha3_256;
use crate::errors::{PorError, PorResult};

const LEAF_DOMAIN: u8 = 0x00;
const INTERNAL_DOMAIN: u8 = 0x01;

/// Side on which a branch sibling is combined while folding toward the root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchStep {
    pub sibling: [u8; 32],
    pub direction: Direction,
}

pub type MerkleBranch = Vec<BranchStep>;

/// Hash leaf content under the leaf domain tag. Relay proofs use this for
/// their canonical hash, so the tree base level is the leaf hashes themselves
/// and a single-leaf tree has `root == leaf.hash()`.
pub fn leaf_hash(canonical: &[u8]) -> [u8; 32] {
    let mut data = Vec::with_capacity(1 + canonical.len());
    data.push(LEAF_DOMAIN);
    data.extend_from_slice(canonical);
    sha3_256(&data)
}

fn internal_hash(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut data = Vec::with_capacity(65);
    data.push(INTERNAL_DOMAIN);
    data.extend_from_slice(left);
    data.extend_from_slice(right);
    sha3_256(&data)
}

/// Number of branch steps a proof over `total` leaves must carry.
pub fn expected_branch_len(total: u64) -> usize {
    if total <= 1 {
        return 0;
    }
    (64 - (total - 1).leading_zeros()) as usize
}

/// Binary SHA3-256 merkle tree over already-hashed leaves, in insertion
/// order. Odd levels duplicate their last node.
#[derive(Clone, Debug, Default)]
pub struct MerkleTree {
    leaves: Vec<[u8; 32]>,
}

impl MerkleTree {
    pub fn new() -> Self {
        Self { leaves: Vec::new() }
    }

    pub fn from_leaves(leaves: Vec<[u8; 32]>) -> Self {
        Self { leaves }
    }

    pub fn push(&mut self, leaf: [u8; 32]) {
        self.leaves.push(leaf);
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn root(&self) -> Option<[u8; 32]> {
        if self.leaves.is_empty() {
            return None;
        }
        let mut level = self.leaves.clone();
        while level.len() > 1 {
            level = next_level(&level);
        }
        Some(level[0])
    }

    /// Sibling path from the leaf at `index` to the root.
    pub fn branch(&self, index: u64) -> PorResult<MerkleBranch> {
        let total = self.leaves.len() as u64;
        if index >= total {
            return Err(PorError::EvidenceMissing(format!(
                "leaf index {index} out of range for {total} leaves"
            )));
        }
        let mut branch = Vec::with_capacity(expected_branch_len(total));
        let mut level = self.leaves.clone();
        let mut position = index as usize;
        while level.len() > 1 {
            let sibling_position = position ^ 1;
            let sibling = if sibling_position < level.len() {
                level[sibling_position]
            } else {
                level[position]
            };
            let direction = if position % 2 == 0 {
                Direction::Right
            } else {
                Direction::Left
            };
            branch.push(BranchStep { sibling, direction });
            level = next_level(&level);
            position /= 2;
        }
        Ok(branch)
    }
}

fn next_level(level: &[[u8; 32]]) -> Vec<[u8; 32]> {
    let mut next = Vec::with_capacity((level.len() + 1) / 2);
    for chunk in level.chunks(2) {
        let left = chunk[0];
        let right = if chunk.len() == 2 { chunk[1] } else { chunk[0] };
        next.push(internal_hash(&left, &right));
    }
    next
}

/// Fold `leaf` upward through `branch`, placing each sibling on its recorded
/// side, and compare against `root`.
pub fn verify_branch(root: &[u8; 32], leaf: &[u8; 32], branch: &MerkleBranch) -> bool {
    let mut acc = *leaf;
    for step in branch {
        acc = match step.direction {
            Direction::Left => internal_hash(&step.sibling, &acc),
            Direction::Right => internal_hash(&acc, &step.sibling),
        };
    }
    acc == *root
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_leaves(count: usize) -> Vec<[u8; 32]> {
        (0..count)
            .map(|i| leaf_hash(format!("relay-{i}").as_bytes()))
            .collect()
    }

    #[test]
    fn empty_tree_has_no_root() {
        assert!(MerkleTree::new().root().is_none());
    }

    #[test]
    fn single_leaf_root_is_the_leaf_hash() {
        let leaves = sample_leaves(1);
        let tree = MerkleTree::from_leaves(leaves.clone());
        assert_eq!(tree.root(), Some(leaves[0]));
        assert!(tree.branch(0).unwrap().is_empty());
    }

    #[test]
    fn every_branch_verifies() {
        for count in 1..=9usize {
            let leaves = sample_leaves(count);
            let tree = MerkleTree::from_leaves(leaves.clone());
            let root = tree.root().unwrap();
            for (index, leaf) in leaves.iter().enumerate() {
                let branch = tree.branch(index as u64).unwrap();
                assert_eq!(branch.len(), expected_branch_len(count as u64));
                assert!(verify_branch(&root, leaf, &branch), "count {count} index {index}");
            }
        }
    }

    #[test]
    fn tampered_leaf_fails_verification() {
        let leaves = sample_leaves(5);
        let tree = MerkleTree::from_leaves(leaves);
        let root = tree.root().unwrap();
        let branch = tree.branch(2).unwrap();
        let forged = leaf_hash(b"forged");
        assert!(!verify_branch(&root, &forged, &branch));
    }

    #[test]
    fn branch_for_wrong_index_fails_verification() {
        let leaves = sample_leaves(4);
        let tree = MerkleTree::from_leaves(leaves.clone());
        let root = tree.root().unwrap();
        let branch = tree.branch(1).unwrap();
        assert!(!verify_branch(&root, &leaves[2], &branch));
    }

    #[test]
    fn incremental_growth_matches_one_shot() {
        let leaves = sample_leaves(7);
        let mut grown = MerkleTree::new();
        for leaf in &leaves {
            grown.push(*leaf);
        }
        assert_eq!(grown.root(), MerkleTree::from_leaves(leaves).root());
    }

    #[test]
    fn expected_lengths() {
        assert_eq!(expected_branch_len(0), 0);
        assert_eq!(expected_branch_len(1), 0);
        assert_eq!(expected_branch_len(2), 1);
        assert_eq!(expected_branch_len(3), 2);
        assert_eq!(expected_branch_len(4), 2);
        assert_eq!(expected_branch_len(5), 3);
        assert_eq!(expected_branch_len(8), 3);
        assert_eq!(expected_branch_len(9), 4);
    }

    proptest! {
        #[test]
        fn branches_verify_for_arbitrary_sizes(count in 1usize..64, index in 0usize..64) {
            let index = index % count;
            let leaves = sample_leaves(count);
            let tree = MerkleTree::from_leaves(leaves.clone());
            let root = tree.root().unwrap();
            let branch = tree.branch(index as u64).unwrap();
            prop_assert!(verify_branch(&root, &leaves[index], &branch));
        }
    }
}
