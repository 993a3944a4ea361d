//! Account State Commitment
//!
//! Leaves and the state root, built on the algebraic `hash_two`.
//!
//! ```text
//!                 Root
//!               /      \
//!          H(0,1)      H(2,3)
//!          /    \      /    \
//!       Leaf0 Leaf1 Leaf2  0 (padding)
//! ```
//!
//! Each leaf is `hash_three(public_identifier, balance, nonce)`.
//!
//! Combination order is frozen: leaves sit at positions `0..N`, the level is
//! padded with zero up to the next power of two, and each level is reduced
//! pairwise with `hash_two(left, right)`. Two leaves give
//! `hash_two(leaf0, leaf1)`; one leaf is its own root; no leaves give zero.
//! Any change here breaks every proof built against the paired circuit.

use rollup_account::{Account, AccountIndex};
use rollup_field::{FieldElement, hash_three, hash_two};

/// Compute account leaf: hash_three(pubkey, balance, nonce)
pub fn account_leaf(account: &Account) -> FieldElement {
    hash_three(&account.public_identifier, &account.balance, &account.nonce)
}

/// Root over an ordered sequence of leaves.
pub fn state_root(leaves: &[FieldElement]) -> FieldElement {
    StateTree::from_leaves(leaves.to_vec()).root()
}

/// Root over an ordered account set.
pub fn accounts_root(accounts: &[Account]) -> FieldElement {
    StateTree::from_accounts(accounts).root()
}

// Merkle Path

/// Inclusion witness for one leaf
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerklePath {
    /// Sibling at each level, leaf level first
    pub siblings: Vec<FieldElement>,
    /// Side of the running node at each level (0 = left, 1 = right)
    pub path_indices: Vec<u8>,
    /// The leaf position (account index)
    pub position: AccountIndex,
}

impl MerklePath {
    /// Verify that this path proves inclusion of a leaf in the given root
    pub fn verify(&self, leaf: &FieldElement, root: &FieldElement) -> bool {
        &self.compute_root(leaf) == root
    }

    /// Compute root from leaf using this path
    pub fn compute_root(&self, leaf: &FieldElement) -> FieldElement {
        self.siblings
            .iter()
            .zip(&self.path_indices)
            .fold(leaf.clone(), |current, (sibling, side)| {
                if *side == 1 {
                    hash_two(sibling, &current)
                } else {
                    hash_two(&current, sibling)
                }
            })
    }

    pub fn depth(&self) -> usize {
        self.siblings.len()
    }
}

// State Tree

/// Every level of the padded commitment tree, leaves first.
#[derive(Debug, Clone)]
pub struct StateTree {
    levels: Vec<Vec<FieldElement>>,
    leaf_count: usize,
}

impl StateTree {
    pub fn from_accounts(accounts: &[Account]) -> Self {
        Self::from_leaves(accounts.iter().map(account_leaf).collect())
    }

    pub fn from_leaves(mut leaves: Vec<FieldElement>) -> Self {
        let leaf_count = leaves.len();
        if leaf_count == 0 {
            return Self {
                levels: vec![vec![FieldElement::zero()]],
                leaf_count,
            };
        }

        leaves.resize(leaf_count.next_power_of_two(), FieldElement::zero());

        let mut levels = vec![leaves];
        while let Some(level) = levels.last().filter(|l| l.len() > 1) {
            let parent: Vec<FieldElement> = level
                .chunks_exact(2)
                .map(|pair| hash_two(&pair[0], &pair[1]))
                .collect();
            levels.push(parent);
        }

        Self { levels, leaf_count }
    }

    /// Get current root
    pub fn root(&self) -> FieldElement {
        self.levels
            .last()
            .and_then(|top| top.first())
            .cloned()
            .unwrap_or_else(FieldElement::zero)
    }

    /// Number of real (unpadded) leaves
    pub fn len(&self) -> usize {
        self.leaf_count
    }

    pub fn is_empty(&self) -> bool {
        self.leaf_count == 0
    }

    /// Number of hashing levels above the leaves
    pub fn depth(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    pub fn leaf(&self, position: AccountIndex) -> Option<&FieldElement> {
        if position >= self.leaf_count {
            return None;
        }
        self.levels.first()?.get(position)
    }

    /// Get Merkle path at a specific position
    pub fn path(&self, position: AccountIndex) -> Option<MerklePath> {
        if position >= self.leaf_count {
            return None;
        }

        let depth = self.depth();
        let mut siblings = Vec::with_capacity(depth);
        let mut path_indices = Vec::with_capacity(depth);
        let mut current_index = position;

        for level in &self.levels[..depth] {
            let is_right = current_index & 1 == 1;
            path_indices.push(u8::from(is_right));
            siblings.push(level[current_index ^ 1].clone());
            current_index /= 2;
        }

        Some(MerklePath {
            siblings,
            path_indices,
            position,
        })
    }
}

// Tests
