//! Fixed-depth append-only Merkle tree.
//!
//! Storage is one arena per level holding only the filled prefix of that
//! level: level k keeps the digests of nodes whose subtree contains at least
//! one filled leaf. Everything to the right of the prefix is an untouched
//! subtree and reads as the precomputed default digest for its level, so the
//! tree never materialises 2^D entries.

use primitives::{empty_leaf, hash_node, Commitment, Digest};
use tracing::debug;

use crate::error::TreeError;
use crate::params::{capacity, COMMITMENT_TREE_DEPTH, MAX_DEPTH};
use crate::path::AuthenticationPath;

/// Default digest of an untouched subtree at each level, leaves first.
/// `at(0)` is the empty-leaf digest and `at(k + 1) = H(at(k) || at(k))`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct EmptyDigests(Vec<Digest>);

impl EmptyDigests {
    pub fn new(depth: u8) -> Self {
        let mut table = Vec::with_capacity(depth as usize + 1);
        let mut current = empty_leaf();
        table.push(current);
        for _ in 0..depth {
            current = hash_node(&current, &current);
            table.push(current);
        }
        EmptyDigests(table)
    }

    /// Number of entries (depth + 1).
    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Default digest at `level`, or `None` above the root.
    pub fn at(&self, level: usize) -> Option<Digest> { self.0.get(level).copied() }

    // Callers stay within 0..=depth.
    fn level(&self, level: usize) -> Digest { self.0[level] }
}

fn check_depth(depth: u8) -> Result<(), TreeError> {
    if depth == 0 || depth > MAX_DEPTH {
        return Err(TreeError::InvalidDepth(depth));
    }
    Ok(())
}

#[derive(Clone, Debug)]
pub struct CommitmentTree {
    depth: u8,
    empty: EmptyDigests,
    // levels[0] are the leaves, levels[depth] holds the root once non-empty.
    levels: Vec<Vec<Digest>>,
}

impl CommitmentTree {
    pub fn new(depth: u8) -> Result<Self, TreeError> {
        check_depth(depth)?;
        Ok(Self::with_checked_depth(depth))
    }

    fn with_checked_depth(depth: u8) -> Self {
        Self {
            depth,
            empty: EmptyDigests::new(depth),
            levels: vec![Vec::new(); depth as usize + 1],
        }
    }

    /// Build a tree by inserting `commitments` in order.
    pub fn from_commitments<I>(depth: u8, commitments: I) -> Result<Self, TreeError>
    where
        I: IntoIterator<Item = Commitment>,
    {
        let mut tree = Self::new(depth)?;
        let cap = tree.capacity();
        for cm in commitments {
            if tree.len() >= cap {
                return Err(TreeError::TreeFull { capacity: cap });
            }
            tree.append_unchecked(cm);
        }
        Ok(tree)
    }

    pub fn depth(&self) -> u8 { self.depth }

    pub fn capacity(&self) -> u64 { capacity(self.depth) }

    /// Number of filled leaves; also the index the next insert will use.
    pub fn len(&self) -> u64 { self.levels[0].len() as u64 }

    pub fn is_empty(&self) -> bool { self.levels[0].is_empty() }

    pub fn is_full(&self) -> bool { self.len() >= self.capacity() }

    pub fn empty_digests(&self) -> &EmptyDigests { &self.empty }

    /// Append `commitment` at the next free slot and return its leaf index.
    /// Recomputes the `depth` ancestors of the new leaf and nothing else.
    pub fn insert(&mut self, commitment: Commitment) -> Result<u64, TreeError> {
        if self.is_full() {
            return Err(TreeError::TreeFull { capacity: self.capacity() });
        }
        let index = self.append_unchecked(commitment);
        debug!(index, depth = self.depth, "inserted commitment");
        Ok(index)
    }

    fn append_unchecked(&mut self, commitment: Commitment) -> u64 {
        let index = self.levels[0].len();
        self.levels[0].push(commitment.into());

        let mut pos = index;
        for level in 0..self.depth as usize {
            let parent = pos >> 1;
            let left = self.node(level, parent << 1);
            let right = self.node(level, (parent << 1) | 1);
            let digest = hash_node(&left, &right);
            let up = &mut self.levels[level + 1];
            // Filled prefixes grow by at most one node per level per insert.
            if parent < up.len() {
                up[parent] = digest;
            } else {
                up.push(digest);
            }
            pos = parent;
        }
        index as u64
    }

    /// Digest at `(level, pos)`, falling back to the level default for nodes
    /// outside the filled prefix.
    fn node(&self, level: usize, pos: usize) -> Digest {
        self.levels[level].get(pos).copied().unwrap_or_else(|| self.empty.level(level))
    }

    /// Current root. Equal to the default digest at level `depth` while empty.
    pub fn root(&self) -> Digest { self.node(self.depth as usize, 0) }

    /// Leaf value at `leaf_index`, if it has been filled.
    pub fn leaf(&self, leaf_index: u64) -> Option<Commitment> {
        let pos = usize::try_from(leaf_index).ok()?;
        self.levels[0].get(pos).map(|d| Commitment::from(*d))
    }

    /// Sibling digests from `leaf_index` up to the root.
    pub fn path_for(&self, leaf_index: u64) -> Result<AuthenticationPath, TreeError> {
        if leaf_index >= self.len() {
            return Err(TreeError::IndexOutOfRange { index: leaf_index, filled: self.len() });
        }
        // Bounded by a Vec length, so it fits in usize.
        let mut pos = leaf_index as usize;
        let mut siblings = Vec::with_capacity(self.depth as usize);
        for level in 0..self.depth as usize {
            siblings.push(self.node(level, pos ^ 1));
            pos >>= 1;
        }
        Ok(AuthenticationPath { leaf_index, siblings })
    }

    /// Iterate filled leaves in insertion order.
    pub fn commitments(&self) -> impl Iterator<Item = Commitment> + '_ {
        self.levels[0].iter().map(|d| Commitment::from(*d))
    }
}

impl Default for CommitmentTree {
    fn default() -> Self { Self::with_checked_depth(COMMITMENT_TREE_DEPTH) }
}

/// Recompute the root of a depth-`depth` tree holding `leaves` from scratch,
/// hashing level by level against the empty-subtree table. Independent of
/// `CommitmentTree`'s incremental bookkeeping.
pub fn root_from_leaves(depth: u8, leaves: &[Commitment]) -> Result<Digest, TreeError> {
    check_depth(depth)?;
    if leaves.len() as u64 > capacity(depth) {
        return Err(TreeError::TreeFull { capacity: capacity(depth) });
    }
    let empty = EmptyDigests::new(depth);
    let mut current: Vec<Digest> = leaves.iter().map(|cm| Digest::from(*cm)).collect();
    for level in 0..depth as usize {
        if current.is_empty() {
            break;
        }
        current = current
            .chunks(2)
            .map(|pair| {
                let right = pair.get(1).copied().unwrap_or_else(|| empty.level(level));
                hash_node(&pair[0], &right)
            })
            .collect();
    }
    Ok(current.first().copied().unwrap_or_else(|| empty.level(depth as usize)))
}
