//! Append-only commitment tree for Tachyon-style note commitments.
//!
//! This crate provides a fixed-depth Merkle tree over output commitments,
//! authentication paths for membership proofs, and a canonical snapshot
//! format so any party can rebuild the tree from the commitment log.

pub mod error;
pub mod path;
pub mod snapshot;
pub mod tree;

pub use error::TreeError;
pub use path::AuthenticationPath;
pub use snapshot::TreeSnapshot;
pub use tree::{root_from_leaves, CommitmentTree, EmptyDigests};

/// Tree parameters (protocol constants).
pub mod params {
    /// Tree depth D = 32 → 2^32 leaves. Fixed for all deployments of one
    /// proving scheme.
    pub const COMMITMENT_TREE_DEPTH: u8 = 32;
    /// Largest depth whose capacity 2^D still fits in a u64 leaf index.
    pub const MAX_DEPTH: u8 = 63;

    /// Number of leaves a tree of `depth` can hold. `depth` must already be
    /// checked against `MAX_DEPTH`.
    pub(crate) const fn capacity(depth: u8) -> u64 { 1u64 << depth }
}
