//! Persisted tree state: the depth plus the ordered commitment log.
//!
//! Only leaves are stored. Restoring replays them, so the restored root is
//! recomputed rather than trusted.

use anyhow::{anyhow, Result};
use primitives::{encode_u64, encode_u8, read_fixed, read_u64, read_u8, Commitment, DIGEST_LEN};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TreeError;
use crate::tree::CommitmentTree;

const SNAPSHOT_MAGIC: &[u8; 4] = b"CMT1";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct TreeSnapshot {
    pub depth: u8,
    pub leaves: Vec<Commitment>,
}

impl TreeSnapshot {
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + 1 + 8 + self.leaves.len() * DIGEST_LEN);
        out.extend_from_slice(SNAPSHOT_MAGIC);
        encode_u8(self.depth, &mut out);
        encode_u64(self.leaves.len() as u64, &mut out);
        for leaf in &self.leaves { out.extend_from_slice(&leaf.0); }
        out
    }

    pub fn from_canonical_bytes(mut data: &[u8]) -> Result<Self> {
        let magic = read_fixed::<4>(&mut data)?;
        if &magic != SNAPSHOT_MAGIC { return Err(anyhow!("bad snapshot magic")); }
        let depth = read_u8(&mut data)?;
        let count = read_u64(&mut data)?;
        if count.checked_mul(DIGEST_LEN as u64) != Some(data.len() as u64) {
            return Err(anyhow!("snapshot claims {} leaves but carries {} bytes", count, data.len()));
        }
        let mut leaves = Vec::with_capacity(count as usize);
        for _ in 0..count {
            leaves.push(Commitment(read_fixed::<DIGEST_LEN>(&mut data)?));
        }
        Ok(TreeSnapshot { depth, leaves })
    }
}

impl CommitmentTree {
    pub fn snapshot(&self) -> TreeSnapshot {
        TreeSnapshot { depth: self.depth(), leaves: self.commitments().collect() }
    }

    /// Rebuild a tree of the configured `depth` from persisted state. A
    /// snapshot taken at any other depth is rejected with `DepthMismatch`.
    pub fn restore(depth: u8, snapshot: &TreeSnapshot) -> Result<Self, TreeError> {
        if snapshot.depth != depth {
            return Err(TreeError::DepthMismatch { configured: depth, persisted: snapshot.depth });
        }
        let tree = CommitmentTree::from_commitments(depth, snapshot.leaves.iter().copied())?;
        debug!(depth, leaves = tree.len(), root = %tree.root(), "restored commitment tree");
        Ok(tree)
    }

    /// `restore` from canonical snapshot bytes.
    pub fn restore_from_bytes(depth: u8, bytes: &[u8]) -> Result<Self, TreeError> {
        let snapshot = TreeSnapshot::from_canonical_bytes(bytes).map_err(|e| TreeError::Snapshot(e.to_string()))?;
        Self::restore(depth, &snapshot)
    }
}
