//! Digest derivations for tree nodes, empty leaves and submissions.

use blake2b_simd::Params as Blake2bParams;

use crate::encode::{encode_str, encode_u64, ENC_V1};
use crate::types::*;

/// Domain separators for BLAKE2b-256 derivations.
const DS_NODE_V1: &[u8; 16] = b"cmtree.node.v1\0\0"; // 14 + 2 = 16
const DS_EMPTY_V1: &[u8; 16] = b"cmtree.empty.v1\0"; // 15 + 1 = 16
const DS_SUBMIT_V1: &[u8; 16] = b"agg.submit.v1\0\0\0"; // 13 + 3 = 16

fn blake2b_256(personal: &[u8; 16], input: &[u8]) -> Digest {
    let hash = Blake2bParams::new().hash_length(DIGEST_LEN).personal(personal).hash(input);
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(hash.as_bytes());
    Digest(out)
}

/// Parent digest of two sibling nodes: H(left || right).
pub fn hash_node(left: &Digest, right: &Digest) -> Digest {
    let mut input = [0u8; 2 * DIGEST_LEN];
    input[..DIGEST_LEN].copy_from_slice(&left.0);
    input[DIGEST_LEN..].copy_from_slice(&right.0);
    blake2b_256(DS_NODE_V1, &input)
}

/// Canonical value of an unfilled leaf.
pub fn empty_leaf() -> Digest {
    blake2b_256(DS_EMPTY_V1, &[])
}

/// Derive the deduplication key of a submission. Covers the application name,
/// the proof with its ordered public inputs, and the fee.
pub fn derive_submission_id(tx: &PendingTransaction) -> SubmissionId {
    let mut buf = Vec::with_capacity(64 + tx.extended_proof.proof.len());
    buf.push(ENC_V1);
    encode_str(&tx.application_name, &mut buf);
    buf.extend_from_slice(&tx.extended_proof.to_canonical_bytes());
    encode_u64(tx.fee, &mut buf);
    SubmissionId(blake2b_256(DS_SUBMIT_V1, &buf).0)
}
