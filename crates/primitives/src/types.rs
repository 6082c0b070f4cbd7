//! Core data types shared by the tree, the transaction builder and the
//! aggregation client.

use serde::{Deserialize, Serialize};

pub const DIGEST_LEN: usize = 32;
pub const PUBLIC_INPUT_LEN: usize = 32;
pub const SUBMISSION_ID_LEN: usize = 32;

/// 32-byte BLAKE2b-256 output. Tree nodes and roots are digests.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Digest(pub [u8; DIGEST_LEN]);

impl Digest {
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self { Digest(bytes) }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] { &self.0 }

    pub fn to_hex(&self) -> String { hex::encode(self.0) }

    /// Parse a 64-character hex string, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> anyhow::Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut out = [0u8; DIGEST_LEN];
        hex::decode_to_slice(s, &mut out)?;
        Ok(Digest(out))
    }
}

impl core::fmt::Debug for Digest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl core::fmt::Display for Digest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Commitment to one transaction output note. Stored as a tree leaf.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug, Default)]
pub struct Commitment(pub [u8; DIGEST_LEN]);

impl From<Commitment> for Digest {
    fn from(cm: Commitment) -> Self { Digest(cm.0) }
}

impl From<Digest> for Commitment {
    fn from(d: Digest) -> Self { Commitment(d.0) }
}

/// One public input of a proof, a field element in canonical 32-byte form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug, Default)]
pub struct PublicInput(pub [u8; PUBLIC_INPUT_LEN]);

impl From<Digest> for PublicInput {
    fn from(d: Digest) -> Self { PublicInput(d.0) }
}

impl PublicInput {
    /// Big-endian embedding of a 64-bit value, left padded with zeros.
    pub fn from_u64(v: u64) -> Self {
        let mut out = [0u8; PUBLIC_INPUT_LEN];
        out[PUBLIC_INPUT_LEN - 8..].copy_from_slice(&v.to_be_bytes());
        PublicInput(out)
    }
}

/// Public parameters required to check proofs for one proving system.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
#[serde(transparent)]
pub struct VerificationKey(#[serde(with = "serde_bytes")] pub Vec<u8>);

impl VerificationKey {
    pub fn as_bytes(&self) -> &[u8] { &self.0 }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

/// A standalone proof together with its ordered public inputs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct ExtendedProof {
    #[serde(with = "serde_bytes")]
    pub proof: Vec<u8>,
    pub public_inputs: Vec<PublicInput>,
}

/// Registration payload: the application name and the verification key of
/// the circuit whose proofs it will submit.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct ApplicationDescriptor {
    pub name: String,
    pub verification_key: VerificationKey,
}

impl ApplicationDescriptor {
    pub fn new(name: impl Into<String>, verification_key: VerificationKey) -> Self {
        Self { name: name.into(), verification_key }
    }
}

/// Content-derived identifier of a submission. See `derive_submission_id`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct SubmissionId(pub [u8; SUBMISSION_ID_LEN]);

impl core::fmt::Debug for SubmissionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "SubmissionId({})", hex::encode(self.0))
    }
}

/// A transaction handed to the aggregation service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct PendingTransaction {
    pub application_name: String,
    pub extended_proof: ExtendedProof,
    /// Fee offered for inclusion; services may prioritise on it.
    pub fee: u64,
}

impl PendingTransaction {
    pub fn new(application_name: impl Into<String>, extended_proof: ExtendedProof, fee: u64) -> Self {
        Self { application_name: application_name.into(), extended_proof, fee }
    }

    /// Deduplication key over the full submission content. Callers that retry
    /// after a transport failure use this to recognise duplicates.
    pub fn submission_id(&self) -> SubmissionId {
        crate::digest::derive_submission_id(self)
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct AggregateProof {
    pub application_name: String,
    // Submissions covered by this aggregate, in batch order.
    pub submission_ids: Vec<SubmissionId>,
    // Opaque proof bytes; the format belongs to the proving system.
    #[serde(with = "serde_bytes")]
    pub proof: Vec<u8>,
}

impl AggregateProof {
    pub fn is_well_formed(&self) -> bool {
        !self.proof.is_empty() && !self.submission_ids.is_empty()
    }
}
