//! Canonical encoding and decoding for protocol types.
//!
//! All integers are big-endian; variable-length fields and element counts
//! carry a u64 prefix, so no in-memory length is ever truncated. Top-level encodings start with a one-byte version tag.

use anyhow::{anyhow, Result};

use crate::types::*;

pub const ENC_V1: u8 = 1;

impl ExtendedProof {
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + 16 + self.proof.len() + self.public_inputs.len() * PUBLIC_INPUT_LEN);
        out.push(ENC_V1);
        encode_bytes(&self.proof, &mut out);
        encode_len(self.public_inputs.len(), &mut out);
        for input in &self.public_inputs { out.extend_from_slice(&input.0); }
        out
    }

    pub fn from_canonical_bytes(mut data: &[u8]) -> Result<Self> {
        let ver = read_u8(&mut data)?;
        if ver != ENC_V1 { return Err(anyhow!("unsupported encoding version: {}", ver)); }
        let proof = read_vec(&mut data)?;
        let count = read_len(&mut data)?;
        let mut public_inputs = Vec::with_capacity(count.min(data.len() / PUBLIC_INPUT_LEN));
        for _ in 0..count {
            public_inputs.push(PublicInput(read_fixed::<PUBLIC_INPUT_LEN>(&mut data)?));
        }
        if !data.is_empty() { return Err(anyhow!("trailing bytes in ExtendedProof")); }
        Ok(ExtendedProof { proof, public_inputs })
    }
}

impl AggregateProof {
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + 24 + self.application_name.len() + self.submission_ids.len() * SUBMISSION_ID_LEN + self.proof.len());
        out.push(ENC_V1);
        encode_str(&self.application_name, &mut out);
        encode_len(self.submission_ids.len(), &mut out);
        for id in &self.submission_ids { out.extend_from_slice(&id.0); }
        encode_bytes(&self.proof, &mut out);
        out
    }

    pub fn from_canonical_bytes(mut data: &[u8]) -> Result<Self> {
        let ver = read_u8(&mut data)?;
        if ver != ENC_V1 { return Err(anyhow!("unsupported encoding version: {}", ver)); }
        let application_name = read_string(&mut data)?;
        let count = read_len(&mut data)?;
        let mut submission_ids = Vec::with_capacity(count.min(data.len() / SUBMISSION_ID_LEN));
        for _ in 0..count {
            submission_ids.push(SubmissionId(read_fixed::<SUBMISSION_ID_LEN>(&mut data)?));
        }
        let proof = read_vec(&mut data)?;
        if !data.is_empty() { return Err(anyhow!("trailing bytes in AggregateProof")); }
        Ok(AggregateProof { application_name, submission_ids, proof })
    }
}

// Encoding primitives

pub fn encode_u8(v: u8, out: &mut Vec<u8>) { out.push(v); }
pub fn encode_u64(v: u64, out: &mut Vec<u8>) { out.extend_from_slice(&v.to_be_bytes()); }

// usize is at most 64 bits on every supported target.
pub fn encode_len(len: usize, out: &mut Vec<u8>) { encode_u64(len as u64, out); }

pub fn encode_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    encode_len(bytes.len(), out);
    out.extend_from_slice(bytes);
}

pub fn encode_str(s: &str, out: &mut Vec<u8>) { encode_bytes(s.as_bytes(), out); }

pub fn read_u8(data: &mut &[u8]) -> Result<u8> {
    let (&v, rest) = data.split_first().ok_or_else(|| anyhow!("unexpected EOF"))?;
    *data = rest;
    Ok(v)
}

pub fn read_u64(data: &mut &[u8]) -> Result<u64> {
    Ok(u64::from_be_bytes(read_fixed::<8>(data)?))
}

pub fn read_len(data: &mut &[u8]) -> Result<usize> {
    let len = read_u64(data)?;
    usize::try_from(len).map_err(|_| anyhow!("length {} does not fit in memory", len))
}

pub fn read_vec(data: &mut &[u8]) -> Result<Vec<u8>> {
    let len = read_len(data)?;
    if data.len() < len { return Err(anyhow!("unexpected EOF")); }
    let v = data[..len].to_vec();
    *data = &data[len..];
    Ok(v)
}

pub fn read_string(data: &mut &[u8]) -> Result<String> {
    let bytes = read_vec(data)?;
    String::from_utf8(bytes).map_err(|e| anyhow!("invalid utf-8 string: {}", e))
}

pub fn read_fixed<const N: usize>(data: &mut &[u8]) -> Result<[u8; N]> {
    if data.len() < N { return Err(anyhow!("unexpected EOF")); }
    let mut out = [0u8; N];
    out.copy_from_slice(&data[..N]);
    *data = &data[N..];
    Ok(out)
}
