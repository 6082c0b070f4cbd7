//! In-process aggregation service.
//!
//! Keeps one application pool per registered name: the application's
//! verification key plus a queue of pending transactions ordered by fee
//! (highest first, ties by arrival). Closing a batch takes up to
//! `batch_size` transactions off the queue and binds them into an
//! aggregate proof object. The proof bytes are a BLAKE2b binding of the
//! batch, not a succinct proof; real proving happens in a remote service.

use std::collections::{BinaryHeap, HashMap};
use std::cmp::Ordering;
use std::sync::{Mutex, PoisonError};

use blake2b_simd::Params as Blake2bParams;
use primitives::{
    encode_bytes, encode_str, AggregateProof, ApplicationDescriptor, PendingTransaction, SubmissionId,
    VerificationKey,
};
use tracing::debug;

use crate::error::{AggError, Result};
use crate::transport::AggregatorTransport;

pub const DEFAULT_BATCH_SIZE: usize = 2;

const DS_AGG_PROOF_V1: &[u8; 16] = b"agg.proof.v1\0\0\0\0"; // 12 + 4 = 16

struct QueuedTx {
    fee: u64,
    seq: u64,
    id: SubmissionId,
}

impl PartialEq for QueuedTx {
    fn eq(&self, other: &Self) -> bool { self.cmp(other) == Ordering::Equal }
}

impl Eq for QueuedTx {}

impl PartialOrd for QueuedTx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for QueuedTx {
    // Max-heap: higher fee first, then earlier arrival.
    fn cmp(&self, other: &Self) -> Ordering {
        self.fee.cmp(&other.fee).then_with(|| other.seq.cmp(&self.seq))
    }
}

struct ApplicationPool {
    verification_key: VerificationKey,
    queue: BinaryHeap<QueuedTx>,
}

#[derive(Default)]
struct State {
    pools: HashMap<String, ApplicationPool>,
    next_seq: u64,
}

/// Builds an aggregate over a batch of submission ids.
#[derive(Default)]
pub struct Aggregator {
    ids: Vec<SubmissionId>,
}

impl Aggregator {
    pub fn new() -> Self { Self { ids: Vec::new() } }

    pub fn add(&mut self, id: SubmissionId) { self.ids.push(id); }

    pub fn build(self, application_name: &str, service_vk: &VerificationKey, application_vk: &VerificationKey) -> AggregateProof {
        let mut buf = Vec::new();
        encode_str(application_name, &mut buf);
        encode_bytes(service_vk.as_bytes(), &mut buf);
        encode_bytes(application_vk.as_bytes(), &mut buf);
        for id in &self.ids { buf.extend_from_slice(&id.0); }
        let hash = Blake2bParams::new().hash_length(64).personal(DS_AGG_PROOF_V1).hash(&buf);
        AggregateProof {
            application_name: application_name.to_string(),
            submission_ids: self.ids,
            proof: hash.as_bytes().to_vec(),
        }
    }
}

pub struct LocalAggregator {
    verification_key: VerificationKey,
    batch_size: usize,
    state: Mutex<State>,
}

impl LocalAggregator {
    pub fn new(verification_key: VerificationKey) -> Self {
        Self::with_batch_size(verification_key, DEFAULT_BATCH_SIZE)
    }

    pub fn with_batch_size(verification_key: VerificationKey, batch_size: usize) -> Self {
        Self { verification_key, batch_size: batch_size.max(1), state: Mutex::new(State::default()) }
    }

    pub fn batch_size(&self) -> usize { self.batch_size }

    /// Pending transactions queued for `application_name`, if registered.
    pub fn pending(&self, application_name: &str) -> Option<usize> {
        self.lock().pools.get(application_name).map(|pool| pool.queue.len())
    }

    pub fn is_registered(&self, application_name: &str) -> bool {
        self.lock().pools.contains_key(application_name)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AggregatorTransport for LocalAggregator {
    fn get_verification_key(&self) -> Result<VerificationKey> {
        Ok(self.verification_key.clone())
    }

    fn register_application(&self, application: &ApplicationDescriptor) -> Result<()> {
        let mut state = self.lock();
        if state.pools.contains_key(&application.name) {
            return Err(AggError::AlreadyRegistered(application.name.clone()));
        }
        state.pools.insert(
            application.name.clone(),
            ApplicationPool { verification_key: application.verification_key.clone(), queue: BinaryHeap::new() },
        );
        debug!(application = %application.name, "registered application pool");
        Ok(())
    }

    fn submit_transaction(&self, transaction: &PendingTransaction) -> Result<()> {
        let mut state = self.lock();
        let seq = state.next_seq;
        let pool = state
            .pools
            .get_mut(&transaction.application_name)
            .ok_or_else(|| AggError::UnknownApplication(transaction.application_name.clone()))?;
        let proof = &transaction.extended_proof;
        if proof.proof.is_empty() {
            return Err(AggError::InvalidProof("empty proof".to_string()));
        }
        if proof.public_inputs.is_empty() {
            return Err(AggError::InvalidProof("missing public inputs".to_string()));
        }
        pool.queue.push(QueuedTx { fee: transaction.fee, seq, id: transaction.submission_id() });
        let pending = pool.queue.len();
        state.next_seq += 1;
        debug!(application = %transaction.application_name, pending, "queued transaction");
        Ok(())
    }

    fn generate_aggregate_proof(&self, application_name: &str) -> Result<AggregateProof> {
        let mut state = self.lock();
        let pool = state
            .pools
            .get_mut(application_name)
            .ok_or_else(|| AggError::UnknownApplication(application_name.to_string()))?;
        if pool.queue.is_empty() {
            return Err(AggError::NoPendingTransactions(application_name.to_string()));
        }
        let mut aggregator = Aggregator::new();
        for _ in 0..self.batch_size {
            match pool.queue.pop() {
                Some(queued) => aggregator.add(queued.id),
                None => break,
            }
        }
        Ok(aggregator.build(application_name, &self.verification_key, &pool.verification_key))
    }
}
