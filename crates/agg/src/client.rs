//! Aggregation protocol client.

use std::sync::Arc;

use primitives::{AggregateProof, ApplicationDescriptor, PendingTransaction, VerificationKey};
use tracing::{debug, info, warn};

use crate::cache::VerificationKeyCache;
use crate::error::{AggError, Result};
use crate::transport::AggregatorTransport;

/// Outcome of `ensure_registered`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Registration {
    Registered,
    AlreadyPresent,
}

/// Drives the remote protocol over a transport and keeps the verification
/// key cache populated. Holds no per-application state: every method is a
/// single attempt, and failures are returned as-is for the caller to retry
/// (with deduplication) or give up.
pub struct AggregatorClient<T> {
    transport: T,
    vk_cache: Arc<VerificationKeyCache>,
}

impl<T: AggregatorTransport> AggregatorClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport, vk_cache: Arc::new(VerificationKeyCache::new()) }
    }

    /// Share one cache between several clients of the same process.
    pub fn with_cache(transport: T, vk_cache: Arc<VerificationKeyCache>) -> Self {
        Self { transport, vk_cache }
    }

    pub fn transport(&self) -> &T { &self.transport }

    pub fn verification_key_cache(&self) -> &Arc<VerificationKeyCache> { &self.vk_cache }

    /// Fetch the service verification key and store it in the cache.
    pub fn get_verification_key(&self) -> Result<VerificationKey> {
        let key = observe("get_verification_key", None, || self.transport.get_verification_key())?;
        if key.is_empty() {
            return Err(AggError::Protocol("service returned an empty verification key".to_string()));
        }
        self.vk_cache.set(key.clone());
        debug!(len = key.as_bytes().len(), "cached verification key");
        Ok(key)
    }

    /// Cached key if any, without contacting the service.
    pub fn cached_verification_key(&self) -> Option<VerificationKey> { self.vk_cache.get() }

    /// Cached key, or fetch it once if the cache is empty.
    pub fn verification_key(&self) -> Result<VerificationKey> {
        match self.vk_cache.get() {
            Some(key) => Ok(key),
            None => self.get_verification_key(),
        }
    }

    pub fn register_application(&self, application: &ApplicationDescriptor) -> Result<()> {
        check_name(&application.name)?;
        if application.verification_key.is_empty() {
            return Err(AggError::InvalidRequest("application verification key is empty".to_string()));
        }
        observe("register_application", Some(&application.name), || {
            self.transport.register_application(application)
        })
    }

    /// Register, treating an existing registration under the same name as
    /// success.
    pub fn ensure_registered(&self, application: &ApplicationDescriptor) -> Result<Registration> {
        match self.register_application(application) {
            Ok(()) => Ok(Registration::Registered),
            Err(AggError::AlreadyRegistered(_)) => Ok(Registration::AlreadyPresent),
            Err(e) => Err(e),
        }
    }

    /// Hand `transaction` to the service. On a transport failure after the
    /// request was sent the submission may or may not have been accepted;
    /// see `AggError::delivery`.
    pub fn submit_transaction(&self, transaction: &PendingTransaction) -> Result<()> {
        check_name(&transaction.application_name)?;
        if transaction.extended_proof.proof.is_empty() {
            return Err(AggError::InvalidRequest("proof is empty".to_string()));
        }
        observe("submit_transaction", Some(&transaction.application_name), || {
            self.transport.submit_transaction(transaction)
        })
    }

    /// Ask the service to close a batch for `application_name`.
    pub fn generate_aggregate_proof(&self, application_name: &str) -> Result<AggregateProof> {
        check_name(application_name)?;
        let proof = observe("generate_aggregate_proof", Some(application_name), || {
            self.transport.generate_aggregate_proof(application_name)
        })?;
        if proof.application_name != application_name {
            return Err(AggError::Protocol(format!(
                "aggregate proof is for `{}`, requested `{}`",
                proof.application_name, application_name
            )));
        }
        if !proof.is_well_formed() {
            return Err(AggError::Protocol("aggregate proof is empty".to_string()));
        }
        info!(
            application = application_name,
            covered = proof.submission_ids.len(),
            bytes = proof.proof.len(),
            "received aggregate proof"
        );
        Ok(proof)
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(AggError::InvalidRequest("application name must not be empty".to_string()));
    }
    Ok(())
}

fn observe<R>(op: &'static str, application: Option<&str>, call: impl FnOnce() -> Result<R>) -> Result<R> {
    let application = application.unwrap_or("-");
    info!(op, application, "calling aggregation service");
    call().map_err(|err| {
        warn!(op, application, delivery = ?err.delivery(), error = %err, "aggregation call failed");
        err
    })
}
