//! The remote aggregation service boundary.

use std::sync::Arc;

use primitives::{AggregateProof, ApplicationDescriptor, PendingTransaction, VerificationKey};

use crate::error::Result;

/// One method per remote operation. Each call is a single blocking exchange;
/// implementations keep no session state between calls and never retry.
pub trait AggregatorTransport {
    fn get_verification_key(&self) -> Result<VerificationKey>;

    fn register_application(&self, application: &ApplicationDescriptor) -> Result<()>;

    fn submit_transaction(&self, transaction: &PendingTransaction) -> Result<()>;

    fn generate_aggregate_proof(&self, application_name: &str) -> Result<AggregateProof>;
}

impl<T: AggregatorTransport + ?Sized> AggregatorTransport for &T {
    fn get_verification_key(&self) -> Result<VerificationKey> { (**self).get_verification_key() }

    fn register_application(&self, application: &ApplicationDescriptor) -> Result<()> {
        (**self).register_application(application)
    }

    fn submit_transaction(&self, transaction: &PendingTransaction) -> Result<()> {
        (**self).submit_transaction(transaction)
    }

    fn generate_aggregate_proof(&self, application_name: &str) -> Result<AggregateProof> {
        (**self).generate_aggregate_proof(application_name)
    }
}

impl<T: AggregatorTransport + ?Sized> AggregatorTransport for Arc<T> {
    fn get_verification_key(&self) -> Result<VerificationKey> { (**self).get_verification_key() }

    fn register_application(&self, application: &ApplicationDescriptor) -> Result<()> {
        (**self).register_application(application)
    }

    fn submit_transaction(&self, transaction: &PendingTransaction) -> Result<()> {
        (**self).submit_transaction(transaction)
    }

    fn generate_aggregate_proof(&self, application_name: &str) -> Result<AggregateProof> {
        (**self).generate_aggregate_proof(application_name)
    }
}
