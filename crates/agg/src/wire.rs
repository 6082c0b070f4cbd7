//! Protobuf messages of the `aggregator.Aggregator` gRPC service and their
//! conversions to domain types. Replies are validated on the way in; any
//! shape violation is a protocol error.

use primitives::{
    AggregateProof, ApplicationDescriptor, ExtendedProof, PendingTransaction, PublicInput, SubmissionId,
    VerificationKey, PUBLIC_INPUT_LEN, SUBMISSION_ID_LEN,
};

use crate::error::{AggError, Result};

pub mod proto {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct VerificationKey {
        #[prost(bytes = "vec", tag = "1")]
        pub raw: ::prost::alloc::vec::Vec<u8>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ApplicationRegistration {
        #[prost(string, tag = "1")]
        pub name: ::prost::alloc::string::String,
        #[prost(message, optional, tag = "2")]
        pub vk: ::core::option::Option<VerificationKey>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ExtendedProof {
        #[prost(bytes = "vec", tag = "1")]
        pub proof: ::prost::alloc::vec::Vec<u8>,
        #[prost(bytes = "vec", repeated, tag = "2")]
        pub public_inputs: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct TransactionToAggregate {
        #[prost(string, tag = "1")]
        pub application_name: ::prost::alloc::string::String,
        #[prost(message, optional, tag = "2")]
        pub extended_proof: ::core::option::Option<ExtendedProof>,
        #[prost(uint64, tag = "3")]
        pub fee: u64,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ApplicationName {
        #[prost(string, tag = "1")]
        pub name: ::prost::alloc::string::String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct AggregateProof {
        #[prost(string, tag = "1")]
        pub application_name: ::prost::alloc::string::String,
        #[prost(bytes = "vec", repeated, tag = "2")]
        pub submission_ids: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
        #[prost(bytes = "vec", tag = "3")]
        pub proof: ::prost::alloc::vec::Vec<u8>,
    }
}

/// Fully qualified method paths.
pub mod paths {
    pub const GET_VERIFICATION_KEY: &str = "/aggregator.Aggregator/GetVerificationKey";
    pub const REGISTER_APPLICATION: &str = "/aggregator.Aggregator/RegisterApplication";
    pub const SUBMIT_TRANSACTION: &str = "/aggregator.Aggregator/SubmitTransaction";
    pub const GENERATE_AGGREGATE_PROOF: &str = "/aggregator.Aggregator/GenerateAggregateProof";
}

impl From<&VerificationKey> for proto::VerificationKey {
    fn from(vk: &VerificationKey) -> Self { proto::VerificationKey { raw: vk.0.clone() } }
}

impl From<&ApplicationDescriptor> for proto::ApplicationRegistration {
    fn from(app: &ApplicationDescriptor) -> Self {
        proto::ApplicationRegistration { name: app.name.clone(), vk: Some((&app.verification_key).into()) }
    }
}

impl From<&ExtendedProof> for proto::ExtendedProof {
    fn from(p: &ExtendedProof) -> Self {
        proto::ExtendedProof {
            proof: p.proof.clone(),
            public_inputs: p.public_inputs.iter().map(|i| i.0.to_vec()).collect(),
        }
    }
}

impl From<&PendingTransaction> for proto::TransactionToAggregate {
    fn from(tx: &PendingTransaction) -> Self {
        proto::TransactionToAggregate {
            application_name: tx.application_name.clone(),
            extended_proof: Some((&tx.extended_proof).into()),
            fee: tx.fee,
        }
    }
}

impl TryFrom<proto::VerificationKey> for VerificationKey {
    type Error = AggError;

    fn try_from(msg: proto::VerificationKey) -> Result<Self> {
        if msg.raw.is_empty() {
            return Err(AggError::Protocol("empty verification key".to_string()));
        }
        Ok(VerificationKey(msg.raw))
    }
}

impl TryFrom<proto::AggregateProof> for AggregateProof {
    type Error = AggError;

    fn try_from(msg: proto::AggregateProof) -> Result<Self> {
        let submission_ids = msg
            .submission_ids
            .into_iter()
            .map(|raw| fixed::<SUBMISSION_ID_LEN>("submission id", &raw).map(SubmissionId))
            .collect::<Result<Vec<_>>>()?;
        Ok(AggregateProof { application_name: msg.application_name, submission_ids, proof: msg.proof })
    }
}

/// Service-side view of a submission; used by servers and tests.
impl TryFrom<proto::TransactionToAggregate> for PendingTransaction {
    type Error = AggError;

    fn try_from(msg: proto::TransactionToAggregate) -> Result<Self> {
        let proof = msg.extended_proof.ok_or_else(|| AggError::Protocol("missing extended proof".to_string()))?;
        let public_inputs = proof
            .public_inputs
            .iter()
            .map(|raw| fixed::<PUBLIC_INPUT_LEN>("public input", raw).map(PublicInput))
            .collect::<Result<Vec<_>>>()?;
        Ok(PendingTransaction::new(
            msg.application_name,
            ExtendedProof { proof: proof.proof, public_inputs },
            msg.fee,
        ))
    }
}

fn fixed<const N: usize>(what: &str, raw: &[u8]) -> Result<[u8; N]> {
    <[u8; N]>::try_from(raw)
        .map_err(|_| AggError::Protocol(format!("{} must be {} bytes, got {}", what, N, raw.len())))
}
