//! Client for the proof aggregation service: register an application,
//! submit proved transactions, and fetch aggregate proofs together with the
//! verification key that checks them.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod grpc;
pub mod local;
pub mod transport;
pub mod wire;

pub use cache::VerificationKeyCache;
pub use client::{AggregatorClient, Registration};
pub use config::ClientConfig;
pub use error::{AggError, Delivery, TransportStage};
pub use grpc::GrpcTransport;
pub use local::{Aggregator, LocalAggregator};
pub use transport::AggregatorTransport;
