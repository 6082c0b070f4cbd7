//! Shared types for the commitment tree and the aggregation client:
//! digests, commitments, proofs, registrations and aggregate proofs.

pub mod types;
pub mod encode;
pub mod digest;

// Re-export all public items from modules for convenience
pub use types::*;
pub use encode::*;
pub use digest::*;
