//! Error taxonomy for the aggregation protocol.

use thiserror::Error;

/// Where a transport failure happened relative to sending the request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportStage {
    /// No connection was established; the request never left the client.
    Connect,
    /// The request may have reached the service.
    Exchange,
}

/// What the caller can conclude about the remote effect of a failed call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// The service never saw the request. Safe to resend as-is.
    NotApplied,
    /// The service may have applied the request. Resend only with
    /// caller-side deduplication.
    Unknown,
    /// The service saw the request and deterministically refused it.
    Rejected,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AggError {
    #[error("transport failure ({stage:?}): {message}")]
    Transport { stage: TransportStage, message: String },

    #[error("protocol error: {0}")]
    Protocol(String),

    /// Failed local validation; nothing was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("application `{0}` is already registered")]
    AlreadyRegistered(String),

    #[error("application `{0}` is not registered")]
    UnknownApplication(String),

    #[error("proof rejected by the service: {0}")]
    InvalidProof(String),

    #[error("no pending transactions for application `{0}`")]
    NoPendingTransactions(String),
}

impl AggError {
    pub fn connect(message: impl Into<String>) -> Self {
        AggError::Transport { stage: TransportStage::Connect, message: message.into() }
    }

    pub fn exchange(message: impl Into<String>) -> Self {
        AggError::Transport { stage: TransportStage::Exchange, message: message.into() }
    }

    pub fn delivery(&self) -> Delivery {
        match self {
            AggError::InvalidRequest(_) | AggError::Config(_) => Delivery::NotApplied,
            AggError::Transport { stage: TransportStage::Connect, .. } => Delivery::NotApplied,
            AggError::Transport { stage: TransportStage::Exchange, .. } => Delivery::Unknown,
            // A malformed reply still means the request was processed somehow.
            AggError::Protocol(_) => Delivery::Unknown,
            AggError::AlreadyRegistered(_)
            | AggError::UnknownApplication(_)
            | AggError::InvalidProof(_)
            | AggError::NoPendingTransactions(_) => Delivery::Rejected,
        }
    }

    /// Transport failures are the only ones a caller may expect to clear up
    /// on their own. Retrying is still the caller's decision.
    pub fn is_transient(&self) -> bool {
        matches!(self, AggError::Transport { .. })
    }

    /// Deterministic refusals by the service.
    pub fn is_domain_rejection(&self) -> bool {
        self.delivery() == Delivery::Rejected
    }
}

pub type Result<T> = std::result::Result<T, AggError>;
