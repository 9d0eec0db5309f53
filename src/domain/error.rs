//! Error taxonomy.
//!
//! Only faults that abort a whole call live here. Per-target faults that a
//! batch absorbs (invalid target, not permitted, timeout) are
//! [`Outcome`](crate::domain::models::Outcome) variants instead.

use crate::domain::models::OperationTarget;
use thiserror::Error;

/// Error reported by the attribute protocol transport.
///
/// The transport carries no structured GATT error codes, only a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Link could not be established or was dropped mid-call.
    #[error("connection error: {0}")]
    Connection(String),
    /// Any attribute protocol failure.
    #[error("{0}")]
    Gatt(String),
}

impl TransportError {
    pub fn message(&self) -> &str {
        match self {
            Self::Connection(msg) | Self::Gatt(msg) => msg,
        }
    }
}

/// Fatal errors raised to the caller.
#[derive(Debug, Error)]
pub enum OperationError {
    /// A transient fault kept recurring until the retry budget ran out.
    /// Aborts the whole batch.
    #[error("{attempts} tries exhausted for {target}: {source}")]
    RetriesExhausted {
        target: OperationTarget,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// The request itself is unusable (bad address, handle, mode, budget...).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Connection failure outside of a retried operation.
    #[error(transparent)]
    Connection(#[from] TransportError),
}

impl OperationError {
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}
