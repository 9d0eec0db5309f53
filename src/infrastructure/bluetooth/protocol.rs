//! GATT Protocol Helpers
//!
//! Constants and small wire-level helpers shared by the executors:
//! transport error classification and decoding of asynchronous UUID read
//! responses.

use crate::domain::error::TransportError;
use crate::domain::models::{Handle, Outcome};
use tracing::trace;

/// Message fragment the transport uses for an unknown handle
pub const INVALID_HANDLE_MSG: &str = "Invalid handle";

/// Message fragment the transport uses when the attribute refuses the
/// operation ("Attribute can't be read", "Attribute can't be written", ...)
pub const NOT_PERMITTED_MSG: &str = "Attribute can't";

/// Sleep between sweeps of the pending queue in milliseconds
pub const POLL_INTERVAL_MS: u64 = 100;

/// Length of the handle prefix on asynchronous UUID read responses
pub const UUID_RESPONSE_HANDLE_LEN: usize = 2;

/// How a failed transport call is treated by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Handle or UUID does not exist. Terminal, reported as a sentinel.
    InvalidTarget,
    /// Attribute forbids the operation. Terminal, reported as a sentinel.
    NotPermitted,
    /// Anything else, consumes retry budget.
    Transient,
}

impl ErrorClass {
    pub fn classify(error: &TransportError) -> Self {
        match error {
            TransportError::Connection(_) => Self::Transient,
            TransportError::Gatt(msg) if msg.contains(INVALID_HANDLE_MSG) => Self::InvalidTarget,
            TransportError::Gatt(msg) if msg.contains(NOT_PERMITTED_MSG) => Self::NotPermitted,
            TransportError::Gatt(_) => Self::Transient,
        }
    }

    /// Sentinel for terminal classes, `None` for transient ones.
    pub fn sentinel(self) -> Option<Outcome> {
        match self {
            Self::InvalidTarget => Some(Outcome::InvalidTarget),
            Self::NotPermitted => Some(Outcome::NotPermitted),
            Self::Transient => None,
        }
    }
}

/// Split an asynchronous UUID read response into the source handle and the
/// value.
///
/// The first two bytes are the handle, byte-reversed relative to the order
/// they arrive in. Shorter responses carry no handle.
pub fn split_uuid_response(response: &[u8]) -> (Option<Handle>, Vec<u8>) {
    if response.len() < UUID_RESPONSE_HANDLE_LEN {
        return (None, response.to_vec());
    }
    let (prefix, value) = response.split_at(UUID_RESPONSE_HANDLE_LEN);
    let handle = u16::from_be_bytes([prefix[1], prefix[0]]);
    trace!("UUID response handle {:04x}, {} value bytes", handle, value.len());
    (Some(Handle(handle)), value.to_vec())
}
