//! Transport boundary.
//!
//! The attribute protocol itself (framing, link layer, pairing) lives behind
//! [`GattTransport`]. Implementations wrap whatever stack actually talks to
//! the controller; this crate only orchestrates calls into it.

use crate::domain::error::TransportError;
use crate::domain::models::{ConnectionParams, Notification};

/// Callback receiving unsolicited notifications and indications.
pub type NotificationCallback = Box<dyn Fn(Notification) + Send + Sync>;

/// Response token of an asynchronous request.
///
/// Completions carry no error information: a token either holds a value or
/// it does not (yet).
pub trait PendingResponse {
    /// Value received so far, if any. Must not block.
    fn received(&self) -> Option<Vec<u8>>;
}

#[allow(async_fn_in_trait)]
pub trait GattTransport {
    type Response: PendingResponse;

    async fn connect(&mut self, params: &ConnectionParams) -> Result<(), TransportError>;

    /// Current link liveness. Must not block or reconnect.
    fn is_connected(&self) -> bool;

    async fn disconnect(&mut self);

    async fn read_by_handle(&mut self, handle: u16) -> Result<Vec<u8>, TransportError>;

    /// Returns the value and the handle it was read from.
    async fn read_by_uuid(&mut self, uuid: &str) -> Result<(Vec<u8>, u16), TransportError>;

    /// Returns the write acknowledgment.
    async fn write_to_handle(&mut self, handle: u16, data: &[u8])
        -> Result<Vec<u8>, TransportError>;

    async fn read_by_handle_async(&mut self, handle: u16) -> Result<Self::Response, TransportError>;

    /// The eventual value is prefixed by the source handle, two bytes in
    /// reverse order.
    async fn read_by_uuid_async(&mut self, uuid: &str) -> Result<Self::Response, TransportError>;

    async fn write_to_handle_async(
        &mut self,
        handle: u16,
        data: &[u8],
    ) -> Result<Self::Response, TransportError>;

    /// Install the receiver of pushed values, replacing any previous one.
    fn set_notification_callback(&mut self, callback: NotificationCallback);
}
