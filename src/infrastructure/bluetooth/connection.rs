//! BLE Connection Module
//!
//! Owns the single connection of a session and reconnects on demand.
//! Liveness is polled, never pushed: callers check [`ConnectionManager::is_connected`]
//! (or call [`ConnectionManager::ensure_connected`]) right before every
//! transport call, retries included.

use crate::domain::error::TransportError;
use crate::domain::models::{BdAddr, ConnectionParams, LinkState, SessionEvent};
use crate::infrastructure::bluetooth::transport::{GattTransport, NotificationCallback};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub struct ConnectionManager<T: GattTransport> {
    transport: T,
    params: ConnectionParams,
    state: LinkState,
    event_sender: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl<T: GattTransport> ConnectionManager<T> {
    /// Create a manager for `params`. Nothing connects until first use.
    pub fn new(transport: T, params: ConnectionParams) -> Self {
        Self {
            transport,
            params,
            state: LinkState::Dead,
            event_sender: None,
        }
    }

    /// Publish connection status changes on `event_sender`.
    pub fn with_events(mut self, event_sender: mpsc::UnboundedSender<SessionEvent>) -> Self {
        self.event_sender = Some(event_sender);
        self
    }

    /// Parameters used for every (re)connect
    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    /// Address of the remote device
    pub fn address(&self) -> BdAddr {
        self.params.address
    }

    /// State as of the last connect/disconnect or detected loss.
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Establish or re-establish the connection.
    pub async fn connect(&mut self) -> Result<(), TransportError> {
        let address = self.params.address;
        info!(
            "Connecting to {} (adapter: {:?}, address type: {:?}, security: {:?})",
            address, self.params.adapter, self.params.address_type, self.params.security_level
        );
        self.send_event(SessionEvent::Connecting(address));

        match self.transport.connect(&self.params).await {
            Ok(()) => {
                self.state = LinkState::Live;
                info!("Connected to {}", address);
                self.send_event(SessionEvent::Connected(address));
                Ok(())
            }
            Err(e) => {
                self.state = LinkState::Dead;
                warn!("Connection to {} failed: {}", address, e);
                self.send_event(SessionEvent::ConnectFailed {
                    address,
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Current liveness as reported by the transport. No side effects.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Reconnect if the link is down.
    pub async fn ensure_connected(&mut self) -> Result<(), TransportError> {
        if self.is_connected() {
            return Ok(());
        }
        if self.state == LinkState::Live {
            self.mark_lost();
        }
        self.connect().await
    }

    /// Record a link drop noticed by a caller.
    pub fn mark_lost(&mut self) {
        if self.state == LinkState::Live {
            warn!("Connection to {} lost", self.params.address);
            self.state = LinkState::Dead;
            self.send_event(SessionEvent::LinkLost(self.params.address));
        }
    }

    /// Close the link if one is open
    pub async fn disconnect(&mut self) {
        if self.state == LinkState::Dead && !self.is_connected() {
            return;
        }
        self.transport.disconnect().await;
        self.state = LinkState::Dead;
        info!("Disconnected from {}", self.params.address);
    }

    /// Route pushed values to `callback`
    pub fn set_notification_callback(&mut self, callback: NotificationCallback) {
        debug!("Installing notification callback");
        self.transport.set_notification_callback(callback);
    }

    /// Transport access for a single call. Check liveness first.
    pub fn transport(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give the transport back, dropping the session state
    pub fn into_transport(self) -> T {
        self.transport
    }

    fn send_event(&self, event: SessionEvent) {
        if let Some(sender) = &self.event_sender {
            let _ = sender.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::bluetooth::mock::MockTransport;

    fn params() -> ConnectionParams {
        ConnectionParams::new("11:22:33:44:55:66".parse().unwrap())
    }

    #[tokio::test]
    async fn test_connect_marks_live() {
        let mock = MockTransport::new();
        let mut manager = ConnectionManager::new(mock.clone(), params());
        assert!(!manager.is_connected());
        assert_eq!(manager.state(), LinkState::Dead);

        manager.connect().await.unwrap();
        assert!(manager.is_connected());
        assert_eq!(manager.state(), LinkState::Live);
        assert_eq!(mock.connect_calls(), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_propagates() {
        let mock = MockTransport::new();
        mock.fail_next_connects(1);
        let mut manager = ConnectionManager::new(mock.clone(), params());

        let err = manager.connect().await.unwrap_err();
        assert!(matches!(err, TransportError::Connection(_)));
        assert_eq!(manager.state(), LinkState::Dead);
    }

    #[tokio::test]
    async fn test_ensure_connected_is_lazy() {
        let mock = MockTransport::new();
        let mut manager = ConnectionManager::new(mock.clone(), params());

        manager.ensure_connected().await.unwrap();
        manager.ensure_connected().await.unwrap();
        assert_eq!(mock.connect_calls(), 1);

        mock.drop_link();
        manager.ensure_connected().await.unwrap();
        assert_eq!(mock.connect_calls(), 2);
    }

    #[tokio::test]
    async fn test_events_published() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mock = MockTransport::new();
        let mut manager = ConnectionManager::new(mock.clone(), params()).with_events(tx);
        let address = manager.address();

        manager.connect().await.unwrap();
        mock.drop_link();
        manager.ensure_connected().await.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                SessionEvent::Connecting(address),
                SessionEvent::Connected(address),
                SessionEvent::LinkLost(address),
                SessionEvent::Connecting(address),
                SessionEvent::Connected(address),
            ]
        );
    }

    #[tokio::test]
    async fn test_disconnect() {
        let mock = MockTransport::new();
        let mut manager = ConnectionManager::new(mock.clone(), params());
        manager.connect().await.unwrap();
        manager.disconnect().await;
        assert!(!manager.is_connected());
        assert_eq!(manager.state(), LinkState::Dead);
    }
}
