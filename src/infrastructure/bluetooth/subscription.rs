//! Subscription listener.
//!
//! Writes the client characteristic configuration to each handle, then
//! watches the link forever, re-arming every handle after a reconnect.
//! Pushed values go straight to the caller's callback; nothing is buffered
//! or replayed.

use crate::domain::error::OperationError;
use crate::domain::models::{Handle, OperationKind, OperationResult, OperationTarget, SubscriptionMode};
use crate::infrastructure::bluetooth::connection::ConnectionManager;
use crate::infrastructure::bluetooth::executor::SyncOperationExecutor;
use crate::infrastructure::bluetooth::transport::{GattTransport, NotificationCallback};
use std::convert::Infallible;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

pub struct SubscriptionListener {
    handles: Vec<Handle>,
    mode: SubscriptionMode,
    executor: SyncOperationExecutor,
    liveness_poll_interval: Duration,
}

impl SubscriptionListener {
    pub fn new(
        handles: Vec<Handle>,
        mode: SubscriptionMode,
        max_tries: u32,
        liveness_poll_interval: Duration,
    ) -> Self {
        Self {
            handles,
            mode,
            executor: SyncOperationExecutor::new(max_tries),
            liveness_poll_interval,
        }
    }

    pub fn mode(&self) -> SubscriptionMode {
        self.mode
    }

    /// Install the callback, connect, arm every handle and listen until a
    /// fatal error.
    pub async fn subscribe<T: GattTransport>(
        &self,
        manager: &mut ConnectionManager<T>,
        callback: NotificationCallback,
    ) -> Result<Infallible, OperationError> {
        manager.set_notification_callback(callback);
        manager.ensure_connected().await?;
        self.arm(manager).await?;
        self.run(manager).await
    }

    /// Write the configuration value to every handle.
    ///
    /// Invalid or forbidden handles are logged and reported in the returned
    /// results; only retry exhaustion is fatal.
    pub async fn arm<T: GattTransport>(
        &self,
        manager: &mut ConnectionManager<T>,
    ) -> Result<Vec<OperationResult>, OperationError> {
        let config = self.mode.config_value().to_vec();
        let mut results = Vec::with_capacity(self.handles.len());
        for handle in &self.handles {
            debug!("Writing {:02x?} to handle {}", config, handle);
            let result = self
                .executor
                .execute(
                    manager,
                    &OperationTarget::Handle(*handle),
                    &OperationKind::Write(config.clone()),
                )
                .await?;
            if !result.outcome.is_value() {
                warn!("Could not configure handle {}: {}", handle, result.outcome);
            }
            results.push(result);
        }
        Ok(results)
    }

    /// Idle while connected; after a drop, reconnect and re-arm.
    pub async fn run<T: GattTransport>(
        &self,
        manager: &mut ConnectionManager<T>,
    ) -> Result<Infallible, OperationError> {
        info!("Listening for communications");
        loop {
            if manager.is_connected() {
                sleep(self.liveness_poll_interval).await;
                continue;
            }

            manager.mark_lost();
            info!("Connection lost, re-connecting subscribe");
            if let Err(e) = manager.connect().await {
                warn!("Reconnect failed: {}", e);
                sleep(self.liveness_poll_interval).await;
                continue;
            }
            self.arm(manager).await?;
        }
    }
}
