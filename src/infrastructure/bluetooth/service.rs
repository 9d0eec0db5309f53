//! Bluetooth Service Module
//!
//! Public surface of the crate: batch reads and writes (synchronous and
//! asynchronous) and the subscription listener, all running against the one
//! connection owned by the service.

use crate::domain::error::OperationError;
use crate::domain::models::{
    BdAddr, ConnectionParams, Handle, OperationResult, OperationTarget, SessionEvent,
    SubscriptionMode,
};
use crate::domain::results::summarize;
use crate::domain::settings::{OperationSettings, Settings};
use crate::infrastructure::bluetooth::{
    connection::ConnectionManager,
    executor::SyncOperationExecutor,
    subscription::SubscriptionListener,
    tracker::AsyncOperationTracker,
    transport::{GattTransport, NotificationCallback},
};
use std::convert::Infallible;
use tokio::sync::mpsc;
use tracing::{info, info_span, Instrument};

/// Orchestrates GATT operations against one device
pub struct BluetoothService<T: GattTransport> {
    manager: ConnectionManager<T>,
    settings: OperationSettings,
}

impl<T: GattTransport> BluetoothService<T> {
    pub fn new(
        transport: T,
        params: ConnectionParams,
        settings: OperationSettings,
    ) -> Result<Self, OperationError> {
        Ok(Self {
            manager: ConnectionManager::new(transport, params),
            settings: settings.validated()?,
        })
    }

    /// Build from persisted settings and a textual device address.
    pub fn from_settings(
        transport: T,
        address: &str,
        settings: &Settings,
    ) -> Result<Self, OperationError> {
        let address: BdAddr = address.parse()?;
        let params = ConnectionParams::new(address)
            .with_adapter(settings.adapter.clone())
            .with_address_type(settings.address_type)
            .with_security_level(settings.security_level);
        Self::new(transport, params, settings.operation_settings()?)
    }

    /// Publish connection status changes on `event_sender`.
    pub fn with_events(mut self, event_sender: mpsc::UnboundedSender<SessionEvent>) -> Self {
        self.manager = self.manager.with_events(event_sender);
        self
    }

    pub fn settings(&self) -> &OperationSettings {
        &self.settings
    }

    pub fn connection(&self) -> &ConnectionManager<T> {
        &self.manager
    }

    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    /// Read every target, one result per target in request order.
    pub async fn read(
        &mut self,
        targets: &[OperationTarget],
    ) -> Result<Vec<OperationResult>, OperationError> {
        let span = info_span!("read", address = %self.manager.address(), count = targets.len());
        let executor = SyncOperationExecutor::new(self.settings.max_tries);
        let manager = &mut self.manager;
        async move {
            let results = executor.read_all(manager, targets).await?;
            log_summary(&results);
            Ok::<_, OperationError>(results)
        }
        .instrument(span)
        .await
    }

    /// Submit every read, then poll until each has a value or timed out.
    ///
    /// Results are in discovery order, which need not match `targets`.
    pub async fn read_async(
        &mut self,
        targets: &[OperationTarget],
    ) -> Result<Vec<OperationResult>, OperationError> {
        let span =
            info_span!("read_async", address = %self.manager.address(), count = targets.len());
        let settings = self.settings;
        let manager = &mut self.manager;
        async move {
            let mut tracker = AsyncOperationTracker::new(settings.max_tries);
            tracker.submit_reads(manager, targets).await?;
            let results = tracker
                .await_all(settings.async_timeout, settings.poll_interval)
                .await;
            log_summary(&results);
            Ok::<_, OperationError>(results)
        }
        .instrument(span)
        .await
    }

    /// Write every payload to every handle, one result per pair with
    /// payloads outermost.
    pub async fn write(
        &mut self,
        handles: &[Handle],
        payloads: &[Vec<u8>],
    ) -> Result<Vec<OperationResult>, OperationError> {
        let span = info_span!(
            "write",
            address = %self.manager.address(),
            handles = handles.len(),
            payloads = payloads.len()
        );
        let executor = SyncOperationExecutor::new(self.settings.max_tries);
        let manager = &mut self.manager;
        async move {
            let results = executor.write_all(manager, handles, payloads).await?;
            log_summary(&results);
            Ok::<_, OperationError>(results)
        }
        .instrument(span)
        .await
    }

    /// Asynchronous counterpart of [`write`](Self::write). Results are in
    /// discovery order.
    pub async fn write_async(
        &mut self,
        handles: &[Handle],
        payloads: &[Vec<u8>],
    ) -> Result<Vec<OperationResult>, OperationError> {
        let span = info_span!(
            "write_async",
            address = %self.manager.address(),
            handles = handles.len(),
            payloads = payloads.len()
        );
        let settings = self.settings;
        let manager = &mut self.manager;
        async move {
            let mut tracker = AsyncOperationTracker::new(settings.max_tries);
            tracker.submit_writes(manager, handles, payloads).await?;
            let results = tracker
                .await_all(settings.async_timeout, settings.poll_interval)
                .await;
            log_summary(&results);
            Ok::<_, OperationError>(results)
        }
        .instrument(span)
        .await
    }

    /// Enable `mode` on every handle and stream pushed values to `callback`.
    ///
    /// Never returns while things go well; an out-of-range mode fails before
    /// anything is written.
    pub async fn subscribe(
        &mut self,
        handles: &[Handle],
        mode: u8,
        callback: NotificationCallback,
    ) -> Result<Infallible, OperationError> {
        let mode = SubscriptionMode::try_from(mode)?;
        let span = info_span!("subscribe", address = %self.manager.address(), mode = ?mode);
        let listener = SubscriptionListener::new(
            handles.to_vec(),
            mode,
            self.settings.max_tries,
            self.settings.liveness_poll_interval,
        );
        let manager = &mut self.manager;
        async move { listener.subscribe(manager, callback).await }
            .instrument(span)
            .await
    }

    pub async fn disconnect(&mut self) {
        self.manager.disconnect().await;
    }
}

fn log_summary(results: &[OperationResult]) {
    let summary = summarize(results);
    info!(
        "{} results: {} values, {} invalid, {} not permitted, {} timed out",
        summary.total(),
        summary.values,
        summary.invalid_targets,
        summary.not_permitted,
        summary.timeouts
    );
}
