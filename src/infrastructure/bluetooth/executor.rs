//! Synchronous operation execution with classified bounded retry.

use crate::domain::error::{OperationError, TransportError};
use crate::domain::models::{Handle, OperationKind, OperationResult, OperationTarget, Outcome};
use crate::domain::results::ResultAggregator;
use crate::infrastructure::bluetooth::connection::ConnectionManager;
use crate::infrastructure::bluetooth::protocol::ErrorClass;
use crate::infrastructure::bluetooth::transport::GattTransport;
use tracing::{debug, warn};

/// Attempt accounting for one operation on one target.
///
/// `max_tries` bounds the retries after the first call, so a target sees at
/// most `max_tries + 1` transport invocations. Zero means a single call.
#[derive(Debug)]
pub(crate) struct RetryBudget {
    max_tries: u32,
    attempts: u32,
}

impl RetryBudget {
    pub(crate) fn new(max_tries: u32) -> Self {
        Self {
            max_tries,
            attempts: 0,
        }
    }

    pub(crate) fn start_attempt(&mut self) {
        self.attempts += 1;
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Classify a failed attempt.
    ///
    /// `Ok(Some(_))` is a terminal sentinel, `Ok(None)` means try again and
    /// `Err` means the budget is spent.
    pub(crate) fn on_failure(
        &self,
        target: &OperationTarget,
        error: TransportError,
    ) -> Result<Option<Outcome>, OperationError> {
        let class = ErrorClass::classify(&error);
        if let Some(sentinel) = class.sentinel() {
            debug!("{} failed terminally: {}", target, error);
            return Ok(Some(sentinel));
        }
        if self.attempts > self.max_tries {
            warn!(
                "{} tries exceeded for {}, aborting: {}",
                self.max_tries, target, error
            );
            return Err(OperationError::RetriesExhausted {
                target: target.clone(),
                attempts: self.attempts,
                source: error,
            });
        }
        debug!(
            "Error on {} (retry {}/{}): {} Trying again",
            target, self.attempts, self.max_tries, error
        );
        Ok(None)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SyncOperationExecutor {
    max_tries: u32,
}

impl SyncOperationExecutor {
    /// Create an executor allowing `max_tries` retries per target
    pub fn new(max_tries: u32) -> Self {
        Self { max_tries }
    }

    /// Perform one read or write, reconnecting and retrying transient faults.
    pub async fn execute<T: GattTransport>(
        &self,
        manager: &mut ConnectionManager<T>,
        target: &OperationTarget,
        kind: &OperationKind,
    ) -> Result<OperationResult, OperationError> {
        if let (OperationTarget::Uuid(uuid), OperationKind::Write(_)) = (target, kind) {
            return Err(OperationError::invalid_configuration(format!(
                "cannot write to UUID {uuid}, writes address handles"
            )));
        }

        let mut budget = RetryBudget::new(self.max_tries);
        let (handle, outcome) = loop {
            budget.start_attempt();
            let result = match manager.ensure_connected().await {
                Ok(()) => Self::invoke(manager.transport(), target, kind).await,
                Err(e) => Err(e),
            };
            match result {
                Ok((data, handle)) => break (handle, Outcome::Value(data)),
                Err(e) => {
                    if let TransportError::Connection(_) = e {
                        manager.mark_lost();
                    }
                    if let Some(sentinel) = budget.on_failure(target, e)? {
                        break (target.handle(), sentinel);
                    }
                }
            }
        };

        let input = match kind {
            OperationKind::Write(payload) => Some(payload.clone()),
            OperationKind::Read => None,
        };
        Ok(OperationResult {
            target: target.clone(),
            handle,
            outcome,
            input,
            attempts: budget.attempts(),
        })
    }

    async fn invoke<T: GattTransport>(
        transport: &mut T,
        target: &OperationTarget,
        kind: &OperationKind,
    ) -> Result<(Vec<u8>, Option<Handle>), TransportError> {
        match (target, kind) {
            (OperationTarget::Handle(h), OperationKind::Read) => {
                let data = transport.read_by_handle(h.value()).await?;
                Ok((data, Some(*h)))
            }
            (OperationTarget::Handle(h), OperationKind::Write(payload)) => {
                let ack = transport.write_to_handle(h.value(), payload).await?;
                Ok((ack, Some(*h)))
            }
            (OperationTarget::Uuid(uuid), OperationKind::Read) => {
                let (data, handle) = transport.read_by_uuid(uuid).await?;
                Ok((data, Some(Handle(handle))))
            }
            (OperationTarget::Uuid(uuid), OperationKind::Write(_)) => Err(TransportError::Gatt(
                format!("write by UUID {uuid} is not supported"),
            )),
        }
    }

    /// Read every target in order, one result each.
    pub async fn read_all<T: GattTransport>(
        &self,
        manager: &mut ConnectionManager<T>,
        targets: &[OperationTarget],
    ) -> Result<Vec<OperationResult>, OperationError> {
        let mut results = ResultAggregator::with_capacity(targets.len());
        for target in targets {
            let r = self.execute(manager, target, &OperationKind::Read).await?;
            results.record(r.target, r.handle, r.outcome, r.input, r.attempts);
        }
        Ok(results.finish())
    }

    /// Write every payload to every handle, payloads outermost.
    pub async fn write_all<T: GattTransport>(
        &self,
        manager: &mut ConnectionManager<T>,
        handles: &[Handle],
        payloads: &[Vec<u8>],
    ) -> Result<Vec<OperationResult>, OperationError> {
        let mut results = ResultAggregator::with_capacity(handles.len() * payloads.len());
        for payload in payloads {
            for handle in handles {
                debug!("Attempting to send {:02x?} to handle {}", payload, handle);
                let r = self
                    .execute(
                        manager,
                        &OperationTarget::Handle(*handle),
                        &OperationKind::Write(payload.clone()),
                    )
                    .await?;
                results.record(r.target, r.handle, r.outcome, r.input, r.attempts);
            }
        }
        Ok(results.finish())
    }
}
