//! Asynchronous operation tracking.
//!
//! Requests are submitted without waiting for completion, then a single
//! polling loop sweeps the pending queue until every entry has either
//! produced a value or outlived its own timeout. Each entry carries its own
//! clock, started when it was submitted, so there is no global deadline.
//!
//! Completions arrive in no particular order. Results come back in the order
//! the sweeps discover them, not in submission order: terminal submission
//! failures first, then resolved entries sweep by sweep.

use crate::domain::error::{OperationError, TransportError};
use crate::domain::models::{Handle, OperationKind, OperationResult, OperationTarget, Outcome};
use crate::domain::results::ResultAggregator;
use crate::infrastructure::bluetooth::connection::ConnectionManager;
use crate::infrastructure::bluetooth::executor::RetryBudget;
use crate::infrastructure::bluetooth::protocol;
use crate::infrastructure::bluetooth::transport::{GattTransport, PendingResponse};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, trace};

struct PendingOperation<R> {
    target: OperationTarget,
    token: R,
    submitted_at: Instant,
    input: Option<Vec<u8>>,
    attempts: u32,
}

pub struct AsyncOperationTracker<R: PendingResponse> {
    max_tries: u32,
    pending: Vec<PendingOperation<R>>,
    resolved: ResultAggregator,
}

impl<R: PendingResponse> AsyncOperationTracker<R> {
    /// Create an empty tracker allowing `max_tries` retries per submission
    pub fn new(max_tries: u32) -> Self {
        Self {
            max_tries,
            pending: Vec::new(),
            resolved: ResultAggregator::default(),
        }
    }

    /// Entries still waiting for a value or a timeout
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Results recorded so far
    pub fn resolved_len(&self) -> usize {
        self.resolved.len()
    }

    /// Submit one request under the same retry policy as the synchronous
    /// path. A terminal failure is recorded as resolved right away and never
    /// enters the queue.
    pub async fn submit<T>(
        &mut self,
        manager: &mut ConnectionManager<T>,
        target: &OperationTarget,
        kind: &OperationKind,
    ) -> Result<(), OperationError>
    where
        T: GattTransport<Response = R>,
    {
        if let (OperationTarget::Uuid(uuid), OperationKind::Write(_)) = (target, kind) {
            return Err(OperationError::invalid_configuration(format!(
                "cannot write to UUID {uuid}, writes address handles"
            )));
        }
        let input = match kind {
            OperationKind::Write(payload) => Some(payload.clone()),
            OperationKind::Read => None,
        };

        let mut budget = RetryBudget::new(self.max_tries);
        loop {
            budget.start_attempt();
            let result = match manager.ensure_connected().await {
                Ok(()) => Self::invoke(manager.transport(), target, kind).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(token) => {
                    trace!("Submitted {} (attempt {})", target, budget.attempts());
                    self.pending.push(PendingOperation {
                        target: target.clone(),
                        token,
                        submitted_at: Instant::now(),
                        input,
                        attempts: budget.attempts(),
                    });
                    return Ok(());
                }
                Err(e) => {
                    if let TransportError::Connection(_) = e {
                        manager.mark_lost();
                    }
                    if let Some(sentinel) = budget.on_failure(target, e)? {
                        self.resolved.record(
                            target.clone(),
                            target.handle(),
                            sentinel,
                            input,
                            budget.attempts(),
                        );
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn invoke<T>(
        transport: &mut T,
        target: &OperationTarget,
        kind: &OperationKind,
    ) -> Result<R, TransportError>
    where
        T: GattTransport<Response = R>,
    {
        match (target, kind) {
            (OperationTarget::Handle(h), OperationKind::Read) => {
                transport.read_by_handle_async(h.value()).await
            }
            (OperationTarget::Handle(h), OperationKind::Write(payload)) => {
                transport.write_to_handle_async(h.value(), payload).await
            }
            (OperationTarget::Uuid(uuid), OperationKind::Read) => {
                transport.read_by_uuid_async(uuid).await
            }
            (OperationTarget::Uuid(uuid), OperationKind::Write(_)) => Err(TransportError::Gatt(
                format!("write by UUID {uuid} is not supported"),
            )),
        }
    }

    pub async fn submit_reads<T>(
        &mut self,
        manager: &mut ConnectionManager<T>,
        targets: &[OperationTarget],
    ) -> Result<(), OperationError>
    where
        T: GattTransport<Response = R>,
    {
        for target in targets {
            self.submit(manager, target, &OperationKind::Read).await?;
        }
        Ok(())
    }

    /// Payloads outermost, handles innermost.
    pub async fn submit_writes<T>(
        &mut self,
        manager: &mut ConnectionManager<T>,
        handles: &[Handle],
        payloads: &[Vec<u8>],
    ) -> Result<(), OperationError>
    where
        T: GattTransport<Response = R>,
    {
        for payload in payloads {
            for handle in handles {
                debug!("Attempting to send {:02x?} to handle {}", payload, handle);
                self.submit(
                    manager,
                    &OperationTarget::Handle(*handle),
                    &OperationKind::Write(payload.clone()),
                )
                .await?;
            }
        }
        Ok(())
    }

    /// One pass over the pending queue. Returns how many entries remain.
    pub fn sweep(&mut self, timeout: Duration) -> usize {
        let mut still_pending = Vec::with_capacity(self.pending.len());
        for op in self.pending.drain(..) {
            if let Some(response) = op.token.received() {
                let (handle, value) = match &op.target {
                    OperationTarget::Uuid(_) => protocol::split_uuid_response(&response),
                    OperationTarget::Handle(h) => (Some(*h), response),
                };
                debug!("{} received {} bytes", op.target, value.len());
                self.resolved.record(
                    op.target,
                    handle,
                    Outcome::Value(value),
                    op.input,
                    op.attempts,
                );
            } else if op.submitted_at.elapsed() >= timeout {
                debug!("{} timed out after {:?}", op.target, timeout);
                let handle = op.target.handle();
                self.resolved
                    .record(op.target, handle, Outcome::Timeout, op.input, op.attempts);
            } else {
                still_pending.push(op);
            }
        }
        self.pending = still_pending;
        self.pending.len()
    }

    /// Poll until the queue is empty. Cannot be cancelled: every entry runs
    /// to a value or to its timeout.
    pub async fn await_all(
        mut self,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Vec<OperationResult> {
        loop {
            let remaining = self.sweep(timeout);
            if remaining == 0 {
                debug!("Out of responses");
                break;
            }
            trace!("Number of responses not yet received: {}", remaining);
            sleep(poll_interval).await;
        }
        self.resolved.finish()
    }
}
