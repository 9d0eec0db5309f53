//! Scripted transport for tests.
//!
//! Clones share state, so a test keeps one handle to script responses and
//! inspect call counts while the orchestrator owns another.

use crate::domain::error::TransportError;
use crate::domain::models::{ConnectionParams, Handle, Notification, NotificationKind};
use crate::infrastructure::bluetooth::transport::{
    GattTransport, NotificationCallback, PendingResponse,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Op {
    Read(u16),
    ReadUuid(String),
    Write(u16),
    ReadAsync(u16),
    ReadUuidAsync(String),
    WriteAsync(u16),
}

/// When an asynchronous response becomes available.
#[derive(Debug, Clone)]
pub(crate) enum Resolution {
    /// Value shows up after `polls` unsuccessful polls
    After { polls: u32, value: Vec<u8> },
    Never,
}

#[derive(Clone)]
pub(crate) struct MockResponse {
    inner: Arc<Mutex<(u32, Option<Vec<u8>>)>>,
}

impl PendingResponse for MockResponse {
    fn received(&self) -> Option<Vec<u8>> {
        let mut inner = self.inner.lock().unwrap();
        if inner.0 > 0 {
            inner.0 -= 1;
            return None;
        }
        inner.1.clone()
    }
}

/// Scripted results, the last one repeats once the script runs out.
struct Script<R> {
    queue: VecDeque<R>,
    last: Option<R>,
}

impl<R: Clone> Script<R> {
    fn new(results: Vec<R>) -> Self {
        Self {
            queue: results.into(),
            last: None,
        }
    }

    fn next(&mut self) -> Option<R> {
        if let Some(r) = self.queue.pop_front() {
            self.last = Some(r.clone());
            return Some(r);
        }
        self.last.clone()
    }
}

#[derive(Default)]
struct MockState {
    connected: bool,
    connect_failures: u32,
    connect_calls: u32,
    last_params: Option<ConnectionParams>,
    reads: HashMap<Op, Script<Result<Vec<u8>, TransportError>>>,
    uuid_reads: HashMap<String, Script<Result<(Vec<u8>, u16), TransportError>>>,
    submits: HashMap<Op, Script<Result<(), TransportError>>>,
    resolutions: HashMap<Op, Resolution>,
    calls: HashMap<Op, u32>,
    writes: Vec<(u16, Vec<u8>)>,
    callback: Option<NotificationCallback>,
}

#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub(crate) fn fail_next_connects(&self, count: u32) {
        self.lock().connect_failures = count;
    }

    pub(crate) fn drop_link(&self) {
        self.lock().connected = false;
    }

    pub(crate) fn connect_calls(&self) -> u32 {
        self.lock().connect_calls
    }

    pub(crate) fn last_params(&self) -> Option<ConnectionParams> {
        self.lock().last_params.clone()
    }

    pub(crate) fn script_read(&self, handle: u16, results: Vec<Result<Vec<u8>, TransportError>>) {
        self.lock().reads.insert(Op::Read(handle), Script::new(results));
    }

    pub(crate) fn script_read_uuid(
        &self,
        uuid: &str,
        results: Vec<Result<(Vec<u8>, u16), TransportError>>,
    ) {
        self.lock()
            .uuid_reads
            .insert(uuid.to_string(), Script::new(results));
    }

    pub(crate) fn script_write(&self, handle: u16, results: Vec<Result<Vec<u8>, TransportError>>) {
        self.lock().reads.insert(Op::Write(handle), Script::new(results));
    }

    pub(crate) fn script_read_async(
        &self,
        handle: u16,
        submits: Vec<Result<(), TransportError>>,
        resolution: Resolution,
    ) {
        self.script_async(Op::ReadAsync(handle), submits, resolution);
    }

    pub(crate) fn script_read_uuid_async(
        &self,
        uuid: &str,
        submits: Vec<Result<(), TransportError>>,
        resolution: Resolution,
    ) {
        self.script_async(Op::ReadUuidAsync(uuid.to_string()), submits, resolution);
    }

    pub(crate) fn script_write_async(
        &self,
        handle: u16,
        submits: Vec<Result<(), TransportError>>,
        resolution: Resolution,
    ) {
        self.script_async(Op::WriteAsync(handle), submits, resolution);
    }

    fn script_async(&self, op: Op, submits: Vec<Result<(), TransportError>>, resolution: Resolution) {
        let mut state = self.lock();
        state.submits.insert(op.clone(), Script::new(submits));
        state.resolutions.insert(op, resolution);
    }

    pub(crate) fn read_calls(&self, handle: u16) -> u32 {
        self.calls(Op::Read(handle))
    }

    pub(crate) fn uuid_read_calls(&self, uuid: &str) -> u32 {
        self.calls(Op::ReadUuid(uuid.to_string()))
    }

    pub(crate) fn write_calls(&self, handle: u16) -> u32 {
        self.calls(Op::Write(handle))
    }

    pub(crate) fn async_read_calls(&self, handle: u16) -> u32 {
        self.calls(Op::ReadAsync(handle))
    }

    pub(crate) fn async_write_calls(&self, handle: u16) -> u32 {
        self.calls(Op::WriteAsync(handle))
    }

    fn calls(&self, op: Op) -> u32 {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Every payload written, sync or async, in call order.
    pub(crate) fn writes(&self) -> Vec<(u16, Vec<u8>)> {
        self.lock().writes.clone()
    }

    /// Deliver a pushed value through the installed callback.
    pub(crate) fn push(&self, kind: NotificationKind, handle: u16, data: &[u8]) {
        let state = self.lock();
        if let Some(callback) = &state.callback {
            callback(Notification {
                kind,
                handle: Handle(handle),
                data: data.to_vec(),
            });
        }
    }

    fn record(state: &mut MockState, op: &Op) -> Result<(), TransportError> {
        *state.calls.entry(op.clone()).or_default() += 1;
        if !state.connected {
            return Err(TransportError::Connection("Not connected".into()));
        }
        Ok(())
    }

    /// Connection errors take the link down with them.
    fn settle<R>(state: &mut MockState, result: Result<R, TransportError>) -> Result<R, TransportError> {
        if let Err(TransportError::Connection(_)) = &result {
            state.connected = false;
        }
        result
    }

    fn submit(&self, op: Op, payload: Option<&[u8]>) -> Result<MockResponse, TransportError> {
        let mut state = self.lock();
        Self::record(&mut state, &op)?;
        let submitted = state
            .submits
            .get_mut(&op)
            .and_then(Script::next)
            .unwrap_or(Ok(()));
        Self::settle(&mut state, submitted)?;

        if let (Op::WriteAsync(handle), Some(data)) = (&op, payload) {
            state.writes.push((*handle, data.to_vec()));
        }

        let (polls, value) = match state.resolutions.get(&op) {
            Some(Resolution::After { polls, value }) => (*polls, Some(value.clone())),
            Some(Resolution::Never) | None => (0, None),
        };
        Ok(MockResponse {
            inner: Arc::new(Mutex::new((polls, value))),
        })
    }
}

impl GattTransport for MockTransport {
    type Response = MockResponse;

    async fn connect(&mut self, params: &ConnectionParams) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.connect_calls += 1;
        state.last_params = Some(params.clone());
        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            state.connected = false;
            return Err(TransportError::Connection("Connection refused".into()));
        }
        state.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    async fn disconnect(&mut self) {
        self.lock().connected = false;
    }

    async fn read_by_handle(&mut self, handle: u16) -> Result<Vec<u8>, TransportError> {
        let mut state = self.lock();
        let op = Op::Read(handle);
        Self::record(&mut state, &op)?;
        let result = state
            .reads
            .get_mut(&op)
            .and_then(Script::next)
            .unwrap_or_else(|| Err(TransportError::Gatt("Invalid handle".into())));
        Self::settle(&mut state, result)
    }

    async fn read_by_uuid(&mut self, uuid: &str) -> Result<(Vec<u8>, u16), TransportError> {
        let mut state = self.lock();
        Self::record(&mut state, &Op::ReadUuid(uuid.to_string()))?;
        let result = state
            .uuid_reads
            .get_mut(uuid)
            .and_then(Script::next)
            .unwrap_or_else(|| Err(TransportError::Gatt("Invalid handle".into())));
        Self::settle(&mut state, result)
    }

    async fn write_to_handle(
        &mut self,
        handle: u16,
        data: &[u8],
    ) -> Result<Vec<u8>, TransportError> {
        let mut state = self.lock();
        let op = Op::Write(handle);
        Self::record(&mut state, &op)?;
        let result = state
            .reads
            .get_mut(&op)
            .and_then(Script::next)
            .unwrap_or(Ok(Vec::new()));
        if result.is_ok() {
            state.writes.push((handle, data.to_vec()));
        }
        Self::settle(&mut state, result)
    }

    async fn read_by_handle_async(&mut self, handle: u16) -> Result<MockResponse, TransportError> {
        self.submit(Op::ReadAsync(handle), None)
    }

    async fn read_by_uuid_async(&mut self, uuid: &str) -> Result<MockResponse, TransportError> {
        self.submit(Op::ReadUuidAsync(uuid.to_string()), None)
    }

    async fn write_to_handle_async(
        &mut self,
        handle: u16,
        data: &[u8],
    ) -> Result<MockResponse, TransportError> {
        self.submit(Op::WriteAsync(handle), Some(data))
    }

    fn set_notification_callback(&mut self, callback: NotificationCallback) {
        self.lock().callback = Some(callback);
    }
}
