//! Bluetooth Module
//!
//! Orchestrates GATT reads, writes and subscriptions over a caller-supplied
//! attribute protocol transport.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    BluetoothService                      │
//! │  (Public API: read / write, sync and async, subscribe)   │
//! └──────┬──────────────────┬─────────────────────┬─────────┘
//!        │                  │                     │
//!        ▼                  ▼                     ▼
//! ┌─────────────┐   ┌───────────────┐   ┌──────────────────┐
//! │  Executor   │   │    Tracker    │   │   Subscription   │
//! │ - retry     │   │ - submit      │   │ - CCCD writes    │
//! │ - classify  │   │ - sweep/poll  │   │ - re-arm on loss │
//! └──────┬──────┘   └───────┬───────┘   └────────┬─────────┘
//!        └──────────────────┼────────────────────┘
//!                           ▼
//!                  ┌─────────────────┐
//!                  │   Connection    │
//!                  │ - lazy connect  │
//!                  └────────┬────────┘
//!                           ▼
//!                  ┌─────────────────┐
//!                  │  GattTransport  │
//!                  └─────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`transport`] - Transport boundary consumed by this crate
//! - [`protocol`] - Error classification and response decoding
//! - [`connection`] - Connection ownership and lazy reconnection
//! - [`executor`] - Synchronous operations with bounded retry
//! - [`tracker`] - Asynchronous submissions and the polling loop
//! - [`subscription`] - Notification/indication listener
//! - [`service`] - Main service coordinator

pub mod connection;
pub mod executor;
#[cfg(test)]
pub(crate) mod mock;
pub mod protocol;
pub mod service;
pub mod subscription;
pub mod tracker;
pub mod transport;

// Re-export main service for convenience
pub use service::BluetoothService;
pub use transport::{GattTransport, NotificationCallback, PendingResponse};
