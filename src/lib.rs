//! BLE Suite
//!
//! Read, write and subscribe operations against the GATT attributes of a
//! Bluetooth Low Energy peripheral, orchestrated on top of an attribute
//! protocol transport supplied by the caller.
//!
//! The entry point is [`BluetoothService`]: it owns one connection to one
//! device and exposes synchronous and asynchronous batch reads and writes
//! plus an indefinite subscription listener.

pub mod domain;
pub mod infrastructure;

pub use domain::error::{OperationError, TransportError};
pub use domain::models::{
    AddressType, BdAddr, ConnectionParams, Handle, Notification, NotificationKind,
    OperationResult, OperationTarget, Outcome, SecurityLevel, SubscriptionMode,
};
pub use domain::payload::{Delimiter, PayloadSource};
pub use domain::results::{split_by_kind, summarize, OutcomeSummary};
pub use domain::settings::{OperationSettings, Settings, SettingsService};
pub use infrastructure::bluetooth::{BluetoothService, GattTransport, PendingResponse};
