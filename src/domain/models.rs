use crate::domain::error::OperationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bluetooth device address (BD_ADDR), most significant octet first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BdAddr([u8; 6]);

impl BdAddr {
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for BdAddr {
    type Err = OperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            OperationError::invalid_configuration(format!(
                "{s} Bluetooth address is not valid. Please supply a valid Bluetooth address value."
            ))
        };

        let mut octets = [0u8; 6];
        let mut parts = s.trim().split(':');
        for octet in octets.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 {
                return Err(invalid());
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressType {
    #[default]
    Public,
    Random,
}

impl FromStr for AddressType {
    type Err = OperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "random" => Ok(Self::Random),
            other => Err(OperationError::invalid_configuration(format!(
                "unknown address type {other:?} (expected public or random)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl FromStr for SecurityLevel {
    type Err = OperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(OperationError::invalid_configuration(format!(
                "unknown security level {other:?} (expected low, medium or high)"
            ))),
        }
    }
}

/// Everything needed to open the one connection of a session.
/// Fixed for the lifetime of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub address: BdAddr,
    /// Host adapter, empty for the default one
    pub adapter: String,
    pub address_type: AddressType,
    pub security_level: SecurityLevel,
}

impl ConnectionParams {
    pub fn new(address: BdAddr) -> Self {
        Self {
            address,
            adapter: String::new(),
            address_type: AddressType::default(),
            security_level: SecurityLevel::default(),
        }
    }

    pub fn with_adapter(mut self, adapter: impl Into<String>) -> Self {
        self.adapter = adapter.into();
        self
    }

    pub fn with_address_type(mut self, address_type: AddressType) -> Self {
        self.address_type = address_type;
        self
    }

    pub fn with_security_level(mut self, security_level: SecurityLevel) -> Self {
        self.security_level = security_level;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Live,
    Dead,
}

/// Connection status changes published to an optional event channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Connecting(BdAddr),
    Connected(BdAddr),
    /// Transport dropped the link behind our back
    LinkLost(BdAddr),
    ConnectFailed { address: BdAddr, reason: String },
}

/// Numeric attribute handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub u16);

impl Handle {
    pub fn value(self) -> u16 {
        self.0
    }
}

impl FromStr for Handle {
    type Err = OperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        u16::from_str_radix(digits, 16).map(Self).map_err(|_| {
            OperationError::invalid_configuration(format!("{s:?} is not a hexadecimal handle"))
        })
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}", self.0)
    }
}

impl From<u16> for Handle {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

/// What an operation is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OperationTarget {
    Handle(Handle),
    Uuid(String),
}

impl OperationTarget {
    /// Build a read list: handles first, then UUIDs.
    pub fn parse_all<H, U>(handles: H, uuids: U) -> Result<Vec<Self>, OperationError>
    where
        H: IntoIterator,
        H::Item: AsRef<str>,
        U: IntoIterator,
        U::Item: Into<String>,
    {
        let mut targets = handles
            .into_iter()
            .map(|h| h.as_ref().parse().map(Self::Handle))
            .collect::<Result<Vec<_>, _>>()?;
        targets.extend(uuids.into_iter().map(|u| Self::Uuid(u.into())));
        Ok(targets)
    }

    pub fn handle(&self) -> Option<Handle> {
        match self {
            Self::Handle(h) => Some(*h),
            Self::Uuid(_) => None,
        }
    }
}

impl From<Handle> for OperationTarget {
    fn from(handle: Handle) -> Self {
        Self::Handle(handle)
    }
}

impl fmt::Display for OperationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handle(h) => write!(f, "handle {h}"),
            Self::Uuid(u) => write!(f, "UUID {u}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationKind {
    Read,
    Write(Vec<u8>),
}

/// Per-target result of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Data read, or the write acknowledgment
    Value(Vec<u8>),
    /// Transport rejected the handle or UUID
    InvalidTarget,
    /// Attribute forbids the operation
    NotPermitted,
    /// Asynchronous response never arrived
    Timeout,
}

impl Outcome {
    pub fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(data) => write!(f, "{data:02x?}"),
            Self::InvalidTarget => f.write_str("Invalid handle"),
            Self::NotPermitted => f.write_str("Attribute operation not permitted"),
            Self::Timeout => f.write_str("Error: Timeout reached for action"),
        }
    }
}

/// One result record. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResult {
    pub target: OperationTarget,
    /// Handle the value came from (the target itself, or the one resolved
    /// for a UUID read)
    pub handle: Option<Handle>,
    pub outcome: Outcome,
    /// Payload sent, writes only
    pub input: Option<Vec<u8>>,
    /// Transport invocations spent on this target
    pub attempts: u32,
}

impl OperationResult {
    pub fn data(&self) -> Option<&[u8]> {
        match &self.outcome {
            Outcome::Value(data) => Some(data),
            _ => None,
        }
    }
}

/// Client characteristic configuration written by a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SubscriptionMode {
    Disable,
    Notify,
    Indicate,
    NotifyAndIndicate,
}

impl SubscriptionMode {
    /// Two byte little-endian configuration value.
    pub fn config_value(self) -> [u8; 2] {
        [u8::from(self), 0x00]
    }
}

impl TryFrom<u8> for SubscriptionMode {
    type Error = OperationError;

    fn try_from(mode: u8) -> Result<Self, Self::Error> {
        match mode {
            0 => Ok(Self::Disable),
            1 => Ok(Self::Notify),
            2 => Ok(Self::Indicate),
            3 => Ok(Self::NotifyAndIndicate),
            other => Err(OperationError::invalid_configuration(format!(
                "{other} is not a valid mode. Please supply a value between 0 and 3 (inclusive)"
            ))),
        }
    }
}

impl From<SubscriptionMode> for u8 {
    fn from(mode: SubscriptionMode) -> Self {
        match mode {
            SubscriptionMode::Disable => 0,
            SubscriptionMode::Notify => 1,
            SubscriptionMode::Indicate => 2,
            SubscriptionMode::NotifyAndIndicate => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Notification,
    Indication,
}

/// Value pushed by the peripheral.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub handle: Handle,
    pub data: Vec<u8>,
}
