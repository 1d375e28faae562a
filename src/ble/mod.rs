//! Bluetooth Low Energy subsystem.
//!
//! This module drives the platform BLE stack in **Central** role:
//!
//! 1. **Stack** - the capability trait the platform implements
//!    (SoftDevice on target, a recording fake in tests) plus the events
//!    it emits.
//! 2. **Transport** - per-connection state machine over the stack:
//!    open, MTU exchange, service search, writes and CCCD configuration.
//! 3. **Advertisement parsing** - name extraction from raw AD payloads.
//!
//! Everything here is synchronous: requests return as soon as the stack
//! has queued them and their results arrive later as [`StackEvent`]s.

pub mod adv_parser;
pub mod radio;
pub mod stack;
pub mod transport;
pub mod uuid;

pub use radio::{AuthReq, IoCapability, KeyDistribution, RadioConfig, ScanParams, SecurityParams};
pub use stack::{BleStack, CharacteristicElem, DescriptorElem, StackEvent};
pub use transport::{Connection, LinkState, TransportAdapter, TransportEvent};
pub use uuid::Uuid;

use crate::config::BLE_MAX_NAME_LEN;
use heapless::String;

/// BLE address type as reported by the advertiser.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressType {
    Public,
    Random,
    RpaPublic,
    RpaRandom,
}

impl AddressType {
    /// Decode the HCI address-type byte.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Public),
            1 => Some(Self::Random),
            2 => Some(Self::RpaPublic),
            3 => Some(Self::RpaRandom),
            _ => None,
        }
    }

    pub fn to_raw(self) -> u8 {
        match self {
            Self::Public => 0,
            Self::Random => 1,
            Self::RpaPublic => 2,
            Self::RpaRandom => 3,
        }
    }
}

/// Six-byte device address plus its type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Address {
    pub bytes: [u8; 6],
    pub kind: AddressType,
}

impl Address {
    pub const fn new(kind: AddressType, bytes: [u8; 6]) -> Self {
        Self { bytes, kind }
    }
}

/// Information about a discovered BLE peripheral.
///
/// Lives for one scan session only; nothing here is persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DiscoveredDevice {
    /// BLE address.
    pub address: Address,
    /// Complete local name (truncated to 32 bytes for `heapless::String`).
    pub name: String<BLE_MAX_NAME_LEN>,
}

/// Platform connection identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnectionId(pub u16);

/// Platform GATT client interface handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GattInterface(pub u8);

/// ATT/GATT status code carried by completion events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GattStatus(pub u8);

impl GattStatus {
    pub const OK: GattStatus = GattStatus(0x00);
    /// Generic failure, used when the platform reports no finer code.
    pub const ERROR: GattStatus = GattStatus(0x85);
    pub const INSUFFICIENT_AUTHENTICATION: GattStatus = GattStatus(0x05);

    pub fn is_ok(self) -> bool {
        self == Self::OK
    }
}

/// Inclusive attribute handle range of a discovered service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HandleRange {
    pub start: u16,
    pub end: u16,
}

impl HandleRange {
    pub const fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, handle: u16) -> bool {
        self.start <= handle && handle <= self.end
    }
}

/// Security requested for a single write.
///
/// `SignedMitm` on a link that is not yet bonded makes the stack start
/// bonding; the write itself then fails while bonding proceeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AuthRequirement {
    None,
    SignedMitm,
}

/// Value written to a Client Characteristic Configuration Descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CccdMode {
    Notify,
    Indicate,
}

impl CccdMode {
    pub const fn value(self) -> u16 {
        match self {
            CccdMode::Notify => 0x0001,
            CccdMode::Indicate => 0x0002,
        }
    }

    /// Little-endian wire form of [`CccdMode::value`].
    pub const fn to_bytes(self) -> [u8; 2] {
        self.value().to_le_bytes()
    }
}
