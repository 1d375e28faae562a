//! Platform BLE stack capability.
//!
//! The transport never blocks on the radio. Every request below returns as
//! soon as the stack accepted (or refused) it; the outcome arrives later
//! as a [`StackEvent`] on the single event queue the application drains.
//! The three attribute queries are the exception: they read the stack's
//! local GATT cache, filled during service search, and answer immediately.

use crate::ble::radio::RadioConfig;
use crate::ble::uuid::Uuid;
use crate::ble::{Address, ConnectionId, GattInterface, GattStatus, HandleRange, AuthRequirement};
use crate::config::{
    BLE_MAX_ADV_LEN, GATT_MAX_CHARACTERISTICS, GATT_MAX_DESCRIPTORS, GATT_MAX_VALUE_LEN,
};
use heapless::Vec;

pub use crate::error::StackError;

/// Raw advertising + scan response bytes.
pub type AdvData = Vec<u8, BLE_MAX_ADV_LEN>;

/// Notification / indication value.
pub type Value = Vec<u8, GATT_MAX_VALUE_LEN>;

/// Characteristic entry from the GATT cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CharacteristicElem {
    pub uuid: Uuid,
    /// Value handle.
    pub handle: u16,
    pub properties: u8,
}

/// Descriptor entry from the GATT cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DescriptorElem {
    pub uuid: Uuid,
    pub handle: u16,
}

/// Events emitted by the platform stack, delivered in emission order on
/// one serialized context.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StackEvent {
    /// An advertisement (with scan response merged when available).
    ScanResult { address: Address, data: AdvData },
    /// The scan window closed or `stop_scan` completed.
    ScanStopped,
    /// Result of `open`.
    Opened {
        status: GattStatus,
        conn: ConnectionId,
        interface: GattInterface,
        address: Address,
    },
    /// Result of `request_mtu`.
    MtuConfigured { status: GattStatus, mtu: u16 },
    /// One primary service reported during `search_services`.
    ServiceFound { uuid: Uuid, range: HandleRange },
    /// End of `search_services`.
    SearchComplete { status: GattStatus },
    /// Result of `write_characteristic`.
    CharacteristicWritten { status: GattStatus, handle: u16 },
    /// Result of `write_descriptor`.
    DescriptorWritten { status: GattStatus, handle: u16 },
    /// Value pushed by the peripheral.
    Notification {
        handle: u16,
        value: Value,
        indication: bool,
    },
    /// Bonding / authentication finished.
    BondingComplete { success: bool, reason: u8 },
    /// The link is gone, whoever closed it.
    Disconnected { reason: u8 },
}

/// Central-role operations the transport consumes.
pub trait BleStack {
    /// Apply MTU, scan and security-manager settings. Called once at start-up.
    fn configure(&mut self, config: &RadioConfig) -> Result<(), StackError>;

    fn start_scan(&mut self, duration_secs: u32) -> Result<(), StackError>;

    fn stop_scan(&mut self) -> Result<(), StackError>;

    /// Open a GATT client connection; completes with [`StackEvent::Opened`].
    fn open(&mut self, address: Address) -> Result<(), StackError>;

    /// Close a connection; completes with [`StackEvent::Disconnected`].
    fn close(&mut self, conn: ConnectionId) -> Result<(), StackError>;

    /// Abandon an `open` that has not completed; the stack answers with a
    /// failed [`StackEvent::Opened`].
    fn cancel_open(&mut self, address: Address) -> Result<(), StackError>;

    fn request_mtu(&mut self, conn: ConnectionId) -> Result<(), StackError>;

    /// Discover every primary service (no UUID filter).
    fn search_services(&mut self, conn: ConnectionId) -> Result<(), StackError>;

    /// All characteristics declared within `range`.
    fn characteristics(
        &self,
        conn: ConnectionId,
        range: HandleRange,
        out: &mut Vec<CharacteristicElem, GATT_MAX_CHARACTERISTICS>,
    ) -> Result<(), StackError>;

    /// Number of descriptors the cache declares for `char_handle`.
    fn descriptor_count(
        &self,
        conn: ConnectionId,
        range: HandleRange,
        char_handle: u16,
    ) -> Result<u16, StackError>;

    fn descriptors(
        &self,
        conn: ConnectionId,
        char_handle: u16,
        out: &mut Vec<DescriptorElem, GATT_MAX_DESCRIPTORS>,
    ) -> Result<(), StackError>;

    /// Route notifications/indications for `handle` to the event queue.
    fn register_for_notify(&mut self, address: Address, handle: u16) -> Result<(), StackError>;

    /// Write-with-response.
    fn write_characteristic(
        &mut self,
        conn: ConnectionId,
        handle: u16,
        data: &[u8],
        auth: AuthRequirement,
    ) -> Result<(), StackError>;

    /// Write-with-response to a descriptor.
    fn write_descriptor(
        &mut self,
        conn: ConnectionId,
        handle: u16,
        data: &[u8],
        auth: AuthRequirement,
    ) -> Result<(), StackError>;
}
