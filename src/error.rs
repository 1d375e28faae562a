//! Unified error type for camtrig.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (with the `defmt` feature) for efficient
//! on-target logging.

use crate::ble::GattStatus;
use crate::camera::{CharacteristicId, ServiceId};

/// Top-level error type used across the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The radio could not be brought up or configured.
    RadioUnavailable(StackError),

    /// Scan start/stop was refused by the stack.
    Scan(StackError),

    /// Connection lifecycle failure.
    Connection(ConnectionError),

    /// GATT service/characteristic resolution failure.
    Discovery(DiscoveryError),

    /// Characteristic write failure.
    Write(WriteError),

    /// CCCD (notification/indication) configuration failure.
    Descriptor(DescriptorError),

    /// Bonding did not complete.
    Security(SecurityError),

    /// A command set is already in flight.
    Busy,

    /// The camera link is not ready for protocol transactions.
    NotReady,
}

/// Raw error code returned synchronously by a platform stack call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StackError(pub i32);

/// Open / MTU / service-search failures. Fatal to the connection attempt;
/// no retry is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionError {
    /// The stack refused the request outright.
    Rejected(StackError),
    /// The open event reported a non-OK status.
    OpenFailed(GattStatus),
    /// MTU negotiation reported a non-OK status.
    MtuFailed(GattStatus),
    /// Service search completed with a non-OK status.
    SearchFailed(GattStatus),
    /// No link to operate on.
    NotConnected,
    /// A link is already open or being opened.
    AlreadyConnected,
}

/// Service or characteristic resolution failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DiscoveryError {
    /// The service was never reported during the search phase.
    ServiceMissing(ServiceId),
    /// Not every wanted characteristic was found in the service range.
    CharacteristicCount {
        service: ServiceId,
        expected: u8,
        found: u8,
    },
    /// The attribute cache query failed.
    Query(StackError),
    /// A command targeted a characteristic that has no handle yet.
    Unresolved(CharacteristicId),
}

/// Bonding failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SecurityError {
    BondingFailed { reason: u8 },
}

/// Characteristic write failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteError {
    /// The stack refused to queue the write.
    Rejected(StackError),
    /// The write completed with a non-OK status.
    Failed(GattStatus),
}

/// CCCD configuration failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DescriptorError {
    /// No 0x2902 descriptor belongs to the characteristic.
    CccdMissing,
    /// The descriptor query returned fewer/more entries than declared.
    CountMismatch { declared: u16, returned: u16 },
    /// The stack refused the query or the descriptor write.
    Rejected(StackError),
}

// Convenience conversions

impl From<ConnectionError> for Error {
    fn from(e: ConnectionError) -> Self {
        Error::Connection(e)
    }
}

impl From<DiscoveryError> for Error {
    fn from(e: DiscoveryError) -> Self {
        Error::Discovery(e)
    }
}

impl From<WriteError> for Error {
    fn from(e: WriteError) -> Self {
        Error::Write(e)
    }
}

impl From<DescriptorError> for Error {
    fn from(e: DescriptorError) -> Self {
        Error::Descriptor(e)
    }
}

impl From<SecurityError> for Error {
    fn from(e: SecurityError) -> Self {
        Error::Security(e)
    }
}
