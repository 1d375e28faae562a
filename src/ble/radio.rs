//! Local radio configuration handed to the stack at start-up.

use crate::config::{BLE_LOCAL_MTU, BLE_SCAN_INTERVAL, BLE_SCAN_WINDOW};

/// GAP scan parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanParams {
    /// Active scan to retrieve scan-response data (device names).
    pub active: bool,
    /// Scan interval (0.625 ms units).
    pub interval: u16,
    /// Scan window (0.625 ms units).
    pub window: u16,
}

/// Authentication requirements flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AuthReq {
    pub secure_connections: bool,
    pub mitm: bool,
    pub bonding: bool,
}

/// Local IO capabilities advertised during pairing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IoCapability {
    DisplayOnly,
    DisplayYesNo,
    KeyboardOnly,
    None,
    KeyboardDisplay,
}

/// Keys exchanged during bonding, for one direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyDistribution {
    pub encryption: bool,
    pub identity: bool,
}

/// Security-manager parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SecurityParams {
    pub auth: AuthReq,
    pub io_capability: IoCapability,
    pub oob: bool,
    pub max_key_size: u8,
    pub initiator_keys: KeyDistribution,
    pub responder_keys: KeyDistribution,
}

/// Everything [`BleStack::configure`](super::BleStack::configure) needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RadioConfig {
    pub local_mtu: u16,
    pub scan: ScanParams,
    pub security: SecurityParams,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            active: true,
            interval: BLE_SCAN_INTERVAL,
            window: BLE_SCAN_WINDOW,
        }
    }
}

impl Default for SecurityParams {
    /// Secure Connections + MITM + bonding, no IO, no OOB, 16-byte keys,
    /// encryption and identity keys in both directions.
    fn default() -> Self {
        let both = KeyDistribution {
            encryption: true,
            identity: true,
        };
        Self {
            auth: AuthReq {
                secure_connections: true,
                mitm: true,
                bonding: true,
            },
            io_capability: IoCapability::None,
            oob: false,
            max_key_size: 16,
            initiator_keys: both,
            responder_keys: both,
        }
    }
}

impl SecurityParams {
    /// 16-byte keys, with encryption and identity keys sent both ways.
    /// Stacks with a fixed key exchange can only honour this setting.
    pub fn full_key_exchange(&self) -> bool {
        let both = |k: KeyDistribution| k.encryption && k.identity;
        self.max_key_size == 16 && both(self.initiator_keys) && both(self.responder_keys)
    }
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            local_mtu: BLE_LOCAL_MTU,
            scan: ScanParams::default(),
            security: SecurityParams::default(),
        }
    }
}
