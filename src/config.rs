//! Application-wide constants and compile-time configuration.
//!
//! All timing parameters, buffer bounds, and radio/protocol constants
//! live here so they can be tuned in one place.

// BLE radio

/// Local ATT MTU requested from the stack before discovery.
pub const BLE_LOCAL_MTU: u16 = 200;

/// Scan interval (in 0.625 ms units). 0x50 = 50 ms.
pub const BLE_SCAN_INTERVAL: u16 = 0x50;

/// Scan window (in 0.625 ms units). 0x30 = 30 ms.
pub const BLE_SCAN_WINDOW: u16 = 0x30;

/// Duration of a BLE scan session (seconds).
pub const BLE_SCAN_DURATION_SECS: u32 = 120;

/// Maximum number of distinct peripherals reported in one scan session.
pub const BLE_MAX_DISCOVERED: usize = 8;

/// Longest device name kept from an advertisement.
pub const BLE_MAX_NAME_LEN: usize = 32;

/// Raw advertising + scan response payload bound.
pub const BLE_MAX_ADV_LEN: usize = 62;

/// BLE connection interval range (in 1.25 ms units).
pub const BLE_CONN_INTERVAL_MIN: u16 = 24;
pub const BLE_CONN_INTERVAL_MAX: u16 = 40;

/// BLE slave latency (number of connection events the peripheral can skip).
pub const BLE_SLAVE_LATENCY: u16 = 0;

/// BLE supervision timeout (in 10 ms units). 400 = 4 s.
pub const BLE_SUP_TIMEOUT: u16 = 400;

/// Give up on a connection attempt after this many seconds.
pub const BLE_CONNECT_TIMEOUT_SECS: u32 = 30;

// GATT discovery

/// Characteristics returned by a single "all characteristics in range" query.
pub const GATT_MAX_CHARACTERISTICS: usize = 16;

/// Descriptors returned by a single descriptor query.
pub const GATT_MAX_DESCRIPTORS: usize = 8;

/// Largest notification / indication value kept.
pub const GATT_MAX_VALUE_LEN: usize = 64;

/// Largest payload written by any protocol command.
pub const GATT_MAX_WRITE_LEN: usize = 20;

// Command sequencing

/// Time a single protocol step may stay in flight before the transaction fails.
pub const STEP_TIMEOUT_MS: u32 = 10_000;

// Interval shooting

/// Default interval between exposures (seconds).
pub const INTERVAL_DEFAULT_SECS: u16 = 5;

/// Shortest selectable interval (seconds).
pub const INTERVAL_MIN_SECS: u16 = 1;

/// Longest selectable interval (seconds). 3600 = one hour.
pub const INTERVAL_MAX_SECS: u16 = 60 * 60;

// GPIO pin assignments (nRF52840-DK defaults)
//
// These are logical names; actual `embassy_nrf::peripherals::*` types are
// selected in `main.rs`.  Adjust for your custom PCB.
//
//   Button SELECT  → P0.11   (scan / connect to remembered camera)
//   Button PAIR    → P0.12
//   Button SHUTTER → P0.24   (short: trigger, interval mode: start/stop)
//   Button MODE    → P0.25   (toggle interval mode)

/// Button debounce time (ms).
pub const BUTTON_DEBOUNCE_MS: u64 = 50;

// Paired-camera storage

/// Maximum number of cameras remembered in storage.
pub const MAX_PAIRED_CAMERAS: usize = 4;

/// Flash page index where camera storage starts (4 KB per page on nRF52840).
pub const STORAGE_FLASH_PAGE_START: u32 = 240;

/// Number of flash pages reserved for camera storage.
pub const STORAGE_FLASH_PAGE_COUNT: u32 = 4;
