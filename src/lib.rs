//! camtrig - BLE remote shutter for Canon cameras.
//!
//! This library holds all protocol logic and is host-testable; the
//! embedded binary (`main.rs`, feature `embedded`) binds it to the nRF52840
//! SoftDevice.
//!
//! Usage: `cargo test --lib` / `cargo test --test integration`
//!
//! Layering (leaves first):
//!   - [`ble`]     - platform stack capability, transport adapter, AD parsing
//!   - [`camera`]  - handle registry, command sets, sequencer, protocol engine
//!   - [`storage`] - remembered cameras and their byte encoding

#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible to every module.
#[macro_use]
mod fmt;

pub mod ble;
pub mod camera;
pub mod config;
pub mod error;
pub mod storage;

#[cfg(test)]
mod testing;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports
// ═══════════════════════════════════════════════════════════════════════════

pub use ble::{
    Address, AddressType, BleStack, DiscoveredDevice, RadioConfig, StackEvent, TransportAdapter,
};
pub use camera::{
    CameraProfile, CameraRemote, EngineConfig, FailurePolicy, IntervalShooter, PairStage,
    RemoteListener, StepFailure, Transaction,
};
pub use error::Error;
pub use storage::{CameraStore, PairedCamera};
