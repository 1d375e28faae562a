//! Button-driven front end: the engine's listener plus the user's intent.
//!
//! The listener cannot call back into the engine that owns it, so it
//! records what should happen next and the remote task acts on it after
//! each event.

use camtrig::ble::DiscoveredDevice;
use camtrig::camera::{PairStage, Transaction};
use camtrig::error::{ConnectionError, DiscoveryError};
use camtrig::{CameraStore, PairedCamera, RemoteListener, StepFailure};
use defmt::{info, warn};

/// What to do once the camera link is resolved.
#[derive(Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum Intent {
    /// First contact: run the pairing transactions.
    Pair,
    /// Remembered camera: unlock the trigger service.
    Authenticate,
}

pub struct Ui {
    pub store: CameraStore,
    /// First camera reported by the current scan.
    pub found: Option<DiscoveredDevice>,
    /// Camera the link is being brought up for.
    pub target: Option<PairedCamera>,
    pub intent: Intent,
    /// Set when discovery finished; taken by the remote task.
    link_resolved: bool,
    /// Trigger service unlocked on the current link.
    pub authenticated: bool,
    pub interval_mode: bool,
}

impl Ui {
    pub fn new(store: CameraStore) -> Self {
        Self {
            store,
            found: None,
            target: None,
            intent: Intent::Authenticate,
            link_resolved: false,
            authenticated: false,
            interval_mode: false,
        }
    }

    /// Consume the "link resolved" flag.
    pub fn take_resolved(&mut self) -> Option<Intent> {
        if core::mem::take(&mut self.link_resolved) {
            Some(self.intent)
        } else {
            None
        }
    }
}

impl RemoteListener for Ui {
    fn on_device_found(&mut self, device: &DiscoveredDevice) {
        info!("Camera found: {}", device.name.as_str());
        if self.found.is_none() {
            self.found = Some(device.clone());
        }
    }

    fn on_scan_stopped(&mut self) {
        match &self.found {
            Some(device) => info!("Scan done - press PAIR to pair {}", device.name.as_str()),
            None => info!("Scan done - no camera found"),
        }
    }

    fn on_connected(&mut self) {
        info!("Camera ready ({})", self.intent);
        self.link_resolved = true;
    }

    fn on_connect_failed(&mut self, error: ConnectionError) {
        warn!("Connect failed: {}", error);
        self.target = None;
    }

    fn on_discovery_failed(&mut self, error: DiscoveryError) {
        warn!("Not a supported camera: {}", error);
    }

    fn on_pair_stage(&mut self, stage: PairStage, success: bool) {
        info!("Pairing: {} {}", stage, if success { "ok" } else { "failed" });
        if stage == PairStage::Done && success {
            if let Some(camera) = self.target.clone() {
                self.store.add(camera);
            }
            self.authenticated = true;
        }
    }

    fn on_authenticated(&mut self) {
        info!("Shutter unlocked");
        self.authenticated = true;
    }

    fn on_transaction_failed(&mut self, transaction: Transaction, failure: StepFailure) {
        warn!("{} failed: {}", transaction, failure);
    }

    fn on_disconnected(&mut self) {
        info!("Camera disconnected");
        self.authenticated = false;
        self.link_resolved = false;
        self.target = None;
    }
}
