//! SoftDevice security handler: bonding with remembered keys, driven by
//! the radio's [`SecurityParams`].

use core::cell::{Cell, RefCell};

use camtrig::ble::{IoCapability, SecurityParams};
use camtrig::config::MAX_PAIRED_CAMERAS;
use defmt::{debug, info, warn};
use embassy_time::{Duration, Timer};
use heapless::Vec;
use nrf_softdevice::ble::security::{IoCapabilities, SecurityHandler};
use nrf_softdevice::ble::{Connection, EncryptionInfo, IdentityKey, MasterId, SecurityMode};
use static_cell::StaticCell;

/// Poll budget for link encryption: 25 × 200 ms.
const SECURE_POLLS: usize = 25;
const SECURE_POLL_MS: u64 = 200;

struct CameraBond {
    master_id: MasterId,
    key: EncryptionInfo,
    peer_id: IdentityKey,
}

pub struct Bonder {
    params: Cell<SecurityParams>,
    bonds: RefCell<Vec<CameraBond, MAX_PAIRED_CAMERAS>>,
}

impl Bonder {
    fn new(params: SecurityParams) -> Self {
        Self {
            params: Cell::new(params),
            bonds: RefCell::new(Vec::new()),
        }
    }

    /// Apply the security settings of a radio configuration. Takes effect
    /// from the next pairing.
    pub fn configure(&self, params: &SecurityParams) {
        // The SoftDevice wrapper always offers 16-byte keys and exchanges
        // encryption and identity keys both ways.
        if !params.full_key_exchange() {
            warn!("Reduced key size/distribution not supported - using full exchange");
        }
        if params.auth.secure_connections {
            debug!("LE Secure Connections left to the SoftDevice");
        }
        info!(
            "Security: io {} mitm {} bond {} oob {}",
            params.io_capability, params.auth.mitm, params.auth.bonding, params.oob
        );
        self.params.set(*params);
    }
}

impl SecurityHandler for Bonder {
    fn io_capabilities(&self) -> IoCapabilities {
        match self.params.get().io_capability {
            IoCapability::DisplayOnly => IoCapabilities::DisplayOnly,
            IoCapability::DisplayYesNo => IoCapabilities::DisplayYesNo,
            IoCapability::KeyboardOnly => IoCapabilities::KeyboardOnly,
            IoCapability::None => IoCapabilities::None,
            IoCapability::KeyboardDisplay => IoCapabilities::KeyboardDisplay,
        }
    }

    fn can_recv_out_of_band(&self, _conn: &Connection) -> bool {
        self.params.get().oob
    }

    fn can_bond(&self, _conn: &Connection) -> bool {
        self.params.get().auth.bonding
    }

    fn request_mitm_protection(&self, _conn: &Connection) -> bool {
        self.params.get().auth.mitm
    }

    fn on_bonded(
        &self,
        _conn: &Connection,
        master_id: MasterId,
        key: EncryptionInfo,
        peer_id: IdentityKey,
    ) {
        info!("Camera bonded");
        let mut bonds = self.bonds.borrow_mut();
        if let Some(existing) = bonds.iter_mut().find(|b| b.master_id == master_id) {
            existing.key = key;
            existing.peer_id = peer_id;
            return;
        }

        if bonds.is_full() {
            bonds.remove(0);
        }

        let _ = bonds.push(CameraBond {
            master_id,
            key,
            peer_id,
        });
    }

    fn get_key(&self, _conn: &Connection, master_id: MasterId) -> Option<EncryptionInfo> {
        self.bonds
            .borrow()
            .iter()
            .find_map(|b| (b.master_id == master_id).then_some(b.key))
    }

    fn get_peripheral_key(&self, conn: &Connection) -> Option<(MasterId, EncryptionInfo)> {
        self.bonds.borrow().iter().find_map(|b| {
            b.peer_id
                .is_match(conn.peer_address())
                .then_some((b.master_id, b.key))
        })
    }

    fn on_security_update(&self, _conn: &Connection, mode: SecurityMode) {
        info!("Camera link security: {}", mode);
    }
}

/// The process-wide security handler. Bonds live in RAM for the session.
///
/// Call once, at start-up. The driver replaces `params` when the radio is
/// configured.
pub fn bonder(params: SecurityParams) -> &'static Bonder {
    static BONDER: StaticCell<Bonder> = StaticCell::new();
    BONDER.init(Bonder::new(params))
}

pub fn is_secure(conn: &Connection) -> bool {
    !matches!(
        conn.security_mode(),
        SecurityMode::NoAccess | SecurityMode::Open
    )
}

/// Wait until the link is encrypted, or give up after five seconds.
pub async fn wait_for_secure_link(conn: &Connection) -> bool {
    for _ in 0..SECURE_POLLS {
        if is_secure(conn) {
            return true;
        }
        if conn.handle().is_none() {
            return false;
        }
        Timer::after(Duration::from_millis(SECURE_POLL_MS)).await;
    }
    is_secure(conn)
}
