//! Remembered cameras.
//!
//! Cameras that completed pairing are kept so a later authenticated
//! connect can target them without pairing again. This module holds the
//! in-memory list and its byte encoding; the firmware persists the encoded
//! form to internal flash (see `platform::flash`).
//!
//! Encoded layout:
//!   `[count]` followed by `count` records of
//!   `[6 addr][1 addr type][1 name_len][name_bytes...]`.

use crate::ble::{Address, AddressType};
use crate::config::{BLE_MAX_NAME_LEN, MAX_PAIRED_CAMERAS};
use heapless::{String, Vec};

/// Fixed part of one record.
const RECORD_HEADER_LEN: usize = 6 + 1 + 1;

/// Largest encoded store: count byte plus full-size records.
pub const MAX_ENCODED_LEN: usize = 1 + MAX_PAIRED_CAMERAS * (RECORD_HEADER_LEN + BLE_MAX_NAME_LEN);

/// A camera that has completed pairing.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PairedCamera {
    pub address: Address,
    /// Advertised name (for UI display, truncated to 32 bytes).
    pub name: String<BLE_MAX_NAME_LEN>,
}

impl PairedCamera {
    pub fn new(address: Address, name: &str) -> Self {
        let mut n = String::new();
        for c in name.chars() {
            if n.push(c).is_err() {
                break;
            }
        }
        Self { address, name: n }
    }

    fn encoded_len(&self) -> usize {
        RECORD_HEADER_LEN + self.name.len()
    }

    /// Write the record into `buf`; returns bytes written, 0 if it does
    /// not fit.
    fn encode(&self, buf: &mut [u8]) -> usize {
        let name = self.name.as_bytes();
        let total = self.encoded_len();
        if buf.len() < total {
            return 0;
        }
        buf[0..6].copy_from_slice(&self.address.bytes);
        buf[6] = self.address.kind.to_raw();
        buf[7] = name.len() as u8;
        buf[8..total].copy_from_slice(name);
        total
    }

    fn decode(data: &[u8]) -> Option<Self> {
        if data.len() < RECORD_HEADER_LEN {
            return None;
        }
        let mut bytes = [0u8; 6];
        bytes.copy_from_slice(&data[0..6]);
        let kind = AddressType::from_raw(data[6])?;
        let name_len = data[7] as usize;
        let name = data.get(RECORD_HEADER_LEN..RECORD_HEADER_LEN + name_len)?;
        let name = core::str::from_utf8(name).ok()?;
        Some(Self::new(Address::new(kind, bytes), name))
    }
}

/// In-memory list of paired cameras, oldest first.
#[derive(Clone, Debug, Default)]
pub struct CameraStore {
    cameras: Vec<PairedCamera, MAX_PAIRED_CAMERAS>,
    /// True if the list differs from what was last loaded or saved.
    dirty: bool,
}

impl CameraStore {
    pub const fn new() -> Self {
        Self {
            cameras: Vec::new(),
            dirty: false,
        }
    }

    /// Remember a camera. The same address updates in place; when full
    /// the oldest entry is evicted.
    pub fn add(&mut self, camera: PairedCamera) {
        if let Some(pos) = self
            .cameras
            .iter()
            .position(|c| c.address == camera.address)
        {
            // Move to the back so it becomes the most recent.
            self.cameras.remove(pos);
            let _ = self.cameras.push(camera);
            self.dirty = true;
            info!("Updated paired camera");
            return;
        }

        if self.cameras.is_full() {
            warn!("Paired camera store full - evicting oldest entry");
            self.cameras.remove(0);
        }

        let _ = self.cameras.push(camera);
        self.dirty = true;
        info!("Added paired camera - now storing {}", self.cameras.len());
    }

    pub fn remove(&mut self, address: &Address) -> bool {
        match self.cameras.iter().position(|c| c.address == *address) {
            Some(pos) => {
                self.cameras.remove(pos);
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    /// The camera paired or used most recently.
    pub fn most_recent(&self) -> Option<&PairedCamera> {
        self.cameras.last()
    }

    pub fn find(&self, address: &Address) -> Option<&PairedCamera> {
        self.cameras.iter().find(|c| c.address == *address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PairedCamera> {
        self.cameras.iter()
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Serialize the whole list; returns the encoded length.
    pub fn encode(&self, buf: &mut [u8]) -> usize {
        if buf.is_empty() {
            return 0;
        }
        let mut offset = 1;
        let mut count = 0u8;
        for camera in &self.cameras {
            let written = camera.encode(&mut buf[offset..]);
            if written == 0 {
                break;
            }
            offset += written;
            count += 1;
        }
        buf[0] = count;
        offset
    }

    /// Replace the list with the one encoded in `data`. Truncated or
    /// malformed trailing records are dropped.
    pub fn decode(data: &[u8]) -> Self {
        let mut store = Self::new();
        let Some((&count, mut rest)) = data.split_first() else {
            return store;
        };

        for _ in 0..count {
            if rest.len() < RECORD_HEADER_LEN {
                break;
            }
            let record_len = RECORD_HEADER_LEN + rest[7] as usize;
            if rest.len() < record_len {
                break;
            }
            if let Some(camera) = PairedCamera::decode(&rest[..record_len]) {
                if store.cameras.push(camera).is_err() {
                    break;
                }
            }
            rest = &rest[record_len..];
        }
        store
    }
}
