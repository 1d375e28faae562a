//! Host test support: a `BleStack` that records every request and serves
//! a canned attribute cache.

use std::vec::Vec;

use crate::ble::stack::{AdvData, BleStack, CharacteristicElem, DescriptorElem, StackEvent};
use crate::ble::uuid::{Uuid, CCCD};
use crate::ble::{
    Address, AddressType, AuthRequirement, ConnectionId, GattInterface, GattStatus, HandleRange,
    RadioConfig, TransportAdapter,
};
use crate::camera::CameraProfile;
use crate::config::{GATT_MAX_CHARACTERISTICS, GATT_MAX_DESCRIPTORS};
use crate::error::StackError;

/// Outbound request seen by the stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Configure,
    StartScan(u32),
    StopScan,
    Open(Address),
    Close(ConnectionId),
    CancelOpen(Address),
    RequestMtu(ConnectionId),
    SearchServices(ConnectionId),
    RegisterNotify(u16),
    WriteChar {
        handle: u16,
        data: Vec<u8>,
        auth: AuthRequirement,
    },
    WriteDescr {
        handle: u16,
        data: Vec<u8>,
        auth: AuthRequirement,
    },
}

#[derive(Debug, Default)]
pub struct RecordingStack {
    pub calls: Vec<Call>,
    pub characteristics: Vec<CharacteristicElem>,
    /// (characteristic value handle, descriptor)
    pub descriptors: Vec<(u16, DescriptorElem)>,
    pub descriptor_count_override: Option<u16>,
    pub fail_configure: bool,
    /// Refuse characteristic and descriptor writes with this code.
    pub reject_writes: Option<StackError>,
}

impl RecordingStack {
    pub const CONN: ConnectionId = ConnectionId(7);
    pub const PAIR_RANGE: HandleRange = HandleRange::new(0x10, 0x1f);
    pub const TRIGGER_RANGE: HandleRange = HandleRange::new(0x20, 0x3f);

    pub const PAIR_COMMAND: u16 = 0x12;
    pub const PAIR_COMMAND_CCCD: u16 = 0x13;
    pub const PAIR_DATA: u16 = 0x15;
    pub const TRIGGER_CONFIG: u16 = 0x22;
    pub const TRIGGER: u16 = 0x25;
    pub const TRIGGER_NOTIFY: u16 = 0x28;
    pub const TRIGGER_NOTIFY_CCCD: u16 = 0x29;

    /// A stack whose cache holds the full camera layout.
    pub fn with_camera(profile: &CameraProfile) -> Self {
        let mut stack = Self::default();
        stack.add_characteristic(Uuid::Uuid16(0x2a05), 0x11);
        stack.add_characteristic(profile.pair_command, Self::PAIR_COMMAND);
        stack.add_characteristic(profile.pair_data, Self::PAIR_DATA);
        stack.add_characteristic(profile.trigger_config, Self::TRIGGER_CONFIG);
        stack.add_characteristic(profile.trigger, Self::TRIGGER);
        stack.add_characteristic(profile.trigger_notify, Self::TRIGGER_NOTIFY);
        stack.add_descriptor(Self::PAIR_COMMAND, CCCD, Self::PAIR_COMMAND_CCCD);
        stack.add_descriptor(Self::TRIGGER_NOTIFY, CCCD, Self::TRIGGER_NOTIFY_CCCD);
        stack
    }

    pub fn add_characteristic(&mut self, uuid: Uuid, handle: u16) {
        self.characteristics.push(CharacteristicElem {
            uuid,
            handle,
            properties: 0,
        });
    }

    pub fn remove_characteristic(&mut self, uuid: &Uuid) {
        self.characteristics.retain(|c| c.uuid != *uuid);
    }

    pub fn add_descriptor(&mut self, char_handle: u16, uuid: Uuid, handle: u16) {
        self.descriptors
            .push((char_handle, DescriptorElem { uuid, handle }));
    }

    /// Characteristic writes, in order.
    pub fn writes(&self) -> Vec<(u16, Vec<u8>, AuthRequirement)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::WriteChar { handle, data, auth } => Some((*handle, data.clone(), *auth)),
                _ => None,
            })
            .collect()
    }

    /// Descriptor writes, in order.
    pub fn descriptor_writes(&self) -> Vec<(u16, Vec<u8>, AuthRequirement)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::WriteDescr { handle, data, auth } => Some((*handle, data.clone(), *auth)),
                _ => None,
            })
            .collect()
    }
}

impl BleStack for RecordingStack {
    fn configure(&mut self, _config: &RadioConfig) -> Result<(), StackError> {
        if self.fail_configure {
            return Err(StackError(-1));
        }
        self.calls.push(Call::Configure);
        Ok(())
    }

    fn start_scan(&mut self, duration_secs: u32) -> Result<(), StackError> {
        self.calls.push(Call::StartScan(duration_secs));
        Ok(())
    }

    fn stop_scan(&mut self) -> Result<(), StackError> {
        self.calls.push(Call::StopScan);
        Ok(())
    }

    fn open(&mut self, address: Address) -> Result<(), StackError> {
        self.calls.push(Call::Open(address));
        Ok(())
    }

    fn close(&mut self, conn: ConnectionId) -> Result<(), StackError> {
        self.calls.push(Call::Close(conn));
        Ok(())
    }

    fn cancel_open(&mut self, address: Address) -> Result<(), StackError> {
        self.calls.push(Call::CancelOpen(address));
        Ok(())
    }

    fn request_mtu(&mut self, conn: ConnectionId) -> Result<(), StackError> {
        self.calls.push(Call::RequestMtu(conn));
        Ok(())
    }

    fn search_services(&mut self, conn: ConnectionId) -> Result<(), StackError> {
        self.calls.push(Call::SearchServices(conn));
        Ok(())
    }

    fn characteristics(
        &self,
        _conn: ConnectionId,
        range: HandleRange,
        out: &mut heapless::Vec<CharacteristicElem, GATT_MAX_CHARACTERISTICS>,
    ) -> Result<(), StackError> {
        for c in self.characteristics.iter().filter(|c| range.contains(c.handle)) {
            out.push(*c).map_err(|_| StackError(-2))?;
        }
        Ok(())
    }

    fn descriptor_count(
        &self,
        _conn: ConnectionId,
        _range: HandleRange,
        char_handle: u16,
    ) -> Result<u16, StackError> {
        if let Some(n) = self.descriptor_count_override {
            return Ok(n);
        }
        Ok(self
            .descriptors
            .iter()
            .filter(|(owner, _)| *owner == char_handle)
            .count() as u16)
    }

    fn descriptors(
        &self,
        _conn: ConnectionId,
        char_handle: u16,
        out: &mut heapless::Vec<DescriptorElem, GATT_MAX_DESCRIPTORS>,
    ) -> Result<(), StackError> {
        for (_, d) in self.descriptors.iter().filter(|(o, _)| *o == char_handle) {
            out.push(*d).map_err(|_| StackError(-2))?;
        }
        Ok(())
    }

    fn register_for_notify(&mut self, _address: Address, handle: u16) -> Result<(), StackError> {
        self.calls.push(Call::RegisterNotify(handle));
        Ok(())
    }

    fn write_characteristic(
        &mut self,
        _conn: ConnectionId,
        handle: u16,
        data: &[u8],
        auth: AuthRequirement,
    ) -> Result<(), StackError> {
        if let Some(e) = self.reject_writes {
            return Err(e);
        }
        self.calls.push(Call::WriteChar {
            handle,
            data: data.to_vec(),
            auth,
        });
        Ok(())
    }

    fn write_descriptor(
        &mut self,
        _conn: ConnectionId,
        handle: u16,
        data: &[u8],
        auth: AuthRequirement,
    ) -> Result<(), StackError> {
        if let Some(e) = self.reject_writes {
            return Err(e);
        }
        self.calls.push(Call::WriteDescr {
            handle,
            data: data.to_vec(),
            auth,
        });
        Ok(())
    }
}

pub fn addr(n: u8) -> Address {
    Address::new(AddressType::Public, [n, 0x22, 0x33, 0x44, 0x55, 0xc0])
}

/// Advertising payload carrying only a complete local name.
pub fn adv_named(name: &str) -> AdvData {
    let mut data = AdvData::new();
    let _ = data.push(name.len() as u8 + 1);
    let _ = data.push(0x09);
    let _ = data.extend_from_slice(name.as_bytes());
    data
}

/// Events bringing a link up to discovery-complete with both camera
/// services reported.
pub fn link_up(profile: &CameraProfile) -> Vec<StackEvent> {
    vec![
        StackEvent::Opened {
            status: GattStatus::OK,
            conn: RecordingStack::CONN,
            interface: GattInterface(3),
            address: addr(1),
        },
        StackEvent::MtuConfigured {
            status: GattStatus::OK,
            mtu: 200,
        },
        StackEvent::ServiceFound {
            uuid: Uuid::Uuid16(0x1800),
            range: HandleRange::new(0x01, 0x0f),
        },
        StackEvent::ServiceFound {
            uuid: profile.pair_service,
            range: RecordingStack::PAIR_RANGE,
        },
        StackEvent::ServiceFound {
            uuid: profile.trigger_service,
            range: RecordingStack::TRIGGER_RANGE,
        },
        StackEvent::SearchComplete {
            status: GattStatus::OK,
        },
    ]
}

/// A transport whose link is `Ready`.
pub fn ready_adapter(stack: RecordingStack) -> TransportAdapter<RecordingStack> {
    let mut adapter = TransportAdapter::new(stack);
    let _ = adapter.connect(addr(1));
    for ev in link_up(&CameraProfile::default()) {
        adapter.handle_event(&ev);
    }
    adapter
}
