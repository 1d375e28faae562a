//! BLE transport adapter.
//!
//! Owns the platform stack and the single active connection:
//!
//! ```text
//! Idle ──connect──▶ Opening ──Opened(ok)──▶ NegotiatingMtu ──Mtu(ok)──▶ Discovering
//!                      │                          │                        │  ▲
//!                      │ Opened(err)              │ Mtu(err)   ServiceFound│  │
//!                      ▼                          ▼                        ▼──┘
//!                   Closed ◀──────────────── Closed ◀── SearchComplete(err)
//!                                                           SearchComplete(ok) ──▶ Ready
//! any state ──Disconnected──▶ Closed
//! ```
//!
//! Stack events are reduced to the narrower [`TransportEvent`] the camera
//! protocol consumes. Outbound operations return once queued.

use crate::ble::adv_parser::complete_local_name;
use crate::ble::radio::RadioConfig;
use crate::ble::stack::{BleStack, CharacteristicElem, DescriptorElem, StackEvent};
use crate::ble::uuid::{Uuid, CCCD};
use crate::ble::{
    Address, AuthRequirement, CccdMode, ConnectionId, DiscoveredDevice, GattInterface, HandleRange,
};
use crate::config::{
    BLE_MAX_DISCOVERED, BLE_SCAN_DURATION_SECS, GATT_MAX_CHARACTERISTICS, GATT_MAX_DESCRIPTORS,
};
use crate::error::{
    ConnectionError, DescriptorError, DiscoveryError, Error, SecurityError, WriteError,
};
use heapless::Vec;

/// Per-connection lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    Idle,
    Opening,
    NegotiatingMtu,
    Discovering,
    Ready,
    Closed,
}

/// The active link. Created on a successful open, dropped on disconnect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Connection {
    pub address: Address,
    pub id: ConnectionId,
    pub interface: GattInterface,
}

/// Protocol-relevant events, borrowed from the stack event they came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent<'a> {
    DeviceFound(DiscoveredDevice),
    ScanStopped,
    ConnectFailed(ConnectionError),
    ServiceFound { uuid: &'a Uuid, range: HandleRange },
    DiscoveryComplete,
    CharacteristicWritten { handle: u16, result: Result<(), WriteError> },
    DescriptorWritten { ok: bool, handle: u16 },
    Notification { handle: u16, value: &'a [u8] },
    BondingComplete { result: Result<(), SecurityError> },
    Disconnected,
}

/// Thin façade over the central-role stack.
pub struct TransportAdapter<S> {
    stack: S,
    state: LinkState,
    connection: Option<Connection>,
    pending: Option<Address>,
    scanning: bool,
    /// Addresses already reported in the current scan session.
    seen: Vec<Address, BLE_MAX_DISCOVERED>,
}

impl<S: BleStack> TransportAdapter<S> {
    pub fn new(stack: S) -> Self {
        Self {
            stack,
            state: LinkState::Idle,
            connection: None,
            pending: None,
            scanning: false,
            seen: Vec::new(),
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn connection(&self) -> Option<&Connection> {
        self.connection.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.state == LinkState::Ready
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    pub fn stack(&self) -> &S {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut S {
        &mut self.stack
    }

    /// Configure the local radio. Failure here is fatal for the device.
    pub fn initialize(&mut self, config: &RadioConfig) -> Result<(), Error> {
        self.stack.configure(config).map_err(|e| {
            error!("BLE radio configuration failed: {}", e.0);
            Error::RadioUnavailable(e)
        })?;
        info!("BLE radio ready (local MTU {})", config.local_mtu);
        Ok(())
    }

    /// Begin a scan session. Each named device is reported once.
    pub fn scan_start(&mut self) -> Result<(), Error> {
        self.seen.clear();
        self.stack
            .start_scan(BLE_SCAN_DURATION_SECS)
            .map_err(Error::Scan)?;
        self.scanning = true;
        info!("BLE scan starting ({} s window)", BLE_SCAN_DURATION_SECS);
        Ok(())
    }

    pub fn scan_stop(&mut self) -> Result<(), Error> {
        self.stack.stop_scan().map_err(Error::Scan)?;
        self.scanning = false;
        Ok(())
    }

    /// Open a GATT client connection. No retry is attempted.
    pub fn connect(&mut self, address: Address) -> Result<(), Error> {
        if !matches!(self.state, LinkState::Idle | LinkState::Closed) {
            return Err(ConnectionError::AlreadyConnected.into());
        }
        self.stack.open(address).map_err(|e| {
            error!("BLE open rejected: {}", e.0);
            ConnectionError::Rejected(e)
        })?;
        self.pending = Some(address);
        self.state = LinkState::Opening;
        info!("Connecting to {:?}", address.bytes);
        Ok(())
    }

    /// Close the active connection. The disconnect event follows.
    ///
    /// While the link is still opening the attempt is cancelled instead,
    /// and a failed open event follows.
    pub fn disconnect(&mut self) -> Result<(), Error> {
        if let (LinkState::Opening, Some(address)) = (self.state, self.pending) {
            info!("Cancelling connection attempt");
            self.stack
                .cancel_open(address)
                .map_err(ConnectionError::Rejected)?;
            return Ok(());
        }
        let conn = self.connection.ok_or(ConnectionError::NotConnected)?;
        self.stack
            .close(conn.id)
            .map_err(ConnectionError::Rejected)?;
        Ok(())
    }

    /// Write-with-response at the given security level.
    ///
    /// `SignedMitm` on an unbonded link is expected to fail at the
    /// application layer; it is the way bonding gets started.
    pub fn write_characteristic(
        &mut self,
        handle: u16,
        payload: &[u8],
        security: AuthRequirement,
    ) -> Result<(), Error> {
        let conn = self.ready_connection()?;
        debug!("write handle {} len {} auth {}", handle, payload.len(), security);
        self.stack
            .write_characteristic(conn.id, handle, payload, security)
            .map_err(|e| {
                error!("write_characteristic rejected: {}", e.0);
                WriteError::Rejected(e)
            })?;
        Ok(())
    }

    /// Locate the CCCD of `handle`, register for its values, then write
    /// `mode` to it. Returns the CCCD handle the write went to.
    pub fn configure_notification(
        &mut self,
        range: HandleRange,
        handle: u16,
        mode: CccdMode,
        security: AuthRequirement,
    ) -> Result<u16, Error> {
        let conn = self.ready_connection()?;

        let declared = self
            .stack
            .descriptor_count(conn.id, range, handle)
            .map_err(DescriptorError::Rejected)?;
        if declared == 0 {
            error!("No descriptors for handle {}", handle);
            return Err(DescriptorError::CccdMissing.into());
        }

        let mut descriptors: Vec<DescriptorElem, GATT_MAX_DESCRIPTORS> = Vec::new();
        self.stack
            .descriptors(conn.id, handle, &mut descriptors)
            .map_err(DescriptorError::Rejected)?;
        if descriptors.len() != declared as usize {
            error!(
                "Descriptor count mismatch for handle {}: declared {} got {}",
                handle,
                declared,
                descriptors.len()
            );
            return Err(DescriptorError::CountMismatch {
                declared,
                returned: descriptors.len() as u16,
            }
            .into());
        }

        let cccd = descriptors
            .iter()
            .find(|d| d.uuid == CCCD)
            .ok_or_else(|| {
                error!("No CCCD for handle {}", handle);
                DescriptorError::CccdMissing
            })?;

        if let Err(e) = self.stack.register_for_notify(conn.address, handle) {
            warn!("register_for_notify failed for handle {}: {}", handle, e.0);
        }

        info!("Writing CCCD {} = {}", cccd.handle, mode.value());
        self.stack
            .write_descriptor(conn.id, cccd.handle, &mode.to_bytes(), security)
            .map_err(|e| {
                error!("write_descriptor rejected: {}", e.0);
                DescriptorError::Rejected(e)
            })?;
        Ok(cccd.handle)
    }

    /// All characteristics of the active connection within `range`.
    pub fn characteristics(
        &self,
        range: HandleRange,
        out: &mut Vec<CharacteristicElem, GATT_MAX_CHARACTERISTICS>,
    ) -> Result<(), Error> {
        let conn = self.connection.ok_or(ConnectionError::NotConnected)?;
        self.stack
            .characteristics(conn.id, range, out)
            .map_err(|e| Error::Discovery(DiscoveryError::Query(e)))
    }

    /// Fold one stack event into the link state.
    pub fn handle_event<'a>(&mut self, event: &'a StackEvent) -> Option<TransportEvent<'a>> {
        match event {
            StackEvent::ScanResult { address, data } => self.on_scan_result(address, data),
            StackEvent::ScanStopped => {
                info!("BLE scan stopped - {} devices reported", self.seen.len());
                self.scanning = false;
                Some(TransportEvent::ScanStopped)
            }
            StackEvent::Opened {
                status,
                conn,
                interface,
                address,
            } => {
                if self.state != LinkState::Opening {
                    warn!("Open event in state {}", self.state);
                    return None;
                }
                self.pending = None;
                if !status.is_ok() {
                    error!("Connection failed, status {}", status.0);
                    self.state = LinkState::Closed;
                    return Some(TransportEvent::ConnectFailed(ConnectionError::OpenFailed(
                        *status,
                    )));
                }

                info!("Connection open (conn {})", conn.0);
                self.connection = Some(Connection {
                    address: *address,
                    id: *conn,
                    interface: *interface,
                });
                self.state = LinkState::NegotiatingMtu;
                if let Err(e) = self.stack.request_mtu(*conn) {
                    error!("MTU request rejected: {}", e.0);
                    return Some(self.abort(ConnectionError::Rejected(e)));
                }
                None
            }
            StackEvent::MtuConfigured { status, mtu } => {
                if self.state != LinkState::NegotiatingMtu {
                    return None;
                }
                if !status.is_ok() {
                    error!("MTU config failed, status {}", status.0);
                    return Some(self.abort(ConnectionError::MtuFailed(*status)));
                }
                info!("MTU {} negotiated, searching services", mtu);
                let conn = self.connection?;
                self.state = LinkState::Discovering;
                if let Err(e) = self.stack.search_services(conn.id) {
                    error!("Service search rejected: {}", e.0);
                    return Some(self.abort(ConnectionError::Rejected(e)));
                }
                None
            }
            StackEvent::ServiceFound { uuid, range } => {
                if self.state != LinkState::Discovering {
                    return None;
                }
                debug!("Service {} handles {}..{}", uuid, range.start, range.end);
                Some(TransportEvent::ServiceFound {
                    uuid,
                    range: *range,
                })
            }
            StackEvent::SearchComplete { status } => {
                if self.state != LinkState::Discovering {
                    return None;
                }
                if !status.is_ok() {
                    error!("Search service failed, status {}", status.0);
                    return Some(self.abort(ConnectionError::SearchFailed(*status)));
                }
                self.state = LinkState::Ready;
                info!("Service search complete");
                Some(TransportEvent::DiscoveryComplete)
            }
            StackEvent::CharacteristicWritten { status, handle } => {
                if !status.is_ok() {
                    error!("Write char {} failed, status {}", handle, status.0);
                }
                Some(TransportEvent::CharacteristicWritten {
                    handle: *handle,
                    result: if status.is_ok() {
                        Ok(())
                    } else {
                        Err(WriteError::Failed(*status))
                    },
                })
            }
            StackEvent::DescriptorWritten { status, handle } => {
                if status.is_ok() {
                    debug!("Write descr {} ok", handle);
                } else {
                    error!("Write descr {} failed, status {}", handle, status.0);
                }
                Some(TransportEvent::DescriptorWritten {
                    ok: status.is_ok(),
                    handle: *handle,
                })
            }
            StackEvent::Notification { handle, value, .. } => {
                debug!("Notify on {}: {=[u8]:x}", handle, value.as_slice());
                Some(TransportEvent::Notification {
                    handle: *handle,
                    value: value.as_slice(),
                })
            }
            StackEvent::BondingComplete { success, reason } => {
                if *success {
                    info!("Bond DONE");
                } else {
                    warn!("Bond FAIL reason = {:#x}", reason);
                }
                Some(TransportEvent::BondingComplete {
                    result: if *success {
                        Ok(())
                    } else {
                        Err(SecurityError::BondingFailed { reason: *reason })
                    },
                })
            }
            StackEvent::Disconnected { reason } => {
                info!("Disconnected (reason {:#x})", reason);
                self.connection = None;
                self.pending = None;
                self.state = LinkState::Closed;
                Some(TransportEvent::Disconnected)
            }
        }
    }

    fn on_scan_result<'a>(&mut self, address: &Address, data: &[u8]) -> Option<TransportEvent<'a>> {
        if !self.scanning {
            return None;
        }
        if self.seen.iter().any(|a| a == address) {
            return None;
        }
        let name = complete_local_name(data)?;
        if self.seen.push(*address).is_err() {
            warn!("Discovered list full - ignoring {}", name.as_str());
            return None;
        }
        info!("Found: {}", name.as_str());
        Some(TransportEvent::DeviceFound(DiscoveredDevice {
            address: *address,
            name,
        }))
    }

    /// Close a half-open link after a fatal setup failure.
    fn abort(&mut self, error: ConnectionError) -> TransportEvent<'static> {
        if let Some(conn) = self.connection {
            if let Err(e) = self.stack.close(conn.id) {
                warn!("close after failure rejected: {}", e.0);
            }
        }
        self.state = LinkState::Closed;
        TransportEvent::ConnectFailed(error)
    }

    fn ready_connection(&self) -> Result<Connection, Error> {
        match (self.state, self.connection) {
            (LinkState::Ready, Some(conn)) => Ok(conn),
            _ => {
                warn!("GATT operation on link in state {}", self.state);
                Err(ConnectionError::NotConnected.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::{AddressType, GattStatus};
    use crate::testing::{addr, adv_named, Call, RecordingStack};

    fn opened(adapter: &mut TransportAdapter<RecordingStack>) {
        let address = addr(1);
        adapter.connect(address).unwrap();
        let ev = StackEvent::Opened {
            status: GattStatus::OK,
            conn: ConnectionId(7),
            interface: GattInterface(3),
            address,
        };
        assert!(adapter.handle_event(&ev).is_none());
    }

    fn ready() -> TransportAdapter<RecordingStack> {
        let mut adapter = TransportAdapter::new(RecordingStack::default());
        opened(&mut adapter);
        adapter.handle_event(&StackEvent::MtuConfigured {
            status: GattStatus::OK,
            mtu: 200,
        });
        let done = adapter.handle_event(&StackEvent::SearchComplete {
            status: GattStatus::OK,
        });
        assert_eq!(done, Some(TransportEvent::DiscoveryComplete));
        adapter
    }

    #[test]
    fn connect_walks_through_mtu_and_discovery() {
        let mut adapter = TransportAdapter::new(RecordingStack::default());
        opened(&mut adapter);
        assert_eq!(adapter.state(), LinkState::NegotiatingMtu);
        assert_eq!(adapter.stack().calls.last(), Some(&Call::RequestMtu(ConnectionId(7))));

        adapter.handle_event(&StackEvent::MtuConfigured {
            status: GattStatus::OK,
            mtu: 200,
        });
        assert_eq!(adapter.state(), LinkState::Discovering);
        assert_eq!(adapter.stack().calls.last(), Some(&Call::SearchServices(ConnectionId(7))));

        let uuid = Uuid::from_u128(1);
        let service_found = StackEvent::ServiceFound {
            uuid,
            range: HandleRange::new(1, 5),
        };
        let found = adapter.handle_event(&service_found);
        assert!(matches!(found, Some(TransportEvent::ServiceFound { .. })));

        adapter.handle_event(&StackEvent::SearchComplete {
            status: GattStatus::OK,
        });
        assert!(adapter.is_ready());
        assert_eq!(adapter.connection().unwrap().interface, GattInterface(3));
    }

    #[test]
    fn failed_open_closes_attempt() {
        let mut adapter = TransportAdapter::new(RecordingStack::default());
        adapter.connect(addr(1)).unwrap();
        let ev = StackEvent::Opened {
            status: GattStatus::ERROR,
            conn: ConnectionId(0),
            interface: GattInterface(0),
            address: addr(1),
        };
        assert_eq!(
            adapter.handle_event(&ev),
            Some(TransportEvent::ConnectFailed(ConnectionError::OpenFailed(
                GattStatus::ERROR
            )))
        );
        assert_eq!(adapter.state(), LinkState::Closed);
        assert!(adapter.connection().is_none());
        // A fresh attempt is allowed.
        assert!(adapter.connect(addr(1)).is_ok());
    }

    #[test]
    fn mtu_failure_is_fatal() {
        let mut adapter = TransportAdapter::new(RecordingStack::default());
        opened(&mut adapter);
        let out = adapter.handle_event(&StackEvent::MtuConfigured {
            status: GattStatus::ERROR,
            mtu: 23,
        });
        assert!(matches!(
            out,
            Some(TransportEvent::ConnectFailed(ConnectionError::MtuFailed(_)))
        ));
        assert_eq!(adapter.state(), LinkState::Closed);
        assert_eq!(adapter.stack().calls.last(), Some(&Call::Close(ConnectionId(7))));
    }

    #[test]
    fn search_failure_closes_link() {
        let mut adapter = TransportAdapter::new(RecordingStack::default());
        opened(&mut adapter);
        adapter.handle_event(&StackEvent::MtuConfigured {
            status: GattStatus::OK,
            mtu: 200,
        });
        let out = adapter.handle_event(&StackEvent::SearchComplete {
            status: GattStatus::ERROR,
        });
        assert!(matches!(
            out,
            Some(TransportEvent::ConnectFailed(ConnectionError::SearchFailed(_)))
        ));
        assert_eq!(adapter.state(), LinkState::Closed);
    }

    #[test]
    fn second_connect_is_refused() {
        let mut adapter = TransportAdapter::new(RecordingStack::default());
        adapter.connect(addr(1)).unwrap();
        assert_eq!(
            adapter.connect(addr(2)),
            Err(Error::Connection(ConnectionError::AlreadyConnected))
        );
    }

    #[test]
    fn disconnect_while_opening_cancels_the_attempt() {
        let mut adapter = TransportAdapter::new(RecordingStack::default());
        adapter.connect(addr(1)).unwrap();
        adapter.disconnect().unwrap();
        assert_eq!(adapter.stack().calls.last(), Some(&Call::CancelOpen(addr(1))));
        assert_eq!(adapter.state(), LinkState::Opening);

        let opened = StackEvent::Opened {
            status: GattStatus::ERROR,
            conn: ConnectionId(0),
            interface: GattInterface(0),
            address: addr(1),
        };
        let ev = adapter.handle_event(&opened);
        assert_eq!(
            ev,
            Some(TransportEvent::ConnectFailed(ConnectionError::OpenFailed(
                GattStatus::ERROR
            )))
        );
        assert_eq!(adapter.state(), LinkState::Closed);
        assert_eq!(
            adapter.disconnect(),
            Err(Error::Connection(ConnectionError::NotConnected))
        );
    }

    #[test]
    fn disconnect_event_closes_from_any_state() {
        let mut adapter = ready();
        let out = adapter.handle_event(&StackEvent::Disconnected { reason: 0x13 });
        assert_eq!(out, Some(TransportEvent::Disconnected));
        assert_eq!(adapter.state(), LinkState::Closed);
        assert!(adapter.connection().is_none());
        assert!(adapter.write_characteristic(1, &[0], AuthRequirement::None).is_err());
    }

    #[test]
    fn writes_require_ready_link() {
        let mut adapter = TransportAdapter::new(RecordingStack::default());
        opened(&mut adapter);
        assert_eq!(
            adapter.write_characteristic(0x20, &[1], AuthRequirement::None),
            Err(Error::Connection(ConnectionError::NotConnected))
        );
    }

    #[test]
    fn write_passes_security_level() {
        let mut adapter = ready();
        adapter
            .write_characteristic(0x20, &[0x01, b'T'], AuthRequirement::SignedMitm)
            .unwrap();
        assert_eq!(
            adapter.stack().calls.last(),
            Some(&Call::WriteChar {
                handle: 0x20,
                data: vec![0x01, b'T'],
                auth: AuthRequirement::SignedMitm,
            })
        );
    }

    #[test]
    fn write_and_bond_failures_carry_their_cause() {
        let mut adapter = ready();
        let ev = adapter.handle_event(&StackEvent::CharacteristicWritten {
            status: GattStatus::INSUFFICIENT_AUTHENTICATION,
            handle: 0x12,
        });
        assert_eq!(
            ev,
            Some(TransportEvent::CharacteristicWritten {
                handle: 0x12,
                result: Err(WriteError::Failed(GattStatus::INSUFFICIENT_AUTHENTICATION)),
            })
        );

        let ev = adapter.handle_event(&StackEvent::BondingComplete {
            success: false,
            reason: 0x85,
        });
        assert_eq!(
            ev,
            Some(TransportEvent::BondingComplete {
                result: Err(SecurityError::BondingFailed { reason: 0x85 }),
            })
        );
        let ev = adapter.handle_event(&StackEvent::BondingComplete {
            success: true,
            reason: 0,
        });
        assert_eq!(ev, Some(TransportEvent::BondingComplete { result: Ok(()) }));
    }

    #[test]
    fn configure_notification_writes_cccd() {
        let mut adapter = ready();
        adapter.stack_mut().add_descriptor(0x21, CCCD, 0x22);
        let cccd = adapter
            .configure_notification(
                HandleRange::new(0x10, 0x30),
                0x21,
                CccdMode::Indicate,
                AuthRequirement::None,
            )
            .unwrap();
        assert_eq!(cccd, 0x22);

        let calls = &adapter.stack().calls;
        assert!(calls.contains(&Call::RegisterNotify(0x21)));
        assert_eq!(
            calls.last(),
            Some(&Call::WriteDescr {
                handle: 0x22,
                data: vec![0x02, 0x00],
                auth: AuthRequirement::None,
            })
        );
    }

    #[test]
    fn configure_notification_without_cccd_fails() {
        let mut adapter = ready();
        adapter
            .stack_mut()
            .add_descriptor(0x21, Uuid::Uuid16(0x2901), 0x22);
        let err = adapter
            .configure_notification(
                HandleRange::new(0x10, 0x30),
                0x21,
                CccdMode::Notify,
                AuthRequirement::None,
            )
            .unwrap_err();
        assert_eq!(err, Error::Descriptor(DescriptorError::CccdMissing));

        let err = adapter
            .configure_notification(
                HandleRange::new(0x10, 0x30),
                0x40,
                CccdMode::Notify,
                AuthRequirement::None,
            )
            .unwrap_err();
        assert_eq!(err, Error::Descriptor(DescriptorError::CccdMissing));
    }

    #[test]
    fn configure_notification_count_mismatch_fails() {
        let mut adapter = ready();
        adapter.stack_mut().add_descriptor(0x21, CCCD, 0x22);
        adapter.stack_mut().descriptor_count_override = Some(2);
        let err = adapter
            .configure_notification(
                HandleRange::new(0x10, 0x30),
                0x21,
                CccdMode::Notify,
                AuthRequirement::None,
            )
            .unwrap_err();
        assert_eq!(
            err,
            Error::Descriptor(DescriptorError::CountMismatch {
                declared: 2,
                returned: 1
            })
        );
        assert!(!adapter
            .stack()
            .calls
            .iter()
            .any(|c| matches!(c, Call::WriteDescr { .. })));
    }

    #[test]
    fn scan_reports_each_named_device_once() {
        let mut adapter = TransportAdapter::new(RecordingStack::default());
        adapter.scan_start().unwrap();

        let camera = StackEvent::ScanResult {
            address: addr(1),
            data: adv_named("EOS R6"),
        };
        let unnamed = StackEvent::ScanResult {
            address: addr(2),
            data: heapless::Vec::from_slice(&[0x02, 0x01, 0x06]).unwrap(),
        };

        match adapter.handle_event(&camera) {
            Some(TransportEvent::DeviceFound(dev)) => {
                assert_eq!(dev.name.as_str(), "EOS R6");
                assert_eq!(dev.address.kind, AddressType::Public);
            }
            other => panic!("expected device, got {:?}", other),
        }
        assert!(adapter.handle_event(&camera).is_none());
        assert!(adapter.handle_event(&unnamed).is_none());

        // A new session reports the camera again.
        adapter.handle_event(&StackEvent::ScanStopped);
        assert!(!adapter.is_scanning());
        adapter.scan_start().unwrap();
        assert!(adapter.handle_event(&camera).is_some());
    }

    #[test]
    fn scan_results_outside_session_are_ignored() {
        let mut adapter = TransportAdapter::new(RecordingStack::default());
        let camera = StackEvent::ScanResult {
            address: addr(1),
            data: adv_named("EOS R6"),
        };
        assert!(adapter.handle_event(&camera).is_none());
    }

    #[test]
    fn radio_failure_is_fatal() {
        let mut stack = RecordingStack::default();
        stack.fail_configure = true;
        let mut adapter = TransportAdapter::new(stack);
        assert!(matches!(
            adapter.initialize(&RadioConfig::default()),
            Err(Error::RadioUnavailable(_))
        ));
    }
}
