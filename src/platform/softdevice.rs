//! [`BleStack`] on top of the Nordic SoftDevice S140.
//!
//! The protocol engine calls the stack synchronously, but every SoftDevice
//! GATT/GAP operation is async. The two halves meet through channels:
//!
//! - [`SoftdeviceStack`] (owned by the engine) turns each request into a
//!   [`Request`] and `try_send`s it to the driver. A full queue is reported
//!   as a synchronous stack error.
//! - [`driver_task`] owns the SoftDevice connection, executes requests one
//!   at a time and posts the outcomes as [`StackEvent`]s. Notifications
//!   from the open link are forwarded while a request runs as well as
//!   between requests.
//!
//! Characteristics and descriptors found during service search are kept in
//! [`GATT_CACHE`] so the attribute queries can answer without awaiting.

use core::cell::RefCell;
use core::pin::pin;

use camtrig::ble::stack::{AdvData, CharacteristicElem, DescriptorElem, Value};
use camtrig::ble::uuid::CCCD;
use camtrig::ble::{
    Address, AddressType, AuthRequirement, BleStack, ConnectionId, GattInterface, GattStatus,
    HandleRange, RadioConfig, StackEvent, Uuid,
};
use camtrig::camera::{CameraProfile, ServiceId};
use camtrig::config::{
    self, BLE_LOCAL_MTU, GATT_MAX_CHARACTERISTICS, GATT_MAX_DESCRIPTORS, GATT_MAX_WRITE_LEN,
};
use camtrig::error::StackError;
use defmt::{debug, info, warn};
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::{Receiver, Sender};
use embassy_time::{with_timeout, Duration};
use heapless::Vec;
use nrf_softdevice::ble::gatt_client::{self, Characteristic, Descriptor, DiscoverError};
use nrf_softdevice::ble::{
    central, Address as SdAddress, AddressType as SdAddressType, Connection, EncryptError,
    HvxType, Uuid as SdUuid,
};
use nrf_softdevice::{raw, Softdevice};

use crate::platform::security::{is_secure, wait_for_secure_link, Bonder};
use crate::platform::{EVENT_QUEUE_DEPTH, REQUEST_QUEUE_DEPTH};

/// The request queue to the driver is full.
pub const QUEUE_FULL: StackError = StackError(-1);
/// Payload longer than any protocol command.
pub const PAYLOAD_TOO_LONG: StackError = StackError(-2);

/// HCI "connection terminated by local host".
const LOCAL_HOST_TERMINATED: u8 = 0x16;
/// HCI "remote user terminated connection". The SoftDevice wrapper does not
/// surface the real reason once the link is gone.
const REMOTE_TERMINATED: u8 = 0x13;

pub type WriteData = Vec<u8, GATT_MAX_WRITE_LEN>;

/// Work item for the driver task.
#[derive(Clone, defmt::Format)]
pub enum Request {
    Configure(RadioConfig),
    StartScan { duration_secs: u32 },
    StopScan,
    Open(Address),
    CancelOpen,
    Close,
    RequestMtu,
    SearchServices,
    Write {
        handle: u16,
        data: WriteData,
        auth: AuthRequirement,
    },
    WriteDescriptor {
        handle: u16,
        data: WriteData,
        auth: AuthRequirement,
    },
}

pub type RequestSender = Sender<'static, CriticalSectionRawMutex, Request, REQUEST_QUEUE_DEPTH>;
pub type RequestReceiver = Receiver<'static, CriticalSectionRawMutex, Request, REQUEST_QUEUE_DEPTH>;
pub type EventSender = Sender<'static, CriticalSectionRawMutex, StackEvent, EVENT_QUEUE_DEPTH>;

// ═══════════════════════════════════════════════════════════════════════════
// Attribute cache
// ═══════════════════════════════════════════════════════════════════════════

/// Attributes of the current connection, filled by service search.
pub struct GattCache {
    characteristics: Vec<CharacteristicElem, GATT_MAX_CHARACTERISTICS>,
    /// Descriptors keyed by the value handle of their characteristic.
    descriptors: Vec<(u16, DescriptorElem), GATT_MAX_CHARACTERISTICS>,
    /// Value handles whose notifications reach the event queue.
    notify: Vec<u16, GATT_MAX_CHARACTERISTICS>,
}

impl GattCache {
    pub const fn new() -> Self {
        Self {
            characteristics: Vec::new(),
            descriptors: Vec::new(),
            notify: Vec::new(),
        }
    }

    fn clear(&mut self) {
        self.characteristics.clear();
        self.descriptors.clear();
        self.notify.clear();
    }
}

pub static GATT_CACHE: Mutex<CriticalSectionRawMutex, RefCell<GattCache>> =
    Mutex::new(RefCell::new(GattCache::new()));

// ═══════════════════════════════════════════════════════════════════════════
// Engine-facing stack
// ═══════════════════════════════════════════════════════════════════════════

pub struct SoftdeviceStack {
    requests: RequestSender,
}

impl SoftdeviceStack {
    pub fn new(requests: RequestSender) -> Self {
        Self { requests }
    }

    fn post(&self, request: Request) -> Result<(), StackError> {
        self.requests.try_send(request).map_err(|_| {
            warn!("BLE request queue full");
            QUEUE_FULL
        })
    }
}

fn payload(data: &[u8]) -> Result<WriteData, StackError> {
    Vec::from_slice(data).map_err(|_| PAYLOAD_TOO_LONG)
}

impl BleStack for SoftdeviceStack {
    fn configure(&mut self, config: &RadioConfig) -> Result<(), StackError> {
        self.post(Request::Configure(*config))
    }

    fn start_scan(&mut self, duration_secs: u32) -> Result<(), StackError> {
        self.post(Request::StartScan { duration_secs })
    }

    fn stop_scan(&mut self) -> Result<(), StackError> {
        self.post(Request::StopScan)
    }

    fn open(&mut self, address: Address) -> Result<(), StackError> {
        self.post(Request::Open(address))
    }

    fn close(&mut self, _conn: ConnectionId) -> Result<(), StackError> {
        self.post(Request::Close)
    }

    fn cancel_open(&mut self, _address: Address) -> Result<(), StackError> {
        self.post(Request::CancelOpen)
    }

    fn request_mtu(&mut self, _conn: ConnectionId) -> Result<(), StackError> {
        self.post(Request::RequestMtu)
    }

    fn search_services(&mut self, _conn: ConnectionId) -> Result<(), StackError> {
        self.post(Request::SearchServices)
    }

    fn characteristics(
        &self,
        _conn: ConnectionId,
        range: HandleRange,
        out: &mut Vec<CharacteristicElem, GATT_MAX_CHARACTERISTICS>,
    ) -> Result<(), StackError> {
        GATT_CACHE.lock(|cache| {
            for c in cache.borrow().characteristics.iter() {
                if range.contains(c.handle) && out.push(*c).is_err() {
                    break;
                }
            }
        });
        Ok(())
    }

    fn descriptor_count(
        &self,
        _conn: ConnectionId,
        range: HandleRange,
        char_handle: u16,
    ) -> Result<u16, StackError> {
        Ok(GATT_CACHE.lock(|cache| {
            cache
                .borrow()
                .descriptors
                .iter()
                .filter(|(owner, d)| *owner == char_handle && range.contains(d.handle))
                .count() as u16
        }))
    }

    fn descriptors(
        &self,
        _conn: ConnectionId,
        char_handle: u16,
        out: &mut Vec<DescriptorElem, GATT_MAX_DESCRIPTORS>,
    ) -> Result<(), StackError> {
        GATT_CACHE.lock(|cache| {
            for (owner, d) in cache.borrow().descriptors.iter() {
                if *owner == char_handle && out.push(*d).is_err() {
                    break;
                }
            }
        });
        Ok(())
    }

    fn register_for_notify(&mut self, _address: Address, handle: u16) -> Result<(), StackError> {
        GATT_CACHE.lock(|cache| {
            let mut cache = cache.borrow_mut();
            if cache.notify.contains(&handle) {
                return Ok(());
            }
            cache.notify.push(handle).map_err(|_| QUEUE_FULL)
        })
    }

    fn write_characteristic(
        &mut self,
        _conn: ConnectionId,
        handle: u16,
        data: &[u8],
        auth: AuthRequirement,
    ) -> Result<(), StackError> {
        let data = payload(data)?;
        self.post(Request::Write { handle, data, auth })
    }

    fn write_descriptor(
        &mut self,
        _conn: ConnectionId,
        handle: u16,
        data: &[u8],
        auth: AuthRequirement,
    ) -> Result<(), StackError> {
        let data = payload(data)?;
        self.post(Request::WriteDescriptor { handle, data, auth })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Service discovery client
// ═══════════════════════════════════════════════════════════════════════════

/// Discovery client for one camera service (`ServiceId::ALL[S]`).
///
/// Collects the service's characteristics and descriptors instead of
/// binding fixed fields, so the handle table stays in the library.
struct ServiceClient<const S: usize> {
    characteristics: Vec<CharacteristicElem, GATT_MAX_CHARACTERISTICS>,
    descriptors: Vec<(u16, DescriptorElem), GATT_MAX_CHARACTERISTICS>,
    first: u16,
    last: u16,
}

impl<const S: usize> ServiceClient<S> {
    fn service() -> ServiceId {
        ServiceId::ALL[S]
    }

    fn range(&self) -> HandleRange {
        // The service declaration sits just before the first characteristic
        // declaration.
        HandleRange::new(self.first.saturating_sub(1), self.last)
    }
}

impl<const S: usize> gatt_client::Client for ServiceClient<S> {
    type Event = (u16, Value, bool);

    fn on_hvx(
        &self,
        _conn: &Connection,
        type_: HvxType,
        handle: u16,
        data: &[u8],
    ) -> Option<Self::Event> {
        let wanted = GATT_CACHE.lock(|cache| cache.borrow().notify.contains(&handle));
        if !wanted {
            debug!("Unrouted notification on {:#x}", handle);
            return None;
        }
        let mut value = Value::new();
        let n = data.len().min(value.capacity());
        let _ = value.extend_from_slice(&data[..n]);
        Some((handle, value, matches!(type_, HvxType::Indication)))
    }

    fn uuid() -> SdUuid {
        sd_uuid(&CameraProfile::CANON.service_uuid(Self::service()))
    }

    fn new_undiscovered(_conn: Connection) -> Self {
        Self {
            characteristics: Vec::new(),
            descriptors: Vec::new(),
            first: u16::MAX,
            last: 0,
        }
    }

    fn discovered_characteristic(
        &mut self,
        characteristic: &Characteristic,
        descriptors: &[Descriptor],
    ) {
        self.first = self.first.min(characteristic.handle_decl);
        self.last = self.last.max(characteristic.handle_value);

        let profile = CameraProfile::CANON;
        let known = Self::service()
            .characteristics()
            .iter()
            .map(|id| profile.characteristic_uuid(*id))
            .find(|uuid| characteristic.uuid == Some(sd_uuid(uuid)));
        let Some(uuid) = known else {
            debug!("Skipping characteristic at {:#x}", characteristic.handle_value);
            return;
        };

        let handle = characteristic.handle_value;
        if self
            .characteristics
            .push(CharacteristicElem {
                uuid,
                handle,
                properties: 0,
            })
            .is_err()
        {
            warn!("Too many characteristics in {} service", Self::service());
            return;
        }

        let cccd = sd_uuid(&CCCD);
        for d in descriptors {
            self.last = self.last.max(d.handle);
            // Only the CCCD is ever looked up by UUID.
            let uuid = if d.uuid == Some(cccd) {
                CCCD
            } else {
                Uuid::Uuid16(0)
            };
            let _ = self
                .descriptors
                .push((handle, DescriptorElem { uuid, handle: d.handle }));
        }
    }

    fn discovery_complete(&mut self) -> Result<(), DiscoverError> {
        Ok(())
    }
}

type NotifyClient = ServiceClient<1>;

// ═══════════════════════════════════════════════════════════════════════════
// Driver task
// ═══════════════════════════════════════════════════════════════════════════

/// Execute stack requests against the SoftDevice forever.
pub async fn driver_task(
    sd: &'static Softdevice,
    bonder: &'static Bonder,
    requests: RequestReceiver,
    events: EventSender,
) -> ! {
    let mut driver = Driver {
        sd,
        bonder,
        events,
        radio: RadioConfig::default(),
        conn: None,
    };
    let mut pending: Option<Request> = None;

    loop {
        let request = match pending.take() {
            Some(request) => request,
            None => driver.next_request(&requests).await,
        };
        pending = driver.serve(request, &requests).await;
    }
}

/// Queue a notification for the remote task.
fn forward(events: EventSender) -> impl FnMut((u16, Value, bool)) {
    move |(handle, value, indication)| {
        let event = StackEvent::Notification {
            handle,
            value,
            indication,
        };
        if events.try_send(event).is_err() {
            warn!("BLE event queue full - notification dropped");
        }
    }
}

struct Driver {
    sd: &'static Softdevice,
    bonder: &'static Bonder,
    events: EventSender,
    radio: RadioConfig,
    conn: Option<Connection>,
}

impl Driver {
    fn post(&self, event: StackEvent) {
        if self.events.try_send(event).is_err() {
            warn!("BLE event queue full - event dropped");
        }
    }

    /// Wait for the next request while forwarding notifications from the
    /// open link, if any.
    async fn next_request(&mut self, requests: &RequestReceiver) -> Request {
        loop {
            let Some(conn) = self.conn.clone() else {
                return requests.receive().await;
            };

            let client = NotifyClient::new_undiscovered(conn.clone());
            let notifications = gatt_client::run(&conn, &client, forward(self.events));
            let woken = select(requests.receive(), notifications).await;
            match woken {
                Either::First(request) => return request,
                Either::Second(_) => self.link_lost(),
            }
        }
    }

    /// Execute `request`, forwarding notifications from the open link
    /// until it is done.
    async fn serve(&mut self, request: Request, requests: &RequestReceiver) -> Option<Request> {
        // An open replaces the link, so there is nothing to listen on.
        let conn = match self.conn.clone() {
            Some(conn) if !matches!(request, Request::Open(_)) => conn,
            _ => return self.execute(request, requests).await,
        };

        let client = NotifyClient::new_undiscovered(conn.clone());
        let notifications = gatt_client::run(&conn, &client, forward(self.events));
        let woken = select(self.execute(request, requests), notifications).await;
        match woken {
            Either::First(pending) => pending,
            Either::Second(_) => {
                self.link_lost();
                None
            }
        }
    }

    fn link_lost(&mut self) {
        if self.conn.take().is_none() {
            return;
        }
        info!("Camera link lost");
        GATT_CACHE.lock(|cache| cache.borrow_mut().clear());
        self.post(StackEvent::Disconnected {
            reason: REMOTE_TERMINATED,
        });
    }

    /// Run one request. Returns a request that arrived while scanning and
    /// has not been served yet.
    async fn execute(&mut self, request: Request, requests: &RequestReceiver) -> Option<Request> {
        debug!("BLE request: {}", request);
        match request {
            Request::Configure(radio) => {
                self.radio = radio;
                self.bonder.configure(&radio.security);
                info!("Radio configured (MTU {})", radio.local_mtu);
            }
            Request::StartScan { duration_secs } => {
                return self.scan(duration_secs, requests).await;
            }
            // Only meaningful while a scan is running.
            Request::StopScan => self.post(StackEvent::ScanStopped),
            Request::Open(address) => return self.open(address, requests).await,
            // The attempt finished before the cancel arrived.
            Request::CancelOpen | Request::Close => self.close(),
            Request::RequestMtu => {
                // The SoftDevice exchanges the ATT MTU while connecting.
                let mtu = self
                    .conn
                    .as_ref()
                    .map(|_| BLE_LOCAL_MTU.min(self.radio.local_mtu));
                match mtu {
                    Some(mtu) => self.post(StackEvent::MtuConfigured {
                        status: GattStatus::OK,
                        mtu,
                    }),
                    None => self.post(StackEvent::MtuConfigured {
                        status: GattStatus::ERROR,
                        mtu: 0,
                    }),
                }
            }
            Request::SearchServices => self.search_services().await,
            Request::Write { handle, data, auth } => {
                self.write(handle, &data, auth, false).await;
            }
            Request::WriteDescriptor { handle, data, auth } => {
                self.write(handle, &data, auth, true).await;
            }
        }
        None
    }

    async fn scan(&mut self, duration_secs: u32, requests: &RequestReceiver) -> Option<Request> {
        info!("BLE scan starting ({} s window)", duration_secs);
        let config = central::ScanConfig {
            active: self.radio.scan.active,
            interval: u32::from(self.radio.scan.interval),
            window: u32::from(self.radio.scan.window),
            ..Default::default()
        };

        let events = self.events;
        let scan = central::scan(self.sd, &config, |params| {
            // SAFETY: the SoftDevice guarantees `p_data` is valid for `len`
            // bytes for the duration of the callback.
            let data =
                unsafe { core::slice::from_raw_parts(params.data.p_data, params.data.len as usize) };
            let mut adv = AdvData::new();
            let n = data.len().min(adv.capacity());
            let _ = adv.extend_from_slice(&data[..n]);
            let event = StackEvent::ScanResult {
                address: from_sd_address(&SdAddress::from_raw(params.peer_addr)),
                data: adv,
            };
            if events.try_send(event).is_err() {
                warn!("BLE event queue full - advertisement dropped");
            }
            None::<()>
        });
        let window = with_timeout(Duration::from_secs(u64::from(duration_secs)), scan);

        let interrupted = match select(window, requests.receive()).await {
            Either::First(Ok(Err(_))) => {
                warn!("BLE scan ended with error");
                None
            }
            Either::First(_) => None,
            Either::Second(Request::StopScan) => None,
            Either::Second(other) => Some(other),
        };
        info!("BLE scan stopped");
        self.post(StackEvent::ScanStopped);
        interrupted
    }

    /// Connect to `address`. Gives up after `BLE_CONNECT_TIMEOUT_SECS` or
    /// on a cancel request. Returns one request that arrived meanwhile and
    /// still has to be served.
    async fn open(&mut self, address: Address, requests: &RequestReceiver) -> Option<Request> {
        if self.conn.is_some() {
            warn!("Open while a link is up - closing old link");
            self.close();
        }

        let peer = to_sd_address(&address);
        let whitelist = [&peer];
        let conn_cfg = central::ConnectConfig {
            scan_config: central::ScanConfig {
                whitelist: Some(&whitelist),
                ..Default::default()
            },
            conn_params: raw::ble_gap_conn_params_t {
                min_conn_interval: config::BLE_CONN_INTERVAL_MIN,
                max_conn_interval: config::BLE_CONN_INTERVAL_MAX,
                slave_latency: config::BLE_SLAVE_LATENCY,
                conn_sup_timeout: config::BLE_SUP_TIMEOUT,
            },
            ..Default::default()
        };

        let limit = Duration::from_secs(u64::from(config::BLE_CONNECT_TIMEOUT_SECS));
        let mut connect = pin!(with_timeout(
            limit,
            central::connect_with_security(self.sd, &conn_cfg, self.bonder),
        ));
        let mut deferred = None;
        let result = loop {
            if deferred.is_some() {
                break Some(connect.as_mut().await);
            }
            match select(connect.as_mut(), requests.receive()).await {
                Either::First(result) => break Some(result),
                Either::Second(Request::CancelOpen | Request::Close) => break None,
                Either::Second(other) => {
                    debug!("{} deferred until the link is up", other);
                    deferred = Some(other);
                }
            }
        };

        let conn = match result {
            Some(Ok(Ok(conn))) => Some(conn),
            Some(Ok(Err(_))) => {
                warn!("Connect failed");
                None
            }
            Some(Err(_)) => {
                warn!("Camera did not answer within {} s", limit.as_secs());
                None
            }
            None => {
                info!("Connect cancelled");
                None
            }
        };
        let Some(conn) = conn else {
            self.post(StackEvent::Opened {
                status: GattStatus::ERROR,
                conn: ConnectionId(0),
                interface: GattInterface(0),
                address,
            });
            return deferred;
        };

        // A remembered camera gets its link encrypted straight away. New
        // cameras bond later, through the pairing transaction.
        match conn.encrypt() {
            Ok(()) => {
                if !wait_for_secure_link(&conn).await {
                    warn!("Stored keys rejected by camera");
                }
            }
            Err(EncryptError::PeerKeysNotFound) => debug!("No bond for this camera yet"),
            Err(_) => warn!("Link encryption refused"),
        }

        let id = ConnectionId(conn.handle().unwrap_or(0));
        self.conn = Some(conn);
        self.post(StackEvent::Opened {
            status: GattStatus::OK,
            conn: id,
            interface: GattInterface(0),
            address,
        });
        deferred
    }

    fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if conn.disconnect().is_err() {
                warn!("Disconnect refused - link already down");
            }
            GATT_CACHE.lock(|cache| cache.borrow_mut().clear());
            self.post(StackEvent::Disconnected {
                reason: LOCAL_HOST_TERMINATED,
            });
        }
    }

    async fn search_services(&mut self) {
        let Some(conn) = self.conn.clone() else {
            self.post(StackEvent::SearchComplete {
                status: GattStatus::ERROR,
            });
            return;
        };
        GATT_CACHE.lock(|cache| cache.borrow_mut().clear());

        let status = match self.discover::<0>(&conn).await {
            Ok(()) => self.discover::<1>(&conn).await,
            Err(e) => Err(e),
        };
        let status = match status {
            Ok(()) => GattStatus::OK,
            Err(_) => GattStatus::ERROR,
        };
        self.post(StackEvent::SearchComplete { status });
    }

    /// Discover one camera service into the cache. A missing service is
    /// not an error here; the registry reports it once search completes.
    async fn discover<const S: usize>(&self, conn: &Connection) -> Result<(), DiscoverError> {
        let client: ServiceClient<S> = match gatt_client::discover(conn).await {
            Ok(client) => client,
            Err(DiscoverError::ServiceNotFound) => {
                info!("{} service not advertised by camera", ServiceClient::<S>::service());
                return Ok(());
            }
            Err(e) => {
                warn!("Service discovery failed");
                return Err(e);
            }
        };

        GATT_CACHE.lock(|cache| {
            let mut cache = cache.borrow_mut();
            for c in client.characteristics.iter() {
                let _ = cache.characteristics.push(*c);
            }
            for d in client.descriptors.iter() {
                let _ = cache.descriptors.push(*d);
            }
        });

        let uuid = CameraProfile::CANON.service_uuid(ServiceClient::<S>::service());
        self.post(StackEvent::ServiceFound {
            uuid,
            range: client.range(),
        });
        Ok(())
    }

    /// Write a characteristic value or a descriptor.
    ///
    /// `SignedMitm` on an unencrypted link fails the write with
    /// insufficient authentication and starts bonding, as a phone stack
    /// does. The value is not written; the steps after bonding write what
    /// the camera needs.
    async fn write(&mut self, handle: u16, data: &[u8], auth: AuthRequirement, descriptor: bool) {
        let written = |status: GattStatus| {
            if descriptor {
                StackEvent::DescriptorWritten { status, handle }
            } else {
                StackEvent::CharacteristicWritten { status, handle }
            }
        };

        let Some(conn) = self.conn.clone() else {
            self.post(written(GattStatus::ERROR));
            return;
        };

        if auth == AuthRequirement::SignedMitm && !is_secure(&conn) {
            self.post(written(GattStatus::INSUFFICIENT_AUTHENTICATION));

            info!("Bonding with camera");
            let success = conn.request_pairing().is_ok() && wait_for_secure_link(&conn).await;
            if !success {
                warn!("Bonding failed");
            }
            self.post(StackEvent::BondingComplete { success, reason: 0 });
            return;
        }

        let status = match write_value(&conn, handle, data).await {
            Ok(()) => GattStatus::OK,
            Err(status) => status,
        };
        self.post(written(status));
        if auth == AuthRequirement::SignedMitm {
            // Already bonded: the bonding step completes at once.
            self.post(StackEvent::BondingComplete {
                success: true,
                reason: 0,
            });
        }
    }
}

async fn write_value(conn: &Connection, handle: u16, data: &[u8]) -> Result<(), GattStatus> {
    gatt_client::write(conn, handle, data).await.map_err(|_| {
        warn!("GATT write to {:#x} failed", handle);
        GattStatus::ERROR
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// Conversions
// ═══════════════════════════════════════════════════════════════════════════

fn sd_uuid(uuid: &Uuid) -> SdUuid {
    match uuid {
        Uuid::Uuid16(value) => SdUuid::new_16(*value),
        Uuid::Uuid128(_) => {
            let le = uuid.to_le_bytes().unwrap_or_default();
            SdUuid::new_128(&le)
        }
    }
}

fn to_sd_address(address: &Address) -> SdAddress {
    let kind = match address.kind {
        AddressType::Public => SdAddressType::Public,
        AddressType::Random => SdAddressType::RandomStatic,
        AddressType::RpaPublic => SdAddressType::RandomPrivateResolvable,
        AddressType::RpaRandom => SdAddressType::RandomPrivateNonResolvable,
    };
    SdAddress::new(kind, address.bytes)
}

fn from_sd_address(address: &SdAddress) -> Address {
    let kind = match address.address_type() {
        SdAddressType::Public => AddressType::Public,
        SdAddressType::RandomPrivateResolvable => AddressType::RpaPublic,
        SdAddressType::RandomPrivateNonResolvable => AddressType::RpaRandom,
        _ => AddressType::Random,
    };
    Address::new(kind, address.bytes())
}
