//! Camera protocol engine.
//!
//! [`CameraRemote`] is the single owner of the transport and of the
//! per-connection session (handle table + sequencer). Every stack event
//! goes through [`CameraRemote::handle`] on one task; the engine turns
//! them into sequencer progress and into [`RemoteListener`] callbacks.

use crate::ble::stack::{BleStack, StackEvent};
use crate::ble::{
    Address, CccdMode, DiscoveredDevice, HandleRange, LinkState, RadioConfig, TransportAdapter,
    TransportEvent,
};
use crate::camera::command::{pairing_accepted, Command, OnDone, PAIR_INFO};
use crate::camera::registry::Registry;
use crate::camera::sequencer::{Completion, Finished, Outcome, Progress, Sequencer, StepFailure};
use crate::camera::{CameraProfile, CharacteristicId, FailurePolicy, PairStage, Transaction};
use crate::config::STEP_TIMEOUT_MS;
use crate::error::{ConnectionError, DescriptorError, DiscoveryError, Error, WriteError};
use heapless::Vec;

/// Protocol callbacks for the UI layer. Every method defaults to doing
/// nothing.
pub trait RemoteListener {
    fn on_device_found(&mut self, _device: &DiscoveredDevice) {}

    fn on_scan_stopped(&mut self) {}

    /// Link up and every camera characteristic resolved.
    fn on_connected(&mut self) {}

    fn on_connect_failed(&mut self, _error: ConnectionError) {}

    /// Link up but the camera services could not be resolved.
    fn on_discovery_failed(&mut self, _error: DiscoveryError) {}

    fn on_pair_stage(&mut self, _stage: PairStage, _success: bool) {}

    /// The trigger service accepted us.
    fn on_authenticated(&mut self) {}

    fn on_transaction_failed(&mut self, _transaction: Transaction, _failure: StepFailure) {}

    fn on_disconnected(&mut self) {}
}

impl RemoteListener for () {}

/// Behaviour knobs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineConfig {
    pub failure_policy: FailurePolicy,
    /// Fail the running transaction when the link drops.
    pub reset_on_disconnect: bool,
    /// How long one step may stay in flight. `None` waits forever.
    pub step_timeout_ms: Option<u32>,
}

impl EngineConfig {
    /// Behave like the camera's reference remote: failed steps stall, a
    /// disconnect leaves the sequencer as it was, nothing times out.
    pub const fn compat() -> Self {
        Self {
            failure_policy: FailurePolicy::Stall,
            reset_on_disconnect: false,
            step_timeout_ms: None,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Report,
            reset_on_disconnect: true,
            step_timeout_ms: Some(STEP_TIMEOUT_MS),
        }
    }
}

/// Requests whose completion has not been seen yet. Bounds how many
/// abandoned requests can be told apart from live ones.
const MAX_OUTSTANDING: usize = 8;

/// Completion a transport request will produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Awaited {
    Write(u16),
    Descriptor(u16),
    Bonding,
}

/// A request in flight, tagged with the step that issued it.
#[derive(Clone, Copy, Debug)]
struct Outstanding {
    awaited: Awaited,
    epoch: u32,
}

/// State that lives for one connection.
#[derive(Debug)]
struct Session {
    registry: Registry,
    sequencer: Sequencer,
    /// Oldest first. The stack answers requests in the order it got them.
    outstanding: Vec<Outstanding, MAX_OUTSTANDING>,
}

impl Session {
    fn expect(&mut self, awaited: Awaited) {
        let entry = Outstanding {
            awaited,
            epoch: self.sequencer.step_epoch(),
        };
        if self.outstanding.is_full() {
            let dropped = self.outstanding.remove(0);
            warn!("Forgetting unanswered request {}", dropped.awaited);
        }
        // Cannot fail: room was made above.
        let _ = self.outstanding.push(entry);
    }

    /// Pair a completion with the oldest request it answers. True when
    /// that request belongs to the step in flight.
    fn claim(&mut self, awaited: Awaited) -> bool {
        let Some(pos) = self.outstanding.iter().position(|o| o.awaited == awaited) else {
            debug!("Unsolicited completion {}", awaited);
            return false;
        };
        let entry = self.outstanding.remove(pos);
        if self.sequencer.is_idle() || entry.epoch != self.sequencer.step_epoch() {
            debug!("Late completion {} dropped", awaited);
            return false;
        }
        true
    }

    fn clear(&mut self) {
        self.registry.clear();
        self.outstanding.clear();
    }
}

pub struct CameraRemote<S, L> {
    transport: TransportAdapter<S>,
    session: Session,
    profile: CameraProfile,
    config: EngineConfig,
    listener: L,
    /// Cause of the most recent failed write or bonding.
    last_error: Option<Error>,
}

impl<S: BleStack, L: RemoteListener> CameraRemote<S, L> {
    pub fn new(stack: S, listener: L) -> Self {
        Self::with_config(stack, listener, CameraProfile::default(), EngineConfig::default())
    }

    pub fn with_config(stack: S, listener: L, profile: CameraProfile, config: EngineConfig) -> Self {
        Self {
            transport: TransportAdapter::new(stack),
            session: Session {
                registry: Registry::new(),
                sequencer: Sequencer::new(config.failure_policy),
                outstanding: Vec::new(),
            },
            profile,
            config,
            listener,
            last_error: None,
        }
    }

    pub fn initialize(&mut self, radio: &RadioConfig) -> Result<(), Error> {
        self.transport.initialize(radio)
    }

    pub fn start_scan(&mut self) -> Result<(), Error> {
        self.transport.scan_start()
    }

    pub fn stop_scan(&mut self) -> Result<(), Error> {
        self.transport.scan_stop()
    }

    pub fn connect(&mut self, address: Address) -> Result<(), Error> {
        self.transport.connect(address)?;
        self.session.clear();
        Ok(())
    }

    pub fn disconnect(&mut self) -> Result<(), Error> {
        self.transport.disconnect()
    }

    /// Run pair-request, then pair-info if the camera accepts.
    pub fn start_pairing(&mut self) -> Result<(), Error> {
        self.start(Transaction::PairRequest)
    }

    /// Unlock the trigger service on an already paired camera.
    pub fn connect_authenticated(&mut self) -> Result<(), Error> {
        self.start(Transaction::Connect)
    }

    /// Fire the shutter once.
    pub fn trigger(&mut self) -> Result<(), Error> {
        self.start(Transaction::Trigger)
    }

    /// Cancel the running transaction.
    pub fn abort_transaction(&mut self) {
        if let Some(done) = self.session.sequencer.fail(StepFailure::Aborted) {
            self.drive(Progress::Finished(done));
        }
    }

    /// Time the current step may still take, if one is in flight.
    pub fn pending_timeout_ms(&self) -> Option<u32> {
        if self.session.sequencer.is_idle() {
            return None;
        }
        self.config.step_timeout_ms
    }

    /// The step in flight exceeded [`pending_timeout_ms`](Self::pending_timeout_ms).
    pub fn step_timed_out(&mut self) {
        if let Some(done) = self.session.sequencer.fail(StepFailure::Timeout) {
            self.drive(Progress::Finished(done));
        }
    }

    /// Changes whenever a new step becomes current; used to re-arm the
    /// step timer.
    pub fn step_epoch(&self) -> u32 {
        self.session.sequencer.step_epoch()
    }

    /// Feed one stack event. Must be called from a single task, in the
    /// order the stack emitted the events.
    pub fn handle(&mut self, event: &StackEvent) {
        let Some(event) = self.transport.handle_event(event) else {
            return;
        };

        match event {
            TransportEvent::DeviceFound(device) => self.listener.on_device_found(&device),
            TransportEvent::ScanStopped => self.listener.on_scan_stopped(),
            TransportEvent::ConnectFailed(error) => {
                self.session.clear();
                self.session.sequencer.reset();
                self.listener.on_connect_failed(error);
            }
            TransportEvent::ServiceFound { uuid, range } => {
                self.session.registry.record_service(&self.profile, uuid, range);
            }
            TransportEvent::DiscoveryComplete => self.on_discovery_complete(),
            TransportEvent::CharacteristicWritten { handle, result } => {
                if !self.session.claim(Awaited::Write(handle)) {
                    return;
                }
                let ok = result.is_ok();
                let signed = self
                    .session
                    .sequencer
                    .current()
                    .is_some_and(|step| step.completes_on_bonding());
                // A refused signed write only starts bonding.
                if let (Err(e), false) = (result, signed) {
                    self.last_error = Some(e.into());
                }
                if let Some(Command::Write(..)) = self.pairing_step() {
                    self.listener.on_pair_stage(PairStage::Request, ok);
                }
                let progress = self.session.sequencer.on_completion(Completion::Write { ok });
                self.drive(progress);
            }
            TransportEvent::DescriptorWritten { ok, handle } => {
                if !self.session.claim(Awaited::Descriptor(handle)) {
                    return;
                }
                if let Some(Command::EnableIndication(_)) = self.pairing_step() {
                    self.listener.on_pair_stage(PairStage::Wait, ok);
                }
                let progress = self
                    .session
                    .sequencer
                    .on_completion(Completion::Descriptor { ok });
                self.drive(progress);
            }
            TransportEvent::Notification { handle, value } => {
                let Some(characteristic) = self.session.registry.characteristic_for_handle(handle)
                else {
                    debug!("Notification on unknown handle {}", handle);
                    return;
                };
                let progress = self.session.sequencer.on_completion(Completion::Indication {
                    characteristic,
                    value,
                });
                self.drive(progress);
            }
            TransportEvent::BondingComplete { result } => {
                if !self.session.claim(Awaited::Bonding) {
                    return;
                }
                if let Err(e) = result {
                    self.last_error = Some(e.into());
                }
                let ok = result.is_ok();
                if let Some(Command::WriteSecureBond(..)) = self.pairing_step() {
                    self.listener.on_pair_stage(PairStage::Bond, ok);
                }
                let progress = self.session.sequencer.on_completion(Completion::Bonding { ok });
                self.drive(progress);
            }
            TransportEvent::Disconnected => {
                if self.config.reset_on_disconnect {
                    if let Some(done) = self.session.sequencer.fail(StepFailure::Disconnected) {
                        self.drive(Progress::Finished(done));
                    }
                }
                self.session.clear();
                self.listener.on_disconnected();
            }
        }
    }

    fn on_discovery_complete(&mut self) {
        match self.session.registry.resolve(&self.profile, &self.transport) {
            Ok(()) => {
                info!("Camera connected");
                self.listener.on_connected();
            }
            Err(Error::Discovery(e)) => self.listener.on_discovery_failed(e),
            Err(e) => error!("Characteristic resolution failed: {}", e),
        }
    }

    fn start(&mut self, transaction: Transaction) -> Result<(), Error> {
        if !self.is_ready() {
            warn!("{} requested without a resolved camera link", transaction);
            return Err(Error::NotReady);
        }

        self.last_error = None;
        match self.session.sequencer.start(transaction.command_set())? {
            Progress::Next(step) => {
                if let Err(e) = self.execute(step) {
                    if !tolerated(step, &e) {
                        error!("{} could not start: {}", transaction, e);
                        self.session.sequencer.reset();
                        return Err(e);
                    }
                    warn!("{} first step refused while bonding: {}", transaction, e);
                }
            }
            progress => self.drive(progress),
        }
        Ok(())
    }

    /// Act on sequencer progress until nothing more is due.
    fn drive(&mut self, mut progress: Progress) {
        loop {
            progress = match progress {
                Progress::Ignored | Progress::Stalled => return,
                Progress::Next(step) => match self.execute(step) {
                    Ok(()) => return,
                    Err(e) if tolerated(step, &e) => {
                        warn!("{} refused while bonding: {}", step, e);
                        return;
                    }
                    Err(e) => {
                        error!("{} dispatch failed: {}", step, e);
                        if self.config.failure_policy == FailurePolicy::Stall {
                            return;
                        }
                        match self.session.sequencer.fail(StepFailure::Dispatch) {
                            Some(done) => Progress::Finished(done),
                            None => return,
                        }
                    }
                },
                Progress::Finished(done) => self.complete(done),
            };
        }
    }

    /// Run the completion action of a finished set. May start a follow-up.
    fn complete(&mut self, done: Finished) -> Progress {
        let transaction = done.transaction();
        match done.outcome {
            Outcome::Success => match done.set.on_done {
                OnDone::InterpretPairing => {
                    let accepted = done
                        .indication
                        .as_deref()
                        .map(pairing_accepted)
                        .unwrap_or(false);
                    self.listener.on_pair_stage(PairStage::Info, accepted);
                    if accepted {
                        match self.session.sequencer.start(&PAIR_INFO) {
                            Ok(progress) => return progress,
                            Err(e) => error!("Pair info could not start: {}", e),
                        }
                    } else {
                        warn!("Camera refused pairing");
                    }
                }
                OnDone::PairingComplete => self.listener.on_pair_stage(PairStage::Done, true),
                OnDone::Authenticated => {
                    info!("Authenticated");
                    self.listener.on_authenticated();
                }
                OnDone::Nothing => {}
            },
            Outcome::Failed(failure) => {
                match transaction {
                    // Bond, write and descriptor results were already reported
                    // as they arrived.
                    Transaction::PairRequest
                        if !matches!(
                            failure,
                            StepFailure::Bonding | StepFailure::Write | StepFailure::Descriptor
                        ) =>
                    {
                        if let Some(step) = done.step() {
                            self.listener.on_pair_stage(stage_of(step), false);
                        }
                    }
                    Transaction::PairInfo => self.listener.on_pair_stage(PairStage::Done, false),
                    _ => {}
                }
                self.listener.on_transaction_failed(transaction, failure);
            }
        }
        Progress::Ignored
    }

    /// Issue the transport call for `step` and note the completions it
    /// will produce.
    fn execute(&mut self, step: &Command) -> Result<(), Error> {
        let target = step.target();
        let handle = self
            .session
            .registry
            .handle(target)
            .ok_or(DiscoveryError::Unresolved(target))?;

        let issued = match *step {
            Command::Write(_, payload) | Command::WriteSecureBond(_, payload) => self
                .transport
                .write_characteristic(handle, payload.bytes(), step.security())
                .map(|()| Some(Awaited::Write(handle))),
            Command::EnableIndication(_) => self
                .enable(target, handle, CccdMode::Indicate, step)
                .map(|cccd| Some(Awaited::Descriptor(cccd))),
            Command::EnableNotification(_) | Command::EnableNotificationSafe(_) => self
                .enable(target, handle, CccdMode::Notify, step)
                .map(|cccd| Some(Awaited::Descriptor(cccd))),
            Command::WaitIndication(_) => Ok(None),
        };

        match issued {
            Ok(awaited) => {
                if let Some(awaited) = awaited {
                    self.session.expect(awaited);
                }
                if step.completes_on_bonding() {
                    self.session.expect(Awaited::Bonding);
                }
                Ok(())
            }
            Err(e) => {
                if tolerated(step, &e) {
                    self.session.expect(Awaited::Bonding);
                }
                Err(e)
            }
        }
    }

    fn enable(
        &mut self,
        target: CharacteristicId,
        handle: u16,
        mode: CccdMode,
        step: &Command,
    ) -> Result<u16, Error> {
        let service = target.service();
        let range: HandleRange = self
            .session
            .registry
            .service_range(service)
            .ok_or(DiscoveryError::ServiceMissing(service))?;
        self.transport
            .configure_notification(range, handle, mode, step.security())
    }

    /// Current step, if the pairing request is running.
    fn pairing_step(&self) -> Option<Command> {
        match self.session.sequencer.active_transaction() {
            Some(Transaction::PairRequest) => self.session.sequencer.current().copied(),
            _ => None,
        }
    }

    /// Take the cause of the last failed write or bonding, if any.
    pub fn take_error(&mut self) -> Option<Error> {
        self.last_error.take()
    }

    /// Link up and handle table resolved.
    pub fn is_ready(&self) -> bool {
        self.transport.is_ready() && self.session.registry.is_resolved()
    }

    pub fn link_state(&self) -> LinkState {
        self.transport.state()
    }

    pub fn active_transaction(&self) -> Option<Transaction> {
        self.session.sequencer.active_transaction()
    }

    pub fn registry(&self) -> &Registry {
        &self.session.registry
    }

    pub fn transport(&self) -> &TransportAdapter<S> {
        &self.transport
    }

    pub fn stack(&self) -> &S {
        self.transport.stack()
    }

    pub fn stack_mut(&mut self) -> &mut S {
        self.transport.stack_mut()
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    pub fn profile(&self) -> &CameraProfile {
        &self.profile
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// Signed steps may be refused outright while the link is unbonded; the
/// bonding result still decides the step.
fn tolerated(step: &Command, error: &Error) -> bool {
    step.completes_on_bonding()
        && matches!(
            error,
            Error::Write(WriteError::Rejected(_)) | Error::Descriptor(DescriptorError::Rejected(_))
        )
}

/// Pairing stage a pair-request step reports under.
fn stage_of(step: &Command) -> PairStage {
    match step {
        Command::WriteSecureBond(..) => PairStage::Bond,
        Command::Write(..) => PairStage::Request,
        Command::EnableIndication(_) => PairStage::Wait,
        Command::WaitIndication(_) => PairStage::Info,
        _ => PairStage::Done,
    }
}
