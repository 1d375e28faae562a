//! Camera remote-control protocol.
//!
//! The camera exposes two 128-bit GATT services: a *pair* service used to
//! exchange identities once, and a *trigger* service used by an
//! authenticated remote to fire the shutter. This module holds the logical
//! identities of those attributes; the submodules resolve them to handles
//! ([`registry`]), describe the protocol transactions as data ([`command`]),
//! step through them ([`sequencer`]) and tie everything to the transport
//! ([`engine`]).

pub mod command;
pub mod engine;
pub mod interval;
pub mod registry;
pub mod sequencer;

pub use command::{Command, CommandSet, Payload};
pub use engine::{CameraRemote, EngineConfig, RemoteListener};
pub use interval::IntervalShooter;
pub use registry::Registry;
pub use sequencer::{FailurePolicy, Outcome, Sequencer, StepFailure};

use crate::ble::Uuid;

/// Logical GATT service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServiceId {
    Pair,
    Trigger,
}

impl ServiceId {
    pub const ALL: [ServiceId; 2] = [ServiceId::Pair, ServiceId::Trigger];

    /// Wanted characteristics of this service, in match order.
    pub const fn characteristics(self) -> &'static [CharacteristicId] {
        match self {
            ServiceId::Pair => &[CharacteristicId::PairCommand, CharacteristicId::PairData],
            ServiceId::Trigger => &[
                CharacteristicId::Trigger,
                CharacteristicId::TriggerNotify,
                CharacteristicId::TriggerConfig,
            ],
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            ServiceId::Pair => 0,
            ServiceId::Trigger => 1,
        }
    }
}

/// Logical GATT characteristic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CharacteristicId {
    PairCommand,
    PairData,
    Trigger,
    TriggerNotify,
    TriggerConfig,
}

impl CharacteristicId {
    pub const COUNT: usize = 5;

    /// Owning service.
    pub const fn service(self) -> ServiceId {
        match self {
            CharacteristicId::PairCommand | CharacteristicId::PairData => ServiceId::Pair,
            _ => ServiceId::Trigger,
        }
    }

    /// Slot in the handle table.
    pub(crate) const fn slot(self) -> usize {
        match self {
            CharacteristicId::PairCommand => 0,
            CharacteristicId::PairData => 1,
            CharacteristicId::Trigger => 2,
            CharacteristicId::TriggerNotify => 3,
            CharacteristicId::TriggerConfig => 4,
        }
    }

    pub(crate) const ALL: [CharacteristicId; 5] = [
        CharacteristicId::PairCommand,
        CharacteristicId::PairData,
        CharacteristicId::Trigger,
        CharacteristicId::TriggerNotify,
        CharacteristicId::TriggerConfig,
    ];
}

/// Progress of the pairing flow as shown to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PairStage {
    Bond,
    Request,
    Wait,
    Info,
    Done,
}

/// Identity of a protocol transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transaction {
    PairRequest,
    PairInfo,
    Connect,
    Trigger,
}

/// UUIDs identifying the camera's services and characteristics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CameraProfile {
    pub pair_service: Uuid,
    pub trigger_service: Uuid,
    pub pair_command: Uuid,
    pub pair_data: Uuid,
    pub trigger: Uuid,
    pub trigger_notify: Uuid,
    pub trigger_config: Uuid,
}

impl CameraProfile {
    /// Canon remote service layout.
    pub const CANON: CameraProfile = CameraProfile {
        pair_service: Uuid::from_u128(0x00050000_0000_1000_0000_d8492fffa821),
        pair_command: Uuid::from_u128(0x00050002_0000_1000_0000_d8492fffa821),
        pair_data: Uuid::from_u128(0x00050003_0000_1000_0000_d8492fffa821),
        trigger_service: Uuid::from_u128(0x00030000_0000_1000_0000_d8492fffa821),
        trigger: Uuid::from_u128(0x00030030_0000_1000_0000_d8492fffa821),
        trigger_notify: Uuid::from_u128(0x00030031_0000_1000_0000_d8492fffa821),
        trigger_config: Uuid::from_u128(0x00030010_0000_1000_0000_d8492fffa821),
    };

    pub fn service_uuid(&self, service: ServiceId) -> Uuid {
        match service {
            ServiceId::Pair => self.pair_service,
            ServiceId::Trigger => self.trigger_service,
        }
    }

    pub fn characteristic_uuid(&self, id: CharacteristicId) -> Uuid {
        match id {
            CharacteristicId::PairCommand => self.pair_command,
            CharacteristicId::PairData => self.pair_data,
            CharacteristicId::Trigger => self.trigger,
            CharacteristicId::TriggerNotify => self.trigger_notify,
            CharacteristicId::TriggerConfig => self.trigger_config,
        }
    }

    /// The logical service a discovered service UUID stands for, if any.
    pub fn service_for(&self, uuid: &Uuid) -> Option<ServiceId> {
        ServiceId::ALL
            .into_iter()
            .find(|&s| self.service_uuid(s) == *uuid)
    }
}

impl Default for CameraProfile {
    fn default() -> Self {
        Self::CANON
    }
}
