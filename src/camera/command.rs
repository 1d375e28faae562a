//! Protocol transactions expressed as data.
//!
//! Each transaction is a fixed list of [`Command`]s executed one at a time,
//! plus what to do once the last one has completed.

use crate::ble::{AuthRequirement, CccdMode};
use crate::camera::{CharacteristicId, Transaction};

/// Acceptance byte at the start of the pair-request indication.
pub const PAIR_ACCEPTED: u8 = 0x02;

/// The camera accepts a pairing iff the first indicated byte is `0x02`.
pub fn pairing_accepted(value: &[u8]) -> bool {
    value.first() == Some(&PAIR_ACCEPTED)
}

/// Fixed payloads written by the protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Payload {
    /// Remote name announced to the camera.
    Name,
    /// Platform identifier (Android).
    Platform,
    Confirm,
    /// Shutter half of a trigger press.
    TriggerSeq0,
    /// Release half of a trigger press.
    TriggerSeq1,
    /// Trigger-service mode selection.
    TriggerConfig,
}

impl Payload {
    pub const fn bytes(self) -> &'static [u8] {
        match self {
            Payload::Name => &[0x01, b'T', b'I', b'M', b'E', b'R'],
            Payload::Platform => &[0x05, 0x02],
            Payload::Confirm => &[0x01],
            Payload::TriggerSeq0 => &[0x00, 0x01],
            Payload::TriggerSeq1 => &[0x00, 0x02],
            Payload::TriggerConfig => &[0x03],
        }
    }
}

/// One protocol step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Plain write; done on a successful write result.
    Write(CharacteristicId, Payload),
    /// Signed write that provokes bonding; done when bonding succeeds.
    WriteSecureBond(CharacteristicId, Payload),
    /// CCCD = indicate; done on a successful descriptor write.
    EnableIndication(CharacteristicId),
    /// No transport call; done when the characteristic indicates.
    WaitIndication(CharacteristicId),
    /// CCCD = notify; done on a successful descriptor write.
    EnableNotification(CharacteristicId),
    /// Signed CCCD = notify that provokes bonding; done when bonding succeeds.
    EnableNotificationSafe(CharacteristicId),
}

impl Command {
    pub const fn target(&self) -> CharacteristicId {
        match *self {
            Command::Write(c, _)
            | Command::WriteSecureBond(c, _)
            | Command::EnableIndication(c)
            | Command::WaitIndication(c)
            | Command::EnableNotification(c)
            | Command::EnableNotificationSafe(c) => c,
        }
    }

    /// Security level of the transport call this step issues.
    pub const fn security(&self) -> AuthRequirement {
        match self {
            Command::WriteSecureBond(..) | Command::EnableNotificationSafe(_) => {
                AuthRequirement::SignedMitm
            }
            _ => AuthRequirement::None,
        }
    }

    /// CCCD value for the notification steps.
    pub const fn cccd_mode(&self) -> Option<CccdMode> {
        match self {
            Command::EnableIndication(_) => Some(CccdMode::Indicate),
            Command::EnableNotification(_) | Command::EnableNotificationSafe(_) => {
                Some(CccdMode::Notify)
            }
            _ => None,
        }
    }

    /// Steps whose transport call is expected to fail while bonding runs.
    pub const fn completes_on_bonding(&self) -> bool {
        matches!(
            self,
            Command::WriteSecureBond(..) | Command::EnableNotificationSafe(_)
        )
    }
}

/// What happens after the last step of a set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OnDone {
    /// Inspect the indication; start pair-info if the camera accepted.
    InterpretPairing,
    /// Pairing finished.
    PairingComplete,
    /// Trigger service unlocked.
    Authenticated,
    Nothing,
}

/// An ordered, immutable protocol transaction.
#[derive(Debug, PartialEq, Eq)]
pub struct CommandSet {
    pub transaction: Transaction,
    pub steps: &'static [Command],
    pub on_done: OnDone,
}

impl CommandSet {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

pub static PAIR_REQUEST: CommandSet = CommandSet {
    transaction: Transaction::PairRequest,
    steps: &[
        Command::WriteSecureBond(CharacteristicId::PairCommand, Payload::Name),
        Command::Write(CharacteristicId::PairCommand, Payload::Name),
        Command::EnableIndication(CharacteristicId::PairCommand),
        Command::WaitIndication(CharacteristicId::PairCommand),
    ],
    on_done: OnDone::InterpretPairing,
};

pub static PAIR_INFO: CommandSet = CommandSet {
    transaction: Transaction::PairInfo,
    steps: &[
        Command::Write(CharacteristicId::PairData, Payload::Name),
        Command::Write(CharacteristicId::PairData, Payload::Platform),
        Command::Write(CharacteristicId::PairData, Payload::Confirm),
    ],
    on_done: OnDone::PairingComplete,
};

pub static CONNECT: CommandSet = CommandSet {
    transaction: Transaction::Connect,
    steps: &[
        Command::EnableNotificationSafe(CharacteristicId::TriggerNotify),
        Command::EnableNotification(CharacteristicId::TriggerNotify),
        Command::Write(CharacteristicId::TriggerConfig, Payload::TriggerConfig),
    ],
    on_done: OnDone::Authenticated,
};

pub static TRIGGER: CommandSet = CommandSet {
    transaction: Transaction::Trigger,
    steps: &[
        Command::Write(CharacteristicId::Trigger, Payload::TriggerSeq0),
        Command::Write(CharacteristicId::Trigger, Payload::TriggerSeq1),
    ],
    on_done: OnDone::Nothing,
};

impl Transaction {
    pub fn command_set(self) -> &'static CommandSet {
        match self {
            Transaction::PairRequest => &PAIR_REQUEST,
            Transaction::PairInfo => &PAIR_INFO,
            Transaction::Connect => &CONNECT,
            Transaction::Trigger => &TRIGGER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acceptance_looks_at_first_byte_only() {
        assert!(pairing_accepted(&[0x02]));
        assert!(pairing_accepted(&[0x02, 0xff]));
        // Only the first byte decides.
        assert!(pairing_accepted(&[0x02, 0x00]));
        assert!(!pairing_accepted(&[]));
        assert!(!pairing_accepted(&[0x00]));
        assert!(!pairing_accepted(&[0x00, 0x02]));
    }

    #[test]
    fn payload_wire_bytes() {
        assert_eq!(Payload::Name.bytes(), b"\x01TIMER");
        assert_eq!(Payload::Platform.bytes(), &[0x05, 0x02]);
        assert_eq!(Payload::Confirm.bytes(), &[0x01]);
        assert_eq!(Payload::TriggerSeq0.bytes(), &[0x00, 0x01]);
        assert_eq!(Payload::TriggerSeq1.bytes(), &[0x00, 0x02]);
        assert_eq!(Payload::TriggerConfig.bytes(), &[0x03]);
    }

    #[test]
    fn set_lengths() {
        assert_eq!(PAIR_REQUEST.len(), 4);
        assert_eq!(PAIR_INFO.len(), 3);
        assert_eq!(CONNECT.len(), 3);
        assert_eq!(TRIGGER.len(), 2);
        for t in [
            Transaction::PairRequest,
            Transaction::PairInfo,
            Transaction::Connect,
            Transaction::Trigger,
        ] {
            assert_eq!(t.command_set().transaction, t);
        }
    }

    #[test]
    fn secure_variants_use_signed_writes() {
        let bond = PAIR_REQUEST.steps[0];
        assert_eq!(bond.security(), AuthRequirement::SignedMitm);
        assert!(bond.completes_on_bonding());

        let safe = CONNECT.steps[0];
        assert_eq!(safe.security(), AuthRequirement::SignedMitm);
        assert_eq!(safe.cccd_mode(), Some(CccdMode::Notify));

        assert_eq!(CONNECT.steps[1].security(), AuthRequirement::None);
        assert_eq!(PAIR_REQUEST.steps[2].cccd_mode(), Some(CccdMode::Indicate));
        assert_eq!(PAIR_REQUEST.steps[3].cccd_mode(), None);
    }
}
