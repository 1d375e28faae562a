//! Command sequencer.
//!
//! Runs one [`CommandSet`] at a time. The sequencer never touches the
//! transport: it is told which completion arrived and answers with the
//! [`Progress`] the caller has to act on (dispatch the next step, report
//! the end of the transaction, or nothing).
//!
//! ```text
//!          start                 matching completion (ok)
//!   Idle ─────────▶ Step(0) ─────────────────────────────▶ Step(1) … Step(n-1) ──▶ Idle
//!                     │                                                  Finished(Success)
//!                     │ matching completion (failed)
//!                     ├── Report ──▶ Idle, Finished(Failed)
//!                     └── Stall  ──▶ stays on the step
//! ```

use crate::ble::stack::Value;
use crate::camera::command::{Command, CommandSet};
use crate::camera::{CharacteristicId, Transaction};
use crate::config::GATT_MAX_VALUE_LEN;
use crate::error::Error;

/// What to do when a non-bonding step reports failure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FailurePolicy {
    /// End the transaction with [`Outcome::Failed`].
    #[default]
    Report,
    /// Stay on the failed step until disconnect, abort or timeout.
    Stall,
}

/// Why a transaction ended early.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepFailure {
    /// A write result reported failure.
    Write,
    /// A descriptor write result reported failure.
    Descriptor,
    /// Bonding finished unsuccessfully.
    Bonding,
    /// The step stayed in flight too long.
    Timeout,
    /// The link went away.
    Disconnected,
    /// Cancelled by the application.
    Aborted,
    /// The step's transport call could not be issued.
    Dispatch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    Success,
    Failed(StepFailure),
}

/// Completion events the sequencer understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion<'a> {
    Write { ok: bool },
    Descriptor { ok: bool },
    Bonding { ok: bool },
    Indication {
        characteristic: CharacteristicId,
        value: &'a [u8],
    },
}

/// A transaction that just ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Finished {
    pub set: &'static CommandSet,
    /// Step the transaction ended on.
    pub cursor: usize,
    pub outcome: Outcome,
    /// Value received by the last `WaitIndication` step, if any.
    pub indication: Option<Value>,
}

impl Finished {
    pub fn transaction(&self) -> Transaction {
        self.set.transaction
    }

    pub fn step(&self) -> Option<&'static Command> {
        self.set.steps.get(self.cursor)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Progress {
    /// Not for the current step.
    Ignored,
    /// Issue this step next.
    Next(&'static Command),
    /// The step failed and the policy keeps it in place.
    Stalled,
    Finished(Finished),
}

#[derive(Debug)]
pub struct Sequencer {
    policy: FailurePolicy,
    active: Option<&'static CommandSet>,
    cursor: usize,
    indication: Option<Value>,
    epoch: u32,
}

impl Sequencer {
    pub const fn new(policy: FailurePolicy) -> Self {
        Self {
            policy,
            active: None,
            cursor: 0,
            indication: None,
            epoch: 0,
        }
    }

    /// Begin `set` at its first step.
    ///
    /// Refused with [`Error::Busy`] while another set is in flight.
    pub fn start(&mut self, set: &'static CommandSet) -> Result<Progress, Error> {
        if let Some(active) = self.active {
            warn!(
                "{} requested while {} is running",
                set.transaction, active.transaction
            );
            return Err(Error::Busy);
        }
        info!("{} start ({} steps)", set.transaction, set.len());
        self.active = Some(set);
        self.cursor = 0;
        self.indication = None;
        self.epoch = self.epoch.wrapping_add(1);
        match set.steps.first() {
            Some(step) => Ok(Progress::Next(step)),
            None => Ok(Progress::Finished(self.finish(set, Outcome::Success))),
        }
    }

    /// Feed one completion to the current step.
    pub fn on_completion(&mut self, completion: Completion<'_>) -> Progress {
        let Some(step) = self.current() else {
            return Progress::Ignored;
        };

        match (*step, completion) {
            (Command::Write(..), Completion::Write { ok }) => self.settle(ok, StepFailure::Write),

            (Command::WriteSecureBond(..), Completion::Bonding { ok })
            | (Command::EnableNotificationSafe(_), Completion::Bonding { ok }) => {
                self.settle(ok, StepFailure::Bonding)
            }

            (Command::EnableIndication(_), Completion::Descriptor { ok })
            | (Command::EnableNotification(_), Completion::Descriptor { ok }) => {
                self.settle(ok, StepFailure::Descriptor)
            }

            (
                Command::WaitIndication(target),
                Completion::Indication {
                    characteristic,
                    value,
                },
            ) if target == characteristic => {
                let len = value.len().min(GATT_MAX_VALUE_LEN);
                self.indication = Value::from_slice(&value[..len]).ok();
                self.advance()
            }

            _ => Progress::Ignored,
        }
    }

    /// End the active transaction with `failure`, whatever the policy.
    pub fn fail(&mut self, failure: StepFailure) -> Option<Finished> {
        let set = self.active?;
        Some(self.finish(set, Outcome::Failed(failure)))
    }

    /// Drop the active transaction without an outcome.
    pub fn reset(&mut self) {
        if let Some(set) = self.active {
            debug!("{} dropped at step {}", set.transaction, self.cursor);
        }
        self.active = None;
        self.cursor = 0;
        self.indication = None;
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// The step waiting for its completion.
    pub fn current(&self) -> Option<&'static Command> {
        self.active.and_then(|set| set.steps.get(self.cursor))
    }

    pub fn active_transaction(&self) -> Option<Transaction> {
        self.active.map(|set| set.transaction)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    /// Changes every time a new step becomes current.
    pub fn step_epoch(&self) -> u32 {
        self.epoch
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    fn settle(&mut self, ok: bool, failure: StepFailure) -> Progress {
        if ok {
            return self.advance();
        }
        let Some(set) = self.active else {
            return Progress::Ignored;
        };
        match self.policy {
            FailurePolicy::Report => {
                Progress::Finished(self.finish(set, Outcome::Failed(failure)))
            }
            FailurePolicy::Stall => {
                warn!("step {} failed ({}), stalled", self.cursor, failure);
                Progress::Stalled
            }
        }
    }

    fn advance(&mut self) -> Progress {
        let Some(set) = self.active else {
            return Progress::Ignored;
        };
        self.cursor += 1;
        self.epoch = self.epoch.wrapping_add(1);
        match set.steps.get(self.cursor) {
            Some(step) => {
                debug!("{} step {}/{}", set.transaction, self.cursor + 1, set.len());
                Progress::Next(step)
            }
            None => Progress::Finished(self.finish(set, Outcome::Success)),
        }
    }

    fn finish(&mut self, set: &'static CommandSet, outcome: Outcome) -> Finished {
        let (cursor, indication) = (self.cursor, self.indication.take());
        self.active = None;
        self.cursor = 0;
        self.epoch = self.epoch.wrapping_add(1);
        match outcome {
            Outcome::Success => info!("{} done", set.transaction),
            Outcome::Failed(f) => warn!("{} failed at step {}: {}", set.transaction, cursor, f),
        }
        Finished {
            set,
            cursor,
            outcome,
            indication,
        }
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new(FailurePolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::command::{pairing_accepted, CONNECT, PAIR_INFO, PAIR_REQUEST, TRIGGER};

    const W_OK: Completion<'static> = Completion::Write { ok: true };
    const W_FAIL: Completion<'static> = Completion::Write { ok: false };
    const D_OK: Completion<'static> = Completion::Descriptor { ok: true };
    const B_OK: Completion<'static> = Completion::Bonding { ok: true };

    fn finished(p: Progress) -> Finished {
        match p {
            Progress::Finished(f) => f,
            other => panic!("expected finish, got {:?}", other),
        }
    }

    #[test]
    fn set_of_n_completes_after_n_events() {
        let mut seq = Sequencer::default();
        assert_eq!(seq.start(&PAIR_INFO).unwrap(), Progress::Next(&PAIR_INFO.steps[0]));
        assert_eq!(seq.on_completion(W_OK), Progress::Next(&PAIR_INFO.steps[1]));
        assert_eq!(seq.on_completion(W_OK), Progress::Next(&PAIR_INFO.steps[2]));

        let done = finished(seq.on_completion(W_OK));
        assert_eq!(done.outcome, Outcome::Success);
        assert_eq!(done.transaction(), Transaction::PairInfo);
        assert!(seq.is_idle());

        // Exactly once: further events are not attributed to the set.
        assert_eq!(seq.on_completion(W_OK), Progress::Ignored);
    }

    #[test]
    fn start_while_busy_is_refused() {
        let mut seq = Sequencer::default();
        seq.start(&TRIGGER).unwrap();
        assert_eq!(seq.start(&CONNECT), Err(Error::Busy));
        assert_eq!(seq.active_transaction(), Some(Transaction::Trigger));
        assert_eq!(seq.cursor(), 0);
    }

    #[test]
    fn secure_write_waits_for_bonding() {
        let mut seq = Sequencer::default();
        seq.start(&PAIR_REQUEST).unwrap();

        // The signed write fails while bonding runs; that is not actionable.
        assert_eq!(seq.on_completion(W_FAIL), Progress::Ignored);
        assert_eq!(seq.cursor(), 0);

        assert_eq!(seq.on_completion(B_OK), Progress::Next(&PAIR_REQUEST.steps[1]));
        assert_eq!(seq.cursor(), 1);

        // A repeated bonding event does not advance the plain write step.
        assert_eq!(seq.on_completion(B_OK), Progress::Ignored);
        assert_eq!(seq.cursor(), 1);
    }

    #[test]
    fn failed_bonding_does_not_advance() {
        let mut seq = Sequencer::new(FailurePolicy::Stall);
        seq.start(&PAIR_REQUEST).unwrap();
        seq.on_completion(W_FAIL);
        assert_eq!(
            seq.on_completion(Completion::Bonding { ok: false }),
            Progress::Stalled
        );
        assert_eq!(seq.cursor(), 0);

        let mut seq = Sequencer::new(FailurePolicy::Report);
        seq.start(&PAIR_REQUEST).unwrap();
        let done = finished(seq.on_completion(Completion::Bonding { ok: false }));
        assert_eq!(done.outcome, Outcome::Failed(StepFailure::Bonding));
        assert_eq!(done.cursor, 0);
    }

    #[test]
    fn safe_notification_waits_for_bonding() {
        let mut seq = Sequencer::default();
        seq.start(&CONNECT).unwrap();
        assert_eq!(
            seq.on_completion(Completion::Descriptor { ok: false }),
            Progress::Ignored
        );
        assert_eq!(seq.on_completion(B_OK), Progress::Next(&CONNECT.steps[1]));
        assert_eq!(seq.on_completion(D_OK), Progress::Next(&CONNECT.steps[2]));
        assert_eq!(finished(seq.on_completion(W_OK)).outcome, Outcome::Success);
    }

    #[test]
    fn wait_indication_only_takes_its_characteristic() {
        let mut seq = Sequencer::default();
        seq.start(&PAIR_REQUEST).unwrap();
        seq.on_completion(B_OK);
        seq.on_completion(W_OK);
        seq.on_completion(D_OK);
        assert_eq!(seq.current(), Some(&PAIR_REQUEST.steps[3]));

        let other = Completion::Indication {
            characteristic: CharacteristicId::TriggerNotify,
            value: &[0x02],
        };
        assert_eq!(seq.on_completion(other), Progress::Ignored);

        let done = finished(seq.on_completion(Completion::Indication {
            characteristic: CharacteristicId::PairCommand,
            value: &[0x02],
        }));
        assert_eq!(done.outcome, Outcome::Success);
        let value = done.indication.unwrap();
        assert!(pairing_accepted(&value));
    }

    #[test]
    fn indication_payloads_other_than_accept_are_rejected() {
        for payload in [&[][..], &[0x00][..], &[0x00, 0x02][..]] {
            let mut seq = Sequencer::default();
            seq.start(&PAIR_REQUEST).unwrap();
            seq.on_completion(B_OK);
            seq.on_completion(W_OK);
            seq.on_completion(D_OK);
            let done = finished(seq.on_completion(Completion::Indication {
                characteristic: CharacteristicId::PairCommand,
                value: payload,
            }));
            assert!(!pairing_accepted(&done.indication.unwrap()));
        }
    }

    #[test]
    fn write_failure_follows_policy() {
        let mut seq = Sequencer::new(FailurePolicy::Stall);
        seq.start(&TRIGGER).unwrap();
        assert_eq!(seq.on_completion(W_FAIL), Progress::Stalled);
        assert_eq!(seq.active_transaction(), Some(Transaction::Trigger));

        let mut seq = Sequencer::new(FailurePolicy::Report);
        seq.start(&TRIGGER).unwrap();
        seq.on_completion(W_OK);
        let done = finished(seq.on_completion(W_FAIL));
        assert_eq!(done.outcome, Outcome::Failed(StepFailure::Write));
        assert_eq!(done.cursor, 1);
        assert!(seq.is_idle());
    }

    #[test]
    fn fail_and_reset_return_to_idle() {
        let mut seq = Sequencer::new(FailurePolicy::Stall);
        assert!(seq.fail(StepFailure::Timeout).is_none());

        seq.start(&TRIGGER).unwrap();
        seq.on_completion(W_FAIL);
        let done = seq.fail(StepFailure::Aborted).unwrap();
        assert_eq!(done.outcome, Outcome::Failed(StepFailure::Aborted));
        assert!(seq.is_idle());

        seq.start(&CONNECT).unwrap();
        seq.reset();
        assert!(seq.is_idle());
        assert_eq!(seq.current(), None);
    }

    #[test]
    fn epoch_moves_with_each_step() {
        let mut seq = Sequencer::default();
        let e0 = seq.step_epoch();
        seq.start(&TRIGGER).unwrap();
        let e1 = seq.step_epoch();
        assert_ne!(e0, e1);
        seq.on_completion(W_OK);
        assert_ne!(seq.step_epoch(), e1);
    }
}
