//! Interval shooting: fire the shutter every N seconds.
//!
//! Pure countdown logic driven by a one-second tick from the firmware.

use crate::config::{INTERVAL_DEFAULT_SECS, INTERVAL_MAX_SECS, INTERVAL_MIN_SECS};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IntervalShooter {
    interval: u16,
    remaining: u16,
    running: bool,
}

impl IntervalShooter {
    pub const fn new() -> Self {
        Self {
            interval: INTERVAL_DEFAULT_SECS,
            remaining: INTERVAL_DEFAULT_SECS,
            running: false,
        }
    }

    pub fn interval(&self) -> u16 {
        self.interval
    }

    /// Set the interval, clamped to 1 s ..= 1 h. Takes effect on the next
    /// reload.
    pub fn set_interval(&mut self, secs: u16) -> u16 {
        self.interval = secs.clamp(INTERVAL_MIN_SECS, INTERVAL_MAX_SECS);
        self.interval
    }

    pub fn increase(&mut self) -> u16 {
        self.set_interval(self.interval.saturating_add(1))
    }

    pub fn decrease(&mut self) -> u16 {
        self.set_interval(self.interval.saturating_sub(1))
    }

    /// One button press worth of change: 1 s steps up to a minute, 10 s
    /// steps up to ten minutes, whole minutes above that.
    pub fn nudge(&mut self, up: bool) -> u16 {
        let secs = self.interval;
        let step = match (up, secs) {
            (true, 0..=59) | (false, 0..=60) => 1,
            (true, 60..=599) | (false, 61..=600) => 10,
            _ => 60,
        };
        if up {
            self.set_interval(secs.saturating_add(step))
        } else {
            self.set_interval(secs.saturating_sub(step))
        }
    }

    pub fn start(&mut self) {
        self.remaining = self.interval;
        self.running = true;
        info!("Interval shooting every {} s", self.interval);
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Start or stop; returns whether shooting is now running.
    pub fn toggle(&mut self) -> bool {
        if self.running {
            self.stop();
        } else {
            self.start();
        }
        self.running
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Seconds until the next exposure.
    pub fn remaining(&self) -> u16 {
        self.remaining
    }

    /// One second elapsed. Returns `true` when the shutter is due.
    pub fn tick(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.remaining = self.interval;
            return true;
        }
        false
    }
}

impl Default for IntervalShooter {
    fn default() -> Self {
        Self::new()
    }
}
