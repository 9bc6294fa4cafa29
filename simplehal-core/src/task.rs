//! Cooperative periodic-task helpers
//!
//! Non-blocking timers for superloop firmware. Each helper is polled with
//! the current millisecond count and reports whether its action is due.
//! All arithmetic wraps, so a 32-bit millisecond counter rolling over
//! after ~49 days does not stall or double-fire a timer.

use simplehal::Millis;

/// Milliseconds from `start` to `now`, across counter wrap-around
pub fn elapsed(start: u32, now: u32) -> u32 {
    now.wrapping_sub(start)
}

/// Fires every `period` milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Every {
    period: u32,
    last: u32,
}

impl Every {
    /// First run is due `period` ms after `now`
    pub const fn new(period: u32, now: u32) -> Self {
        Self { period, last: now }
    }

    /// Due immediately on the first poll
    pub const fn immediate(period: u32, now: u32) -> Self {
        Self {
            period,
            last: now.wrapping_sub(period),
        }
    }

    /// Configured period
    pub fn period(&self) -> u32 {
        self.period
    }

    /// Change the period without resetting the phase
    pub fn set_period(&mut self, period: u32) {
        self.period = period;
    }

    /// Returns true and re-arms when at least `period` ms have passed
    pub fn poll(&mut self, now: u32) -> bool {
        if elapsed(self.last, now) >= self.period {
            self.last = now;
            true
        } else {
            false
        }
    }

    /// [`Every::poll`] against a clock
    pub fn ready(&mut self, clock: &impl Millis) -> bool {
        self.poll(clock.millis())
    }

    /// Restart the period from `now`
    pub fn reset(&mut self, now: u32) {
        self.last = now;
    }
}

/// Fires once, `delay` ms after it is first polled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Once {
    delay: u32,
    start: Option<u32>,
    fired: bool,
}

impl Once {
    pub const fn new(delay: u32) -> Self {
        Self {
            delay,
            start: None,
            fired: false,
        }
    }

    /// Returns true exactly once
    pub fn poll(&mut self, now: u32) -> bool {
        if self.fired {
            return false;
        }
        let start = *self.start.get_or_insert(now);
        if elapsed(start, now) >= self.delay {
            self.fired = true;
            true
        } else {
            false
        }
    }

    /// [`Once::poll`] against a clock
    pub fn ready(&mut self, clock: &impl Millis) -> bool {
        self.poll(clock.millis())
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Arm again; the delay restarts at the next poll
    pub fn rearm(&mut self) {
        self.start = None;
        self.fired = false;
    }
}
