//! Shared system event-flag bus.
//!
//! A process-wide set of named boolean flags, the only object mutated by
//! more than one task. Level bits (alarm / fault / door) are owned by the
//! processing task, which sets and clears them to match current truth each
//! cycle. `COMMIT_REQ` is edge-triggered: the commit timer sets it, and the
//! single consumer takes it with `wait(.., clear_on_exit = true, ..)`,
//! guaranteeing at-most-one delivery per timer period.
//!
//! ```text
//! Commit Timer ──set(COMMIT_REQ)──▶ ┌──────────┐ ◀──get()── Signaling
//! Processing  ──set/clear(level)──▶ │ EventBus │
//! Processing  ◀─wait(COMMIT_REQ)─── └──────────┘
//! ```
//!
//! Every operation takes the internal lock for its whole duration, so all
//! flag mutations are atomic with respect to concurrent callers. The only
//! ordering promise `wait` makes is that returned bits were observed set at
//! some point during the call.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

use core::fmt;

// ───────────────────────────────────────────────────────────────
// Flag bits
// ───────────────────────────────────────────────────────────────

/// Named system flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SysFlags(pub u32);

impl SysFlags {
    pub const NONE: Self = Self(0);
    /// Alarm confirmed by the dwell state machine (level bit).
    pub const ALARM_ACTIVE: Self = Self(1 << 0);
    /// Last sample carried a sensor fault (level bit).
    pub const SENSOR_FAULT: Self = Self(1 << 1);
    /// Door currently open (level bit).
    pub const DOOR_OPEN: Self = Self(1 << 2);
    /// Commit requested by the timer (edge bit, read-and-clear).
    pub const COMMIT_REQ: Self = Self(1 << 3);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl core::ops::BitOr for SysFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for SysFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(SysFlags, &str); 4] = [
            (SysFlags::ALARM_ACTIVE, "ALARM_ACTIVE"),
            (SysFlags::SENSOR_FAULT, "SENSOR_FAULT"),
            (SysFlags::DOOR_OPEN, "DOOR_OPEN"),
            (SysFlags::COMMIT_REQ, "COMMIT_REQ"),
        ];
        if self.is_empty() {
            return write!(f, "NONE");
        }
        let mut first = true;
        for (bit, name) in NAMES {
            if self.contains(bit) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Event bus
// ───────────────────────────────────────────────────────────────

/// Shared flag-bit state visible to every task.
pub struct EventBus {
    bits: Mutex<u32>,
    changed: Condvar,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            bits: Mutex::new(0),
            changed: Condvar::new(),
        }
    }

    /// Set the given bits and wake any waiters.
    pub fn set(&self, mask: SysFlags) {
        let mut bits = self.bits.lock().expect("bus lock poisoned");
        *bits |= mask.0;
        self.changed.notify_all();
    }

    /// Clear the given bits.
    pub fn clear(&self, mask: SysFlags) {
        let mut bits = self.bits.lock().expect("bus lock poisoned");
        *bits &= !mask.0;
    }

    /// Snapshot of the current flag word.
    pub fn get(&self) -> SysFlags {
        SysFlags(*self.bits.lock().expect("bus lock poisoned"))
    }

    /// Block until the requested bits are present, up to `timeout`.
    ///
    /// * `wait_all` — require every bit of `mask` (otherwise any one).
    /// * `clear_on_exit` — atomically clear the satisfied `mask` bits
    ///   before returning; this is the consume path for `COMMIT_REQ`.
    ///
    /// Returns the flag word observed when the wait was decided. With a
    /// zero timeout this is a non-blocking test-and-clear. On timeout the
    /// returned word simply does not contain the requested bits.
    pub fn wait(
        &self,
        mask: SysFlags,
        clear_on_exit: bool,
        wait_all: bool,
        timeout: Duration,
    ) -> SysFlags {
        let satisfied = |bits: u32| {
            if wait_all {
                bits & mask.0 == mask.0
            } else {
                bits & mask.0 != 0
            }
        };

        let mut bits = self.bits.lock().expect("bus lock poisoned");
        let deadline = std::time::Instant::now() + timeout;

        while !satisfied(*bits) {
            let now = std::time::Instant::now();
            if now >= deadline {
                return SysFlags(*bits);
            }
            let (guard, _) = self
                .changed
                .wait_timeout(bits, deadline - now)
                .expect("bus lock poisoned");
            bits = guard;
        }

        let observed = *bits;
        if clear_on_exit {
            *bits &= !mask.0;
        }
        SysFlags(observed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
