// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0
/*! Time structures.

The Foreman has no timer peripheral of its own; time is derived from the
core's cycle counter running at [`FOREMAN_FREQ_HZ`]. Time is only needed for
bounded diagnostic waits, never on the scheduling path.

 - [`Instant`] is used to represent absolute time.
 - [`Duration`] is used to represent relative time.
 - [`Clock`] is anything that can tell the current [`Instant`].
*/

use crate::memory_map::FOREMAN_FREQ_HZ;

use core::cmp;
use core::fmt;
use core::ops;
use ufmt::derive::uDebug;
use ufmt::uDisplay;
use ufmt::uWrite;
use ufmt::uwrite;

/// A representation of an absolute time value, in microseconds since reset.
#[derive(uDebug, Debug, Copy, Clone, PartialEq, Eq)]
pub struct Instant {
    micros: u64,
}

impl cmp::PartialOrd for Instant {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl cmp::Ord for Instant {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        self.micros.cmp(&other.micros)
    }
}

impl Instant {
    /// Create a new `Instant` from a number of clock cycles at `frequency` hertz.
    pub fn from_cycles(cycles: u64, frequency: u64) -> Instant {
        if frequency == 0 {
            panic!("Tried to create an Instant with a frequency of 0 hertz.")
        }
        // Split to avoid overflowing `cycles * 1e6` after a few hours at 1.2 GHz.
        let secs = cycles / frequency;
        let rest = cycles % frequency;
        Instant {
            micros: secs * 1_000_000 + rest * 1_000_000 / frequency,
        }
    }

    pub const fn from_micros(micros: u64) -> Instant {
        Instant { micros }
    }

    pub const fn from_millis(millis: u64) -> Instant {
        Instant {
            micros: millis * 1_000,
        }
    }

    /// The number of whole seconds represented by this `Instant`.
    pub const fn secs(&self) -> u64 {
        self.micros / 1_000_000
    }

    /// The number of whole milliseconds represented by this `Instant`.
    pub const fn millis(&self) -> u64 {
        self.micros / 1_000
    }

    /// The number of whole microseconds represented by this `Instant`.
    pub const fn micros(&self) -> u64 {
        self.micros
    }
}

impl ops::Add<Duration> for Instant {
    type Output = Instant;

    fn add(self, rhs: Duration) -> Instant {
        Instant {
            micros: self.micros.saturating_add(rhs.micros),
        }
    }
}

impl ops::Sub<Instant> for Instant {
    type Output = Duration;

    /// Saturates at zero when `rhs` is later than `self`.
    fn sub(self, rhs: Instant) -> Duration {
        Duration::from_micros(self.micros.saturating_sub(rhs.micros))
    }
}

/// A representation of a relative time, stored in microseconds.
#[derive(uDebug, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration {
    micros: u64,
}

impl Duration {
    pub const ZERO: Duration = Duration { micros: 0 };

    pub const fn from_micros(micros: u64) -> Duration {
        Duration { micros }
    }

    pub const fn from_millis(millis: u64) -> Duration {
        Duration {
            micros: millis * 1_000,
        }
    }

    pub const fn millis(&self) -> u64 {
        self.micros / 1_000
    }

    pub const fn micros(&self) -> u64 {
        self.micros
    }

    /// The number of clock cycles represented by this Duration given the frequency.
    ///
    /// Saturates at `u64::MAX`.
    pub const fn cycles(&self, frequency: u64) -> u64 {
        let secs = self.micros / 1_000_000;
        let rest = self.micros % 1_000_000;
        secs.saturating_mul(frequency)
            .saturating_add(rest.saturating_mul(frequency) / 1_000_000)
    }
}

impl ops::Add<Duration> for Duration {
    type Output = Duration;

    fn add(self, rhs: Duration) -> Duration {
        Duration {
            micros: self.micros.saturating_add(rhs.micros),
        }
    }
}

/// A source of the current time.
pub trait Clock {
    fn now(&self) -> Instant;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// [`Clock`] backed by the Foreman's `mcycle` counter.
#[derive(uDebug, Debug, Copy, Clone, Default)]
pub struct CycleClock;

impl Clock for CycleClock {
    fn now(&self) -> Instant {
        Instant::from_cycles(read_cycles(), FOREMAN_FREQ_HZ)
    }
}

#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
fn read_cycles() -> u64 {
    riscv::register::mcycle::read64()
}

#[cfg(not(any(target_arch = "riscv32", target_arch = "riscv64")))]
fn read_cycles() -> u64 {
    0
}

impl uDisplay for Instant {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        let secs = self.secs();
        let millis = self.millis() % 1000;
        let micros = self.micros % 1000;

        uwrite!(f, "{}.{}{}s", secs, Padded3(millis), Padded3(micros))
    }
}

impl uDisplay for Duration {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        uwrite!(f, "{}.{}ms", self.millis(), Padded3(self.micros % 1000))
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:03}{:03}s",
            self.secs(),
            self.millis() % 1000,
            self.micros % 1000
        )
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}ms", self.millis(), self.micros % 1000)
    }
}

/// Zero padded three digit number; `ufmt` has no width specifiers.
struct Padded3(u64);

impl uDisplay for Padded3 {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        if self.0 < 10 {
            f.write_str("00")?;
        } else if self.0 < 100 {
            f.write_str("0")?;
        }
        uwrite!(f, "{}", self.0)
    }
}
