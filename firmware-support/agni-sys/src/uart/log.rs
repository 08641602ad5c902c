// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! `log` backend writing to the console UART.
//!
//! Records come from the scheduler loop and from the NOC completion
//! interrupt, so each record is written with interrupts masked to keep lines
//! from interleaving.

use crate::uart::Uart;
use agni_hal::interrupt::{InterruptControl, MachineInterrupts};
use core::cell::{Cell, RefCell};
// `log` hands us `core::fmt::Arguments`, so the records are formatted with
// `core::fmt` rather than `ufmt`.
use core::fmt::Write;
use log::LevelFilter;

/// The logger instance to pass to `log::set_logger_racy`.
pub static LOGGER: UartLogger = UartLogger::new();

/// Writes `LEVEL | file:line - message` lines to a [`Uart`].
///
/// # Safety
///
/// `UartLogger` is `Sync` but [`Uart`] is not. This is only sound on a single
/// hart, where masking interrupts excludes every other writer.
pub struct UartLogger {
    uart: RefCell<Option<Uart>>,
    display_source: Cell<LevelFilter>,
}

impl UartLogger {
    pub const fn new() -> UartLogger {
        UartLogger {
            uart: RefCell::new(None),
            display_source: Cell::new(LevelFilter::Trace),
        }
    }

    /// Write records to `uart` from now on. Records logged before this are
    /// discarded.
    pub fn set_uart(&self, uart: Uart) {
        MachineInterrupts.free(|| {
            self.uart.replace(Some(uart));
        });
    }

    /// Only print the source location for records at or above `level`.
    pub fn set_display_source(&self, level: LevelFilter) {
        self.display_source.set(level);
    }
}

impl Default for UartLogger {
    fn default() -> Self {
        UartLogger::new()
    }
}

impl log::Log for UartLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        MachineInterrupts.free(|| {
            // A record logged while formatting another one is dropped.
            let Ok(mut uart) = self.uart.try_borrow_mut() else {
                return;
            };
            let Some(uart) = uart.as_mut() else {
                return;
            };
            let _ = write!(uart, "{} | ", record.level());
            if record.level() <= self.display_source.get() {
                let _ = write!(
                    uart,
                    "{}:{} - ",
                    record.file().unwrap_or("?"),
                    record.line().unwrap_or(0)
                );
            }
            let _ = writeln!(uart, "{}", record.args());
        });
    }

    fn flush(&self) {}
}

unsafe impl core::marker::Sync for UartLogger {}
unsafe impl core::marker::Send for UartLogger {}
