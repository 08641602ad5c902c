// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! Simulated hardware for running the drivers on the host.
//!
//! None of these types are `Sync`; a simulated "interrupt" is delivered by
//! calling the handler from the test between two scheduler iterations.

use crate::interrupt::InterruptControl;
use crate::memory_map::DESCRIPTOR_SLOT;
use crate::mmio::{NocRegister, RegisterInterface};
use crate::noc::TransferDescriptor;
use crate::time::{Clock, Duration, Instant};
use crate::wrench::{RoccInstruction, WrenchOp, WrenchPort};
use core::cell::{Cell, RefCell};
use heapless::Vec;

/// Number of submissions [`SimNoc`] remembers.
pub const SIM_HISTORY: usize = 256;

/// A simulated NOC control block.
///
/// After each submission the status register reads busy for `latency` reads
/// and then reads done. The read that observes completion also raises the
/// completion interrupt.
pub struct SimNoc {
    /// `None` for a transfer that never finishes.
    latency: Option<u32>,
    busy_reads_left: Cell<u32>,
    in_flight: Cell<bool>,
    irq_enable: Cell<u64>,
    irq_status: Cell<u64>,
    slot: Cell<TransferDescriptor>,
    submissions: RefCell<Vec<TransferDescriptor, SIM_HISTORY>>,
    submits_while_busy: Cell<u32>,
    bad_commands: Cell<u32>,
    completed: Cell<u32>,
    irq_raised: Cell<u32>,
    irq_acks: Cell<u32>,
}

impl SimNoc {
    /// A NOC whose transfers read busy for `latency` status reads.
    pub fn new(latency: u32) -> SimNoc {
        SimNoc::with_latency(Some(latency))
    }

    /// A NOC whose transfers never finish.
    pub fn stuck() -> SimNoc {
        SimNoc::with_latency(None)
    }

    fn with_latency(latency: Option<u32>) -> SimNoc {
        SimNoc {
            latency,
            busy_reads_left: Cell::new(0),
            in_flight: Cell::new(false),
            irq_enable: Cell::new(0),
            irq_status: Cell::new(0),
            slot: Cell::new(TransferDescriptor::default()),
            submissions: RefCell::new(Vec::new()),
            submits_while_busy: Cell::new(0),
            bad_commands: Cell::new(0),
            completed: Cell::new(0),
            irq_raised: Cell::new(0),
            irq_acks: Cell::new(0),
        }
    }

    /// Put the NOC in the busy state without a submission, as if a transfer
    /// was started before the firmware took over.
    pub fn start_foreign_transfer(&self) {
        self.begin_transfer();
    }

    /// Finish the in-flight transfer immediately.
    pub fn complete_now(&self) {
        if self.in_flight.get() {
            self.finish_transfer();
        }
    }

    /// Whether the interrupt line towards the core is asserted.
    pub fn irq_line(&self) -> bool {
        self.irq_enable.get() != 0 && self.irq_status.get() != 0
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.get()
    }

    /// All descriptors submitted so far, oldest first.
    pub fn submissions(&self) -> Vec<TransferDescriptor, SIM_HISTORY> {
        self.submissions.borrow().clone()
    }

    /// Number of times a command was written while a transfer was in flight.
    pub fn submits_while_busy(&self) -> u32 {
        self.submits_while_busy.get()
    }

    /// Number of command writes that did not point at the descriptor slot.
    pub fn bad_commands(&self) -> u32 {
        self.bad_commands.get()
    }

    pub fn completed_transfers(&self) -> u32 {
        self.completed.get()
    }

    /// Number of times the interrupt status went from clear to pending.
    pub fn irq_raised(&self) -> u32 {
        self.irq_raised.get()
    }

    /// Number of writes that cleared a pending interrupt.
    pub fn irq_acks(&self) -> u32 {
        self.irq_acks.get()
    }

    fn begin_transfer(&self) {
        self.in_flight.set(true);
        self.busy_reads_left.set(self.latency.unwrap_or(0));
    }

    fn finish_transfer(&self) {
        self.in_flight.set(false);
        self.completed.set(self.completed.get() + 1);
        if self.irq_status.get() == 0 {
            self.irq_raised.set(self.irq_raised.get() + 1);
        }
        self.irq_status.set(1);
    }

    fn read_status(&self) -> u64 {
        if !self.in_flight.get() {
            return 0;
        }
        if self.latency.is_none() {
            return 1;
        }
        let left = self.busy_reads_left.get();
        if left > 0 {
            self.busy_reads_left.set(left - 1);
            1
        } else {
            self.finish_transfer();
            0
        }
    }
}

impl RegisterInterface for SimNoc {
    fn read(&self, reg: NocRegister) -> u64 {
        match reg {
            NocRegister::SendCmd => 0,
            NocRegister::Status => self.read_status(),
            NocRegister::IrqEnable => self.irq_enable.get(),
            NocRegister::IrqStatus => self.irq_status.get(),
        }
    }

    fn write(&self, reg: NocRegister, value: u64) {
        match reg {
            NocRegister::SendCmd => {
                if value != DESCRIPTOR_SLOT {
                    self.bad_commands.set(self.bad_commands.get() + 1);
                }
                if self.in_flight.get() {
                    self.submits_while_busy
                        .set(self.submits_while_busy.get() + 1);
                }
                let desc = self.slot.get();
                if self.submissions.borrow_mut().push(desc).is_err() {
                    panic!("SimNoc remembers at most {} submissions", SIM_HISTORY);
                }
                self.begin_transfer();
            }
            NocRegister::Status => {}
            NocRegister::IrqEnable => self.irq_enable.set(value & 1),
            NocRegister::IrqStatus => {
                if value & 1 != 0 && self.irq_status.get() != 0 {
                    self.irq_status.set(0);
                    self.irq_acks.set(self.irq_acks.get() + 1);
                }
            }
        }
    }

    fn store_descriptor(&self, desc: &TransferDescriptor) {
        self.slot.set(*desc);
    }

    fn descriptor_slot(&self) -> u64 {
        DESCRIPTOR_SLOT
    }
}

/// One instruction issued to a [`RecordingWrench`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Issued {
    pub op: WrenchOp,
    pub instruction: RoccInstruction,
    pub rs1: u64,
    pub rs2: u64,
}

/// A Wrench that remembers what it was asked to do.
#[derive(Debug, Default)]
pub struct RecordingWrench {
    issued: Vec<Issued, SIM_HISTORY>,
}

impl RecordingWrench {
    pub fn new() -> RecordingWrench {
        RecordingWrench::default()
    }

    pub fn issued(&self) -> &[Issued] {
        &self.issued
    }

    /// Addresses passed to `execute`, in issue order.
    pub fn executed(&self) -> impl Iterator<Item = u64> + '_ {
        self.issued
            .iter()
            .filter(|i| i.op == WrenchOp::Execute)
            .map(|i| i.rs1)
    }
}

impl WrenchPort for RecordingWrench {
    fn issue(&mut self, op: WrenchOp, rs1: u64, rs2: u64) {
        let issued = Issued {
            op,
            instruction: op.instruction(),
            rs1,
            rs2,
        };
        if self.issued.push(issued).is_err() {
            panic!("RecordingWrench remembers at most {} instructions", SIM_HISTORY);
        }
    }
}

/// Interrupt masking that only keeps count.
#[derive(Debug, Default)]
pub struct SimInterrupts {
    depth: Cell<u32>,
    sections: Cell<u32>,
}

impl SimInterrupts {
    pub fn new() -> SimInterrupts {
        SimInterrupts::default()
    }

    /// Whether the caller is inside a critical section.
    pub fn is_masked(&self) -> bool {
        self.depth.get() != 0
    }

    /// Number of critical sections entered so far.
    pub fn sections(&self) -> u32 {
        self.sections.get()
    }
}

impl InterruptControl for SimInterrupts {
    fn free<R>(&self, f: impl FnOnce() -> R) -> R {
        self.depth.set(self.depth.get() + 1);
        self.sections.set(self.sections.get() + 1);
        let result = f();
        self.depth.set(self.depth.get() - 1);
        result
    }
}

/// A clock that advances by a fixed step every time it is read.
#[derive(Debug)]
pub struct SimClock {
    now: Cell<Instant>,
    step: Duration,
}

impl SimClock {
    pub fn new(step: Duration) -> SimClock {
        SimClock {
            now: Cell::new(Instant::from_micros(0)),
            step,
        }
    }
}

impl Clock for SimClock {
    fn now(&self) -> Instant {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }
}
