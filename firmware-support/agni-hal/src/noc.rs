// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! Asynchronous copy controller for the on-chip DMA fabric (NOC).
//!
//! The NOC exposes a single descriptor submission slot. Submitting a new
//! descriptor while a transfer is in flight clobbers the in-flight transfer,
//! so callers must only submit after observing [`NocController::is_busy`]
//! return `false`. [`NocController::try_submit`] performs that check.
//!
//! Submission is fire-and-forget: nothing in this module can report that a
//! transfer failed. A transfer that never finishes shows up as a busy flag
//! that does not clear, which [`NocController::wait`] reports as a
//! [`WaitTimeout`].

use crate::mmio::{fence, NocRegister, RegisterInterface};
use crate::time::{Clock, Duration};
use log::trace;
use ufmt::derive::uDebug;

/// Status register value while a transfer is in flight.
const STATUS_BUSY: u64 = 0x1;

/// Size of the copy from Wrench scratch to Key scratch for a single task.
pub const INTER_STAGE_TRANSFER_SIZE: u32 = 4096;

/// Description of a single asynchronous copy, as read by the NOC.
///
/// The layout is fixed by the hardware: 8-byte source address, 8-byte
/// destination address, 4-byte size and 4 reserved bytes.
#[derive(uDebug, Debug, Copy, Clone, PartialEq, Eq, Default)]
#[repr(C, align(8))]
pub struct TransferDescriptor {
    pub source: u64,
    pub destination: u64,
    pub size: u32,
    reserved: u32,
}

impl TransferDescriptor {
    pub const fn new(source: u64, destination: u64, size: u32) -> TransferDescriptor {
        TransferDescriptor {
            source,
            destination,
            size,
            reserved: 0,
        }
    }
}

/// [`NocController::wait`] gave up before the transfer finished.
///
/// The transfer was not cancelled and may still complete; its status is
/// unknown.
#[derive(uDebug, Debug, Copy, Clone, PartialEq, Eq)]
pub struct WaitTimeout;

/// A transfer is still in flight; nothing was submitted.
#[derive(uDebug, Debug, Copy, Clone, PartialEq, Eq)]
pub struct TransferBusy;

/// Driver for the NOC control block.
pub struct NocController<R> {
    regs: R,
}

impl<R: RegisterInterface> NocController<R> {
    pub const fn new(regs: R) -> NocController<R> {
        NocController { regs }
    }

    /// Access to the underlying register interface.
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Start copying `desc.size` bytes from `desc.source` to `desc.destination`.
    ///
    /// Returns immediately. The caller must have observed `is_busy() == false`
    /// and must guarantee nothing else touches the descriptor slot until the
    /// command register write below has been issued.
    pub fn submit_async(&self, desc: &TransferDescriptor) {
        trace!(
            "NOC copy {:#x} -> {:#x} ({} bytes)",
            desc.source,
            desc.destination,
            desc.size
        );
        self.regs.store_descriptor(desc);
        // The NOC reads the descriptor from memory; it has to be visible before
        // the command is.
        fence();
        self.regs
            .write(NocRegister::SendCmd, self.regs.descriptor_slot());
    }

    /// Submit `desc` only if no transfer is in flight.
    pub fn try_submit(&self, desc: &TransferDescriptor) -> Result<(), TransferBusy> {
        if self.is_busy() {
            return Err(TransferBusy);
        }
        self.submit_async(desc);
        Ok(())
    }

    /// Whether a transfer is still in flight.
    pub fn is_busy(&self) -> bool {
        let busy = self.regs.read(NocRegister::Status) == STATUS_BUSY;
        if !busy {
            // Make the copied data visible to whatever reads it next.
            fence();
        }
        busy
    }

    /// Busy-poll until the in-flight transfer finishes or `timeout` passes.
    ///
    /// This blocks the caller and is meant for health checks only, never for
    /// the scheduling path. A timeout leaves the controller untouched.
    pub fn wait(&self, timeout: Duration, clock: &impl Clock) -> Result<(), WaitTimeout> {
        let deadline = clock.now() + timeout;
        loop {
            if !self.is_busy() {
                return Ok(());
            }
            if clock.now() >= deadline {
                return Err(WaitTimeout);
            }
        }
    }

    pub fn irq_enable(&self) {
        self.regs.write(NocRegister::IrqEnable, 1);
    }

    pub fn irq_disable(&self) {
        self.regs.write(NocRegister::IrqEnable, 0);
    }

    pub fn irq_enabled(&self) -> bool {
        self.regs.read(NocRegister::IrqEnable) != 0
    }

    /// Whether a completion interrupt is pending.
    pub fn irq_pending(&self) -> bool {
        self.regs.read(NocRegister::IrqStatus) != 0
    }

    /// Clear the pending completion interrupt.
    pub fn irq_acknowledge(&self) {
        self.regs.write(NocRegister::IrqStatus, 1);
    }
}
