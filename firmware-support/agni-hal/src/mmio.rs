// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! Register-level access to the NOC control block.
//!
//! [`RegisterInterface`] is the seam between the drivers in this crate and the
//! hardware: [`Mmio`] talks to the real register block with volatile accesses,
//! the simulated backend in `sim` stands in for it on the host.

use crate::memory_map::{DESCRIPTOR_SLOT, NOC_BASE};
use crate::noc::TransferDescriptor;
use ufmt::derive::uDebug;

/// Registers of the NOC control block, by offset from [`NOC_BASE`].
#[derive(uDebug, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u64)]
pub enum NocRegister {
    /// (W, 64 bit) Address of a [`TransferDescriptor`]. Writing starts the copy.
    SendCmd = 0x00,
    /// (R, 32 bit) `1` while a transfer is in flight, `0` when done.
    Status = 0x08,
    /// (R/W, 32 bit) Completion interrupt enable.
    IrqEnable = 0x0C,
    /// (R, 32 bit) Non-zero while a completion interrupt is pending.
    /// Writing `1` clears it.
    IrqStatus = 0x10,
}

impl NocRegister {
    pub const fn offset(self) -> u64 {
        self as u64
    }

    pub const fn is_wide(self) -> bool {
        matches!(self, NocRegister::SendCmd)
    }
}

/// Ordered, uncached access to the NOC registers and the descriptor slot.
///
/// Implementations must not reorder a register access with respect to the
/// memory operations around it.
pub trait RegisterInterface {
    fn read(&self, reg: NocRegister) -> u64;

    fn write(&self, reg: NocRegister, value: u64);

    /// Write `desc` into the descriptor slot.
    fn store_descriptor(&self, desc: &TransferDescriptor);

    /// Bus address of the descriptor slot, as written to [`NocRegister::SendCmd`].
    fn descriptor_slot(&self) -> u64;
}

impl<T: RegisterInterface + ?Sized> RegisterInterface for &T {
    fn read(&self, reg: NocRegister) -> u64 {
        (**self).read(reg)
    }

    fn write(&self, reg: NocRegister, value: u64) {
        (**self).write(reg, value)
    }

    fn store_descriptor(&self, desc: &TransferDescriptor) {
        (**self).store_descriptor(desc)
    }

    fn descriptor_slot(&self) -> u64 {
        (**self).descriptor_slot()
    }
}

/// Full memory and I/O fence.
///
/// Used whenever control is handed to or taken back from an asynchronous
/// hardware unit, so the unit and the core agree on the memory image.
#[inline(always)]
pub fn fence() {
    #[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
    unsafe {
        core::arch::asm!("fence iorw, iorw", options(nostack, preserves_flags));
    }
    #[cfg(not(any(target_arch = "riscv32", target_arch = "riscv64")))]
    core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
}

/// Memory mapped NOC register block.
#[derive(Clone)]
pub struct Mmio {
    base_addr: *mut u8,
    slot: *mut TransferDescriptor,
}

impl Mmio {
    /// Create a new [`Mmio`] instance given the register block base address and
    /// the descriptor slot address.
    ///
    /// # Safety
    ///
    /// `base_addr` MUST point to a memory mapped NOC control block and `slot`
    /// MUST point to memory reserved for the descriptor that nothing else
    /// uses.
    pub const unsafe fn new(base_addr: *mut u8, slot: *mut TransferDescriptor) -> Mmio {
        Mmio { base_addr, slot }
    }

    /// The register block and slot at their fixed addresses in the memory map.
    ///
    /// # Safety
    ///
    /// Only valid on the Foreman, and only one instance may be used at a time.
    pub const unsafe fn foreman() -> Mmio {
        Mmio::new(
            NOC_BASE as usize as *mut u8,
            DESCRIPTOR_SLOT as usize as *mut TransferDescriptor,
        )
    }
}

impl RegisterInterface for Mmio {
    fn read(&self, reg: NocRegister) -> u64 {
        unsafe {
            let addr = self.base_addr.add(reg.offset() as usize);
            if reg.is_wide() {
                addr.cast::<u64>().read_volatile()
            } else {
                addr.cast::<u32>().read_volatile() as u64
            }
        }
    }

    fn write(&self, reg: NocRegister, value: u64) {
        unsafe {
            let addr = self.base_addr.add(reg.offset() as usize);
            if reg.is_wide() {
                addr.cast::<u64>().write_volatile(value);
            } else {
                addr.cast::<u32>().write_volatile(value as u32);
            }
        }
    }

    fn store_descriptor(&self, desc: &TransferDescriptor) {
        unsafe { self.slot.write_volatile(*desc) }
    }

    fn descriptor_slot(&self) -> u64 {
        self.slot as usize as u64
    }
}
