// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! Fixed memory map of the Agni accelerator.
//!
//! The map consists of five non-overlapping regions that never move while the
//! Foreman is running. Every address handed to the Wrench or to the NOC must
//! fall inside exactly one of them; [`region_of`] performs that lookup.

use ufmt::derive::uDebug;

/// What a [`MemoryRegion`] is used for.
#[derive(uDebug, Debug, Copy, Clone, PartialEq, Eq)]
pub enum Purpose {
    /// Foreman (control core) RAM. Holds the firmware and the descriptor slot.
    ForemanRam,
    /// Wrench (systolic array) scratch memory.
    WrenchScratch,
    /// Key (vector engine) scratch memory.
    KeyScratch,
    /// NOC control/status register block.
    NocRegisters,
    /// Global DRAM, shared by all engines.
    GlobalDram,
}

/// A fixed, contiguous range of the physical address space.
#[derive(uDebug, Debug, Copy, Clone, PartialEq, Eq)]
pub struct MemoryRegion {
    pub base: u64,
    pub size: u64,
    pub purpose: Purpose,
}

impl MemoryRegion {
    pub const fn new(base: u64, size: u64, purpose: Purpose) -> MemoryRegion {
        MemoryRegion {
            base,
            size,
            purpose,
        }
    }

    /// First address past the end of the region.
    pub const fn end(&self) -> u64 {
        self.base + self.size
    }

    pub const fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr < self.end()
    }

    /// Whether `len` bytes starting at `addr` lie completely inside the region.
    ///
    /// An empty range is contained if its start address is.
    pub const fn contains_range(&self, addr: u64, len: u64) -> bool {
        if !self.contains(addr) {
            return false;
        }
        match addr.checked_add(len) {
            Some(end) => end <= self.end(),
            None => false,
        }
    }

    pub const fn overlaps(&self, other: &MemoryRegion) -> bool {
        self.base < other.end() && other.base < self.end()
    }
}

pub const FOREMAN_RAM_BASE: u64 = 0x0000_0000;
pub const FOREMAN_RAM_SIZE: u64 = 0x0100_0000; // 16 MiB

pub const WRENCH_SCRATCH_BASE: u64 = 0x2000_0000;
pub const WRENCH_SCRATCH_SIZE: u64 = 0x0020_0000; // 2 MiB

pub const KEY_SCRATCH_BASE: u64 = 0x3000_0000;
pub const KEY_SCRATCH_SIZE: u64 = 0x0020_0000; // 2 MiB

pub const NOC_BASE: u64 = 0x4000_0000;
pub const NOC_SIZE: u64 = 0x0001_0000; // 64 KiB

pub const GLOBAL_DRAM_BASE: u64 = 0x8000_0000;
pub const GLOBAL_DRAM_SIZE: u64 = 0x4_0000_0000; // 16 GiB

/// Size of the descriptor slot reserved at the top of Foreman RAM.
pub const DESCRIPTOR_SLOT_SIZE: u64 = 0x40;

/// Address of the single NOC transfer descriptor slot.
///
/// Address zero cannot be dereferenced from Rust, so the slot lives in the
/// last 64 bytes of Foreman RAM. The linker script keeps that range out of
/// the `RAM` memory region.
pub const DESCRIPTOR_SLOT: u64 = FOREMAN_RAM_BASE + FOREMAN_RAM_SIZE - DESCRIPTOR_SLOT_SIZE;

/// Clock frequency of the Foreman core.
pub const FOREMAN_FREQ_HZ: u64 = 1_200_000_000;

pub const FOREMAN_RAM: MemoryRegion =
    MemoryRegion::new(FOREMAN_RAM_BASE, FOREMAN_RAM_SIZE, Purpose::ForemanRam);
pub const WRENCH_SCRATCH: MemoryRegion = MemoryRegion::new(
    WRENCH_SCRATCH_BASE,
    WRENCH_SCRATCH_SIZE,
    Purpose::WrenchScratch,
);
pub const KEY_SCRATCH: MemoryRegion =
    MemoryRegion::new(KEY_SCRATCH_BASE, KEY_SCRATCH_SIZE, Purpose::KeyScratch);
pub const NOC_REGISTERS: MemoryRegion =
    MemoryRegion::new(NOC_BASE, NOC_SIZE, Purpose::NocRegisters);
pub const GLOBAL_DRAM: MemoryRegion =
    MemoryRegion::new(GLOBAL_DRAM_BASE, GLOBAL_DRAM_SIZE, Purpose::GlobalDram);

/// All regions, ordered by base address.
pub const REGIONS: [MemoryRegion; 5] = [
    FOREMAN_RAM,
    WRENCH_SCRATCH,
    KEY_SCRATCH,
    NOC_REGISTERS,
    GLOBAL_DRAM,
];

/// Find the region that contains `addr`.
///
/// Returns `None` for addresses in the holes between regions.
pub fn region_of(addr: u64) -> Option<&'static MemoryRegion> {
    REGIONS.iter().find(|region| region.contains(addr))
}

/// Whether the Wrench can read an operand from `addr`.
pub fn is_wrench_operand(addr: u64) -> bool {
    WRENCH_SCRATCH.contains(addr) || GLOBAL_DRAM.contains(addr)
}

/// Whether the regions in [`REGIONS`] are pairwise disjoint.
pub fn is_disjoint() -> bool {
    REGIONS.iter().enumerate().all(|(i, a)| {
        REGIONS[i + 1..]
            .iter()
            .all(|b| !a.overlaps(b))
    })
}
