// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! Interrupt masking.
//!
//! State shared between the main loop and interrupt context may only be
//! touched inside [`InterruptControl::free`].

/// Scoped interrupt masking.
pub trait InterruptControl {
    /// Run `f` with interrupts masked, restoring the previous mask afterwards.
    fn free<R>(&self, f: impl FnOnce() -> R) -> R;
}

impl<I: InterruptControl> InterruptControl for &I {
    fn free<R>(&self, f: impl FnOnce() -> R) -> R {
        (**self).free(f)
    }
}

/// Machine-mode interrupts of the hart we are running on.
///
/// Only sufficient on a single-hart system, which the Foreman is.
#[derive(Debug, Copy, Clone, Default)]
pub struct MachineInterrupts;

impl InterruptControl for MachineInterrupts {
    fn free<R>(&self, f: impl FnOnce() -> R) -> R {
        riscv::interrupt::free(f)
    }
}
