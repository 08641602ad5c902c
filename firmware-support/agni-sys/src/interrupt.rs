// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! Interrupt handler registration.
//!
//! Handlers are looked up in a [`Dispatcher`] by [`IrqSource`]. There is no
//! process-wide handler pointer: whoever owns the dispatcher decides which
//! handler runs, and the trap entry point only forwards to it.

use core::cell::Cell;
use log::trace;
use ufmt::derive::uDebug;

pub use agni_hal::interrupt::{InterruptControl, MachineInterrupts};

/// Interrupt lines the Foreman services.
#[derive(uDebug, Debug, Copy, Clone, PartialEq, Eq)]
pub enum IrqSource {
    /// The NOC finished the outstanding copy.
    NocTransferDone,
}

impl IrqSource {
    pub const ALL: [IrqSource; 1] = [IrqSource::NocTransferDone];

    const fn index(self) -> usize {
        self as usize
    }
}

/// Code run in interrupt context.
pub trait IrqHandler {
    /// Service the interrupt. Called with interrupts disabled, must not block.
    fn handle(&self);
}

impl<F: Fn()> IrqHandler for F {
    fn handle(&self) {
        self()
    }
}

/// Table of interrupt handlers, one per [`IrqSource`].
///
/// # Safety
///
/// The dispatcher is `Sync` so it can live in a `static`, but it is only sound
/// on a single hart and [`Dispatcher::register`] must not race with
/// [`Dispatcher::dispatch`]: register handlers before the interrupt is enabled
/// or with interrupts masked.
pub struct Dispatcher<'a> {
    handlers: Cell<[Option<&'a dyn IrqHandler>; IrqSource::ALL.len()]>,
}

impl<'a> Dispatcher<'a> {
    pub const fn new() -> Dispatcher<'a> {
        Dispatcher {
            handlers: Cell::new([None; IrqSource::ALL.len()]),
        }
    }

    /// Install `handler` for `source`, returning the handler it replaces.
    pub fn register(
        &self,
        source: IrqSource,
        handler: &'a dyn IrqHandler,
    ) -> Option<&'a dyn IrqHandler> {
        self.swap(source, Some(handler))
    }

    /// Remove the handler for `source`, returning it.
    pub fn unregister(&self, source: IrqSource) -> Option<&'a dyn IrqHandler> {
        self.swap(source, None)
    }

    pub fn is_registered(&self, source: IrqSource) -> bool {
        self.handler(source).is_some()
    }

    /// Run the handler for `source`. Returns `false` if none is registered.
    pub fn dispatch(&self, source: IrqSource) -> bool {
        match self.handler(source) {
            Some(handler) => {
                handler.handle();
                true
            }
            None => {
                trace!("Spurious interrupt from {:?}", source);
                false
            }
        }
    }

    fn handler(&self, source: IrqSource) -> Option<&'a dyn IrqHandler> {
        self.handlers.get()[source.index()]
    }

    fn swap(
        &self,
        source: IrqSource,
        handler: Option<&'a dyn IrqHandler>,
    ) -> Option<&'a dyn IrqHandler> {
        let mut handlers = self.handlers.get();
        let previous = core::mem::replace(&mut handlers[source.index()], handler);
        self.handlers.set(handlers);
        previous
    }
}

impl Default for Dispatcher<'_> {
    fn default() -> Self {
        Dispatcher::new()
    }
}

unsafe impl core::marker::Sync for Dispatcher<'_> {}
