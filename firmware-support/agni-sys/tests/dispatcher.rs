// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

use agni_sys::interrupt::{Dispatcher, IrqHandler, IrqSource};
use std::cell::Cell;

#[test]
fn dispatch_without_handler() {
    let dispatcher = Dispatcher::new();
    assert!(!dispatcher.is_registered(IrqSource::NocTransferDone));
    assert!(!dispatcher.dispatch(IrqSource::NocTransferDone));
}

#[test]
fn register_replaces_previous_handler() {
    let first_calls = Cell::new(0);
    let second_calls = Cell::new(0);
    let first = || first_calls.set(first_calls.get() + 1);
    let second = || second_calls.set(second_calls.get() + 1);

    let dispatcher = Dispatcher::new();
    assert!(dispatcher
        .register(IrqSource::NocTransferDone, &first)
        .is_none());
    assert!(dispatcher.dispatch(IrqSource::NocTransferDone));
    assert_eq!(first_calls.get(), 1);

    let previous = dispatcher
        .register(IrqSource::NocTransferDone, &second)
        .expect("first handler is returned");
    assert!(dispatcher.dispatch(IrqSource::NocTransferDone));
    assert_eq!((first_calls.get(), second_calls.get()), (1, 1));

    // The returned handler is still usable.
    previous.handle();
    assert_eq!(first_calls.get(), 2);
}

#[test]
fn unregister_silences_source() {
    let calls = Cell::new(0);
    let handler = || calls.set(calls.get() + 1);

    let dispatcher = Dispatcher::new();
    dispatcher.register(IrqSource::NocTransferDone, &handler);
    assert!(dispatcher.unregister(IrqSource::NocTransferDone).is_some());
    assert!(!dispatcher.dispatch(IrqSource::NocTransferDone));
    assert!(dispatcher.unregister(IrqSource::NocTransferDone).is_none());
    assert_eq!(calls.get(), 0);
}
