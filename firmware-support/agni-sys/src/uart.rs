// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! The Foreman console.
//!
//! The console UART has a one-byte data register at its base and a flags
//! register four bytes above it. The console is transmit only.

pub mod log;

const FLAG_TX_FULL: u8 = 0b01;

/// The transmit FIFO has no room.
pub struct TransmitBufferFull;

/// Console UART.
#[derive(Clone)]
pub struct Uart {
    data: *mut u8,
    flags: *const u8,
}

impl Uart {
    /// # Safety
    ///
    /// `base_addr` MUST point to a memory mapped console UART.
    pub const unsafe fn new(base_addr: *mut u8) -> Uart {
        Uart {
            data: base_addr,
            flags: base_addr.add(4).cast_const(),
        }
    }

    fn flags(&self) -> u8 {
        unsafe { self.flags.read_volatile() }
    }

    /// Send `byte`, spinning while the transmit FIFO is full.
    pub fn send(&mut self, byte: u8) {
        while self.try_send(byte).is_err() {}
    }

    pub fn try_send(&mut self, byte: u8) -> Result<(), TransmitBufferFull> {
        if self.flags() & FLAG_TX_FULL != 0 {
            return Err(TransmitBufferFull);
        }
        unsafe { self.data.write_volatile(byte) };
        Ok(())
    }

    fn send_str(&mut self, s: &str) {
        s.bytes().for_each(|b| self.send(b));
    }
}

impl ufmt::uWrite for Uart {
    type Error = ();

    fn write_str(&mut self, s: &str) -> Result<(), ()> {
        self.send_str(s);
        Ok(())
    }
}

impl core::fmt::Write for Uart {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.send_str(s);
        Ok(())
    }
}
