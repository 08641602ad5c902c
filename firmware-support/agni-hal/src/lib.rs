// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

#![no_std]

pub mod interrupt;
pub mod memory_map;
pub mod mmio;
pub mod noc;
#[cfg(feature = "sim")]
pub mod sim;
pub mod time;
pub mod wrench;
