// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

#![no_std]

pub mod interrupt;
pub mod pipeline;
pub mod scheduler;
pub mod task;
pub mod task_queue;
pub mod uart;
