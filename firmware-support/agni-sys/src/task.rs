// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! Units of work flowing through the accelerator pipeline.

use agni_hal::memory_map::{is_wrench_operand, GLOBAL_DRAM, KEY_SCRATCH, WRENCH_SCRATCH};
use ufmt::derive::uDebug;

use crate::task_queue::QueueFull;

/// Engine a task runs on.
#[derive(uDebug, Debug, Copy, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Matrix multiply on the Wrench, result copied to Key scratch.
    Matmul,
    /// Vector work on the Key engine.
    Vector,
}

/// A single job for one pipeline stage.
///
/// The addresses refer to data that lives elsewhere; a task carries no
/// payload of its own.
#[derive(uDebug, Debug, Copy, Clone, PartialEq, Eq)]
pub struct Task {
    pub job_id: u32,
    pub operand_a: u64,
    pub operand_b: u64,
    pub result: u64,
    pub stage: Stage,
}

impl Task {
    /// Placeholder used to fill unused queue storage.
    pub(crate) const EMPTY: Task = Task::matmul(0, 0, 0, 0);

    pub const fn matmul(job_id: u32, operand_a: u64, operand_b: u64, result: u64) -> Task {
        Task {
            job_id,
            operand_a,
            operand_b,
            result,
            stage: Stage::Matmul,
        }
    }

    pub const fn vector(job_id: u32, operand_a: u64, operand_b: u64, result: u64) -> Task {
        Task {
            job_id,
            operand_a,
            operand_b,
            result,
            stage: Stage::Vector,
        }
    }

    /// The Key-engine task that consumes this task's result once it has been
    /// copied to `input`.
    ///
    /// The Key engine works in place: it reads from and writes to `input`.
    /// Vector tasks are the last stage and have no follow-on.
    pub const fn follow_on(&self, input: u64) -> Option<Task> {
        match self.stage {
            Stage::Matmul => Some(Task::vector(self.job_id, input, input, input)),
            Stage::Vector => None,
        }
    }

    /// Check that every address the task touches is reachable by the engine
    /// that will use it.
    ///
    /// The result of a matmul task must fit `transfer_size` bytes inside Wrench
    /// scratch, since that is what gets copied to the next stage.
    pub fn validate(&self, transfer_size: u32) -> Result<(), SubmitError> {
        match self.stage {
            Stage::Matmul => {
                check(self.operand_a, is_wrench_operand(self.operand_a))?;
                check(self.operand_b, is_wrench_operand(self.operand_b))?;
                check(
                    self.result,
                    WRENCH_SCRATCH.contains_range(self.result, transfer_size as u64),
                )
            }
            Stage::Vector => {
                check(self.operand_a, is_key_operand(self.operand_a))?;
                check(self.operand_b, is_key_operand(self.operand_b))?;
                check(self.result, is_key_operand(self.result))
            }
        }
    }
}

fn is_key_operand(addr: u64) -> bool {
    KEY_SCRATCH.contains(addr) || GLOBAL_DRAM.contains(addr)
}

fn check(addr: u64, ok: bool) -> Result<(), SubmitError> {
    if ok {
        Ok(())
    } else {
        Err(SubmitError::AddressOutOfRange(addr))
    }
}

/// Why a task was not accepted.
#[derive(uDebug, Debug, Copy, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// The task queue has no room; retry once the scheduler has caught up.
    QueueFull,
    /// The address is outside the regions the target engine can reach.
    AddressOutOfRange(u64),
}

impl From<QueueFull> for SubmitError {
    fn from(_: QueueFull) -> SubmitError {
        SubmitError::QueueFull
    }
}
