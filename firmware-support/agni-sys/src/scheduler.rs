// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! The Foreman's main loop.
//!
//! Each call to [`Scheduler::poll`] makes at most one scheduling decision and
//! never waits for the NOC. Copies overlap with compute because the loop
//! returns immediately after submitting one and picks up the next task as
//! soon as the copy is done.

use agni_hal::interrupt::InterruptControl;
use agni_hal::memory_map::{KEY_SCRATCH, KEY_SCRATCH_BASE};
use agni_hal::mmio::RegisterInterface;
use agni_hal::noc::INTER_STAGE_TRANSFER_SIZE;
use agni_hal::wrench::{issue_matmul, ArrayShape, WrenchPort};
use log::{debug, error, trace};
use ufmt::derive::uDebug;

use crate::pipeline::Pipeline;
use crate::task::{Stage, Task};

/// How the scheduler learns that a copy has finished.
#[derive(uDebug, Debug, Copy, Clone, PartialEq, Eq)]
pub enum CompletionMode {
    /// The completion interrupt runs [`Pipeline::complete_transfer`].
    Interrupt,
    /// The scheduler checks the pending flag itself. For running with the
    /// completion interrupt disabled.
    Polled,
}

/// Why a [`SchedulerConfig`] was refused.
#[derive(uDebug, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A transfer size of zero bytes.
    EmptyTransfer,
    /// The copy would not land entirely inside Key engine scratch memory.
    DestinationOutOfRange(u64),
}

/// Static parameters of the pipeline.
///
/// Only constructible through [`SchedulerConfig::new`] or from
/// [`SchedulerConfig::DEFAULT`], so every instance copies into Key scratch.
#[derive(uDebug, Debug, Copy, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    shape: ArrayShape,
    transfer_size: u32,
    destination: u64,
    completion: CompletionMode,
}

impl SchedulerConfig {
    pub const DEFAULT: SchedulerConfig = SchedulerConfig {
        shape: ArrayShape::FULL,
        transfer_size: INTER_STAGE_TRANSFER_SIZE,
        destination: KEY_SCRATCH_BASE,
        completion: CompletionMode::Interrupt,
    };

    /// Refuses a copy of `transfer_size` bytes that does not fit at
    /// `destination` inside Key scratch.
    pub const fn new(
        shape: ArrayShape,
        transfer_size: u32,
        destination: u64,
        completion: CompletionMode,
    ) -> Result<SchedulerConfig, ConfigError> {
        if transfer_size == 0 {
            return Err(ConfigError::EmptyTransfer);
        }
        if !KEY_SCRATCH.contains_range(destination, transfer_size as u64) {
            return Err(ConfigError::DestinationOutOfRange(destination));
        }
        Ok(SchedulerConfig {
            shape,
            transfer_size,
            destination,
            completion,
        })
    }

    pub const fn with_completion(self, completion: CompletionMode) -> SchedulerConfig {
        SchedulerConfig { completion, ..self }
    }

    pub const fn with_shape(self, shape: ArrayShape) -> SchedulerConfig {
        SchedulerConfig { shape, ..self }
    }

    /// Tile shape configured on the Wrench for every task.
    pub const fn shape(&self) -> ArrayShape {
        self.shape
    }

    /// Bytes copied from Wrench scratch to the next stage per task.
    pub const fn transfer_size(&self) -> u32 {
        self.transfer_size
    }

    /// Where results are copied to; the input of the Key engine.
    pub const fn destination(&self) -> u64 {
        self.destination
    }

    pub const fn completion(&self) -> CompletionMode {
        self.completion
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig::DEFAULT
    }
}

/// What a single [`Scheduler::poll`] did.
#[derive(uDebug, Debug, Copy, Clone, PartialEq, Eq)]
pub enum Tick {
    /// The NOC is still copying; nothing was dispatched.
    TransferBusy,
    /// The last copy finished but its completion has not been handled yet.
    AwaitingCompletion,
    /// No work queued.
    Idle,
    /// A matmul task was issued to the Wrench and its result copy submitted.
    Dispatched(u32),
    /// A task was passed on to the next stage.
    HandedOff(u32),
}

/// Receives tasks for engines the Foreman does not drive itself.
///
/// This is how the rest of the system learns that a Wrench result has
/// arrived in Key scratch.
pub trait StageHandoff {
    fn hand_off(&mut self, task: &Task);
}

impl<F: FnMut(&Task)> StageHandoff for F {
    fn hand_off(&mut self, task: &Task) {
        self(task)
    }
}

/// Counters kept by the scheduler. They wrap on overflow.
#[derive(uDebug, Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct SchedulerStats {
    pub dispatched: u32,
    pub handed_off: u32,
    pub busy_polls: u32,
    pub awaiting_polls: u32,
    pub idle_polls: u32,
}

impl SchedulerStats {
    fn record(&mut self, tick: Tick) {
        let counter = match tick {
            Tick::TransferBusy => &mut self.busy_polls,
            Tick::AwaitingCompletion => &mut self.awaiting_polls,
            Tick::Idle => &mut self.idle_polls,
            Tick::Dispatched(_) => &mut self.dispatched,
            Tick::HandedOff(_) => &mut self.handed_off,
        };
        *counter = counter.wrapping_add(1);
    }
}

pub struct Scheduler<'p, R, I, W, H, const N: usize> {
    pipeline: &'p Pipeline<R, I, N>,
    wrench: W,
    handoff: H,
    idle_hook: Option<fn()>,
    stats: SchedulerStats,
}

impl<'p, R, I, W, H, const N: usize> Scheduler<'p, R, I, W, H, N>
where
    R: RegisterInterface,
    I: InterruptControl,
    W: WrenchPort,
    H: StageHandoff,
{
    pub fn new(pipeline: &'p Pipeline<R, I, N>, wrench: W, handoff: H) -> Self {
        Scheduler {
            pipeline,
            wrench,
            handoff,
            idle_hook: None,
            stats: SchedulerStats::default(),
        }
    }

    /// Call `hook` whenever [`Scheduler::step`] finds nothing to do, e.g. to
    /// wait for an interrupt.
    pub fn with_idle_hook(mut self, hook: fn()) -> Self {
        self.idle_hook = Some(hook);
        self
    }

    pub fn wrench(&self) -> &W {
        &self.wrench
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Make one scheduling decision.
    pub fn poll(&mut self) -> Tick {
        let tick = self.decide();
        trace!("{:?}", tick);
        self.stats.record(tick);
        tick
    }

    /// [`Scheduler::poll`], then run the idle hook if there was nothing to do.
    pub fn step(&mut self) -> Tick {
        let tick = self.poll();
        if let (Tick::Idle, Some(hook)) = (tick, self.idle_hook) {
            hook();
        }
        tick
    }

    /// Schedule forever.
    pub fn run(&mut self) -> ! {
        loop {
            self.step();
        }
    }

    fn decide(&mut self) -> Tick {
        let pipeline = self.pipeline;
        let config = pipeline.config();

        if pipeline.noc().is_busy() {
            return Tick::TransferBusy;
        }

        if pipeline.transfer_outstanding() {
            match config.completion() {
                CompletionMode::Polled if pipeline.noc().irq_pending() => {
                    pipeline.complete_transfer();
                }
                _ => return Tick::AwaitingCompletion,
            }
        }

        let Some(task) = pipeline.next_task() else {
            return Tick::Idle;
        };

        match task.stage {
            Stage::Matmul => {
                debug!("Dispatching job {}", task.job_id);
                issue_matmul(
                    &mut self.wrench,
                    config.shape(),
                    task.operand_a,
                    task.operand_b,
                    task.result,
                );
                if pipeline.submit_transfer(task).is_err() {
                    // Unreachable as long as this loop is the only submitter.
                    error!("NOC refused the result copy of job {}", task.job_id);
                }
                Tick::Dispatched(task.job_id)
            }
            Stage::Vector => {
                debug!("Handing off job {}", task.job_id);
                self.handoff.hand_off(&task);
                Tick::HandedOff(task.job_id)
            }
        }
    }
}
