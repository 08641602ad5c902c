// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! State shared between the scheduler loop and the NOC completion interrupt.
//!
//! The task queue, the in-flight slot and the NOC descriptor slot are touched
//! from both contexts. Every access below happens inside
//! [`InterruptControl::free`], so neither side ever observes the other
//! half-way through an update.

use core::cell::{Cell, RefCell};

use agni_hal::interrupt::InterruptControl;
use agni_hal::mmio::RegisterInterface;
use agni_hal::noc::{NocController, TransferBusy, TransferDescriptor};
use log::{debug, warn};

use crate::interrupt::IrqHandler;
use crate::scheduler::SchedulerConfig;
use crate::task::{SubmitError, Task};
use crate::task_queue::TaskQueue;

/// The Foreman's side of the pipeline.
///
/// # Safety
///
/// `Pipeline` is `Sync` so that it can be shared with the interrupt handler
/// through a `static`. That is only sound on a single hart with an
/// [`InterruptControl`] that actually masks the completion interrupt.
pub struct Pipeline<R, I, const N: usize> {
    noc: NocController<R>,
    irq: I,
    config: SchedulerConfig,
    queue: RefCell<TaskQueue<N>>,
    /// The matmul task whose result is being copied.
    in_flight: RefCell<Option<Task>>,
    completed: Cell<u32>,
    dropped: Cell<u32>,
}

impl<R: RegisterInterface, I: InterruptControl, const N: usize> Pipeline<R, I, N> {
    pub const fn new(regs: R, irq: I, config: SchedulerConfig) -> Pipeline<R, I, N> {
        Pipeline {
            noc: NocController::new(regs),
            irq,
            config,
            queue: RefCell::new(TaskQueue::new()),
            in_flight: RefCell::new(None),
            completed: Cell::new(0),
            dropped: Cell::new(0),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn noc(&self) -> &NocController<R> {
        &self.noc
    }

    /// Queue `task` for the scheduler.
    ///
    /// Addresses are checked before anything is queued. A full queue is
    /// reported, never silently dropped.
    pub fn submit_task(&self, task: Task) -> Result<(), SubmitError> {
        if let Err(e) = task.validate(self.config.transfer_size()) {
            warn!("Rejected job {}: {:?}", task.job_id, e);
            return Err(e);
        }
        self.irq
            .free(|| self.queue.borrow_mut().push(task))
            .map_err(|e| {
                warn!("Rejected job {}: task queue full", task.job_id);
                SubmitError::from(e)
            })
    }

    /// Take the oldest queued task.
    pub fn next_task(&self) -> Option<Task> {
        self.irq.free(|| self.queue.borrow_mut().pop())
    }

    pub fn queued(&self) -> usize {
        self.irq.free(|| self.queue.borrow().len())
    }

    /// Whether a result copy has been submitted but its completion has not
    /// been handled yet.
    pub fn transfer_outstanding(&self) -> bool {
        self.irq.free(|| self.in_flight.borrow().is_some())
    }

    /// Copy the result of `task` to the next stage.
    ///
    /// Nothing is submitted while the NOC is busy or while the completion of
    /// the previous copy is still outstanding.
    pub fn submit_transfer(&self, task: Task) -> Result<(), TransferBusy> {
        self.irq.free(|| {
            let mut in_flight = self.in_flight.borrow_mut();
            if in_flight.is_some() {
                return Err(TransferBusy);
            }
            let desc = TransferDescriptor::new(
                task.result,
                self.config.destination(),
                self.config.transfer_size(),
            );
            self.noc.try_submit(&desc)?;
            *in_flight = Some(task);
            Ok(())
        })
    }

    /// Handle the completion of the outstanding copy.
    ///
    /// Acknowledges the interrupt and queues the follow-on task of the copied
    /// result. Returns the job whose copy completed, if any.
    pub fn complete_transfer(&self) -> Option<u32> {
        self.irq.free(|| {
            self.noc.irq_acknowledge();
            let task = self.in_flight.borrow_mut().take()?;
            self.completed.set(self.completed.get().wrapping_add(1));
            debug!("Copy for job {} done", task.job_id);

            if let Some(next) = task.follow_on(self.config.destination()) {
                if self.queue.borrow_mut().push(next).is_err() {
                    self.dropped.set(self.dropped.get().wrapping_add(1));
                    warn!("Dropped follow-on of job {}: task queue full", task.job_id);
                }
            }
            Some(task.job_id)
        })
    }

    /// Number of copies whose completion was handled.
    pub fn completed_transfers(&self) -> u32 {
        self.completed.get()
    }

    /// Number of follow-on tasks lost to a full queue.
    pub fn dropped_follow_ons(&self) -> u32 {
        self.dropped.get()
    }
}

impl<R: RegisterInterface, I: InterruptControl, const N: usize> IrqHandler for Pipeline<R, I, N> {
    fn handle(&self) {
        self.complete_transfer();
    }
}

unsafe impl<R, I, const N: usize> core::marker::Sync for Pipeline<R, I, N> {}
