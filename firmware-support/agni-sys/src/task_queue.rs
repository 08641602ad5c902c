// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! Bounded FIFO of pending tasks.
//!
//! The queue itself is not synchronised. When it is shared between the main
//! loop and interrupt context every access has to happen inside a critical
//! section; [`crate::pipeline::Pipeline`] takes care of that.

use crate::task::Task;
use ufmt::derive::uDebug;

/// Capacity of the Foreman's task queue.
pub const TASK_QUEUE_CAPACITY: usize = 100;

/// The queue holds `N` tasks already.
#[derive(uDebug, Debug, Copy, Clone, PartialEq, Eq)]
pub struct QueueFull;

/// Ring buffer of at most `N` tasks.
pub struct TaskQueue<const N: usize> {
    buffer: [Task; N],
    /// Index of the oldest entry.
    head: usize,
    /// Number of valid entries starting at `head`.
    len: usize,
}

impl<const N: usize> TaskQueue<N> {
    pub const fn new() -> TaskQueue<N> {
        TaskQueue {
            buffer: [Task::EMPTY; N],
            head: 0,
            len: 0,
        }
    }

    /// Append `task` at the back. Fails with [`QueueFull`] when there is no room.
    pub fn push(&mut self, task: Task) -> Result<(), QueueFull> {
        if self.is_full() {
            return Err(QueueFull);
        }
        let tail = (self.head + self.len) % N;
        self.buffer[tail] = task;
        self.len += 1;
        Ok(())
    }

    /// Remove the oldest task.
    pub fn pop(&mut self) -> Option<Task> {
        if self.is_empty() {
            return None;
        }
        let task = self.buffer[self.head];
        self.head = (self.head + 1) % N;
        self.len -= 1;
        Some(task)
    }

    /// The oldest task, without removing it.
    pub fn peek(&self) -> Option<&Task> {
        if self.is_empty() {
            None
        } else {
            Some(&self.buffer[self.head])
        }
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn is_full(&self) -> bool {
        self.len == N
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for TaskQueue<N> {
    fn default() -> Self {
        TaskQueue::new()
    }
}
