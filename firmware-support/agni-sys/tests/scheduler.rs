// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

use agni_hal::memory_map::{
    GLOBAL_DRAM_BASE, KEY_SCRATCH_BASE, KEY_SCRATCH_SIZE, WRENCH_SCRATCH_BASE,
};
use agni_hal::noc::{TransferDescriptor, INTER_STAGE_TRANSFER_SIZE};
use agni_hal::sim::{RecordingWrench, SimInterrupts, SimNoc};
use agni_hal::wrench::{ArrayShape, WrenchOp};
use agni_sys::interrupt::{Dispatcher, IrqSource};
use agni_sys::pipeline::Pipeline;
use agni_sys::scheduler::{CompletionMode, ConfigError, Scheduler, SchedulerConfig, Tick};
use agni_sys::task::Task;
use std::cell::RefCell;
use std::sync::atomic::{AtomicU32, Ordering};
use test_strategy::proptest;

use Tick::*;

type SimPipeline<'a, const N: usize> = Pipeline<&'a SimNoc, &'a SimInterrupts, N>;

fn result_addr(job_id: u32) -> u64 {
    WRENCH_SCRATCH_BASE + 0x10_0000 + 0x1000 * job_id as u64
}

fn matmul(job_id: u32) -> Task {
    Task::matmul(
        job_id,
        WRENCH_SCRATCH_BASE + 0x100 * job_id as u64,
        GLOBAL_DRAM_BASE + 0x100 * job_id as u64,
        result_addr(job_id),
    )
}

fn polled() -> SchedulerConfig {
    SchedulerConfig::DEFAULT.with_completion(CompletionMode::Polled)
}

#[test]
fn three_jobs_polled() {
    let sim = SimNoc::new(1);
    let irqs = SimInterrupts::new();
    let pipeline: SimPipeline<8> = Pipeline::new(&sim, &irqs, polled());
    for id in 1..=3 {
        pipeline.submit_task(matmul(id)).unwrap();
    }

    let handed = RefCell::new(Vec::new());
    let mut scheduler = Scheduler::new(&pipeline, RecordingWrench::new(), |t: &Task| {
        handed.borrow_mut().push(*t)
    });
    let ticks: Vec<Tick> = (0..10).map(|_| scheduler.poll()).collect();

    assert_eq!(
        ticks,
        [
            Dispatched(1),
            TransferBusy,
            Dispatched(2),
            TransferBusy,
            Dispatched(3),
            TransferBusy,
            HandedOff(1),
            HandedOff(2),
            HandedOff(3),
            Idle,
        ]
    );
    assert_eq!(pipeline.queued(), 0);
    assert!(!pipeline.transfer_outstanding());

    // Four Wrench instructions per job, in order, for jobs 1, 2, 3.
    let issued = scheduler.wrench().issued();
    assert_eq!(issued.len(), 12);
    for (job, chunk) in (1..=3).zip(issued.chunks(4)) {
        let ops: Vec<WrenchOp> = chunk.iter().map(|i| i.op).collect();
        assert_eq!(ops, WrenchOp::SEQUENCE);
        let task = matmul(job);
        assert_eq!((chunk[0].rs1, chunk[0].rs2), (8, 8));
        assert_eq!(chunk[1].rs1, task.operand_a);
        assert_eq!(chunk[2].rs1, task.operand_b);
        assert_eq!(chunk[3].rs1, task.result);
    }

    let expected: Vec<TransferDescriptor> = (1..=3)
        .map(|id| TransferDescriptor::new(result_addr(id), KEY_SCRATCH_BASE, INTER_STAGE_TRANSFER_SIZE))
        .collect();
    assert_eq!(sim.submissions().as_slice(), expected.as_slice());
    assert_eq!(sim.submits_while_busy(), 0);

    let handed = handed.borrow();
    assert_eq!(handed.iter().map(|t| t.job_id).collect::<Vec<_>>(), [1, 2, 3]);
    assert!(handed
        .iter()
        .all(|t| *t == Task::vector(t.job_id, KEY_SCRATCH_BASE, KEY_SCRATCH_BASE, KEY_SCRATCH_BASE)));

    let stats = scheduler.stats();
    assert_eq!(
        (stats.dispatched, stats.handed_off, stats.busy_polls, stats.idle_polls),
        (3, 3, 3, 1)
    );
}

#[test]
fn three_jobs_interrupt_driven() {
    let sim = SimNoc::new(1);
    let irqs = SimInterrupts::new();
    let pipeline: SimPipeline<8> = Pipeline::new(&sim, &irqs, SchedulerConfig::DEFAULT);
    let dispatcher = Dispatcher::new();
    dispatcher.register(IrqSource::NocTransferDone, &pipeline);
    pipeline.noc().irq_enable();

    for id in 1..=3 {
        pipeline.submit_task(matmul(id)).unwrap();
    }

    let mut scheduler = Scheduler::new(&pipeline, RecordingWrench::new(), |_: &Task| {});
    let mut ticks = Vec::new();
    for _ in 0..13 {
        ticks.push(scheduler.poll());
        if sim.irq_line() {
            assert!(!irqs.is_masked());
            dispatcher.dispatch(IrqSource::NocTransferDone);
            assert!(!sim.irq_line());
        }
    }

    assert_eq!(
        ticks,
        [
            Dispatched(1),
            TransferBusy,
            AwaitingCompletion,
            Dispatched(2),
            TransferBusy,
            AwaitingCompletion,
            Dispatched(3),
            TransferBusy,
            AwaitingCompletion,
            HandedOff(1),
            HandedOff(2),
            HandedOff(3),
            Idle,
        ]
    );
    assert_eq!(sim.irq_raised(), 3);
    assert_eq!(sim.irq_acks(), 3);
    assert_eq!(pipeline.completed_transfers(), 3);
    assert_eq!(
        scheduler.wrench().executed().collect::<Vec<_>>(),
        [result_addr(1), result_addr(2), result_addr(3)]
    );
}

#[test]
fn waits_for_transfer_started_before_boot() {
    let sim = SimNoc::new(0);
    sim.start_foreign_transfer();
    let irqs = SimInterrupts::new();
    let pipeline: SimPipeline<4> = Pipeline::new(&sim, &irqs, polled());
    pipeline.submit_task(matmul(1)).unwrap();

    let mut scheduler = Scheduler::new(&pipeline, RecordingWrench::new(), |_: &Task| {});
    // The foreign transfer finishes on the first status read.
    assert_eq!(scheduler.poll(), Dispatched(1));
    assert_eq!(sim.submits_while_busy(), 0);
}

#[test]
fn stuck_noc_blocks_dispatch() {
    let sim = SimNoc::stuck();
    sim.start_foreign_transfer();
    let irqs = SimInterrupts::new();
    let pipeline: SimPipeline<4> = Pipeline::new(&sim, &irqs, polled());
    pipeline.submit_task(matmul(1)).unwrap();

    let mut scheduler = Scheduler::new(&pipeline, RecordingWrench::new(), |_: &Task| {});
    for _ in 0..5 {
        assert_eq!(scheduler.poll(), TransferBusy);
    }
    assert!(scheduler.wrench().issued().is_empty());
    assert_eq!(pipeline.queued(), 1);
}

#[test]
fn custom_shape_is_configured() {
    let sim = SimNoc::new(0);
    let irqs = SimInterrupts::new();
    let config = polled().with_shape(ArrayShape::new(4, 2).unwrap());
    let pipeline: SimPipeline<4> = Pipeline::new(&sim, &irqs, config);
    pipeline.submit_task(matmul(7)).unwrap();

    let mut scheduler = Scheduler::new(&pipeline, RecordingWrench::new(), |_: &Task| {});
    assert_eq!(scheduler.poll(), Dispatched(7));
    let configure = scheduler.wrench().issued()[0];
    assert_eq!(configure.op, WrenchOp::Configure);
    assert_eq!((configure.rs1, configure.rs2), (4, 2));
}

#[test]
fn config_outside_key_scratch_is_refused() {
    let new = |size, destination| {
        SchedulerConfig::new(ArrayShape::FULL, size, destination, CompletionMode::Polled)
    };

    assert_eq!(
        new(4096, 0x1000_0000),
        Err(ConfigError::DestinationOutOfRange(0x1000_0000))
    );
    assert_eq!(
        new(4096, GLOBAL_DRAM_BASE),
        Err(ConfigError::DestinationOutOfRange(GLOBAL_DRAM_BASE))
    );
    // Starts inside Key scratch but runs past its end.
    let tail = KEY_SCRATCH_BASE + KEY_SCRATCH_SIZE - 4095;
    assert_eq!(new(4096, tail), Err(ConfigError::DestinationOutOfRange(tail)));
    assert_eq!(new(0, KEY_SCRATCH_BASE), Err(ConfigError::EmptyTransfer));
}

#[test]
fn accepted_config_is_used_for_copies() {
    let destination = KEY_SCRATCH_BASE + KEY_SCRATCH_SIZE - 512;
    let config =
        SchedulerConfig::new(ArrayShape::FULL, 512, destination, CompletionMode::Polled).unwrap();
    assert_eq!(config.transfer_size(), 512);
    assert_eq!(config.destination(), destination);
    assert_eq!(config.completion(), CompletionMode::Polled);
    assert_eq!(config.shape(), ArrayShape::FULL);

    let sim = SimNoc::new(0);
    let irqs = SimInterrupts::new();
    let pipeline: SimPipeline<4> = Pipeline::new(&sim, &irqs, config);
    pipeline.submit_task(matmul(3)).unwrap();
    let mut scheduler = Scheduler::new(&pipeline, RecordingWrench::new(), |_: &Task| {});
    assert_eq!(scheduler.poll(), Dispatched(3));
    assert_eq!(
        sim.submissions().as_slice(),
        [TransferDescriptor::new(result_addr(3), destination, 512)]
    );
}

#[test]
fn default_config_is_accepted() {
    let d = SchedulerConfig::DEFAULT;
    assert_eq!(
        SchedulerConfig::new(d.shape(), d.transfer_size(), d.destination(), d.completion()),
        Ok(d)
    );
    assert_eq!(d.transfer_size(), INTER_STAGE_TRANSFER_SIZE);
}

#[test]
fn vector_tasks_are_handed_off_directly() {
    let sim = SimNoc::new(0);
    let irqs = SimInterrupts::new();
    let pipeline: SimPipeline<4> = Pipeline::new(&sim, &irqs, polled());
    let task = Task::vector(9, KEY_SCRATCH_BASE, GLOBAL_DRAM_BASE, KEY_SCRATCH_BASE + 0x1000);
    pipeline.submit_task(task).unwrap();

    let handed = RefCell::new(Vec::new());
    let mut scheduler = Scheduler::new(&pipeline, RecordingWrench::new(), |t: &Task| {
        handed.borrow_mut().push(*t)
    });
    assert_eq!(scheduler.poll(), HandedOff(9));
    assert_eq!(scheduler.poll(), Idle);
    assert_eq!(*handed.borrow(), [task]);
    assert!(scheduler.wrench().issued().is_empty());
    assert!(sim.submissions().is_empty());
}

static IDLE_CALLS: AtomicU32 = AtomicU32::new(0);

fn count_idle() {
    IDLE_CALLS.fetch_add(1, Ordering::Relaxed);
}

#[test]
fn idle_hook_runs_only_when_idle() {
    let sim = SimNoc::new(1);
    let irqs = SimInterrupts::new();
    let pipeline: SimPipeline<4> = Pipeline::new(&sim, &irqs, polled());
    let mut scheduler =
        Scheduler::new(&pipeline, RecordingWrench::new(), |_: &Task| {}).with_idle_hook(count_idle);

    assert_eq!(scheduler.step(), Idle);
    assert_eq!(IDLE_CALLS.load(Ordering::Relaxed), 1);

    pipeline.submit_task(matmul(1)).unwrap();
    assert_eq!(scheduler.step(), Dispatched(1));
    assert_eq!(scheduler.step(), TransferBusy);
    assert_eq!(IDLE_CALLS.load(Ordering::Relaxed), 1);

    // `poll` never calls the hook.
    assert_eq!(scheduler.poll(), HandedOff(1));
    assert_eq!(scheduler.poll(), Idle);
    assert_eq!(IDLE_CALLS.load(Ordering::Relaxed), 1);
}

#[proptest]
fn never_submits_while_busy(
    #[strategy(0u32..4)] latency: u32,
    #[strategy(1u32..20)] jobs: u32,
    polled_completion: bool,
) {
    let sim = SimNoc::new(latency);
    let irqs = SimInterrupts::new();
    let config = if polled_completion {
        polled()
    } else {
        SchedulerConfig::DEFAULT
    };
    let pipeline: SimPipeline<32> = Pipeline::new(&sim, &irqs, config);
    let dispatcher = Dispatcher::new();
    dispatcher.register(IrqSource::NocTransferDone, &pipeline);
    if !polled_completion {
        pipeline.noc().irq_enable();
    }
    for id in 0..jobs {
        pipeline.submit_task(matmul(id)).unwrap();
    }

    let mut dispatched = Vec::new();
    let mut handed_off = Vec::new();
    let mut scheduler = Scheduler::new(&pipeline, RecordingWrench::new(), |_: &Task| {});
    for _ in 0..1000 {
        match scheduler.poll() {
            Dispatched(id) => dispatched.push(id),
            HandedOff(id) => handed_off.push(id),
            Idle => break,
            TransferBusy | AwaitingCompletion => {}
        }
        if sim.irq_line() {
            dispatcher.dispatch(IrqSource::NocTransferDone);
        }
    }

    let expected: Vec<u32> = (0..jobs).collect();
    assert_eq!(sim.submits_while_busy(), 0);
    assert_eq!(sim.bad_commands(), 0);
    assert_eq!(dispatched, expected);
    assert_eq!(handed_off, expected);
    assert_eq!(pipeline.queued(), 0);
}
