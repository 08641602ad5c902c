// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

#![no_std]
#![cfg_attr(not(test), no_main)]

use agni_hal::interrupt::MachineInterrupts;
use agni_hal::memory_map::{self, FOREMAN_FREQ_HZ};
use agni_hal::mmio::Mmio;
use agni_hal::time::CycleClock;
use agni_hal::wrench::RoccWrench;
use agni_sys::interrupt::{Dispatcher, IrqSource};
use agni_sys::pipeline::Pipeline;
use agni_sys::scheduler::{Scheduler, SchedulerConfig};
use agni_sys::self_test::SelfTest;
use agni_sys::task::Task;
use agni_sys::task_queue::TASK_QUEUE_CAPACITY;
use agni_sys::uart::log::LOGGER;
use agni_sys::uart::Uart;

use core::fmt::Write;
use core::panic::PanicInfo;
use log::{debug, error, info, LevelFilter};
use riscv::register::{mcause, mepc, mie, mtval};

#[cfg(not(test))]
use riscv_rt::entry;

/// Console UART, outside the accelerator's own memory map.
const UART_ADDR: *mut u8 = 0x4001_0000 as *mut u8;

static PIPELINE: Pipeline<Mmio, MachineInterrupts, TASK_QUEUE_CAPACITY> =
    Pipeline::new(unsafe { Mmio::foreman() }, MachineInterrupts, SchedulerConfig::DEFAULT);

static DISPATCHER: Dispatcher<'static> = Dispatcher::new();

#[cfg_attr(not(test), entry)]
fn main() -> ! {
    let mut uart = unsafe { Uart::new(UART_ADDR) };
    LOGGER.set_uart(uart.clone());
    LOGGER.set_display_source(LevelFilter::Warn);
    unsafe {
        log::set_logger_racy(&LOGGER).ok();
        log::set_max_level_racy(LevelFilter::Debug);
    }

    info!("Foreman up at {} Hz", FOREMAN_FREQ_HZ);
    for region in memory_map::REGIONS.iter() {
        info!(
            "{:?}: {:#010x}..{:#010x}",
            region.purpose,
            region.base,
            region.end()
        );
    }

    let self_test = SelfTest {
        noc: PIPELINE.noc(),
        clock: CycleClock,
    };
    match self_test.run(&mut uart) {
        Ok(true) => info!("Self test passed"),
        _ => error!("Self test failed, scheduling anyway"),
    }

    DISPATCHER.register(IrqSource::NocTransferDone, &PIPELINE);
    PIPELINE.noc().irq_enable();
    unsafe {
        mie::set_mext();
        riscv::interrupt::enable();
    }

    info!("Starting scheduler");
    Scheduler::new(&PIPELINE, RoccWrench, key_engine_ready)
        .with_idle_hook(wait_for_interrupt)
        .run()
}

/// Handoff to the Key engine, which picks up its input from Key scratch.
fn key_engine_ready(task: &Task) {
    debug!("Job {} ready for the Key engine", task.job_id);
}

fn wait_for_interrupt() {
    riscv::asm::wfi();
}

#[export_name = "MachineExternal"]
extern "C" fn machine_external() {
    if PIPELINE.noc().irq_pending() {
        DISPATCHER.dispatch(IrqSource::NocTransferDone);
    }
}

#[export_name = "ExceptionHandler"]
fn exception_handler(_trap_frame: &riscv_rt::TrapFrame) -> ! {
    riscv::interrupt::free(|| {
        error!("Caught an exception, looping forever now");
        error!("mcause: {:?}", mcause::read());
        error!("mepc: {:#x}", mepc::read());
        error!("mtval: {:#x}", mtval::read());
    });
    loop {
        continue;
    }
}

#[cfg(not(test))]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    riscv::interrupt::machine::disable();
    let mut uart = unsafe { Uart::new(UART_ADDR) };
    let _ = writeln!(uart, "Foreman panicked: {}", info);
    loop {
        continue;
    }
}
