// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

use agni_hal::memory_map::FOREMAN_FREQ_HZ;
use agni_hal::sim::SimClock;
use agni_hal::time::*;

#[test]
fn cycles_to_instant() {
    let instant = Instant::from_cycles(FOREMAN_FREQ_HZ * 3 + FOREMAN_FREQ_HZ / 2, FOREMAN_FREQ_HZ);
    assert_eq!(instant.millis(), 3_500);
    assert_eq!(instant.secs(), 3);
}

#[test]
fn long_uptime_does_not_overflow() {
    // One year of cycles at 1.2 GHz.
    let cycles = FOREMAN_FREQ_HZ * 60 * 60 * 24 * 365;
    let instant = Instant::from_cycles(cycles, FOREMAN_FREQ_HZ);
    assert_eq!(instant.secs(), 60 * 60 * 24 * 365);
}

#[test]
fn duration_arithmetic() {
    let start = Instant::from_millis(5);
    let end = start + Duration::from_millis(10);
    assert_eq!(end - start, Duration::from_millis(10));
    assert_eq!(start - end, Duration::ZERO);
    assert!(end > start);
    assert_eq!(Duration::from_millis(1).cycles(FOREMAN_FREQ_HZ), 1_200_000);
}

#[test]
fn long_durations_convert_to_cycles() {
    // Ten hours used to overflow the intermediate `micros * frequency`.
    let ten_hours = Duration::from_millis(36_000_000);
    assert_eq!(ten_hours.cycles(FOREMAN_FREQ_HZ), 36_000 * FOREMAN_FREQ_HZ);
    assert_eq!(
        Duration::from_micros(1_500_001).cycles(FOREMAN_FREQ_HZ),
        1_800_001_200
    );
    assert_eq!(Duration::from_micros(u64::MAX).cycles(FOREMAN_FREQ_HZ), u64::MAX);
}

#[test]
fn duration_sum_saturates() {
    let max = Duration::from_micros(u64::MAX);
    assert_eq!(max + Duration::from_micros(1), max);
    assert_eq!(
        Duration::from_millis(1) + Duration::from_micros(1),
        Duration::from_micros(1_001)
    );
}

#[test]
fn display() {
    assert_eq!(format!("{}", Instant::from_micros(2_003_004)), "2.003004s");
    assert_eq!(format!("{}", Duration::from_micros(12_034)), "12.034ms");
}

#[test]
fn sim_clock_advances_per_read() {
    let clock = SimClock::new(Duration::from_millis(1));
    assert_eq!(clock.now(), Instant::from_millis(0));
    assert_eq!(clock.now(), Instant::from_millis(1));
    assert_eq!(clock.now(), Instant::from_millis(2));
}
