// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_epoch_is_after_2020() {
    assert!(SystemClock.epoch_ms() > 1_577_836_800_000);
}

#[test]
fn fake_clock_advances_both_sources() {
    let clock = FakeClock::new();
    let start = clock.now();
    let start_ms = clock.epoch_ms();

    clock.advance(Duration::from_secs(30));

    assert_eq!(clock.now().duration_since(start), Duration::from_secs(30));
    assert_eq!(clock.epoch_ms() - start_ms, 30_000);
}

#[test]
fn fake_clock_clones_share_time() {
    let clock = FakeClock::new();
    let other = clock.clone();
    other.advance(Duration::from_millis(250));
    other.set_epoch_ms(42);
    assert_eq!(clock.epoch_ms(), 42);
    assert_eq!(clock.now(), other.now());
}
