//! Register discipline under concurrent writers.
//!
//! # Acceptance Criteria
//!
//! - Rate, gate, parent, and mode writers sharing one control word never
//!   lose each other's bits
//! - Lock-free readers only ever observe whole words that some writer stored
//! - Clocks in the same unit serialize on one lock without deadlocking

use super::common::{fields, unit_from_toml, MMC0_REG, TWO_CLOCKS};
use ccu_core::{ClockOps, RegisterIo};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

const ROUNDS: usize = 2_000;

#[test]
fn test_writers_sharing_a_word_keep_their_bits() {
    let unit = unit_from_toml(TWO_CLOCKS);
    let mmc0 = unit.clock("mmc0").unwrap();
    let done = AtomicBool::new(false);

    thread::scope(|s| {
        // Every observed word must be a combination the writers produce
        let reader = s.spawn(|| {
            let mut observed = 0u64;
            loop {
                let stop = done.load(Ordering::Acquire);
                let f = fields(unit.bank().read(MMC0_REG));
                assert!(matches!(f.m, 1 | 4 | 8 | 16), "torn M: {f:?}");
                assert_eq!(f.p, 1);
                assert!(f.mux <= 1);
                observed += 1;
                if stop {
                    break observed;
                }
            }
        });

        let writers = vec![
            // Dividers: 25 MHz and 50 MHz from 400 MHz, doubled while NTS is set
            s.spawn(|| {
                for i in 0..ROUNDS {
                    let rate = if i % 2 == 0 { 25_000_000 } else { 50_000_000 };
                    mmc0.set_rate(rate, 400_000_000).unwrap();
                }
            }),
            // Gate
            s.spawn(|| {
                for i in 0..ROUNDS {
                    if i % 2 == 0 {
                        mmc0.disable().unwrap();
                    } else {
                        mmc0.enable().unwrap();
                    }
                }
            }),
            // Parent
            s.spawn(|| {
                for i in 0..ROUNDS {
                    mmc0.set_parent(u8::from(i % 2 == 1)).unwrap();
                }
            }),
            // Mode bit, as flipped by the host driver
            s.spawn(|| {
                for _ in 0..ROUNDS / 4 {
                    mmc0.set_nts(true).unwrap();
                    mmc0.set_nts(false).unwrap();
                }
            }),
        ];
        for writer in writers {
            writer.join().unwrap();
        }
        done.store(true, Ordering::Release);
        assert!(reader.join().unwrap() > 0);
    });

    // Last write of each thread: enable, parent 1, NTS clear
    let f = fields(unit.bank().read(MMC0_REG));
    assert!(f.enabled);
    assert!(!f.nts);
    assert_eq!(f.mux, 1);
    assert_eq!(f.p, 1);
    assert!(matches!(f.m, 4 | 8 | 16));

    mmc0.set_rate(25_000_000, 400_000_000).unwrap();
    assert_eq!(unit.rate(mmc0).unwrap(), 25_000_000);
}

#[test]
fn test_clocks_in_one_unit_share_the_lock() {
    let unit = unit_from_toml(TWO_CLOCKS);

    thread::scope(|s| {
        for name in ["mmc0", "mmc1"] {
            let clock = unit.clock(name).unwrap();
            let unit = &unit;
            s.spawn(move || {
                for i in 0..ROUNDS / 4 {
                    let rate = if i % 2 == 0 { 25_000_000 } else { 12_500_000 };
                    unit.change_rate(clock, rate).unwrap();
                }
            });
        }
    });

    // mmc0 is free to pick a parent; mmc1 keeps pll-periph0 with NTS set
    let mmc0 = unit.clock("mmc0").unwrap();
    let mmc1 = unit.clock("mmc1").unwrap();
    assert_eq!(unit.rate(mmc0).unwrap(), 12_500_000);
    assert_eq!(unit.rate(mmc1).unwrap(), 12_500_000);
    assert_eq!(mmc1.get_parent(), 1);
    assert!(mmc1.nts_active());
}
