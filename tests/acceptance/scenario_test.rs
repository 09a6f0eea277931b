//! Rate scenarios driven through a configured clock unit.
//!
//! # Acceptance Criteria
//!
//! - 25 MHz from a 400 MHz parent programs P = 1, M = 16 exactly
//! - Inexact requests settle on the best rate not above the request
//! - With NTS set, requests are negotiated at twice the rate and reported halved
//! - Out-of-range parent selection is rejected without touching the register

use super::common::{fields, unit_from_toml, Fields, MMC0_REG, MMC1_REG, TWO_CLOCKS};
use ccu_common::{CcuConfig, CcuError};
use ccu_core::{find_best, ClockOps, ClockUnit, RateRequest, RegisterIo};

// =============================================================================
// Exact and inexact rates
// =============================================================================

#[test]
fn test_exact_rate_from_pll() {
    let unit = unit_from_toml(TWO_CLOCKS);
    let mmc0 = unit.clock("mmc0").unwrap();

    assert_eq!(unit.change_rate(mmc0, 25_000_000).unwrap(), 25_000_000);
    assert_eq!(
        fields(unit.bank().read(MMC0_REG)),
        Fields {
            enabled: true,
            nts: false,
            mux: 1,
            m: 16,
            p: 1,
        }
    );
}

#[test]
fn test_inexact_rate_matches_exhaustive_search() {
    let unit = unit_from_toml(TWO_CLOCKS);
    let mmc0 = unit.clock("mmc0").unwrap();
    mmc0.set_parent(1).unwrap();

    mmc0.set_rate(24_000_000, 400_000_000).unwrap();
    let actual = mmc0.recalc_rate(400_000_000);

    let mut best = 0;
    for exp in 0..=3 {
        for m in 1..=16u64 {
            let rate = (400_000_000u64 >> exp) / m;
            if rate <= 24_000_000 {
                best = best.max(rate);
            }
        }
    }
    assert_eq!(actual, best);
    assert_eq!(actual, 22_222_222);
}

#[test]
fn test_osc_wins_when_it_matches_exactly() {
    let unit = unit_from_toml(TWO_CLOCKS);
    let mmc0 = unit.clock("mmc0").unwrap();

    // 400 MHz cannot make 24 MHz; the oscillator can, undivided
    let req = unit.negotiate(mmc0, 24_000_000).unwrap();
    assert_eq!(req.best_parent_index, Some(0));
    assert_eq!(req.rate, 24_000_000);
}

#[test]
fn test_unreachable_rate_leaves_register() {
    let unit = unit_from_toml(TWO_CLOCKS);
    let mmc0 = unit.clock("mmc0").unwrap();
    let before = unit.bank().read(MMC0_REG);

    // 24 MHz / 8 / 16 = 187.5 kHz is the floor
    let err = unit.change_rate(mmc0, 100_000).unwrap_err();
    assert!(matches!(err, CcuError::NoFeasibleDivider { .. }));
    assert_eq!(unit.bank().read(MMC0_REG), before);
}

#[test]
fn test_identification_rate_from_osc() {
    let unit = unit_from_toml(TWO_CLOCKS);
    let mmc0 = unit.clock("mmc0").unwrap();

    // Card identification runs near 400 kHz
    let rate = unit.change_rate(mmc0, 400_000).unwrap();
    assert!(rate <= 400_000);
    let pair = find_best(24_000_000, 400_000, 16, 8).unwrap();
    assert_eq!(rate, pair.rate(24_000_000));
    assert_eq!(mmc0.get_parent(), 0);
}

// =============================================================================
// New timing switch
// =============================================================================

#[test]
fn test_nts_negotiates_at_double_rate() {
    let unit = unit_from_toml(TWO_CLOCKS);
    let mmc0 = unit.clock("mmc0").unwrap();
    mmc0.set_nts(true).unwrap();

    let parents = [400_000_000u64];
    let req = mmc0
        .determine_rate(RateRequest::new(12_500_000), &parents)
        .unwrap();
    assert_eq!(req.rate, 12_500_000);
    assert_eq!(mmc0.round_rate(400_000_000, 25_000_000).unwrap(), 25_000_000);

    assert_eq!(unit.change_rate(mmc0, 12_500_000).unwrap(), 12_500_000);
    let f = fields(unit.bank().read(MMC0_REG));
    assert!(f.nts);
    assert_eq!((f.m, f.p), (16, 1));
}

#[test]
fn test_nts_flip_after_programming() {
    let unit = unit_from_toml(TWO_CLOCKS);
    let mmc0 = unit.clock("mmc0").unwrap();

    assert_eq!(unit.change_rate(mmc0, 50_000_000).unwrap(), 50_000_000);
    mmc0.set_nts(true).unwrap();
    assert_eq!(unit.rate(mmc0).unwrap(), 25_000_000);

    // Re-requesting 50 MHz now needs a 100 MHz divider output
    assert_eq!(unit.change_rate(mmc0, 50_000_000).unwrap(), 50_000_000);
    let f = fields(unit.bank().read(MMC0_REG));
    assert_eq!((f.m, f.p), (4, 1));
}

#[test]
fn test_pinned_clock_with_nts() {
    let unit = unit_from_toml(TWO_CLOCKS);
    let mmc1 = unit.clock("mmc1").unwrap();
    assert!(mmc1.nts_active());
    assert_eq!(mmc1.get_parent(), 1);

    // Pinned to 400 MHz: 52 MHz → 104 MHz internal → 100 MHz (P = 1, M = 4) → 50 MHz
    assert_eq!(unit.change_rate(mmc1, 52_000_000).unwrap(), 50_000_000);
    assert_eq!(mmc1.get_parent(), 1);
}

// =============================================================================
// Parent selection
// =============================================================================

#[test]
fn test_out_of_range_parent_rejected() {
    let unit = unit_from_toml(TWO_CLOCKS);
    let mmc0 = unit.clock("mmc0").unwrap();
    let before = unit.bank().read(MMC0_REG);
    let writes = unit.bank().write_count();

    let err = mmc0.set_parent(7).unwrap_err();
    assert_eq!(err, CcuError::OutOfRangeSelector { index: 7, max: 3 });
    assert_eq!(unit.bank().read(MMC0_REG), before);
    assert_eq!(unit.bank().write_count(), writes);
}

#[test]
fn test_clocks_do_not_disturb_each_other() {
    let unit = unit_from_toml(TWO_CLOCKS);
    let mmc1_before = unit.bank().read(MMC1_REG);

    let mmc0 = unit.clock("mmc0").unwrap();
    unit.change_rate(mmc0, 25_000_000).unwrap();
    mmc0.disable().unwrap();
    assert_eq!(unit.bank().read(MMC1_REG), mmc1_before);
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_custom_layout_from_toml() {
    // M with a 5-bit field capped at 24, P up to 16
    let unit = unit_from_toml(
        r#"
        [[parent]]
        name = "pll"
        rate = 960000000

        [[clock]]
        name = "mmc2"
        reg = 0x090
        parents = ["pll"]

        [clock.m]
        shift = 0
        width = 5
        offset = 1
        max = 24

        [clock.p]
        shift = 16
        width = 3
        kind = "power_of_two"
        max = 16
        "#,
    );
    let mmc2 = unit.clock("mmc2").unwrap();
    assert_eq!(mmc2.max_m(), 24);
    assert_eq!(mmc2.max_p(), 16);

    // 960 MHz / 16 / 24 = 2.5 MHz is reachable only with the wider fields
    assert_eq!(unit.change_rate(mmc2, 2_500_000).unwrap(), 2_500_000);
    assert_eq!(mmc2.dividers().m, 24);
    assert_eq!(mmc2.dividers().p, 16);
}

#[test]
fn test_default_config_builds() {
    let unit = ClockUnit::from_config(&CcuConfig::default()).unwrap();
    let mmc0 = unit.clock("mmc0").unwrap();
    assert_eq!(unit.rate(mmc0).unwrap(), 24_000_000);
}

#[test]
fn test_invalid_config_rejected() {
    let config = CcuConfig::from_toml(
        r#"
        [[parent]]
        name = "osc24M"
        rate = 24000000

        [[clock]]
        name = "mmc0"
        reg = 0x088
        parents = ["osc24M"]
        nts_bit = 31
        "#,
    )
    .unwrap();
    assert!(matches!(
        ClockUnit::from_config(&config),
        Err(CcuError::Config(_))
    ));
}
