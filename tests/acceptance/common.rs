//! Common utilities for acceptance tests.
//!
//! Provides helpers for:
//! - Building clock units from inline TOML
//! - Splitting a control word into its fields

use ccu_common::{CcuConfig, ClockLayout};
use ccu_core::ClockUnit;

/// Register offset of `mmc0` in [`TWO_CLOCKS`].
pub const MMC0_REG: u32 = 0x088;

/// Register offset of `mmc1` in [`TWO_CLOCKS`].
pub const MMC1_REG: u32 = 0x08C;

/// Two MMC clocks on the stock layout, `mmc1` pinned to its parent.
pub const TWO_CLOCKS: &str = r#"
register_window = 0x100

[[parent]]
name = "osc24M"
rate = 24000000

[[parent]]
name = "pll-periph0"
rate = 400000000

[[clock]]
name = "mmc0"
reg = 0x088
parents = ["osc24M", "pll-periph0"]
initial = 0x80000000

[[clock]]
name = "mmc1"
reg = 0x08C
parents = ["osc24M", "pll-periph0"]
no_reparent = true
initial = 0xC1000000
"#;

/// Build a unit from inline TOML.
pub fn unit_from_toml(toml: &str) -> ClockUnit {
    let config = CcuConfig::from_toml(toml).expect("config should parse");
    ClockUnit::from_config(&config).expect("config should build")
}

/// Fields of a stock-layout control word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fields {
    pub enabled: bool,
    pub nts: bool,
    pub mux: u8,
    pub m: u32,
    pub p: u32,
}

/// Decode `word` with the stock MMC layout.
pub fn fields(word: u32) -> Fields {
    let layout = ClockLayout::MMC_NTS;
    Fields {
        enabled: word & layout.enable != 0,
        nts: word & layout.nts != 0,
        mux: layout.mux.decode(word),
        m: layout.m.decode(word),
        p: layout.p.decode(word),
    }
}
