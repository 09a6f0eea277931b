//! Point-in-time view of a clock for display.

use ccu_core::{ClockOps, ClockUnit, MmcClock};
use serde::Serialize;

/// Snapshot of one clock's control word and derived rate.
#[derive(Debug, Clone, Serialize)]
pub struct ClockStatus {
    /// Clock name.
    pub name: String,
    /// Register offset.
    pub reg: u32,
    /// Raw control word.
    pub word: u32,
    /// Gate state.
    pub enabled: bool,
    /// Mux index.
    pub parent_index: u8,
    /// Selected parent, if the mux points at a configured one.
    pub parent: Option<String>,
    /// Rate of the selected parent.
    pub parent_rate: Option<u64>,
    /// NTS mode bit.
    pub nts: bool,
    /// Linear divider M.
    pub m: u32,
    /// Pre-divider P.
    pub p: u32,
    /// Output rate, if the parent rate is known.
    pub rate: Option<u64>,
}

impl ClockStatus {
    /// Capture `clock` as it is now.
    pub fn capture(unit: &ClockUnit, clock: &MmcClock) -> Self {
        let common = clock.common();
        let parent_index = clock.get_parent();
        let dividers = clock.dividers();
        Self {
            name: clock.name().to_string(),
            reg: common.reg(),
            word: common.read(),
            enabled: clock.is_enabled(),
            parent_index,
            parent: clock.parents().get(usize::from(parent_index)).cloned(),
            parent_rate: unit.current_parent_rate(clock).ok(),
            nts: clock.nts_active(),
            m: dividers.m,
            p: dividers.p,
            rate: unit.rate(clock).ok(),
        }
    }
}

impl std::fmt::Display for ClockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<8} reg={:#05x} word={:#010x} {} parent={}({}) nts={} m={} p={} rate=",
            self.name,
            self.reg,
            self.word,
            if self.enabled { "on " } else { "off" },
            self.parent.as_deref().unwrap_or("?"),
            self.parent_index,
            if self.nts { "on" } else { "off" },
            self.m,
            self.p,
        )?;
        match self.rate {
            Some(rate) => write!(f, "{rate} Hz"),
            None => write!(f, "unknown"),
        }
    }
}
