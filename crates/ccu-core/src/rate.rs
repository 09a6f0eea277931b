//! New timing switch (NTS) rate compensation.
//!
//! With the NTS mode bit set, the MMC controller halves whatever the
//! dividers produce. Searches therefore aim at twice the requested rate,
//! and rates computed from divider values are halved before they are
//! reported:
//!
//! ```text
//! requested ──×2──▶ search target ──▶ dividers ──▶ raw rate ──÷2──▶ reported
//!           to_internal_target                     to_external_rate
//! ```
//!
//! The mode bit is read from the live control word on every use; it can be
//! flipped by the MMC host driver at any time.

/// NTS compensation for one observation of the mode bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RateTransform {
    nts_active: bool,
}

impl RateTransform {
    /// Transform for a known mode bit state.
    #[must_use]
    pub const fn new(nts_active: bool) -> Self {
        Self { nts_active }
    }

    /// Transform for the mode bit `nts` as seen in `word`.
    #[must_use]
    pub const fn from_control_word(word: u32, nts: u32) -> Self {
        Self::new(word & nts != 0)
    }

    /// Whether the hardware currently halves the divider output.
    #[must_use]
    pub const fn nts_active(&self) -> bool {
        self.nts_active
    }

    /// Rate the dividers must produce for the output to reach `requested`.
    #[must_use]
    pub const fn to_internal_target(&self, requested: u64) -> u64 {
        if self.nts_active {
            requested.saturating_mul(2)
        } else {
            requested
        }
    }

    /// Output rate for a raw divider-chain rate.
    #[must_use]
    pub const fn to_external_rate(&self, raw: u64) -> u64 {
        if self.nts_active {
            raw / 2
        } else {
            raw
        }
    }
}
