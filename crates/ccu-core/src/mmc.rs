//! MMC module clock with a new timing switch (NTS).
//!
//! One control word carries everything the clock needs:
//!
//! ```text
//!        ┌── gate        ┌── parent select      ┌── M - 1
//!   [EN][NTS] ....... [MUX] ....... [P] ....... [M]
//!         └── mode                   └── log2(P)
//! ```
//!
//! The output is `parent / P / M`, halved again by the hardware while the
//! NTS bit is set. Every rate this module reports or accepts is the real
//! output rate; the halving is compensated through [`RateTransform`] on
//! both the set and the read path.
//!
//! The mode bit is owned by the MMC host driver, not by this clock, and is
//! read from the live word by each operation that depends on it.

use crate::gate;
use crate::mux;
use crate::ops::{ClockOps, ParentRates, RateRequest};
use crate::rate::RateTransform;
use crate::register::CcuCommon;
use crate::search::{find_best, DividerPair};
use ccu_common::{CcuError, CcuResult, ClockConfig, ClockLayout};
use tracing::{debug, error, trace, warn};

/// An MMC clock bound to its control register.
#[derive(Debug, Clone)]
pub struct MmcClock {
    name: String,
    parents: Vec<String>,
    layout: ClockLayout,
    no_reparent: bool,
    common: CcuCommon,
}

impl MmcClock {
    /// Create a clock with an explicit layout.
    ///
    /// # Errors
    ///
    /// Returns [`CcuError::Config`] if the layout is invalid or the mux
    /// cannot select every parent.
    pub fn new(
        name: impl Into<String>,
        parents: Vec<String>,
        layout: ClockLayout,
        common: CcuCommon,
    ) -> CcuResult<Self> {
        let name = name.into();
        layout
            .validate()
            .map_err(|e| CcuError::Config(format!("clock {name}: {e}")))?;
        if parents.len() > usize::from(layout.mux.max_index()) + 1 {
            return Err(CcuError::Config(format!(
                "clock {name}: {} parents exceed a {}-bit mux",
                parents.len(),
                layout.mux.width
            )));
        }
        Ok(Self {
            name,
            parents,
            layout,
            no_reparent: false,
            common,
        })
    }

    /// Create a clock with the stock sunxi MMC layout.
    ///
    /// # Errors
    ///
    /// Returns [`CcuError::Config`] if there are more than four parents.
    pub fn sunxi_nts(
        name: impl Into<String>,
        parents: Vec<String>,
        common: CcuCommon,
    ) -> CcuResult<Self> {
        Self::new(name, parents, ClockLayout::MMC_NTS, common)
    }

    /// Create a clock from its configuration entry.
    ///
    /// # Errors
    ///
    /// Returns [`CcuError::Config`] if the entry describes an invalid layout.
    pub fn from_config(config: &ClockConfig, common: CcuCommon) -> CcuResult<Self> {
        let layout = config
            .layout()
            .map_err(|e| CcuError::Config(e.to_string()))?;
        Ok(Self::new(config.name.clone(), config.parents.clone(), layout, common)?
            .with_no_reparent(config.no_reparent))
    }

    /// Keep the current parent during rate negotiation.
    #[must_use]
    pub fn with_no_reparent(mut self, no_reparent: bool) -> Self {
        self.no_reparent = no_reparent;
        self
    }

    /// Parent names, indexed by mux value.
    #[must_use]
    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    /// Control word layout.
    #[must_use]
    pub fn layout(&self) -> &ClockLayout {
        &self.layout
    }

    /// Register binding.
    #[must_use]
    pub fn common(&self) -> &CcuCommon {
        &self.common
    }

    /// Whether rate negotiation is pinned to the current parent.
    #[must_use]
    pub fn no_reparent(&self) -> bool {
        self.no_reparent
    }

    /// Largest M the search may use.
    #[must_use]
    pub fn max_m(&self) -> u32 {
        self.layout.m.effective_max()
    }

    /// Largest P the search may use.
    #[must_use]
    pub fn max_p(&self) -> u32 {
        self.layout.p.effective_max()
    }

    /// NTS compensation for the mode bit as it is right now.
    #[must_use]
    pub fn transform(&self) -> RateTransform {
        RateTransform::from_control_word(self.common.read(), self.layout.nts)
    }

    /// Whether the hardware currently halves the divider output.
    #[must_use]
    pub fn nts_active(&self) -> bool {
        self.transform().nts_active()
    }

    /// Set or clear the NTS mode bit, as the MMC host driver does when
    /// switching timing modes.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`CcuCommon::update`].
    pub fn set_nts(&self, active: bool) -> CcuResult<()> {
        let nts = self.layout.nts;
        self.common
            .update(|word| Ok(if active { word | nts } else { word & !nts }))?;
        debug!(clock = %self.name, active, "timing mode switched");
        Ok(())
    }

    /// Divider pair currently programmed.
    #[must_use]
    pub fn dividers(&self) -> DividerPair {
        let word = self.common.read();
        DividerPair {
            m: self.layout.m.decode(word),
            p: self.layout.p.decode(word),
        }
    }

    /// Raw divider-chain rate achievable from `parent_rate` without
    /// exceeding `rate`. No NTS compensation is applied here; callers pass
    /// an already adjusted target.
    ///
    /// # Errors
    ///
    /// Returns [`CcuError::NoFeasibleDivider`] if every divider pair
    /// overshoots `rate` or yields 0 Hz.
    pub fn round_rate(&self, parent_rate: u64, rate: u64) -> CcuResult<u64> {
        let pair = find_best(parent_rate, rate, self.max_m(), self.max_p()).ok_or(
            CcuError::NoFeasibleDivider {
                parent_rate,
                target_rate: rate,
            },
        )?;
        let rounded = pair.rate(parent_rate);
        trace!(clock = %self.name, parent_rate, rate, m = pair.m, p = pair.p, rounded, "rate rounded");
        Ok(rounded)
    }
}

impl ClockOps for MmcClock {
    fn name(&self) -> &str {
        &self.name
    }

    fn enable(&self) -> CcuResult<()> {
        gate::enable(&self.common, self.layout.enable)
    }

    fn disable(&self) -> CcuResult<()> {
        gate::disable(&self.common, self.layout.enable)
    }

    fn is_enabled(&self) -> bool {
        gate::is_enabled(&self.common, self.layout.enable)
    }

    fn get_parent(&self) -> u8 {
        mux::get_parent(&self.common, &self.layout.mux)
    }

    fn set_parent(&self, index: u8) -> CcuResult<()> {
        mux::set_parent(&self.common, &self.layout.mux, index)
    }

    fn determine_rate(&self, req: RateRequest, parents: &dyn ParentRates) -> CcuResult<RateRequest> {
        let transform = self.transform();
        let inner = RateRequest {
            rate: transform.to_internal_target(req.rate),
            ..req
        };

        let mut negotiated = mux::determine_rate(
            &self.common,
            &self.layout.mux,
            parents,
            self.no_reparent,
            inner,
            |parent_rate, rate| self.round_rate(parent_rate, rate),
        )?;
        negotiated.rate = transform.to_external_rate(negotiated.rate);

        debug!(
            clock = %self.name,
            requested = req.rate,
            rate = negotiated.rate,
            parent = ?negotiated.best_parent_index,
            nts = transform.nts_active(),
            "rate determined"
        );
        Ok(negotiated)
    }

    fn recalc_rate(&self, parent_rate: u64) -> u64 {
        let word = self.common.read();
        let m = u64::from(self.layout.m.decode(word));
        let shift = self.layout.p.exponent(word);
        let raw = parent_rate.checked_shr(shift).unwrap_or(0) / m;
        RateTransform::from_control_word(word, self.layout.nts).to_external_rate(raw)
    }

    fn set_rate(&self, rate: u64, parent_rate: u64) -> CcuResult<()> {
        let _guard = self.common.lock();

        let transform = RateTransform::from_control_word(self.common.read(), self.layout.nts);
        let target = transform.to_internal_target(rate);
        let Some(pair) = find_best(parent_rate, target, self.max_m(), self.max_p()) else {
            warn!(clock = %self.name, rate, parent_rate, "no divider pair for requested rate");
            return Err(CcuError::NoFeasibleDivider {
                parent_rate,
                target_rate: target,
            });
        };

        let word = self.common.read();
        let word = self
            .layout
            .m
            .encode(word, pair.m)
            .and_then(|word| self.layout.p.encode(word, pair.p))
            .inspect_err(|e| {
                error!(clock = %self.name, m = pair.m, p = pair.p, error = %e, "divider encoding failed");
            })?;
        self.common.write(word);

        debug!(
            clock = %self.name,
            rate,
            parent_rate,
            m = pair.m,
            p = pair.p,
            nts = transform.nts_active(),
            "dividers programmed"
        );
        Ok(())
    }
}
