//! A clock control unit: one register window, one lock, many clocks.
//!
//! [`ClockUnit`] plays the part of the clock-tree framework for the
//! clocks it owns. It resolves parent names to rates and drives the
//! negotiate, reparent, program sequence that a rate change needs.

use crate::mmc::MmcClock;
use crate::ops::{ClockOps, RateRequest};
use crate::register::{CcuCommon, RegisterBank, RegisterIo};
use ccu_common::{CcuConfig, CcuError, CcuResult, ParentConfig};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Clocks sharing one register window and lock.
#[derive(Debug)]
pub struct ClockUnit {
    bank: Arc<RegisterBank>,
    parents: Vec<ParentConfig>,
    clocks: Vec<MmcClock>,
}

impl ClockUnit {
    /// Build a unit from validated configuration, presetting every
    /// clock's control word to its configured initial value.
    ///
    /// # Errors
    ///
    /// Returns [`CcuError::Config`] if the configuration is invalid.
    pub fn from_config(config: &CcuConfig) -> CcuResult<Self> {
        config
            .validate()
            .map_err(|e| CcuError::Config(e.to_string()))?;

        let bank = Arc::new(RegisterBank::new(config.register_window));
        let lock = Arc::new(Mutex::new(()));

        let clocks = config
            .clocks
            .iter()
            .map(|clock| {
                bank.write(clock.reg, clock.initial);
                let common = CcuCommon::new(bank.clone(), lock.clone(), clock.reg);
                MmcClock::from_config(clock, common)
            })
            .collect::<CcuResult<Vec<_>>>()?;

        info!(
            window = config.register_window,
            clocks = clocks.len(),
            parents = config.parents.len(),
            "clock unit ready"
        );
        Ok(Self {
            bank,
            parents: config.parents.clone(),
            clocks,
        })
    }

    /// Backing register window.
    #[must_use]
    pub fn bank(&self) -> &Arc<RegisterBank> {
        &self.bank
    }

    /// Root clocks.
    #[must_use]
    pub fn parents(&self) -> &[ParentConfig] {
        &self.parents
    }

    /// All clocks, in configuration order.
    #[must_use]
    pub fn clocks(&self) -> &[MmcClock] {
        &self.clocks
    }

    /// Look up a clock by name.
    ///
    /// # Errors
    ///
    /// Returns [`CcuError::UnknownClock`] if no clock has that name.
    pub fn clock(&self, name: &str) -> CcuResult<&MmcClock> {
        self.clocks
            .iter()
            .find(|clock| clock.name() == name)
            .ok_or_else(|| CcuError::UnknownClock(name.to_string()))
    }

    /// Rate of a root clock.
    #[must_use]
    pub fn parent_rate(&self, name: &str) -> Option<u64> {
        self.parents.iter().find(|p| p.name == name).map(|p| p.rate)
    }

    /// Rates of `clock`'s parents, indexed by mux value.
    #[must_use]
    pub fn parent_rates(&self, clock: &MmcClock) -> Vec<Option<u64>> {
        clock
            .parents()
            .iter()
            .map(|name| self.parent_rate(name))
            .collect()
    }

    /// Mux index of the parent called `parent` on `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`CcuError::UnknownParent`] if `clock` has no such parent.
    pub fn parent_index(&self, clock: &MmcClock, parent: &str) -> CcuResult<u8> {
        clock
            .parents()
            .iter()
            .position(|name| name == parent)
            .and_then(|i| u8::try_from(i).ok())
            .ok_or_else(|| CcuError::UnknownParent(format!("{parent} for clock {}", clock.name())))
    }

    /// Rate of the parent `clock` currently selects.
    ///
    /// # Errors
    ///
    /// Returns [`CcuError::UnknownParent`] if the mux selects an input with
    /// no configured parent.
    pub fn current_parent_rate(&self, clock: &MmcClock) -> CcuResult<u64> {
        let index = clock.get_parent();
        clock
            .parents()
            .get(usize::from(index))
            .and_then(|name| self.parent_rate(name))
            .ok_or_else(|| {
                CcuError::UnknownParent(format!("mux input {index} of clock {}", clock.name()))
            })
    }

    /// Output rate of `clock` as programmed now.
    ///
    /// # Errors
    ///
    /// Returns [`CcuError::UnknownParent`] if the current parent is unknown.
    pub fn rate(&self, clock: &MmcClock) -> CcuResult<u64> {
        Ok(clock.recalc_rate(self.current_parent_rate(clock)?))
    }

    /// Negotiate `rate` for `clock` without touching hardware.
    ///
    /// # Errors
    ///
    /// Propagates the negotiation error from the clock.
    pub fn negotiate(&self, clock: &MmcClock, rate: u64) -> CcuResult<RateRequest> {
        let rates = self.parent_rates(clock);
        clock.determine_rate(RateRequest::new(rate), &rates)
    }

    /// Change `clock`'s rate: negotiate, switch parent if needed, program
    /// the dividers. Returns the rate read back afterwards.
    ///
    /// With NTS set, negotiation halves an odd divider output with
    /// truncation and programming doubles it back one below, so the
    /// programmed rate can land under what [`ClockUnit::negotiate`] reported.
    ///
    /// # Errors
    ///
    /// Returns the first error from negotiation, reparenting, or programming.
    pub fn change_rate(&self, clock: &MmcClock, rate: u64) -> CcuResult<u64> {
        let req = self.negotiate(clock, rate)?;

        if let Some(index) = req.best_parent_index {
            if index != clock.get_parent() {
                clock.set_parent(index)?;
            }
        }
        clock.set_rate(req.rate, req.best_parent_rate)?;

        let actual = self.rate(clock)?;
        debug!(clock = clock.name(), requested = rate, actual, "rate changed");
        Ok(actual)
    }
}
