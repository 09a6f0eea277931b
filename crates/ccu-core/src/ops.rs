//! Clock operations exposed to a clock-tree framework.
//!
//! The framework decides when to call these; a clock implementation only
//! decides what each call computes.

use ccu_common::CcuResult;

/// A rate negotiation request, refined by [`ClockOps::determine_rate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateRequest {
    /// Requested rate on input, achievable rate on output.
    pub rate: u64,
    /// Rate of the chosen parent.
    pub best_parent_rate: u64,
    /// Mux index of the chosen parent.
    pub best_parent_index: Option<u8>,
}

impl RateRequest {
    /// Request for `rate` with no parent chosen yet.
    #[must_use]
    pub const fn new(rate: u64) -> Self {
        Self {
            rate,
            best_parent_rate: 0,
            best_parent_index: None,
        }
    }
}

/// Parent rates as known to the clock tree.
///
/// Index `i` is the parent selected by mux value `i`. `None` marks a
/// parent that is absent or has no rate yet.
pub trait ParentRates {
    /// Number of mux inputs.
    fn num_parents(&self) -> usize;

    /// Current rate of parent `index`.
    fn parent_rate(&self, index: usize) -> Option<u64>;
}

impl ParentRates for [u64] {
    fn num_parents(&self) -> usize {
        self.len()
    }

    fn parent_rate(&self, index: usize) -> Option<u64> {
        self.get(index).copied()
    }
}

impl ParentRates for [Option<u64>] {
    fn num_parents(&self) -> usize {
        self.len()
    }

    fn parent_rate(&self, index: usize) -> Option<u64> {
        self.get(index).copied().flatten()
    }
}

impl<const N: usize> ParentRates for [u64; N] {
    fn num_parents(&self) -> usize {
        N
    }

    fn parent_rate(&self, index: usize) -> Option<u64> {
        self.as_slice().parent_rate(index)
    }
}

impl<const N: usize> ParentRates for [Option<u64>; N] {
    fn num_parents(&self) -> usize {
        N
    }

    fn parent_rate(&self, index: usize) -> Option<u64> {
        self.as_slice().parent_rate(index)
    }
}

impl ParentRates for Vec<u64> {
    fn num_parents(&self) -> usize {
        self.len()
    }

    fn parent_rate(&self, index: usize) -> Option<u64> {
        self.as_slice().parent_rate(index)
    }
}

impl ParentRates for Vec<Option<u64>> {
    fn num_parents(&self) -> usize {
        self.len()
    }

    fn parent_rate(&self, index: usize) -> Option<u64> {
        self.as_slice().parent_rate(index)
    }
}

/// Operations a clock-tree framework invokes on a clock.
pub trait ClockOps: Send + Sync {
    /// Clock name.
    fn name(&self) -> &str;

    /// Ungate the clock output.
    fn enable(&self) -> CcuResult<()>;

    /// Gate the clock output.
    fn disable(&self) -> CcuResult<()>;

    /// Whether the output is ungated.
    fn is_enabled(&self) -> bool;

    /// Mux index of the current parent.
    fn get_parent(&self) -> u8;

    /// Select parent `index`.
    fn set_parent(&self, index: u8) -> CcuResult<()>;

    /// Pick the best achievable rate and parent for `req`.
    fn determine_rate(&self, req: RateRequest, parents: &dyn ParentRates) -> CcuResult<RateRequest>;

    /// Current output rate given the parent's rate.
    fn recalc_rate(&self, parent_rate: u64) -> u64;

    /// Program the dividers for `rate` from `parent_rate`.
    fn set_rate(&self, rate: u64, parent_rate: u64) -> CcuResult<()>;
}
