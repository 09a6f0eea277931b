//! Mux helpers: parent selection and rate negotiation across parents.

use crate::ops::{ParentRates, RateRequest};
use crate::register::CcuCommon;
use ccu_common::{CcuError, CcuResult, MuxField};
use tracing::{debug, trace};

/// Currently selected parent index.
#[must_use]
pub fn get_parent(common: &CcuCommon, mux: &MuxField) -> u8 {
    mux.decode(common.read())
}

/// Select parent `index`.
///
/// # Errors
///
/// Returns [`CcuError::OutOfRangeSelector`] if `index` does not fit the
/// selector; the register is not written in that case.
pub fn set_parent(common: &CcuCommon, mux: &MuxField, index: u8) -> CcuResult<()> {
    common.update(|word| mux.encode(word, index))?;
    debug!(reg = common.reg(), index, "parent selected");
    Ok(())
}

/// Negotiate the best rate for `req` over the mux inputs.
///
/// `round(parent_rate, rate)` evaluates one parent. Every parent with a
/// known rate is tried in index order: an exact match wins at once,
/// otherwise the candidate closest below the requested rate is kept, the
/// first one winning ties. Parents that cannot reach the rate are skipped.
/// With `no_reparent`, only the current parent is evaluated.
///
/// # Errors
///
/// Returns [`CcuError::NoFeasibleDivider`] if no parent yields a rate, or
/// [`CcuError::UnknownParent`] if the current parent has no rate under
/// `no_reparent`. Other errors from `round` are propagated.
pub fn determine_rate<P, F>(
    common: &CcuCommon,
    mux: &MuxField,
    parents: &P,
    no_reparent: bool,
    req: RateRequest,
    mut round: F,
) -> CcuResult<RateRequest>
where
    P: ParentRates + ?Sized,
    F: FnMut(u64, u64) -> CcuResult<u64>,
{
    if no_reparent {
        let index = get_parent(common, mux);
        let parent_rate = parents
            .parent_rate(usize::from(index))
            .ok_or_else(|| CcuError::UnknownParent(format!("mux input {index}")))?;
        let rate = round(parent_rate, req.rate)?;
        return Ok(RateRequest {
            rate,
            best_parent_rate: parent_rate,
            best_parent_index: Some(index),
        });
    }

    let mut best: Option<RateRequest> = None;
    let mut best_distance = req.rate;
    let mut highest_parent = 0;

    for (i, index) in (0..parents.num_parents()).zip(0..=u8::MAX) {
        let Some(parent_rate) = parents.parent_rate(i) else {
            continue;
        };
        highest_parent = highest_parent.max(parent_rate);

        let rate = match round(parent_rate, req.rate) {
            Ok(rate) => rate,
            Err(CcuError::NoFeasibleDivider { .. }) => {
                trace!(index, parent_rate, target = req.rate, "parent cannot reach rate");
                continue;
            }
            Err(e) => return Err(e),
        };

        let candidate = RateRequest {
            rate,
            best_parent_rate: parent_rate,
            best_parent_index: Some(index),
        };
        if rate == req.rate {
            return Ok(candidate);
        }

        // Candidates above the request never win.
        if let Some(distance) = req.rate.checked_sub(rate) {
            if distance < best_distance {
                best_distance = distance;
                best = Some(candidate);
            }
        }
    }

    best.ok_or(CcuError::NoFeasibleDivider {
        parent_rate: highest_parent,
        target_rate: req.rate,
    })
}
