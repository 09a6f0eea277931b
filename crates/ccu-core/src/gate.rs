//! Gate helpers shared by every clock with an enable bit.

use crate::register::CcuCommon;
use ccu_common::CcuResult;
use tracing::trace;

/// Set the gate bits.
///
/// # Errors
///
/// Propagates any error from [`CcuCommon::update`].
pub fn enable(common: &CcuCommon, gate: u32) -> CcuResult<()> {
    let word = common.update(|word| Ok(word | gate))?;
    trace!(reg = common.reg(), word, "gate enabled");
    Ok(())
}

/// Clear the gate bits.
///
/// # Errors
///
/// Propagates any error from [`CcuCommon::update`].
pub fn disable(common: &CcuCommon, gate: u32) -> CcuResult<()> {
    let word = common.update(|word| Ok(word & !gate))?;
    trace!(reg = common.reg(), word, "gate disabled");
    Ok(())
}

/// Whether all gate bits are set.
#[must_use]
pub fn is_enabled(common: &CcuCommon, gate: u32) -> bool {
    common.read() & gate == gate
}
