//! Divider pair search.
//!
//! The output of an MMC clock is `parent / p / m`, where `p` is a power of
//! two and `m` is a plain integer. Each stage truncates, so the search
//! evaluates candidates with floor division at every step, exactly as the
//! hardware chain does.
//!
//! The search never overshoots: it returns the pair giving the highest rate
//! that does not exceed the target. Among pairs giving the same rate, the
//! first in scan order wins (smaller `p`, then smaller `m`).

/// A pre-divider / divider combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DividerPair {
    /// Linear divider, `1..=max_m`.
    pub m: u32,
    /// Power-of-two pre-divider, `1..=max_p`.
    pub p: u32,
}

impl DividerPair {
    /// Rate produced from `parent_rate` by this pair.
    #[inline]
    #[must_use]
    pub fn rate(&self, parent_rate: u64) -> u64 {
        parent_rate / u64::from(self.p) / u64::from(self.m)
    }
}

/// Find the divider pair producing the highest rate not above `rate`.
///
/// `p` runs over powers of two up to `max_p` in the outer loop, `m` over
/// `1..=max_m` in the inner loop. A candidate has to beat 0 Hz to be taken,
/// so `None` means no pair yields a non-zero rate at or below `rate`.
///
/// # Example
///
/// ```
/// use ccu_core::search::{find_best, DividerPair};
///
/// let pair = find_best(400_000_000, 25_000_000, 16, 8).unwrap();
/// assert_eq!(pair, DividerPair { m: 16, p: 1 });
/// assert_eq!(pair.rate(400_000_000), 25_000_000);
///
/// // Even 400 MHz / 8 / 16 = 3.125 MHz is above 1 MHz
/// assert!(find_best(400_000_000, 1_000_000, 16, 8).is_none());
/// ```
#[must_use]
pub fn find_best(parent_rate: u64, rate: u64, max_m: u32, max_p: u32) -> Option<DividerPair> {
    let mut best = None;
    let mut best_rate = 0;

    let mut p = 1u32;
    while p <= max_p {
        for m in 1..=max_m {
            let pair = DividerPair { m, p };
            let candidate = pair.rate(parent_rate);
            if candidate > rate {
                continue;
            }

            if candidate > best_rate {
                best_rate = candidate;
                best = Some(pair);
                if candidate == rate {
                    return best;
                }
            }
            // Rates only fall as m grows; nothing later in this row can win.
            break;
        }

        match p.checked_mul(2) {
            Some(next) => p = next,
            None => break,
        }
    }

    best
}
