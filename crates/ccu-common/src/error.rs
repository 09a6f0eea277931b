use thiserror::Error;

/// Clock control unit errors covering configuration, rate negotiation, and register encoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CcuError {
    /// Configuration or layout error.
    #[error("configuration error: {0}")]
    Config(String),

    /// No divider pair produces a rate at or below the target.
    #[error("no divider pair reaches {target_rate} Hz from parent {parent_rate} Hz")]
    NoFeasibleDivider {
        /// Parent rate the search ran against.
        parent_rate: u64,
        /// Rate the search tried not to exceed.
        target_rate: u64,
    },

    /// Mux selector outside the field's representable range.
    #[error("parent index {index} out of range (max {max})")]
    OutOfRangeSelector {
        /// Requested parent index.
        index: u8,
        /// Largest index the mux field can hold.
        max: u8,
    },

    /// A divider value that the field cannot store.
    ///
    /// The search is bounded by each field's effective maximum, so this
    /// indicates a broken layout invariant rather than a caller mistake.
    #[error("value {value} cannot be encoded in {field} divider field")]
    UnrepresentableEncode {
        /// Kind of the field that rejected the value.
        field: &'static str,
        /// The offending divider value.
        value: u32,
    },

    /// Lookup of a clock name that is not registered.
    #[error("unknown clock: {0}")]
    UnknownClock(String),

    /// Clock references a parent that is not registered.
    #[error("unknown parent: {0}")]
    UnknownParent(String),
}

/// Convenience type alias for clock operations.
pub type CcuResult<T> = Result<T, CcuError>;
