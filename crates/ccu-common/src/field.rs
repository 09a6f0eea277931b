//! Bit-field descriptors for the dividers and the mux selector packed in a
//! clock control word.
//!
//! A [`DividerField`] is either linear (the field stores `value - offset`)
//! or power-of-two (the field stores `log2(value) - offset`). The two kinds
//! have different effective maxima because the power-of-two field stores an
//! exponent rather than the divider itself:
//!
//! ```text
//! linear, width 4        raw 0..=15   -> divider offset..=offset+15, max 1 << 4 = 16
//! power-of-two, width 2  raw 0..=3    -> divider 1, 2, 4, 8,         max 1 << 3 = 8
//! ```

use crate::error::{CcuError, CcuResult};
use serde::{Deserialize, Serialize};

/// How a divider field maps its raw bits to a divider value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DividerKind {
    /// Stored quantity is `divider - offset`.
    #[default]
    Linear,
    /// Stored quantity is `log2(divider) - offset`.
    PowerOfTwo,
}

impl DividerKind {
    /// Short label used in diagnostics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::PowerOfTwo => "power-of-two",
        }
    }
}

/// Layout of one divider inside a control word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DividerField {
    /// Bit position of the field's least significant bit.
    pub shift: u8,
    /// Number of bits in the field.
    pub width: u8,
    /// Numeric offset added to the raw field contents.
    #[serde(default)]
    pub offset: u32,
    /// Explicit maximum divider, overriding the width-derived one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
    /// Linear or power-of-two interpretation.
    #[serde(default)]
    pub kind: DividerKind,
}

impl DividerField {
    /// Linear divider field with no offset and no explicit maximum.
    #[must_use]
    pub const fn linear(shift: u8, width: u8) -> Self {
        Self {
            shift,
            width,
            offset: 0,
            max: None,
            kind: DividerKind::Linear,
        }
    }

    /// Power-of-two divider field; the raw bits hold the exponent.
    #[must_use]
    pub const fn power_of_two(shift: u8, width: u8) -> Self {
        Self {
            shift,
            width,
            offset: 0,
            max: None,
            kind: DividerKind::PowerOfTwo,
        }
    }

    /// Set the numeric offset.
    #[must_use]
    pub const fn with_offset(self, offset: u32) -> Self {
        Self { offset, ..self }
    }

    /// Set an explicit maximum divider.
    #[must_use]
    pub const fn with_max(self, max: u32) -> Self {
        Self {
            max: Some(max),
            ..self
        }
    }

    /// Mask of the field once shifted down to bit 0.
    #[must_use]
    pub const fn mask(&self) -> u32 {
        if self.width >= 32 {
            u32::MAX
        } else {
            (1u32 << self.width) - 1
        }
    }

    /// Mask of the field in place within the control word.
    #[must_use]
    pub const fn span(&self) -> u32 {
        self.mask() << self.shift
    }

    /// Raw field contents, before offset or exponent interpretation.
    #[inline]
    #[must_use]
    pub fn raw(&self, word: u32) -> u32 {
        (word >> self.shift) & self.mask()
    }

    /// Exponent held by a power-of-two field.
    #[inline]
    #[must_use]
    pub fn exponent(&self, word: u32) -> u32 {
        self.raw(word) + self.offset
    }

    /// Decode the divider value held in `word`.
    ///
    /// A linear field decoding to zero reads back as 1, since a zero
    /// divider cannot exist in hardware.
    #[must_use]
    pub fn decode(&self, word: u32) -> u32 {
        match self.kind {
            DividerKind::Linear => self.raw(word).saturating_add(self.offset).max(1),
            // validate() keeps the exponent below 32
            DividerKind::PowerOfTwo => 1u32 << self.exponent(word).min(31),
        }
    }

    /// Store `value` into `word`, leaving every bit outside the field intact.
    ///
    /// # Errors
    ///
    /// Returns [`CcuError::UnrepresentableEncode`] if the value does not fit
    /// the field (or is not a power of two for a power-of-two field).
    pub fn encode(&self, word: u32, value: u32) -> CcuResult<u32> {
        let stored = self
            .stored_quantity(value)
            .ok_or(CcuError::UnrepresentableEncode {
                field: self.kind.label(),
                value,
            })?;
        Ok((word & !self.span()) | (stored << self.shift))
    }

    fn stored_quantity(&self, value: u32) -> Option<u32> {
        let stored = match self.kind {
            DividerKind::Linear => value.checked_sub(self.offset)?,
            DividerKind::PowerOfTwo => {
                if !value.is_power_of_two() {
                    return None;
                }
                value.trailing_zeros().checked_sub(self.offset)?
            }
        };
        (stored <= self.mask()).then_some(stored)
    }

    /// Largest divider the search may use with this field.
    #[must_use]
    pub fn effective_max(&self) -> u32 {
        if let Some(max) = self.max {
            return max;
        }
        match self.kind {
            DividerKind::Linear => u32::try_from(1u64 << self.width).unwrap_or(u32::MAX),
            DividerKind::PowerOfTwo => 1u32.checked_shl(self.mask()).unwrap_or(u32::MAX),
        }
    }

    /// Check that every divider the search can produce is encodable.
    ///
    /// # Errors
    ///
    /// Returns [`CcuError::Config`] describing the first violated constraint.
    pub fn validate(&self) -> CcuResult<()> {
        if self.width == 0 || self.width > 32 {
            return Err(CcuError::Config(format!(
                "divider field width {} outside 1..=32",
                self.width
            )));
        }
        if u32::from(self.shift) + u32::from(self.width) > 32 {
            return Err(CcuError::Config(format!(
                "divider field at shift {} width {} overflows the control word",
                self.shift, self.width
            )));
        }

        let max = self.effective_max();
        if max == 0 {
            return Err(CcuError::Config("divider maximum must be at least 1".into()));
        }

        match self.kind {
            DividerKind::Linear => {
                // The search starts at 1, so an offset above 1 leaves small dividers unencodable.
                if self.offset > 1 {
                    return Err(CcuError::Config(format!(
                        "linear divider offset {} leaves divider 1 unencodable",
                        self.offset
                    )));
                }
                if max - self.offset > self.mask() {
                    return Err(CcuError::Config(format!(
                        "linear divider maximum {max} does not fit {} bits with offset {}",
                        self.width, self.offset
                    )));
                }
            }
            DividerKind::PowerOfTwo => {
                if self.offset != 0 {
                    return Err(CcuError::Config(
                        "power-of-two divider must not carry an offset".into(),
                    ));
                }
                if self.mask() > 31 {
                    return Err(CcuError::Config(format!(
                        "power-of-two divider width {} can hold exponents of 32 or more",
                        self.width
                    )));
                }
                let top_exponent = max.ilog2();
                if top_exponent > self.mask() {
                    return Err(CcuError::Config(format!(
                        "power-of-two divider maximum {max} needs exponent {top_exponent}, field holds {}",
                        self.mask()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Layout of the parent selector inside a control word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MuxField {
    /// Bit position of the selector's least significant bit.
    pub shift: u8,
    /// Number of selector bits.
    pub width: u8,
}

impl MuxField {
    /// Create a mux field descriptor.
    #[must_use]
    pub const fn new(shift: u8, width: u8) -> Self {
        Self { shift, width }
    }

    /// Mask of the selector once shifted down to bit 0.
    #[must_use]
    pub const fn mask(&self) -> u32 {
        if self.width >= 32 {
            u32::MAX
        } else {
            (1u32 << self.width) - 1
        }
    }

    /// Mask of the selector in place within the control word.
    #[must_use]
    pub const fn span(&self) -> u32 {
        self.mask() << self.shift
    }

    /// Highest parent index the selector can represent.
    #[must_use]
    pub fn max_index(&self) -> u8 {
        u8::try_from(self.mask()).unwrap_or(u8::MAX)
    }

    /// Currently selected parent index.
    #[must_use]
    pub fn decode(&self, word: u32) -> u8 {
        u8::try_from((word >> self.shift) & self.mask()).unwrap_or(u8::MAX)
    }

    /// Store `index` into `word`.
    ///
    /// # Errors
    ///
    /// Returns [`CcuError::OutOfRangeSelector`] if `index` exceeds the
    /// selector's representable range.
    pub fn encode(&self, word: u32, index: u8) -> CcuResult<u32> {
        if u32::from(index) > self.mask() {
            return Err(CcuError::OutOfRangeSelector {
                index,
                max: self.max_index(),
            });
        }
        Ok((word & !self.span()) | (u32::from(index) << self.shift))
    }

    /// Check the selector fits the control word.
    ///
    /// # Errors
    ///
    /// Returns [`CcuError::Config`] for a zero, oversized, or overflowing field.
    pub fn validate(&self) -> CcuResult<()> {
        if self.width == 0 || self.width > 8 {
            return Err(CcuError::Config(format!(
                "mux field width {} outside 1..=8",
                self.width
            )));
        }
        if u32::from(self.shift) + u32::from(self.width) > 32 {
            return Err(CcuError::Config(format!(
                "mux field at shift {} width {} overflows the control word",
                self.shift, self.width
            )));
        }
        Ok(())
    }
}

/// Complete bit layout of an MMC clock control word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClockLayout {
    /// Gate enable bit mask.
    pub enable: u32,
    /// New timing switch mode bit mask.
    pub nts: u32,
    /// Linear divider M.
    pub m: DividerField,
    /// Power-of-two pre-divider P.
    pub p: DividerField,
    /// Parent selector.
    pub mux: MuxField,
}

impl ClockLayout {
    /// Layout of the sunxi MMC clocks with a new timing switch.
    ///
    /// ```text
    ///  31  30  29..26  25 24  23..18  17 16  15..4  3..0
    /// [EN][NTS][ ... ][ MUX ][ .... ][  P  ][ ... ][ M-1 ]
    /// ```
    pub const MMC_NTS: Self = Self {
        enable: 1 << 31,
        nts: 1 << 30,
        m: DividerField::linear(0, 4).with_offset(1),
        p: DividerField::power_of_two(16, 2),
        mux: MuxField::new(24, 2),
    };

    /// Validate each field and check that no two fields share a bit.
    ///
    /// # Errors
    ///
    /// Returns [`CcuError::Config`] for an invalid field, a divider of the
    /// wrong kind, a multi-bit enable/NTS mask, or overlapping fields.
    pub fn validate(&self) -> CcuResult<()> {
        self.m.validate()?;
        self.p.validate()?;
        self.mux.validate()?;

        if self.m.kind != DividerKind::Linear {
            return Err(CcuError::Config(String::from("m divider must be linear")));
        }
        // Rate readback shifts by the stored P value
        if self.p.kind != DividerKind::PowerOfTwo {
            return Err(CcuError::Config(String::from("p divider must be power_of_two")));
        }

        for (name, mask) in [("enable", self.enable), ("nts", self.nts)] {
            if !mask.is_power_of_two() {
                return Err(CcuError::Config(format!(
                    "{name} mask {mask:#010x} must select exactly one bit"
                )));
            }
        }

        let spans = [
            ("enable", self.enable),
            ("nts", self.nts),
            ("m", self.m.span()),
            ("p", self.p.span()),
            ("mux", self.mux.span()),
        ];
        for (i, (a, a_span)) in spans.iter().enumerate() {
            for (b, b_span) in &spans[i + 1..] {
                if a_span & b_span != 0 {
                    return Err(CcuError::Config(format!("{a} and {b} fields overlap")));
                }
            }
        }
        Ok(())
    }
}

impl Default for ClockLayout {
    fn default() -> Self {
        Self::MMC_NTS
    }
}
