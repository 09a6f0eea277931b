//! Configuration structures for a clock control unit.
//!
//! Supports TOML deserialization with defaults matching the sunxi MMC
//! clock layout, so a minimal clock entry only names its register and
//! parents.

use crate::field::{ClockLayout, DividerField, MuxField};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Top-level clock control unit configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CcuConfig {
    /// Size of the register window in bytes.
    pub register_window: u32,

    /// Root clocks feeding the unit, by name.
    #[serde(rename = "parent")]
    pub parents: Vec<ParentConfig>,

    /// MMC clocks with a new timing switch.
    #[serde(rename = "clock")]
    pub clocks: Vec<ClockConfig>,
}

impl Default for CcuConfig {
    fn default() -> Self {
        Self {
            register_window: 0x400,
            parents: vec![
                ParentConfig::new("osc24M", 24_000_000),
                ParentConfig::new("pll-periph0-2x", 1_200_000_000),
            ],
            clocks: vec![ClockConfig {
                name: String::from("mmc0"),
                reg: 0x088,
                parents: vec![String::from("osc24M"), String::from("pll-periph0-2x")],
                ..ClockConfig::default()
            }],
        }
    }
}

/// A fixed-rate root clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentConfig {
    /// Clock name referenced by `ClockConfig::parents`.
    pub name: String,
    /// Output rate in Hz.
    pub rate: u64,
}

impl ParentConfig {
    /// Create a parent entry.
    pub fn new(name: impl Into<String>, rate: u64) -> Self {
        Self {
            name: name.into(),
            rate,
        }
    }
}

/// One MMC clock register and its layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Clock name.
    pub name: String,

    /// Byte offset of the control register within the window.
    pub reg: u32,

    /// Parent names, indexed by mux selector value.
    pub parents: Vec<String>,

    /// Bit number of the gate enable bit.
    pub enable_bit: u8,

    /// Bit number of the new timing switch mode bit.
    pub nts_bit: u8,

    /// Keep the current parent during rate negotiation.
    pub no_reparent: bool,

    /// Register contents at reset.
    pub initial: u32,

    /// Linear divider M.
    pub m: DividerField,

    /// Power-of-two pre-divider P.
    pub p: DividerField,

    /// Parent selector.
    pub mux: MuxField,
}

impl Default for ClockConfig {
    fn default() -> Self {
        let layout = ClockLayout::MMC_NTS;
        Self {
            name: String::new(),
            reg: 0,
            parents: Vec::new(),
            enable_bit: 31,
            nts_bit: 30,
            no_reparent: false,
            initial: 0,
            m: layout.m,
            p: layout.p,
            mux: layout.mux,
        }
    }
}

impl ClockConfig {
    /// Bit layout described by this entry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a bit number is out of range or
    /// the layout fails validation.
    pub fn layout(&self) -> Result<ClockLayout, ConfigError> {
        let bit = |name: &str, bit: u8| {
            1u32.checked_shl(u32::from(bit)).ok_or_else(|| {
                ConfigError::Invalid(format!("clock {}: {name} bit {bit} outside 0..32", self.name))
            })
        };
        let layout = ClockLayout {
            enable: bit("enable", self.enable_bit)?,
            nts: bit("nts", self.nts_bit)?,
            m: self.m,
            p: self.p,
            mux: self.mux,
        };
        layout
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("clock {}: {e}", self.name)))?;
        Ok(layout)
    }
}

impl CcuConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(
            path = %path.display(),
            clocks = config.clocks.len(),
            parents = config.parents.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    /// Serialize configuration to TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Look up a parent's rate by name.
    #[must_use]
    pub fn parent_rate(&self, name: &str) -> Option<u64> {
        self.parents.iter().find(|p| p.name == name).map(|p| p.rate)
    }

    /// Check names, register placement, and every clock layout.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut parent_names = HashSet::new();
        for parent in &self.parents {
            if !parent_names.insert(parent.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate parent name: {}",
                    parent.name
                )));
            }
        }

        let mut clock_names = HashSet::new();
        let mut regs = HashSet::new();
        for clock in &self.clocks {
            if clock.name.is_empty() {
                return Err(ConfigError::Invalid("clock without a name".into()));
            }
            if !clock_names.insert(clock.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate clock name: {}",
                    clock.name
                )));
            }
            if clock.reg % 4 != 0 || clock.reg >= self.register_window {
                return Err(ConfigError::Invalid(format!(
                    "clock {}: register {:#x} not a word inside the {:#x}-byte window",
                    clock.name, clock.reg, self.register_window
                )));
            }
            if !regs.insert(clock.reg) {
                return Err(ConfigError::Invalid(format!(
                    "clock {}: register {:#x} already used",
                    clock.name, clock.reg
                )));
            }

            let layout = clock.layout()?;
            if clock.parents.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "clock {} has no parents",
                    clock.name
                )));
            }
            if clock.parents.len() > usize::from(layout.mux.max_index()) + 1 {
                return Err(ConfigError::Invalid(format!(
                    "clock {}: {} parents exceed a {}-bit mux",
                    clock.name,
                    clock.parents.len(),
                    layout.mux.width
                )));
            }
            if let Some(unknown) = clock
                .parents
                .iter()
                .find(|name| !parent_names.contains(name.as_str()))
            {
                return Err(ConfigError::Invalid(format!(
                    "clock {}: unknown parent {unknown}",
                    clock.name
                )));
            }
        }
        Ok(())
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Semantic validation error.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
