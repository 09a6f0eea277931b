#![doc = "Common types shared across the sunxi-ccu workspace."]

pub mod config;
pub mod error;
pub mod field;

pub use config::*;
pub use error::*;
pub use field::*;
