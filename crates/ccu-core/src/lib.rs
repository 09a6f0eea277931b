#![doc = "Divider search, rate compensation, and clock operations for the sunxi CCU."]

pub mod gate;
pub mod mmc;
pub mod mux;
pub mod ops;
pub mod rate;
pub mod register;
pub mod search;
pub mod unit;

pub use mmc::*;
pub use ops::*;
pub use rate::*;
pub use register::*;
pub use search::*;
pub use unit::*;
