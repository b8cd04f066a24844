//! Payout amount arithmetic

pub mod breakdown;

pub use breakdown::*;
