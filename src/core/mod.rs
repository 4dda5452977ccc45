//! Core betting math: odds conversions and Kelly sizing.

pub mod kelly;
pub mod odds;

// Re-export commonly used types
pub use kelly::{kelly_fraction, BetSize, KellySizer};
pub use odds::{implied_probability, to_american, to_decimal};
