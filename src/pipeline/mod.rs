//! The seven-stage calibration pipeline and its composer.

pub mod adjust;
pub mod base;
pub mod composer;

// Re-export commonly used types
pub use adjust::MarketSignal;
pub use composer::Composer;
