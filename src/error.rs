//! Typed failures surfaced by the core.
//!
//! Missing correlation weights are deliberately absent from this taxonomy:
//! a sport with no weights degrades to a neutral "no signal" score inside the
//! base stage, because that is a valid business outcome rather than an error.

use thiserror::Error;

/// Odds conversion failures. Always surfaced, never silently coerced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OddsError {
    /// American odds magnitude below 100.
    #[error("invalid American odds {american}: magnitude must be at least 100")]
    InvalidOdds { american: i32 },

    /// Decimal odds at or below the no-payout boundary.
    #[error("invalid decimal odds {decimal}: must be greater than 1.0")]
    InvalidDecimal { decimal: f64 },
}

/// Bankroll ledger failures. Every variant carries enough context for the
/// caller to distinguish "no edge" from "halted" from "exposure cap"; on any
/// failure the ledger state is left fully unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Requested stake exceeds the remaining exposure headroom.
    #[error("insufficient capital: requested {requested:.2}, available {available:.2}")]
    InsufficientCapital { requested: f64, available: f64 },

    /// Stake is not a positive finite amount.
    #[error("invalid stake {stake}: must be a positive finite amount")]
    InvalidStake { stake: f64 },

    /// A ticket with this id is already outstanding.
    #[error("duplicate ticket id {0:?}")]
    DuplicateTicket(String),

    /// No outstanding ticket with this id.
    #[error("unknown ticket id {0:?}")]
    UnknownTicket(String),

    /// The ledger is halted by the drawdown circuit breaker and requires an
    /// explicit reset.
    #[error("ledger halted: drawdown exceeded the halt threshold")]
    Halted,
}
