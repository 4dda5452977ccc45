//! Odds Conversions
//!
//! Pure conversions between American and decimal odds and implied
//! probability. No state.
//!
//! Round-tripping `to_american(to_decimal(x))` is lossy for non-integer
//! American equivalents because the American side rounds to a whole number.
//! That is expected behavior, not a bug.

use crate::error::OddsError;
use crate::models::Odds;

/// Convert American odds to decimal odds.
///
/// # Examples
/// ```
/// use edgerank::core::odds::to_decimal;
/// let d = to_decimal(-110).unwrap();
/// assert!((d - 1.9091).abs() < 0.001);
/// assert!((to_decimal(150).unwrap() - 2.5).abs() < 1e-9);
/// ```
pub fn to_decimal(american: i32) -> Result<f64, OddsError> {
    if american.abs() < 100 {
        return Err(OddsError::InvalidOdds { american });
    }

    if american > 0 {
        Ok(1.0 + american as f64 / 100.0)
    } else {
        Ok(1.0 + 100.0 / american.abs() as f64)
    }
}

/// Convert decimal odds to American odds, rounding to the nearest integer.
pub fn to_american(decimal: f64) -> Result<i32, OddsError> {
    if decimal <= 1.0 {
        return Err(OddsError::InvalidDecimal { decimal });
    }

    let american = if decimal >= 2.0 {
        ((decimal - 1.0) * 100.0).round()
    } else {
        (-100.0 / (decimal - 1.0)).round()
    };

    Ok(american as i32)
}

/// Implied win probability of American odds.
///
/// `remove_vig` multiplies the raw probability by `1 - vig_percentage`.
/// This is a flat-percentage approximation inherited from the reference
/// behavior, not a proportional de-vig across both sides of a market.
pub fn implied_probability(
    american: i32,
    remove_vig: bool,
    vig_percentage: f64,
) -> Result<f64, OddsError> {
    let decimal = to_decimal(american)?;
    let raw = 1.0 / decimal;

    if remove_vig {
        Ok(raw * (1.0 - vig_percentage))
    } else {
        Ok(raw)
    }
}

impl Odds {
    /// Decimal representation of these odds.
    pub fn decimal(&self) -> Result<f64, OddsError> {
        match *self {
            Odds::American(a) => to_decimal(a),
            Odds::Decimal(d) if d >= 1.0 => Ok(d),
            Odds::Decimal(d) => Err(OddsError::InvalidDecimal { decimal: d }),
        }
    }

    /// American representation of these odds (rounded).
    pub fn american(&self) -> Result<i32, OddsError> {
        match *self {
            Odds::American(a) if a.abs() >= 100 => Ok(a),
            Odds::American(a) => Err(OddsError::InvalidOdds { american: a }),
            Odds::Decimal(d) => to_american(d),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_decimal_positive() {
        assert!((to_decimal(150).unwrap() - 2.5).abs() < 1e-9);
        assert!((to_decimal(100).unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_to_decimal_negative() {
        assert!((to_decimal(-110).unwrap() - 1.909090909).abs() < 1e-6);
        assert!((to_decimal(-200).unwrap() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_to_decimal_invalid_magnitude() {
        assert_eq!(
            to_decimal(50),
            Err(OddsError::InvalidOdds { american: 50 })
        );
        assert_eq!(
            to_decimal(-99),
            Err(OddsError::InvalidOdds { american: -99 })
        );
        assert!(to_decimal(0).is_err());
    }

    #[test]
    fn test_to_american() {
        assert_eq!(to_american(2.5).unwrap(), 150);
        assert_eq!(to_american(2.0).unwrap(), 100);
        assert_eq!(to_american(1.5).unwrap(), -200);
        assert!(to_american(1.0).is_err());
        assert!(to_american(0.5).is_err());
    }

    #[test]
    fn test_implied_probability() {
        // -110 -> decimal 1.909 -> p = 0.5238
        let p = implied_probability(-110, false, 0.045).unwrap();
        assert!((p - 0.5238).abs() < 0.001);

        let p_novig = implied_probability(-110, true, 0.045).unwrap();
        assert!((p_novig - 0.5238 * 0.955).abs() < 0.001);
        assert!(p_novig < p);
    }

    #[test]
    fn test_round_trip_within_one_cent() {
        // For decimal odds >= 1.01, converting through American and back
        // must stay within the one-cent rounding error of the American side.
        let mut d = 1.01;
        while d <= 10.0 {
            let a = to_american(d).unwrap();
            assert!(a.abs() >= 100, "invalid American {} from decimal {}", a, d);
            let back = to_decimal(a).unwrap();
            assert!(
                (back - d).abs() <= 0.01,
                "round trip {} -> {} -> {}",
                d,
                a,
                back
            );
            d += 0.013;
        }
    }

    #[test]
    fn test_odds_enum_conversions() {
        let odds = Odds::American(-110);
        assert!((odds.decimal().unwrap() - 1.909090909).abs() < 1e-6);

        let odds = Odds::Decimal(2.5);
        assert_eq!(odds.american().unwrap(), 150);

        assert!(Odds::American(20).decimal().is_err());
        assert!(Odds::Decimal(0.9).decimal().is_err());
    }
}
