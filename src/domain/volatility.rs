//! Close-to-close volatility over two overlapping windows.
//!
//! Population standard deviation (divisor n) over closing prices:
//! STDDEV = sqrt(sum((C[j] - mean)^2) / n)
//!
//! The lookback update compares today's window (the most recent n-1 closes)
//! with yesterday's window (the same length, shifted back one bar).

use crate::domain::error::BreakoutError;

/// Population standard deviation. `None` for an empty slice.
pub fn population_stddev(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;
    Some(variance.sqrt())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolatilityPair {
    pub today: f64,
    pub yesterday: f64,
}

impl VolatilityPair {
    /// Relative change `(today - yesterday) / today`, or `None` when today's
    /// window is flat or the change overflows.
    pub fn relative_change(&self) -> Option<f64> {
        if self.today == 0.0 {
            return None;
        }
        let delta = (self.today - self.yesterday) / self.today;
        delta.is_finite().then_some(delta)
    }
}

/// Volatility of `closes[1..]` (today) and `closes[..len-1]` (yesterday).
///
/// Needs at least three closes so that each window holds two observations.
pub fn volatility_pair(closes: &[f64]) -> Result<VolatilityPair, BreakoutError> {
    if closes.len() < 3 {
        return Err(BreakoutError::InsufficientData {
            needed: 3,
            got: closes.len(),
        });
    }
    if let Some(&bad) = closes.iter().find(|c| !c.is_finite()) {
        return Err(BreakoutError::InvalidPrice {
            series: "close",
            value: bad,
        });
    }

    let last = closes.len();
    // Both windows hold at least two closes here.
    let today = population_stddev(&closes[1..last]).unwrap_or(0.0);
    let yesterday = population_stddev(&closes[..last - 1]).unwrap_or(0.0);
    Ok(VolatilityPair { today, yesterday })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn stddev_empty_is_none() {
        assert_eq!(population_stddev(&[]), None);
    }

    #[test]
    fn stddev_constant_values() {
        assert_eq!(population_stddev(&[100.0; 30]), Some(0.0));
    }

    #[test]
    fn stddev_known_values() {
        let v = population_stddev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_relative_eq!(v, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn stddev_is_population_not_sample() {
        let v = population_stddev(&[10.0, 20.0, 30.0]).unwrap();
        let expected = ((100.0 + 0.0 + 100.0) / 3.0_f64).sqrt();
        assert_relative_eq!(v, expected, epsilon = 1e-12);
    }

    #[test]
    fn pair_uses_shifted_windows() {
        let closes = [1.0, 2.0, 4.0, 8.0];
        let pair = volatility_pair(&closes).unwrap();
        assert_relative_eq!(pair.today, population_stddev(&[2.0, 4.0, 8.0]).unwrap());
        assert_relative_eq!(pair.yesterday, population_stddev(&[1.0, 2.0, 4.0]).unwrap());
    }

    #[test]
    fn pair_rejects_short_input() {
        let err = volatility_pair(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, BreakoutError::InsufficientData { needed: 3, got: 2 }));
    }

    #[test]
    fn pair_rejects_nan() {
        let err = volatility_pair(&[1.0, f64::NAN, 3.0]).unwrap_err();
        assert!(matches!(err, BreakoutError::InvalidPrice { series: "close", .. }));
    }

    #[test]
    fn relative_change_flat_today() {
        let pair = VolatilityPair {
            today: 0.0,
            yesterday: 1.5,
        };
        assert_eq!(pair.relative_change(), None);
    }

    #[test]
    fn relative_change_rising_volatility() {
        let pair = VolatilityPair {
            today: 2.0,
            yesterday: 1.0,
        };
        assert_relative_eq!(pair.relative_change().unwrap(), 0.5);
    }

    #[test]
    fn overflowing_volatility_has_no_change() {
        let pair = volatility_pair(&[100.0, 100.0, 1e200]).unwrap();
        assert!(pair.today.is_infinite());
        assert_eq!(pair.relative_change(), None);

        let both = VolatilityPair {
            today: f64::INFINITY,
            yesterday: f64::INFINITY,
        };
        assert_eq!(both.relative_change(), None);
    }
}
