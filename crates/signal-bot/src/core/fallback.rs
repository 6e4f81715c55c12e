//! Fallback-with-reason results for the numeric pipeline.
//!
//! Indicator, level and order-book routines never fail outright: on degenerate
//! input they hand back a documented fallback value. [`Computed`] keeps that
//! fallback distinguishable from a normal result so tests (and logs) can see
//! *why* a neutral value was substituted, while [`Settle::settle`] lets
//! strategy code take the value either way.

use std::fmt;

use tracing::debug;

/// Why a routine returned its fallback value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// Fewer samples than the lookback requires.
    InsufficientData { needed: usize, got: usize },
    /// Parallel input series have different lengths.
    LengthMismatch,
    /// Zero (or otherwise unusable) period parameter.
    InvalidPeriod,
    /// NaN or infinite input where a finite value is required.
    NonFinite,
    EmptyInput,
    /// One side of the order book has no levels.
    EmptyBook,
    /// Order-book level with a non-finite or negative price/size.
    MalformedBook,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientData { needed, got } => {
                write!(f, "insufficient data: need {needed}, got {got}")
            }
            Self::LengthMismatch => f.write_str("input length mismatch"),
            Self::InvalidPeriod => f.write_str("invalid period"),
            Self::NonFinite => f.write_str("non-finite input"),
            Self::EmptyInput => f.write_str("empty input"),
            Self::EmptyBook => f.write_str("empty order book"),
            Self::MalformedBook => f.write_str("malformed order book"),
        }
    }
}

/// A substituted value together with the reason it was substituted.
#[derive(Debug, Clone, PartialEq)]
pub struct Fallback<T> {
    pub value: T,
    pub reason: FallbackReason,
}

/// `Ok` for a normal computation, `Err` for a documented fallback.
pub type Computed<T> = Result<T, Fallback<T>>;

/// Shorthand for returning a fallback.
pub fn fallback<T>(value: T, reason: FallbackReason) -> Computed<T> {
    Err(Fallback { value, reason })
}

/// Collapse a [`Computed`] into its value.
pub trait Settle<T> {
    /// Take the value from either arm, logging the fallback reason under `what`.
    fn settle(self, what: &str) -> T;

    /// The fallback reason, if any.
    fn fallback_reason(&self) -> Option<FallbackReason>;
}

impl<T> Settle<T> for Computed<T> {
    fn settle(self, what: &str) -> T {
        match self {
            Ok(value) => value,
            Err(Fallback { value, reason }) => {
                debug!(what, %reason, "using fallback value");
                value
            }
        }
    }

    fn fallback_reason(&self) -> Option<FallbackReason> {
        self.as_ref().err().map(|f| f.reason)
    }
}

/// Replace an undefined (NaN / infinite) value with `default`.
#[inline]
pub fn safe_value(value: f64, default: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        default
    }
}

/// Last element of `series`, or `default` when missing or undefined.
pub fn safe_last(series: &[f64], default: f64) -> f64 {
    safe_nth_back(series, 0, default)
}

/// Element `n` positions before the last (`0` = last), or `default`.
pub fn safe_nth_back(series: &[f64], n: usize, default: f64) -> f64 {
    series
        .len()
        .checked_sub(n + 1)
        .map_or(default, |i| safe_value(series[i], default))
}

/// Parse a numeric string, falling back to `default` when unparseable or
/// undefined.
pub fn safe_parse(raw: &str, default: f64) -> f64 {
    raw.trim()
        .parse::<f64>()
        .map_or(default, |v| safe_value(v, default))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_value_replaces_undefined() {
        assert_eq!(safe_value(f64::NAN, 50.0), 50.0);
        assert_eq!(safe_value(f64::INFINITY, 1.0), 1.0);
        assert_eq!(safe_value(f64::NEG_INFINITY, 1.0), 1.0);
        assert_eq!(safe_value(42.5, 0.0), 42.5);
    }

    #[test]
    fn test_safe_last_and_nth_back() {
        let s = [1.0, f64::NAN, 3.0];
        assert_eq!(safe_last(&s, 0.0), 3.0);
        assert_eq!(safe_nth_back(&s, 1, -1.0), -1.0);
        assert_eq!(safe_nth_back(&s, 2, -1.0), 1.0);
        assert_eq!(safe_nth_back(&s, 3, -1.0), -1.0);
        assert_eq!(safe_last(&[], 7.0), 7.0);
    }

    #[test]
    fn test_safe_parse() {
        assert_eq!(safe_parse("101.25", 0.0), 101.25);
        assert_eq!(safe_parse(" 3 ", 0.0), 3.0);
        assert_eq!(safe_parse("nan", 9.0), 9.0);
        assert_eq!(safe_parse("none", 9.0), 9.0);
        assert_eq!(safe_parse("", 9.0), 9.0);
    }

    #[test]
    fn test_settle_takes_either_arm() {
        let ok: Computed<u32> = Ok(1);
        let fb: Computed<u32> = fallback(2, FallbackReason::EmptyInput);
        assert_eq!(ok.fallback_reason(), None);
        assert_eq!(fb.fallback_reason(), Some(FallbackReason::EmptyInput));
        assert_eq!(ok.settle("ok"), 1);
        assert_eq!(fb.settle("fb"), 2);
    }
}
