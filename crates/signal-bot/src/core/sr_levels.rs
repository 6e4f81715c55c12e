//! Support / resistance levels.
//!
//! Floor-trader pivots, trailing high/low windows, VWAP deviation bands and
//! the proximity test the strategies use to decide whether price is "at" a
//! level. Values are not rounded here; rounding happens once, when a signal
//! is built.
//!
//! Proximity convention: `tolerance` is always a fraction of the level
//! (`0.01` = within 1% of the level). Callers that reason in ATR distance
//! convert with [`atr_tolerance`] first.

use crate::types::{NearestLevels, PivotLevels, VwapBands, WeeklyLevels};

use super::fallback::{fallback, Computed, FallbackReason};

/// Classic floor-trader pivot points from one high/low/close triple.
///
/// Non-finite input falls back to ±1% / 2% / 3% bands around `close`.
pub fn pivot_points(high: f64, low: f64, close: f64) -> Computed<PivotLevels> {
    if !(high.is_finite() && low.is_finite() && close.is_finite()) {
        let c = if close.is_finite() { close } else { 0.0 };
        return fallback(
            PivotLevels {
                p: c,
                r1: c * 1.01,
                r2: c * 1.02,
                r3: c * 1.03,
                s1: c * 0.99,
                s2: c * 0.98,
                s3: c * 0.97,
            },
            FallbackReason::NonFinite,
        );
    }

    let p = (high + low + close) / 3.0;
    Ok(PivotLevels {
        p,
        r1: 2.0 * p - low,
        s1: 2.0 * p - high,
        r2: p + (high - low),
        s2: p - (high - low),
        r3: high + 2.0 * (p - low),
        s3: low - 2.0 * (high - p),
    })
}

/// Highest high and lowest low over the trailing `periods` bars.
///
/// The window is clamped to the available history. Empty input or a zero
/// window → both levels 0.
pub fn weekly_high_low(highs: &[f64], lows: &[f64], periods: usize) -> Computed<WeeklyLevels> {
    if highs.is_empty() || lows.is_empty() {
        return fallback(WeeklyLevels::default(), FallbackReason::EmptyInput);
    }
    if periods == 0 {
        return fallback(WeeklyLevels::default(), FallbackReason::InvalidPeriod);
    }

    let recent_highs = &highs[highs.len().saturating_sub(periods)..];
    let recent_lows = &lows[lows.len().saturating_sub(periods)..];
    let weekly_high = recent_highs
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    let weekly_low = recent_lows
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(f64::INFINITY, f64::min);

    if !(weekly_high.is_finite() && weekly_low.is_finite()) {
        return fallback(WeeklyLevels::default(), FallbackReason::NonFinite);
    }
    Ok(WeeklyLevels {
        weekly_high,
        weekly_low,
    })
}

/// Current VWAP ± `multiplier` · population std of the trailing `period`
/// VWAP values. Undefined values are dropped before the deviation is taken;
/// the current VWAP is the latest defined one.
pub fn vwap_bands(vwap_series: &[f64], period: usize, multiplier: f64) -> Computed<VwapBands> {
    if period == 0 {
        return fallback(VwapBands::default(), FallbackReason::InvalidPeriod);
    }
    if vwap_series.len() < period {
        return fallback(
            VwapBands::default(),
            FallbackReason::InsufficientData {
                needed: period,
                got: vwap_series.len(),
            },
        );
    }

    let valid: Vec<f64> = vwap_series[vwap_series.len() - period..]
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .collect();
    let Some(&current) = valid.last() else {
        return fallback(VwapBands::default(), FallbackReason::NonFinite);
    };

    let n = valid.len() as f64;
    let mean = valid.iter().sum::<f64>() / n;
    let std = (valid.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();

    Ok(VwapBands {
        upper: current + std * multiplier,
        lower: current - std * multiplier,
    })
}

/// `true` when `price` is within `tolerance · level` of `level`.
///
/// Always `false` for a zero level or any non-finite argument. Not symmetric
/// in `price` / `level`: the band scales with the level.
pub fn is_near_level(price: f64, level: f64, tolerance: f64) -> bool {
    if level == 0.0 || !(price.is_finite() && level.is_finite() && tolerance.is_finite()) {
        return false;
    }
    (price - level).abs() <= (level * tolerance).abs()
}

/// Express an absolute price distance (e.g. one ATR) as a fraction of
/// `level`, for use with [`is_near_level`].
pub fn atr_tolerance(distance: f64, level: f64) -> f64 {
    if level <= 0.0 || !level.is_finite() || !distance.is_finite() {
        return 0.0;
    }
    distance / level
}

/// Nearest resistance strictly above and nearest support strictly below
/// `price`, defaulting to R1 / S1 when none qualifies.
pub fn find_nearest_sr(
    price: f64,
    supports: &[f64],
    resistances: &[f64],
    pivots: &PivotLevels,
) -> NearestLevels {
    let resistance = resistances
        .iter()
        .copied()
        .filter(|&r| r > price)
        .fold(None, |best: Option<f64>, r| Some(best.map_or(r, |b| b.min(r))))
        .unwrap_or(pivots.r1);
    let support = supports
        .iter()
        .copied()
        .filter(|&s| s < price)
        .fold(None, |best: Option<f64>, s| Some(best.map_or(s, |b| b.max(s))))
        .unwrap_or(pivots.s1);

    NearestLevels {
        resistance,
        support,
    }
}
