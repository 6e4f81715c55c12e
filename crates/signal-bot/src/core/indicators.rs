//! Pure computation module for technical indicators.
//!
//! No I/O, no side effects. Every function takes ordered price/volume series
//! and returns a series of the SAME length as its input, whatever the input
//! length. When the input is too short (or otherwise degenerate) the function
//! returns its documented neutral fill as a [`Fallback`](super::fallback::Fallback)
//! instead of failing, so callers can tell a computed series from a
//! substituted one.
//!
//! Series are `f64`; NaN marks an undefined value inside a computation and
//! only survives to the output for the EMA short-input sentinel.
//!
//! Indicators implemented:
//! - Trend: EMA, MACD (bias-corrected exponential weighting)
//! - Momentum: RSI (simple rolling average gain/loss), Stochastic RSI
//! - Volatility: Bollinger Bands (sample std), ATR (simple rolling mean)
//! - Volume: VWAP (cumulative), OBV

use std::collections::BTreeMap;

use super::fallback::{fallback, safe_last, safe_nth_back, Computed, FallbackReason, Settle};

/// Neutral RSI / Stochastic-RSI fill.
pub const NEUTRAL_OSCILLATOR: f64 = 50.0;

// ═══════════════════════════════════════════════════════════════════════════
// Result containers
// ═══════════════════════════════════════════════════════════════════════════

/// MACD line, signal line and histogram, one value per input close.
#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

impl Macd {
    fn zeros(len: usize) -> Self {
        Self {
            line: vec![0.0; len],
            signal: vec![0.0; len],
            histogram: vec![0.0; len],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

impl BollingerBands {
    fn echo(closes: &[f64]) -> Self {
        Self {
            upper: closes.to_vec(),
            middle: closes.to_vec(),
            lower: closes.to_vec(),
        }
    }
}

/// Smoothed %K and %D of the Stochastic RSI.
#[derive(Debug, Clone, PartialEq)]
pub struct StochRsi {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
}

impl StochRsi {
    fn neutral(len: usize) -> Self {
        Self {
            k: vec![NEUTRAL_OSCILLATOR; len],
            d: vec![NEUTRAL_OSCILLATOR; len],
        }
    }
}

/// Named indicator series computed over one candle window.
///
/// Every series inserted is settled first, so readers only ever see the
/// computed series or its documented fallback.
#[derive(Debug, Clone, Default)]
pub struct IndicatorSet {
    series: BTreeMap<&'static str, Vec<f64>>,
}

impl IndicatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settle `computed` (logging any fallback under `name`) and store it.
    pub fn insert(&mut self, name: &'static str, computed: Computed<Vec<f64>>) {
        let values = computed.settle(name);
        self.series.insert(name, values);
    }

    /// Full series for `name`; empty when absent.
    pub fn series(&self, name: &str) -> &[f64] {
        self.series.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Latest defined value of `name`, or `default`.
    pub fn current(&self, name: &str, default: f64) -> f64 {
        safe_last(self.series(name), default)
    }

    /// Value `n` bars before the latest, or `default`.
    pub fn nth_back(&self, name: &str, n: usize, default: f64) -> f64 {
        safe_nth_back(self.series(name), n, default)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.series.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Trend
// ═══════════════════════════════════════════════════════════════════════════

/// Exponential Moving Average.
///
/// `α = 2 / (period + 1)`, seeded with the first value and updated with the
/// plain recursion `y[i] = α·x[i] + (1-α)·y[i-1]`. Shorter than `period` →
/// every output is NaN (the sentinel callers replace via `safe_value`).
pub fn ema(values: &[f64], period: usize) -> Computed<Vec<f64>> {
    let nan = || vec![f64::NAN; values.len()];
    if period == 0 {
        return fallback(nan(), FallbackReason::InvalidPeriod);
    }
    if values.len() < period {
        return fallback(
            nan(),
            FallbackReason::InsufficientData {
                needed: period,
                got: values.len(),
            },
        );
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev = values[0];
    out.push(prev);
    for &x in &values[1..] {
        prev = alpha * x + (1.0 - alpha) * prev;
        out.push(prev);
    }
    Ok(out)
}

/// Bias-corrected exponential weighting: the weighted mean of all values so
/// far with weights `(1-α)^age`. Defined from the first value onward.
fn ewm_adjusted(values: &[f64], span: usize) -> Vec<f64> {
    let decay = 1.0 - 2.0 / (span as f64 + 1.0);
    let mut num = 0.0;
    let mut den = 0.0;
    values
        .iter()
        .map(|&x| {
            num = x + decay * num;
            den = 1.0 + decay * den;
            num / den
        })
        .collect()
}

/// Moving Average Convergence Divergence.
///
/// Returns all-zero series when there are fewer than `slow` closes.
/// Undefined values in any output are zero-filled.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Computed<Macd> {
    if fast == 0 || slow == 0 || signal == 0 {
        return fallback(Macd::zeros(closes.len()), FallbackReason::InvalidPeriod);
    }
    if closes.len() < slow {
        return fallback(
            Macd::zeros(closes.len()),
            FallbackReason::InsufficientData {
                needed: slow,
                got: closes.len(),
            },
        );
    }

    let fast_ema = ewm_adjusted(closes, fast);
    let slow_ema = ewm_adjusted(closes, slow);
    let line: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ewm_adjusted(&line, signal);
    let histogram: Vec<f64> = line
        .iter()
        .zip(&signal_line)
        .map(|(l, s)| zero_if_undefined(l - s))
        .collect();

    Ok(Macd {
        line: line.into_iter().map(zero_if_undefined).collect(),
        signal: signal_line.into_iter().map(zero_if_undefined).collect(),
        histogram,
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// Momentum
// ═══════════════════════════════════════════════════════════════════════════

/// Relative Strength Index.
///
/// Gains and losses come from first differences (the first difference counts
/// as zero) and are averaged with a simple rolling mean over `period`. The
/// first `period - 1` outputs are 50. A window without losses reads 100 when
/// it has gains and 50 when flat. Fewer than `period + 1` closes → all 50.
pub fn rsi(closes: &[f64], period: usize) -> Computed<Vec<f64>> {
    let neutral = || vec![NEUTRAL_OSCILLATOR; closes.len()];
    if period == 0 {
        return fallback(neutral(), FallbackReason::InvalidPeriod);
    }
    if closes.len() < period + 1 {
        return fallback(
            neutral(),
            FallbackReason::InsufficientData {
                needed: period + 1,
                got: closes.len(),
            },
        );
    }

    let mut gains = Vec::with_capacity(closes.len());
    let mut losses = Vec::with_capacity(closes.len());
    gains.push(0.0);
    losses.push(0.0);
    for w in closes.windows(2) {
        let delta = w[1] - w[0];
        gains.push(if delta > 0.0 { delta } else { 0.0 });
        losses.push(if delta < 0.0 { -delta } else { 0.0 });
    }

    let avg_gain = rolling_mean(&gains, period);
    let avg_loss = rolling_mean(&losses, period);

    let out = avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(&g, &l)| {
            if !g.is_finite() || !l.is_finite() {
                NEUTRAL_OSCILLATOR
            } else if l == 0.0 {
                if g > 0.0 {
                    100.0
                } else {
                    NEUTRAL_OSCILLATOR
                }
            } else {
                100.0 - 100.0 / (1.0 + g / l)
            }
        })
        .collect();
    Ok(out)
}

/// Stochastic RSI: %K and %D as rolling means of the raw stochastic of RSI.
///
/// Raw %K = `100 · (rsi - min) / (max - min)` over a rolling `period` window,
/// with a zero range replaced by 100. %K is the `k_period` rolling mean of raw
/// %K; %D is the `d_period` rolling mean of %K. Undefined entries read 50.
pub fn stochastic_rsi(
    closes: &[f64],
    period: usize,
    k_period: usize,
    d_period: usize,
) -> Computed<StochRsi> {
    if period == 0 || k_period == 0 || d_period == 0 {
        return fallback(StochRsi::neutral(closes.len()), FallbackReason::InvalidPeriod);
    }
    // The RSI series keeps its own fill; a short input still has a
    // same-length series to work from.
    let rsi_values = rsi(closes, period).settle("stoch_rsi.rsi");
    if rsi_values.len() < period {
        return fallback(
            StochRsi::neutral(closes.len()),
            FallbackReason::InsufficientData {
                needed: period,
                got: rsi_values.len(),
            },
        );
    }

    let lowest = rolling_min(&rsi_values, period);
    let highest = rolling_max(&rsi_values, period);
    let raw_k: Vec<f64> = rsi_values
        .iter()
        .zip(lowest.iter().zip(&highest))
        .map(|(&r, (&lo, &hi))| {
            let range = hi - lo;
            let range = if range == 0.0 { 100.0 } else { range };
            100.0 * (r - lo) / range
        })
        .collect();

    let k = rolling_mean(&raw_k, k_period);
    let d = rolling_mean(&k, d_period);
    Ok(StochRsi {
        k: k.into_iter().map(neutral_if_undefined).collect(),
        d: d.into_iter().map(neutral_if_undefined).collect(),
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// Volatility
// ═══════════════════════════════════════════════════════════════════════════

/// Bollinger Bands: rolling mean ± `std_mult` · rolling sample std.
///
/// Leading undefined values are back-filled from the first defined one. A
/// band that is never defined falls back to `last · 1.02` (upper),
/// `last` (middle), `last · 0.98` (lower). Fewer than `period` closes → the
/// input is echoed for all three bands.
pub fn bollinger_bands(closes: &[f64], period: usize, std_mult: f64) -> Computed<BollingerBands> {
    if period == 0 {
        return fallback(BollingerBands::echo(closes), FallbackReason::InvalidPeriod);
    }
    if closes.len() < period {
        return fallback(
            BollingerBands::echo(closes),
            FallbackReason::InsufficientData {
                needed: period,
                got: closes.len(),
            },
        );
    }

    let middle = rolling_mean(closes, period);
    let std_dev = rolling_std(closes, period);
    let mut upper: Vec<f64> = middle
        .iter()
        .zip(&std_dev)
        .map(|(m, s)| m + s * std_mult)
        .collect();
    let mut lower: Vec<f64> = middle
        .iter()
        .zip(&std_dev)
        .map(|(m, s)| m - s * std_mult)
        .collect();
    let mut middle = middle;

    let last = closes[closes.len() - 1];
    backfill(&mut upper, last * 1.02);
    backfill(&mut middle, last);
    backfill(&mut lower, last * 0.98);

    Ok(BollingerBands {
        upper,
        middle,
        lower,
    })
}

/// Average True Range (simple rolling mean of true range).
///
/// `TR[0] = high[0] - low[0]`; afterwards the usual
/// `max(h - l, |h - prev_close|, |l - prev_close|)`. Leading undefined values
/// are back-filled. Fewer than `period + 1` bars, or mismatched input lengths,
/// → a constant series of the mean high-low range. Output length follows
/// `closes`.
pub fn atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Computed<Vec<f64>> {
    let mean_range = || {
        let n = highs.len().min(lows.len());
        if n == 0 {
            return 0.0;
        }
        highs.iter().zip(lows).map(|(h, l)| h - l).sum::<f64>() / n as f64
    };
    let constant = |v: f64| vec![v; closes.len()];

    if highs.len() != closes.len() || lows.len() != closes.len() {
        return fallback(constant(mean_range()), FallbackReason::LengthMismatch);
    }
    if period == 0 {
        return fallback(constant(mean_range()), FallbackReason::InvalidPeriod);
    }
    if closes.len() < period + 1 {
        return fallback(
            constant(mean_range()),
            FallbackReason::InsufficientData {
                needed: period + 1,
                got: closes.len(),
            },
        );
    }

    let mut true_range = Vec::with_capacity(closes.len());
    true_range.push(highs[0] - lows[0]);
    for i in 1..closes.len() {
        let prev_close = closes[i - 1];
        let tr = (highs[i] - lows[i])
            .max((highs[i] - prev_close).abs())
            .max((lows[i] - prev_close).abs());
        true_range.push(tr);
    }

    let tr_mean = true_range.iter().sum::<f64>() / true_range.len() as f64;
    let mut out = rolling_mean(&true_range, period);
    backfill(&mut out, tr_mean);
    Ok(out)
}

// ═══════════════════════════════════════════════════════════════════════════
// Volume
// ═══════════════════════════════════════════════════════════════════════════

/// Cumulative Volume Weighted Average Price over typical price `(h+l+c)/3`.
///
/// While cumulative volume is still zero the bar's close is emitted.
/// Mismatched lengths or empty input → closes echoed.
pub fn vwap(highs: &[f64], lows: &[f64], closes: &[f64], volumes: &[f64]) -> Computed<Vec<f64>> {
    if closes.is_empty() {
        return fallback(Vec::new(), FallbackReason::EmptyInput);
    }
    if highs.len() != closes.len() || lows.len() != closes.len() || volumes.len() != closes.len()
    {
        return fallback(closes.to_vec(), FallbackReason::LengthMismatch);
    }

    let mut cum_pv = 0.0;
    let mut cum_vol = 0.0;
    let out = (0..closes.len())
        .map(|i| {
            let typical = (highs[i] + lows[i] + closes[i]) / 3.0;
            cum_pv += typical * volumes[i];
            cum_vol += volumes[i];
            if cum_vol > 0.0 {
                cum_pv / cum_vol
            } else {
                closes[i]
            }
        })
        .collect();
    Ok(out)
}

/// On-Balance Volume, starting at zero.
///
/// Adds the bar's volume on an up close, subtracts it on a down close.
/// Mismatched lengths or fewer than two bars → zero series.
pub fn obv(closes: &[f64], volumes: &[f64]) -> Computed<Vec<f64>> {
    if closes.len() != volumes.len() {
        return fallback(vec![0.0; closes.len()], FallbackReason::LengthMismatch);
    }
    if closes.len() < 2 {
        return fallback(
            vec![0.0; closes.len()],
            FallbackReason::InsufficientData {
                needed: 2,
                got: closes.len(),
            },
        );
    }

    let mut out = Vec::with_capacity(closes.len());
    let mut running = 0.0;
    out.push(running);
    for i in 1..closes.len() {
        if closes[i] > closes[i - 1] {
            running += volumes[i];
        } else if closes[i] < closes[i - 1] {
            running -= volumes[i];
        }
        out.push(running);
    }
    Ok(out)
}

// ═══════════════════════════════════════════════════════════════════════════
// Rolling-window helpers
// ═══════════════════════════════════════════════════════════════════════════

/// Apply `f` to every full `window`; positions before the first full window,
/// and windows containing an undefined value, are NaN.
fn rolling(values: &[f64], window: usize, f: impl Fn(&[f64]) -> f64) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }
    for end in window..=values.len() {
        let slice = &values[end - window..end];
        if slice.iter().all(|v| v.is_finite()) {
            out[end - 1] = f(slice);
        }
    }
    out
}

fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, |w| w.iter().sum::<f64>() / w.len() as f64)
}

/// Sample (n-1) standard deviation; undefined for a window of one.
fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, |w| {
        if w.len() < 2 {
            return f64::NAN;
        }
        let mean = w.iter().sum::<f64>() / w.len() as f64;
        let var = w.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (w.len() - 1) as f64;
        var.sqrt()
    })
}

fn rolling_min(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, |w| w.iter().copied().fold(f64::INFINITY, f64::min))
}

fn rolling_max(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, |w| w.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

/// Replace each undefined entry with the next defined one; entries with no
/// defined successor take `fill`.
fn backfill(values: &mut [f64], fill: f64) {
    let mut next = fill;
    for v in values.iter_mut().rev() {
        if v.is_finite() {
            next = *v;
        } else {
            *v = next;
        }
    }
}

#[inline]
fn zero_if_undefined(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

#[inline]
fn neutral_if_undefined(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        NEUTRAL_OSCILLATOR
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
