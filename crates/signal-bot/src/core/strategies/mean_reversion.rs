//! Bollinger mean-reversion and breakout rules for ETH.
//!
//! Four ordered branches; the first whose outer gate passes decides the
//! outcome, even when its own level check then fails:
//!
//! 1. price at/below the lower band in an EMA uptrend with positive MACD
//!    histogram: LONG if near S1 or above S2
//! 2. price at/above the upper band in an EMA downtrend with negative
//!    histogram: SHORT if near R1 or below R2
//! 3. price above the upper band in an EMA uptrend: LONG breakout above R1
//! 4. price below the lower band in an EMA downtrend: SHORT breakdown below S1

use rust_decimal::Decimal;
use tracing::debug;

use crate::config::{MeanReversionConfig, OrderBookConfig};
use crate::core::fallback::Settle;
use crate::core::indicators::{self, IndicatorSet};
use crate::core::position_sizing::PositionSizer;
use crate::core::sr_levels::{find_nearest_sr, is_near_level, pivot_points};
use crate::errors::SignalResult;
use crate::types::{
    BandPosition, Candle, Diagnostics, OrderBookSnapshot, PivotLevels, Side, Signal, Timeframe,
};

use super::{book_confirmation, Decision, MarketContext, SignalDraft, SignalStrategy};

const NAME: &str = "Mean Reversion + Breakout";

#[derive(Debug, Clone, PartialEq)]
pub struct MeanReversionSnapshot {
    pub price: f64,
    pub bb_upper: f64,
    pub bb_middle: f64,
    pub bb_lower: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub macd_histogram: f64,
    pub pivots: PivotLevels,
    /// Average bar range over the recent window, used as the stop distance.
    pub range_estimate: f64,
    pub imbalance: f64,
}

impl MeanReversionSnapshot {
    pub fn band_position(&self) -> BandPosition {
        if self.price > self.bb_upper {
            BandPosition::Upper
        } else if self.price < self.bb_lower {
            BandPosition::Lower
        } else {
            BandPosition::Middle
        }
    }
}

pub struct MeanReversionBreakout {
    config: MeanReversionConfig,
    sizer: PositionSizer,
    book: OrderBookConfig,
}

impl MeanReversionBreakout {
    pub fn new(config: MeanReversionConfig, sizer: PositionSizer, book: OrderBookConfig) -> Self {
        Self {
            config,
            sizer,
            book,
        }
    }

    pub fn snapshot(&self, ctx: &MarketContext) -> MeanReversionSnapshot {
        let cfg = &self.config;
        let cols = &ctx.columns;
        let price = ctx.price;

        let bands = indicators::bollinger_bands(&cols.closes, cfg.bb_period, cfg.bb_std)
            .settle("mean_reversion.bollinger");
        let macd = indicators::macd(&cols.closes, cfg.macd_fast, cfg.macd_slow, cfg.macd_signal)
            .settle("mean_reversion.macd");

        let mut set = IndicatorSet::new();
        set.insert("bb_upper", Ok(bands.upper));
        set.insert("bb_middle", Ok(bands.middle));
        set.insert("bb_lower", Ok(bands.lower));
        set.insert("macd_histogram", Ok(macd.histogram));
        set.insert("ema_fast", indicators::ema(&cols.closes, cfg.ema_fast));
        set.insert("ema_slow", indicators::ema(&cols.closes, cfg.ema_slow));

        let prev = cols.len().saturating_sub(2);
        let pivots = pivot_points(cols.highs[prev], cols.lows[prev], cols.closes[prev])
            .settle("mean_reversion.pivots");

        MeanReversionSnapshot {
            price,
            bb_upper: set.current("bb_upper", price * 1.02),
            bb_middle: set.current("bb_middle", price),
            bb_lower: set.current("bb_lower", price * 0.98),
            ema_fast: set.current("ema_fast", price),
            ema_slow: set.current("ema_slow", price),
            macd_histogram: set.current("macd_histogram", 0.0),
            pivots,
            range_estimate: range_estimate(&cols.highs, &cols.lows, cfg.range_bars),
            imbalance: ctx.imbalance(),
        }
    }

    /// Side and confidence increment from the first branch whose gate passes.
    fn branch(&self, snap: &MeanReversionSnapshot) -> Option<(Side, Decimal)> {
        let cfg = &self.config;
        let p = snap.price;
        let pv = &snap.pivots;
        let uptrend = snap.ema_fast > snap.ema_slow;
        let downtrend = snap.ema_fast < snap.ema_slow;

        if p <= snap.bb_lower && uptrend && snap.macd_histogram > 0.0 {
            (is_near_level(p, pv.s1, cfg.level_tolerance) || p > pv.s2)
                .then_some((Side::Long, cfg.reversion_bonus))
        } else if p >= snap.bb_upper && downtrend && snap.macd_histogram < 0.0 {
            (is_near_level(p, pv.r1, cfg.level_tolerance) || p < pv.r2)
                .then_some((Side::Short, cfg.reversion_bonus))
        } else if p > snap.bb_upper && uptrend {
            (p > pv.r1).then_some((Side::Long, cfg.breakout_bonus))
        } else if p < snap.bb_lower && downtrend {
            (p < pv.s1).then_some((Side::Short, cfg.breakout_bonus))
        } else {
            None
        }
    }

    pub fn decide(&self, snap: &MeanReversionSnapshot) -> Decision {
        let cfg = &self.config;
        let Some((side, bonus)) = self.branch(snap) else {
            return Decision::hold(snap.price, cfg.hold_offset_pct);
        };

        let p = snap.price;
        let stop_loss = match side {
            Side::Long => (snap.bb_lower * (1.0 - cfg.band_buffer)).max(p - snap.range_estimate),
            _ => (snap.bb_upper * (1.0 + cfg.band_buffer)).min(p + snap.range_estimate),
        };

        Decision {
            side,
            confidence: cfg.base_confidence
                + bonus
                + book_confirmation(side, snap.imbalance, cfg.imbalance_threshold, cfg.book_bonus),
            stop_loss,
            take_profit: snap.bb_middle,
        }
    }
}

/// `(max(high) - min(low)) / bars` over the trailing `bars` candles.
fn range_estimate(highs: &[f64], lows: &[f64], bars: usize) -> f64 {
    if bars == 0 || highs.is_empty() || lows.is_empty() {
        return 0.0;
    }
    let hi = highs[highs.len().saturating_sub(bars)..]
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    let lo = lows[lows.len().saturating_sub(bars)..]
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(f64::INFINITY, f64::min);
    let range = (hi - lo) / bars as f64;
    if range.is_finite() {
        range
    } else {
        0.0
    }
}

impl SignalStrategy for MeanReversionBreakout {
    fn name(&self) -> &str {
        NAME
    }

    fn symbol(&self) -> &str {
        &self.config.symbol
    }

    fn default_timeframe(&self) -> Timeframe {
        self.config.timeframe
    }

    fn candle_count(&self) -> usize {
        self.config.candle_count
    }

    fn min_candles(&self) -> usize {
        self.config.min_candles
    }

    fn evaluate(
        &self,
        candles: &[Candle],
        book: &OrderBookSnapshot,
        timeframe: Timeframe,
    ) -> SignalResult<Signal> {
        let ctx = MarketContext::prepare(
            &self.config.symbol,
            candles,
            book,
            self.config.min_candles,
            &self.book,
        )?;
        let snap = self.snapshot(&ctx);
        let decision = self.decide(&snap);
        let bb_position = snap.band_position();
        debug!(
            symbol = %self.config.symbol,
            side = %decision.side,
            ?bb_position,
            histogram = snap.macd_histogram,
            "mean reversion evaluated"
        );

        let p = &snap.pivots;
        let nearest = find_nearest_sr(
            snap.price,
            &[p.s1, p.s2, p.s3, snap.bb_lower],
            &[p.r1, p.r2, p.r3, snap.bb_upper],
            p,
        );

        Ok(SignalDraft {
            symbol: &self.config.symbol,
            strategy_name: NAME,
            timeframe,
            price_precision: self.config.price_precision,
            ctx: &ctx,
            decision,
            pivots: p,
            nearest,
            diagnostics: Diagnostics::MeanReversion { bb_position },
        }
        .finish(&self.sizer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::strategies::fixtures::trending_candles;
    use crate::errors::SignalError;
    use rust_decimal_macros::dec;

    fn strategy() -> MeanReversionBreakout {
        MeanReversionBreakout::new(
            MeanReversionConfig::default(),
            PositionSizer::default(),
            OrderBookConfig::default(),
        )
    }

    /// Bands 96 / 100 / 104, pivots P = 97, S1 = 94, S2 = 91, R1 = 100, R2 = 103.
    fn base() -> MeanReversionSnapshot {
        MeanReversionSnapshot {
            price: 100.0,
            bb_upper: 104.0,
            bb_middle: 100.0,
            bb_lower: 96.0,
            ema_fast: 100.0,
            ema_slow: 100.0,
            macd_histogram: 0.0,
            pivots: pivot_points(100.0, 94.0, 97.0).unwrap(),
            range_estimate: 0.5,
            imbalance: 0.0,
        }
    }

    #[test]
    fn test_range_estimate() {
        let highs = [10.0, 12.0, 11.0];
        let lows = [9.0, 8.0, 10.0];
        assert!((range_estimate(&highs, &lows, 2) - 1.5).abs() < 1e-12);
        assert_eq!(range_estimate(&[], &[], 20), 0.0);
        assert_eq!(range_estimate(&highs, &lows, 0), 0.0);
    }

    #[test]
    fn test_band_position() {
        let mut snap = base();
        assert_eq!(snap.band_position(), BandPosition::Middle);
        snap.price = 104.5;
        assert_eq!(snap.band_position(), BandPosition::Upper);
        snap.price = 96.0;
        assert_eq!(snap.band_position(), BandPosition::Middle);
        snap.price = 95.0;
        assert_eq!(snap.band_position(), BandPosition::Lower);
    }

    // -- branches ------------------------------------------------------------

    #[test]
    fn test_reversion_long() {
        let snap = MeanReversionSnapshot {
            price: 95.8,
            ema_fast: 101.0,
            macd_histogram: 0.4,
            ..base()
        };
        let d = strategy().decide(&snap);
        assert_eq!(d.side, Side::Long);
        assert_eq!(d.confidence, dec!(0.75));
        assert!((d.stop_loss - 96.0 * 0.995).abs() < 1e-9);
        assert_eq!(d.take_profit, 100.0);
    }

    #[test]
    fn test_reversion_short_with_book_confirmation() {
        let snap = MeanReversionSnapshot {
            price: 104.2,
            ema_fast: 99.0,
            macd_histogram: -0.4,
            imbalance: -0.3,
            // R1 = 106, R2 = 109.
            pivots: pivot_points(106.0, 100.0, 103.0).unwrap(),
            ..base()
        };
        let d = strategy().decide(&snap);
        assert_eq!(d.side, Side::Short);
        assert_eq!(d.confidence, dec!(0.90));
        assert!((d.stop_loss - 104.0 * 1.005).abs() < 1e-9);
        assert_eq!(d.take_profit, 100.0);
    }

    #[test]
    fn test_first_gate_wins_even_when_level_fails() {
        // Branch 1 gate passes; price is below S2 and not near S1.
        let snap = MeanReversionSnapshot {
            price: 85.0,
            ema_fast: 101.0,
            macd_histogram: 0.4,
            ..base()
        };
        assert_eq!(strategy().decide(&snap).side, Side::Hold);
    }

    #[test]
    fn test_breakout_long() {
        let snap = MeanReversionSnapshot {
            price: 105.0,
            ema_fast: 101.0,
            macd_histogram: -0.1,
            ..base()
        };
        let d = strategy().decide(&snap);
        assert_eq!(d.side, Side::Long);
        assert_eq!(d.confidence, dec!(0.7));
        assert!((d.stop_loss - 104.5).abs() < 1e-9);
    }

    #[test]
    fn test_breakdown_short() {
        let snap = MeanReversionSnapshot {
            price: 93.0,
            ema_fast: 99.0,
            macd_histogram: 0.2,
            imbalance: 0.5,
            ..base()
        };
        let d = strategy().decide(&snap);
        assert_eq!(d.side, Side::Short);
        // Bid-heavy book does not confirm a short.
        assert_eq!(d.confidence, dec!(0.7));
    }

    #[test]
    fn test_inside_bands_holds() {
        let d = strategy().decide(&base());
        assert_eq!(d.side, Side::Hold);
        assert_eq!(d.confidence, dec!(0.3));
    }

    // -- evaluate ------------------------------------------------------------

    #[test]
    fn test_breakout_from_flat_range() {
        let mut candles = trending_candles(90, 100.0, 0.0, 0.5);
        let last = candles[89];
        candles.push(Candle {
            timestamp: last.timestamp + 900,
            open: 100.0,
            high: 110.5,
            low: 109.5,
            close: 110.0,
            volume: 10.0,
        });

        let signal = strategy()
            .evaluate(&candles, &OrderBookSnapshot::empty(), Timeframe::M15)
            .unwrap();
        assert_eq!(signal.side, Side::Long);
        assert_eq!(signal.confidence, dec!(0.7));
        assert_eq!(signal.entry, dec!(110));
        assert_eq!(signal.sr_levels.r1, dec!(100.5));
        assert_eq!(
            signal.diagnostics,
            Diagnostics::MeanReversion {
                bb_position: BandPosition::Upper
            }
        );
    }

    #[test]
    fn test_insufficient_history() {
        let candles = trending_candles(20, 100.0, 0.0, 0.5);
        let err = strategy()
            .evaluate(&candles, &OrderBookSnapshot::empty(), Timeframe::M15)
            .unwrap_err();
        assert!(matches!(
            err,
            SignalError::InsufficientData {
                needed: 30,
                got: 20,
                ..
            }
        ));
    }
}
