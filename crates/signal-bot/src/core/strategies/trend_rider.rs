//! Trend-following rules for BTC.
//!
//! Trades with the EMA50/EMA200 trend when price is on the right side of VWAP,
//! RSI agrees, and price sits near (or beyond) a pivot or weekly level. Stops
//! are ATR offsets clamped by the nearest pivot.

use tracing::debug;

use crate::config::{OrderBookConfig, TrendRiderConfig};
use crate::constants::OSCILLATOR_DP;
use crate::core::fallback::Settle;
use crate::core::indicators::{self, IndicatorSet, NEUTRAL_OSCILLATOR};
use crate::core::position_sizing::PositionSizer;
use crate::core::sr_levels::{
    atr_tolerance, find_nearest_sr, is_near_level, pivot_points, weekly_high_low,
};
use crate::errors::SignalResult;
use crate::types::{
    Candle, Diagnostics, OrderBookSnapshot, PivotLevels, Side, Signal, Timeframe, WeeklyLevels,
};

use super::{book_confirmation, to_decimal, Decision, MarketContext, SignalDraft, SignalStrategy};

const NAME: &str = "Trend Rider";
const ATR_DP: u32 = 2;

/// Current values the rule table reads.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendSnapshot {
    pub price: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub vwap: f64,
    pub rsi: f64,
    pub atr: f64,
    pub pivots: PivotLevels,
    pub weekly: WeeklyLevels,
    pub imbalance: f64,
}

pub struct TrendRider {
    config: TrendRiderConfig,
    sizer: PositionSizer,
    book: OrderBookConfig,
}

impl TrendRider {
    pub fn new(config: TrendRiderConfig, sizer: PositionSizer, book: OrderBookConfig) -> Self {
        Self {
            config,
            sizer,
            book,
        }
    }

    pub fn snapshot(&self, ctx: &MarketContext) -> TrendSnapshot {
        let cfg = &self.config;
        let cols = &ctx.columns;
        let price = ctx.price;

        let mut set = IndicatorSet::new();
        set.insert("ema_fast", indicators::ema(&cols.closes, cfg.ema_fast));
        set.insert("ema_slow", indicators::ema(&cols.closes, cfg.ema_slow));
        set.insert("rsi", indicators::rsi(&cols.closes, cfg.rsi_period));
        set.insert(
            "atr",
            indicators::atr(&cols.highs, &cols.lows, &cols.closes, cfg.atr_period),
        );
        set.insert(
            "vwap",
            indicators::vwap(&cols.highs, &cols.lows, &cols.closes, &cols.volumes),
        );

        // Pivots come from the last completed bar, not the forming one.
        let prev = cols.len().saturating_sub(2);
        let pivots = pivot_points(cols.highs[prev], cols.lows[prev], cols.closes[prev])
            .settle("trend_rider.pivots");
        let weekly = weekly_high_low(
            &cols.highs,
            &cols.lows,
            cfg.weekly_window_bars.min(cols.len()),
        )
        .settle("trend_rider.weekly");

        TrendSnapshot {
            price,
            ema_fast: set.current("ema_fast", price),
            ema_slow: set.current("ema_slow", price),
            vwap: set.current("vwap", price),
            rsi: set.current("rsi", NEUTRAL_OSCILLATOR),
            atr: set.current("atr", price * cfg.default_atr_pct),
            pivots,
            weekly,
            imbalance: ctx.imbalance(),
        }
    }

    pub fn decide(&self, snap: &TrendSnapshot) -> Decision {
        let cfg = &self.config;
        let TrendSnapshot {
            price,
            atr,
            pivots,
            weekly,
            ..
        } = *snap;

        let near_atr = |level: f64, mult: f64| {
            is_near_level(price, level, atr_tolerance(atr * mult, level))
        };

        let long_trend =
            snap.ema_fast > snap.ema_slow && price > snap.vwap && snap.rsi > cfg.rsi_threshold;
        let long_level = near_atr(pivots.s1, 1.0)
            || near_atr(pivots.s2, 1.0)
            || near_atr(weekly.weekly_low, cfg.weekly_atr_mult)
            || price > pivots.s1;

        let short_trend = snap.ema_fast < snap.ema_slow
            && price < snap.vwap
            && snap.rsi < 100.0 - cfg.rsi_threshold;
        let short_level = near_atr(pivots.r1, 1.0)
            || near_atr(pivots.r2, 1.0)
            || near_atr(weekly.weekly_high, cfg.weekly_atr_mult)
            || price < pivots.r1;

        let side = if long_trend && long_level {
            Side::Long
        } else if short_trend && short_level {
            Side::Short
        } else {
            return Decision::hold(price, cfg.hold_offset_pct);
        };

        let stop = atr * cfg.stop_atr_mult;
        let target = atr * cfg.target_atr_mult;
        let (stop_loss, take_profit) = match side {
            Side::Long => (
                (pivots.s1 * (1.0 - cfg.pivot_buffer)).max(price - stop),
                pivots.r1.min(price + target),
            ),
            _ => (
                (pivots.r1 * (1.0 + cfg.pivot_buffer)).min(price + stop),
                pivots.s1.max(price - target),
            ),
        };

        Decision {
            side,
            confidence: cfg.base_confidence
                + book_confirmation(side, snap.imbalance, cfg.imbalance_threshold, cfg.book_bonus),
            stop_loss,
            take_profit,
        }
    }
}

impl SignalStrategy for TrendRider {
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
        debug!(
            symbol = %self.config.symbol,
            side = %decision.side,
            rsi = snap.rsi,
            atr = snap.atr,
            "trend rider evaluated"
        );

        let p = &snap.pivots;
        let nearest = find_nearest_sr(
            snap.price,
            &[p.s1, p.s2, p.s3, snap.weekly.weekly_low],
            &[p.r1, p.r2, p.r3, snap.weekly.weekly_high],
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
            diagnostics: Diagnostics::TrendRider {
                current_rsi: to_decimal(snap.rsi, OSCILLATOR_DP),
                current_atr: to_decimal(snap.atr, ATR_DP),
            },
        }
        .finish(&self.sizer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::strategies::fixtures::{book_around, trending_candles};
    use crate::errors::SignalError;
    use crate::types::PositionSize;
    use rust_decimal_macros::dec;

    fn rider() -> TrendRider {
        TrendRider::new(
            TrendRiderConfig::default(),
            PositionSizer::default(),
            OrderBookConfig::default(),
        )
    }

    fn bullish_snapshot() -> TrendSnapshot {
        TrendSnapshot {
            price: 101.0,
            ema_fast: 105.0,
            ema_slow: 100.0,
            vwap: 100.5,
            rsi: 60.0,
            atr: 1.0,
            pivots: pivot_points(102.0, 99.0, 100.2).unwrap(),
            weekly: WeeklyLevels {
                weekly_high: 110.0,
                weekly_low: 90.0,
            },
            imbalance: 0.0,
        }
    }

    // -- decide --------------------------------------------------------------

    #[test]
    fn test_long_near_s1() {
        // S1 = 98.8, within one ATR of 99.5.
        let snap = TrendSnapshot {
            price: 99.5,
            vwap: 99.0,
            ..bullish_snapshot()
        };
        let d = rider().decide(&snap);
        assert_eq!(d.side, Side::Long);
        assert!(d.confidence >= dec!(0.7));
        assert!(d.stop_loss < snap.price);
    }

    #[test]
    fn test_long_book_bonus() {
        let mut snap = bullish_snapshot();
        snap.imbalance = 0.25;
        let d = rider().decide(&snap);
        assert_eq!(d.confidence, dec!(0.8));
        snap.imbalance = -0.25;
        assert_eq!(rider().decide(&snap).confidence, dec!(0.7));
    }

    #[test]
    fn test_long_stops_clamped() {
        let snap = bullish_snapshot();
        let d = rider().decide(&snap);
        let expected_sl = (snap.pivots.s1 * 0.999).max(snap.price - snap.atr);
        let expected_tp = snap.pivots.r1.min(snap.price + 1.5 * snap.atr);
        assert!((d.stop_loss - expected_sl).abs() < 1e-9);
        assert!((d.take_profit - expected_tp).abs() < 1e-9);
    }

    #[test]
    fn test_short_mirror() {
        let snap = TrendSnapshot {
            price: 99.0,
            ema_fast: 95.0,
            ema_slow: 100.0,
            vwap: 99.5,
            rsi: 40.0,
            imbalance: -0.3,
            ..bullish_snapshot()
        };
        let d = rider().decide(&snap);
        assert_eq!(d.side, Side::Short);
        assert_eq!(d.confidence, dec!(0.8));
        assert!(d.stop_loss > snap.price);
        assert!(d.take_profit < snap.price);
    }

    #[test]
    fn test_mixed_trend_holds() {
        let snap = TrendSnapshot {
            rsi: 45.0,
            ..bullish_snapshot()
        };
        let d = rider().decide(&snap);
        assert_eq!(d.side, Side::Hold);
        assert_eq!(d.confidence, dec!(0.3));
        assert!((d.stop_loss - 101.0 * 0.98).abs() < 1e-9);
        assert!((d.take_profit - 101.0 * 1.02).abs() < 1e-9);
    }

    #[test]
    fn test_long_needs_level() {
        // Price below S1 and far from every level.
        let snap = TrendSnapshot {
            price: 80.0,
            vwap: 79.0,
            atr: 0.5,
            ..bullish_snapshot()
        };
        assert_eq!(rider().decide(&snap).side, Side::Hold);
    }

    #[test]
    fn test_weekly_low_uses_wider_atr_band() {
        // 1.2 ATR above the weekly low: outside one ATR, inside 1.5.
        let snap = TrendSnapshot {
            price: 91.2,
            vwap: 91.0,
            atr: 1.0,
            pivots: pivot_points(120.0, 100.0, 110.0).unwrap(),
            ..bullish_snapshot()
        };
        assert_eq!(rider().decide(&snap).side, Side::Long);
    }

    // -- evaluate ------------------------------------------------------------

    #[test]
    fn test_rising_market_goes_long() {
        let candles = trending_candles(250, 100.0, 1.0, 0.75);
        let signal = rider()
            .evaluate(&candles, &OrderBookSnapshot::empty(), Timeframe::M5)
            .unwrap();
        assert_eq!(signal.side, Side::Long);
        assert_eq!(signal.symbol, "BTC-USDT");
        assert_eq!(signal.strategy_name, "Trend Rider");
        assert_eq!(signal.timeframe, Timeframe::M5);
        assert!(signal.stop_loss < signal.entry);
        assert_eq!(signal.confidence, dec!(0.7));
        assert!(signal.position.quantity > dec!(0));
        assert_eq!(signal.as_of, candles[249].timestamp);
        match signal.diagnostics {
            Diagnostics::TrendRider { current_rsi, .. } => assert_eq!(current_rsi, dec!(100.0)),
            other => panic!("unexpected diagnostics: {other:?}"),
        }
    }

    #[test]
    fn test_falling_market_with_ask_pressure_goes_short() {
        let candles = trending_candles(250, 400.0, -1.0, 0.75);
        let book = book_around(151.0, 1.0, 5.0);
        let signal = rider().evaluate(&candles, &book, Timeframe::M5).unwrap();
        assert_eq!(signal.side, Side::Short);
        assert_eq!(signal.confidence, dec!(0.8));
        assert!(signal.stop_loss > signal.entry);
    }

    #[test]
    fn test_insufficient_history() {
        let candles = trending_candles(150, 100.0, 1.0, 0.75);
        let err = rider()
            .evaluate(&candles, &OrderBookSnapshot::empty(), Timeframe::M5)
            .unwrap_err();
        assert!(matches!(
            err,
            SignalError::InsufficientData {
                needed: 200,
                got: 150,
                ..
            }
        ));
    }

    #[test]
    fn test_flat_market_holds_with_zero_size() {
        let candles = trending_candles(200, 100.0, 0.0, 0.5);
        let signal = rider()
            .evaluate(&candles, &OrderBookSnapshot::empty(), Timeframe::M5)
            .unwrap();
        assert_eq!(signal.side, Side::Hold);
        assert_eq!(signal.position, PositionSize::ZERO);
        assert_eq!(signal.entry, dec!(100));
        assert_eq!(signal.stop_loss, dec!(98));
        assert_eq!(signal.take_profit, dec!(102));
    }
}
