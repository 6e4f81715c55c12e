//! Per-asset signal strategies.
//!
//! Each strategy turns one candle window plus one order-book snapshot into a
//! [`Signal`] in three pure steps: build a snapshot of current indicator and
//! level values, decide side / confidence / stops from that snapshot, then
//! assemble the rounded, sized signal. Keeping `decide` separate from the
//! indicator math lets the rule tables be tested with exact inputs.

mod mean_reversion;
mod momentum_scalper;
mod trend_rider;

pub use mean_reversion::{MeanReversionBreakout, MeanReversionSnapshot};
pub use momentum_scalper::{MomentumScalper, ScalperSnapshot};
pub use trend_rider::{TrendRider, TrendSnapshot};

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::config::{OrderBookConfig, StrategiesConfig};
use crate::constants::{CONFIDENCE_DP, HOLD_CONFIDENCE, MAX_CONFIDENCE};
use crate::errors::{SignalError, SignalResult};
use crate::types::{
    BookSummary, Candle, CandleColumns, Diagnostics, NearestLevels, OrderBookSnapshot,
    PivotLevels, PositionSize, Side, Signal, SrSummary, Timeframe,
};

use super::orderbook::{self, BookAnalysis};
use super::position_sizing::PositionSizer;

/// Decimal places on reported book imbalance / pressure.
const BOOK_DP: u32 = 3;

// ═══════════════════════════════════════════════════════════════════════════
// Strategy trait
// ═══════════════════════════════════════════════════════════════════════════

/// A rule set bound to one symbol.
pub trait SignalStrategy: Send + Sync {
    /// Human-readable strategy name reported on every signal.
    fn name(&self) -> &str;

    fn symbol(&self) -> &str;

    fn default_timeframe(&self) -> Timeframe;

    /// Candles to request from the data source.
    fn candle_count(&self) -> usize;

    /// Fewer candles than this yields [`SignalError::InsufficientData`].
    fn min_candles(&self) -> usize;

    /// Evaluate the rules over `candles` (oldest first) and `book`.
    fn evaluate(
        &self,
        candles: &[Candle],
        book: &OrderBookSnapshot,
        timeframe: Timeframe,
    ) -> SignalResult<Signal>;
}

/// Build every enabled strategy from config.
pub fn build_strategies(config: &StrategiesConfig) -> Vec<Box<dyn SignalStrategy>> {
    let sizer = PositionSizer::new(config.sizing.clone());
    let mut out: Vec<Box<dyn SignalStrategy>> = Vec::new();
    if config.trend_rider.enabled {
        out.push(Box::new(TrendRider::new(
            config.trend_rider.clone(),
            sizer.clone(),
            config.orderbook.clone(),
        )));
    }
    if config.mean_reversion.enabled {
        out.push(Box::new(MeanReversionBreakout::new(
            config.mean_reversion.clone(),
            sizer.clone(),
            config.orderbook.clone(),
        )));
    }
    if config.momentum_scalper.enabled {
        out.push(Box::new(MomentumScalper::new(
            config.momentum_scalper.clone(),
            sizer,
            config.orderbook.clone(),
        )));
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════════
// Shared evaluation pieces
// ═══════════════════════════════════════════════════════════════════════════

/// Inputs common to every strategy, derived once per evaluation.
#[derive(Debug, Clone)]
pub struct MarketContext {
    pub columns: CandleColumns,
    pub price: f64,
    /// Open time of the last candle.
    pub as_of: i64,
    pub book: BookAnalysis,
}

impl MarketContext {
    /// Validate history length and derive columns and book analysis.
    pub fn prepare(
        symbol: &str,
        candles: &[Candle],
        book: &OrderBookSnapshot,
        min_candles: usize,
        book_config: &OrderBookConfig,
    ) -> SignalResult<Self> {
        let Some(last) = candles.last() else {
            return Err(SignalError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "no candles".into(),
            });
        };
        if candles.len() < min_candles {
            return Err(SignalError::InsufficientData {
                symbol: symbol.to_string(),
                needed: min_candles,
                got: candles.len(),
            });
        }
        if !last.close.is_finite() || last.close <= 0.0 {
            return Err(SignalError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: format!("invalid last close {}", last.close),
            });
        }

        Ok(Self {
            columns: CandleColumns::from_candles(candles),
            price: last.close,
            as_of: last.timestamp,
            book: orderbook::analyze(
                book,
                book_config.wall_multiplier,
                book_config.pressure_levels,
            ),
        })
    }

    pub fn imbalance(&self) -> f64 {
        self.book.metrics.imbalance
    }
}

/// Outcome of a strategy's rule table.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub side: Side,
    pub confidence: Decimal,
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl Decision {
    /// HOLD with symmetric placeholder stops `offset_pct` around `price`.
    pub fn hold(price: f64, offset_pct: f64) -> Self {
        Self {
            side: Side::Hold,
            confidence: HOLD_CONFIDENCE,
            stop_loss: price * (1.0 - offset_pct),
            take_profit: price * (1.0 + offset_pct),
        }
    }
}

/// `bonus` when `imbalance` confirms `side` beyond `threshold`, else zero.
pub fn book_confirmation(side: Side, imbalance: f64, threshold: f64, bonus: Decimal) -> Decimal {
    let confirmed = match side {
        Side::Long => imbalance > threshold,
        Side::Short => imbalance < -threshold,
        Side::Hold => false,
    };
    if confirmed {
        bonus
    } else {
        Decimal::ZERO
    }
}

/// `f64` → `Decimal` rounded to `dp`; undefined values become zero.
pub fn to_decimal(value: f64, dp: u32) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default().round_dp(dp)
}

/// Everything needed to assemble a [`Signal`].
pub struct SignalDraft<'a> {
    pub symbol: &'a str,
    pub strategy_name: &'a str,
    pub timeframe: Timeframe,
    pub price_precision: u32,
    pub ctx: &'a MarketContext,
    pub decision: Decision,
    pub pivots: &'a PivotLevels,
    pub nearest: NearestLevels,
    pub diagnostics: Diagnostics,
}

impl SignalDraft<'_> {
    /// Round prices, cap confidence and size the position.
    pub fn finish(self, sizer: &PositionSizer) -> Signal {
        let dp = self.price_precision;
        let entry = to_decimal(self.ctx.price, dp);
        let stop_loss = to_decimal(self.decision.stop_loss, dp);
        let take_profit = to_decimal(self.decision.take_profit, dp);

        let position = if self.decision.side == Side::Hold {
            PositionSize::ZERO
        } else {
            sizer.size(entry, stop_loss)
        };

        let metrics = &self.ctx.book.metrics;
        let walls = &self.ctx.book.walls;
        let book = BookSummary {
            imbalance: to_decimal(metrics.imbalance, BOOK_DP),
            pressure: to_decimal(self.ctx.book.pressure, BOOK_DP),
            bid_wall: walls.bid_walls.first().map(|w| to_decimal(w.price, dp)),
            ask_wall: walls.ask_walls.first().map(|w| to_decimal(w.price, dp)),
        };

        Signal {
            symbol: self.symbol.to_string(),
            timeframe: self.timeframe,
            side: self.decision.side,
            entry,
            stop_loss,
            take_profit,
            position,
            sr_levels: SrSummary {
                s1: to_decimal(self.pivots.s1, dp),
                s2: to_decimal(self.pivots.s2, dp),
                r1: to_decimal(self.pivots.r1, dp),
                r2: to_decimal(self.pivots.r2, dp),
                nearest_support: to_decimal(self.nearest.support, dp),
                nearest_resistance: to_decimal(self.nearest.resistance, dp),
            },
            orderbook_bias: metrics.bias,
            book,
            confidence: self
                .decision
                .confidence
                .min(MAX_CONFIDENCE)
                .round_dp(CONFIDENCE_DP),
            strategy_name: self.strategy_name.to_string(),
            diagnostics: self.diagnostics,
            as_of: self.ctx.as_of,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Test fixtures
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::types::{Candle, OrderBookSnapshot};

    /// `n` candles whose close moves by `step` per bar from `start`; the bar
    /// range is ±`half_range` around the close.
    pub fn trending_candles(n: usize, start: f64, step: f64, half_range: f64) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let close = start + step * i as f64;
                Candle {
                    timestamp: 1_700_000_000 + 60 * i as i64,
                    open: close - step,
                    high: close + half_range,
                    low: close - half_range,
                    close,
                    volume: 10.0,
                }
            })
            .collect()
    }

    /// Book with `bid_size` resting on the bid and `ask_size` on the ask.
    pub fn book_around(price: f64, bid_size: f64, ask_size: f64) -> OrderBookSnapshot {
        OrderBookSnapshot {
            bids: vec![(price - 0.5, bid_size)],
            asks: vec![(price + 0.5, ask_size)],
            sequence_id: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_book_confirmation_direction() {
        assert_eq!(book_confirmation(Side::Long, 0.2, 0.1, dec!(0.1)), dec!(0.1));
        assert_eq!(book_confirmation(Side::Long, -0.2, 0.1, dec!(0.1)), dec!(0));
        assert_eq!(book_confirmation(Side::Short, -0.2, 0.1, dec!(0.1)), dec!(0.1));
        assert_eq!(book_confirmation(Side::Hold, 0.9, 0.1, dec!(0.1)), dec!(0));
    }

    #[test]
    fn test_to_decimal_rounds_and_handles_nan() {
        assert_eq!(to_decimal(101.23456, 2), dec!(101.23));
        assert_eq!(to_decimal(f64::NAN, 2), Decimal::ZERO);
    }

    #[test]
    fn test_hold_decision() {
        let d = Decision::hold(100.0, 0.02);
        assert_eq!(d.side, Side::Hold);
        assert_eq!(d.confidence, dec!(0.3));
        assert!((d.stop_loss - 98.0).abs() < 1e-9);
        assert!((d.take_profit - 102.0).abs() < 1e-9);
    }

    #[test]
    fn test_prepare_rejects_empty_and_short() {
        let cfg = OrderBookConfig::default();
        let book = OrderBookSnapshot::empty();
        let err = MarketContext::prepare("BTC-USDT", &[], &book, 10, &cfg).unwrap_err();
        assert!(matches!(err, SignalError::DataUnavailable { .. }));

        let candles = fixtures::trending_candles(5, 100.0, 1.0, 0.5);
        let err = MarketContext::prepare("BTC-USDT", &candles, &book, 10, &cfg).unwrap_err();
        assert!(matches!(
            err,
            SignalError::InsufficientData { needed: 10, got: 5, .. }
        ));
    }

    #[test]
    fn test_prepare_context() {
        let candles = fixtures::trending_candles(12, 100.0, 1.0, 0.5);
        let book = fixtures::book_around(111.0, 3.0, 1.0);
        let ctx =
            MarketContext::prepare("X", &candles, &book, 10, &OrderBookConfig::default()).unwrap();
        assert_eq!(ctx.price, 111.0);
        assert_eq!(ctx.as_of, candles[11].timestamp);
        assert_eq!(ctx.columns.len(), 12);
        assert!((ctx.imbalance() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_build_strategies_respects_enabled() {
        let mut cfg = StrategiesConfig::default();
        assert_eq!(build_strategies(&cfg).len(), 3);
        cfg.mean_reversion.enabled = false;
        let symbols: Vec<String> = build_strategies(&cfg)
            .iter()
            .map(|s| s.symbol().to_string())
            .collect();
        assert_eq!(symbols, vec!["BTC-USDT", "SOL-USDT"]);
    }
}
