//! Short-horizon momentum rules for SOL.

use tracing::debug;

use crate::config::{MomentumScalperConfig, OrderBookConfig};
use crate::constants::OSCILLATOR_DP;
use crate::core::fallback::{safe_nth_back, Settle};
use crate::core::indicators::{self, IndicatorSet, NEUTRAL_OSCILLATOR};
use crate::core::position_sizing::PositionSizer;
use crate::core::sr_levels::{
    find_nearest_sr, is_near_level, pivot_points, vwap_bands, weekly_high_low,
};
use crate::errors::SignalResult;
use crate::types::{
    Candle, Diagnostics, ObvTrend, OrderBookSnapshot, PivotLevels, Side, Signal, Timeframe,
    VwapBands,
};

use super::{book_confirmation, to_decimal, Decision, MarketContext, SignalDraft, SignalStrategy};

const NAME: &str = "Scalper Momentum";

#[derive(Debug, Clone, PartialEq)]
pub struct ScalperSnapshot {
    pub price: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub stoch_k: f64,
    pub vwap: f64,
    pub vwap_bands: VwapBands,
    pub obv_trend: ObvTrend,
    pub session_high: f64,
    pub session_low: f64,
    pub pivots: PivotLevels,
    pub imbalance: f64,
}

/// Rising when the latest OBV exceeds the value two bars earlier.
pub fn obv_trend(obv: &[f64]) -> ObvTrend {
    if obv.len() >= 3 && safe_nth_back(obv, 0, 0.0) > safe_nth_back(obv, 2, 0.0) {
        ObvTrend::Rising
    } else {
        ObvTrend::Falling
    }
}

pub struct MomentumScalper {
    config: MomentumScalperConfig,
    sizer: PositionSizer,
    book: OrderBookConfig,
}

impl MomentumScalper {
    pub fn new(config: MomentumScalperConfig, sizer: PositionSizer, book: OrderBookConfig) -> Self {
        Self {
            config,
            sizer,
            book,
        }
    }

    pub fn snapshot(&self, ctx: &MarketContext) -> ScalperSnapshot {
        let cfg = &self.config;
        let cols = &ctx.columns;
        let price = ctx.price;

        let stoch =
            indicators::stochastic_rsi(&cols.closes, cfg.stoch_period, cfg.stoch_k, cfg.stoch_d)
                .settle("momentum_scalper.stoch_rsi");

        let mut set = IndicatorSet::new();
        set.insert("ema_fast", indicators::ema(&cols.closes, cfg.ema_fast));
        set.insert("ema_slow", indicators::ema(&cols.closes, cfg.ema_slow));
        set.insert("stoch_k", Ok(stoch.k));
        set.insert("obv", indicators::obv(&cols.closes, &cols.volumes));
        set.insert(
            "vwap",
            indicators::vwap(&cols.highs, &cols.lows, &cols.closes, &cols.volumes),
        );

        let session = weekly_high_low(&cols.highs, &cols.lows, cfg.session_bars.min(cols.len()))
            .settle("momentum_scalper.session");
        let bands = vwap_bands(set.series("vwap"), cfg.vwap_band_period, cfg.vwap_band_mult)
            .settle("momentum_scalper.vwap_bands");
        let prev = cols.len().saturating_sub(2);
        let pivots = pivot_points(cols.highs[prev], cols.lows[prev], cols.closes[prev])
            .settle("momentum_scalper.pivots");

        ScalperSnapshot {
            price,
            ema_fast: set.current("ema_fast", price),
            ema_slow: set.current("ema_slow", price),
            stoch_k: set.current("stoch_k", NEUTRAL_OSCILLATOR),
            vwap: set.current("vwap", price),
            vwap_bands: bands,
            obv_trend: obv_trend(set.series("obv")),
            session_high: session.weekly_high,
            session_low: session.weekly_low,
            pivots,
            imbalance: ctx.imbalance(),
        }
    }

    pub fn decide(&self, snap: &ScalperSnapshot) -> Decision {
        let cfg = &self.config;
        let p = snap.price;

        let side = if snap.ema_fast > snap.ema_slow
            && snap.stoch_k < cfg.oversold
            && p > snap.vwap
            && snap.obv_trend == ObvTrend::Rising
        {
            let holding = is_near_level(p, snap.session_low, cfg.session_tolerance)
                || is_near_level(p, snap.vwap_bands.lower, cfg.band_tolerance)
                || p > snap.pivots.s1;
            holding.then_some(Side::Long)
        } else if snap.ema_fast < snap.ema_slow
            && snap.stoch_k > cfg.overbought
            && p < snap.vwap
            && snap.obv_trend == ObvTrend::Falling
        {
            let rejecting = is_near_level(p, snap.session_high, cfg.session_tolerance)
                || is_near_level(p, snap.vwap_bands.upper, cfg.band_tolerance)
                || p < snap.pivots.r1;
            rejecting.then_some(Side::Short)
        } else {
            None
        };

        let Some(side) = side else {
            return Decision::hold(p, cfg.hold_offset_pct);
        };
        let (stop_loss, take_profit) = match side {
            Side::Long => (p * (1.0 - cfg.stop_pct), p * (1.0 + cfg.target_pct)),
            _ => (p * (1.0 + cfg.stop_pct), p * (1.0 - cfg.target_pct)),
        };

        Decision {
            side,
            confidence: cfg.base_confidence
                + cfg.signal_bonus
                + book_confirmation(side, snap.imbalance, cfg.imbalance_threshold, cfg.book_bonus),
            stop_loss,
            take_profit,
        }
    }
}

impl SignalStrategy for MomentumScalper {
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
            stoch_k = snap.stoch_k,
            obv_trend = ?snap.obv_trend,
            "momentum scalper evaluated"
        );

        let dp = self.config.price_precision;
        let p = &snap.pivots;
        let nearest = find_nearest_sr(
            snap.price,
            &[p.s1, p.s2, snap.session_low, snap.vwap_bands.lower],
            &[p.r1, p.r2, snap.session_high, snap.vwap_bands.upper],
            p,
        );

        Ok(SignalDraft {
            symbol: &self.config.symbol,
            strategy_name: NAME,
            timeframe,
            price_precision: dp,
            ctx: &ctx,
            decision,
            pivots: p,
            nearest,
            diagnostics: Diagnostics::Scalper {
                stoch_rsi: to_decimal(snap.stoch_k, OSCILLATOR_DP),
                obv_trend: snap.obv_trend,
                session_high: to_decimal(snap.session_high, dp),
                session_low: to_decimal(snap.session_low, dp),
            },
        }
        .finish(&self.sizer))
    }
}
