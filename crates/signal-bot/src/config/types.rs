use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::types::Timeframe;

// ---------------------------------------------------------------------------
// Top-level aggregate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignalBotConfig {
    pub app: AppConfig,
    pub strategies: StrategiesConfig,
}

// ---------------------------------------------------------------------------
// app.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub data_source: DataSourceConfig,
    pub run: RunConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_dir: String,
    pub file_name: String,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".into(),
            file_name: "signal-bot.log".into(),
            default_filter: "signal_bot=info,warn".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataSourceConfig {
    pub base_url: String,
    pub request_timeout_ms: u64,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.kucoin.com".into(),
            request_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Seconds between evaluation passes; `0` runs a single pass and exits.
    pub refresh_interval_seconds: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            refresh_interval_seconds: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// strategies.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StrategiesConfig {
    pub sizing: SizingConfig,
    pub orderbook: OrderBookConfig,
    pub trend_rider: TrendRiderConfig,
    pub mean_reversion: MeanReversionConfig,
    pub momentum_scalper: MomentumScalperConfig,
}

/// Fixed-fractional risk sizing shared by every strategy.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    #[serde(with = "rust_decimal::serde::str")]
    pub account_balance: Decimal,
    /// Fraction of balance lost if the stop is hit (0.01 = 1%).
    #[serde(with = "rust_decimal::serde::str")]
    pub risk_pct: Decimal,
    /// Notional cap as a fraction of balance.
    #[serde(with = "rust_decimal::serde::str")]
    pub max_notional_pct: Decimal,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            account_balance: dec!(10000),
            risk_pct: dec!(0.01),
            max_notional_pct: dec!(0.30),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrderBookConfig {
    pub wall_multiplier: f64,
    pub pressure_levels: usize,
}

impl Default for OrderBookConfig {
    fn default() -> Self {
        Self {
            wall_multiplier: 3.0,
            pressure_levels: 5,
        }
    }
}

/// Trend-following rules for BTC.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrendRiderConfig {
    pub enabled: bool,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub candle_count: usize,
    pub min_candles: usize,
    pub price_precision: u32,

    pub ema_fast: usize,
    pub ema_slow: usize,
    pub rsi_period: usize,
    pub atr_period: usize,
    /// Trailing bars for the "weekly" high/low. Not derived from the
    /// timeframe; see `Timeframe::bars_per_week`.
    pub weekly_window_bars: usize,

    pub rsi_threshold: f64,
    /// Weekly levels count as touched within this many ATRs.
    pub weekly_atr_mult: f64,
    pub imbalance_threshold: f64,
    /// Fallback ATR as a fraction of price when ATR is undefined.
    pub default_atr_pct: f64,

    pub stop_atr_mult: f64,
    pub target_atr_mult: f64,
    /// Stop is kept this fraction beyond the pivot it is clamped to.
    pub pivot_buffer: f64,
    pub hold_offset_pct: f64,

    #[serde(with = "rust_decimal::serde::str")]
    pub base_confidence: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub book_bonus: Decimal,
}

impl Default for TrendRiderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            symbol: "BTC-USDT".into(),
            timeframe: Timeframe::M5,
            candle_count: 200,
            min_candles: 200,
            price_precision: 2,
            ema_fast: 50,
            ema_slow: 200,
            rsi_period: 14,
            atr_period: 14,
            weekly_window_bars: 168,
            rsi_threshold: 50.0,
            weekly_atr_mult: 1.5,
            imbalance_threshold: 0.1,
            default_atr_pct: 0.02,
            stop_atr_mult: 1.0,
            target_atr_mult: 1.5,
            pivot_buffer: 0.001,
            hold_offset_pct: 0.02,
            base_confidence: dec!(0.7),
            book_bonus: dec!(0.1),
        }
    }
}

/// Bollinger mean-reversion / breakout rules for ETH.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MeanReversionConfig {
    pub enabled: bool,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub candle_count: usize,
    pub min_candles: usize,
    pub price_precision: u32,

    pub bb_period: usize,
    pub bb_std: f64,
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,

    /// Pivot proximity, fraction of level.
    pub level_tolerance: f64,
    pub imbalance_threshold: f64,
    /// Bars used for the average-range stop estimate.
    pub range_bars: usize,
    pub band_buffer: f64,
    pub hold_offset_pct: f64,

    #[serde(with = "rust_decimal::serde::str")]
    pub base_confidence: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub reversion_bonus: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub breakout_bonus: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub book_bonus: Decimal,
}

impl Default for MeanReversionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            symbol: "ETH-USDT".into(),
            timeframe: Timeframe::M15,
            candle_count: 100,
            min_candles: 30,
            price_precision: 2,
            bb_period: 20,
            bb_std: 2.0,
            ema_fast: 20,
            ema_slow: 50,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            level_tolerance: 0.01,
            imbalance_threshold: 0.1,
            range_bars: 20,
            band_buffer: 0.005,
            hold_offset_pct: 0.02,
            base_confidence: dec!(0.5),
            reversion_bonus: dec!(0.25),
            breakout_bonus: dec!(0.2),
            book_bonus: dec!(0.15),
        }
    }
}

/// Short-horizon momentum rules for SOL.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MomentumScalperConfig {
    pub enabled: bool,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub candle_count: usize,
    pub min_candles: usize,
    pub price_precision: u32,

    pub ema_fast: usize,
    pub ema_slow: usize,
    pub stoch_period: usize,
    pub stoch_k: usize,
    pub stoch_d: usize,
    pub session_bars: usize,
    pub vwap_band_period: usize,
    pub vwap_band_mult: f64,

    pub oversold: f64,
    pub overbought: f64,
    pub session_tolerance: f64,
    pub band_tolerance: f64,
    pub imbalance_threshold: f64,

    pub stop_pct: f64,
    pub target_pct: f64,
    pub hold_offset_pct: f64,

    #[serde(with = "rust_decimal::serde::str")]
    pub base_confidence: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub signal_bonus: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub book_bonus: Decimal,
}

impl Default for MomentumScalperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            symbol: "SOL-USDT".into(),
            timeframe: Timeframe::M1,
            candle_count: 100,
            min_candles: 25,
            price_precision: 3,
            ema_fast: 9,
            ema_slow: 21,
            stoch_period: 14,
            stoch_k: 3,
            stoch_d: 3,
            session_bars: 60,
            vwap_band_period: 20,
            vwap_band_mult: 1.0,
            oversold: 30.0,
            overbought: 70.0,
            session_tolerance: 0.01,
            band_tolerance: 0.005,
            imbalance_threshold: 0.15,
            stop_pct: 0.0035,
            target_pct: 0.006,
            hold_offset_pct: 0.01,
            base_confidence: dec!(0.5),
            signal_bonus: dec!(0.3),
            book_bonus: dec!(0.2),
        }
    }
}
