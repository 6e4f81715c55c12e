use anyhow::{bail, Result};
use rust_decimal::Decimal;
use tracing::warn;

use super::types::{
    MeanReversionConfig, MomentumScalperConfig, SignalBotConfig, TrendRiderConfig,
};
use crate::constants::MAX_CONFIDENCE;

/// Validate invariants across the merged config that serde alone cannot enforce.
///
/// Every violation is collected and reported in one error. Called
/// automatically by [`super::load_config`].
pub fn validate_config(config: &SignalBotConfig) -> Result<()> {
    let mut errors: Vec<String> = Vec::new();

    validate_app_config(config, &mut errors);
    validate_sizing_config(config, &mut errors);
    validate_orderbook_config(config, &mut errors);
    validate_trend_rider(&config.strategies.trend_rider, &mut errors);
    validate_mean_reversion(&config.strategies.mean_reversion, &mut errors);
    validate_momentum_scalper(&config.strategies.momentum_scalper, &mut errors);
    validate_unique_symbols(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        let msg = format!(
            "Configuration validation failed ({} error{}):\n  - {}",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" },
            errors.join("\n  - ")
        );
        bail!("{msg}");
    }
}

// ---------------------------------------------------------------------------
// App config
// ---------------------------------------------------------------------------

fn validate_app_config(config: &SignalBotConfig, errors: &mut Vec<String>) {
    let ds = &config.app.data_source;

    if !(ds.base_url.starts_with("http://") || ds.base_url.starts_with("https://")) {
        errors.push(format!(
            "app.data_source.base_url: '{}' must start with http:// or https://",
            ds.base_url
        ));
    }
    if ds.request_timeout_ms == 0 {
        errors.push("app.data_source.request_timeout_ms must be > 0".into());
    }
    if config.app.logging.file_name.is_empty() {
        errors.push("app.logging.file_name is empty".into());
    }
}

// ---------------------------------------------------------------------------
// Sizing / order book
// ---------------------------------------------------------------------------

fn validate_sizing_config(config: &SignalBotConfig, errors: &mut Vec<String>) {
    let sizing = &config.strategies.sizing;

    if sizing.account_balance <= Decimal::ZERO {
        errors.push(format!(
            "sizing: account_balance ({}) must be > 0",
            sizing.account_balance
        ));
    }
    if sizing.risk_pct <= Decimal::ZERO || sizing.risk_pct > Decimal::ONE {
        errors.push(format!(
            "sizing: risk_pct ({}) must be in (0, 1]",
            sizing.risk_pct
        ));
    }
    if sizing.max_notional_pct <= Decimal::ZERO {
        errors.push(format!(
            "sizing: max_notional_pct ({}) must be > 0",
            sizing.max_notional_pct
        ));
    }
}

fn validate_orderbook_config(config: &SignalBotConfig, errors: &mut Vec<String>) {
    let book = &config.strategies.orderbook;

    if !(book.wall_multiplier.is_finite() && book.wall_multiplier > 0.0) {
        errors.push(format!(
            "orderbook: wall_multiplier ({}) must be > 0",
            book.wall_multiplier
        ));
    }
    if book.pressure_levels == 0 {
        errors.push("orderbook: pressure_levels must be > 0".into());
    }
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Checks every strategy shares: history bounds, periods, confidence.
fn validate_common(
    name: &str,
    symbol: &str,
    candle_count: usize,
    min_candles: usize,
    base_confidence: Decimal,
    errors: &mut Vec<String>,
) {
    if symbol.is_empty() {
        errors.push(format!("{name}: symbol is empty"));
    }
    if min_candles == 0 {
        errors.push(format!("{name}: min_candles must be > 0"));
    }
    if candle_count < min_candles {
        errors.push(format!(
            "{name}: candle_count ({candle_count}) must be >= min_candles ({min_candles})"
        ));
    }
    if candle_count > crate::constants::KUCOIN_MAX_CANDLES {
        errors.push(format!(
            "{name}: candle_count ({candle_count}) exceeds the exchange limit ({})",
            crate::constants::KUCOIN_MAX_CANDLES
        ));
    }
    if base_confidence < Decimal::ZERO || base_confidence > MAX_CONFIDENCE {
        errors.push(format!(
            "{name}: base_confidence ({base_confidence}) must be in [0, {MAX_CONFIDENCE}]"
        ));
    }
}

fn require_positive(name: &str, fields: &[(&str, usize)], errors: &mut Vec<String>) {
    for (field, value) in fields {
        if *value == 0 {
            errors.push(format!("{name}: {field} must be > 0"));
        }
    }
}

fn require_fraction(name: &str, fields: &[(&str, f64)], errors: &mut Vec<String>) {
    for (field, value) in fields {
        if !(value.is_finite() && *value >= 0.0 && *value < 1.0) {
            errors.push(format!("{name}: {field} ({value}) must be in [0, 1)"));
        }
    }
}

fn validate_trend_rider(cfg: &TrendRiderConfig, errors: &mut Vec<String>) {
    let name = "trend_rider";
    validate_common(
        name,
        &cfg.symbol,
        cfg.candle_count,
        cfg.min_candles,
        cfg.base_confidence,
        errors,
    );
    require_positive(
        name,
        &[
            ("ema_fast", cfg.ema_fast),
            ("ema_slow", cfg.ema_slow),
            ("rsi_period", cfg.rsi_period),
            ("atr_period", cfg.atr_period),
            ("weekly_window_bars", cfg.weekly_window_bars),
        ],
        errors,
    );
    require_fraction(
        name,
        &[
            ("imbalance_threshold", cfg.imbalance_threshold),
            ("default_atr_pct", cfg.default_atr_pct),
            ("pivot_buffer", cfg.pivot_buffer),
            ("hold_offset_pct", cfg.hold_offset_pct),
        ],
        errors,
    );
    if cfg.ema_fast >= cfg.ema_slow {
        errors.push(format!(
            "{name}: ema_fast ({}) must be < ema_slow ({})",
            cfg.ema_fast, cfg.ema_slow
        ));
    }
    if !(0.0..=100.0).contains(&cfg.rsi_threshold) {
        errors.push(format!(
            "{name}: rsi_threshold ({}) must be in [0, 100]",
            cfg.rsi_threshold
        ));
    }

    let week = cfg.timeframe.bars_per_week();
    if cfg.weekly_window_bars != week {
        warn!(
            weekly_window_bars = cfg.weekly_window_bars,
            timeframe = %cfg.timeframe,
            bars_per_week = week,
            "trend_rider weekly window does not span a calendar week"
        );
    }
}

fn validate_mean_reversion(cfg: &MeanReversionConfig, errors: &mut Vec<String>) {
    let name = "mean_reversion";
    validate_common(
        name,
        &cfg.symbol,
        cfg.candle_count,
        cfg.min_candles,
        cfg.base_confidence,
        errors,
    );
    require_positive(
        name,
        &[
            ("bb_period", cfg.bb_period),
            ("ema_fast", cfg.ema_fast),
            ("ema_slow", cfg.ema_slow),
            ("macd_fast", cfg.macd_fast),
            ("macd_slow", cfg.macd_slow),
            ("macd_signal", cfg.macd_signal),
            ("range_bars", cfg.range_bars),
        ],
        errors,
    );
    require_fraction(
        name,
        &[
            ("level_tolerance", cfg.level_tolerance),
            ("imbalance_threshold", cfg.imbalance_threshold),
            ("band_buffer", cfg.band_buffer),
            ("hold_offset_pct", cfg.hold_offset_pct),
        ],
        errors,
    );
    if cfg.macd_fast >= cfg.macd_slow {
        errors.push(format!(
            "{name}: macd_fast ({}) must be < macd_slow ({})",
            cfg.macd_fast, cfg.macd_slow
        ));
    }
    if !(cfg.bb_std.is_finite() && cfg.bb_std > 0.0) {
        errors.push(format!("{name}: bb_std ({}) must be > 0", cfg.bb_std));
    }
}

fn validate_momentum_scalper(cfg: &MomentumScalperConfig, errors: &mut Vec<String>) {
    let name = "momentum_scalper";
    validate_common(
        name,
        &cfg.symbol,
        cfg.candle_count,
        cfg.min_candles,
        cfg.base_confidence,
        errors,
    );
    require_positive(
        name,
        &[
            ("ema_fast", cfg.ema_fast),
            ("ema_slow", cfg.ema_slow),
            ("stoch_period", cfg.stoch_period),
            ("stoch_k", cfg.stoch_k),
            ("stoch_d", cfg.stoch_d),
            ("session_bars", cfg.session_bars),
            ("vwap_band_period", cfg.vwap_band_period),
        ],
        errors,
    );
    require_fraction(
        name,
        &[
            ("session_tolerance", cfg.session_tolerance),
            ("band_tolerance", cfg.band_tolerance),
            ("imbalance_threshold", cfg.imbalance_threshold),
            ("stop_pct", cfg.stop_pct),
            ("target_pct", cfg.target_pct),
            ("hold_offset_pct", cfg.hold_offset_pct),
        ],
        errors,
    );
    if cfg.oversold >= cfg.overbought {
        errors.push(format!(
            "{name}: oversold ({}) must be < overbought ({})",
            cfg.oversold, cfg.overbought
        ));
    }
}

fn validate_unique_symbols(config: &SignalBotConfig, errors: &mut Vec<String>) {
    let s = &config.strategies;
    let mut enabled: Vec<&str> = Vec::new();
    if s.trend_rider.enabled {
        enabled.push(&s.trend_rider.symbol);
    }
    if s.mean_reversion.enabled {
        enabled.push(&s.mean_reversion.symbol);
    }
    if s.momentum_scalper.enabled {
        enabled.push(&s.momentum_scalper.symbol);
    }
    enabled.sort_unstable();
    for pair in enabled.windows(2) {
        if pair[0] == pair[1] {
            errors.push(format!(
                "strategies: symbol {} is assigned to more than one enabled strategy",
                pair[0]
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&SignalBotConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = SignalBotConfig::default();
        config.strategies.sizing.account_balance = dec!(0);
        config.strategies.trend_rider.ema_fast = 300;
        config.strategies.momentum_scalper.oversold = 80.0;

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("3 errors"), "got: {err}");
        assert!(err.contains("account_balance"));
        assert!(err.contains("ema_fast (300) must be < ema_slow (200)"));
        assert!(err.contains("oversold"));
    }

    #[test]
    fn test_single_error_wording() {
        let mut config = SignalBotConfig::default();
        config.app.data_source.base_url = "api.kucoin.com".into();
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("(1 error)"), "got: {err}");
        assert!(err.contains("base_url"));
    }

    #[test]
    fn test_candle_count_below_minimum() {
        let mut config = SignalBotConfig::default();
        config.strategies.mean_reversion.candle_count = 20;
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("candle_count (20) must be >= min_candles (30)"));
    }

    #[test]
    fn test_base_confidence_bounds() {
        let mut config = SignalBotConfig::default();
        config.strategies.trend_rider.base_confidence = dec!(0.99);
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("base_confidence"));
    }

    #[test]
    fn test_duplicate_symbols_rejected() {
        let mut config = SignalBotConfig::default();
        config.strategies.momentum_scalper.symbol = "BTC-USDT".into();
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("BTC-USDT is assigned to more than one"));

        // A disabled duplicate is fine.
        config.strategies.momentum_scalper.enabled = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_fraction_fields() {
        let mut config = SignalBotConfig::default();
        config.strategies.momentum_scalper.stop_pct = 1.5;
        config.strategies.mean_reversion.level_tolerance = f64::NAN;
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("stop_pct"));
        assert!(err.contains("level_tolerance"));
    }

    #[test]
    fn test_mismatched_weekly_window_only_warns() {
        let mut config = SignalBotConfig::default();
        config.strategies.trend_rider.weekly_window_bars = 10;
        assert!(validate_config(&config).is_ok());
    }
}
