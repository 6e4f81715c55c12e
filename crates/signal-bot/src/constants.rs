use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ---------------------------------------------------------------------------
// Signal scoring
// ---------------------------------------------------------------------------

/// Confidence reported for HOLD: "no edge", not a probability.
pub const HOLD_CONFIDENCE: Decimal = dec!(0.3);

/// Upper bound on any reported confidence.
pub const MAX_CONFIDENCE: Decimal = dec!(0.95);

/// Decimal places on reported confidence.
pub const CONFIDENCE_DP: u32 = 2;

/// Decimal places on oscillator diagnostics (RSI, %K).
pub const OSCILLATOR_DP: u32 = 1;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Env var naming the config directory.
pub const CONFIG_DIR_ENV: &str = "SIGNAL_BOT_CONFIG_DIR";

pub const DEFAULT_CONFIG_DIR: &str = "config";

// ---------------------------------------------------------------------------
// KuCoin public market data
// ---------------------------------------------------------------------------

pub const KUCOIN_CANDLES_PATH: &str = "/api/v1/market/candles";

pub const KUCOIN_ORDERBOOK_PATH: &str = "/api/v1/market/orderbook/level2_20";

/// `code` field of a successful KuCoin response.
pub const KUCOIN_SUCCESS_CODE: &str = "200000";

/// Most candles KuCoin returns for one request.
pub const KUCOIN_MAX_CANDLES: usize = 1500;
