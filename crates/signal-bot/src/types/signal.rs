use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::book::BookBias;
use super::position::PositionSize;
use super::timeframe::Timeframe;

/// Directional call of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
    /// No direction qualified.
    Hold,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Long => "LONG",
            Self::Short => "SHORT",
            Self::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pivot levels reported alongside a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrSummary {
    #[serde(with = "rust_decimal::serde::str")]
    pub s1: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub s2: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub r1: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub r2: Decimal,
    /// Closest level strictly below entry among the supports considered.
    #[serde(with = "rust_decimal::serde::str")]
    pub nearest_support: Decimal,
    /// Closest level strictly above entry among the resistances considered.
    #[serde(with = "rust_decimal::serde::str")]
    pub nearest_resistance: Decimal,
}

/// Order-book context reported alongside a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BookSummary {
    #[serde(with = "rust_decimal::serde::str")]
    pub imbalance: Decimal,
    /// Distance-weighted imbalance near the touch.
    #[serde(with = "rust_decimal::serde::str")]
    pub pressure: Decimal,
    /// Price of the largest bid wall, if any.
    #[serde(with = "rust_decimal::serde::str_option")]
    pub bid_wall: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::str_option")]
    pub ask_wall: Option<Decimal>,
}

/// Where the price sits relative to the Bollinger envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandPosition {
    Upper,
    Middle,
    Lower,
}

/// Direction of on-balance volume over the last two bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObvTrend {
    Rising,
    Falling,
}

/// Strategy-specific values shown next to the signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostics {
    TrendRider {
        #[serde(with = "rust_decimal::serde::str")]
        current_rsi: Decimal,
        #[serde(with = "rust_decimal::serde::str")]
        current_atr: Decimal,
    },
    MeanReversion {
        bb_position: BandPosition,
    },
    Scalper {
        #[serde(with = "rust_decimal::serde::str")]
        stoch_rsi: Decimal,
        obv_trend: ObvTrend,
        #[serde(with = "rust_decimal::serde::str")]
        session_high: Decimal,
        #[serde(with = "rust_decimal::serde::str")]
        session_low: Decimal,
    },
}

/// A fully specified trade idea for one asset.
///
/// Built fresh per request from one candle/order-book snapshot and never
/// stored; `as_of` is the open time of the last candle used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub side: Side,
    #[serde(with = "rust_decimal::serde::str")]
    pub entry: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub stop_loss: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub take_profit: Decimal,
    #[serde(flatten)]
    pub position: PositionSize,
    pub sr_levels: SrSummary,
    pub orderbook_bias: BookBias,
    pub book: BookSummary,
    /// Heuristic score in `[0, 0.95]`; 0.3 for HOLD.
    #[serde(with = "rust_decimal::serde::str")]
    pub confidence: Decimal,
    pub strategy_name: String,
    pub diagnostics: Diagnostics,
    pub as_of: i64,
}

impl Signal {
    /// `true` for LONG and SHORT.
    pub fn is_actionable(&self) -> bool {
        self.side != Side::Hold
    }

    /// Reward distance over risk distance; zero when the stop sits at entry.
    pub fn risk_reward(&self) -> Decimal {
        let risk = (self.entry - self.stop_loss).abs();
        if risk.is_zero() {
            return Decimal::ZERO;
        }
        (self.take_profit - self.entry).abs() / risk
    }
}
