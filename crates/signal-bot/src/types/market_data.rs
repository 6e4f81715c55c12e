use serde::{Deserialize, Serialize};

/// A single OHLCV candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar open time, unix seconds.
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Column view over a candle series, as consumed by the indicator functions.
#[derive(Debug, Clone, Default)]
pub struct CandleColumns {
    pub highs: Vec<f64>,
    pub lows: Vec<f64>,
    pub closes: Vec<f64>,
    pub volumes: Vec<f64>,
}

impl CandleColumns {
    pub fn from_candles(candles: &[Candle]) -> Self {
        Self {
            highs: candles.iter().map(|c| c.high).collect(),
            lows: candles.iter().map(|c| c.low).collect(),
            closes: candles.iter().map(|c| c.close).collect(),
            volumes: candles.iter().map(|c| c.volume).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }
}

/// Level-2 order book snapshot.
///
/// Only the top levels are ever read; deeper levels are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    /// (price, size) sorted by price descending.
    pub bids: Vec<(f64, f64)>,
    /// (price, size) sorted by price ascending.
    pub asks: Vec<(f64, f64)>,
    pub sequence_id: u64,
}

impl OrderBookSnapshot {
    /// Snapshot substituted when the book could not be fetched.
    pub fn empty() -> Self {
        Self::default()
    }

    /// `true` when either side has no levels.
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() || self.asks.is_empty()
    }
}
