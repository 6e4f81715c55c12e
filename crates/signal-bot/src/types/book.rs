use serde::{Deserialize, Serialize};
use std::fmt;

/// Directional read of the order book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookBias {
    /// Imbalance above the bias threshold (strong bid depth).
    Bullish,
    /// Imbalance below the negative bias threshold (strong ask depth).
    Bearish,
    Neutral,
    /// The book could not be read (malformed levels).
    Error,
}

impl BookBias {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bullish => "bullish",
            Self::Bearish => "bearish",
            Self::Neutral => "neutral",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for BookBias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Depth, imbalance and spread over the top of the book.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderBookMetrics {
    pub bid_depth: f64,
    pub ask_depth: f64,
    /// `(bid_depth - ask_depth) / (bid_depth + ask_depth)`, in `[-1, 1]`.
    pub imbalance: f64,
    pub spread: f64,
    pub midprice: f64,
    pub bias: BookBias,
    pub best_bid: f64,
    pub best_ask: f64,
}

impl OrderBookMetrics {
    /// All-zero metrics with the given bias.
    pub fn zeroed(bias: BookBias) -> Self {
        Self {
            bid_depth: 0.0,
            ask_depth: 0.0,
            imbalance: 0.0,
            spread: 0.0,
            midprice: 0.0,
            bias,
            best_bid: 0.0,
            best_ask: 0.0,
        }
    }
}

/// A resting order much larger than the average level size on its side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    pub price: f64,
    pub size: f64,
    /// `size / mean level size`.
    pub ratio: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookWalls {
    pub bid_walls: Vec<Wall>,
    pub ask_walls: Vec<Wall>,
}
