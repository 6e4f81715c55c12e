//! Candle timeframes supported by the market-data source.
//!
//! Serialized with KuCoin's interval strings (`"1min"`, `"5min"`, `"1hour"`,
//! ...) so config files and signal output use the exchange's vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported candle timeframes, ordered shortest to longest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub enum Timeframe {
    #[serde(rename = "1min")]
    M1,
    #[serde(rename = "3min")]
    M3,
    #[serde(rename = "5min")]
    M5,
    #[serde(rename = "15min")]
    M15,
    #[serde(rename = "30min")]
    M30,
    #[serde(rename = "1hour")]
    H1,
    #[serde(rename = "4hour")]
    H4,
    #[serde(rename = "1day")]
    D1,
}

impl Timeframe {
    /// All timeframes in ascending order (shortest to longest).
    pub const ALL: [Timeframe; 8] = [
        Timeframe::M1,
        Timeframe::M3,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
    ];

    /// KuCoin kline `type` parameter.
    #[must_use]
    pub const fn as_kucoin_interval(&self) -> &'static str {
        match self {
            Self::M1 => "1min",
            Self::M3 => "3min",
            Self::M5 => "5min",
            Self::M15 => "15min",
            Self::M30 => "30min",
            Self::H1 => "1hour",
            Self::H4 => "4hour",
            Self::D1 => "1day",
        }
    }

    /// Parse from a KuCoin interval string.
    #[must_use]
    pub fn from_kucoin_interval(s: &str) -> Option<Self> {
        match s {
            "1min" => Some(Self::M1),
            "3min" => Some(Self::M3),
            "5min" => Some(Self::M5),
            "15min" => Some(Self::M15),
            "30min" => Some(Self::M30),
            "1hour" => Some(Self::H1),
            "4hour" => Some(Self::H4),
            "1day" => Some(Self::D1),
            _ => None,
        }
    }

    /// Duration in seconds.
    #[must_use]
    pub const fn duration_secs(&self) -> u64 {
        match self {
            Self::M1 => 60,
            Self::M3 => 180,
            Self::M5 => 300,
            Self::M15 => 900,
            Self::M30 => 1800,
            Self::H1 => 3600,
            Self::H4 => 14_400,
            Self::D1 => 86_400,
        }
    }

    /// Number of bars of this timeframe in one calendar week.
    ///
    /// Used to sanity-check trailing "weekly" windows, which are configured
    /// in bars rather than wall-clock time.
    #[must_use]
    pub const fn bars_per_week(&self) -> usize {
        (7 * 86_400 / self.duration_secs()) as usize
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_kucoin_interval())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_kucoin_interval() {
        assert_eq!(Timeframe::M1.as_kucoin_interval(), "1min");
        assert_eq!(Timeframe::H4.as_kucoin_interval(), "4hour");
        assert_eq!(Timeframe::from_kucoin_interval("15min"), Some(Timeframe::M15));
        assert_eq!(Timeframe::from_kucoin_interval("15m"), None);
    }

    #[test]
    fn test_timeframe_round_trips_through_interval() {
        for tf in Timeframe::ALL {
            assert_eq!(Timeframe::from_kucoin_interval(tf.as_kucoin_interval()), Some(tf));
        }
    }

    #[test]
    fn test_timeframe_serde_uses_kucoin_names() {
        assert_eq!(serde_json::to_string(&Timeframe::M5).unwrap(), "\"5min\"");
        let tf: Timeframe = serde_json::from_str("\"1hour\"").unwrap();
        assert_eq!(tf, Timeframe::H1);
    }

    #[test]
    fn test_bars_per_week() {
        assert_eq!(Timeframe::H1.bars_per_week(), 168);
        assert_eq!(Timeframe::M5.bars_per_week(), 2016);
        assert_eq!(Timeframe::D1.bars_per_week(), 7);
    }

    #[test]
    fn test_timeframe_ordering() {
        assert!(Timeframe::M1 < Timeframe::M5);
        assert!(Timeframe::M30 < Timeframe::H1);
        assert!(Timeframe::H4 < Timeframe::D1);
    }
}
