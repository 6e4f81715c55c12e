use serde::{Deserialize, Serialize};

/// Classic floor-trader pivot levels.
///
/// For `high >= low`: `s3 <= s2 <= s1 <= p <= r1 <= r2 <= r3`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PivotLevels {
    pub p: f64,
    pub r1: f64,
    pub r2: f64,
    pub r3: f64,
    pub s1: f64,
    pub s2: f64,
    pub s3: f64,
}

impl PivotLevels {
    /// Levels in ascending order: S3, S2, S1, P, R1, R2, R3.
    pub fn ascending(&self) -> [f64; 7] {
        [self.s3, self.s2, self.s1, self.p, self.r1, self.r2, self.r3]
    }
}

/// Extremes of the trailing high/low window.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WeeklyLevels {
    pub weekly_high: f64,
    pub weekly_low: f64,
}

/// VWAP ± k·σ envelope.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VwapBands {
    pub upper: f64,
    pub lower: f64,
}

/// Closest resistance above and support below a reference price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NearestLevels {
    pub resistance: f64,
    pub support: f64,
}
