use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Risk-based position size for one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PositionSize {
    /// Base-asset units.
    #[serde(with = "rust_decimal::serde::str")]
    pub quantity: Decimal,
    /// `quantity * entry`, in quote currency.
    #[serde(with = "rust_decimal::serde::str")]
    pub notional: Decimal,
    /// Loss at the stop, in quote currency.
    #[serde(with = "rust_decimal::serde::str")]
    pub risk_amount: Decimal,
}

impl PositionSize {
    pub const ZERO: Self = Self {
        quantity: Decimal::ZERO,
        notional: Decimal::ZERO,
        risk_amount: Decimal::ZERO,
    };
}
