//! Fixed-fractional position sizing.
//!
//! Risk a fixed fraction of the account on the distance between entry and
//! stop, then cap the resulting notional exposure at a fraction of the
//! account, shrinking quantity (and the risk it implies) when the cap binds.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::config::SizingConfig;
use crate::types::PositionSize;

/// Decimal places kept on quantity.
pub const QUANTITY_DP: u32 = 4;
/// Decimal places kept on notional and risk amount.
pub const QUOTE_DP: u32 = 2;

#[derive(Debug, Clone)]
pub struct PositionSizer {
    config: SizingConfig,
}

impl PositionSizer {
    pub fn new(config: SizingConfig) -> Self {
        Self { config }
    }

    /// Largest notional allowed for a single position, or `None` when it
    /// overflows.
    pub fn max_notional(&self) -> Option<Decimal> {
        self.config
            .account_balance
            .checked_mul(self.config.max_notional_pct)
    }

    /// Size a position entered at `entry` with its stop at `stop_loss`.
    ///
    /// Works for either direction (only the stop distance matters). A zero
    /// stop distance, a non-positive entry, or arithmetic overflow sizes to
    /// zero.
    pub fn size(&self, entry: Decimal, stop_loss: Decimal) -> PositionSize {
        let Some(stop_distance) = entry.checked_sub(stop_loss).map(|d| d.abs()) else {
            warn!(%entry, %stop_loss, "stop distance overflowed; sizing to zero");
            return PositionSize::ZERO;
        };
        if stop_distance <= Decimal::ZERO || entry <= Decimal::ZERO {
            return PositionSize::ZERO;
        }

        match self.checked_size(entry, stop_distance) {
            Some(size) => size,
            None => {
                warn!(
                    %entry,
                    %stop_distance,
                    balance = %self.config.account_balance,
                    "position size overflowed; sizing to zero"
                );
                PositionSize::ZERO
            }
        }
    }

    fn checked_size(&self, entry: Decimal, stop_distance: Decimal) -> Option<PositionSize> {
        let mut risk_amount = self.config.account_balance.checked_mul(self.config.risk_pct)?;
        let mut quantity = risk_amount.checked_div(stop_distance)?;
        let mut notional = quantity.checked_mul(entry)?;

        let max_notional = self.max_notional()?;
        if notional > max_notional {
            debug!(
                %notional,
                %max_notional,
                "position notional capped"
            );
            quantity = max_notional.checked_div(entry)?;
            notional = max_notional;
            risk_amount = quantity.checked_mul(stop_distance)?;
        }

        Some(PositionSize {
            quantity: quantity.round_dp(QUANTITY_DP),
            notional: notional.round_dp(QUOTE_DP),
            risk_amount: risk_amount.round_dp(QUOTE_DP),
        })
    }
}

impl Default for PositionSizer {
    fn default() -> Self {
        Self::new(SizingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_notional_cap_binds() {
        // 1% of 10k over a 500 stop → 0.2 BTC = 9000 notional, capped at 3000.
        let size = PositionSizer::default().size(dec!(45000), dec!(44500));
        assert_eq!(size.quantity, dec!(0.0667));
        assert_eq!(size.notional, dec!(3000.00));
        assert_eq!(size.risk_amount, dec!(33.33));
    }

    #[test]
    fn test_uncapped_size() {
        let size = PositionSizer::default().size(dec!(100), dec!(95));
        assert_eq!(size.quantity, dec!(20));
        assert_eq!(size.notional, dec!(2000));
        assert_eq!(size.risk_amount, dec!(100));
    }

    #[test]
    fn test_short_side_uses_absolute_distance() {
        let sizer = PositionSizer::default();
        assert_eq!(sizer.size(dec!(100), dec!(105)), sizer.size(dec!(100), dec!(95)));
    }

    #[test]
    fn test_zero_stop_distance_is_zero_size() {
        let size = PositionSizer::default().size(dec!(100), dec!(100));
        assert_eq!(size, PositionSize::ZERO);
        assert_eq!(PositionSizer::default().size(dec!(0), dec!(-1)), PositionSize::ZERO);
    }

    #[test]
    fn test_custom_config() {
        let sizer = PositionSizer::new(SizingConfig {
            account_balance: dec!(50000),
            risk_pct: dec!(0.02),
            max_notional_pct: dec!(1),
        });
        assert_eq!(sizer.max_notional(), Some(dec!(50000)));
        let size = sizer.size(dec!(2000), dec!(1900));
        assert_eq!(size.quantity, dec!(10));
        assert_eq!(size.notional, dec!(20000));
        assert_eq!(size.risk_amount, dec!(1000));
    }

    #[test]
    fn test_overflowing_balance_sizes_to_zero() {
        let sizer = PositionSizer::new(SizingConfig {
            account_balance: dec!(100000000000000000000000000),
            risk_pct: dec!(1),
            max_notional_pct: dec!(1000),
        });
        assert_eq!(sizer.max_notional(), None);
        assert_eq!(sizer.size(dec!(2000), dec!(1999.99)), PositionSize::ZERO);
    }

    #[test]
    fn test_overflowing_stop_distance_sizes_to_zero() {
        let size = PositionSizer::default().size(Decimal::MAX, Decimal::MIN);
        assert_eq!(size, PositionSize::ZERO);
    }
}
