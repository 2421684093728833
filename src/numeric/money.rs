// ============================================================================
// Money Conversion
// ============================================================================

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

/// Decimal places kept for balances and trade values
pub const MONEY_DECIMALS: u32 = 8;

/// Convert an f64 amount into a ledger amount.
///
/// Returns `None` for NaN or infinite input, or values outside Decimal range.
pub fn to_money(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_f64(value).map(|d| d.round_dp(MONEY_DECIMALS))
}
