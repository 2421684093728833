// ============================================================================
// Numeric Module
// Curve math, step schedules and money conversion for market clearing
// ============================================================================
//
// This module provides:
// - CostCurve: convex quadratic producer cost a*q^2 + b*q
// - UtilityCurve: concave quadratic consumer utility beta*d - 0.5*theta*d^2
// - diminishing_step: subgradient step schedule base/sqrt(k+1)
// - to_money: f64 -> Decimal conversion used at the settlement boundary
//
// Physical quantities (MW, prices, multipliers) stay in f64 because the
// solver needs sqrt and division; ledger amounts are Decimal so that a debit
// and its matching credit are bit-for-bit identical.

mod curves;
mod money;

pub use curves::{diminishing_step, CostCurve, UtilityCurve};
pub use money::{to_money, MONEY_DECIMALS};
