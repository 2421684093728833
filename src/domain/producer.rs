// ============================================================================
// Producer Domain Model
// ============================================================================

use crate::numeric::CostCurve;
use serde::{Deserialize, Serialize};

/// A generator with a convex quadratic cost curve `a*q^2 + b*q`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Producer {
    pub id: String,

    /// Quadratic cost coefficient
    pub a: f64,

    /// Linear cost coefficient
    pub b: f64,

    pub production_min: f64,
    pub production_max: f64,

    /// Current output, always within `[production_min, production_max]`
    pub production: f64,

    /// Marginal cost at `production`; doubles as the producer's price signal
    pub lambda: f64,

    /// Total cost at `production`
    pub cost: f64,

    /// Consumer that owns this producer
    pub owner_id: String,

    /// Cumulative quantity settled against this producer
    #[serde(default)]
    pub traded_volume: f64,
}

impl Producer {
    /// Create a producer idling at its minimum output
    pub fn new(
        id: impl Into<String>,
        a: f64,
        b: f64,
        production_min: f64,
        production_max: f64,
        owner_id: impl Into<String>,
    ) -> Self {
        let mut producer = Self {
            id: id.into(),
            a,
            b,
            production_min,
            production_max,
            production: production_min,
            lambda: 0.0,
            cost: 0.0,
            owner_id: owner_id.into(),
            traded_volume: 0.0,
        };
        producer.set_production(production_min);
        producer
    }

    pub fn cost_curve(&self) -> CostCurve {
        CostCurve::new(self.a, self.b)
    }

    /// Commit an output level, keeping price and cost consistent with it
    pub fn set_production(&mut self, quantity: f64) {
        let curve = self.cost_curve();
        self.production = quantity.clamp(self.production_min, self.production_max);
        self.lambda = curve.marginal(self.production);
        self.cost = curve.cost(self.production);
    }

    /// Check curve coefficients and output bounds
    pub fn validate_parameters(a: f64, b: f64, min: f64, max: f64) -> Result<(), String> {
        if !(a.is_finite() && b.is_finite() && min.is_finite() && max.is_finite()) {
            return Err("Producer parameters must be finite".to_string());
        }
        if a < 0.0 || b < 0.0 {
            return Err("Cost coefficients must be non-negative".to_string());
        }
        if min < 0.0 {
            return Err("Minimum production cannot be negative".to_string());
        }
        if min > max {
            return Err("Minimum production exceeds maximum production".to_string());
        }
        Ok(())
    }
}
