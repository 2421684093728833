// ============================================================================
// Quadratic Curves
// Producer cost and consumer utility functions with their inverses
// ============================================================================

/// Subgradient step size `base / sqrt(iteration + 1)`.
///
/// The diminishing schedule is what makes the dual iterates converge for
/// convex problems; `iteration` is the count of completed steps.
#[inline]
pub fn diminishing_step(base: f64, iteration: u64) -> f64 {
    base / ((iteration + 1) as f64).sqrt()
}

/// Convex quadratic generation cost `a*q^2 + b*q`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostCurve {
    pub a: f64,
    pub b: f64,
}

impl CostCurve {
    pub fn new(a: f64, b: f64) -> Self {
        Self { a, b }
    }

    #[inline]
    pub fn cost(&self, quantity: f64) -> f64 {
        self.a * quantity * quantity + self.b * quantity
    }

    /// Marginal cost `2a*q + b`
    #[inline]
    pub fn marginal(&self, quantity: f64) -> f64 {
        2.0 * self.a * quantity + self.b
    }

    /// Output whose marginal cost equals `price`, projected onto `[min, max]`.
    ///
    /// A linear curve (`a == 0`) has no interior optimum: it runs flat out
    /// above `b`, idles at the floor below it and holds `current` at exactly `b`.
    pub fn output_at_price(&self, price: f64, current: f64, min: f64, max: f64) -> f64 {
        let unconstrained = if self.a > 0.0 {
            (price - self.b) / (2.0 * self.a)
        } else if price > self.b {
            max
        } else if price < self.b {
            min
        } else {
            current
        };

        unconstrained.clamp(min, max)
    }
}

/// Concave quadratic utility `beta*d - 0.5*theta*d^2`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtilityCurve {
    pub beta: f64,
    pub theta: f64,
}

impl UtilityCurve {
    pub fn new(beta: f64, theta: f64) -> Self {
        Self { beta, theta }
    }

    #[inline]
    pub fn utility(&self, demand: f64) -> f64 {
        self.beta * demand - 0.5 * self.theta * demand * demand
    }

    /// Demand maximizing `utility(d) - price*d`, floored at zero.
    ///
    /// `shift` carries the net Lagrange pressure `u_min - u_max`.
    #[inline]
    pub fn demand_at_price(&self, price: f64, shift: f64) -> f64 {
        ((self.beta + shift - price) / self.theta).max(0.0)
    }
}
