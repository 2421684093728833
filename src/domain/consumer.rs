// ============================================================================
// Consumer Domain Model
// ============================================================================

use crate::numeric::UtilityCurve;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An energy consumer with a concave quadratic utility curve.
///
/// `demands[i]` and `utilities[i]` refer to the producer at index `i` of the
/// snapshot's producer list; both vectors always match its length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consumer {
    pub id: String,
    pub beta: f64,
    pub theta: f64,
    pub demand_min: f64,
    pub demand_max: f64,

    /// Multiplier on the lower demand bound
    pub u_min: f64,

    /// Multiplier on the upper demand bound
    pub u_max: f64,

    pub demands: Vec<f64>,
    pub utilities: Vec<f64>,
    pub total_demand: f64,

    pub balance: Decimal,

    /// Producers owned by this consumer
    pub producer_ids: Vec<String>,
}

impl Consumer {
    pub fn new(
        id: impl Into<String>,
        beta: f64,
        theta: f64,
        demand_min: f64,
        demand_max: f64,
        balance: Decimal,
        producer_count: usize,
    ) -> Self {
        Self {
            id: id.into(),
            beta,
            theta,
            demand_min,
            demand_max,
            u_min: 0.0,
            u_max: 0.0,
            demands: vec![0.0; producer_count],
            utilities: vec![0.0; producer_count],
            total_demand: 0.0,
            balance,
            producer_ids: Vec::new(),
        }
    }

    pub fn utility_curve(&self) -> UtilityCurve {
        UtilityCurve::new(self.beta, self.theta)
    }

    pub fn owns(&self, producer_id: &str) -> bool {
        self.producer_ids.iter().any(|id| id == producer_id)
    }

    /// Append a zeroed demand/utility slot for a newly registered producer
    pub fn push_producer_slot(&mut self) {
        self.demands.push(0.0);
        self.utilities.push(0.0);
    }

    /// Recompute `total_demand` as the sum of the demand vector
    pub fn refresh_total_demand(&mut self) -> f64 {
        self.total_demand = self.demands.iter().sum();
        self.total_demand
    }

    pub fn refresh_utilities(&mut self) {
        let curve = self.utility_curve();
        for (utility, demand) in self.utilities.iter_mut().zip(&self.demands) {
            *utility = curve.utility(*demand);
        }
    }

    pub fn total_utility(&self) -> f64 {
        self.utilities.iter().sum()
    }

    /// Rescale the demand vector into `[demand_min, demand_max]`.
    ///
    /// One proportional factor is applied to every component. A vector whose
    /// total is below `epsilon` cannot be scaled up meaningfully, so the lower
    /// bound is then spread evenly. Utilities and the total are refreshed from
    /// the final vector, whose sum lies inside the bounds exactly.
    pub fn project_demand(&mut self, epsilon: f64) {
        let total: f64 = self.demands.iter().sum();

        if total < self.demand_min {
            if total < epsilon && !self.demands.is_empty() {
                let share = self.demand_min / self.demands.len() as f64;
                self.demands.iter_mut().for_each(|d| *d = share);
            } else {
                let scale = self.demand_min / total.max(epsilon);
                self.demands.iter_mut().for_each(|d| *d *= scale);
            }
            self.snap_total_to(self.demand_min);
        } else if total > self.demand_max {
            let scale = self.demand_max / total;
            self.demands.iter_mut().for_each(|d| *d *= scale);
            self.snap_total_to(self.demand_max);
        }

        self.refresh_utilities();
        self.refresh_total_demand();
    }

    /// Absorb rounding from a rescale into the largest component so the
    /// summed demand lands inside the bounds
    fn snap_total_to(&mut self, target: f64) {
        let Some(idx) = (0..self.demands.len()).max_by(|&a, &b| self.demands[a].total_cmp(&self.demands[b]))
        else {
            return;
        };

        let sum: f64 = self.demands.iter().sum();
        if sum != target {
            self.demands[idx] = (self.demands[idx] + (target - sum)).max(0.0);
        }

        for _ in 0..64 {
            let sum: f64 = self.demands.iter().sum();
            if sum > self.demand_max {
                self.demands[idx] = self.demands[idx].next_down().max(0.0);
            } else if sum < self.demand_min {
                self.demands[idx] = self.demands[idx].next_up();
            } else {
                break;
            }
        }
    }

    pub fn validate_parameters(beta: f64, theta: f64, min: f64, max: f64) -> Result<(), String> {
        if !(beta.is_finite() && theta.is_finite() && min.is_finite() && max.is_finite()) {
            return Err("Consumer parameters must be finite".to_string());
        }
        if theta <= 0.0 {
            return Err("Theta must be positive".to_string());
        }
        if min < 0.0 {
            return Err("Minimum demand cannot be negative".to_string());
        }
        if min > max {
            return Err("Minimum demand exceeds maximum demand".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consumer(demands: Vec<f64>) -> Consumer {
        let mut consumer = Consumer::new("c1", 8.0, 0.05, 20.0, 120.0, Decimal::ZERO, demands.len());
        consumer.demands = demands;
        consumer
    }

    #[test]
    fn test_new_consumer_vectors_match_producers() {
        let consumer = Consumer::new("c1", 8.0, 0.05, 20.0, 120.0, Decimal::from(100), 3);
        assert_eq!(consumer.demands, vec![0.0; 3]);
        assert_eq!(consumer.utilities, vec![0.0; 3]);
        assert!(consumer.producer_ids.is_empty());
    }

    #[test]
    fn test_projection_scales_down() {
        let mut consumer = consumer(vec![100.0, 100.0]);
        consumer.project_demand(1e-4);

        assert!((consumer.total_demand - 120.0).abs() < 1e-9);
        assert!((consumer.demands[0] - 60.0).abs() < 1e-9);
        assert_eq!(consumer.total_demand, consumer.demands.iter().sum::<f64>());
    }

    #[test]
    fn test_projection_scales_up_proportionally() {
        let mut consumer = consumer(vec![3.0, 1.0]);
        consumer.project_demand(1e-4);

        assert!((consumer.total_demand - 20.0).abs() < 1e-9);
        assert!((consumer.demands[0] - 15.0).abs() < 1e-9);
        assert!((consumer.demands[1] - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_projection_lifts_all_zero_vector() {
        let mut consumer = consumer(vec![0.0, 0.0]);
        consumer.project_demand(1e-4);

        assert_eq!(consumer.demands, vec![10.0, 10.0]);
        assert_eq!(consumer.total_demand, 20.0);
        assert_eq!(consumer.utilities[0], 8.0 * 10.0 - 0.5 * 0.05 * 100.0);
    }

    #[test]
    fn test_projection_keeps_feasible_vector() {
        let mut consumer = consumer(vec![30.0, 40.0]);
        consumer.project_demand(1e-4);

        assert_eq!(consumer.demands, vec![30.0, 40.0]);
        assert_eq!(consumer.total_demand, 70.0);
    }

    #[test]
    fn test_projected_total_stays_inside_bounds() {
        for n in 1..12 {
            for k in 1..40 {
                let demands: Vec<f64> = (0..n).map(|i| (i * k + 1) as f64 / 7.0 * 0.37).collect();
                let high: Vec<f64> = demands.iter().map(|d| d * 313.0 + 0.1).collect();

                for start in [demands, high] {
                    let mut consumer = consumer(start);
                    consumer.project_demand(1e-4);

                    let sum: f64 = consumer.demands.iter().sum();
                    assert_eq!(consumer.total_demand, sum);
                    assert!(sum >= consumer.demand_min && sum <= consumer.demand_max, "{}", sum);
                    assert!(consumer.demands.iter().all(|d| *d >= 0.0));
                }
            }
        }
    }

    #[test]
    fn test_parameter_validation() {
        assert!(Consumer::validate_parameters(8.0, 0.05, 20.0, 120.0).is_ok());
        assert!(Consumer::validate_parameters(8.0, 0.0, 20.0, 120.0).is_err());
        assert!(Consumer::validate_parameters(8.0, 0.05, 130.0, 120.0).is_err());
    }
}
