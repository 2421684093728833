// ============================================================================
// Price Discovery
// Dual decomposition: producers chase their demand, consumers their bounds
// ============================================================================

use crate::domain::{ClearingParameters, MarketSnapshot};
use crate::numeric::diminishing_step;

/// Result of one relaxation step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    /// Zero-based index of the step just taken
    pub iteration: u64,

    /// Largest absolute price move of any producer
    pub max_lambda_change: f64,

    /// `|total_generation - total_demand|` after the step
    pub supply_demand_gap: f64,

    /// Total utility minus total production cost after the step
    pub social_welfare: f64,

    /// Both convergence tests passed
    pub converged: bool,

    /// The market was not converged before this step; allocation must be settled
    pub newly_converged: bool,
}

/// Projected subgradient solver for the welfare maximization problem
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceDiscovery {
    params: ClearingParameters,
}

impl PriceDiscovery {
    pub fn new(params: ClearingParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ClearingParameters {
        &self.params
    }

    /// Advance the snapshot by one step.
    ///
    /// Deterministic in the snapshot alone. Updates production, prices,
    /// demand, totals, welfare, the convergence flag and the iteration count;
    /// settlement of a fresh equilibrium is left to the caller.
    pub fn step(&self, snapshot: &mut MarketSnapshot) -> StepOutcome {
        let k = snapshot.iteration_count;

        if k == 0 {
            self.initial_demands(snapshot);
        }

        let aggregated = aggregate_demand(snapshot);
        let max_lambda_change = self.update_supply(snapshot, &aggregated, k);
        self.update_demand(snapshot, k);

        snapshot.total_generation = snapshot.producers.iter().map(|p| p.production).sum();
        snapshot.total_demand = snapshot.consumers.iter().map(|c| c.total_demand).sum();
        snapshot.social_welfare = snapshot.compute_welfare();

        let supply_demand_gap = (snapshot.total_generation - snapshot.total_demand).abs();
        let converged = max_lambda_change <= self.params.lambda_tolerance
            && supply_demand_gap <= self.params.balance_tolerance;
        let newly_converged = converged && !snapshot.converged;

        snapshot.converged = converged;
        snapshot.iteration_count += 1;

        StepOutcome {
            iteration: k,
            max_lambda_change,
            supply_demand_gap,
            social_welfare: snapshot.social_welfare,
            converged,
            newly_converged,
        }
    }

    /// First-iteration demands at the producers' starting prices
    fn initial_demands(&self, snapshot: &mut MarketSnapshot) {
        let lambdas: Vec<f64> = snapshot.producers.iter().map(|p| p.lambda).collect();
        for consumer in &mut snapshot.consumers {
            let curve = consumer.utility_curve();
            for (demand, lambda) in consumer.demands.iter_mut().zip(&lambdas) {
                *demand = curve.demand_at_price(*lambda, 0.0);
            }
            consumer.project_demand(self.params.demand_epsilon);
        }
    }

    /// Move every price against its excess supply and re-solve output.
    ///
    /// Returns the largest absolute price change.
    fn update_supply(&self, snapshot: &mut MarketSnapshot, aggregated: &[f64], k: u64) -> f64 {
        let step = diminishing_step(self.params.supply_step, k);
        let mut max_change: f64 = 0.0;

        for (producer, demand) in snapshot.producers.iter_mut().zip(aggregated) {
            let previous = producer.lambda;
            let price = (producer.lambda - step * (producer.production - demand)).max(0.0);
            let output = producer.cost_curve().output_at_price(
                price,
                producer.production,
                producer.production_min,
                producer.production_max,
            );
            producer.set_production(output);
            max_change = max_change.max((producer.lambda - previous).abs());
        }

        max_change
    }

    /// Move the bound multipliers, re-solve demand at the new prices and
    /// project it back into each consumer's bounds
    fn update_demand(&self, snapshot: &mut MarketSnapshot, k: u64) {
        let step = diminishing_step(self.params.demand_step, k);
        let lambdas: Vec<f64> = snapshot.producers.iter().map(|p| p.lambda).collect();

        for consumer in &mut snapshot.consumers {
            let current = consumer.total_demand;
            consumer.u_min = (consumer.u_min + step * (consumer.demand_min - current)).max(0.0);
            consumer.u_max = (consumer.u_max + step * (current - consumer.demand_max)).max(0.0);

            let curve = consumer.utility_curve();
            let shift = consumer.u_min - consumer.u_max;
            for (demand, lambda) in consumer.demands.iter_mut().zip(&lambdas) {
                *demand = curve.demand_at_price(*lambda, shift);
            }
            consumer.project_demand(self.params.demand_epsilon);
        }
    }
}

/// Per-producer demand summed over consumers; refreshes consumer totals
fn aggregate_demand(snapshot: &mut MarketSnapshot) -> Vec<f64> {
    let mut aggregated = vec![0.0; snapshot.producers.len()];
    for consumer in &mut snapshot.consumers {
        for (slot, demand) in aggregated.iter_mut().zip(&consumer.demands) {
            *slot += demand;
        }
        consumer.refresh_total_demand();
    }
    aggregated
}
