// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use crate::incumbent::IncumbentHolder;
use crate::option::SolverOptions;
use crate::result::TerminationStatus;
use cinder_model::constraint::ConstraintSense;
use cinder_model::model::Model;
use cinder_model::solution::SolutionArchive;
use std::time::Instant;
use tracing::debug;

/// Fixed-size ring of recent Lagrangian values backing the convergence
/// test and the step-size adaptation.
#[derive(Debug, Clone)]
pub struct LagrangianQueue {
    values: Vec<f64>,
    capacity: usize,
    next: usize,
    count: usize,
}

impl LagrangianQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: vec![0.0; capacity.max(1)],
            capacity: capacity.max(1),
            next: 0,
            count: 0,
        }
    }

    pub fn push(&mut self, value: f64) {
        self.values[self.next] = value;
        self.next = (self.next + 1) % self.capacity;
        self.count = (self.count + 1).min(self.capacity);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == self.capacity
    }

    pub fn average(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.values[..self.count].iter().sum::<f64>() / self.count as f64
    }

    pub fn max(&self) -> f64 {
        self.values[..self.count]
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Outcome of the dual warm start: the termination status plus the
/// final per-variable reduced costs the tabu core can bias with.
#[derive(Debug, Clone)]
pub struct LagrangeDualResult {
    pub termination_status: TerminationStatus,
    pub iterations: usize,
    pub lagrangian: f64,
    pub lagrangian_coefficients: Vec<f64>,
}

/// Subgradient ascent on the Lagrangian dual, used as a warm start.
///
/// Multipliers are clamped by constraint sense; each primal step sets
/// every free variable to the bound minimizing its current reduced
/// cost; the step size stretches while the Lagrangian keeps rising and
/// shrinks when it falls below the recent maximum.
pub struct LagrangeDualCore<'a> {
    model: &'a mut Model,
    incumbent_holder: &'a mut IncumbentHolder,
    archive: &'a mut SolutionArchive,
    options: &'a SolverOptions,
    deadline: Instant,
}

impl<'a> LagrangeDualCore<'a> {
    pub fn new(
        model: &'a mut Model,
        incumbent_holder: &'a mut IncumbentHolder,
        archive: &'a mut SolutionArchive,
        options: &'a SolverOptions,
        deadline: Instant,
    ) -> Self {
        Self {
            model,
            incumbent_holder,
            archive,
            options,
            deadline,
        }
    }

    fn has_target(&self) -> bool {
        self.options.target_objective_value > crate::option::DEFAULT_TARGET_OBJECTIVE + 1.0
    }

    pub fn run(&mut self) -> LagrangeDualResult {
        let start = Instant::now();
        let dual_options = &self.options.lagrange_dual;

        self.incumbent_holder.reset_local_augmented_incumbent();
        self.model.update();

        let variable_count = self.model.number_of_variables();
        let constraint_count = self.model.number_of_constraints();
        let mut multipliers = vec![0.0; constraint_count];
        let mut coefficients = vec![0.0; variable_count];
        let mut step_size = 1.0 / variable_count.max(1) as f64;
        let mut queue = LagrangianQueue::new(dual_options.queue_size);
        let mut lagrangian = f64::NEG_INFINITY;
        let mut iteration = 0usize;

        let termination_status = loop {
            if start.elapsed().as_secs_f64() > dual_options.time_max - dual_options.time_offset
                || Instant::now() >= self.deadline
            {
                break TerminationStatus::TimeOver;
            }
            if iteration >= dual_options.iteration_max {
                break TerminationStatus::IterationOver;
            }
            if self.has_target()
                && self.incumbent_holder.feasible_incumbent_objective()
                    <= self.options.target_objective_value * self.model.sign()
            {
                break TerminationStatus::ReachTarget;
            }

            // Subgradient step on the multipliers, clamped by sense.
            for constraint in self.model.constraints() {
                if !constraint.is_enabled() {
                    continue;
                }
                let index = constraint.id().index();
                let updated = multipliers[index] + step_size * constraint.constraint_value();
                multipliers[index] = match constraint.sense() {
                    ConstraintSense::Less => updated.max(0.0),
                    ConstraintSense::Greater => updated.min(0.0),
                    ConstraintSense::Equal => updated,
                };
            }

            // Primal step: push every free variable to the bound that
            // minimizes its reduced cost.
            let sign = self.model.sign();
            for index in 0..variable_count {
                let variable = &self.model.variables()[index];
                if variable.is_fixed() {
                    continue;
                }
                let mut coefficient = variable.objective_sensitivity() * sign;
                for &(constraint_id, sensitivity) in variable.constraint_sensitivities() {
                    coefficient += multipliers[constraint_id.index()] * sensitivity;
                }
                coefficients[index] = coefficient;
                let target = if coefficient > 0.0 {
                    variable.lower_bound()
                } else {
                    variable.upper_bound()
                };
                self.model.variables_mut()[index].set_value_silently(target);
            }
            self.model.update();

            let score = self.model.evaluate_current();
            let solution = self.model.export_dense_solution(&score);
            self.incumbent_holder.try_update(&solution, &score);
            if score.is_feasible && self.options.is_enabled_store_feasible_solutions {
                self.archive.push(solution);
            }

            lagrangian = self.model.compute_lagrangian(&multipliers);

            // Step-size adaptation against the recent history.
            if !queue.is_empty() {
                if lagrangian > queue.average() {
                    step_size *= dual_options.step_size_extend_rate;
                }
                if lagrangian < queue.max() {
                    step_size *= dual_options.step_size_reduce_rate;
                }
            }
            queue.push(lagrangian);

            if queue.is_full() {
                let average = queue.average();
                if (lagrangian - average).abs() < average.abs().max(1.0) * dual_options.tolerance {
                    break TerminationStatus::Converge;
                }
            }

            if iteration % dual_options.log_interval.max(1) == 0 {
                debug!(iteration, lagrangian, step_size, "lagrange dual iteration");
            }
            iteration += 1;
        };

        debug!(%termination_status, iterations = iteration, "lagrange dual finished");

        LagrangeDualResult {
            termination_status,
            iterations: iteration,
            lagrangian,
            lagrangian_coefficients: coefficients,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_model::constraint::ConstraintSense;
    use cinder_model::selection::SelectionMode;
    use std::time::Duration;

    #[test]
    fn test_queue_ring_statistics() {
        let mut queue = LagrangianQueue::new(3);
        assert!(queue.is_empty());
        queue.push(1.0);
        queue.push(2.0);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.average(), 1.5);
        assert_eq!(queue.max(), 2.0);

        queue.push(3.0);
        assert!(queue.is_full());
        queue.push(9.0); // overwrites the oldest
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.max(), 9.0);
        assert!((queue.average() - (9.0 + 2.0 + 3.0) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_dual_converges_on_a_small_knapsack() {
        let mut options = SolverOptions::default();
        options.lagrange_dual.iteration_max = 5000;

        let mut model = Model::new("dual");
        let x = model.add_binary("x").unwrap();
        let y = model.add_binary("y").unwrap();
        model
            .add_constraint("cap", vec![(x, 1.0), (y, 1.0)], ConstraintSense::Less, 1.0)
            .unwrap();
        model.minimize(vec![(x, -2.0), (y, -1.0)], 0.0);
        model.setup_structure(SelectionMode::Off).unwrap();
        model.set_global_penalty_coefficient(options.penalty.initial_penalty_coefficient);
        model.initialize_local_penalty_coefficients(options.penalty.initial_penalty_coefficient);

        let mut incumbent_holder = IncumbentHolder::new();
        let mut archive = SolutionArchive::new(10, true);
        let deadline = Instant::now() + Duration::from_secs(30);
        let result = LagrangeDualCore::new(
            &mut model,
            &mut incumbent_holder,
            &mut archive,
            &options,
            deadline,
        )
        .run();

        assert!(matches!(
            result.termination_status,
            TerminationStatus::Converge | TerminationStatus::IterationOver
        ));
        assert_eq!(result.lagrangian_coefficients.len(), 2);
        // The multiplier on the knapsack row prices both items; the
        // cheaper one keeps a negative reduced cost.
        assert!(result.lagrangian_coefficients[0] <= result.lagrangian_coefficients[1]);
    }

    #[test]
    fn test_unconstrained_dual_fixes_variables_at_their_best_bounds() {
        let mut options = SolverOptions::default();
        options.lagrange_dual.iteration_max = 10;

        let mut model = Model::new("box");
        let x = model.add_variable("x", -5, 5).unwrap();
        let y = model.add_variable("y", -5, 5).unwrap();
        model.minimize(vec![(x, 1.0), (y, -1.0)], 0.0);
        model.setup_structure(SelectionMode::Off).unwrap();

        let mut incumbent_holder = IncumbentHolder::new();
        let mut archive = SolutionArchive::new(10, true);
        let deadline = Instant::now() + Duration::from_secs(30);
        LagrangeDualCore::new(
            &mut model,
            &mut incumbent_holder,
            &mut archive,
            &options,
            deadline,
        )
        .run();

        assert_eq!(model.variable(x).value(), -5);
        assert_eq!(model.variable(y).value(), 5);
        assert!(incumbent_holder.has_feasible_incumbent());
        assert_eq!(incumbent_holder.feasible_incumbent_objective(), -10.0);
    }
}
