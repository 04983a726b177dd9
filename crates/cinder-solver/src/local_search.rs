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
use crate::memory::Memory;
use crate::neighborhood::{MoveSense, Neighborhood};
use crate::option::{ImprovabilityScreeningMode, SolverOptions};
use crate::result::TerminationStatus;
use cinder_core::num::EPSILON;
use cinder_model::model::Model;
use cinder_model::solution::SolutionArchive;
use std::time::Instant;
use tracing::debug;

/// Outcome of one local-search session.
#[derive(Debug, Clone, Copy)]
pub struct LocalSearchResult {
    pub termination_status: TerminationStatus,
    pub iterations: usize,
    pub update_status: u8,
}

/// First-improvement descent: scan the candidates in order and commit
/// the first move that improves the local augmented objective by more
/// than epsilon. No tabu list, no penalty adaptation.
pub struct LocalSearchCore<'a> {
    model: &'a mut Model,
    neighborhood: &'a mut Neighborhood,
    incumbent_holder: &'a mut IncumbentHolder,
    memory: &'a mut Memory,
    archive: &'a mut SolutionArchive,
    options: &'a SolverOptions,
    deadline: Instant,
}

impl<'a> LocalSearchCore<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        model: &'a mut Model,
        neighborhood: &'a mut Neighborhood,
        incumbent_holder: &'a mut IncumbentHolder,
        memory: &'a mut Memory,
        archive: &'a mut SolutionArchive,
        options: &'a SolverOptions,
        deadline: Instant,
    ) -> Self {
        Self {
            model,
            neighborhood,
            incumbent_holder,
            memory,
            archive,
            options,
            deadline,
        }
    }

    fn has_target(&self) -> bool {
        self.options.target_objective_value > crate::option::DEFAULT_TARGET_OBJECTIVE + 1.0
    }

    pub fn run(&mut self) -> LocalSearchResult {
        let start = Instant::now();
        let local_options = &self.options.local_search;

        self.incumbent_holder.reset_local_augmented_incumbent();
        self.memory.reset_last_update_iterations();

        self.model.update();
        let mut current_score = self.model.evaluate_current();
        let initial_solution = self.model.export_dense_solution(&current_score);
        let mut update_status = self
            .incumbent_holder
            .try_update(&initial_solution, &current_score);

        let mut previous_alterations: Option<Vec<cinder_model::expression::Alteration>> = None;
        let mut iteration = 0usize;

        let termination_status = loop {
            if start.elapsed().as_secs_f64() > local_options.time_max - local_options.time_offset
                || Instant::now() >= self.deadline
            {
                break TerminationStatus::TimeOver;
            }
            if iteration >= local_options.iteration_max {
                break TerminationStatus::IterationOver;
            }
            if self.has_target()
                && self.incumbent_holder.feasible_incumbent_objective()
                    <= self.options.target_objective_value * self.model.sign()
            {
                break TerminationStatus::ReachTarget;
            }

            let accept_all =
                self.options.improvability_screening_mode == ImprovabilityScreeningMode::Off;
            if !accept_all {
                match &previous_alterations {
                    None => self.model.update_variable_objective_improvabilities_all(),
                    Some(alterations) => {
                        let ids: Vec<_> = alterations.iter().map(|&(id, _)| id).collect();
                        self.model.update_variable_objective_improvabilities(&ids);
                    }
                }
                if !self.model.is_feasible() {
                    self.model.reset_variable_feasibility_improvabilities();
                    self.model.update_variable_feasibility_improvabilities_all();
                }
            }
            let feasible = self.model.is_feasible();
            self.neighborhood.update_moves(
                self.model,
                accept_all,
                !accept_all && feasible,
                !accept_all && !feasible,
                self.options.is_enabled_parallel_neighborhood_update,
            );

            if self.neighborhood.candidates().is_empty() {
                let optimal = self.model.is_feasible()
                    && self
                        .model
                        .variables()
                        .iter()
                        .all(|variable| !variable.is_objective_improvable());
                break if optimal {
                    TerminationStatus::Optimal
                } else {
                    TerminationStatus::NoMove
                };
            }

            // First-improvement scan in index order.
            let mut committed = None;
            for &reference in self.neighborhood.candidates() {
                let mv = self.neighborhood.get(reference);
                let trial = if mv.sense == MoveSense::Selection {
                    self.model.evaluate_selection(&mv.alterations, &current_score)
                } else {
                    self.model.evaluate_move(
                        &mv.alterations,
                        &mv.related_constraint_ids,
                        &current_score,
                    )
                };
                if trial.local_augmented_objective
                    < current_score.local_augmented_objective - EPSILON
                {
                    committed = Some((mv.clone(), trial));
                    break;
                }
            }

            let Some((chosen_move, chosen_score)) = committed else {
                break TerminationStatus::LocalOptimal;
            };

            self.model
                .apply_move(&chosen_move.alterations, &chosen_move.related_constraint_ids);
            self.memory.update(&chosen_move.alterations, iteration);
            current_score = chosen_score;

            let solution = self.model.export_dense_solution(&current_score);
            update_status |= self.incumbent_holder.try_update(&solution, &current_score);
            if current_score.is_feasible && self.options.is_enabled_store_feasible_solutions {
                self.archive.push(solution);
            }

            if iteration % local_options.log_interval.max(1) == 0 {
                debug!(
                    iteration,
                    local_augmented = current_score.local_augmented_objective,
                    feasible_incumbent = self.incumbent_holder.feasible_incumbent_objective(),
                    "local search iteration"
                );
            }

            previous_alterations = Some(chosen_move.alterations.to_vec());
            iteration += 1;
        };

        debug!(%termination_status, iterations = iteration, "local search finished");

        LocalSearchResult {
            termination_status,
            iterations: iteration,
            update_status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_model::constraint::ConstraintSense;
    use cinder_model::ids::VariableId;
    use cinder_model::selection::SelectionMode;
    use std::time::Duration;

    fn run_local_search(model: &mut Model, options: &SolverOptions) -> (LocalSearchResult, IncumbentHolder) {
        model.set_global_penalty_coefficient(options.penalty.initial_penalty_coefficient);
        model.initialize_local_penalty_coefficients(options.penalty.initial_penalty_coefficient);
        let mut neighborhood = Neighborhood::new(model, options);
        let mut incumbent_holder = IncumbentHolder::new();
        let mut memory = Memory::new(model.number_of_variables());
        let mut archive = SolutionArchive::new(10, model.is_minimization());
        let deadline = Instant::now() + Duration::from_secs(60);
        let result = LocalSearchCore::new(
            model,
            &mut neighborhood,
            &mut incumbent_holder,
            &mut memory,
            &mut archive,
            options,
            deadline,
        )
        .run();
        (result, incumbent_holder)
    }

    #[test]
    fn test_descends_to_local_optimum() {
        let mut options = SolverOptions::default();
        options.is_enabled_parallel_neighborhood_update = false;
        options.penalty.initial_penalty_coefficient = 1e4;

        // Minimize x over [0, 100] starting at 100; unconstrained
        // descent must end at the optimum.
        let mut model = Model::new("descent");
        let x = model.add_variable("x", 0, 100).unwrap();
        model.minimize(vec![(x, 1.0)], 0.0);
        model.setup_structure(SelectionMode::Off).unwrap();
        model.import_values(&[100]);

        let (result, incumbent_holder) = run_local_search(&mut model, &options);
        assert_eq!(model.variable(x).value(), 0);
        assert_eq!(incumbent_holder.feasible_incumbent_objective(), 0.0);
        // At the bound no move improves: the scan ends optimal.
        assert!(matches!(
            result.termination_status,
            TerminationStatus::Optimal | TerminationStatus::NoMove
        ));
    }

    #[test]
    fn test_set_partition_descent() {
        let mut options = SolverOptions::default();
        options.is_enabled_parallel_neighborhood_update = false;
        options.penalty.initial_penalty_coefficient = 1e4;

        let mut model = Model::new("partition");
        let ids: Vec<VariableId> = (0..4)
            .map(|index| model.add_binary(format!("x{index}")).unwrap())
            .collect();
        model
            .add_constraint(
                "partition",
                ids.iter().map(|&id| (id, 1.0)).collect(),
                ConstraintSense::Equal,
                1.0,
            )
            .unwrap();
        model.minimize(vec![(ids[1], 1.0), (ids[2], 2.0), (ids[3], 3.0)], 0.0);
        model.setup_structure(SelectionMode::Independent).unwrap();
        model.import_values(&[0, 0, 1, 0]);
        model
            .verify_and_correct_initial_values(true)
            .unwrap();

        let (_, incumbent_holder) = run_local_search(&mut model, &options);
        // The swap chain must land on the zero-cost member.
        assert_eq!(incumbent_holder.feasible_incumbent_objective(), 0.0);
        let values: Vec<i64> = model.variables().iter().map(|v| v.value()).collect();
        assert_eq!(values, vec![1, 0, 0, 0]);
    }
}
