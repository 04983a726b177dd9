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

use crate::incumbent::{
    IncumbentHolder, FEASIBLE_INCUMBENT_UPDATE, GLOBAL_AUGMENTED_INCUMBENT_UPDATE,
};
use crate::memory::Memory;
use crate::neighborhood::chain::keeps_chain_effective_constraints_feasible;
use crate::neighborhood::{Move, MoveSense, Neighborhood};
use crate::option::{ImprovabilityScreeningMode, SolverOptions, DEFAULT_TABU_TENURE_MAX_GROWTH};
use crate::result::TerminationStatus;
use cinder_core::num::EPSILON;
use cinder_model::model::Model;
use cinder_model::score::SolutionScore;
use cinder_model::solution::SolutionArchive;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::time::Instant;
use tracing::debug;

/// Tabu bookkeeping of one scored candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct TabuMoveScore {
    pub is_permissible: bool,
    pub frequency_penalty: f64,
    pub lagrangian_penalty: f64,
}

/// Outcome of one tabu-search session.
#[derive(Debug, Clone, Copy)]
pub struct TabuSearchResult {
    pub termination_status: TerminationStatus,
    pub iterations: usize,
    pub update_status: u8,
    pub tabu_tenure: usize,
}

/// The primary search core: best-admissible moves under adaptive tabu
/// tenure, aspiration, and penalty-coefficient adaptation.
pub struct TabuSearchCore<'a> {
    model: &'a mut Model,
    neighborhood: &'a mut Neighborhood,
    incumbent_holder: &'a mut IncumbentHolder,
    memory: &'a mut Memory,
    archive: &'a mut SolutionArchive,
    options: &'a SolverOptions,
    lagrangian_coefficients: Option<&'a [f64]>,
    deadline: Instant,
}

impl<'a> TabuSearchCore<'a> {
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
            lagrangian_coefficients: None,
            deadline,
        }
    }

    pub fn set_lagrangian_coefficients(&mut self, coefficients: &'a [f64]) {
        self.lagrangian_coefficients = Some(coefficients);
    }

    fn has_target(&self) -> bool {
        self.options.target_objective_value > crate::option::DEFAULT_TARGET_OBJECTIVE + 1.0
    }

    fn reached_target(&self) -> bool {
        self.has_target()
            && self.incumbent_holder.feasible_incumbent_objective()
                <= self.options.target_objective_value * self.model.sign()
    }

    /// Refreshes improvability flags and derives the acceptance hints
    /// for the generators: objective-improvable moves while feasible,
    /// feasibility-improvable moves while infeasible.
    fn update_improvabilities(
        &mut self,
        previous_alterations: Option<&[cinder_model::expression::Alteration]>,
    ) -> (bool, bool, bool) {
        if self.options.improvability_screening_mode == ImprovabilityScreeningMode::Off {
            return (true, false, false);
        }

        match previous_alterations {
            None => self.model.update_variable_objective_improvabilities_all(),
            Some(alterations) => {
                let ids: Vec<_> = alterations.iter().map(|&(id, _)| id).collect();
                self.model.update_variable_objective_improvabilities(&ids);
            }
        }

        if self.model.is_feasible() {
            return (false, true, false);
        }

        self.model.reset_variable_feasibility_improvabilities();
        let aggressive = match self.options.improvability_screening_mode {
            ImprovabilityScreeningMode::Aggressive | ImprovabilityScreeningMode::Automatic => true,
            _ => false,
        };
        if aggressive {
            let violative = self.model.violative_constraint_ids().to_vec();
            self.model
                .update_variable_feasibility_improvabilities(&violative);
        } else {
            self.model.update_variable_feasibility_improvabilities_all();
        }
        (false, false, true)
    }

    fn evaluate_candidate(&self, mv: &Move, current_score: &SolutionScore) -> SolutionScore {
        if mv.sense == MoveSense::Selection {
            self.model.evaluate_selection(&mv.alterations, current_score)
        } else {
            self.model
                .evaluate_move(&mv.alterations, &mv.related_constraint_ids, current_score)
        }
    }

    fn tabu_score(&self, mv: &Move, trial: &SolutionScore, iteration: usize, tenure: usize) -> TabuMoveScore {
        let frequency_penalty = self.options.tabu_search.frequency_penalty_coefficient
            * self.memory.frequency_penalty(&mv.alterations, iteration);

        let lagrangian_penalty = match self.lagrangian_coefficients {
            Some(coefficients) => {
                self.options.tabu_search.lagrangian_penalty_coefficient
                    * mv.alterations
                        .iter()
                        .map(|&(id, target)| {
                            coefficients[id.index()]
                                * (target - self.model.variable(id).value()) as f64
                        })
                        .sum::<f64>()
            }
            None => 0.0,
        };

        let is_tabu = self
            .memory
            .is_move_tabu(&mv.alterations, iteration, tenure);
        let beats_global = trial.global_augmented_objective
            < self.incumbent_holder.global_augmented_incumbent_objective() - EPSILON;
        let beats_feasible = trial.is_feasible
            && trial.objective < self.incumbent_holder.feasible_incumbent_objective() - EPSILON;
        let is_permissible = !is_tabu || beats_global || beats_feasible;

        TabuMoveScore {
            is_permissible,
            frequency_penalty,
            lagrangian_penalty,
        }
    }

    pub fn run(&mut self) -> TabuSearchResult {
        let start = Instant::now();
        let tabu_options = &self.options.tabu_search;

        self.incumbent_holder.reset_local_augmented_incumbent();
        self.memory.reset_last_update_iterations();
        let mut rng = ChaCha8Rng::seed_from_u64(tabu_options.seed);

        self.model.update();
        let mut current_score = self.model.evaluate_current();
        let initial_solution = self.model.export_dense_solution(&current_score);
        let mut update_status = self
            .incumbent_holder
            .try_update(&initial_solution, &current_score);

        let mut tenure = tabu_options.initial_tabu_tenure.max(1);
        let tenure_cap = tabu_options.initial_tabu_tenure.max(1) * DEFAULT_TABU_TENURE_MAX_GROWTH;
        let mut no_improvement_count = 0usize;
        let mut previous_accepted: Option<Move> = None;
        let mut iteration = 0usize;

        let termination_status = loop {
            if start.elapsed().as_secs_f64()
                > tabu_options.time_max - tabu_options.time_offset
                || Instant::now() >= self.deadline
            {
                break TerminationStatus::TimeOver;
            }
            if iteration >= tabu_options.iteration_max {
                break TerminationStatus::IterationOver;
            }
            if self.reached_target() {
                break TerminationStatus::ReachTarget;
            }

            let (accept_all, accept_objective, accept_feasibility) = self.update_improvabilities(
                previous_accepted
                    .as_ref()
                    .map(|mv| mv.alterations.as_slice()),
            );
            self.neighborhood.update_moves(
                self.model,
                accept_all,
                accept_objective,
                accept_feasibility,
                self.options.is_enabled_parallel_neighborhood_update,
            );
            if tabu_options.is_enabled_shuffle {
                self.neighborhood.shuffle_candidates(&mut rng);
            }

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

            // Parallel scoring; the best-move selection stays a second
            // sequential pass so ties break by index deterministically.
            let neighborhood = &*self.neighborhood;
            let candidates = neighborhood.candidates();
            let score_one = |&reference| {
                let mv = neighborhood.get(reference);
                let trial = self.evaluate_candidate(mv, &current_score);
                let tabu = self.tabu_score(mv, &trial, iteration, tenure);
                (trial, tabu)
            };
            let scored: Vec<(SolutionScore, TabuMoveScore)> =
                if self.options.is_enabled_parallel_evaluation {
                    candidates.par_iter().map(score_one).collect()
                } else {
                    candidates.iter().map(score_one).collect()
                };

            let effective_cost = |index: usize| {
                let (trial, tabu) = &scored[index];
                trial.local_augmented_objective + tabu.frequency_penalty + tabu.lagrangian_penalty
            };
            let mut best_permissible: Option<usize> = None;
            let mut best_any: Option<usize> = None;
            for index in 0..scored.len() {
                if best_any.map_or(true, |best| effective_cost(index) < effective_cost(best)) {
                    best_any = Some(index);
                }
                if scored[index].1.is_permissible
                    && best_permissible
                        .map_or(true, |best| effective_cost(index) < effective_cost(best))
                {
                    best_permissible = Some(index);
                }
            }

            let chosen_index = match best_permissible {
                Some(index) => index,
                None if tabu_options.ignore_tabu_if_global_incumbent => {
                    best_any.expect("candidate list is non-empty")
                }
                None => break TerminationStatus::LocalOptimal,
            };

            let chosen_move = self
                .neighborhood
                .get(self.neighborhood.candidates()[chosen_index])
                .clone();
            let chosen_score = scored[chosen_index].0;

            self.model
                .apply_move(&chosen_move.alterations, &chosen_move.related_constraint_ids);
            self.memory.update(&chosen_move.alterations, iteration);
            current_score = chosen_score;

            let solution = self.model.export_dense_solution(&current_score);
            let status = self.incumbent_holder.try_update(&solution, &current_score);
            update_status |= status;

            if current_score.is_feasible && self.options.is_enabled_store_feasible_solutions {
                self.archive.push(solution);
            }

            if self.neighborhood.is_chain_enabled() {
                if let Some(previous) = &previous_accepted {
                    if keeps_chain_effective_constraints_feasible(&chosen_move, self.model)
                        && keeps_chain_effective_constraints_feasible(previous, self.model)
                    {
                        self.neighborhood
                            .chain_mut()
                            .register(previous, &chosen_move, self.model);
                        if self.neighborhood.chain().len() > self.options.chain_move_capacity {
                            self.neighborhood.chain_mut().reduce(&mut rng);
                        }
                    }
                }
            }
            previous_accepted = Some(chosen_move);

            if status & (GLOBAL_AUGMENTED_INCUMBENT_UPDATE | FEASIBLE_INCUMBENT_UPDATE) != 0 {
                no_improvement_count = 0;
                let relaxed = (self.model.global_penalty_coefficient()
                    * self.options.penalty.penalty_coefficient_relaxing_rate)
                    .max(1.0);
                self.model.set_global_penalty_coefficient(relaxed);
                for constraint in self.model.constraints_mut() {
                    constraint.scale_local_penalty_coefficients(
                        self.options.penalty.penalty_coefficient_relaxing_rate,
                    );
                }
                if tabu_options.is_enabled_automatic_tabu_tenure_adjustment {
                    tenure = tenure.saturating_sub(1).max(1);
                }
            } else {
                no_improvement_count += 1;
                if no_improvement_count >= tabu_options.penalty_adjustment_interval {
                    no_improvement_count = 0;
                    let tightened = self.model.global_penalty_coefficient()
                        * self.options.penalty.penalty_coefficient_tightening_rate;
                    self.model.set_global_penalty_coefficient(tightened);
                    for constraint in self.model.constraints_mut() {
                        constraint.scale_local_penalty_coefficients(
                            self.options.penalty.penalty_coefficient_tightening_rate,
                        );
                    }
                    if tabu_options.is_enabled_automatic_tabu_tenure_adjustment {
                        tenure = (tenure + 1).min(tenure_cap);
                    }
                }
            }

            if iteration % tabu_options.log_interval.max(1) == 0 || status > 1 {
                debug!(
                    iteration,
                    candidates = self.neighborhood.candidates().len(),
                    local_augmented = current_score.local_augmented_objective,
                    global_incumbent =
                        self.incumbent_holder.global_augmented_incumbent_objective(),
                    feasible_incumbent = self.incumbent_holder.feasible_incumbent_objective(),
                    tenure,
                    "tabu search iteration"
                );
            }

            iteration += 1;
        };

        debug!(
            %termination_status,
            iterations = iteration,
            "tabu search finished"
        );

        TabuSearchResult {
            termination_status,
            iterations: iteration,
            update_status,
            tabu_tenure: tenure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_model::constraint::ConstraintSense;
    use cinder_model::ids::VariableId;
    use cinder_model::selection::SelectionMode;

    struct Harness {
        model: Model,
        options: SolverOptions,
        incumbent_holder: IncumbentHolder,
        memory: Memory,
        archive: SolutionArchive,
    }

    impl Harness {
        fn new(model: Model, options: SolverOptions) -> Self {
            let memory = Memory::new(model.number_of_variables());
            let archive = SolutionArchive::new(
                options.feasible_solutions_capacity,
                model.is_minimization(),
            );
            Self {
                model,
                options,
                incumbent_holder: IncumbentHolder::new(),
                memory,
                archive,
            }
        }

        fn run(&mut self) -> TabuSearchResult {
            let mut neighborhood = Neighborhood::new(&self.model, &self.options);
            let deadline = Instant::now() + std::time::Duration::from_secs(60);
            let mut core = TabuSearchCore::new(
                &mut self.model,
                &mut neighborhood,
                &mut self.incumbent_holder,
                &mut self.memory,
                &mut self.archive,
                &self.options,
                deadline,
            );
            core.run()
        }
    }

    fn base_options() -> SolverOptions {
        let mut options = SolverOptions::default();
        options.is_enabled_parallel_evaluation = false;
        options.is_enabled_parallel_neighborhood_update = false;
        options.penalty.initial_penalty_coefficient = 1e4;
        options
    }

    fn apply_penalties(model: &mut Model, options: &SolverOptions) {
        model.set_global_penalty_coefficient(options.penalty.initial_penalty_coefficient);
        model.initialize_local_penalty_coefficients(options.penalty.initial_penalty_coefficient);
    }

    fn knapsack_model() -> Model {
        let mut model = Model::new("knapsack");
        let ids: Vec<VariableId> = (0..5)
            .map(|index| model.add_variable(format!("x{index}"), 0, 5).unwrap())
            .collect();
        let weights = [2.0, 3.0, 4.0, 5.0, 6.0];
        model
            .add_constraint(
                "capacity",
                ids.iter().zip(weights).map(|(&id, w)| (id, w)).collect(),
                ConstraintSense::Less,
                10.0,
            )
            .unwrap();
        model.minimize(ids.iter().map(|&id| (id, -1.0)).collect(), 0.0);
        model.setup_structure(SelectionMode::Off).unwrap();
        model
    }

    #[test]
    fn test_integer_knapsack_reaches_minus_five() {
        let mut options = base_options();
        options.tabu_search.iteration_max = 1000;
        let mut model = knapsack_model();
        apply_penalties(&mut model, &options);

        let mut harness = Harness::new(model, options);
        harness.run();

        assert!(harness.incumbent_holder.has_feasible_incumbent());
        assert!(
            harness.incumbent_holder.feasible_incumbent_objective() <= -5.0 + 1e-9,
            "expected an objective of -5 or better, got {}",
            harness.incumbent_holder.feasible_incumbent_objective()
        );
        assert!(harness.incumbent_holder.feasible_incumbent_score().is_feasible);
    }

    #[test]
    fn test_termination_on_reachable_target() {
        let mut options = base_options();
        options.tabu_search.iteration_max = 1000;
        options.target_objective_value = -3.0;
        let mut model = knapsack_model();
        apply_penalties(&mut model, &options);

        let mut harness = Harness::new(model, options);
        let result = harness.run();

        assert_eq!(result.termination_status, TerminationStatus::ReachTarget);
        assert!(harness.incumbent_holder.feasible_incumbent_score().is_feasible);
        assert!(harness.incumbent_holder.feasible_incumbent_objective() <= -3.0 + 1e-9);
    }

    #[test]
    fn test_penalty_coefficient_tightens_after_non_improving_run() {
        // Maximize the sum against a partition row: after the feasible
        // optimum is reached the incumbents stop improving and the
        // tightening trigger must fire.
        let mut options = base_options();
        options.penalty.initial_penalty_coefficient = 10.0;
        options.penalty.penalty_coefficient_tightening_rate = 1.1;
        options.penalty.penalty_coefficient_relaxing_rate = 1.0;
        options.tabu_search.iteration_max = 400;
        options.tabu_search.penalty_adjustment_interval = 100;
        options.is_enabled_chain_move = false;

        let mut model = Model::new("partition");
        let ids: Vec<VariableId> = (0..5)
            .map(|index| model.add_binary(format!("x{index}")).unwrap())
            .collect();
        model
            .add_constraint(
                "one",
                ids.iter().map(|&id| (id, 1.0)).collect(),
                ConstraintSense::Equal,
                1.0,
            )
            .unwrap();
        model.maximize(ids.iter().map(|&id| (id, 1.0)).collect(), 0.0);
        model.setup_structure(SelectionMode::Off).unwrap();
        apply_penalties(&mut model, &options);
        // All five at 1: the row is initially violated at 5.
        model.import_values(&[1, 1, 1, 1, 1]);

        let mut harness = Harness::new(model, options);
        harness.run();

        assert!(
            harness.model.global_penalty_coefficient() > 10.0,
            "tightening rate above one must strictly raise the coefficient, got {}",
            harness.model.global_penalty_coefficient()
        );
    }

    #[test]
    fn test_aspiration_overrides_tabu_for_new_feasible_incumbent() {
        let mut options = base_options();
        options.tabu_search.iteration_max = 2;
        options.tabu_search.initial_tabu_tenure = 100;
        options.tabu_search.is_enabled_shuffle = false;
        options.improvability_screening_mode = ImprovabilityScreeningMode::Off;

        let mut model = Model::new("aspiration");
        let x = model.add_binary("x").unwrap();
        model.minimize(vec![(x, -1.0)], 0.0);
        model.setup_structure(SelectionMode::Off).unwrap();
        apply_penalties(&mut model, &options);
        model.import_values(&[0]);

        let mut harness = Harness::new(model, options);
        // Pre-stamp the variable so it is tabu from iteration zero.
        harness.memory.update(&[(x, 0)], 0);

        let result = harness.run();

        // The flip to 1 is tabu but creates a new feasible incumbent,
        // so aspiration must accept it and report the feasible bit.
        assert_ne!(result.update_status & FEASIBLE_INCUMBENT_UPDATE, 0);
        assert_eq!(harness.incumbent_holder.feasible_incumbent_objective(), -1.0);
    }
}
