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

//! The solve orchestrator: initial-value correction, the optional dual
//! warm start and local-search descent, then repeated tabu-search
//! sessions with penalty adjustment in between.

use crate::incumbent::{IncumbentHolder, GLOBAL_AUGMENTED_INCUMBENT_UPDATE};
use crate::lagrange::LagrangeDualCore;
use crate::local_search::LocalSearchCore;
use crate::memory::Memory;
use crate::neighborhood::Neighborhood;
use crate::option::SolverOptions;
use crate::presolve::Presolver;
use crate::result::{SolveResult, SolveStatus, TerminationStatus};
use crate::tabu::TabuSearchCore;
use cinder_model::err::ModelError;
use cinder_model::model::Model;
use cinder_model::solution::SolutionArchive;
use std::time::{Duration, Instant};
use tracing::info;

/// Runs the full pipeline on the model with the default (no-op)
/// presolver.
pub fn solve(model: &mut Model, options: &SolverOptions) -> Result<SolveResult, ModelError> {
    solve_with_presolver(model, options, None)
}

pub fn solve_with_presolver(
    model: &mut Model,
    options: &SolverOptions,
    presolver: Option<&dyn Presolver>,
) -> Result<SolveResult, ModelError> {
    let start = Instant::now();
    let deadline = start + Duration::from_secs_f64(options.time_max.max(0.0));

    model.setup_structure(options.selection_mode)?;
    model.verify_and_correct_initial_values(options.is_enabled_initial_value_correction)?;

    if options.is_enabled_presolve {
        if let Some(presolver) = presolver {
            let report = presolver.apply(model)?;
            if report.changed_anything() {
                // The transformer may have invalidated the derived
                // structure.
                model.setup_structure(options.selection_mode)?;
                info!(
                    disabled = report.disabled_constraints,
                    fixed = report.fixed_variables,
                    tightened = report.tightened_bounds,
                    "presolve rewrote the model"
                );
            }
        }
    }

    model.set_global_penalty_coefficient(options.penalty.initial_penalty_coefficient);
    model.initialize_local_penalty_coefficients(options.penalty.initial_penalty_coefficient);

    let naive_dual_bound = model.compute_naive_dual_bound();
    info!(
        name = model.name(),
        variables = model.number_of_variables(),
        constraints = model.number_of_constraints(),
        selections = model.selections().len(),
        naive_dual_bound,
        "solve starts"
    );

    let mut neighborhood = Neighborhood::new(model, options);
    let mut incumbent_holder = IncumbentHolder::new();
    let mut memory = Memory::new(model.number_of_variables());
    let mut archive = SolutionArchive::new(
        options.feasible_solutions_capacity,
        model.is_minimization(),
    );

    let mut lagrangian_coefficients: Option<Vec<f64>> = None;
    if options.is_enabled_lagrange_dual {
        let result = LagrangeDualCore::new(
            model,
            &mut incumbent_holder,
            &mut archive,
            options,
            deadline,
        )
        .run();
        info!(status = %result.termination_status, lagrangian = result.lagrangian, "dual warm start finished");
        lagrangian_coefficients = Some(result.lagrangian_coefficients);
        restore_incumbent(model, &incumbent_holder);
    }

    if options.is_enabled_local_search {
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
        info!(status = %result.termination_status, iterations = result.iterations, "local search finished");
    }

    let mut total_tabu_iterations = 0usize;
    let mut outer_iteration = 0usize;
    let mut termination = TerminationStatus::IterationOver;

    while outer_iteration < options.iteration_max {
        if Instant::now() >= deadline {
            termination = TerminationStatus::TimeOver;
            break;
        }

        let mut core = TabuSearchCore::new(
            model,
            &mut neighborhood,
            &mut incumbent_holder,
            &mut memory,
            &mut archive,
            options,
            deadline,
        );
        if let Some(coefficients) = &lagrangian_coefficients {
            core.set_lagrangian_coefficients(coefficients);
        }
        let result = core.run();
        total_tabu_iterations += result.iterations;
        termination = result.termination_status;

        info!(
            outer_iteration,
            status = %result.termination_status,
            iterations = result.iterations,
            feasible_incumbent = incumbent_holder.feasible_incumbent_objective() * model.sign(),
            "tabu search session finished"
        );

        match result.termination_status {
            TerminationStatus::Optimal
            | TerminationStatus::ReachTarget
            | TerminationStatus::TimeOver => break,
            _ => {}
        }

        // Between sessions: restart from the best-known point and bias
        // the penalty weights by what the last session achieved.
        restore_incumbent(model, &incumbent_holder);
        let rate = if result.update_status & GLOBAL_AUGMENTED_INCUMBENT_UPDATE != 0 {
            options.penalty.penalty_coefficient_relaxing_rate
        } else {
            options.penalty.penalty_coefficient_tightening_rate
        };
        let coefficient = (model.global_penalty_coefficient() * rate).max(1.0);
        model.set_global_penalty_coefficient(coefficient);
        for constraint in model.constraints_mut() {
            constraint.scale_local_penalty_coefficients(rate);
        }

        outer_iteration += 1;
    }

    restore_incumbent(model, &incumbent_holder);
    let solution = model.export_named_solution();
    let status = SolveStatus {
        termination,
        is_found_feasible: incumbent_holder.has_feasible_incumbent(),
        objective: solution.objective,
        total_violation: solution.total_violation,
        naive_dual_bound,
        outer_iterations: outer_iteration,
        total_tabu_iterations,
        elapsed: start.elapsed(),
    };
    info!(
        termination = %status.termination,
        objective = status.objective,
        violation = status.total_violation,
        feasible = status.is_found_feasible,
        elapsed = ?status.elapsed,
        "solve finished"
    );

    Ok(SolveResult {
        solution,
        status,
        feasible_solution_archive: archive,
    })
}

/// Loads the best-known solution back into the model: the feasible
/// incumbent when one exists, the global augmented incumbent otherwise.
fn restore_incumbent(model: &mut Model, incumbent_holder: &IncumbentHolder) {
    let values = incumbent_holder
        .feasible_incumbent()
        .or_else(|| incumbent_holder.global_augmented_incumbent())
        .map(|solution| solution.variable_values.clone());
    if let Some(values) = values {
        model.import_values(&values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_model::constraint::ConstraintSense;
    use cinder_model::ids::VariableId;

    fn fast_options() -> SolverOptions {
        let mut options = SolverOptions::default();
        options.iteration_max = 3;
        options.tabu_search.iteration_max = 300;
        options.is_enabled_parallel_evaluation = false;
        options.is_enabled_parallel_neighborhood_update = false;
        options.penalty.initial_penalty_coefficient = 1e4;
        options
    }

    #[test]
    fn test_solves_the_four_variable_partition() {
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
        model.variables_mut()[0].set_value_silently(1);

        let result = solve(&mut model, &fast_options()).unwrap();
        assert!(result.status.is_found_feasible);
        assert_eq!(result.status.objective, 0.0);
        assert_eq!(result.status.total_violation, 0.0);

        let values: Vec<i64> = result
            .solution
            .variables
            .iter()
            .map(|variable| variable.value)
            .collect();
        assert_eq!(values, vec![1, 0, 0, 0]);
    }

    #[test]
    fn test_knapsack_with_archive_and_target() {
        let mut options = fast_options();
        options.is_enabled_store_feasible_solutions = true;
        options.target_objective_value = -5.0;
        options.tabu_search.iteration_max = 1000;

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

        let result = solve(&mut model, &options).unwrap();
        assert_eq!(result.status.termination, TerminationStatus::ReachTarget);
        assert!(result.status.is_found_feasible);
        assert!(result.status.objective <= -5.0 + 1e-9);
        assert!(!result.feasible_solution_archive.is_empty());
        assert!(result.solution.is_feasible);
    }

    #[test]
    fn test_infeasible_start_is_corrected_or_rejected() {
        let mut model = Model::new("clamp");
        let x = model.add_variable("x", 0, 5).unwrap();
        model.minimize(vec![(x, 1.0)], 0.0);
        model.variables_mut()[0].set_value_silently(99);

        let mut options = fast_options();
        options.iteration_max = 1;
        options.tabu_search.iteration_max = 10;
        let result = solve(&mut model, &options).unwrap();
        assert!(result.status.is_found_feasible);

        let mut rejected = Model::new("reject");
        let y = rejected.add_variable("y", 0, 5).unwrap();
        rejected.minimize(vec![(y, 1.0)], 0.0);
        rejected.variables_mut()[0].set_value_silently(99);
        let mut strict = fast_options();
        strict.is_enabled_initial_value_correction = false;
        assert!(solve(&mut rejected, &strict).is_err());
    }

    #[test]
    fn test_dual_warm_start_feeds_the_tabu_core() {
        let mut options = fast_options();
        options.is_enabled_lagrange_dual = true;
        options.lagrange_dual.iteration_max = 200;

        let mut model = Model::new("warm");
        let x = model.add_binary("x").unwrap();
        let y = model.add_binary("y").unwrap();
        model
            .add_constraint("cap", vec![(x, 1.0), (y, 1.0)], ConstraintSense::Less, 1.0)
            .unwrap();
        model.minimize(vec![(x, -2.0), (y, -1.0)], 0.0);

        let result = solve(&mut model, &options).unwrap();
        assert!(result.status.is_found_feasible);
        assert_eq!(result.status.objective, -2.0);
    }
}
