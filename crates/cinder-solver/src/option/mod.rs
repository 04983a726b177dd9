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

//! Solver configuration.
//!
//! Every numeric key carries a documented default; an option file may
//! specify any subset of the keys and unknown keys are ignored.

pub mod enums;

pub use enums::{ChainMoveReduceMode, ImprovabilityScreeningMode, Verbose};

use cinder_model::selection::SelectionMode;
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_ITERATION_MAX: usize = 100;
pub const DEFAULT_TIME_MAX: f64 = 120.0;
pub const DEFAULT_TIME_OFFSET: f64 = 0.0;
pub const DEFAULT_TARGET_OBJECTIVE: f64 = -1e100;
pub const DEFAULT_SEED: u64 = 1;
pub const DEFAULT_CHAIN_MOVE_CAPACITY: usize = 10_000;
pub const DEFAULT_CHAIN_MOVE_OVERLAP_RATE_THRESHOLD: f64 = 0.2;
pub const DEFAULT_FEASIBLE_SOLUTIONS_CAPACITY: usize = 1_000;

pub const DEFAULT_INITIAL_PENALTY_COEFFICIENT: f64 = 1e7;
pub const DEFAULT_PENALTY_COEFFICIENT_RELAXING_RATE: f64 = 0.9;
pub const DEFAULT_PENALTY_COEFFICIENT_TIGHTENING_RATE: f64 = 1.0;

pub const DEFAULT_TABU_SEARCH_ITERATION_MAX: usize = 200;
pub const DEFAULT_INITIAL_TABU_TENURE: usize = 10;
pub const DEFAULT_TABU_TENURE_MAX_GROWTH: usize = 4;
pub const DEFAULT_PENALTY_ADJUSTMENT_INTERVAL: usize = 100;
pub const DEFAULT_FREQUENCY_PENALTY_COEFFICIENT: f64 = 1e-4;
pub const DEFAULT_LAGRANGIAN_PENALTY_COEFFICIENT: f64 = 1.0;
pub const DEFAULT_LOG_INTERVAL: usize = 10;

pub const DEFAULT_LOCAL_SEARCH_ITERATION_MAX: usize = 10_000;

pub const DEFAULT_LAGRANGE_DUAL_ITERATION_MAX: usize = 10_000;
pub const DEFAULT_STEP_SIZE_EXTEND_RATE: f64 = 1.05;
pub const DEFAULT_STEP_SIZE_REDUCE_RATE: f64 = 0.95;
pub const DEFAULT_QUEUE_SIZE: usize = 100;
pub const DEFAULT_CONVERGENCE_TOLERANCE: f64 = 1e-5;

/// Penalty-coefficient management.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PenaltyOptions {
    pub initial_penalty_coefficient: f64,
    pub penalty_coefficient_relaxing_rate: f64,
    pub penalty_coefficient_tightening_rate: f64,
}

impl Default for PenaltyOptions {
    fn default() -> Self {
        Self {
            initial_penalty_coefficient: DEFAULT_INITIAL_PENALTY_COEFFICIENT,
            penalty_coefficient_relaxing_rate: DEFAULT_PENALTY_COEFFICIENT_RELAXING_RATE,
            penalty_coefficient_tightening_rate: DEFAULT_PENALTY_COEFFICIENT_TIGHTENING_RATE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TabuSearchOptions {
    pub iteration_max: usize,
    pub time_max: f64,
    pub time_offset: f64,
    pub initial_tabu_tenure: usize,
    pub is_enabled_automatic_tabu_tenure_adjustment: bool,
    pub is_enabled_shuffle: bool,
    pub ignore_tabu_if_global_incumbent: bool,
    pub penalty_adjustment_interval: usize,
    pub frequency_penalty_coefficient: f64,
    pub lagrangian_penalty_coefficient: f64,
    pub log_interval: usize,
    pub seed: u64,
}

impl Default for TabuSearchOptions {
    fn default() -> Self {
        Self {
            iteration_max: DEFAULT_TABU_SEARCH_ITERATION_MAX,
            time_max: DEFAULT_TIME_MAX,
            time_offset: DEFAULT_TIME_OFFSET,
            initial_tabu_tenure: DEFAULT_INITIAL_TABU_TENURE,
            is_enabled_automatic_tabu_tenure_adjustment: true,
            is_enabled_shuffle: true,
            ignore_tabu_if_global_incumbent: true,
            penalty_adjustment_interval: DEFAULT_PENALTY_ADJUSTMENT_INTERVAL,
            frequency_penalty_coefficient: DEFAULT_FREQUENCY_PENALTY_COEFFICIENT,
            lagrangian_penalty_coefficient: DEFAULT_LAGRANGIAN_PENALTY_COEFFICIENT,
            log_interval: DEFAULT_LOG_INTERVAL,
            seed: DEFAULT_SEED,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalSearchOptions {
    pub iteration_max: usize,
    pub time_max: f64,
    pub time_offset: f64,
    pub log_interval: usize,
    pub seed: u64,
}

impl Default for LocalSearchOptions {
    fn default() -> Self {
        Self {
            iteration_max: DEFAULT_LOCAL_SEARCH_ITERATION_MAX,
            time_max: DEFAULT_TIME_MAX,
            time_offset: DEFAULT_TIME_OFFSET,
            log_interval: DEFAULT_LOG_INTERVAL,
            seed: DEFAULT_SEED,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LagrangeDualOptions {
    pub iteration_max: usize,
    pub time_max: f64,
    pub time_offset: f64,
    pub step_size_extend_rate: f64,
    pub step_size_reduce_rate: f64,
    pub queue_size: usize,
    pub tolerance: f64,
    pub log_interval: usize,
}

impl Default for LagrangeDualOptions {
    fn default() -> Self {
        Self {
            iteration_max: DEFAULT_LAGRANGE_DUAL_ITERATION_MAX,
            time_max: DEFAULT_TIME_MAX,
            time_offset: DEFAULT_TIME_OFFSET,
            step_size_extend_rate: DEFAULT_STEP_SIZE_EXTEND_RATE,
            step_size_reduce_rate: DEFAULT_STEP_SIZE_REDUCE_RATE,
            queue_size: DEFAULT_QUEUE_SIZE,
            tolerance: DEFAULT_CONVERGENCE_TOLERANCE,
            log_interval: DEFAULT_LOG_INTERVAL,
        }
    }
}

/// Top-level solver options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    pub iteration_max: usize,
    pub time_max: f64,
    pub time_offset: f64,
    pub target_objective_value: f64,
    pub seed: u64,
    pub verbose: Verbose,

    pub is_enabled_lagrange_dual: bool,
    pub is_enabled_local_search: bool,
    pub is_enabled_presolve: bool,
    pub is_enabled_initial_value_correction: bool,
    pub is_enabled_parallel_evaluation: bool,
    pub is_enabled_parallel_neighborhood_update: bool,

    pub is_enabled_binary_move: bool,
    pub is_enabled_integer_move: bool,
    pub is_enabled_aggregation_move: bool,
    pub is_enabled_precedence_move: bool,
    pub is_enabled_variable_bound_move: bool,
    pub is_enabled_exclusive_or_move: bool,
    pub is_enabled_exclusive_nor_move: bool,
    pub is_enabled_inverted_integers_move: bool,
    pub is_enabled_balanced_integers_move: bool,
    pub is_enabled_constant_sum_integers_move: bool,
    pub is_enabled_constant_difference_integers_move: bool,
    pub is_enabled_constant_ratio_integers_move: bool,
    pub is_enabled_soft_selection_move: bool,
    pub is_enabled_chain_move: bool,
    pub is_enabled_two_flip_move: bool,
    pub is_enabled_user_defined_move: bool,

    pub chain_move_capacity: usize,
    pub chain_move_reduce_mode: ChainMoveReduceMode,
    pub chain_move_overlap_rate_threshold: f64,

    pub selection_mode: SelectionMode,
    pub improvability_screening_mode: ImprovabilityScreeningMode,

    pub is_enabled_store_feasible_solutions: bool,
    pub feasible_solutions_capacity: usize,

    pub penalty: PenaltyOptions,
    pub tabu_search: TabuSearchOptions,
    pub local_search: LocalSearchOptions,
    pub lagrange_dual: LagrangeDualOptions,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            iteration_max: DEFAULT_ITERATION_MAX,
            time_max: DEFAULT_TIME_MAX,
            time_offset: DEFAULT_TIME_OFFSET,
            target_objective_value: DEFAULT_TARGET_OBJECTIVE,
            seed: DEFAULT_SEED,
            verbose: Verbose::None,
            is_enabled_lagrange_dual: false,
            is_enabled_local_search: true,
            is_enabled_presolve: true,
            is_enabled_initial_value_correction: true,
            is_enabled_parallel_evaluation: true,
            is_enabled_parallel_neighborhood_update: true,
            is_enabled_binary_move: true,
            is_enabled_integer_move: true,
            is_enabled_aggregation_move: true,
            is_enabled_precedence_move: false,
            is_enabled_variable_bound_move: false,
            is_enabled_exclusive_or_move: false,
            is_enabled_exclusive_nor_move: false,
            is_enabled_inverted_integers_move: false,
            is_enabled_balanced_integers_move: false,
            is_enabled_constant_sum_integers_move: false,
            is_enabled_constant_difference_integers_move: false,
            is_enabled_constant_ratio_integers_move: false,
            is_enabled_soft_selection_move: false,
            is_enabled_chain_move: true,
            is_enabled_two_flip_move: false,
            is_enabled_user_defined_move: false,
            chain_move_capacity: DEFAULT_CHAIN_MOVE_CAPACITY,
            chain_move_reduce_mode: ChainMoveReduceMode::OverlapRate,
            chain_move_overlap_rate_threshold: DEFAULT_CHAIN_MOVE_OVERLAP_RATE_THRESHOLD,
            selection_mode: SelectionMode::Independent,
            improvability_screening_mode: ImprovabilityScreeningMode::Automatic,
            is_enabled_store_feasible_solutions: false,
            feasible_solutions_capacity: DEFAULT_FEASIBLE_SOLUTIONS_CAPACITY,
            penalty: PenaltyOptions::default(),
            tabu_search: TabuSearchOptions::default(),
            local_search: LocalSearchOptions::default(),
            lagrange_dual: LagrangeDualOptions::default(),
        }
    }
}

impl SolverOptions {
    /// Loads options from a JSON file; absent keys keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|error| format!("cannot read option file: {error}"))?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self, String> {
        serde_json::from_str(content).map_err(|error| format!("invalid option file: {error}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = SolverOptions::default();
        assert_eq!(options.iteration_max, 100);
        assert_eq!(options.time_max, 120.0);
        assert!(options.is_enabled_local_search);
        assert!(!options.is_enabled_lagrange_dual);
        assert_eq!(options.penalty.initial_penalty_coefficient, 1e7);
        assert_eq!(options.tabu_search.initial_tabu_tenure, 10);
        assert_eq!(options.lagrange_dual.queue_size, 100);
        assert_eq!(options.selection_mode, SelectionMode::Independent);
    }

    #[test]
    fn test_partial_json_overrides_only_named_keys() {
        let options = SolverOptions::from_json_str(
            r#"{
                "iteration_max": 5,
                "verbose": "full",
                "selection_mode": "off",
                "penalty": { "initial_penalty_coefficient": 100.0 },
                "tabu_search": { "initial_tabu_tenure": 3 }
            }"#,
        )
        .unwrap();
        assert_eq!(options.iteration_max, 5);
        assert_eq!(options.verbose, Verbose::Full);
        assert_eq!(options.selection_mode, SelectionMode::Off);
        assert_eq!(options.penalty.initial_penalty_coefficient, 100.0);
        assert_eq!(options.penalty.penalty_coefficient_relaxing_rate, 0.9);
        assert_eq!(options.tabu_search.initial_tabu_tenure, 3);
        assert_eq!(options.tabu_search.iteration_max, 200);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let options = SolverOptions::from_json_str(r#"{ "no_such_key": 1 }"#).unwrap();
        assert_eq!(options.iteration_max, 100);
    }
}
