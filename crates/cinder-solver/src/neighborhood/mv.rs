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

use cinder_model::expression::Alteration;
use cinder_model::ids::ConstraintId;
use cinder_model::model::Model;
use cinder_model::variable::VariableSense;
use rayon::prelude::*;
use smallvec::SmallVec;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Structural category of a move, matching the generator that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveSense {
    Binary,
    Integer,
    Selection,
    Aggregation,
    Precedence,
    VariableBound,
    ExclusiveOr,
    ExclusiveNor,
    TrinomialExclusiveNor,
    InvertedIntegers,
    BalancedIntegers,
    ConstantSumIntegers,
    ConstantDifferenceIntegers,
    ConstantRatioIntegers,
    SoftSelection,
    Chain,
    TwoFlip,
    UserDefined,
}

/// One candidate move: an ordered list of variable alterations plus the
/// constraints it touches.
///
/// Invariant: a move that survives filtering targets only non-fixed
/// variables and every new value lies within its variable's bounds.
#[derive(Debug, Clone)]
pub struct Move {
    pub sense: MoveSense,
    pub alterations: SmallVec<[Alteration; 2]>,
    pub related_constraint_ids: Vec<ConstraintId>,
    pub is_univariable: bool,
    pub is_available: bool,
    pub is_special_neighborhood_move: bool,
    pub overlap_rate: f64,
}

impl Move {
    pub fn new(sense: MoveSense) -> Self {
        Self {
            sense,
            alterations: SmallVec::new(),
            related_constraint_ids: Vec::new(),
            is_univariable: false,
            is_available: true,
            is_special_neighborhood_move: false,
            overlap_rate: 0.0,
        }
    }

    /// Stable identity of the move's effect, used by the chain cache to
    /// drop duplicates.
    pub fn state_hash(&self) -> u64 {
        let mut sorted: SmallVec<[Alteration; 4]> =
            self.alterations.iter().copied().collect();
        sorted.sort_unstable();
        let mut hasher = DefaultHasher::new();
        for (variable_id, target) in sorted {
            variable_id.hash(&mut hasher);
            target.hash(&mut hasher);
        }
        hasher.finish()
    }
}

#[inline]
pub fn has_fixed_variable(mv: &Move, model: &Model) -> bool {
    mv.alterations
        .iter()
        .any(|&(variable_id, _)| model.variable(variable_id).is_fixed())
}

#[inline]
pub fn has_bound_violation(mv: &Move, model: &Model) -> bool {
    mv.alterations.iter().any(|&(variable_id, target)| {
        let variable = model.variable(variable_id);
        target < variable.lower_bound() || target > variable.upper_bound()
    })
}

#[inline]
pub fn has_noop_alteration(mv: &Move, model: &Model) -> bool {
    mv.alterations
        .iter()
        .any(|&(variable_id, target)| model.variable(variable_id).value() == target)
}

#[inline]
pub fn has_selection_variable(mv: &Move, model: &Model) -> bool {
    mv.alterations
        .iter()
        .any(|&(variable_id, _)| model.variable(variable_id).sense() == VariableSense::Selection)
}

#[inline]
pub fn has_objective_improvable_variable(mv: &Move, model: &Model) -> bool {
    mv.alterations
        .iter()
        .any(|&(variable_id, _)| model.variable(variable_id).is_objective_improvable())
}

#[inline]
pub fn has_feasibility_improvable_variable(mv: &Move, model: &Model) -> bool {
    mv.alterations
        .iter()
        .any(|&(variable_id, _)| model.variable(variable_id).is_feasibility_improvable())
}

/// Reusable slot + flag storage shared by every generator.
///
/// Slots are allocated once at setup and rewritten every iteration; the
/// flag vector marks the slots that survive filtering.
#[derive(Debug, Clone, Default)]
pub struct MoveStorage {
    pub moves: Vec<Move>,
    pub flags: Vec<u8>,
}

impl MoveStorage {
    pub fn with_moves(moves: Vec<Move>) -> Self {
        let flags = vec![0; moves.len()];
        Self { moves, flags }
    }

    pub fn clear(&mut self) {
        self.moves.clear();
        self.flags.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// The filter pipeline every generator runs after rewriting its
    /// alteration values, short-circuiting on the first failing check:
    /// availability, fixed variables, bound violations, no-op
    /// alterations, then the improvability acceptance hints.
    pub fn update_flags(
        &mut self,
        model: &Model,
        accept_all: bool,
        accept_objective_improvable: bool,
        accept_feasibility_improvable: bool,
        is_enabled_parallel: bool,
    ) {
        let moves = &self.moves;
        let flag_of = |index: usize| -> u8 {
            let mv = &moves[index];
            if !mv.is_available
                || has_fixed_variable(mv, model)
                || has_bound_violation(mv, model)
                || has_noop_alteration(mv, model)
            {
                return 0;
            }
            if accept_all {
                return 1;
            }
            if accept_objective_improvable && has_objective_improvable_variable(mv, model) {
                return 1;
            }
            if accept_feasibility_improvable && has_feasibility_improvable_variable(mv, model) {
                return 1;
            }
            0
        };

        if is_enabled_parallel {
            self.flags
                .par_iter_mut()
                .enumerate()
                .for_each(|(index, flag)| *flag = flag_of(index));
        } else {
            for (index, flag) in self.flags.iter_mut().enumerate() {
                *flag = flag_of(index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_model::constraint::ConstraintSense;
    use cinder_model::ids::VariableId;
    use cinder_model::selection::SelectionMode;

    fn model_with_two_binaries() -> Model {
        let mut model = Model::new("m");
        let x = model.add_binary("x").unwrap();
        let y = model.add_binary("y").unwrap();
        model
            .add_constraint("row", vec![(x, 1.0), (y, 1.0)], ConstraintSense::Less, 1.0)
            .unwrap();
        model.minimize(vec![(x, 1.0), (y, 1.0)], 0.0);
        model.setup_structure(SelectionMode::Off).unwrap();
        model
    }

    fn flip_move(variable: u32, target: i64) -> Move {
        let mut mv = Move::new(MoveSense::Binary);
        mv.alterations.push((VariableId(variable), target));
        mv.is_univariable = true;
        mv
    }

    #[test]
    fn test_filter_rejects_fixed_bound_and_noop() {
        let mut model = model_with_two_binaries();
        model.import_values(&[0, 0]);

        let mut storage = MoveStorage::with_moves(vec![
            flip_move(0, 1), // fine
            flip_move(0, 0), // no-op
            flip_move(1, 2), // out of bounds
        ]);
        storage.update_flags(&model, true, false, false, false);
        assert_eq!(storage.flags, vec![1, 0, 0]);

        model.variable_mut(VariableId(0)).fix();
        storage.update_flags(&model, true, false, false, false);
        assert_eq!(storage.flags[0], 0, "fixed variable must be rejected");
    }

    #[test]
    fn test_improvability_hints_gate_candidates() {
        let mut model = model_with_two_binaries();
        model.import_values(&[1, 0]);
        model.update_variable_objective_improvabilities_all();
        // Only x (at 1, positive sensitivity) is objective improvable.

        let mut storage = MoveStorage::with_moves(vec![flip_move(0, 0), flip_move(1, 1)]);
        storage.update_flags(&model, false, true, false, false);
        assert_eq!(storage.flags, vec![1, 0]);

        // accept_all bypasses the hints.
        storage.update_flags(&model, true, false, false, false);
        assert_eq!(storage.flags, vec![1, 1]);
    }

    #[test]
    fn test_parallel_and_sequential_flags_agree() {
        let mut model = model_with_two_binaries();
        model.import_values(&[0, 1]);

        let moves: Vec<Move> = vec![
            flip_move(0, 1),
            flip_move(0, 0),
            flip_move(1, 0),
            flip_move(1, 1),
        ];
        let mut sequential = MoveStorage::with_moves(moves.clone());
        let mut parallel = MoveStorage::with_moves(moves);
        sequential.update_flags(&model, true, false, false, false);
        parallel.update_flags(&model, true, false, false, true);
        assert_eq!(sequential.flags, parallel.flags);
    }

    #[test]
    fn test_state_hash_is_order_independent() {
        let mut first = Move::new(MoveSense::Chain);
        first.alterations.push((VariableId(0), 1));
        first.alterations.push((VariableId(1), 0));

        let mut second = Move::new(MoveSense::Chain);
        second.alterations.push((VariableId(1), 0));
        second.alterations.push((VariableId(0), 1));

        assert_eq!(first.state_hash(), second.state_hash());
    }
}
