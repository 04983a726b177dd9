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

use crate::neighborhood::mv::{Move, MoveSense, MoveStorage};
use cinder_model::model::Model;
use cinder_model::variable::VariableSense;
use rayon::prelude::*;

/// Four slots per non-fixed integer variable: the two unit steps and the
/// two midpoint jumps toward the bounds. The midpoint jumps are what
/// lets the search cross plateaus in wide integer domains.
#[derive(Debug, Clone, Default)]
pub struct IntegerMoveGenerator {
    storage: MoveStorage,
}

impl IntegerMoveGenerator {
    pub fn setup(&mut self, model: &Model) {
        let mut moves = Vec::new();
        for variable in model.variables() {
            if variable.is_fixed() || variable.sense() != VariableSense::Integer {
                continue;
            }
            for _ in 0..4 {
                let mut mv = Move::new(MoveSense::Integer);
                mv.alterations.push((variable.id(), 0));
                mv.related_constraint_ids = variable.related_constraint_ids().to_vec();
                mv.is_univariable = true;
                moves.push(mv);
            }
        }
        self.storage = MoveStorage::with_moves(moves);
    }

    pub fn update_moves(
        &mut self,
        model: &Model,
        accept_all: bool,
        accept_objective_improvable: bool,
        accept_feasibility_improvable: bool,
        is_enabled_parallel: bool,
    ) {
        let rewrite = |(index, mv): (usize, &mut Move)| {
            let (variable_id, target) = &mut mv.alterations[0];
            let variable = model.variable(*variable_id);
            let value = variable.value();
            *target = match index % 4 {
                0 => value + 1,
                1 => value - 1,
                2 => (value + variable.upper_bound()) / 2,
                _ => (value + variable.lower_bound()) / 2,
            };
        };
        if is_enabled_parallel {
            self.storage
                .moves
                .par_iter_mut()
                .enumerate()
                .for_each(rewrite);
        } else {
            self.storage.moves.iter_mut().enumerate().for_each(rewrite);
        }
        self.storage.update_flags(
            model,
            accept_all,
            accept_objective_improvable,
            accept_feasibility_improvable,
            is_enabled_parallel,
        );
    }

    #[inline]
    pub fn storage(&self) -> &MoveStorage {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_model::selection::SelectionMode;

    #[test]
    fn test_unit_steps_and_midpoint_jumps() {
        let mut model = Model::new("m");
        let x = model.add_variable("x", 0, 1000).unwrap();
        model.minimize(vec![(x, 1.0)], 0.0);
        model.setup_structure(SelectionMode::Off).unwrap();
        model.import_values(&[100]);

        let mut generator = IntegerMoveGenerator::default();
        generator.setup(&model);
        assert_eq!(generator.storage().len(), 4);

        generator.update_moves(&model, true, false, false, false);
        let targets: Vec<i64> = generator
            .storage()
            .moves
            .iter()
            .map(|mv| mv.alterations[0].1)
            .collect();
        assert_eq!(targets, vec![101, 99, 550, 50]);
        assert_eq!(generator.storage().flags, vec![1, 1, 1, 1]);
    }

    #[test]
    fn test_midpoint_jumps_reach_a_distant_target_logarithmically() {
        // Best-improvement on the distance to 750 starting at 0: the
        // midpoint slots must close the gap in O(log 1000) accepted
        // moves where unit steps would need 750.
        let mut model = Model::new("m");
        let x = model.add_variable("x", 0, 1000).unwrap();
        model.minimize(vec![(x, 1.0)], 0.0);
        model.setup_structure(SelectionMode::Off).unwrap();
        model.import_values(&[0]);

        let mut generator = IntegerMoveGenerator::default();
        generator.setup(&model);

        let mut accepted = 0usize;
        while model.variable(x).value() != 750 {
            generator.update_moves(&model, true, false, false, false);
            let best = generator
                .storage()
                .moves
                .iter()
                .zip(&generator.storage().flags)
                .filter(|&(_, &flag)| flag == 1)
                .map(|(mv, _)| mv.alterations[0].1)
                .min_by_key(|&target| (target - 750).abs())
                .expect("a candidate must exist");
            assert!(
                (best - 750).abs() < (model.variable(x).value() - 750).abs(),
                "the best candidate must strictly approach the target"
            );
            let alterations = vec![(x, best)];
            let related = model.variable(x).related_constraint_ids().to_vec();
            model.apply_move(&alterations, &related);
            accepted += 1;
            assert!(accepted <= 12, "expected O(log 1000) accepted moves");
        }
        assert!(accepted <= 12);
    }

    #[test]
    fn test_bound_and_noop_slots_are_filtered() {
        let mut model = Model::new("m");
        let x = model.add_variable("x", 0, 10).unwrap();
        model.minimize(vec![(x, 1.0)], 0.0);
        model.setup_structure(SelectionMode::Off).unwrap();
        model.import_values(&[0]);

        let mut generator = IntegerMoveGenerator::default();
        generator.setup(&model);
        generator.update_moves(&model, true, false, false, false);

        // x-1 violates the lower bound; the lower midpoint is a no-op.
        assert_eq!(generator.storage().flags, vec![1, 0, 1, 0]);
    }
}
