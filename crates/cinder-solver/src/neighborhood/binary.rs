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

/// One flip slot per non-fixed binary variable.
#[derive(Debug, Clone, Default)]
pub struct BinaryMoveGenerator {
    storage: MoveStorage,
}

impl BinaryMoveGenerator {
    pub fn setup(&mut self, model: &Model) {
        let moves: Vec<Move> = model
            .variables()
            .iter()
            .filter(|variable| {
                !variable.is_fixed() && variable.sense() == VariableSense::Binary
            })
            .map(|variable| {
                let mut mv = Move::new(MoveSense::Binary);
                mv.alterations.push((variable.id(), 0));
                mv.related_constraint_ids = variable.related_constraint_ids().to_vec();
                mv.is_univariable = true;
                mv
            })
            .collect();
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
        let rewrite = |mv: &mut Move| {
            let (variable_id, target) = &mut mv.alterations[0];
            *target = 1 - model.variable(*variable_id).value();
        };
        if is_enabled_parallel {
            self.storage.moves.par_iter_mut().for_each(rewrite);
        } else {
            self.storage.moves.iter_mut().for_each(rewrite);
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
    use cinder_model::constraint::ConstraintSense;
    use cinder_model::selection::SelectionMode;

    #[test]
    fn test_one_slot_per_unfixed_binary_and_flip_targets() {
        let mut model = Model::new("m");
        let x = model.add_binary("x").unwrap();
        let y = model.add_binary("y").unwrap();
        let z = model.add_binary("z").unwrap();
        model
            .add_constraint(
                "row",
                vec![(x, 1.0), (y, 1.0), (z, 1.0)],
                ConstraintSense::Less,
                2.0,
            )
            .unwrap();
        model.minimize(vec![(x, 1.0)], 0.0);
        model.setup_structure(SelectionMode::Off).unwrap();
        model.variable_mut(z).fix_to(0);
        model.import_values(&[0, 1, 0]);

        let mut generator = BinaryMoveGenerator::default();
        generator.setup(&model);
        assert_eq!(generator.storage().len(), 2, "fixed z owns no slot");

        generator.update_moves(&model, true, false, false, false);
        let targets: Vec<i64> = generator
            .storage()
            .moves
            .iter()
            .map(|mv| mv.alterations[0].1)
            .collect();
        assert_eq!(targets, vec![1, 0]);
        assert_eq!(generator.storage().flags, vec![1, 1]);
    }
}
