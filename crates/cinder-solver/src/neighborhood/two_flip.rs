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

use crate::neighborhood::mv::{has_selection_variable, Move, MoveSense, MoveStorage};
use cinder_model::ids::VariableId;
use cinder_model::model::Model;

/// Two complementary swap slots per caller-supplied variable pair:
/// `(x -> 1, y -> 0)` and `(x -> 0, y -> 1)`.
#[derive(Debug, Clone, Default)]
pub struct TwoFlipMoveGenerator {
    storage: MoveStorage,
}

impl TwoFlipMoveGenerator {
    pub fn setup(&mut self, model: &Model, pairs: &[(VariableId, VariableId)]) {
        let mut moves = Vec::with_capacity(2 * pairs.len());
        for &(first, second) in pairs {
            for (first_target, second_target) in [(1, 0), (0, 1)] {
                let mut mv = Move::new(MoveSense::TwoFlip);
                mv.alterations.push((first, first_target));
                mv.alterations.push((second, second_target));
                let mut related = model.variable(first).related_constraint_ids().to_vec();
                related.extend_from_slice(model.variable(second).related_constraint_ids());
                related.sort_unstable();
                related.dedup();
                mv.related_constraint_ids = related;
                mv.is_special_neighborhood_move = true;
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
        // Selection members may only move through selection swaps.
        for mv in &mut self.storage.moves {
            mv.is_available = !has_selection_variable(mv, model);
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
    fn test_two_complementary_slots_per_pair() {
        let mut model = Model::new("m");
        let x = model.add_binary("x").unwrap();
        let y = model.add_binary("y").unwrap();
        model
            .add_constraint("row", vec![(x, 1.0), (y, 1.0)], ConstraintSense::Less, 1.0)
            .unwrap();
        model.minimize(vec![(x, 1.0)], 0.0);
        model.setup_structure(SelectionMode::Off).unwrap();
        model.import_values(&[1, 0]);

        let mut generator = TwoFlipMoveGenerator::default();
        generator.setup(&model, &[(x, y)]);
        generator.update_moves(&model, true, false, false, false);

        assert_eq!(generator.storage().len(), 2);
        // Current state is (1, 0): only the swap to (0, 1) has no no-op.
        assert_eq!(generator.storage().flags, vec![0, 1]);
    }
}
