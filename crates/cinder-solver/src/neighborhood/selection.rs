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
use cinder_model::ids::VariableId;
use cinder_model::model::Model;

/// One swap slot per selection member: the currently selected variable
/// drops to 0 while the member rises to 1, so every surviving move
/// preserves the one-selected invariant of its group.
#[derive(Debug, Clone, Default)]
pub struct SelectionMoveGenerator {
    storage: MoveStorage,
    // Slot layout bookkeeping: (selection index, member id) per slot.
    slot_members: Vec<(usize, VariableId)>,
}

impl SelectionMoveGenerator {
    pub fn setup(&mut self, model: &Model) {
        let mut moves = Vec::new();
        self.slot_members.clear();
        for (selection_index, selection) in model.selections().iter().enumerate() {
            for &member_id in selection.variable_ids() {
                if model.variable(member_id).is_fixed() {
                    continue;
                }
                let mut mv = Move::new(MoveSense::Selection);
                mv.alterations.push((member_id, 0));
                mv.alterations.push((member_id, 1));
                mv.related_constraint_ids = selection.related_constraint_ids().to_vec();
                moves.push(mv);
                self.slot_members.push((selection_index, member_id));
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
        // Rewriting resolves the currently selected member per group
        // once, then retargets every slot of that group.
        let mut selected_members: Vec<Option<VariableId>> =
            Vec::with_capacity(model.selections().len());
        for selection in model.selections() {
            selected_members.push(
                selection
                    .variable_ids()
                    .iter()
                    .copied()
                    .find(|&member_id| model.variable(member_id).value() == 1),
            );
        }

        for (slot, &(selection_index, member_id)) in self.slot_members.iter().enumerate() {
            let mv = &mut self.storage.moves[slot];
            match selected_members[selection_index] {
                Some(selected_id) => {
                    mv.is_available = true;
                    mv.alterations[0] = (selected_id, 0);
                    mv.alterations[1] = (member_id, 1);
                }
                None => {
                    mv.is_available = false;
                }
            }
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

    fn selection_model() -> Model {
        let mut model = Model::new("m");
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
        model
    }

    #[test]
    fn test_proposes_exactly_the_swap_moves() {
        let mut model = selection_model();
        model.import_values(&[1, 0, 0, 0]);

        let mut generator = SelectionMoveGenerator::default();
        generator.setup(&model);
        assert_eq!(generator.storage().len(), 4);

        generator.update_moves(&model, true, false, false, false);
        let surviving: Vec<&Move> = generator
            .storage()
            .moves
            .iter()
            .zip(&generator.storage().flags)
            .filter(|&(_, &flag)| flag == 1)
            .map(|(mv, _)| mv)
            .collect();

        // The slot for the selected member itself is a no-op; the other
        // three swaps survive.
        assert_eq!(surviving.len(), 3);
        for mv in surviving {
            assert_eq!(mv.alterations[0], (VariableId(0), 0));
            assert_eq!(mv.alterations[1].1, 1);
            assert_ne!(mv.alterations[1].0, VariableId(0));
        }
    }

    #[test]
    fn test_unavailable_when_no_member_is_selected() {
        let mut model = selection_model();
        model.import_values(&[0, 0, 0, 0]);

        let mut generator = SelectionMoveGenerator::default();
        generator.setup(&model);
        generator.update_moves(&model, true, false, false, false);
        assert!(generator.storage().flags.iter().all(|&flag| flag == 0));
    }
}
