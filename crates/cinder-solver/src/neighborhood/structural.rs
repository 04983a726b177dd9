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

//! Generators targeting specific constraint structures. Each proposes
//! moves that keep or quickly repair the structure it subscribes to.

use crate::neighborhood::mv::{Move, MoveSense, MoveStorage};
use cinder_model::classification::ConstraintTag;
use cinder_model::constraint::ConstraintSense;
use cinder_model::ids::VariableId;
use cinder_model::model::Model;
use cinder_model::variable::VariableSense;

fn usable(model: &Model, id: VariableId) -> bool {
    let variable = model.variable(id);
    !variable.is_fixed() && variable.sense() != VariableSense::Selection
}

fn union_related(model: &Model, ids: &[VariableId]) -> Vec<cinder_model::ids::ConstraintId> {
    let mut related: Vec<_> = ids
        .iter()
        .flat_map(|&id| model.variable(id).related_constraint_ids().iter().copied())
        .collect();
    related.sort_unstable();
    related.dedup();
    related
}

/// Which way the two members of a binomial row step together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PairStepRule {
    /// `(x+1, y+1)` and `(x-1, y-1)`; preserves differences.
    SameDirection,
    /// `(x+1, y-1)` and `(x-1, y+1)`; preserves sums.
    OppositeDirection,
}

/// Paired ±1 steps over binomial rows carrying one structural tag.
/// Covers precedence, balanced/inverted integers and the constant-sum /
/// constant-difference families, which differ only in tag and rule.
#[derive(Debug, Clone)]
pub struct PairStepMoveGenerator {
    tag: ConstraintTag,
    move_sense: MoveSense,
    rule: PairStepRule,
    storage: MoveStorage,
}

impl PairStepMoveGenerator {
    pub fn precedence() -> Self {
        Self::new(ConstraintTag::Precedence, MoveSense::Precedence, PairStepRule::SameDirection)
    }

    pub fn inverted_integers() -> Self {
        Self::new(
            ConstraintTag::InvertedIntegers,
            MoveSense::InvertedIntegers,
            PairStepRule::OppositeDirection,
        )
    }

    pub fn balanced_integers() -> Self {
        Self::new(
            ConstraintTag::BalancedIntegers,
            MoveSense::BalancedIntegers,
            PairStepRule::SameDirection,
        )
    }

    pub fn constant_sum_integers() -> Self {
        Self::new(
            ConstraintTag::ConstantSumIntegers,
            MoveSense::ConstantSumIntegers,
            PairStepRule::OppositeDirection,
        )
    }

    pub fn constant_difference_integers() -> Self {
        Self::new(
            ConstraintTag::ConstantDifferenceIntegers,
            MoveSense::ConstantDifferenceIntegers,
            PairStepRule::SameDirection,
        )
    }

    fn new(tag: ConstraintTag, move_sense: MoveSense, rule: PairStepRule) -> Self {
        Self {
            tag,
            move_sense,
            rule,
            storage: MoveStorage::default(),
        }
    }

    pub fn setup(&mut self, model: &Model) {
        let mut moves = Vec::new();
        for constraint in model.constraints() {
            if !constraint.is_enabled() || !constraint.has_tag(self.tag) {
                continue;
            }
            let terms = constraint.expression().sensitivities();
            let (first, second) = (terms[0].0, terms[1].0);
            if !usable(model, first) || !usable(model, second) {
                continue;
            }
            for _ in 0..2 {
                let mut mv = Move::new(self.move_sense);
                mv.alterations.push((first, 0));
                mv.alterations.push((second, 0));
                mv.related_constraint_ids = union_related(model, &[first, second]);
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
        for (index, mv) in self.storage.moves.iter_mut().enumerate() {
            let first_value = model.variable(mv.alterations[0].0).value();
            let second_value = model.variable(mv.alterations[1].0).value();
            let direction = if index % 2 == 0 { 1 } else { -1 };
            let second_direction = match self.rule {
                PairStepRule::SameDirection => direction,
                PairStepRule::OppositeDirection => -direction,
            };
            mv.alterations[0].1 = first_value + direction;
            mv.alterations[1].1 = second_value + second_direction;
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

/// Two constant slots per exclusive-or row `x + y = 1`: the two feasible
/// points.
#[derive(Debug, Clone, Default)]
pub struct ExclusiveOrMoveGenerator {
    storage: MoveStorage,
}

impl ExclusiveOrMoveGenerator {
    pub fn setup(&mut self, model: &Model) {
        let mut moves = Vec::new();
        for constraint in model.constraints() {
            if !constraint.is_enabled() || !constraint.has_tag(ConstraintTag::ExclusiveOr) {
                continue;
            }
            let terms = constraint.expression().sensitivities();
            let (first, second) = (terms[0].0, terms[1].0);
            if !usable(model, first) || !usable(model, second) {
                continue;
            }
            for (first_target, second_target) in [(1, 0), (0, 1)] {
                let mut mv = Move::new(MoveSense::ExclusiveOr);
                mv.alterations.push((first, first_target));
                mv.alterations.push((second, second_target));
                mv.related_constraint_ids = union_related(model, &[first, second]);
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

/// Two constant slots per exclusive-nor row `x - y = 0`: both up, both
/// down.
#[derive(Debug, Clone, Default)]
pub struct ExclusiveNorMoveGenerator {
    storage: MoveStorage,
}

impl ExclusiveNorMoveGenerator {
    pub fn setup(&mut self, model: &Model) {
        let mut moves = Vec::new();
        for constraint in model.constraints() {
            if !constraint.is_enabled() || !constraint.has_tag(ConstraintTag::ExclusiveNor) {
                continue;
            }
            let terms = constraint.expression().sensitivities();
            let (first, second) = (terms[0].0, terms[1].0);
            if !usable(model, first) || !usable(model, second) {
                continue;
            }
            for target in [0, 1] {
                let mut mv = Move::new(MoveSense::ExclusiveNor);
                mv.alterations.push((first, target));
                mv.alterations.push((second, target));
                mv.related_constraint_ids = union_related(model, &[first, second]);
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

/// One constant slot per feasible point of a trinomial exclusive-nor
/// row, enumerated over the eight binary corners at setup.
#[derive(Debug, Clone, Default)]
pub struct TrinomialExclusiveNorMoveGenerator {
    storage: MoveStorage,
}

impl TrinomialExclusiveNorMoveGenerator {
    pub fn setup(&mut self, model: &Model) {
        let mut moves = Vec::new();
        for constraint in model.constraints() {
            if !constraint.is_enabled()
                || !constraint.has_tag(ConstraintTag::TrinomialExclusiveNor)
            {
                continue;
            }
            let terms = constraint.expression().sensitivities().to_vec();
            if terms.iter().any(|&(id, _)| !usable(model, id)) {
                continue;
            }
            let constant = constraint.expression().constant();
            for corner in 0..8u8 {
                let values = [
                    (corner & 1) as i64,
                    ((corner >> 1) & 1) as i64,
                    ((corner >> 2) & 1) as i64,
                ];
                let row_value: f64 = constant
                    + terms
                        .iter()
                        .zip(values)
                        .map(|(&(_, coefficient), value)| coefficient * value as f64)
                        .sum::<f64>();
                if row_value.abs() > 1e-10 {
                    continue;
                }
                let mut mv = Move::new(MoveSense::TrinomialExclusiveNor);
                for (&(id, _), value) in terms.iter().zip(values) {
                    mv.alterations.push((id, value));
                }
                mv.related_constraint_ids =
                    union_related(model, &terms.iter().map(|&(id, _)| id).collect::<Vec<_>>());
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

/// Two slots per constant-ratio row `a*x + b*y = c` with a unit
/// coefficient: the non-unit variable steps ±1 and the unit one is
/// solved exactly.
#[derive(Debug, Clone, Default)]
pub struct ConstantRatioIntegersMoveGenerator {
    storage: MoveStorage,
    rows: Vec<(VariableId, VariableId, f64, f64, f64)>,
}

impl ConstantRatioIntegersMoveGenerator {
    pub fn setup(&mut self, model: &Model) {
        self.rows.clear();
        let mut moves = Vec::new();
        for constraint in model.constraints() {
            if !constraint.is_enabled()
                || !constraint.has_tag(ConstraintTag::ConstantRatioIntegers)
            {
                continue;
            }
            let terms = constraint.expression().sensitivities();
            let (first, a) = terms[0];
            let (second, b) = terms[1];
            if !usable(model, first) || !usable(model, second) {
                continue;
            }
            // The unit-coefficient variable is driven by the other.
            let (stepper, driven, stepper_coefficient, driven_coefficient) =
                if b.abs() > a.abs() {
                    (second, first, b, a)
                } else {
                    (first, second, a, b)
                };
            self.rows.push((
                stepper,
                driven,
                stepper_coefficient,
                driven_coefficient,
                constraint.expression().constant(),
            ));
            for _ in 0..2 {
                let mut mv = Move::new(MoveSense::ConstantRatioIntegers);
                mv.alterations.push((stepper, 0));
                mv.alterations.push((driven, 0));
                mv.related_constraint_ids = union_related(model, &[stepper, driven]);
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
        for (index, mv) in self.storage.moves.iter_mut().enumerate() {
            let (stepper, _, stepper_coefficient, driven_coefficient, constant) =
                self.rows[index / 2];
            let direction = if index % 2 == 0 { 1 } else { -1 };
            let stepped = model.variable(stepper).value() + direction;
            mv.alterations[0].1 = stepped;
            mv.alterations[1].1 = ((-constant - stepper_coefficient * stepped as f64)
                / driven_coefficient
                + 0.5)
                .floor() as i64;
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

/// Variable-bound rows `a*x + b*y <= c` with a binary member: flip the
/// binary and push the partner to the tightest feasible value.
#[derive(Debug, Clone, Default)]
pub struct VariableBoundMoveGenerator {
    storage: MoveStorage,
    rows: Vec<(VariableId, VariableId, f64, f64, f64, ConstraintSense, i64)>,
}

impl VariableBoundMoveGenerator {
    pub fn setup(&mut self, model: &Model) {
        self.rows.clear();
        let mut moves = Vec::new();
        for constraint in model.constraints() {
            if !constraint.is_enabled() || !constraint.has_tag(ConstraintTag::VariableBound) {
                continue;
            }
            let terms = constraint.expression().sensitivities();
            let (first, a) = terms[0];
            let (second, b) = terms[1];
            if !usable(model, first) || !usable(model, second) {
                continue;
            }
            let mut pairs: Vec<(VariableId, VariableId, f64, f64)> = Vec::new();
            if model.variable(first).is_binary() {
                pairs.push((first, second, a, b));
            }
            if model.variable(second).is_binary() {
                pairs.push((second, first, b, a));
            }
            for (binary, partner, binary_coefficient, partner_coefficient) in pairs {
                for flip_target in [0i64, 1] {
                    self.rows.push((
                        binary,
                        partner,
                        binary_coefficient,
                        partner_coefficient,
                        constraint.expression().constant(),
                        constraint.sense(),
                        flip_target,
                    ));
                    let mut mv = Move::new(MoveSense::VariableBound);
                    mv.alterations.push((binary, flip_target));
                    mv.alterations.push((partner, 0));
                    mv.related_constraint_ids = union_related(model, &[binary, partner]);
                    mv.is_special_neighborhood_move = true;
                    moves.push(mv);
                }
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
        for (index, mv) in self.storage.moves.iter_mut().enumerate() {
            let (_, _, binary_coefficient, partner_coefficient, constant, sense, flip_target) =
                self.rows[index];
            let boundary =
                (-constant - binary_coefficient * flip_target as f64) / partner_coefficient;
            let toward_smaller = match sense {
                ConstraintSense::Less => partner_coefficient > 0.0,
                _ => partner_coefficient < 0.0,
            };
            mv.alterations[1].1 = if toward_smaller {
                boundary.floor() as i64
            } else {
                boundary.ceil() as i64
            };
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

/// Swap moves over set-partitioning rows that were not promoted to
/// selections: the first member holding 1 donates to the slot's member.
#[derive(Debug, Clone, Default)]
pub struct SoftSelectionMoveGenerator {
    storage: MoveStorage,
    slots: Vec<(usize, VariableId)>,
    row_members: Vec<Vec<VariableId>>,
}

impl SoftSelectionMoveGenerator {
    pub fn setup(&mut self, model: &Model) {
        self.slots.clear();
        self.row_members.clear();
        let mut moves = Vec::new();
        for constraint in model.constraints() {
            if !constraint.is_enabled() || !constraint.has_tag(ConstraintTag::SetPartitioning) {
                continue;
            }
            let members: Vec<VariableId> = constraint
                .expression()
                .sensitivities()
                .iter()
                .map(|&(id, _)| id)
                .collect();
            if members.iter().any(|&id| !usable(model, id)) {
                continue;
            }
            let row_index = self.row_members.len();
            let related = union_related(model, &members);
            for &member in &members {
                let mut mv = Move::new(MoveSense::SoftSelection);
                mv.alterations.push((member, 0));
                mv.alterations.push((member, 1));
                mv.related_constraint_ids = related.clone();
                mv.is_special_neighborhood_move = true;
                moves.push(mv);
                self.slots.push((row_index, member));
            }
            self.row_members.push(members);
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
        let donors: Vec<Option<VariableId>> = self
            .row_members
            .iter()
            .map(|members| {
                members
                    .iter()
                    .copied()
                    .find(|&id| model.variable(id).value() == 1)
            })
            .collect();
        for (slot, &(row_index, member)) in self.slots.iter().enumerate() {
            let mv = &mut self.storage.moves[slot];
            match donors[row_index] {
                Some(donor) => {
                    mv.is_available = true;
                    mv.alterations[0] = (donor, 0);
                    mv.alterations[1] = (member, 1);
                }
                None => mv.is_available = false,
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
    use cinder_model::selection::SelectionMode;

    #[test]
    fn test_precedence_steps_move_both_variables_together() {
        let mut model = Model::new("m");
        let x = model.add_variable("x", 0, 10).unwrap();
        let y = model.add_variable("y", 0, 10).unwrap();
        model
            .add_constraint("prec", vec![(x, 1.0), (y, -1.0)], ConstraintSense::Less, 0.0)
            .unwrap();
        model.minimize(vec![(x, 1.0)], 0.0);
        model.setup_structure(SelectionMode::Off).unwrap();
        model.import_values(&[2, 5]);

        let mut generator = PairStepMoveGenerator::precedence();
        generator.setup(&model);
        generator.update_moves(&model, true, false, false, false);

        let alterations: Vec<(i64, i64)> = generator
            .storage()
            .moves
            .iter()
            .map(|mv| (mv.alterations[0].1, mv.alterations[1].1))
            .collect();
        assert_eq!(alterations, vec![(3, 6), (1, 4)]);
    }

    #[test]
    fn test_exclusive_or_proposes_the_two_feasible_points() {
        let mut model = Model::new("m");
        let x = model.add_binary("x").unwrap();
        let y = model.add_binary("y").unwrap();
        model
            .add_constraint("xor", vec![(x, 1.0), (y, 1.0)], ConstraintSense::Equal, 1.0)
            .unwrap();
        model.minimize(vec![(x, 1.0)], 0.0);
        model.setup_structure(SelectionMode::Off).unwrap();
        model.import_values(&[1, 0]);

        let mut generator = ExclusiveOrMoveGenerator::default();
        generator.setup(&model);
        generator.update_moves(&model, true, false, false, false);

        // (1,0) is current, only the swap to (0,1) survives.
        let surviving: Vec<usize> = generator
            .storage()
            .flags
            .iter()
            .enumerate()
            .filter(|&(_, &flag)| flag == 1)
            .map(|(index, _)| index)
            .collect();
        assert_eq!(surviving.len(), 1);
        let mv = &generator.storage().moves[surviving[0]];
        assert_eq!(mv.alterations[0].1, 0);
        assert_eq!(mv.alterations[1].1, 1);
    }

    #[test]
    fn test_constant_ratio_drives_the_unit_variable() {
        // 3x - y = 0 over integers.
        let mut model = Model::new("m");
        let x = model.add_variable("x", 0, 10).unwrap();
        let y = model.add_variable("y", 0, 30).unwrap();
        model
            .add_constraint("ratio", vec![(x, 3.0), (y, -1.0)], ConstraintSense::Equal, 0.0)
            .unwrap();
        model.minimize(vec![(y, 1.0)], 0.0);
        model.setup_structure(SelectionMode::Off).unwrap();
        model.import_values(&[2, 6]);

        let mut generator = ConstantRatioIntegersMoveGenerator::default();
        generator.setup(&model);
        generator.update_moves(&model, true, false, false, false);

        let alterations: Vec<(i64, i64)> = generator
            .storage()
            .moves
            .iter()
            .map(|mv| (mv.alterations[0].1, mv.alterations[1].1))
            .collect();
        assert_eq!(alterations, vec![(3, 9), (1, 3)]);
    }

    #[test]
    fn test_soft_selection_swaps_from_the_donor() {
        let mut model = Model::new("m");
        let ids: Vec<VariableId> = (0..3)
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
        model.minimize(vec![(ids[0], 1.0)], 0.0);
        // Keep the row enabled: no selection promotion.
        model.setup_structure(SelectionMode::Off).unwrap();
        model.import_values(&[0, 1, 0]);

        let mut generator = SoftSelectionMoveGenerator::default();
        generator.setup(&model);
        generator.update_moves(&model, true, false, false, false);

        let surviving: Vec<&Move> = generator
            .storage()
            .moves
            .iter()
            .zip(&generator.storage().flags)
            .filter(|&(_, &flag)| flag == 1)
            .map(|(mv, _)| mv)
            .collect();
        assert_eq!(surviving.len(), 2);
        for mv in surviving {
            assert_eq!(mv.alterations[0], (ids[1], 0));
            assert_eq!(mv.alterations[1].1, 1);
        }
    }
}
