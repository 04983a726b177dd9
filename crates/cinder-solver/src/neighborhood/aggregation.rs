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
use cinder_model::classification::ConstraintTag;
use cinder_model::ids::VariableId;
use cinder_model::model::Model;
use cinder_model::variable::VariableSense;
use rayon::prelude::*;

/// A binomial equality captured at setup time.
#[derive(Debug, Clone, Copy)]
struct Binomial {
    first: VariableId,
    second: VariableId,
    sensitivity_first: f64,
    sensitivity_second: f64,
    constant: f64,
}

/// Four slots per binomial equality `a*x + b*y + k = 0`: nudge one
/// variable by ±1 and solve the row for the other, rounding to the
/// nearest integer. Keeps the search on the constraint manifold.
#[derive(Debug, Clone, Default)]
pub struct AggregationMoveGenerator {
    storage: MoveStorage,
    binomials: Vec<Binomial>,
}

impl AggregationMoveGenerator {
    pub fn setup(&mut self, model: &Model) {
        self.binomials = model
            .constraints()
            .iter()
            .filter(|constraint| {
                constraint.is_enabled() && constraint.has_tag(ConstraintTag::Aggregation)
            })
            .filter_map(|constraint| {
                let terms = constraint.expression().sensitivities();
                let (first, a) = terms[0];
                let (second, b) = terms[1];
                let usable = |id: VariableId| {
                    let variable = model.variable(id);
                    !variable.is_fixed() && variable.sense() != VariableSense::Selection
                };
                if usable(first) && usable(second) && a != 0.0 && b != 0.0 {
                    Some(Binomial {
                        first,
                        second,
                        sensitivity_first: a,
                        sensitivity_second: b,
                        constant: constraint.expression().constant(),
                    })
                } else {
                    None
                }
            })
            .collect();

        let mut moves = Vec::with_capacity(4 * self.binomials.len());
        for binomial in &self.binomials {
            for _ in 0..4 {
                let mut mv = Move::new(MoveSense::Aggregation);
                mv.alterations.push((binomial.first, 0));
                mv.alterations.push((binomial.second, 0));
                let mut related = model
                    .variable(binomial.first)
                    .related_constraint_ids()
                    .to_vec();
                related.extend_from_slice(
                    model.variable(binomial.second).related_constraint_ids(),
                );
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
        let binomials = &self.binomials;
        let rewrite = |(index, mv): (usize, &mut Move)| {
            let binomial = &binomials[index / 4];
            let first_value = model.variable(binomial.first).value();
            let second_value = model.variable(binomial.second).value();
            let solve_second = |nudged_first: i64| -> i64 {
                ((-binomial.constant - binomial.sensitivity_first * nudged_first as f64)
                    / binomial.sensitivity_second
                    + 0.5)
                    .floor() as i64
            };
            let solve_first = |nudged_second: i64| -> i64 {
                ((-binomial.constant - binomial.sensitivity_second * nudged_second as f64)
                    / binomial.sensitivity_first
                    + 0.5)
                    .floor() as i64
            };
            match index % 4 {
                0 => {
                    mv.alterations[0].1 = first_value + 1;
                    mv.alterations[1].1 = solve_second(first_value + 1);
                }
                1 => {
                    mv.alterations[0].1 = first_value - 1;
                    mv.alterations[1].1 = solve_second(first_value - 1);
                }
                2 => {
                    mv.alterations[0].1 = solve_first(second_value + 1);
                    mv.alterations[1].1 = second_value + 1;
                }
                _ => {
                    mv.alterations[0].1 = solve_first(second_value - 1);
                    mv.alterations[1].1 = second_value - 1;
                }
            }
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
    use cinder_model::constraint::ConstraintSense;
    use cinder_model::selection::SelectionMode;

    #[test]
    fn test_slots_solve_the_binomial_equality() {
        // 2x - y = 4 over x in [0,10], y in [0,10].
        let mut model = Model::new("m");
        let x = model.add_variable("x", 0, 10).unwrap();
        let y = model.add_variable("y", 0, 10).unwrap();
        model
            .add_constraint("agg", vec![(x, 2.0), (y, -1.0)], ConstraintSense::Equal, 4.0)
            .unwrap();
        model.minimize(vec![(x, 1.0)], 0.0);
        model.setup_structure(SelectionMode::Off).unwrap();
        model.import_values(&[3, 2]);

        let mut generator = AggregationMoveGenerator::default();
        generator.setup(&model);
        assert_eq!(generator.storage().len(), 4);

        generator.update_moves(&model, true, false, false, false);
        let alterations: Vec<(i64, i64)> = generator
            .storage()
            .moves
            .iter()
            .map(|mv| (mv.alterations[0].1, mv.alterations[1].1))
            .collect();

        // x -> 4 forces y = 4, x -> 2 forces y = 0; y -> 3 forces
        // x = 3.5 rounded to 4, y -> 1 forces x = 2.5 rounded to 3.
        assert_eq!(alterations, vec![(4, 4), (2, 0), (4, 3), (3, 1)]);
    }
}
