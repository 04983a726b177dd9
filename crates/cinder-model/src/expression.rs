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

use crate::ids::VariableId;
use crate::variable::Variable;
use cinder_core::collections::FixedCapacityMap;
use cinder_core::num::{is_minus_one, is_plus_one};

/// A value alteration of a single variable, the atom every move is made
/// of.
pub type Alteration = (VariableId, i64);

/// Linear form `sum(c_i * x_i) + k` with a cached value.
///
/// The cached value equals the form evaluated at the current variable
/// values after every completed `update` / `update_move`. The fixed
/// sensitivity map is valid only after [`Expression::setup_fixed_sensitivities`],
/// the ±1 masks only after [`Expression::setup_mask`]; both must be rebuilt
/// whenever the structure changes.
#[derive(Debug, Clone, Default)]
pub struct Expression {
    sensitivities: Vec<(VariableId, f64)>,
    constant: f64,
    value: f64,
    fixed_sensitivities: FixedCapacityMap<f64>,
    plus_one_mask: u64,
    minus_one_mask: u64,
    has_effective_plus_one_mask: bool,
    has_effective_minus_one_mask: bool,
}

impl Expression {
    pub fn new() -> Self {
        Self {
            sensitivities: Vec::new(),
            constant: 0.0,
            value: 0.0,
            fixed_sensitivities: FixedCapacityMap::new(),
            plus_one_mask: 0,
            minus_one_mask: 0,
            has_effective_plus_one_mask: false,
            has_effective_minus_one_mask: false,
        }
    }

    /// Builds the form from raw terms; duplicate variables are merged.
    pub fn from_terms(terms: Vec<(VariableId, f64)>, constant: f64) -> Self {
        let mut expression = Self::new();
        expression.constant = constant;
        for (id, coefficient) in terms {
            expression.add_term(id, coefficient);
        }
        expression
    }

    /// Adds `coefficient * x_id`, merging with an existing term.
    pub fn add_term(&mut self, id: VariableId, coefficient: f64) {
        match self.sensitivities.binary_search_by_key(&id, |&(v, _)| v) {
            Ok(position) => self.sensitivities[position].1 += coefficient,
            Err(position) => self.sensitivities.insert(position, (id, coefficient)),
        }
    }

    #[inline]
    pub fn add_constant(&mut self, constant: f64) {
        self.constant += constant;
    }

    #[inline]
    pub fn sensitivities(&self) -> &[(VariableId, f64)] {
        &self.sensitivities
    }

    /// The coefficient of `id`, zero when the variable does not
    /// participate. Structure lookup, not the hot path.
    pub fn sensitivity(&self, id: VariableId) -> f64 {
        self.sensitivities
            .binary_search_by_key(&id, |&(v, _)| v)
            .map(|position| self.sensitivities[position].1)
            .unwrap_or(0.0)
    }

    #[inline]
    pub fn constant(&self) -> f64 {
        self.constant
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Recomputes the form from scratch.
    pub fn evaluate(&self, variables: &[Variable]) -> f64 {
        let mut value = self.constant;
        for &(id, coefficient) in &self.sensitivities {
            value += coefficient * variables[id.index()].value() as f64;
        }
        value
    }

    /// The value the form would take after applying `alterations`,
    /// computed from the cached value and one sensitivity lookup per
    /// altered variable. Requires `setup_fixed_sensitivities`.
    #[inline]
    pub fn evaluate_move(&self, alterations: &[Alteration], variables: &[Variable]) -> f64 {
        let mut new_value = self.value;
        for &(id, target) in alterations {
            new_value += self.fixed_sensitivities.at(id.0)
                * (target - variables[id.index()].value()) as f64;
        }
        new_value
    }

    /// Single-variable fast path. When the ±1 mask proves the variable's
    /// coefficient, no sensitivity lookup happens at all.
    #[inline]
    pub fn evaluate_with_mask(&self, variable: &Variable, target: i64) -> f64 {
        let signature = variable.id().signature();
        if self.has_effective_plus_one_mask && (signature & self.plus_one_mask) != 0 {
            return self.value + (target - variable.value()) as f64;
        }
        if self.has_effective_minus_one_mask && (signature & self.minus_one_mask) != 0 {
            return self.value - (target - variable.value()) as f64;
        }
        self.value
            + self.fixed_sensitivities.at(variable.id().0) * (target - variable.value()) as f64
    }

    #[inline]
    pub fn update(&mut self, variables: &[Variable]) {
        self.value = self.evaluate(variables);
    }

    #[inline]
    pub fn update_move(&mut self, alterations: &[Alteration], variables: &[Variable]) {
        self.value = self.evaluate_move(alterations, variables);
    }

    /// Materializes the sensitivity mapping into the open-addressing map
    /// used by the hot evaluation paths.
    pub fn setup_fixed_sensitivities(&mut self) {
        let entries: Vec<(u32, f64)> = self
            .sensitivities
            .iter()
            .map(|&(id, coefficient)| (id.0, coefficient))
            .collect();
        self.fixed_sensitivities = FixedCapacityMap::with_entries(&entries, 1);
    }

    /// Builds the ±1 coefficient masks from the variable signatures. A
    /// mask is effective only when at least half of the ±1-coefficient
    /// variables are distinguishable by the mask alone.
    pub fn setup_mask(&mut self) {
        let mut non_plus_one_union: u64 = 0;
        let mut non_minus_one_union: u64 = 0;

        for &(id, coefficient) in &self.sensitivities {
            if !is_plus_one(coefficient) {
                non_plus_one_union |= id.signature();
            }
            if !is_minus_one(coefficient) {
                non_minus_one_union |= id.signature();
            }
        }

        self.plus_one_mask = !non_plus_one_union;
        self.minus_one_mask = !non_minus_one_union;

        let mut fast_plus_one = 0usize;
        let mut fast_minus_one = 0usize;
        for &(id, coefficient) in &self.sensitivities {
            if is_plus_one(coefficient) && (id.signature() & self.plus_one_mask) != 0 {
                fast_plus_one += 1;
            }
            if is_minus_one(coefficient) && (id.signature() & self.minus_one_mask) != 0 {
                fast_minus_one += 1;
            }
        }

        let variable_count = self.sensitivities.len();
        self.has_effective_plus_one_mask = 2 * fast_plus_one >= variable_count;
        self.has_effective_minus_one_mask = 2 * fast_minus_one >= variable_count;
    }

    #[inline]
    pub fn plus_one_mask(&self) -> u64 {
        self.plus_one_mask
    }

    #[inline]
    pub fn minus_one_mask(&self) -> u64 {
        self.minus_one_mask
    }

    #[inline]
    pub fn has_effective_plus_one_mask(&self) -> bool {
        self.has_effective_plus_one_mask
    }

    #[inline]
    pub fn has_effective_minus_one_mask(&self) -> bool {
        self.has_effective_minus_one_mask
    }

    /// Smallest value the form can take under the variable bounds; fixed
    /// variables contribute their value.
    pub fn lower_bound(&self, variables: &[Variable]) -> f64 {
        let mut bound = self.constant;
        for &(id, coefficient) in &self.sensitivities {
            let variable = &variables[id.index()];
            let value = if variable.is_fixed() {
                variable.value()
            } else if coefficient > 0.0 {
                variable.lower_bound()
            } else {
                variable.upper_bound()
            };
            bound += coefficient * value as f64;
        }
        bound
    }

    /// Largest value the form can take under the variable bounds.
    pub fn upper_bound(&self, variables: &[Variable]) -> f64 {
        let mut bound = self.constant;
        for &(id, coefficient) in &self.sensitivities {
            let variable = &variables[id.index()];
            let value = if variable.is_fixed() {
                variable.value()
            } else if coefficient > 0.0 {
                variable.upper_bound()
            } else {
                variable.lower_bound()
            };
            bound += coefficient * value as f64;
        }
        bound
    }

    /// Non-fixed participating variables with positive coefficient.
    pub fn positive_coefficient_mutable_variable_ids(
        &self,
        variables: &[Variable],
    ) -> Vec<VariableId> {
        self.sensitivities
            .iter()
            .filter(|&&(id, coefficient)| coefficient > 0.0 && !variables[id.index()].is_fixed())
            .map(|&(id, _)| id)
            .collect()
    }

    /// Non-fixed participating variables with negative coefficient.
    pub fn negative_coefficient_mutable_variable_ids(
        &self,
        variables: &[Variable],
    ) -> Vec<VariableId> {
        self.sensitivities
            .iter()
            .filter(|&&(id, coefficient)| coefficient < 0.0 && !variables[id.index()].is_fixed())
            .map(|&(id, _)| id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variables(values: &[(i64, i64, i64)]) -> Vec<Variable> {
        values
            .iter()
            .enumerate()
            .map(|(index, &(value, lower, upper))| {
                let mut variable =
                    Variable::new(VariableId(index as u32), format!("x{index}"), lower, upper);
                variable.set_value_silently(value);
                variable
            })
            .collect()
    }

    fn setup(expression: &mut Expression, vars: &[Variable]) {
        expression.setup_fixed_sensitivities();
        expression.setup_mask();
        expression.update(vars);
    }

    #[test]
    fn test_add_term_merges_duplicates() {
        let mut expression = Expression::new();
        expression.add_term(VariableId(0), 2.0);
        expression.add_term(VariableId(0), 3.0);
        expression.add_term(VariableId(1), -1.0);
        assert_eq!(expression.sensitivities().len(), 2);
        assert_eq!(expression.sensitivity(VariableId(0)), 5.0);
        assert_eq!(expression.sensitivity(VariableId(1)), -1.0);
        assert_eq!(expression.sensitivity(VariableId(9)), 0.0);
    }

    #[test]
    fn test_evaluate_matches_linear_form() {
        let vars = variables(&[(2, 0, 10), (3, 0, 10)]);
        let expression =
            Expression::from_terms(vec![(VariableId(0), 2.0), (VariableId(1), -1.0)], 5.0);
        assert_eq!(expression.evaluate(&vars), 2.0 * 2.0 - 3.0 + 5.0);
    }

    #[test]
    fn test_fixed_sensitivities_mirror_the_mapping() {
        let mut expression = Expression::from_terms(
            vec![(VariableId(0), 2.0), (VariableId(5), -0.5)],
            0.0,
        );
        expression.setup_fixed_sensitivities();

        for &(id, coefficient) in expression.sensitivities() {
            assert_eq!(expression.fixed_sensitivities.at(id.0), coefficient);
        }
        assert_eq!(
            expression.fixed_sensitivities.at(3),
            0.0,
            "absent variables must yield the numeric zero"
        );
    }

    #[test]
    fn test_evaluate_move_agrees_with_apply_then_evaluate() {
        let mut vars = variables(&[(1, 0, 10), (4, 0, 10), (0, 0, 10)]);
        let mut expression = Expression::from_terms(
            vec![
                (VariableId(0), 1.5),
                (VariableId(1), -2.0),
                (VariableId(2), 4.0),
            ],
            -1.0,
        );
        setup(&mut expression, &vars);

        let alterations: Vec<Alteration> = vec![(VariableId(0), 3), (VariableId(2), 2)];
        let predicted = expression.evaluate_move(&alterations, &vars);

        vars[0].set_value(3);
        vars[2].set_value(2);
        expression.update(&vars);
        assert!((predicted - expression.value()).abs() < 1e-12);
    }

    #[test]
    fn test_mask_fast_path_agrees_with_general_path() {
        // All coefficients +1 and distinct signatures: mask is effective.
        let vars = variables(&[(0, 0, 1), (1, 0, 1), (0, 0, 1)]);
        let mut expression = Expression::from_terms(
            vec![
                (VariableId(0), 1.0),
                (VariableId(1), 1.0),
                (VariableId(2), 1.0),
            ],
            0.0,
        );
        setup(&mut expression, &vars);
        assert!(expression.has_effective_plus_one_mask());

        for variable in &vars {
            let target = 1 - variable.value();
            let fast = expression.evaluate_with_mask(variable, target);
            let general = expression.evaluate_move(&[(variable.id(), target)], &vars);
            assert!(
                (fast - general).abs() < 1e-10,
                "mask path must agree for {}",
                variable.id()
            );
        }
    }

    #[test]
    fn test_mask_not_effective_with_mixed_coefficients() {
        // Two of three coefficients are not +1, so under half of the
        // participating variables can use the +1 fast path.
        let vars = variables(&[(0, 0, 5), (0, 0, 5), (0, 0, 5)]);
        let mut expression = Expression::from_terms(
            vec![
                (VariableId(0), 1.0),
                (VariableId(1), 2.0),
                (VariableId(2), 3.0),
            ],
            0.0,
        );
        setup(&mut expression, &vars);
        assert!(!expression.has_effective_plus_one_mask());

        // The fallback still answers correctly.
        let fast = expression.evaluate_with_mask(&vars[1], 4);
        assert!((fast - 8.0).abs() < 1e-10);
    }

    #[test]
    fn test_minus_one_mask_fast_path() {
        let vars = variables(&[(2, 0, 5), (3, 0, 5)]);
        let mut expression =
            Expression::from_terms(vec![(VariableId(0), -1.0), (VariableId(1), -1.0)], 0.0);
        setup(&mut expression, &vars);
        assert!(expression.has_effective_minus_one_mask());

        let fast = expression.evaluate_with_mask(&vars[0], 4);
        let general = expression.evaluate_move(&[(VariableId(0), 4)], &vars);
        assert!((fast - general).abs() < 1e-10);
        assert!((fast - (-5.0 - 2.0)).abs() < 1e-10);
    }

    #[test]
    fn test_bounds_respect_fixed_variables_and_signs() {
        let mut vars = variables(&[(0, 0, 10), (5, 0, 10)]);
        vars[1].fix_to(5);
        let expression =
            Expression::from_terms(vec![(VariableId(0), 2.0), (VariableId(1), -3.0)], 1.0);

        // x0 free in [0,10] with +2, x1 fixed at 5 with -3.
        assert_eq!(expression.lower_bound(&vars), 0.0 - 15.0 + 1.0);
        assert_eq!(expression.upper_bound(&vars), 20.0 - 15.0 + 1.0);
    }

    #[test]
    fn test_signed_coefficient_variable_lists() {
        let mut vars = variables(&[(0, 0, 1), (0, 0, 1), (0, 0, 1)]);
        vars[2].fix();
        let expression = Expression::from_terms(
            vec![
                (VariableId(0), 1.0),
                (VariableId(1), -1.0),
                (VariableId(2), 1.0),
            ],
            0.0,
        );
        assert_eq!(
            expression.positive_coefficient_mutable_variable_ids(&vars),
            vec![VariableId(0)]
        );
        assert_eq!(
            expression.negative_coefficient_mutable_variable_ids(&vars),
            vec![VariableId(1)]
        );
    }
}
