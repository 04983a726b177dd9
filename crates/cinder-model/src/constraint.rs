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

use crate::classification::ConstraintTag;
use crate::expression::{Alteration, Expression};
use crate::ids::ConstraintId;
use crate::variable::Variable;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintSense {
    Less,
    Equal,
    Greater,
}

impl fmt::Display for ConstraintSense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintSense::Less => write!(f, "<="),
            ConstraintSense::Equal => write!(f, "="),
            ConstraintSense::Greater => write!(f, ">="),
        }
    }
}

/// One row of the model: an expression holding `lhs - rhs` plus a sense.
///
/// Invariants: `violation >= 0`; for `<=` it is `max(0, lhs - rhs)`, for
/// `>=` it is `max(0, rhs - lhs)`, for `=` it is `|lhs - rhs|`. A
/// disabled constraint contributes no violation but stays visible for
/// reporting.
#[derive(Debug, Clone)]
pub struct Constraint {
    id: ConstraintId,
    name: String,
    expression: Expression,
    sense: ConstraintSense,
    constraint_value: f64,
    positive_part: f64,
    negative_part: f64,
    violation: f64,
    tags: Vec<ConstraintTag>,
    is_enabled: bool,
    is_evaluation_ignorable: bool,
    local_penalty_coefficient_less: f64,
    local_penalty_coefficient_greater: f64,
}

impl Constraint {
    pub fn new(
        id: ConstraintId,
        name: impl Into<String>,
        expression: Expression,
        sense: ConstraintSense,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            expression,
            sense,
            constraint_value: 0.0,
            positive_part: 0.0,
            negative_part: 0.0,
            violation: 0.0,
            tags: Vec::new(),
            is_enabled: true,
            is_evaluation_ignorable: false,
            local_penalty_coefficient_less: 0.0,
            local_penalty_coefficient_greater: 0.0,
        }
    }

    #[inline]
    pub fn id(&self) -> ConstraintId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    #[inline]
    pub fn expression_mut(&mut self) -> &mut Expression {
        &mut self.expression
    }

    #[inline]
    pub fn sense(&self) -> ConstraintSense {
        self.sense
    }

    /// True for `<=` and `=`: the positive side of the row is penalized.
    #[inline]
    pub fn is_less_or_equal(&self) -> bool {
        matches!(self.sense, ConstraintSense::Less | ConstraintSense::Equal)
    }

    /// True for `>=` and `=`: the negative side of the row is penalized.
    #[inline]
    pub fn is_greater_or_equal(&self) -> bool {
        matches!(self.sense, ConstraintSense::Greater | ConstraintSense::Equal)
    }

    #[inline]
    pub fn constraint_value(&self) -> f64 {
        self.constraint_value
    }

    #[inline]
    pub fn positive_part(&self) -> f64 {
        self.positive_part
    }

    #[inline]
    pub fn negative_part(&self) -> f64 {
        self.negative_part
    }

    #[inline]
    pub fn violation(&self) -> f64 {
        self.violation
    }

    #[inline]
    pub fn is_feasible(&self) -> bool {
        self.violation < cinder_core::num::EPSILON
    }

    /// The row value after applying `alterations`, over the touched
    /// variables only.
    #[inline]
    pub fn evaluate_move(&self, alterations: &[Alteration], variables: &[Variable]) -> f64 {
        self.expression.evaluate_move(alterations, variables)
    }

    /// Refreshes the cached row value, parts and violation from scratch.
    pub fn update(&mut self, variables: &[Variable]) {
        self.expression.update(variables);
        self.refresh_cached_values();
    }

    /// Refreshes the cache incrementally under `alterations`.
    pub fn update_move(&mut self, alterations: &[Alteration], variables: &[Variable]) {
        self.expression.update_move(alterations, variables);
        self.refresh_cached_values();
    }

    fn refresh_cached_values(&mut self) {
        self.constraint_value = self.expression.value();
        self.positive_part = self.constraint_value.max(0.0);
        self.negative_part = (-self.constraint_value).max(0.0);
        self.violation = match self.sense {
            ConstraintSense::Less => self.positive_part,
            ConstraintSense::Greater => self.negative_part,
            ConstraintSense::Equal => self.constraint_value.abs(),
        };
    }

    #[inline]
    pub fn tags(&self) -> &[ConstraintTag] {
        &self.tags
    }

    #[inline]
    pub fn has_tag(&self, tag: ConstraintTag) -> bool {
        self.tags.contains(&tag)
    }

    pub fn set_tags(&mut self, tags: Vec<ConstraintTag>) {
        self.tags = tags;
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.is_enabled
    }

    #[inline]
    pub fn enable(&mut self) {
        self.is_enabled = true;
    }

    #[inline]
    pub fn disable(&mut self) {
        self.is_enabled = false;
    }

    #[inline]
    pub fn is_evaluation_ignorable(&self) -> bool {
        self.is_evaluation_ignorable
    }

    #[inline]
    pub fn set_is_evaluation_ignorable(&mut self, flag: bool) {
        self.is_evaluation_ignorable = flag;
    }

    #[inline]
    pub fn local_penalty_coefficient_less(&self) -> f64 {
        self.local_penalty_coefficient_less
    }

    #[inline]
    pub fn local_penalty_coefficient_greater(&self) -> f64 {
        self.local_penalty_coefficient_greater
    }

    #[inline]
    pub fn set_local_penalty_coefficients(&mut self, less: f64, greater: f64) {
        self.local_penalty_coefficient_less = less;
        self.local_penalty_coefficient_greater = greater;
    }

    #[inline]
    pub fn scale_local_penalty_coefficients(&mut self, rate: f64) {
        self.local_penalty_coefficient_less *= rate;
        self.local_penalty_coefficient_greater *= rate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::VariableId;

    fn binary_variables(values: &[i64]) -> Vec<Variable> {
        values
            .iter()
            .enumerate()
            .map(|(index, &value)| {
                let mut variable =
                    Variable::new(VariableId(index as u32), format!("x{index}"), 0, 1);
                variable.set_value_silently(value);
                variable
            })
            .collect()
    }

    fn partition_constraint(variable_count: usize, rhs: f64) -> Constraint {
        let terms: Vec<(VariableId, f64)> = (0..variable_count)
            .map(|index| (VariableId(index as u32), 1.0))
            .collect();
        Constraint::new(
            ConstraintId(0),
            "partition",
            Expression::from_terms(terms, -rhs),
            ConstraintSense::Equal,
        )
    }

    #[test]
    fn test_violation_for_equal_sense() {
        let vars = binary_variables(&[1, 1, 0]);
        let mut constraint = partition_constraint(3, 1.0);
        constraint.update(&vars);

        assert_eq!(constraint.constraint_value(), 1.0);
        assert_eq!(constraint.violation(), 1.0);
        assert!(!constraint.is_feasible());
    }

    #[test]
    fn test_violation_for_less_sense_is_positive_part() {
        let vars = binary_variables(&[1, 1, 1]);
        let terms: Vec<(VariableId, f64)> =
            (0..3).map(|index| (VariableId(index), 1.0)).collect();
        let mut constraint = Constraint::new(
            ConstraintId(0),
            "packing",
            Expression::from_terms(terms, -2.0),
            ConstraintSense::Less,
        );
        constraint.update(&vars);

        assert_eq!(constraint.positive_part(), 1.0);
        assert_eq!(constraint.negative_part(), 0.0);
        assert_eq!(constraint.violation(), 1.0);
    }

    #[test]
    fn test_violation_for_greater_sense_is_negative_part() {
        let vars = binary_variables(&[0, 0, 0]);
        let terms: Vec<(VariableId, f64)> =
            (0..3).map(|index| (VariableId(index), 1.0)).collect();
        let mut constraint = Constraint::new(
            ConstraintId(0),
            "covering",
            Expression::from_terms(terms, -1.0),
            ConstraintSense::Greater,
        );
        constraint.update(&vars);

        assert_eq!(constraint.negative_part(), 1.0);
        assert_eq!(constraint.violation(), 1.0);
        assert!(!constraint.is_feasible());
    }

    #[test]
    fn test_satisfied_constraint_has_zero_violation() {
        let vars = binary_variables(&[1, 0, 0]);
        let mut constraint = partition_constraint(3, 1.0);
        constraint.update(&vars);
        assert_eq!(constraint.violation(), 0.0);
        assert!(constraint.is_feasible());
    }

    #[test]
    fn test_update_move_matches_full_update() {
        let mut vars = binary_variables(&[1, 0, 0]);
        let mut constraint = partition_constraint(3, 1.0);
        constraint.expression_mut().setup_fixed_sensitivities();
        constraint.update(&vars);

        let alterations = vec![(VariableId(1), 1i64)];
        constraint.update_move(&alterations, &vars);
        vars[1].set_value(1);

        let mut fresh = partition_constraint(3, 1.0);
        fresh.update(&vars);
        assert_eq!(constraint.constraint_value(), fresh.constraint_value());
        assert_eq!(constraint.violation(), fresh.violation());
    }
}
