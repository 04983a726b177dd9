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

use crate::ids::{ConstraintId, SelectionId, VariableId};

/// Structural role of a variable, refined during model setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableSense {
    Binary,
    Integer,
    Selection,
    DependentBinary,
    DependentInteger,
}

/// A bounded integer decision variable.
///
/// Invariant: `lower_bound <= value <= upper_bound` whenever the variable
/// is not fixed; a fixed variable holds its single admissible value.
#[derive(Debug, Clone)]
pub struct Variable {
    id: VariableId,
    name: String,
    value: i64,
    lower_bound: i64,
    upper_bound: i64,
    is_fixed: bool,
    sense: VariableSense,
    objective_sensitivity: f64,
    constraint_sensitivities: Vec<(ConstraintId, f64)>,
    related_constraint_ids: Vec<ConstraintId>,
    selection_id: Option<SelectionId>,
    // Index range of this variable's constraints within the owning
    // selection's related-constraint list; -1 when not a selection member.
    related_selection_constraint_index_min: i64,
    related_selection_constraint_index_max: i64,
    update_count: u64,
    is_objective_improvable: bool,
    is_feasibility_improvable: bool,
}

impl Variable {
    pub fn new(id: VariableId, name: impl Into<String>, lower_bound: i64, upper_bound: i64) -> Self {
        let sense = if lower_bound == 0 && upper_bound == 1 {
            VariableSense::Binary
        } else {
            VariableSense::Integer
        };
        Self {
            id,
            name: name.into(),
            value: lower_bound,
            lower_bound,
            upper_bound,
            is_fixed: false,
            sense,
            objective_sensitivity: 0.0,
            constraint_sensitivities: Vec::new(),
            related_constraint_ids: Vec::new(),
            selection_id: None,
            related_selection_constraint_index_min: -1,
            related_selection_constraint_index_max: -1,
            update_count: 0,
            is_objective_improvable: false,
            is_feasibility_improvable: false,
        }
    }

    #[inline]
    pub fn id(&self) -> VariableId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn value(&self) -> i64 {
        self.value
    }

    #[inline]
    pub fn set_value(&mut self, value: i64) {
        self.value = value;
        self.update_count += 1;
    }

    /// Sets the value without counting it as a search update. Used when
    /// importing initial solutions.
    #[inline]
    pub fn set_value_silently(&mut self, value: i64) {
        self.value = value;
    }

    #[inline]
    pub fn lower_bound(&self) -> i64 {
        self.lower_bound
    }

    #[inline]
    pub fn upper_bound(&self) -> i64 {
        self.upper_bound
    }

    pub fn set_bounds(&mut self, lower_bound: i64, upper_bound: i64) {
        self.lower_bound = lower_bound;
        self.upper_bound = upper_bound;
        if !matches!(
            self.sense,
            VariableSense::Selection
                | VariableSense::DependentBinary
                | VariableSense::DependentInteger
        ) {
            self.sense = if lower_bound == 0 && upper_bound == 1 {
                VariableSense::Binary
            } else {
                VariableSense::Integer
            };
        }
    }

    #[inline]
    pub fn is_fixed(&self) -> bool {
        self.is_fixed
    }

    #[inline]
    pub fn fix(&mut self) {
        self.is_fixed = true;
    }

    #[inline]
    pub fn fix_to(&mut self, value: i64) {
        self.value = value;
        self.lower_bound = value;
        self.upper_bound = value;
        self.is_fixed = true;
    }

    #[inline]
    pub fn unfix(&mut self) {
        self.is_fixed = false;
    }

    #[inline]
    pub fn sense(&self) -> VariableSense {
        self.sense
    }

    #[inline]
    pub fn set_sense(&mut self, sense: VariableSense) {
        self.sense = sense;
    }

    #[inline]
    pub fn is_binary(&self) -> bool {
        self.lower_bound == 0 && self.upper_bound == 1
    }

    #[inline]
    pub fn has_lower_bound_margin(&self) -> bool {
        self.value > self.lower_bound
    }

    #[inline]
    pub fn has_upper_bound_margin(&self) -> bool {
        self.value < self.upper_bound
    }

    #[inline]
    pub fn objective_sensitivity(&self) -> f64 {
        self.objective_sensitivity
    }

    #[inline]
    pub fn set_objective_sensitivity(&mut self, sensitivity: f64) {
        self.objective_sensitivity = sensitivity;
    }

    #[inline]
    pub fn constraint_sensitivities(&self) -> &[(ConstraintId, f64)] {
        &self.constraint_sensitivities
    }

    pub fn reset_constraint_sensitivities(&mut self) {
        self.constraint_sensitivities.clear();
    }

    pub fn push_constraint_sensitivity(&mut self, constraint_id: ConstraintId, coefficient: f64) {
        self.constraint_sensitivities.push((constraint_id, coefficient));
    }

    #[inline]
    pub fn related_constraint_ids(&self) -> &[ConstraintId] {
        &self.related_constraint_ids
    }

    pub fn set_related_constraint_ids(&mut self, ids: Vec<ConstraintId>) {
        self.related_constraint_ids = ids;
    }

    #[inline]
    pub fn selection_id(&self) -> Option<SelectionId> {
        self.selection_id
    }

    #[inline]
    pub fn set_selection_id(&mut self, selection_id: Option<SelectionId>) {
        self.selection_id = selection_id;
    }

    #[inline]
    pub fn related_selection_constraint_index_range(&self) -> (i64, i64) {
        (
            self.related_selection_constraint_index_min,
            self.related_selection_constraint_index_max,
        )
    }

    pub fn set_related_selection_constraint_index_range(&mut self, min: i64, max: i64) {
        self.related_selection_constraint_index_min = min;
        self.related_selection_constraint_index_max = max;
    }

    #[inline]
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    #[inline]
    pub fn is_objective_improvable(&self) -> bool {
        self.is_objective_improvable
    }

    #[inline]
    pub fn set_is_objective_improvable(&mut self, flag: bool) {
        self.is_objective_improvable = flag;
    }

    #[inline]
    pub fn is_feasibility_improvable(&self) -> bool {
        self.is_feasibility_improvable
    }

    #[inline]
    pub fn set_is_feasibility_improvable(&mut self, flag: bool) {
        self.is_feasibility_improvable = flag;
    }

    #[inline]
    pub fn set_is_feasibility_improvable_if_has_lower_bound_margin(&mut self) {
        if self.has_lower_bound_margin() {
            self.is_feasibility_improvable = true;
        }
    }

    #[inline]
    pub fn set_is_feasibility_improvable_if_has_upper_bound_margin(&mut self) {
        if self.has_upper_bound_margin() {
            self.is_feasibility_improvable = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sense_follows_bounds() {
        let v = Variable::new(VariableId(0), "x", 0, 1);
        assert_eq!(v.sense(), VariableSense::Binary);

        let w = Variable::new(VariableId(1), "y", -5, 5);
        assert_eq!(w.sense(), VariableSense::Integer);
    }

    #[test]
    fn test_fix_to_collapses_bounds() {
        let mut v = Variable::new(VariableId(0), "x", 0, 10);
        v.fix_to(4);
        assert!(v.is_fixed());
        assert_eq!(v.value(), 4);
        assert_eq!(v.lower_bound(), 4);
        assert_eq!(v.upper_bound(), 4);
    }

    #[test]
    fn test_bound_margins() {
        let mut v = Variable::new(VariableId(0), "x", 0, 2);
        v.set_value_silently(0);
        assert!(!v.has_lower_bound_margin());
        assert!(v.has_upper_bound_margin());

        v.set_value_silently(2);
        assert!(v.has_lower_bound_margin());
        assert!(!v.has_upper_bound_margin());
    }

    #[test]
    fn test_conditional_feasibility_improvable_setters() {
        let mut v = Variable::new(VariableId(0), "x", 0, 1);
        v.set_value_silently(0);

        v.set_is_feasibility_improvable_if_has_lower_bound_margin();
        assert!(!v.is_feasibility_improvable(), "no lower margin at 0");

        v.set_is_feasibility_improvable_if_has_upper_bound_margin();
        assert!(v.is_feasibility_improvable(), "upper margin at 0");
    }

    #[test]
    fn test_update_count_tracks_search_updates_only() {
        let mut v = Variable::new(VariableId(0), "x", 0, 10);
        v.set_value_silently(3);
        assert_eq!(v.update_count(), 0);
        v.set_value(4);
        v.set_value(5);
        assert_eq!(v.update_count(), 2);
    }
}
