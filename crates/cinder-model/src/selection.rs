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
use serde::{Deserialize, Serialize};

/// How set-partitioning rows are promoted to selection groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    Off,
    /// Only rows the caller explicitly nominated.
    Defined,
    /// Among overlapping candidates, the row with fewer members wins.
    Smaller,
    /// Among overlapping candidates, the row with more members wins.
    Larger,
    /// Only rows sharing no variable with any other candidate.
    #[default]
    Independent,
}

/// A promoted set-partitioning row: its member variables form a
/// mutually-exclusive group in which exactly one variable holds 1.
///
/// The promoted row itself is disabled; the invariant is maintained
/// structurally by selection-swap moves.
#[derive(Debug, Clone)]
pub struct Selection {
    id: SelectionId,
    constraint_id: ConstraintId,
    variable_ids: Vec<VariableId>,
    /// Sorted union of the members' related constraints, the domain of
    /// the specialized swap evaluation.
    related_constraint_ids: Vec<ConstraintId>,
}

impl Selection {
    pub fn new(id: SelectionId, constraint_id: ConstraintId, variable_ids: Vec<VariableId>) -> Self {
        Self {
            id,
            constraint_id,
            variable_ids,
            related_constraint_ids: Vec::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> SelectionId {
        self.id
    }

    #[inline]
    pub fn constraint_id(&self) -> ConstraintId {
        self.constraint_id
    }

    #[inline]
    pub fn variable_ids(&self) -> &[VariableId] {
        &self.variable_ids
    }

    #[inline]
    pub fn related_constraint_ids(&self) -> &[ConstraintId] {
        &self.related_constraint_ids
    }

    pub fn set_related_constraint_ids(&mut self, ids: Vec<ConstraintId>) {
        self.related_constraint_ids = ids;
    }
}
