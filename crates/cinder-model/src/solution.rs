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

use cinder_core::num::EPSILON;
use serde::{Deserialize, Serialize};

/// Variable values of one solution, dense over the arena, together with
/// the scores needed to rank it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DenseSolution {
    pub variable_values: Vec<i64>,
    pub objective: f64,
    pub total_violation: f64,
    pub is_feasible: bool,
}

/// A reporting view of one solution carrying entity names; what the JSON
/// solution writer serializes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedSolution {
    pub name: String,
    pub objective: f64,
    pub total_violation: f64,
    pub is_feasible: bool,
    pub variables: Vec<NamedVariableValue>,
    pub constraints: Vec<NamedConstraintValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedVariableValue {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedConstraintValue {
    pub name: String,
    pub value: f64,
    pub violation: f64,
}

/// Bounded store of feasible solutions met during search, best first.
#[derive(Debug, Clone)]
pub struct SolutionArchive {
    capacity: usize,
    is_minimization: bool,
    solutions: Vec<DenseSolution>,
}

impl SolutionArchive {
    pub fn new(capacity: usize, is_minimization: bool) -> Self {
        Self {
            capacity: capacity.max(1),
            is_minimization,
            solutions: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }

    #[inline]
    pub fn solutions(&self) -> &[DenseSolution] {
        &self.solutions
    }

    /// Inserts a feasible solution, keeping the archive sorted by
    /// objective (best first) and bounded by its capacity. Duplicate
    /// variable assignments are ignored.
    pub fn push(&mut self, solution: DenseSolution) {
        if !solution.is_feasible {
            return;
        }
        if self
            .solutions
            .iter()
            .any(|stored| stored.variable_values == solution.variable_values)
        {
            return;
        }

        let key = |candidate: &DenseSolution| {
            if self.is_minimization {
                candidate.objective
            } else {
                -candidate.objective
            }
        };
        let position = self
            .solutions
            .partition_point(|stored| key(stored) < key(&solution) - EPSILON);
        self.solutions.insert(position, solution);
        if self.solutions.len() > self.capacity {
            self.solutions.truncate(self.capacity);
        }
    }

    /// The best archived solution, when any.
    pub fn best(&self) -> Option<&DenseSolution> {
        self.solutions.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feasible(values: &[i64], objective: f64) -> DenseSolution {
        DenseSolution {
            variable_values: values.to_vec(),
            objective,
            total_violation: 0.0,
            is_feasible: true,
        }
    }

    #[test]
    fn test_archive_keeps_best_first_and_bounded() {
        let mut archive = SolutionArchive::new(2, true);
        archive.push(feasible(&[0, 1], 5.0));
        archive.push(feasible(&[1, 0], 3.0));
        archive.push(feasible(&[1, 1], 4.0));

        assert_eq!(archive.len(), 2);
        assert_eq!(archive.best().unwrap().objective, 3.0);
        assert_eq!(archive.solutions()[1].objective, 4.0);
    }

    #[test]
    fn test_archive_rejects_infeasible_and_duplicates() {
        let mut archive = SolutionArchive::new(10, true);
        archive.push(DenseSolution {
            variable_values: vec![1],
            objective: 0.0,
            total_violation: 2.0,
            is_feasible: false,
        });
        assert!(archive.is_empty());

        archive.push(feasible(&[1], 1.0));
        archive.push(feasible(&[1], 1.0));
        assert_eq!(archive.len(), 1);
    }

    #[test]
    fn test_archive_orders_by_sign_for_maximization() {
        let mut archive = SolutionArchive::new(10, false);
        archive.push(feasible(&[0], 1.0));
        archive.push(feasible(&[1], 9.0));
        assert_eq!(archive.best().unwrap().objective, 9.0);
    }
}
