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

use std::fmt;

/// Full scoring of one solution (or of a candidate move before it is
/// applied): objective, violation and the two penalty aggregates.
///
/// The objective carries the internal minimization sign already; callers
/// that report to the user multiply by the model sign at the boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SolutionScore {
    pub objective: f64,
    pub objective_improvement: f64,
    pub total_violation: f64,
    pub local_penalty: f64,
    pub global_penalty: f64,
    pub local_augmented_objective: f64,
    pub global_augmented_objective: f64,
    pub is_feasible: bool,
    pub is_objective_improvable: bool,
    pub is_feasibility_improvable: bool,
}

impl fmt::Display for SolutionScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SolutionScore(objective: {:.6e}, violation: {:.6e}, local_aug: {:.6e}, global_aug: {:.6e}, feasible: {})",
            self.objective,
            self.total_violation,
            self.local_augmented_objective,
            self.global_augmented_objective,
            self.is_feasible
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_zeroed_and_infeasible() {
        let score = SolutionScore::default();
        assert_eq!(score.objective, 0.0);
        assert_eq!(score.total_violation, 0.0);
        assert!(!score.is_feasible);
    }
}
