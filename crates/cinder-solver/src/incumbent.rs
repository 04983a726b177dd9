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
use cinder_model::score::SolutionScore;
use cinder_model::solution::DenseSolution;

pub const NO_UPDATE: u8 = 0;
pub const LOCAL_AUGMENTED_INCUMBENT_UPDATE: u8 = 1;
pub const GLOBAL_AUGMENTED_INCUMBENT_UPDATE: u8 = 2;
pub const FEASIBLE_INCUMBENT_UPDATE: u8 = 4;

const HUGE: f64 = 1e100;

/// The three incumbents of the search hierarchy: best feasible, best
/// globally augmented, best locally augmented within the current search
/// session.
///
/// Invariant: the feasible incumbent objective never worsens over the
/// lifetime of the holder.
#[derive(Debug, Clone)]
pub struct IncumbentHolder {
    feasible_incumbent: Option<DenseSolution>,
    global_augmented_incumbent: Option<DenseSolution>,
    local_augmented_incumbent: Option<DenseSolution>,
    feasible_incumbent_score: SolutionScore,
    global_augmented_incumbent_score: SolutionScore,
    local_augmented_incumbent_score: SolutionScore,
    feasible_incumbent_objective: f64,
    global_augmented_incumbent_objective: f64,
    local_augmented_incumbent_objective: f64,
}

impl Default for IncumbentHolder {
    fn default() -> Self {
        Self::new()
    }
}

impl IncumbentHolder {
    pub fn new() -> Self {
        Self {
            feasible_incumbent: None,
            global_augmented_incumbent: None,
            local_augmented_incumbent: None,
            feasible_incumbent_score: SolutionScore::default(),
            global_augmented_incumbent_score: SolutionScore::default(),
            local_augmented_incumbent_score: SolutionScore::default(),
            feasible_incumbent_objective: HUGE,
            global_augmented_incumbent_objective: HUGE,
            local_augmented_incumbent_objective: HUGE,
        }
    }

    /// Offers a solution; returns the OR of the update bits, checked in
    /// the order local, global, feasible. Feasibility gates only the
    /// feasible incumbent.
    pub fn try_update(&mut self, solution: &DenseSolution, score: &SolutionScore) -> u8 {
        let mut status = NO_UPDATE;

        if score.local_augmented_objective < self.local_augmented_incumbent_objective - EPSILON {
            status |= LOCAL_AUGMENTED_INCUMBENT_UPDATE;
            self.local_augmented_incumbent = Some(solution.clone());
            self.local_augmented_incumbent_score = *score;
            self.local_augmented_incumbent_objective = score.local_augmented_objective;
        }

        if score.global_augmented_objective < self.global_augmented_incumbent_objective - EPSILON {
            status |= GLOBAL_AUGMENTED_INCUMBENT_UPDATE;
            self.global_augmented_incumbent = Some(solution.clone());
            self.global_augmented_incumbent_score = *score;
            self.global_augmented_incumbent_objective = score.global_augmented_objective;
        }

        if score.is_feasible && score.objective < self.feasible_incumbent_objective - EPSILON {
            status |= FEASIBLE_INCUMBENT_UPDATE;
            self.feasible_incumbent = Some(solution.clone());
            self.feasible_incumbent_score = *score;
            self.feasible_incumbent_objective = score.objective;
        }

        status
    }

    /// Drops the session-scoped incumbent; called at the start of each
    /// search session.
    pub fn reset_local_augmented_incumbent(&mut self) {
        self.local_augmented_incumbent = None;
        self.local_augmented_incumbent_score = SolutionScore::default();
        self.local_augmented_incumbent_objective = HUGE;
    }

    #[inline]
    pub fn has_feasible_incumbent(&self) -> bool {
        self.feasible_incumbent.is_some()
    }

    #[inline]
    pub fn feasible_incumbent(&self) -> Option<&DenseSolution> {
        self.feasible_incumbent.as_ref()
    }

    #[inline]
    pub fn global_augmented_incumbent(&self) -> Option<&DenseSolution> {
        self.global_augmented_incumbent.as_ref()
    }

    #[inline]
    pub fn local_augmented_incumbent(&self) -> Option<&DenseSolution> {
        self.local_augmented_incumbent.as_ref()
    }

    #[inline]
    pub fn feasible_incumbent_objective(&self) -> f64 {
        self.feasible_incumbent_objective
    }

    #[inline]
    pub fn global_augmented_incumbent_objective(&self) -> f64 {
        self.global_augmented_incumbent_objective
    }

    #[inline]
    pub fn local_augmented_incumbent_objective(&self) -> f64 {
        self.local_augmented_incumbent_objective
    }

    #[inline]
    pub fn feasible_incumbent_score(&self) -> &SolutionScore {
        &self.feasible_incumbent_score
    }

    #[inline]
    pub fn global_augmented_incumbent_score(&self) -> &SolutionScore {
        &self.global_augmented_incumbent_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solution(values: &[i64]) -> DenseSolution {
        DenseSolution {
            variable_values: values.to_vec(),
            objective: 0.0,
            total_violation: 0.0,
            is_feasible: true,
        }
    }

    fn score(objective: f64, violation: f64, penalty: f64) -> SolutionScore {
        SolutionScore {
            objective,
            total_violation: violation,
            local_penalty: penalty,
            global_penalty: penalty,
            local_augmented_objective: objective + penalty,
            global_augmented_objective: objective + penalty,
            is_feasible: violation == 0.0,
            ..SolutionScore::default()
        }
    }

    #[test]
    fn test_all_three_bits_for_a_feasible_improvement() {
        let mut holder = IncumbentHolder::new();
        let status = holder.try_update(&solution(&[1]), &score(5.0, 0.0, 0.0));
        assert_eq!(
            status,
            LOCAL_AUGMENTED_INCUMBENT_UPDATE
                | GLOBAL_AUGMENTED_INCUMBENT_UPDATE
                | FEASIBLE_INCUMBENT_UPDATE
        );
        assert_eq!(holder.feasible_incumbent_objective(), 5.0);
    }

    #[test]
    fn test_infeasible_updates_never_touch_the_feasible_incumbent() {
        let mut holder = IncumbentHolder::new();
        holder.try_update(&solution(&[1]), &score(5.0, 0.0, 0.0));

        let status = holder.try_update(&solution(&[0]), &score(1.0, 2.0, 3.0));
        assert_ne!(status & GLOBAL_AUGMENTED_INCUMBENT_UPDATE, 0);
        assert_eq!(status & FEASIBLE_INCUMBENT_UPDATE, 0);
        assert_eq!(holder.feasible_incumbent_objective(), 5.0);
    }

    #[test]
    fn test_feasible_incumbent_objective_never_increases() {
        let mut holder = IncumbentHolder::new();
        holder.try_update(&solution(&[1]), &score(5.0, 0.0, 0.0));
        holder.try_update(&solution(&[2]), &score(7.0, 0.0, 0.0));
        assert_eq!(holder.feasible_incumbent_objective(), 5.0);
        holder.try_update(&solution(&[3]), &score(3.0, 0.0, 0.0));
        assert_eq!(holder.feasible_incumbent_objective(), 3.0);
    }

    #[test]
    fn test_local_reset_leaves_global_and_feasible() {
        let mut holder = IncumbentHolder::new();
        holder.try_update(&solution(&[1]), &score(5.0, 0.0, 0.0));
        holder.reset_local_augmented_incumbent();

        assert!(holder.local_augmented_incumbent().is_none());
        assert!(holder.global_augmented_incumbent().is_some());
        assert!(holder.has_feasible_incumbent());

        // After the reset, even a worse solution is a local update.
        let status = holder.try_update(&solution(&[0]), &score(9.0, 0.0, 0.0));
        assert_ne!(status & LOCAL_AUGMENTED_INCUMBENT_UPDATE, 0);
        assert_eq!(status & GLOBAL_AUGMENTED_INCUMBENT_UPDATE, 0);
    }
}
