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

use cinder_model::expression::Alteration;

/// Per-variable recency stamps and frequency counters backing the tabu
/// tenure rule and the frequency penalty.
#[derive(Debug, Clone)]
pub struct Memory {
    last_update_iterations: Vec<i64>,
    update_counts: Vec<u64>,
    total_update_count: u64,
}

impl Memory {
    pub fn new(variable_count: usize) -> Self {
        Self {
            last_update_iterations: vec![i64::MIN / 2; variable_count],
            update_counts: vec![0; variable_count],
            total_update_count: 0,
        }
    }

    /// Forgets recency, keeping the frequency counters. Called when a
    /// new search session starts.
    pub fn reset_last_update_iterations(&mut self) {
        for stamp in &mut self.last_update_iterations {
            *stamp = i64::MIN / 2;
        }
    }

    /// Stamps every touched variable with the accepting iteration.
    pub fn update(&mut self, alterations: &[Alteration], iteration: usize) {
        for &(variable_id, _) in alterations {
            self.last_update_iterations[variable_id.index()] = iteration as i64;
            self.update_counts[variable_id.index()] += 1;
        }
        self.total_update_count += 1;
    }

    /// A variable is tabu while the current iteration lies within the
    /// tenure window after its last accepted change.
    #[inline]
    pub fn is_variable_tabu(&self, variable_index: usize, iteration: usize, tenure: usize) -> bool {
        iteration as i64 - self.last_update_iterations[variable_index] <= tenure as i64
    }

    pub fn is_move_tabu(&self, alterations: &[Alteration], iteration: usize, tenure: usize) -> bool {
        alterations
            .iter()
            .any(|&(variable_id, _)| self.is_variable_tabu(variable_id.index(), iteration, tenure))
    }

    /// Frequency bias proportional to how often the touched variables
    /// have moved relative to the iteration count.
    pub fn frequency_penalty(&self, alterations: &[Alteration], iteration: usize) -> f64 {
        let denominator = iteration.max(1) as f64;
        alterations
            .iter()
            .map(|&(variable_id, _)| self.update_counts[variable_id.index()] as f64 / denominator)
            .sum()
    }

    #[inline]
    pub fn update_count(&self, variable_index: usize) -> u64 {
        self.update_counts[variable_index]
    }

    #[inline]
    pub fn total_update_count(&self) -> u64 {
        self.total_update_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_model::ids::VariableId;

    #[test]
    fn test_tabu_window() {
        let mut memory = Memory::new(2);
        assert!(!memory.is_variable_tabu(0, 0, 10), "untouched is never tabu");

        memory.update(&[(VariableId(0), 1)], 5);
        assert!(memory.is_variable_tabu(0, 5, 3));
        assert!(memory.is_variable_tabu(0, 8, 3));
        assert!(!memory.is_variable_tabu(0, 9, 3));
        assert!(!memory.is_variable_tabu(1, 8, 3));
    }

    #[test]
    fn test_counts_and_frequency_penalty() {
        let mut memory = Memory::new(2);
        memory.update(&[(VariableId(0), 1)], 1);
        memory.update(&[(VariableId(0), 0)], 2);
        memory.update(&[(VariableId(1), 1)], 3);

        assert_eq!(memory.update_count(0), 2);
        assert_eq!(memory.update_count(1), 1);
        assert_eq!(memory.total_update_count(), 3);

        let penalty = memory.frequency_penalty(&[(VariableId(0), 1)], 4);
        assert!((penalty - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_reset_keeps_frequencies() {
        let mut memory = Memory::new(1);
        memory.update(&[(VariableId(0), 1)], 7);
        memory.reset_last_update_iterations();
        assert!(!memory.is_variable_tabu(0, 8, 100));
        assert_eq!(memory.update_count(0), 1);
    }
}
