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

use cinder_model::solution::{NamedSolution, SolutionArchive};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Why a search core (or the whole solve) stopped. One shared set for
/// every core; `Converge` is reached only by the Lagrangian queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminationStatus {
    Optimal,
    LocalOptimal,
    NoMove,
    TimeOver,
    IterationOver,
    ReachTarget,
    Converge,
}

impl fmt::Display for TerminationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TerminationStatus::Optimal => "OPTIMAL",
            TerminationStatus::LocalOptimal => "LOCAL_OPTIMAL",
            TerminationStatus::NoMove => "NO_MOVE",
            TerminationStatus::TimeOver => "TIME_OVER",
            TerminationStatus::IterationOver => "ITERATION_OVER",
            TerminationStatus::ReachTarget => "REACH_TARGET",
            TerminationStatus::Converge => "CONVERGE",
        };
        write!(f, "{name}")
    }
}

/// Summary counters reported next to the solution.
#[derive(Debug, Clone, Serialize)]
pub struct SolveStatus {
    pub termination: TerminationStatus,
    pub is_found_feasible: bool,
    pub objective: f64,
    pub total_violation: f64,
    pub naive_dual_bound: f64,
    pub outer_iterations: usize,
    pub total_tabu_iterations: usize,
    #[serde(serialize_with = "serialize_duration_seconds")]
    pub elapsed: Duration,
}

fn serialize_duration_seconds<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Everything a solve returns: the best solution found, the status and
/// the archive of feasible solutions met on the way.
#[derive(Debug, Clone)]
pub struct SolveResult {
    pub solution: NamedSolution,
    pub status: SolveStatus,
    pub feasible_solution_archive: SolutionArchive,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_names() {
        assert_eq!(TerminationStatus::ReachTarget.to_string(), "REACH_TARGET");
        assert_eq!(TerminationStatus::Converge.to_string(), "CONVERGE");
    }
}
