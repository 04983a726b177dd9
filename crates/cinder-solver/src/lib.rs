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

pub mod incumbent;
pub mod lagrange;
pub mod local_search;
pub mod memory;
pub mod neighborhood;
pub mod option;
pub mod presolve;
pub mod result;
pub mod solve;
pub mod tabu;

pub mod prelude {
    pub use crate::incumbent::IncumbentHolder;
    pub use crate::memory::Memory;
    pub use crate::neighborhood::{Move, MoveSense, Neighborhood};
    pub use crate::option::{
        ChainMoveReduceMode, ImprovabilityScreeningMode, SolverOptions, Verbose,
    };
    pub use crate::presolve::{NoOpPresolver, Presolver};
    pub use crate::result::{SolveResult, SolveStatus, TerminationStatus};
    pub use crate::solve::{solve, solve_with_presolver};
}
