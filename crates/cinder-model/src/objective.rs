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

use crate::expression::{Alteration, Expression};
use crate::variable::Variable;

/// The objective expression. The engine always minimizes; the model's
/// sign converts between the internal and the user-facing direction.
#[derive(Debug, Clone, Default)]
pub struct Objective {
    expression: Expression,
}

impl Objective {
    pub fn new(expression: Expression) -> Self {
        Self { expression }
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
    pub fn value(&self) -> f64 {
        self.expression.value()
    }

    #[inline]
    pub fn evaluate_move(&self, alterations: &[Alteration], variables: &[Variable]) -> f64 {
        self.expression.evaluate_move(alterations, variables)
    }

    #[inline]
    pub fn update(&mut self, variables: &[Variable]) {
        self.expression.update(variables);
    }

    #[inline]
    pub fn update_move(&mut self, alterations: &[Alteration], variables: &[Variable]) {
        self.expression.update_move(alterations, variables);
    }
}
