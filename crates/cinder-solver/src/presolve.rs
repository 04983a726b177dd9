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

use cinder_model::err::ModelError;
use cinder_model::model::Model;

/// A model transformer run before search: redundancy elimination, bound
/// tightening and similar rewrites live behind this seam. The search
/// engine only requires that the model is rewritten in place and its
/// structure re-finalized by the caller afterwards.
pub trait Presolver {
    fn apply(&self, model: &mut Model) -> Result<PresolveReport, ModelError>;
}

/// What a presolver changed.
#[derive(Debug, Clone, Copy, Default)]
pub struct PresolveReport {
    pub disabled_constraints: usize,
    pub fixed_variables: usize,
    pub tightened_bounds: usize,
}

impl PresolveReport {
    #[inline]
    pub fn changed_anything(&self) -> bool {
        self.disabled_constraints > 0 || self.fixed_variables > 0 || self.tightened_bounds > 0
    }
}

/// The default transformer: leaves the model untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpPresolver;

impl Presolver for NoOpPresolver {
    fn apply(&self, _model: &mut Model) -> Result<PresolveReport, ModelError> {
        Ok(PresolveReport::default())
    }
}
