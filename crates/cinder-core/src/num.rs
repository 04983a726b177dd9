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

/// Absolute tolerance for every improvement comparison in the solver.
/// All inequalities of the form `a < b` that decide whether a candidate
/// improves on the current state must be written `a < b - EPSILON` or
/// equivalent, with this constant and no other.
pub const EPSILON: f64 = 1e-8;

/// Tighter tolerance used when deciding whether a coefficient is exactly
/// +1 or -1 for the mask fast path.
pub const MASK_EPSILON: f64 = 1e-10;

/// True when `value` is +1 within [`MASK_EPSILON`].
#[inline]
pub fn is_plus_one(value: f64) -> bool {
    (value - 1.0).abs() < MASK_EPSILON
}

/// True when `value` is -1 within [`MASK_EPSILON`].
#[inline]
pub fn is_minus_one(value: f64) -> bool {
    (value + 1.0).abs() < MASK_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plus_one_detection() {
        assert!(is_plus_one(1.0));
        assert!(is_plus_one(1.0 + 1e-12));
        assert!(!is_plus_one(1.0 + 1e-6));
        assert!(!is_plus_one(-1.0));
    }

    #[test]
    fn test_minus_one_detection() {
        assert!(is_minus_one(-1.0));
        assert!(is_minus_one(-1.0 - 1e-12));
        assert!(!is_minus_one(-1.0 - 1e-6));
        assert!(!is_minus_one(1.0));
    }
}
