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

//! Structural classification of constraints.
//!
//! The tags are not disjoint: a row can be both a set partitioning and a
//! cardinality constraint. Neighborhood generators subscribe to tag
//! lists, so re-classification after any structural change is the
//! authoritative step that decides which generators are active.

use crate::constraint::ConstraintSense;
use crate::expression::Expression;
use crate::variable::Variable;
use cinder_core::num::MASK_EPSILON;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintTag {
    Singleton,
    Aggregation,
    Precedence,
    VariableBound,
    ExclusiveOr,
    ExclusiveNor,
    TrinomialExclusiveNor,
    InvertedIntegers,
    BalancedIntegers,
    ConstantSumIntegers,
    ConstantDifferenceIntegers,
    ConstantRatioIntegers,
    SetPartitioning,
    SetPacking,
    SetCovering,
    Cardinality,
    InvariantKnapsack,
    MultipleCovering,
    BinPacking,
    Knapsack,
    IntegerKnapsack,
    MinMax,
    MaxMin,
    Intermediate,
    Gf2,
    General,
}

#[inline]
fn near(value: f64, target: f64) -> bool {
    (value - target).abs() < MASK_EPSILON
}

#[inline]
fn is_integral(value: f64) -> bool {
    near(value, value.round())
}

/// Tags one row with every applicable structural type. The expression
/// holds `lhs - rhs`, so the right-hand side is the negated constant.
pub fn classify(
    expression: &Expression,
    sense: ConstraintSense,
    variables: &[Variable],
) -> Vec<ConstraintTag> {
    let terms = expression.sensitivities();
    let rhs = -expression.constant();
    let mut tags = Vec::new();

    let all_binary = terms
        .iter()
        .all(|&(id, _)| variables[id.index()].is_binary());
    let all_plus_one = terms.iter().all(|&(_, coefficient)| near(coefficient, 1.0));
    let all_positive = terms.iter().all(|&(_, coefficient)| coefficient > 0.0);
    let binary_count = terms
        .iter()
        .filter(|&&(id, _)| variables[id.index()].is_binary())
        .count();

    if terms.len() == 1 {
        tags.push(ConstraintTag::Singleton);
    }

    if terms.len() == 2 {
        let (first_id, a) = terms[0];
        let (second_id, b) = terms[1];
        let first_binary = variables[first_id.index()].is_binary();
        let second_binary = variables[second_id.index()].is_binary();
        let both_binary = first_binary && second_binary;
        let both_integer = !first_binary && !second_binary;

        match sense {
            ConstraintSense::Equal => {
                tags.push(ConstraintTag::Aggregation);
                if both_binary {
                    if (near(a, 1.0) && near(b, 1.0) && near(rhs, 1.0))
                        || (near(a, -1.0) && near(b, -1.0) && near(rhs, -1.0))
                    {
                        tags.push(ConstraintTag::ExclusiveOr);
                    }
                    if near(a, -b) && near(a.abs(), 1.0) && near(rhs, 0.0) {
                        tags.push(ConstraintTag::ExclusiveNor);
                    }
                }
                if both_integer {
                    if near(a, b) && near(a.abs(), 1.0) {
                        if near(rhs, 0.0) {
                            tags.push(ConstraintTag::InvertedIntegers);
                        } else {
                            tags.push(ConstraintTag::ConstantSumIntegers);
                        }
                    }
                    if near(a, -b) && near(a.abs(), 1.0) {
                        if near(rhs, 0.0) {
                            tags.push(ConstraintTag::BalancedIntegers);
                        } else {
                            tags.push(ConstraintTag::ConstantDifferenceIntegers);
                        }
                    }
                    let ratio_shape = (near(a.abs(), 1.0) && b.abs() > 1.0 + MASK_EPSILON)
                        || (near(b.abs(), 1.0) && a.abs() > 1.0 + MASK_EPSILON);
                    if ratio_shape && near(rhs, 0.0) && a * b < 0.0 {
                        tags.push(ConstraintTag::ConstantRatioIntegers);
                    }
                }
            }
            _ => {
                if near(a, -b) && !both_binary {
                    tags.push(ConstraintTag::Precedence);
                } else if first_binary || second_binary {
                    tags.push(ConstraintTag::VariableBound);
                }
            }
        }
    }

    if terms.len() == 3 && all_binary && sense == ConstraintSense::Equal && near(rhs, 0.0) {
        // One variable is pinned to the disjunction of the other two:
        // z - x - y = 0 up to a global sign.
        let positives = terms.iter().filter(|&&(_, c)| near(c, 1.0)).count();
        let negatives = terms.iter().filter(|&&(_, c)| near(c, -1.0)).count();
        if (positives == 1 && negatives == 2) || (positives == 2 && negatives == 1) {
            tags.push(ConstraintTag::TrinomialExclusiveNor);
        }
    }

    if all_binary && all_plus_one && !terms.is_empty() {
        match sense {
            ConstraintSense::Equal => {
                if near(rhs, 1.0) {
                    tags.push(ConstraintTag::SetPartitioning);
                } else if rhs > 1.0 + MASK_EPSILON && is_integral(rhs) {
                    tags.push(ConstraintTag::Cardinality);
                }
            }
            ConstraintSense::Less => {
                if near(rhs, 1.0) {
                    tags.push(ConstraintTag::SetPacking);
                } else if rhs > 1.0 + MASK_EPSILON && is_integral(rhs) {
                    tags.push(ConstraintTag::InvariantKnapsack);
                }
            }
            ConstraintSense::Greater => {
                if near(rhs, 1.0) {
                    tags.push(ConstraintTag::SetCovering);
                } else if rhs > 1.0 + MASK_EPSILON && is_integral(rhs) {
                    tags.push(ConstraintTag::MultipleCovering);
                }
            }
        }
    }

    if all_binary && !all_plus_one && terms.len() >= 2 && sense == ConstraintSense::Less {
        if all_positive && rhs > 0.0 {
            tags.push(ConstraintTag::Knapsack);
            if terms
                .iter()
                .filter(|&&(_, coefficient)| near(coefficient, rhs))
                .count()
                == 1
            {
                tags.push(ConstraintTag::BinPacking);
            }
        }
    }

    if binary_count < terms.len() && terms.len() >= 2 && sense != ConstraintSense::Equal {
        tags.push(ConstraintTag::IntegerKnapsack);

        let negative_integers: Vec<_> = terms
            .iter()
            .filter(|&&(id, c)| c < 0.0 && !variables[id.index()].is_binary())
            .collect();
        let positive_integers: Vec<_> = terms
            .iter()
            .filter(|&&(id, c)| c > 0.0 && !variables[id.index()].is_binary())
            .collect();
        let positives = terms.iter().filter(|&&(_, c)| c > 0.0).count();
        let negatives = terms.iter().filter(|&&(_, c)| c < 0.0).count();

        if sense == ConstraintSense::Less && negatives == 1 && negative_integers.len() == 1 {
            tags.push(ConstraintTag::MinMax);
        }
        if sense == ConstraintSense::Greater && positives == 1 && positive_integers.len() == 1 {
            tags.push(ConstraintTag::MaxMin);
        }
    }

    if sense == ConstraintSense::Equal && terms.len() >= 2 {
        let defining: Vec<_> = terms
            .iter()
            .filter(|&&(id, c)| near(c, -1.0) && !variables[id.index()].is_binary())
            .collect();
        if defining.len() == 1 {
            tags.push(ConstraintTag::Intermediate);
        }

        let two_coefficient: Vec<_> = terms
            .iter()
            .filter(|&&(_, c)| near(c.abs(), 2.0))
            .collect();
        let unit_binaries = terms
            .iter()
            .filter(|&&(id, c)| near(c.abs(), 1.0) && variables[id.index()].is_binary())
            .count();
        if two_coefficient.len() == 1
            && unit_binaries == terms.len() - 1
            && (near(rhs, 0.0) || near(rhs.abs(), 1.0))
        {
            tags.push(ConstraintTag::Gf2);
        }
    }

    if tags.is_empty() {
        tags.push(ConstraintTag::General);
    }
    tags
}
