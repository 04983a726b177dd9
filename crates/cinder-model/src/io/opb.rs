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

//! Pseudo-Boolean (OPB) and weighted-Boolean (WBO) reader.
//!
//! Negated literals `~x` introduce a complement variable linked by
//! `x + x_neg = 1`. Product terms introduce an AND variable linked by
//! two inequalities. WBO soft constraints get a binary slack each and a
//! weighted penalty objective; the `top` cost becomes an upper bound on
//! that penalty.

use crate::constraint::ConstraintSense;
use crate::err::{InputFormat, ParseError};
use crate::ids::VariableId;
use crate::model::Model;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Default)]
struct VariablePool {
    by_name: HashMap<String, VariableId>,
}

impl VariablePool {
    fn binary(
        &mut self,
        model: &mut Model,
        name: &str,
        line: usize,
    ) -> Result<VariableId, ParseError> {
        if let Some(&id) = self.by_name.get(name) {
            return Ok(id);
        }
        let id = model
            .add_binary(name)
            .map_err(|error| ParseError::new(InputFormat::Opb, line, error.to_string()))?;
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }
}

#[derive(Debug)]
struct ParsedTerm {
    coefficient: f64,
    literals: Vec<String>,
}

#[derive(Debug)]
struct ParsedLine {
    soft_weight: Option<i64>,
    terms: Vec<ParsedTerm>,
    sense: Option<ConstraintSense>,
    rhs: f64,
}

/// OPB / WBO file reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpbReader;

impl OpbReader {
    pub fn new() -> Self {
        Self
    }

    pub fn from_path(&self, path: impl AsRef<Path>) -> Result<Model, ParseError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|error| {
            ParseError::new(InputFormat::Opb, 0, format!("cannot read file: {error}"))
        })?;
        self.from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(&self, content: &str) -> Result<Model, ParseError> {
        let mut model = Model::new("opb");
        let mut pool = VariablePool::default();

        let mut objective_terms: Vec<(VariableId, f64)> = Vec::new();
        let mut penalty_terms: Vec<(VariableId, f64)> = Vec::new();
        let mut has_objective = false;
        let mut top_cost: Option<i64> = None;
        let mut product_count = 0usize;
        let mut negation_count = 0usize;
        let mut soft_count = 0usize;
        let mut constraint_count = 0usize;

        for (line_number, raw_line) in content.lines().enumerate() {
            let line_number = line_number + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('*') {
                continue;
            }

            if let Some(rest) = line.strip_prefix("soft:") {
                let rest = rest.trim().trim_end_matches(';').trim();
                if !rest.is_empty() {
                    top_cost = Some(rest.parse().map_err(|_| {
                        ParseError::new(
                            InputFormat::Opb,
                            line_number,
                            format!("invalid top cost \"{rest}\""),
                        )
                    })?);
                }
                continue;
            }

            if let Some(rest) = line.strip_prefix("min:") {
                let parsed = parse_terms_only(rest, line_number)?;
                has_objective = true;
                for term in parsed {
                    let variable_id = self.term_variable(
                        &mut model,
                        &mut pool,
                        &term,
                        line_number,
                        &mut product_count,
                        &mut negation_count,
                    )?;
                    objective_terms.push((variable_id, term.coefficient));
                }
                continue;
            }

            let parsed = parse_constraint_line(line, line_number)?;
            let sense = parsed.sense.ok_or_else(|| {
                ParseError::new(InputFormat::Opb, line_number, "missing relational operator")
            })?;

            let mut terms: Vec<(VariableId, f64)> = Vec::new();
            let mut absolute_sum = 0.0;
            for term in &parsed.terms {
                let variable_id = self.term_variable(
                    &mut model,
                    &mut pool,
                    term,
                    line_number,
                    &mut product_count,
                    &mut negation_count,
                )?;
                absolute_sum += term.coefficient.abs();
                terms.push((variable_id, term.coefficient));
            }

            if let Some(weight) = parsed.soft_weight {
                // Big-M relaxation: the slack absorbs the violation and
                // the weight lands in the penalty objective.
                soft_count += 1;
                let slack = model
                    .add_binary(format!("_soft{soft_count}"))
                    .map_err(|error| {
                        ParseError::new(InputFormat::Opb, line_number, error.to_string())
                    })?;
                let big_m = absolute_sum + parsed.rhs.abs() + 1.0;
                penalty_terms.push((slack, weight as f64));

                match sense {
                    ConstraintSense::Greater => {
                        let mut relaxed = terms.clone();
                        relaxed.push((slack, big_m));
                        self.push_constraint(
                            &mut model,
                            &mut constraint_count,
                            relaxed,
                            ConstraintSense::Greater,
                            parsed.rhs,
                            line_number,
                        )?;
                    }
                    ConstraintSense::Less => {
                        let mut relaxed = terms.clone();
                        relaxed.push((slack, -big_m));
                        self.push_constraint(
                            &mut model,
                            &mut constraint_count,
                            relaxed,
                            ConstraintSense::Less,
                            parsed.rhs,
                            line_number,
                        )?;
                    }
                    ConstraintSense::Equal => {
                        let mut upper = terms.clone();
                        upper.push((slack, -big_m));
                        self.push_constraint(
                            &mut model,
                            &mut constraint_count,
                            upper,
                            ConstraintSense::Less,
                            parsed.rhs,
                            line_number,
                        )?;
                        let mut lower = terms.clone();
                        lower.push((slack, big_m));
                        self.push_constraint(
                            &mut model,
                            &mut constraint_count,
                            lower,
                            ConstraintSense::Greater,
                            parsed.rhs,
                            line_number,
                        )?;
                    }
                }
            } else {
                self.push_constraint(
                    &mut model,
                    &mut constraint_count,
                    terms,
                    sense,
                    parsed.rhs,
                    line_number,
                )?;
            }
        }

        if !penalty_terms.is_empty() {
            if let Some(top) = top_cost {
                // Assignments whose soft penalty reaches the top cost
                // are invalid.
                self.push_constraint(
                    &mut model,
                    &mut constraint_count,
                    penalty_terms.clone(),
                    ConstraintSense::Less,
                    (top - 1) as f64,
                    0,
                )?;
            }
            objective_terms.extend(penalty_terms);
            has_objective = true;
        }

        if has_objective {
            model.minimize(objective_terms, 0.0);
        }
        Ok(model)
    }

    fn push_constraint(
        &self,
        model: &mut Model,
        constraint_count: &mut usize,
        terms: Vec<(VariableId, f64)>,
        sense: ConstraintSense,
        rhs: f64,
        line: usize,
    ) -> Result<(), ParseError> {
        *constraint_count += 1;
        model
            .add_constraint(format!("c{constraint_count}"), terms, sense, rhs)
            .map_err(|error| ParseError::new(InputFormat::Opb, line, error.to_string()))?;
        Ok(())
    }

    /// Resolves a term to one variable: plain literal, complement
    /// variable, or AND product variable with its linking constraints.
    fn term_variable(
        &self,
        model: &mut Model,
        pool: &mut VariablePool,
        term: &ParsedTerm,
        line: usize,
        product_count: &mut usize,
        negation_count: &mut usize,
    ) -> Result<VariableId, ParseError> {
        let mut literal_ids: Vec<VariableId> = Vec::with_capacity(term.literals.len());
        for literal in &term.literals {
            let id = if let Some(positive_name) = literal.strip_prefix('~') {
                let positive = pool.binary(model, positive_name, line)?;
                let negated_name = format!("_not_{positive_name}");
                if let Some(&existing) = pool.by_name.get(&negated_name) {
                    existing
                } else {
                    *negation_count += 1;
                    let negated = pool.binary(model, &negated_name, line)?;
                    model
                        .add_constraint(
                            format!("_neg{negation_count}"),
                            vec![(positive, 1.0), (negated, 1.0)],
                            ConstraintSense::Equal,
                            1.0,
                        )
                        .map_err(|error| {
                            ParseError::new(InputFormat::Opb, line, error.to_string())
                        })?;
                    negated
                }
            } else {
                pool.binary(model, literal, line)?
            };
            literal_ids.push(id);
        }

        if literal_ids.len() == 1 {
            return Ok(literal_ids[0]);
        }

        // Product term: p = AND(literals), linked by
        //   sum(literals) - k*p >= 0 and sum(literals) - p <= k - 1.
        *product_count += 1;
        let product_name = format!("_prod{product_count}");
        if let Some(&existing) = pool.by_name.get(&product_name) {
            return Ok(existing);
        }
        let product = pool.binary(model, &product_name, line)?;
        let k = literal_ids.len() as f64;

        let mut and_lower: Vec<(VariableId, f64)> =
            literal_ids.iter().map(|&id| (id, 1.0)).collect();
        and_lower.push((product, -k));
        model
            .add_constraint(
                format!("_prod{product_count}_lb"),
                and_lower,
                ConstraintSense::Greater,
                0.0,
            )
            .map_err(|error| ParseError::new(InputFormat::Opb, line, error.to_string()))?;

        let mut and_upper: Vec<(VariableId, f64)> =
            literal_ids.iter().map(|&id| (id, 1.0)).collect();
        and_upper.push((product, -1.0));
        model
            .add_constraint(
                format!("_prod{product_count}_ub"),
                and_upper,
                ConstraintSense::Less,
                k - 1.0,
            )
            .map_err(|error| ParseError::new(InputFormat::Opb, line, error.to_string()))?;

        Ok(product)
    }
}

fn parse_terms_only(text: &str, line: usize) -> Result<Vec<ParsedTerm>, ParseError> {
    let parsed = parse_constraint_line_inner(text, line, true)?;
    Ok(parsed.terms)
}

fn parse_constraint_line(text: &str, line: usize) -> Result<ParsedLine, ParseError> {
    parse_constraint_line_inner(text, line, false)
}

fn parse_constraint_line_inner(
    text: &str,
    line: usize,
    terms_only: bool,
) -> Result<ParsedLine, ParseError> {
    let error = |message: String| ParseError::new(InputFormat::Opb, line, message);

    let mut text = text.trim();
    let mut soft_weight = None;
    if let Some(rest) = text.strip_prefix('[') {
        let end = rest
            .find(']')
            .ok_or_else(|| error("unterminated soft weight".to_string()))?;
        soft_weight = Some(rest[..end].trim().parse().map_err(|_| {
            error(format!("invalid soft weight \"{}\"", rest[..end].trim()))
        })?);
        text = rest[end + 1..].trim();
    }

    let normalized = text.replace(';', " ; ");
    let tokens: Vec<&str> = normalized.split_whitespace().collect();

    let mut terms = Vec::new();
    let mut sense = None;
    let mut rhs = 0.0;
    let mut pending_coefficient: Option<f64> = None;
    let mut pending_literals: Vec<String> = Vec::new();
    let mut after_relation = false;

    let mut flush =
        |pending_coefficient: &mut Option<f64>, pending_literals: &mut Vec<String>| {
            if let Some(coefficient) = pending_coefficient.take() {
                terms.push(ParsedTerm {
                    coefficient,
                    literals: std::mem::take(pending_literals),
                });
            }
        };

    for token in tokens {
        match token {
            ";" => break,
            ">=" | "<=" | "=" if !terms_only => {
                flush(&mut pending_coefficient, &mut pending_literals);
                sense = Some(match token {
                    ">=" => ConstraintSense::Greater,
                    "<=" => ConstraintSense::Less,
                    _ => ConstraintSense::Equal,
                });
                after_relation = true;
            }
            _ if after_relation => {
                rhs = token
                    .parse()
                    .map_err(|_| error(format!("invalid right-hand side \"{token}\"")))?;
                after_relation = false;
            }
            _ => {
                if let Ok(coefficient) = token.parse::<f64>() {
                    flush(&mut pending_coefficient, &mut pending_literals);
                    pending_coefficient = Some(coefficient);
                } else {
                    if pending_coefficient.is_none() {
                        return Err(error(format!("literal \"{token}\" without coefficient")));
                    }
                    pending_literals.push(token.to_string());
                }
            }
        }
    }
    flush(&mut pending_coefficient, &mut pending_literals);

    for term in &terms {
        if term.literals.is_empty() {
            return Err(error("coefficient without literal".to_string()));
        }
    }

    Ok(ParsedLine {
        soft_weight,
        terms,
        sense,
        rhs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_opb() {
        let content = "\
* a tiny instance
min: +1 x1 +2 x2 ;
+1 x1 +1 x2 >= 1 ;
+2 x1 -3 x2 <= 2 ;
";
        let model = OpbReader::new().from_str(content).unwrap();
        assert_eq!(model.number_of_variables(), 2);
        assert_eq!(model.number_of_constraints(), 2);
        assert!(model.is_minimization());
        assert!(model.variables().iter().all(|v| v.is_binary()));
    }

    #[test]
    fn test_negated_literal_adds_linking_equality() {
        let content = "\
min: +1 x1 ;
+1 ~x1 >= 1 ;
";
        let model = OpbReader::new().from_str(content).unwrap();
        // x1, its complement, one linking equality plus the constraint.
        assert_eq!(model.number_of_variables(), 2);
        assert_eq!(model.number_of_constraints(), 2);
    }

    #[test]
    fn test_product_term_adds_two_linking_inequalities() {
        let content = "\
min: +1 x1 ;
+1 x1 x2 >= 1 ;
";
        let model = OpbReader::new().from_str(content).unwrap();
        // x1, x2, the product variable; the AND links plus the row.
        assert_eq!(model.number_of_variables(), 3);
        assert_eq!(model.number_of_constraints(), 3);
    }

    #[test]
    fn test_wbo_soft_constraint_builds_penalty_objective() {
        let content = "\
soft: 7 ;
[3] +1 x1 >= 1 ;
[5] +1 x2 >= 1 ;
";
        let model = OpbReader::new().from_str(content).unwrap();
        // Two originals, two slacks; two relaxed rows plus the top bound.
        assert_eq!(model.number_of_variables(), 4);
        assert_eq!(model.number_of_constraints(), 3);
        assert!(model.is_defined_objective());

        let objective = model.objective().expression();
        assert_eq!(objective.sensitivities().len(), 2);
        let weights: Vec<f64> = objective.sensitivities().iter().map(|&(_, w)| w).collect();
        assert_eq!(weights, vec![3.0, 5.0]);
    }

    #[test]
    fn test_missing_operator_is_an_error() {
        let content = "+1 x1 x2 ;\n";
        let result = OpbReader::new().from_str(content);
        assert!(result.is_err());
    }
}
