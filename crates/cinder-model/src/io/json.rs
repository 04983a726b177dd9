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

//! Native JSON model format, a round-trip mirror of the internal model.

use crate::constraint::ConstraintSense;
use crate::err::{InputFormat, ParseError};
use crate::ids::VariableId;
use crate::model::Model;
use crate::solution::NamedSolution;
use crate::variable::VariableSense;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
struct JsonModel {
    name: String,
    is_minimization: bool,
    variables: Vec<JsonVariable>,
    objective: JsonExpression,
    constraints: Vec<JsonConstraint>,
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonVariable {
    name: String,
    value: i64,
    lower_bound: i64,
    upper_bound: i64,
    is_fixed: bool,
    sense: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonExpression {
    constant: f64,
    sensitivities: Vec<(String, f64)>,
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonConstraint {
    name: String,
    sense: String,
    rhs: f64,
    is_enabled: bool,
    sensitivities: Vec<(String, f64)>,
}

fn sense_name(sense: VariableSense) -> &'static str {
    match sense {
        VariableSense::Binary => "binary",
        VariableSense::Integer => "integer",
        VariableSense::Selection => "selection",
        VariableSense::DependentBinary => "dependent_binary",
        VariableSense::DependentInteger => "dependent_integer",
    }
}

/// Serializes the full model, deterministic in entity order.
pub fn write_model(model: &Model) -> String {
    let document = JsonModel {
        name: model.name().to_string(),
        is_minimization: model.is_minimization(),
        variables: model
            .variables()
            .iter()
            .map(|variable| JsonVariable {
                name: variable.name().to_string(),
                value: variable.value(),
                lower_bound: variable.lower_bound(),
                upper_bound: variable.upper_bound(),
                is_fixed: variable.is_fixed(),
                sense: sense_name(variable.sense()).to_string(),
            })
            .collect(),
        objective: JsonExpression {
            constant: model.objective().expression().constant(),
            sensitivities: model
                .objective()
                .expression()
                .sensitivities()
                .iter()
                .map(|&(id, coefficient)| {
                    (model.variable(id).name().to_string(), coefficient)
                })
                .collect(),
        },
        constraints: model
            .constraints()
            .iter()
            .map(|constraint| JsonConstraint {
                name: constraint.name().to_string(),
                sense: constraint.sense().to_string(),
                rhs: -constraint.expression().constant(),
                is_enabled: constraint.is_enabled(),
                sensitivities: constraint
                    .expression()
                    .sensitivities()
                    .iter()
                    .map(|&(id, coefficient)| {
                        (model.variable(id).name().to_string(), coefficient)
                    })
                    .collect(),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&document).expect("model serialization cannot fail")
}

/// Reads a model previously produced by [`write_model`]. Variable senses
/// are re-derived from the bounds during setup; the serialized sense is
/// informational.
pub fn read_model(content: &str) -> Result<Model, ParseError> {
    let document: JsonModel = serde_json::from_str(content).map_err(|error| {
        ParseError::new(InputFormat::Json, error.line(), error.to_string())
    })?;

    let mut model = Model::new(document.name);
    let mut ids: HashMap<String, VariableId> = HashMap::new();
    for variable in &document.variables {
        let id = model
            .add_variable(
                variable.name.clone(),
                variable.lower_bound,
                variable.upper_bound,
            )
            .map_err(|error| ParseError::new(InputFormat::Json, 0, error.to_string()))?;
        model.variable_mut(id).set_value_silently(variable.value);
        if variable.is_fixed {
            model.variable_mut(id).fix();
        }
        ids.insert(variable.name.clone(), id);
    }

    let resolve = |name: &str| -> Result<VariableId, ParseError> {
        ids.get(name).copied().ok_or_else(|| {
            ParseError::new(
                InputFormat::Json,
                0,
                format!("unknown variable \"{name}\""),
            )
        })
    };

    for constraint in &document.constraints {
        let sense = match constraint.sense.as_str() {
            "<=" => ConstraintSense::Less,
            "=" => ConstraintSense::Equal,
            ">=" => ConstraintSense::Greater,
            other => {
                return Err(ParseError::new(
                    InputFormat::Json,
                    0,
                    format!("unknown constraint sense \"{other}\""),
                ));
            }
        };
        let mut terms = Vec::with_capacity(constraint.sensitivities.len());
        for (name, coefficient) in &constraint.sensitivities {
            terms.push((resolve(name)?, *coefficient));
        }
        let id = model
            .add_constraint(constraint.name.clone(), terms, sense, constraint.rhs)
            .map_err(|error| ParseError::new(InputFormat::Json, 0, error.to_string()))?;
        if !constraint.is_enabled {
            model.constraint_mut(id).disable();
        }
    }

    let mut objective_terms = Vec::with_capacity(document.objective.sensitivities.len());
    for (name, coefficient) in &document.objective.sensitivities {
        objective_terms.push((resolve(name)?, *coefficient));
    }
    if document.is_minimization {
        model.minimize(objective_terms, document.objective.constant);
    } else {
        model.maximize(objective_terms, document.objective.constant);
    }
    Ok(model)
}

pub fn read_model_from_path(path: impl AsRef<Path>) -> Result<Model, ParseError> {
    let content = fs::read_to_string(path.as_ref()).map_err(|error| {
        ParseError::new(InputFormat::Json, 0, format!("cannot read file: {error}"))
    })?;
    read_model(&content)
}

/// Serializes a solution report.
pub fn write_solution(solution: &NamedSolution) -> String {
    serde_json::to_string_pretty(solution).expect("solution serialization cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_model() -> Model {
        let mut model = Model::new("sample");
        let x = model.add_variable("x", 0, 5).unwrap();
        let y = model.add_binary("y").unwrap();
        model.variable_mut(x).set_value_silently(2);
        model.variable_mut(y).fix_to(1);
        model
            .add_constraint(
                "row",
                vec![(x, 1.0), (y, -2.0)],
                ConstraintSense::Less,
                3.0,
            )
            .unwrap();
        model.maximize(vec![(x, 1.0), (y, 4.0)], 0.5);
        model
    }

    #[test]
    fn test_round_trip_is_identity_on_the_full_model() {
        let model = sample_model();
        let written = write_model(&model);
        let reread = read_model(&written).unwrap();

        assert_eq!(reread.name(), model.name());
        assert_eq!(reread.is_minimization(), model.is_minimization());
        assert_eq!(reread.number_of_variables(), model.number_of_variables());
        assert_eq!(reread.number_of_constraints(), model.number_of_constraints());

        for (a, b) in reread.variables().iter().zip(model.variables()) {
            assert_eq!(a.name(), b.name());
            assert_eq!(a.value(), b.value());
            assert_eq!(a.lower_bound(), b.lower_bound());
            assert_eq!(a.upper_bound(), b.upper_bound());
            assert_eq!(a.is_fixed(), b.is_fixed());
        }
        for (a, b) in reread.constraints().iter().zip(model.constraints()) {
            assert_eq!(a.name(), b.name());
            assert_eq!(a.sense(), b.sense());
            assert_eq!(a.is_enabled(), b.is_enabled());
            assert_eq!(
                a.expression().sensitivities(),
                b.expression().sensitivities()
            );
            assert_eq!(a.expression().constant(), b.expression().constant());
        }
        assert_eq!(
            reread.objective().expression().sensitivities(),
            model.objective().expression().sensitivities()
        );
        assert_eq!(
            reread.objective().expression().constant(),
            model.objective().expression().constant()
        );
    }

    #[test]
    fn test_malformed_json_is_located() {
        let result = read_model("{ not json");
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_variable_reference_fails() {
        let content = r#"{
            "name": "m",
            "is_minimization": true,
            "variables": [],
            "objective": { "constant": 0.0, "sensitivities": [["ghost", 1.0]] },
            "constraints": []
        }"#;
        let result = read_model(content);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("ghost"));
    }
}
