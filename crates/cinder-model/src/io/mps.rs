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

//! MPS reader and writer.
//!
//! Sections NAME, ROWS (`N`/`L`/`E`/`G`), COLUMNS (with `MARKER`
//! `INTORG`/`INTEND` ranges), RHS, BOUNDS (`LO`/`UP`/`FX`/`BV`) and
//! ENDATA are recognized. The RHS entry of the objective row becomes the
//! negated objective constant. Continuous columns are coerced to integer
//! with a warning, or rejected in strict mode.

use crate::constraint::ConstraintSense;
use crate::err::{InputFormat, ParseError};
use crate::ids::VariableId;
use crate::model::Model;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Default upper bound of a column that carries no BOUNDS entry.
pub const BOUND_LIMIT: i64 = i32::MAX as i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    ObjSense,
    Rows,
    Columns,
    Rhs,
    Ranges,
    Bounds,
    Done,
}

#[derive(Debug, Clone)]
struct ColumnData {
    name: String,
    is_integer: bool,
    lower_bound: Option<i64>,
    upper_bound: Option<i64>,
    fixed_value: Option<i64>,
    objective_coefficient: f64,
    terms: Vec<(usize, f64)>,
}

#[derive(Debug, Clone)]
struct RowData {
    name: String,
    sense: ConstraintSense,
    rhs: f64,
}

/// MPS file reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct MpsReader {
    is_strict: bool,
}

impl MpsReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// In strict mode continuous columns abort the parse instead of
    /// being coerced to integer.
    pub fn strict(mut self, yes: bool) -> Self {
        self.is_strict = yes;
        self
    }

    pub fn from_path(&self, path: impl AsRef<Path>) -> Result<Model, ParseError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|error| {
            ParseError::new(InputFormat::Mps, 0, format!("cannot read file: {error}"))
        })?;
        self.from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(&self, content: &str) -> Result<Model, ParseError> {
        let error = |line: usize, message: String| ParseError::new(InputFormat::Mps, line, message);

        let mut section = Section::Preamble;
        let mut model_name = String::from("mps");
        let mut objective_row: Option<String> = None;
        let mut objective_constant = 0.0;
        let mut is_minimization = true;

        let mut rows: Vec<RowData> = Vec::new();
        let mut row_index: HashMap<String, usize> = HashMap::new();
        let mut columns: Vec<ColumnData> = Vec::new();
        let mut column_index: HashMap<String, usize> = HashMap::new();
        let mut in_integer_block = false;

        for (line_number, raw_line) in content.lines().enumerate() {
            let line_number = line_number + 1;
            if raw_line.starts_with('*') || raw_line.trim().is_empty() {
                continue;
            }
            let tokens: Vec<&str> = raw_line.split_whitespace().collect();
            let is_section_header = !raw_line.starts_with(' ') && !raw_line.starts_with('\t');

            if is_section_header {
                match tokens[0] {
                    "NAME" => {
                        if tokens.len() > 1 {
                            model_name = tokens[1].to_string();
                        }
                        section = Section::Preamble;
                    }
                    "OBJSENSE" => section = Section::ObjSense,
                    "ROWS" => section = Section::Rows,
                    "COLUMNS" => section = Section::Columns,
                    "RHS" => section = Section::Rhs,
                    "RANGES" => section = Section::Ranges,
                    "BOUNDS" => section = Section::Bounds,
                    "ENDATA" => {
                        section = Section::Done;
                        break;
                    }
                    other => {
                        return Err(error(line_number, format!("unknown section \"{other}\"")));
                    }
                }
                continue;
            }

            match section {
                Section::Preamble | Section::Done => {}
                Section::ObjSense => match tokens[0] {
                    "MIN" | "MINIMIZE" => is_minimization = true,
                    "MAX" | "MAXIMIZE" => is_minimization = false,
                    other => {
                        return Err(error(
                            line_number,
                            format!("unknown objective sense \"{other}\""),
                        ));
                    }
                },
                Section::Ranges => {
                    return Err(error(line_number, "RANGES section is not supported".to_string()));
                }
                Section::Rows => {
                    if tokens.len() < 2 {
                        return Err(error(line_number, "malformed ROWS entry".to_string()));
                    }
                    let row_name = tokens[1].to_string();
                    match tokens[0] {
                        "N" => {
                            if objective_row.is_none() {
                                objective_row = Some(row_name);
                            }
                        }
                        sense_token => {
                            let sense = match sense_token {
                                "L" => ConstraintSense::Less,
                                "E" => ConstraintSense::Equal,
                                "G" => ConstraintSense::Greater,
                                other => {
                                    return Err(error(
                                        line_number,
                                        format!("unknown row sense \"{other}\""),
                                    ));
                                }
                            };
                            row_index.insert(row_name.clone(), rows.len());
                            rows.push(RowData {
                                name: row_name,
                                sense,
                                rhs: 0.0,
                            });
                        }
                    }
                }
                Section::Columns => {
                    if tokens.len() >= 3 && tokens[1] == "'MARKER'" {
                        match tokens[2] {
                            "'INTORG'" => in_integer_block = true,
                            "'INTEND'" => in_integer_block = false,
                            other => {
                                return Err(error(
                                    line_number,
                                    format!("unknown marker \"{other}\""),
                                ));
                            }
                        }
                        continue;
                    }
                    if tokens.len() < 3 || tokens.len() % 2 == 0 {
                        return Err(error(line_number, "malformed COLUMNS entry".to_string()));
                    }
                    let column_name = tokens[0];
                    let column_position =
                        *column_index.entry(column_name.to_string()).or_insert_with(|| {
                            columns.push(ColumnData {
                                name: column_name.to_string(),
                                is_integer: in_integer_block,
                                lower_bound: None,
                                upper_bound: None,
                                fixed_value: None,
                                objective_coefficient: 0.0,
                                terms: Vec::new(),
                            });
                            columns.len() - 1
                        });
                    if in_integer_block {
                        columns[column_position].is_integer = true;
                    }

                    for pair in tokens[1..].chunks(2) {
                        let row_name = pair[0];
                        let coefficient: f64 = pair[1].parse().map_err(|_| {
                            error(line_number, format!("invalid coefficient \"{}\"", pair[1]))
                        })?;
                        if Some(row_name) == objective_row.as_deref() {
                            columns[column_position].objective_coefficient += coefficient;
                        } else {
                            let &row_position = row_index.get(row_name).ok_or_else(|| {
                                error(line_number, format!("unknown row \"{row_name}\""))
                            })?;
                            columns[column_position].terms.push((row_position, coefficient));
                        }
                    }
                }
                Section::Rhs => {
                    if tokens.len() < 3 || tokens.len() % 2 == 0 {
                        return Err(error(line_number, "malformed RHS entry".to_string()));
                    }
                    for pair in tokens[1..].chunks(2) {
                        let row_name = pair[0];
                        let value: f64 = pair[1].parse().map_err(|_| {
                            error(line_number, format!("invalid RHS value \"{}\"", pair[1]))
                        })?;
                        if Some(row_name) == objective_row.as_deref() {
                            objective_constant = -value;
                        } else {
                            let &row_position = row_index.get(row_name).ok_or_else(|| {
                                error(line_number, format!("unknown row \"{row_name}\""))
                            })?;
                            rows[row_position].rhs = value;
                        }
                    }
                }
                Section::Bounds => {
                    if tokens.len() < 3 {
                        return Err(error(line_number, "malformed BOUNDS entry".to_string()));
                    }
                    let column_name = tokens[2];
                    let &column_position = column_index.get(column_name).ok_or_else(|| {
                        error(line_number, format!("unknown column \"{column_name}\""))
                    })?;
                    let bound_value = |token: &str| -> Result<i64, ParseError> {
                        let value: f64 = token.parse().map_err(|_| {
                            error(line_number, format!("invalid bound value \"{token}\""))
                        })?;
                        Ok(value.round() as i64)
                    };
                    match tokens[0] {
                        "LO" => {
                            if tokens.len() < 4 {
                                return Err(error(line_number, "missing bound value".to_string()));
                            }
                            columns[column_position].lower_bound = Some(bound_value(tokens[3])?);
                        }
                        "UP" => {
                            if tokens.len() < 4 {
                                return Err(error(line_number, "missing bound value".to_string()));
                            }
                            columns[column_position].upper_bound = Some(bound_value(tokens[3])?);
                        }
                        "FX" => {
                            if tokens.len() < 4 {
                                return Err(error(line_number, "missing bound value".to_string()));
                            }
                            columns[column_position].fixed_value = Some(bound_value(tokens[3])?);
                        }
                        "BV" => {
                            columns[column_position].lower_bound = Some(0);
                            columns[column_position].upper_bound = Some(1);
                            columns[column_position].is_integer = true;
                        }
                        other => {
                            return Err(error(
                                line_number,
                                format!("unsupported bound type \"{other}\""),
                            ));
                        }
                    }
                }
            }
        }

        if section != Section::Done {
            return Err(error(content.lines().count(), "missing ENDATA".to_string()));
        }

        let mut model = Model::new(model_name);
        let mut variable_ids: Vec<VariableId> = Vec::with_capacity(columns.len());
        for column in &columns {
            if !column.is_integer {
                if self.is_strict {
                    return Err(ParseError::new(
                        InputFormat::Mps,
                        0,
                        format!("column \"{}\" is continuous", column.name),
                    ));
                }
                warn!(column = column.name.as_str(), "continuous column coerced to integer");
            }
            let lower_bound = column.fixed_value.or(column.lower_bound).unwrap_or(0);
            let upper_bound = column
                .fixed_value
                .or(column.upper_bound)
                .unwrap_or(BOUND_LIMIT);
            let variable_id = model
                .add_variable(column.name.clone(), lower_bound, upper_bound)
                .map_err(|model_error| {
                    ParseError::new(InputFormat::Mps, 0, model_error.to_string())
                })?;
            if column.fixed_value.is_some() {
                model.variable_mut(variable_id).fix();
            }
            variable_ids.push(variable_id);
        }

        let mut row_terms: Vec<Vec<(VariableId, f64)>> = vec![Vec::new(); rows.len()];
        for (column_position, column) in columns.iter().enumerate() {
            for &(row_position, coefficient) in &column.terms {
                row_terms[row_position].push((variable_ids[column_position], coefficient));
            }
        }
        for (row, terms) in rows.iter().zip(row_terms) {
            model
                .add_constraint(row.name.clone(), terms, row.sense, row.rhs)
                .map_err(|model_error| {
                    ParseError::new(InputFormat::Mps, 0, model_error.to_string())
                })?;
        }

        let objective_terms: Vec<(VariableId, f64)> = columns
            .iter()
            .enumerate()
            .filter(|(_, column)| column.objective_coefficient != 0.0)
            .map(|(position, column)| (variable_ids[position], column.objective_coefficient))
            .collect();
        if is_minimization {
            model.minimize(objective_terms, objective_constant);
        } else {
            model.maximize(objective_terms, objective_constant);
        }
        Ok(model)
    }
}

/// Writes the model in MPS form, deterministic in entity order. Every
/// column is emitted inside an integer marker range.
pub fn write_mps(model: &Model) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "NAME {}", model.name());
    if !model.is_minimization() {
        let _ = writeln!(out, "OBJSENSE");
        let _ = writeln!(out, " MAX");
    }
    let _ = writeln!(out, "ROWS");
    let _ = writeln!(out, " N obj");
    for constraint in model.constraints() {
        let sense = match constraint.sense() {
            ConstraintSense::Less => "L",
            ConstraintSense::Equal => "E",
            ConstraintSense::Greater => "G",
        };
        let _ = writeln!(out, " {} {}", sense, constraint.name());
    }

    let _ = writeln!(out, "COLUMNS");
    let _ = writeln!(out, "    MARKER 'MARKER' 'INTORG'");
    for variable in model.variables() {
        let objective_coefficient = variable.objective_sensitivity();
        if objective_coefficient != 0.0 {
            let _ = writeln!(out, "    {} obj {}", variable.name(), objective_coefficient);
        }
        for &(constraint_id, coefficient) in variable.constraint_sensitivities() {
            let _ = writeln!(
                out,
                "    {} {} {}",
                variable.name(),
                model.constraint(constraint_id).name(),
                coefficient
            );
        }
    }
    let _ = writeln!(out, "    MARKER 'MARKER' 'INTEND'");

    let _ = writeln!(out, "RHS");
    let objective_constant = model.objective().expression().constant();
    if objective_constant != 0.0 {
        let _ = writeln!(out, "    rhs obj {}", -objective_constant);
    }
    for constraint in model.constraints() {
        let rhs = -constraint.expression().constant();
        if rhs != 0.0 {
            let _ = writeln!(out, "    rhs {} {}", constraint.name(), rhs);
        }
    }

    let _ = writeln!(out, "BOUNDS");
    for variable in model.variables() {
        if variable.is_fixed() {
            let _ = writeln!(out, " FX bnd {} {}", variable.name(), variable.value());
        } else {
            let _ = writeln!(out, " LO bnd {} {}", variable.name(), variable.lower_bound());
            let _ = writeln!(out, " UP bnd {} {}", variable.name(), variable.upper_bound());
        }
    }
    let _ = writeln!(out, "ENDATA");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNAPSACK_MPS: &str = "\
NAME knapsack
ROWS
 N obj
 L cap
COLUMNS
    MARKER 'MARKER' 'INTORG'
    x0 obj -1 cap 2
    x1 obj -1 cap 3
    x2 obj -1 cap 4
    MARKER 'MARKER' 'INTEND'
RHS
    rhs cap 10
BOUNDS
 LO bnd x0 0
 UP bnd x0 5
 LO bnd x1 0
 UP bnd x1 5
 FX bnd x2 1
ENDATA
";

    #[test]
    fn test_parse_knapsack() {
        let model = MpsReader::new().from_str(KNAPSACK_MPS).unwrap();
        assert_eq!(model.name(), "knapsack");
        assert_eq!(model.number_of_variables(), 3);
        assert_eq!(model.number_of_constraints(), 1);

        let x0 = &model.variables()[0];
        assert_eq!(x0.lower_bound(), 0);
        assert_eq!(x0.upper_bound(), 5);

        let x2 = &model.variables()[2];
        assert!(x2.is_fixed());
        assert_eq!(x2.lower_bound(), 1);
        assert_eq!(x2.upper_bound(), 1);

        let cap = &model.constraints()[0];
        assert_eq!(cap.sense(), ConstraintSense::Less);
        assert_eq!(-cap.expression().constant(), 10.0);
    }

    #[test]
    fn test_continuous_column_rejected_in_strict_mode() {
        let content = "\
NAME c
ROWS
 N obj
 L r
COLUMNS
    x0 obj 1 r 1
RHS
    rhs r 1
ENDATA
";
        assert!(MpsReader::new().strict(true).from_str(content).is_err());
        // Lenient mode coerces instead.
        let model = MpsReader::new().from_str(content).unwrap();
        assert_eq!(model.number_of_variables(), 1);
    }

    #[test]
    fn test_missing_endata_is_an_error() {
        let content = "NAME x\nROWS\n N obj\n";
        let result = MpsReader::new().from_str(content);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("ENDATA"));
    }

    #[test]
    fn test_unknown_row_reference_is_located() {
        let content = "\
NAME x
ROWS
 N obj
COLUMNS
    x0 nope 1 nope 1
ENDATA
";
        let result = MpsReader::new().from_str(content);
        assert!(result.is_err());
        let parse_error = result.unwrap_err();
        assert_eq!(parse_error.line(), 5);
    }

    #[test]
    fn test_objsense_max_round_trips() {
        let mut model = Model::new("max");
        let x = model.add_binary("x").unwrap();
        model.maximize(vec![(x, 1.0)], 0.0);
        model
            .setup_structure(crate::selection::SelectionMode::Off)
            .unwrap();

        let written = write_mps(&model);
        assert!(written.contains("OBJSENSE"));
        let reparsed = MpsReader::new().from_str(&written).unwrap();
        assert!(!reparsed.is_minimization());
    }

    #[test]
    fn test_round_trip_preserves_structure() {
        // The writer walks variable sensitivities, so the source model
        // needs its structure finalized first.
        let mut model = MpsReader::new().from_str(KNAPSACK_MPS).unwrap();
        model
            .setup_structure(crate::selection::SelectionMode::Off)
            .unwrap();
        let written = write_mps(&model);
        let reparsed = MpsReader::new().from_str(&written).unwrap();

        assert_eq!(reparsed.number_of_variables(), model.number_of_variables());
        assert_eq!(reparsed.number_of_constraints(), model.number_of_constraints());
        for (a, b) in reparsed.variables().iter().zip(model.variables()) {
            assert_eq!(a.name(), b.name());
            assert_eq!(a.lower_bound(), b.lower_bound());
            assert_eq!(a.upper_bound(), b.upper_bound());
            assert_eq!(a.is_fixed(), b.is_fixed());
        }
        for (a, b) in reparsed.constraints().iter().zip(model.constraints()) {
            assert_eq!(a.name(), b.name());
            assert_eq!(a.sense(), b.sense());
            assert_eq!(a.expression().constant(), b.expression().constant());
        }
    }
}
