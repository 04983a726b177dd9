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

use std::fmt;

/// Errors raised while building or checking a model. All of them abort
/// setup; the search kernel itself never fails.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    TooManyVariables,
    TooManyConstraints,
    InvalidName(String),
    InvalidBounds {
        name: String,
        lower_bound: i64,
        upper_bound: i64,
    },
    UndefinedObjective,
    InitialValueViolation {
        name: String,
        value: i64,
        detail: String,
    },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::TooManyVariables => {
                write!(f, "The number of variables exceeds the supported capacity.")
            }
            ModelError::TooManyConstraints => {
                write!(f, "The number of constraints exceeds the supported capacity.")
            }
            ModelError::InvalidName(name) => {
                write!(f, "The name \"{name}\" contains whitespace.")
            }
            ModelError::InvalidBounds {
                name,
                lower_bound,
                upper_bound,
            } => write!(
                f,
                "Variable {name} has an empty bound range [{lower_bound}, {upper_bound}]."
            ),
            ModelError::UndefinedObjective => {
                write!(f, "Neither an objective nor any constraint is defined.")
            }
            ModelError::InitialValueViolation {
                name,
                value,
                detail,
            } => write!(f, "Initial value {value} of variable {name} is invalid: {detail}"),
        }
    }
}

impl std::error::Error for ModelError {}

/// Input format of a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Mps,
    Opb,
    Json,
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputFormat::Mps => write!(f, "MPS"),
            InputFormat::Opb => write!(f, "OPB"),
            InputFormat::Json => write!(f, "JSON"),
        }
    }
}

/// A location-tagged syntax or semantics error in an input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    format: InputFormat,
    line: usize,
    message: String,
}

impl ParseError {
    pub fn new(format: InputFormat, line: usize, message: impl Into<String>) -> Self {
        Self {
            format,
            line,
            message: message.into(),
        }
    }

    #[inline]
    pub fn format(&self) -> InputFormat {
        self.format
    }

    #[inline]
    pub fn line(&self) -> usize {
        self.line
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} parse error at line {}: {}", self.format, self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let error = ModelError::InvalidBounds {
            name: "x".to_string(),
            lower_bound: 3,
            upper_bound: 1,
        };
        assert!(error.to_string().contains("[3, 1]"));

        let parse = ParseError::new(InputFormat::Mps, 12, "unknown section");
        assert_eq!(parse.to_string(), "MPS parse error at line 12: unknown section");
    }
}
