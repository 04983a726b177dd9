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

use chrono::{DateTime, Utc};
use cinder_model::io::{json as model_json, mps::MpsReader, opb::OpbReader};
use cinder_model::model::Model;
use cinder_model::solution::NamedSolution;
use cinder_solver::option::{SolverOptions, Verbose};
use cinder_solver::result::SolveStatus;
use cinder_solver::solve::solve;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Arguments {
    model_path: PathBuf,
    option_path: Option<PathBuf>,
    output_path: PathBuf,
}

fn print_usage() {
    eprintln!("Usage: cinder <model.{{mps,opb,wbo,json}}> [-p options.json] [-o solution.json]");
}

fn parse_arguments() -> Option<Arguments> {
    let mut model_path = None;
    let mut option_path = None;
    let mut output_path = PathBuf::from("solution.json");

    let mut arguments = std::env::args().skip(1);
    while let Some(argument) = arguments.next() {
        match argument.as_str() {
            "-p" | "--option" => option_path = Some(PathBuf::from(arguments.next()?)),
            "-o" | "--output" => output_path = PathBuf::from(arguments.next()?),
            "-h" | "--help" => return None,
            _ => model_path = Some(PathBuf::from(argument)),
        }
    }

    Some(Arguments {
        model_path: model_path?,
        option_path,
        output_path,
    })
}

fn install_subscriber(verbose: Verbose) {
    let default_level = match verbose {
        Verbose::None => "error",
        Verbose::Warning => "warn",
        Verbose::Outer => "info",
        Verbose::Full => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_model(path: &Path) -> Result<Model, String> {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match extension.as_str() {
        "mps" => MpsReader::new()
            .from_path(path)
            .map_err(|error| error.to_string()),
        "opb" | "wbo" => OpbReader::new()
            .from_path(path)
            .map_err(|error| error.to_string()),
        "json" => model_json::read_model_from_path(path).map_err(|error| error.to_string()),
        other => Err(format!("unsupported model file extension \"{other}\"")),
    }
}

#[derive(Debug, Serialize)]
struct SolutionDocument {
    version: &'static str,
    created_at: DateTime<Utc>,
    status: SolveStatus,
    solution: NamedSolution,
}

fn main() -> ExitCode {
    let Some(arguments) = parse_arguments() else {
        print_usage();
        return ExitCode::from(1);
    };

    let options = match &arguments.option_path {
        Some(path) => match SolverOptions::from_json_file(path) {
            Ok(options) => options,
            Err(message) => {
                eprintln!("{message}");
                return ExitCode::from(1);
            }
        },
        None => SolverOptions::default(),
    };

    install_subscriber(options.verbose);

    let mut model = match load_model(&arguments.model_path) {
        Ok(model) => model,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(1);
        }
    };

    let result = match solve(&mut model, &options) {
        Ok(result) => result,
        Err(error) => {
            eprintln!("{error}");
            return ExitCode::from(1);
        }
    };

    let document = SolutionDocument {
        version: env!("CARGO_PKG_VERSION"),
        created_at: Utc::now(),
        status: result.status,
        solution: result.solution,
    };
    let serialized =
        serde_json::to_string_pretty(&document).expect("solution serialization cannot fail");
    if let Err(error) = std::fs::write(&arguments.output_path, serialized) {
        eprintln!(
            "cannot write {}: {error}",
            arguments.output_path.display()
        );
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}
