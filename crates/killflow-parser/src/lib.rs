/*! Parse text IR into programs.
 *
 * Kill proofs are easiest to study on small hand-written programs. This parser reads the text
 * format back into a `Program`, so test fixtures, CLI inputs and emitted dumps all share one
 * representation.
 */

use killflow_core::{IrError, Program};
use pest::Parser;
use pest_derive::Parser;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

mod lower;

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct KillflowParser;

pub type ParseResult<T> = Result<T, Box<pest::error::Error<Rule>>>;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] Box<pest::error::Error<Rule>>),
    #[error("Undefined value '{name}' in @{function}")]
    UndefinedValue { function: String, name: String },
    #[error("Undefined block '{block}' in @{function}")]
    UndefinedBlock { function: String, block: String },
    #[error("Duplicate definition of '{name}' in @{function}")]
    DuplicateName { function: String, name: String },
    #[error("Malformed instruction in @{function}: {message}")]
    Malformed { function: String, message: String },
    #[error(transparent)]
    Ir(#[from] IrError),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Syntax-only parse.
pub fn parse(input: &str) -> ParseResult<pest::iterators::Pairs<'_, Rule>> {
    KillflowParser::parse(Rule::program, input).map_err(Box::new)
}

pub fn check(input: &str) -> bool {
    parse(input).is_ok()
}

pub fn parse_program(input: &str) -> Result<Program, ParseError> {
    let pairs = parse(input)?;
    lower::lower_program(pairs)
}

pub fn parse_program_file<P: AsRef<Path>>(path: P) -> Result<Program, ParseError> {
    let path = path.as_ref();
    let input = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_program(&input)
}

/// Parses every `.kir` file below `dir`, in path order.
pub fn parse_directory<P: AsRef<Path>>(dir: P) -> Vec<(PathBuf, Result<Program, ParseError>)> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().map_or(false, |ext| ext == "kir"))
        .collect();
    files.sort();

    files
        .into_iter()
        .map(|path| {
            let result = parse_program_file(&path);
            (path, result)
        })
        .collect()
}
