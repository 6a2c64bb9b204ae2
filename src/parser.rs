//! This module provides the parser for program texts, utilizing the `pest` crate.
//!
//! A program is a flat, whitespace separated token stream: the initial tape, the start
//! index, and then any number of five-token rules (`state read write L|R next`). Machines
//! built from a program always start in [`INITIAL_STATE`](crate::types::INITIAL_STATE).

use crate::{
    table::TransitionTable,
    types::{Direction, LoadError, Program, Transition, MAX_PROGRAM_SIZE},
};
use pest::{
    error::{Error, ErrorVariant},
    iterators::Pair,
    Parser as PestParser, Position, Span,
};
use pest_derive::Parser as PestParser;
use std::sync::Arc;
use tracing::debug;

/// Derives a `PestParser` for the program grammar defined in `grammar.pest`.
#[derive(PestParser)]
#[grammar = "grammar.pest"]
pub struct ProgramParser;

/// Parses the given program text into a `Program`.
///
/// # Arguments
///
/// * `input` - A string slice containing the program text.
///
/// # Returns
///
/// * `Ok(Program)` if the text is well formed and the start index lies on the tape.
/// * `Err(LoadError::Syntax)` if the token stream is malformed, including a non-numeric
///   start index or an incomplete trailing rule.
/// * `Err(LoadError::InvalidIndex)` if the start index does not fit in a `usize`.
/// * `Err(LoadError::IndexOutOfRange)` if the start index is not less than the tape length.
/// * `Err(LoadError::TooLarge)` if the text exceeds `MAX_PROGRAM_SIZE`.
pub fn parse(input: &str) -> Result<Program, LoadError> {
    if input.len() > MAX_PROGRAM_SIZE {
        return Err(LoadError::TooLarge { size: input.len() });
    }

    let pairs = ProgramParser::parse(Rule::program, input).map_err(Box::new)?;

    let mut tape: Option<Vec<char>> = None;
    let mut start: Option<(usize, Position)> = None;
    let mut table = TransitionTable::new();

    for pair in pairs.flat_map(|p| p.into_inner()) {
        match pair.as_rule() {
            Rule::tape => tape = Some(pair.as_str().chars().collect()),
            Rule::index => start = Some((parse_index(&pair)?, pair.as_span().start_pos())),
            Rule::rule => {
                let span = pair.as_span();
                let (state, read, transition) = parse_rule(pair)?;
                if table.insert(state, read, transition).is_some() {
                    let (line, col) = span.start_pos().line_col();
                    debug!(line, col, "rule overrides an earlier rule for the same pair");
                }
            }
            _ => {} // EOI
        }
    }

    let (Some(tape), Some((start, position))) = (tape, start) else {
        return Err(custom_error(
            "Missing tape or start index",
            Position::from_start(input).span(&Position::from_start(input)),
        ));
    };

    if start >= tape.len() {
        let (line, col) = position.line_col();
        return Err(LoadError::IndexOutOfRange {
            index: start,
            len: tape.len(),
            line,
            col,
        });
    }

    Ok(Program {
        tape,
        start,
        table: Arc::new(table),
    })
}

/// Parses the start index. The grammar guarantees digits only, so the only failure is overflow.
fn parse_index(pair: &Pair<Rule>) -> Result<usize, LoadError> {
    pair.as_str().parse::<usize>().map_err(|e| {
        LoadError::InvalidIndex(Box::new(Error::new_from_span(
            ErrorVariant::CustomError {
                message: format!("'{}' is not a valid index: {e}", pair.as_str()),
            },
            pair.as_span(),
        )))
    })
}

/// Parses one `state read write direction next` group into a table entry.
fn parse_rule(pair: Pair<Rule>) -> Result<(String, char, Transition), LoadError> {
    let span = pair.as_span();
    let tokens: Vec<&str> = pair.into_inner().map(|p| p.as_str()).collect();

    let [state, read, write, direction, next] = tokens.as_slice() else {
        return Err(custom_error("Malformed rule", span));
    };
    let (Some(read), Some(write)) = (read.chars().next(), write.chars().next()) else {
        return Err(custom_error("Malformed rule", span));
    };
    let direction = match *direction {
        "L" => Direction::Left,
        _ => Direction::Right,
    };

    Ok((
        state.to_string(),
        read,
        Transition::new(next.to_string(), write, direction),
    ))
}

/// Creates a `LoadError::Syntax` from a message and a `Span`.
fn custom_error(msg: &str, span: Span) -> LoadError {
    LoadError::Syntax(Box::new(Error::new_from_span(
        ErrorVariant::CustomError {
            message: msg.to_string(),
        },
        span,
    )))
}
