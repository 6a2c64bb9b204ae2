//! Built-in programs shipped with the crate, used by the front-ends when no program
//! file is given.

use crate::parser::parse;
use crate::types::Program;
use tracing::warn;

// Default embedded programs
const PROGRAM_TEXTS: [(&str, &str); 4] = [
    (
        "Binary increment",
        include_str!("../programs/binary-increment.tm"),
    ),
    ("Bit flipper", include_str!("../programs/bit-flipper.tm")),
    ("Unary eraser", include_str!("../programs/unary-eraser.tm")),
    ("Ping pong", include_str!("../programs/ping-pong.tm")),
];

lazy_static::lazy_static! {
    static ref PROGRAMS: Vec<(usize, Program)> = PROGRAM_TEXTS
        .iter()
        .enumerate()
        .filter_map(|(index, (name, text))| match parse(text) {
            Ok(program) => Some((index, program)),
            Err(e) => {
                warn!(name, error = %e, "failed to parse built-in program");
                None
            }
        })
        .collect();
}

/// Summary of a built-in program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramInfo {
    pub index: usize,
    pub name: String,
    pub initial_tape: String,
    pub state_count: usize,
    pub transition_count: usize,
}

pub struct ProgramManager;

impl ProgramManager {
    /// Get the number of available programs
    pub fn count() -> usize {
        PROGRAMS.len()
    }

    /// Get a program by its index
    pub fn get_program_by_index(index: usize) -> Option<Program> {
        PROGRAMS.get(index).map(|(_, program)| program.clone())
    }

    /// Get a program by its name (case-insensitive)
    pub fn get_program_by_name(name: &str) -> Option<Program> {
        PROGRAMS
            .iter()
            .position(|(i, _)| PROGRAM_TEXTS[*i].0.eq_ignore_ascii_case(name))
            .and_then(Self::get_program_by_index)
    }

    /// Get the name of a program by its index
    pub fn get_program_name(index: usize) -> Option<&'static str> {
        PROGRAMS.get(index).map(|(i, _)| PROGRAM_TEXTS[*i].0)
    }

    /// Get the original text of a program by its index
    pub fn get_program_text_by_index(index: usize) -> Option<&'static str> {
        PROGRAMS.get(index).map(|(i, _)| PROGRAM_TEXTS[*i].1)
    }

    /// List all program names
    pub fn list_program_names() -> Vec<&'static str> {
        PROGRAMS.iter().map(|(i, _)| PROGRAM_TEXTS[*i].0).collect()
    }

    /// Get information about a program by its index
    pub fn get_program_info(index: usize) -> Option<ProgramInfo> {
        let (i, program) = PROGRAMS.get(index)?;

        Some(ProgramInfo {
            index,
            name: PROGRAM_TEXTS[*i].0.to_string(),
            initial_tape: program.tape_string(),
            state_count: program.table.states().len(),
            transition_count: program.table.len(),
        })
    }
}
