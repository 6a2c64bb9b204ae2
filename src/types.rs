//! This module defines the core data structures and types used throughout the simulator,
//! including transitions, step outcomes, machine snapshots, and error types.

use serde::{Deserialize, Serialize};
use std::io;
use std::sync::Arc;
use thiserror::Error;

use crate::machine::Machine;
use crate::table::{TransitionSource, TransitionTable};
use crate::Rule;

/// The state every loaded program starts in.
pub const INITIAL_STATE: &str = "0";
/// The maximum allowed size for a program text in bytes.
pub const MAX_PROGRAM_SIZE: usize = 65536; // 64KB

/// A loaded program: the initial tape and cursor plus the rules to run.
///
/// The table is reference counted, so every machine built from one `Program`
/// shares the same rules.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// The initial tape, one symbol per cell.
    pub tape: Vec<char>,
    /// The initial cursor position.
    pub start: usize,
    /// The transition rules.
    pub table: Arc<TransitionTable>,
}

impl Program {
    /// Returns the initial tape as a `String`.
    pub fn tape_string(&self) -> String {
        self.tape.iter().collect()
    }

    /// Builds a stopped machine in `INITIAL_STATE` running this program.
    pub fn machine(&self) -> Result<Machine, MachineError> {
        let table: Arc<dyn TransitionSource<String, char>> = self.table.clone();
        Machine::with_source(self.tape.clone(), self.start, INITIAL_STATE.to_string(), table)
    }
}

/// Represents the possible directions a Turing Machine head can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one position to the left.
    Left,
    /// Move the head one position to the right.
    Right,
}

/// The right-hand side of a transition rule.
///
/// A transition tells the machine which state to enter, what to write under the
/// cursor, and which way to move once the write is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition<S = String, T = char> {
    /// The next state the machine transitions to.
    pub next_state: S,
    /// The symbol written at the cursor.
    pub write: T,
    /// The direction the cursor moves after the write.
    pub direction: Direction,
}

impl<S, T> Transition<S, T> {
    pub fn new(next_state: S, write: T, direction: Direction) -> Self {
        Self {
            next_state,
            write,
            direction,
        }
    }
}

/// Why a machine stopped. Halting is a terminal state, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Halt {
    /// No rule exists for the current state and symbol.
    Undefined,
    /// A move would have left the tape.
    Boundary,
}

/// Represents the outcome of a single `step()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The machine applied a transition and can keep going.
    Continue,
    /// The machine is halted.
    Halt(Halt),
}

/// A consistent view of a machine, taken under its lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot<S = String, T = char> {
    pub tape: Vec<T>,
    pub cursor: usize,
    pub state: S,
    pub halt: Option<Halt>,
    pub steps: u64,
}

impl<S, T> Snapshot<S, T> {
    pub fn halted(&self) -> bool {
        self.halt.is_some()
    }
}

impl<S> Snapshot<S, char> {
    /// Returns the tape contents as a `String`.
    pub fn tape_string(&self) -> String {
        self.tape.iter().collect()
    }
}

/// Errors reported while loading a program. No machine is built when one occurs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    /// The token stream does not follow the program grammar.
    #[error("Program syntax error: {0}")]
    Syntax(#[from] Box<pest::error::Error<Rule>>),
    /// The start index token is numeric but cannot be represented.
    #[error("Invalid start index: {0}")]
    InvalidIndex(Box<pest::error::Error<Rule>>),
    /// The start index lies outside the tape.
    #[error("Start index {index} at {line}:{col} is out of range for a tape of length {len}")]
    IndexOutOfRange {
        index: usize,
        len: usize,
        line: usize,
        col: usize,
    },
    /// The program text exceeds `MAX_PROGRAM_SIZE`.
    #[error("Program is too large: {size} bytes (limit {})", MAX_PROGRAM_SIZE)]
    TooLarge { size: usize },
    /// Reading a program file failed.
    #[error("File error: {0}")]
    File(String),
}

/// Errors reported while constructing a machine.
#[derive(Debug, Error)]
pub enum MachineError {
    #[error("Tape must contain at least one cell")]
    EmptyTape,
    #[error("Cursor {cursor} is out of bounds for a tape of length {len}")]
    CursorOutOfBounds { cursor: usize, len: usize },
    /// The operating system refused to start the worker thread.
    #[error("Failed to spawn machine worker: {0}")]
    Spawn(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_program_builds_machines_sharing_the_table() {
        let program = Program {
            tape: "011".chars().collect(),
            start: 2,
            table: Arc::new(
                TransitionTable::new()
                    .rule("0".into(), '1', '0', Direction::Left, "0".into())
                    .rule("0".into(), '0', '1', Direction::Left, "1".into()),
            ),
        };

        let first = program.machine().unwrap();
        let second = program.machine().unwrap();
        assert_eq!(first.state(), INITIAL_STATE);
        assert_eq!(first.cursor(), 2);

        first.set_running(true);
        assert!(first.wait_halted(Some(Duration::from_secs(5))));
        assert_eq!(first.tape(), "100".chars().collect::<Vec<_>>());
        assert_eq!(second.tape(), program.tape);
        assert_eq!(Arc::strong_count(&program.table), 3);
    }

    #[test]
    fn test_direction_serialization() {
        let left = Direction::Left;
        let right = Direction::Right;

        let left_json = serde_json::to_string(&left).unwrap();
        let right_json = serde_json::to_string(&right).unwrap();

        assert_eq!(left_json, "\"Left\"");
        assert_eq!(right_json, "\"Right\"");

        let left_deserialized: Direction = serde_json::from_str(&left_json).unwrap();
        let right_deserialized: Direction = serde_json::from_str(&right_json).unwrap();

        assert_eq!(left, left_deserialized);
        assert_eq!(right, right_deserialized);
    }

    #[test]
    fn test_transition_creation() {
        let transition = Transition::new("q1".to_string(), 'X', Direction::Right);

        assert_eq!(transition.write, 'X');
        assert_eq!(transition.direction, Direction::Right);
        assert_eq!(transition.next_state, "q1");
    }

    #[test]
    fn test_snapshot_json() {
        let snapshot: Snapshot = Snapshot {
            tape: vec!['1', '0', '0'],
            cursor: 0,
            state: "1".to_string(),
            halt: Some(Halt::Boundary),
            steps: 3,
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["tape"], serde_json::json!(["1", "0", "0"]));
        assert_eq!(json["halt"], "Boundary");
        assert_eq!(snapshot.tape_string(), "100");
        assert!(snapshot.halted());
    }

    #[test]
    fn test_error_display() {
        let error = LoadError::IndexOutOfRange {
            index: 3,
            len: 3,
            line: 1,
            col: 5,
        };

        let error_msg = format!("{}", error);
        assert!(error_msg.contains("Start index 3 at 1:5"));
        assert!(error_msg.contains("length 3"));

        let error = MachineError::CursorOutOfBounds { cursor: 5, len: 2 };
        assert_eq!(
            error.to_string(),
            "Cursor 5 is out of bounds for a tape of length 2"
        );
    }
}
