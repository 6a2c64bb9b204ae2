//! This crate provides the core logic for a concurrent Turing Machine simulator.
//! Every machine owns a background worker that steps it while it is marked running,
//! and stays safely observable and controllable from other threads. The crate also
//! includes the loader for the plain-text program format and a small library of
//! built-in programs.

pub mod loader;
pub mod machine;
pub mod parser;
pub mod programs;
pub mod table;
pub mod types;

/// Re-exports the `Rule` enum from the parser module, used by the `pest` grammar.
pub use crate::parser::Rule;
/// Re-exports the `ProgramLoader` struct from the loader module.
pub use loader::ProgramLoader;
/// Re-exports the `Machine` struct from the machine module.
pub use machine::Machine;
/// Re-exports the `parse` function from the parser module.
pub use parser::parse;
/// Re-exports `ProgramInfo` and `ProgramManager` from the programs module.
pub use programs::{ProgramInfo, ProgramManager};
/// Re-exports the transition sources from the table module.
pub use table::{TransitionFn, TransitionSource, TransitionTable};
/// Re-exports the shared vocabulary types from the types module.
pub use types::{
    Direction, Halt, LoadError, MachineError, Program, Snapshot, Step, Transition, INITIAL_STATE,
    MAX_PROGRAM_SIZE,
};
