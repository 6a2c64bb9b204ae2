//! This module provides the `ProgramLoader` struct, responsible for loading programs
//! from various sources, including files and strings.

use crate::parser::parse;
use crate::types::{LoadError, Program};
use std::fs;
use std::path::{Path, PathBuf};

/// File extension recognized by [`ProgramLoader::load_programs`].
pub const PROGRAM_EXTENSION: &str = "tm";

/// `ProgramLoader` is a utility struct for loading programs.
/// It provides methods to load programs from individual files, from string content,
/// and to discover and load all `.tm` files within a specified directory.
pub struct ProgramLoader;

impl ProgramLoader {
    /// Loads a single program from the specified file path.
    ///
    /// # Arguments
    ///
    /// * `path` - A reference to the `Path` of the file to load.
    ///
    /// # Returns
    ///
    /// * `Ok(Program)` if the file is successfully read and parsed into a `Program`.
    /// * `Err(LoadError::File)` if the file cannot be read.
    /// * Any other `LoadError` if the content is not a valid program.
    pub fn load_program(path: &Path) -> Result<Program, LoadError> {
        let content = fs::read_to_string(path).map_err(|e| {
            LoadError::File(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        parse(&content)
    }

    /// Loads a single program from the provided string content.
    ///
    /// This is useful for parsing programs that are not stored in files, e.g., from stdin.
    pub fn load_program_from_string(content: &str) -> Result<Program, LoadError> {
        parse(content)
    }

    /// Loads all program files (`.tm` extension) from a given directory.
    ///
    /// Directories and files with other extensions are skipped. Each loaded file yields
    /// either its path and `Program`, or the error that prevented loading it.
    pub fn load_programs(directory: &Path) -> Vec<Result<(PathBuf, Program), LoadError>> {
        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![Err(LoadError::File(format!(
                    "Failed to read directory {}: {}",
                    directory.display(),
                    e
                )))]
            }
        };

        let mut results: Vec<_> = entries
            .filter_map(|entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        return Some(Err(LoadError::File(format!(
                            "Failed to read directory entry: {}",
                            e
                        ))))
                    }
                };

                let path = entry.path();

                // Skip directories and files with other extensions
                if path.is_dir() || path.extension().is_none_or(|ext| ext != PROGRAM_EXTENSION) {
                    return None;
                }

                Some(Self::load_program(&path).map(|program| (path, program)))
            })
            .collect();

        // `read_dir` order is platform dependent.
        results.sort_by(|a, b| match (a, b) {
            (Ok((a, _)), Ok((b, _))) => a.cmp(b),
            (Ok(_), Err(_)) => std::cmp::Ordering::Less,
            (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
            (Err(_), Err(_)) => std::cmp::Ordering::Equal,
        });

        results
    }
}
