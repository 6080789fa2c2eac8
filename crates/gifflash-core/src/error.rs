//! Error types for gifflash
//!
//! Every failure is terminal for a run. The variants are grouped the way
//! they are reported: configuration problems (collaborators cannot be
//! located), bad input, a declined confirmation, and failures of the two
//! external tools.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using gifflash's [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Render an exit code, which is absent when a process was killed by a signal
fn exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Errors that can occur while preparing or flashing an image
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    /// `IDF_PATH` is needed to locate a collaborator but is not set
    #[error("IDF_PATH environment variable not set (run: export IDF_PATH=/path/to/esp-idf)")]
    IdfPathNotSet,

    /// An external tool could not be located
    #[error("{tool} not found{}", .searched.as_ref().map(|p| format!(" at {}", p.display())).unwrap_or_default())]
    ToolNotFound {
        /// Tool name (e.g. `spiffsgen.py`)
        tool: &'static str,
        /// Last location that was checked, if any
        searched: Option<PathBuf>,
    },

    // Input errors
    /// Source directory does not exist or is not a directory
    #[error("directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// No files with the requested extension in the source directory
    #[error("no .{extension} files found in {}", .dir.display())]
    NoFiles {
        /// Directory that was scanned
        dir: PathBuf,
        /// Extension that was matched
        extension: String,
    },

    /// Size string could not be parsed
    #[error("invalid size {input:?}: {reason}")]
    InvalidSize {
        /// The string as given
        input: String,
        /// What was wrong with it
        reason: String,
    },

    /// Offset string could not be parsed
    #[error("invalid offset {input:?}: {reason}")]
    InvalidOffset {
        /// The string as given
        input: String,
        /// What was wrong with it
        reason: String,
    },

    /// Partition table file is malformed
    #[error("partition table line {line}: {reason}")]
    PartitionTable {
        /// 1-based line number
        line: usize,
        /// What was wrong with the row
        reason: String,
    },

    /// Named partition is not present in the partition table
    #[error("partition '{0}' not found in partition table")]
    PartitionNotFound(String),

    // User abort
    /// User declined to continue after the oversize warning
    #[error("aborted: files exceed the partition size")]
    Declined,

    /// Run was interrupted by Ctrl-C while a tool was running
    #[error("interrupted")]
    Interrupted,

    // Collaborator failures
    /// External tool could not be started at all
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// Program that was executed
        program: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// Image generation tool exited unsuccessfully
    #[error("error creating SPIFFS image ({})\nstdout: {stdout}\nstderr: {stderr}", exit_code(.code))]
    BuildFailed {
        /// Exit code, if the process exited normally
        code: Option<i32>,
        /// Captured standard output
        stdout: String,
        /// Captured standard error
        stderr: String,
    },

    /// Flashing tool exited unsuccessfully
    #[error("error flashing image ({})", exit_code(.code))]
    FlashFailed {
        /// Exit code, if the process exited normally
        code: Option<i32>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
