//! CLI command implementations
//!
//! The pipeline itself lives in `gifflash-tools`; this module resolves the
//! command line into a job and owns the console: the progress spinner, the
//! confirmation prompt and the final report.

pub mod flash;
mod console;

pub use console::{ConsoleProgress, StdinConfirm};
