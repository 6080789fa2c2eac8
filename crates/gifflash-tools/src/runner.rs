//! Subprocess execution
//!
//! All external tools are run through the [`CommandRunner`] trait so the
//! pipeline can be exercised without spiffsgen or esptool installed.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::process::{Command, Stdio};

/// A program and its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: OsString,
    args: Vec<OsString>,
}

impl ToolCommand {
    /// Start a command line for `program`
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Program to execute
    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// Arguments, not including the program
    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// How a tool run ended
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` if the process was killed by a signal
    pub code: Option<i32>,
    /// Captured standard output (empty when not captured)
    pub stdout: String,
    /// Captured standard error (empty when not captured)
    pub stderr: String,
}

impl ToolOutput {
    /// Check if the tool exited with status 0
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs external commands to completion
pub trait CommandRunner {
    /// Run a command and capture its output
    fn output(&mut self, cmd: &ToolCommand) -> io::Result<ToolOutput>;

    /// Run a command with the console inherited
    fn status(&mut self, cmd: &ToolCommand) -> io::Result<ToolOutput>;
}

/// [`CommandRunner`] backed by `std::process`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn output(&mut self, cmd: &ToolCommand) -> io::Result<ToolOutput> {
        log::debug!("Running: {}", cmd);
        let out = cmd.to_command().stdin(Stdio::null()).output()?;
        Ok(ToolOutput {
            code: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        })
    }

    fn status(&mut self, cmd: &ToolCommand) -> io::Result<ToolOutput> {
        log::debug!("Running: {}", cmd);
        let status = cmd.to_command().status()?;
        Ok(ToolOutput {
            code: status.code(),
            ..Default::default()
        })
    }
}
