//! Collaborator discovery
//!
//! spiffsgen.py ships inside ESP-IDF, so it is found through `IDF_PATH`.
//! esptool is usually installed on `PATH` (as `esptool.py`, or as an
//! `esptool` entry point by newer pip packages) and only falls back to the
//! copy bundled with ESP-IDF.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use gifflash_core::{Error, Result};

use crate::esptool::DeviceWriter;
use crate::runner::ToolCommand;
use crate::spiffs::ImageBuilder;

/// Location of spiffsgen.py relative to `IDF_PATH`
const SPIFFSGEN_REL: &[&str] = &["components", "spiffs", "spiffsgen.py"];
/// Location of the bundled esptool.py relative to `IDF_PATH`
const ESPTOOL_REL: &[&str] = &["components", "esptool_py", "esptool", "esptool.py"];

/// Interpreter used when neither `--python` nor `PYTHON` is given
#[cfg(windows)]
pub const DEFAULT_PYTHON: &str = "python";
/// Interpreter used when neither `--python` nor `PYTHON` is given
#[cfg(not(windows))]
pub const DEFAULT_PYTHON: &str = "python3";

/// Snapshot of the environment variables discovery depends on
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// `IDF_PATH`
    pub idf_path: Option<OsString>,
    /// `PATH`
    pub path: Option<OsString>,
    /// `PYTHON`
    pub python: Option<OsString>,
}

impl Environment {
    /// Read the current process environment
    pub fn from_process() -> Self {
        Self {
            idf_path: env::var_os("IDF_PATH"),
            path: env::var_os("PATH"),
            python: env::var_os("PYTHON"),
        }
    }
}

/// Explicit tool locations from the command line
#[derive(Debug, Clone, Default)]
pub struct ToolOverrides {
    /// ESP-IDF root, instead of `IDF_PATH`
    pub idf_path: Option<PathBuf>,
    /// Python interpreter
    pub python: Option<PathBuf>,
    /// spiffsgen.py script
    pub spiffsgen: Option<PathBuf>,
    /// esptool script or executable
    pub esptool: Option<PathBuf>,
}

/// An external tool: a Python script or a native executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tool {
    /// Run as `<python> <script>`
    Script(PathBuf),
    /// Run directly
    Executable(PathBuf),
}

impl Tool {
    /// Classify a path by its extension
    pub fn from_path(path: PathBuf) -> Self {
        if path.extension().is_some_and(|e| e == "py") {
            Tool::Script(path)
        } else {
            Tool::Executable(path)
        }
    }

    /// Path of the script or executable
    pub fn path(&self) -> &Path {
        match self {
            Tool::Script(p) | Tool::Executable(p) => p,
        }
    }

    /// Start a command line that invokes this tool
    pub fn command(&self, python: &Path) -> ToolCommand {
        match self {
            Tool::Script(script) => ToolCommand::new(python).arg(script),
            Tool::Executable(exe) => ToolCommand::new(exe),
        }
    }
}

/// Resolve the ESP-IDF root from the override or `IDF_PATH`
fn idf_root(overrides: &ToolOverrides, env: &Environment) -> Result<PathBuf> {
    if let Some(path) = &overrides.idf_path {
        return Ok(path.clone());
    }
    match &env.idf_path {
        Some(p) if !p.is_empty() => Ok(PathBuf::from(p)),
        _ => Err(Error::IdfPathNotSet),
    }
}

fn join_all(root: &Path, parts: &[&str]) -> PathBuf {
    parts.iter().fold(root.to_path_buf(), |p, part| p.join(part))
}

/// Search each directory of a `PATH`-style list for `name`
pub fn find_in_path(name: &str, path_var: Option<&OsString>) -> Option<PathBuf> {
    let path_var = path_var?;
    env::split_paths(path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Locate spiffsgen.py inside ESP-IDF
pub fn find_spiffsgen(idf_root: &Path) -> Result<PathBuf> {
    let path = join_all(idf_root, SPIFFSGEN_REL);
    if path.is_file() {
        Ok(path)
    } else {
        Err(Error::ToolNotFound {
            tool: "spiffsgen.py",
            searched: Some(path),
        })
    }
}

/// Locate esptool on `PATH`, falling back to the copy in ESP-IDF
pub fn find_esptool(overrides: &ToolOverrides, env: &Environment) -> Result<Tool> {
    if let Some(path) = find_in_path("esptool.py", env.path.as_ref()) {
        log::debug!("Using esptool.py from PATH: {}", path.display());
        return Ok(Tool::Script(path));
    }

    let exe_name = if cfg!(windows) { "esptool.exe" } else { "esptool" };
    if let Some(path) = find_in_path(exe_name, env.path.as_ref()) {
        log::debug!("Using esptool from PATH: {}", path.display());
        return Ok(Tool::Executable(path));
    }

    let root = idf_root(overrides, env)?;
    let bundled = join_all(&root, ESPTOOL_REL);
    if bundled.is_file() {
        log::debug!("Using esptool.py from ESP-IDF: {}", bundled.display());
        return Ok(Tool::Script(bundled));
    }

    Err(Error::ToolNotFound {
        tool: "esptool.py",
        searched: Some(bundled),
    })
}

/// Everything needed to invoke the two collaborators
#[derive(Debug, Clone)]
pub struct Toolchain {
    /// Python interpreter for script tools
    pub python: PathBuf,
    /// Image generation tool
    pub spiffsgen: Tool,
    /// Flashing tool
    pub esptool: Tool,
}

impl Toolchain {
    /// Find the interpreter and both tools
    ///
    /// Explicit overrides win over the environment. Overrides are taken as
    /// given without checking that they exist; running them reports that.
    pub fn discover(overrides: &ToolOverrides, env: &Environment) -> Result<Self> {
        let python = overrides
            .python
            .clone()
            .or_else(|| env.python.as_ref().filter(|p| !p.is_empty()).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PYTHON));

        let spiffsgen = match &overrides.spiffsgen {
            Some(path) => Tool::from_path(path.clone()),
            None => Tool::Script(find_spiffsgen(&idf_root(overrides, env)?)?),
        };

        let esptool = match &overrides.esptool {
            Some(path) => Tool::from_path(path.clone()),
            None => find_esptool(overrides, env)?,
        };

        log::debug!("Python:    {}", python.display());
        log::debug!("spiffsgen: {}", spiffsgen.path().display());
        log::debug!("esptool:   {}", esptool.path().display());

        Ok(Self {
            python,
            spiffsgen,
            esptool,
        })
    }

    /// Image builder using this toolchain's spiffsgen
    pub fn image_builder(&self) -> ImageBuilder {
        ImageBuilder::new(self.python.clone(), self.spiffsgen.clone())
    }

    /// Device writer using this toolchain's esptool
    pub fn device_writer(&self) -> DeviceWriter {
        DeviceWriter::new(self.python.clone(), self.esptool.clone())
    }
}
