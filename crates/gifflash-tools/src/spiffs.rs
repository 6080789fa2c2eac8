//! SPIFFS image generation via spiffsgen.py

use std::path::{Path, PathBuf};

use gifflash_core::{Error, Result};

use crate::locate::Tool;
use crate::runner::{CommandRunner, ToolCommand};

/// Structural parameters of the generated filesystem
///
/// These must match the SPIFFS configuration compiled into the firmware,
/// otherwise the device will not mount the partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiffsParams {
    /// Logical page size
    pub page_size: u32,
    /// Logical block size (one flash erase block)
    pub block_size: u32,
    /// Object name field length, including the NUL terminator
    pub obj_name_len: usize,
}

impl Default for SpiffsParams {
    fn default() -> Self {
        Self {
            page_size: 256,
            block_size: 4096,
            obj_name_len: 32,
        }
    }
}

/// Builds SPIFFS images with spiffsgen.py
#[derive(Debug, Clone)]
pub struct ImageBuilder {
    python: PathBuf,
    tool: Tool,
    params: SpiffsParams,
}

impl ImageBuilder {
    /// Create a builder with the default parameters
    pub fn new(python: PathBuf, tool: Tool) -> Self {
        Self {
            python,
            tool,
            params: SpiffsParams::default(),
        }
    }

    /// Use different filesystem parameters
    pub fn with_params(mut self, params: SpiffsParams) -> Self {
        self.params = params;
        self
    }

    /// Filesystem parameters in use
    pub fn params(&self) -> &SpiffsParams {
        &self.params
    }

    /// Command line that builds an image of `size` bytes from `source_dir`
    pub fn command(&self, source_dir: &Path, size: u32, output: &Path) -> ToolCommand {
        self.tool
            .command(&self.python)
            .arg(size.to_string())
            .arg(source_dir)
            .arg(output)
            .arg("--page-size")
            .arg(self.params.page_size.to_string())
            .arg("--block-size")
            .arg(self.params.block_size.to_string())
            .arg("--obj-name-len")
            .arg(self.params.obj_name_len.to_string())
    }

    /// Generate the image, capturing spiffsgen's output
    ///
    /// Any non-zero exit is a hard failure carrying the captured output.
    pub fn build<R: CommandRunner + ?Sized>(
        &self,
        runner: &mut R,
        source_dir: &Path,
        size: u32,
        output: &Path,
    ) -> Result<()> {
        let cmd = self.command(source_dir, size, output);
        let out = runner.output(&cmd).map_err(|source| Error::Spawn {
            program: cmd.program().to_string_lossy().into_owned(),
            source,
        })?;

        if !out.success() {
            return Err(Error::BuildFailed {
                code: out.code,
                stdout: out.stdout,
                stderr: out.stderr,
            });
        }

        if !out.stdout.trim().is_empty() {
            log::debug!("spiffsgen: {}", out.stdout.trim());
        }
        Ok(())
    }
}
