//! Writing images to the device via esptool

use std::path::{Path, PathBuf};

use gifflash_core::{Error, Result};

use crate::locate::Tool;
use crate::runner::{CommandRunner, ToolCommand};

/// Default serial baud rate
pub const DEFAULT_BAUD: u32 = 460_800;
/// Default `--chip` argument; esptool detects the chip itself
pub const DEFAULT_CHIP: &str = "auto";

/// Writes images to flash with esptool's `write_flash`
#[derive(Debug, Clone)]
pub struct DeviceWriter {
    python: PathBuf,
    tool: Tool,
    chip: String,
}

impl DeviceWriter {
    /// Create a writer for any chip esptool can detect
    pub fn new(python: PathBuf, tool: Tool) -> Self {
        Self {
            python,
            tool,
            chip: DEFAULT_CHIP.to_string(),
        }
    }

    /// Pass a specific chip type to esptool
    pub fn with_chip(mut self, chip: impl Into<String>) -> Self {
        self.chip = chip.into();
        self
    }

    /// Command line that writes `image` at `offset`
    pub fn command(&self, port: &str, baud: u32, offset: u32, image: &Path) -> ToolCommand {
        self.tool
            .command(&self.python)
            .args(["--chip", self.chip.as_str()])
            .args(["--port", port])
            .arg("--baud")
            .arg(baud.to_string())
            .arg("write_flash")
            .arg(format!("0x{:X}", offset))
            .arg(image)
    }

    /// Write the image, with esptool's own progress on the console
    ///
    /// On failure the device contents are whatever esptool left behind.
    pub fn write<R: CommandRunner + ?Sized>(
        &self,
        runner: &mut R,
        port: &str,
        baud: u32,
        offset: u32,
        image: &Path,
    ) -> Result<()> {
        let cmd = self.command(port, baud, offset, image);
        let out = runner.status(&cmd).map_err(|source| Error::Spawn {
            program: cmd.program().to_string_lossy().into_owned(),
            source,
        })?;

        if out.success() {
            Ok(())
        } else {
            Err(Error::FlashFailed { code: out.code })
        }
    }
}
