//! Console reporting and prompting

use gifflash_core::files::FileSet;
use gifflash_core::size::{format_kib, format_mib};
use gifflash_tools::{Confirm, FlashProgress};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Duration;

/// Progress reporter printing to stdout, with a spinner while the image is built
pub struct ConsoleProgress {
    label: String,
    spinner: Option<ProgressBar>,
}

impl ConsoleProgress {
    /// `label` names the file kind in messages ("GIF")
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            spinner: None,
        }
    }

    fn create_spinner(&mut self, message: String) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(pb);
    }
}

impl FlashProgress for ConsoleProgress {
    fn files_found(&mut self, files: &FileSet) {
        println!(
            "Found {} {} files, total size: {}",
            files.len(),
            self.label,
            format_kib(files.total_size())
        );
        for file in files {
            println!("  - {}: {}", file.name, format_kib(file.size));
        }
    }

    fn oversize(&mut self, total: u64, image_size: u32) {
        println!(
            "\nWarning: Total {} size ({}) exceeds partition size ({})",
            self.label,
            format_mib(total),
            format_mib(image_size as u64)
        );
    }

    fn building(&mut self, source_dir: &Path, image: &Path, image_size: u32) {
        println!("\nCreating SPIFFS image...");
        println!("  Source directory: {}", source_dir.display());
        println!("  Output image: {}", image.display());
        println!("  Partition size: {}", format_mib(image_size as u64));
        self.create_spinner("Running spiffsgen...".to_string());
    }

    fn built(&mut self, ok: bool) {
        if let Some(pb) = self.spinner.take() {
            if ok {
                pb.finish_with_message("SPIFFS image created successfully");
            } else {
                pb.abandon_with_message("SPIFFS image generation failed");
            }
        }
    }

    fn flashing(&mut self, port: &str, offset: u32, baud: u32) {
        println!("\nFlashing SPIFFS image to ESP32...");
        println!("  Port: {}", port);
        println!("  Offset: 0x{:X}", offset);
        println!("  Baud rate: {}", baud);
    }

    fn flashed(&mut self, ok: bool) {
        if ok {
            println!("\nFlashing completed successfully!");
        }
    }
}

/// Asks on stdout and reads the answer from stdin
///
/// Only "y" (any case) continues; end of input counts as "no".
pub struct StdinConfirm;

impl StdinConfirm {
    fn answer_from<R: BufRead>(reader: &mut R) -> io::Result<bool> {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Ok(false);
        }
        Ok(line.trim().eq_ignore_ascii_case("y"))
    }
}

impl Confirm for StdinConfirm {
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        print!("{}", question);
        io::stdout().flush()?;
        Self::answer_from(&mut io::stdin().lock())
    }
}
