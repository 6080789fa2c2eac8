//! gifflash - Flash a directory of GIF files to an ESP32
//!
//! Packages the files into a SPIFFS image with ESP-IDF's `spiffsgen.py`
//! and writes it to the storage partition with `esptool.py`.
//!
//! # Flow
//!
//! 1. Validate the source directory and the files in it
//! 2. Ask for confirmation if the files are larger than the image
//! 3. Build the image into a temporary file
//! 4. Write it to the device at the partition offset
//!
//! Any failure stops the run with exit status 1.

mod cli;
mod commands;

use clap::Parser;
use cli::Cli;

fn main() {
    let cli = Cli::parse();

    // RUST_LOG still takes precedence over -v
    let default_filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match commands::flash::run_flash(&cli) {
        Ok(()) => {}
        Err(e @ gifflash_core::Error::Interrupted) => {
            log::error!("{}", e);
            std::process::exit(commands::flash::EXIT_INTERRUPTED);
        }
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    }
}
