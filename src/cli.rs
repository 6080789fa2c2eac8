//! CLI argument parsing

use clap::Parser;
use gifflash_core::partition::DEFAULT_PARTITION_NAME;
use gifflash_core::size::{parse_offset, parse_size};
use gifflash_tools::esptool::{DEFAULT_BAUD, DEFAULT_CHIP};
use std::path::PathBuf;

const EXAMPLES: &str = "\
Examples:
  # Flash GIFs from ./gifs directory to COM3
  gifflash --port COM3 --gif-dir ./gifs

  # Flash with custom partition size
  gifflash --port /dev/ttyUSB0 --gif-dir ./gifs --partition-size 3M

  # Flash with custom offset (if you modified the partition table)
  gifflash --port COM3 --gif-dir ./gifs --offset 0xD00000

  # Take offset and size from the firmware's partition table
  gifflash -p /dev/ttyUSB0 -d ./gifs --partition-table partitions_16M_small_ota.csv";

/// Parse an image size like "3M", "1024K" or "4096"
fn parse_size_arg(s: &str) -> Result<u32, String> {
    parse_size(s).map_err(|e| e.to_string())
}

/// Parse a flash offset as hex (0x...) or decimal
fn parse_offset_arg(s: &str) -> Result<u32, String> {
    parse_offset(s).map_err(|e| e.to_string())
}

#[derive(Parser, Debug)]
#[command(name = "gifflash")]
#[command(author, version, about = "Flash GIF files to an ESP32 storage partition", long_about = None)]
#[command(after_help = EXAMPLES)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Serial port (e.g., COM3 or /dev/ttyUSB0)
    #[arg(short, long)]
    pub port: String,

    /// Directory containing GIF files
    #[arg(short = 'd', long)]
    pub gif_dir: PathBuf,

    /// Image size, e.g. 3M or 1024K [default: 3M, or the size from --partition-table]
    #[arg(short = 's', long, value_parser = parse_size_arg)]
    pub partition_size: Option<u32>,

    /// Flash offset, hex (0x...) or decimal [default: 0xA00000, or the offset from --partition-table]
    #[arg(short, long, value_parser = parse_offset_arg)]
    pub offset: Option<u32>,

    /// Baud rate
    #[arg(short, long, default_value_t = DEFAULT_BAUD)]
    pub baud: u32,

    /// Keep generated SPIFFS image file
    #[arg(long)]
    pub keep_image: bool,

    /// ESP-IDF partition table (CSV) to take the offset and size from
    #[arg(long)]
    pub partition_table: Option<PathBuf>,

    /// Partition to use from --partition-table
    #[arg(long, default_value = DEFAULT_PARTITION_NAME)]
    pub partition_name: String,

    /// Extension of the files to package
    #[arg(long, default_value = "gif")]
    pub extension: String,

    /// Chip type passed to esptool
    #[arg(long, default_value = DEFAULT_CHIP)]
    pub chip: String,

    /// ESP-IDF root (defaults to $IDF_PATH)
    #[arg(long)]
    pub idf_path: Option<PathBuf>,

    /// Python interpreter for spiffsgen.py and esptool.py (defaults to $PYTHON, then python3)
    #[arg(long)]
    pub python: Option<PathBuf>,

    /// Path to spiffsgen.py (defaults to the copy in ESP-IDF)
    #[arg(long)]
    pub spiffsgen: Option<PathBuf>,

    /// Path to esptool (defaults to esptool.py on PATH, then the copy in ESP-IDF)
    #[arg(long)]
    pub esptool: Option<PathBuf>,
}
