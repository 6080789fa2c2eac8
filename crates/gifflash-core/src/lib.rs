//! gifflash-core - Input validation for the gifflash CLI
//!
//! This crate holds everything gifflash decides before any external tool
//! runs: parsing human-readable sizes and flash offsets, describing the
//! target partition (from built-in defaults or an ESP-IDF partition table),
//! and taking a snapshot of the files to be packaged.
//!
//! # Example
//!
//! ```ignore
//! use gifflash_core::{files::FileSet, size::parse_size};
//!
//! let image_size = parse_size("3M")?;
//! let files = FileSet::scan("./gifs".as_ref(), "gif")?;
//! if files.total_size() > image_size as u64 {
//!     println!("files do not fit");
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod files;
pub mod partition;
pub mod size;

pub use error::{Error, Result};
