//! External tool handling for gifflash
//!
//! gifflash does not know how to lay out a SPIFFS image or how to talk to
//! an ESP32 ROM loader. It delegates both to ESP-IDF's own tools and this
//! crate is the only place that knows how to find and invoke them.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   CLI (bin/gifflash)                      │
//! │  - Parses flags, owns the console (spinner, prompt)       │
//! └──────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │                 pipeline (this crate)                     │
//! │  validate → confirm → build image → write to device       │
//! └──────────────────────────────────────────────────────────┘
//!              │                               │
//!              ▼                               ▼
//! ┌──────────────────────────┐   ┌──────────────────────────┐
//! │  ImageBuilder            │   │  DeviceWriter            │
//! │  - spiffsgen.py          │   │  - esptool.py            │
//! └──────────────────────────┘   └──────────────────────────┘
//!              │                               │
//!              └───────────────┬───────────────┘
//!                              ▼
//!                  CommandRunner (std::process)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use gifflash_tools::{locate::{Environment, ToolOverrides, Toolchain}, runner::SystemRunner};
//!
//! let tools = Toolchain::discover(&ToolOverrides::default(), &Environment::from_process())?;
//! let builder = tools.image_builder();
//! builder.build(&mut SystemRunner, "./gifs".as_ref(), 3 * 1024 * 1024, "out.bin".as_ref())?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod esptool;
pub mod interrupt;
pub mod locate;
pub mod pipeline;
pub mod runner;
pub mod spiffs;

pub use esptool::DeviceWriter;
pub use interrupt::Interrupt;
pub use locate::{Environment, Tool, ToolOverrides, Toolchain};
pub use pipeline::{Collaborators, Confirm, FlashJob, FlashProgress, FlashReport, NoProgress};
pub use runner::{CommandRunner, SystemRunner, ToolCommand, ToolOutput};
pub use spiffs::{ImageBuilder, SpiffsParams};

// Re-export core types that the CLI needs
pub use gifflash_core::{Error, Result};
