//! Man page generator for gifflash
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir] [--stdout]

use clap::{CommandFactory, Parser};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

#[path = "../cli.rs"]
mod cli;

/// Page name and section
const PAGE: &str = "gifflash.1";

#[derive(Parser, Debug)]
#[command(name = "gen-manpage", about = "Render the gifflash man page")]
struct ManArgs {
    /// Directory to write gifflash.1 into
    #[arg(default_value = "man")]
    output_dir: PathBuf,

    /// Print the page instead of writing it
    #[arg(long)]
    stdout: bool,
}

/// Render the roff source for the gifflash CLI
fn render_page() -> io::Result<Vec<u8>> {
    let man = clap_mangen::Man::new(cli::Cli::command());
    let mut buffer = Vec::new();
    man.render(&mut buffer)?;
    Ok(buffer)
}

fn main() -> io::Result<()> {
    let args = ManArgs::parse();
    let page = render_page()?;

    if args.stdout {
        return io::stdout().write_all(&page);
    }

    fs::create_dir_all(&args.output_dir)?;
    let output_path = args.output_dir.join(PAGE);
    fs::write(&output_path, page)?;

    println!("Man page generated at: {}", output_path.display());
    println!("View it with: man -l {}", output_path.display());
    Ok(())
}
