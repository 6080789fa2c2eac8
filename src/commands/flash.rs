//! Flash command implementation

use crate::cli::Cli;
use crate::commands::{ConsoleProgress, StdinConfirm};
use gifflash_core::partition::{Partition, PartitionTable, DEFAULT_IMAGE_SIZE};
use gifflash_core::size::parse_size;
use gifflash_core::{Error, Result};
use gifflash_tools::pipeline::{self, Collaborators, FlashJob, FlashReport};
use gifflash_tools::{Environment, Interrupt, SystemRunner, ToolOverrides, Toolchain};
use std::io;

/// Exit status for a run ended by Ctrl-C
pub const EXIT_INTERRUPTED: i32 = 130;

/// Resolve the target partition: --offset, then the partition table, then
/// the built-in default
fn resolve_partition(cli: &Cli) -> Result<Partition> {
    let mut partition = match &cli.partition_table {
        Some(path) => {
            let table = PartitionTable::from_csv_file(path)?;
            log::info!(
                "Loaded {} partitions from {}",
                table.len(),
                path.display()
            );
            table
                .find(&cli.partition_name)
                .cloned()
                .ok_or_else(|| Error::PartitionNotFound(cli.partition_name.clone()))?
        }
        None => {
            let mut p = Partition::default_storage();
            p.name = cli.partition_name.clone();
            p
        }
    };

    if let Some(offset) = cli.offset {
        partition.offset = offset;
    }

    log::debug!(
        "Partition '{}': offset 0x{:X}, size 0x{:X}",
        partition.name,
        partition.offset,
        partition.size
    );
    Ok(partition)
}

/// Resolve the image size: --partition-size, then the partition table,
/// then the built-in default
fn resolve_image_size(cli: &Cli, partition: &Partition) -> Result<u32> {
    match (cli.partition_size, &cli.partition_table) {
        (Some(size), _) => Ok(size),
        (None, Some(_)) => Ok(partition.size),
        (None, None) => parse_size(DEFAULT_IMAGE_SIZE),
    }
}

/// Build the job description for one run
pub fn build_job(cli: &Cli) -> Result<FlashJob> {
    let partition = resolve_partition(cli)?;
    let image_size = resolve_image_size(cli, &partition)?;

    Ok(FlashJob {
        port: cli.port.clone(),
        source_dir: cli.gif_dir.clone(),
        extension: cli.extension.clone(),
        image_size,
        partition,
        baud: cli.baud,
        keep_image: cli.keep_image,
        temp_dir: None,
        interrupt: Interrupt::new(),
    })
}

fn overrides(cli: &Cli) -> ToolOverrides {
    ToolOverrides {
        idf_path: cli.idf_path.clone(),
        python: cli.python.clone(),
        spiffsgen: cli.spiffsgen.clone(),
        esptool: cli.esptool.clone(),
    }
}

/// Route Ctrl-C to the job's interrupt; exit directly when it is not armed
fn install_interrupt_handler(interrupt: &Interrupt) -> Result<()> {
    let handler = interrupt.clone();
    ctrlc::set_handler(move || {
        if !handler.signal() {
            std::process::exit(EXIT_INTERRUPTED);
        }
        log::debug!("Interrupt received, waiting for the running tool to exit");
    })
    .map_err(|e| Error::Io(io::Error::other(e)))
}

fn locate_tools(cli: &Cli) -> Result<Collaborators> {
    let tools = Toolchain::discover(&overrides(cli), &Environment::from_process())?;
    Ok(Collaborators {
        builder: tools.image_builder(),
        writer: tools.device_writer().with_chip(cli.chip.clone()),
    })
}

/// Run the flash command
pub fn run_flash(cli: &Cli) -> Result<()> {
    let job = build_job(cli)?;
    install_interrupt_handler(&job.interrupt)?;

    let mut progress = ConsoleProgress::new(cli.extension.to_uppercase());
    let report = pipeline::run(
        &job,
        || locate_tools(cli),
        &mut SystemRunner,
        &mut StdinConfirm,
        &mut progress,
    )?;

    print_success(&report);
    Ok(())
}

fn print_success(report: &FlashReport) {
    if let Some(path) = &report.kept_image {
        println!("\nSPIFFS image saved to: {}", path.display());
    }

    println!("\n{}", "=".repeat(60));
    println!(
        "SUCCESS! {} files have been flashed to partition '{}'",
        report.files.len(),
        report.partition.name
    );
    println!("{}", "=".repeat(60));
    println!("\nYou can now use these GIFs in your code:");
    for file in &report.files {
        println!("  app.ShowGifFromFlash(\"{}\", 0, 0);", file.name);
    }
    println!();
}
