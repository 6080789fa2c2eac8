//! The flash pipeline
//!
//! A run goes `Start → Validated → ImageBuilt → Flashed → Done`. Any stage
//! failing ends the run with its error; nothing is retried.
//!
//! The console is reached only through [`Confirm`] and [`FlashProgress`],
//! and external tools only through [`CommandRunner`].

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use gifflash_core::files::FileSet;
use gifflash_core::partition::{Partition, SECTOR_SIZE};
use gifflash_core::{Error, Result};
use tempfile::TempPath;

use crate::esptool::DeviceWriter;
use crate::interrupt::Interrupt;
use crate::runner::CommandRunner;
use crate::spiffs::ImageBuilder;

/// Asks the user a yes/no question
pub trait Confirm {
    /// Return `true` to continue
    fn confirm(&mut self, question: &str) -> io::Result<bool>;
}

/// Stage notifications for console reporting
///
/// All methods default to doing nothing.
pub trait FlashProgress {
    /// Source files have been enumerated
    fn files_found(&mut self, _files: &FileSet) {}

    /// Files exceed the image size; a confirmation follows
    fn oversize(&mut self, _total: u64, _image_size: u32) {}

    /// Image generation is starting
    fn building(&mut self, _source_dir: &Path, _image: &Path, _image_size: u32) {}

    /// Image generation has ended, successfully or not
    fn built(&mut self, _ok: bool) {}

    /// Flashing is starting
    fn flashing(&mut self, _port: &str, _offset: u32, _baud: u32) {}

    /// Flashing has ended, successfully or not
    fn flashed(&mut self, _ok: bool) {}
}

/// Progress reporter that reports nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl FlashProgress for NoProgress {}

/// Everything one run needs to know
#[derive(Debug, Clone)]
pub struct FlashJob {
    /// Serial port of the device
    pub port: String,
    /// Directory holding the files to package
    pub source_dir: PathBuf,
    /// Extension of files to package, without the dot
    pub extension: String,
    /// Size of the generated image in bytes
    pub image_size: u32,
    /// Target partition; its offset is where the image is written
    pub partition: Partition,
    /// Serial baud rate
    pub baud: u32,
    /// Keep the generated image after the run
    pub keep_image: bool,
    /// Directory for the temporary image, system default if `None`
    pub temp_dir: Option<PathBuf>,
    /// Ctrl-C state, armed while the image file exists
    pub interrupt: Interrupt,
}

/// Outcome of a successful run
#[derive(Debug)]
pub struct FlashReport {
    /// Files that were packaged
    pub files: FileSet,
    /// Partition the image was written to
    pub partition: Partition,
    /// Baud rate used
    pub baud: u32,
    /// Where the image was kept, if requested
    pub kept_image: Option<PathBuf>,
}

/// The two external tools a run drives
#[derive(Debug, Clone)]
pub struct Collaborators {
    /// Image generation (spiffsgen)
    pub builder: ImageBuilder,
    /// Device writing (esptool)
    pub writer: DeviceWriter,
}

/// Position in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Nothing done yet
    Start,
    /// Inputs validated and confirmed
    Validated,
    /// Image generated
    ImageBuilt,
    /// Image written to the device
    Flashed,
    /// Run complete
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::Validated => "validated",
            Stage::ImageBuilt => "image built",
            Stage::Flashed => "flashed",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// The temporary image, removed on drop unless kept
enum ImageFile {
    Scoped(TempPath),
    Kept(PathBuf),
}

impl ImageFile {
    fn create(keep: bool, dir: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("gifflash-").suffix(".bin");
        let file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        // Close our handle; spiffsgen opens the path itself
        let path = file.into_temp_path();
        if keep {
            let kept = path.keep().map_err(|e| e.error)?;
            Ok(ImageFile::Kept(kept))
        } else {
            Ok(ImageFile::Scoped(path))
        }
    }

    fn path(&self) -> &Path {
        match self {
            ImageFile::Scoped(p) => &**p,
            ImageFile::Kept(p) => p,
        }
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    log::debug!("Pipeline: {} -> {}", stage, next);
    *stage = next;
}

/// Log problems that the tools will not catch, or will catch late
fn warn_preflight(job: &FlashJob, files: &FileSet, builder: &ImageBuilder) {
    let name_len = builder.params().obj_name_len;
    for file in files.names_too_long(name_len) {
        log::warn!(
            "File name '{}' is too long for SPIFFS (max {} characters)",
            file.name,
            name_len.saturating_sub(2)
        );
    }

    if !job.partition.is_aligned(SECTOR_SIZE) {
        log::warn!(
            "Offset 0x{:X} is not aligned to a {} byte flash sector",
            job.partition.offset,
            SECTOR_SIZE
        );
    }

    if job.image_size > job.partition.size {
        log::warn!(
            "Image size ({} bytes) is larger than partition '{}' ({} bytes); \
             data past the partition will be overwritten",
            job.image_size,
            job.partition.name,
            job.partition.size
        );
    }

    if !job.partition.is_spiffs() {
        log::warn!(
            "Partition '{}' has subtype '{}', not spiffs",
            job.partition.name,
            job.partition.subtype.as_deref().unwrap_or("")
        );
    }
}

fn run_stages<T, R, C, P>(
    job: &FlashJob,
    locate: T,
    runner: &mut R,
    confirm: &mut C,
    progress: &mut P,
    stage: &mut Stage,
) -> Result<FlashReport>
where
    T: FnOnce() -> Result<Collaborators>,
    R: CommandRunner + ?Sized,
    C: Confirm + ?Sized,
    P: FlashProgress + ?Sized,
{
    let files = FileSet::scan(&job.source_dir, &job.extension)?;
    progress.files_found(&files);

    let total = files.total_size();
    if total > job.image_size as u64 {
        progress.oversize(total, job.image_size);
        if !confirm.confirm("Continue anyway? (y/n): ")? {
            return Err(Error::Declined);
        }
    }
    advance(stage, Stage::Validated);

    // Tools are only looked for once the input is known to be good
    let Collaborators { builder, writer } = locate()?;
    warn_preflight(job, &files, &builder);

    // Armed before the image exists and disarmed only after it is gone
    let _armed = job.interrupt.arm();
    let image = ImageFile::create(job.keep_image, job.temp_dir.as_deref())?;
    progress.building(&job.source_dir, image.path(), job.image_size);
    let built = builder.build(runner, &job.source_dir, job.image_size, image.path());
    progress.built(built.is_ok() && !job.interrupt.is_raised());
    job.interrupt.check()?;
    built?;
    advance(stage, Stage::ImageBuilt);

    progress.flashing(&job.port, job.partition.offset, job.baud);
    let flashed = writer.write(runner, &job.port, job.baud, job.partition.offset, image.path());
    progress.flashed(flashed.is_ok() && !job.interrupt.is_raised());
    job.interrupt.check()?;
    flashed?;
    advance(stage, Stage::Flashed);

    let kept_image = match image {
        ImageFile::Kept(path) => Some(path),
        ImageFile::Scoped(_) => None,
    };

    Ok(FlashReport {
        files,
        partition: job.partition.clone(),
        baud: job.baud,
        kept_image,
    })
}

/// Validate, build and flash
///
/// `locate` finds the external tools; it is called only after the input
/// has been validated and confirmed. No external tool runs unless the
/// source directory holds at least one matching file, and no image file is
/// created if the user declines the oversize confirmation.
pub fn run<T, R, C, P>(
    job: &FlashJob,
    locate: T,
    runner: &mut R,
    confirm: &mut C,
    progress: &mut P,
) -> Result<FlashReport>
where
    T: FnOnce() -> Result<Collaborators>,
    R: CommandRunner + ?Sized,
    C: Confirm + ?Sized,
    P: FlashProgress + ?Sized,
{
    let mut stage = Stage::Start;
    match run_stages(job, locate, runner, confirm, progress, &mut stage) {
        Ok(report) => {
            advance(&mut stage, Stage::Done);
            Ok(report)
        }
        Err(e) => {
            log::debug!("Pipeline: {} -> failed", stage);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locate::Tool;
    use crate::runner::{ToolCommand, ToolOutput};
    use std::fs;
    use tempfile::{tempdir, TempDir};

    /// Records invocations and exits with preset codes
    #[derive(Default)]
    struct FakeRunner {
        build_code: i32,
        flash_code: i32,
        captured: Vec<ToolCommand>,
        console: Vec<ToolCommand>,
        /// Image paths that existed when each tool ran
        images_seen: Vec<PathBuf>,
        /// Delivered like a Ctrl-C while spiffsgen runs
        interrupt_build: Option<Interrupt>,
        /// Delivered like a Ctrl-C while esptool runs
        interrupt_flash: Option<Interrupt>,
    }

    /// Exit code of a child killed by SIGINT, as reported by a shell
    const SIGINT_EXIT: i32 = 130;

    impl FakeRunner {
        fn image_arg(cmd: &ToolCommand, idx_from_end: usize) -> PathBuf {
            let args = cmd.get_args();
            PathBuf::from(&args[args.len() - 1 - idx_from_end])
        }
    }

    impl CommandRunner for FakeRunner {
        fn output(&mut self, cmd: &ToolCommand) -> io::Result<ToolOutput> {
            // spiffsgen: <script> <size> <dir> <out> + 6 structural args
            let image = Self::image_arg(cmd, 6);
            fs::write(&image, b"spiffs")?;
            self.images_seen.push(image);
            self.captured.push(cmd.clone());
            if let Some(interrupt) = &self.interrupt_build {
                assert!(interrupt.signal(), "interrupt must be armed while building");
                return Ok(ToolOutput {
                    code: Some(SIGINT_EXIT),
                    ..Default::default()
                });
            }
            Ok(ToolOutput {
                code: Some(self.build_code),
                stdout: String::new(),
                stderr: if self.build_code == 0 {
                    String::new()
                } else {
                    "boom".to_string()
                },
            })
        }

        fn status(&mut self, cmd: &ToolCommand) -> io::Result<ToolOutput> {
            let image = Self::image_arg(cmd, 0);
            assert!(image.exists(), "image must exist while flashing");
            self.images_seen.push(image);
            self.console.push(cmd.clone());
            if let Some(interrupt) = &self.interrupt_flash {
                assert!(interrupt.signal(), "interrupt must be armed while flashing");
                return Ok(ToolOutput {
                    code: Some(SIGINT_EXIT),
                    ..Default::default()
                });
            }
            Ok(ToolOutput {
                code: Some(self.flash_code),
                ..Default::default()
            })
        }
    }

    struct Answer {
        yes: bool,
        asked: usize,
    }

    impl Answer {
        fn yes() -> Self {
            Self { yes: true, asked: 0 }
        }

        fn no() -> Self {
            Self { yes: false, asked: 0 }
        }
    }

    impl Confirm for Answer {
        fn confirm(&mut self, _question: &str) -> io::Result<bool> {
            self.asked += 1;
            Ok(self.yes)
        }
    }

    struct Fixture {
        src: TempDir,
        scratch: TempDir,
        builder: ImageBuilder,
        writer: DeviceWriter,
    }

    impl Fixture {
        fn new() -> Self {
            let src = tempdir().unwrap();
            fs::write(src.path().join("a.gif"), vec![0u8; 1000]).unwrap();
            fs::write(src.path().join("b.gif"), vec![0u8; 2000]).unwrap();
            Self {
                src,
                scratch: tempdir().unwrap(),
                builder: ImageBuilder::new("python3".into(), Tool::Script("spiffsgen.py".into())),
                writer: DeviceWriter::new("python3".into(), Tool::Script("esptool.py".into())),
            }
        }

        fn job(&self, image_size: u32, keep_image: bool) -> FlashJob {
            FlashJob {
                port: "/dev/ttyUSB0".to_string(),
                source_dir: self.src.path().to_path_buf(),
                extension: "gif".to_string(),
                image_size,
                partition: Partition::default_storage(),
                baud: crate::esptool::DEFAULT_BAUD,
                keep_image,
                temp_dir: Some(self.scratch.path().to_path_buf()),
                interrupt: Interrupt::new(),
            }
        }

        fn run(
            &self,
            job: &FlashJob,
            runner: &mut FakeRunner,
            confirm: &mut Answer,
        ) -> Result<FlashReport> {
            run(job, || Ok(self.tools()), runner, confirm, &mut NoProgress)
        }

        fn tools(&self) -> Collaborators {
            Collaborators {
                builder: self.builder.clone(),
                writer: self.writer.clone(),
            }
        }

        fn scratch_is_empty(&self) -> bool {
            fs::read_dir(self.scratch.path()).unwrap().next().is_none()
        }
    }

    #[test]
    fn test_end_to_end() {
        let fx = Fixture::new();
        let mut runner = FakeRunner::default();
        let mut confirm = Answer::yes();

        let report = fx.run(&fx.job(1024 * 1024, false), &mut runner, &mut confirm).unwrap();

        assert_eq!(confirm.asked, 0);
        assert_eq!(report.files.len(), 2);
        assert_eq!(report.files.total_size(), 3000);
        assert_eq!(report.partition.offset, 0xA0_0000);
        assert_eq!(report.baud, 460_800);
        assert!(report.kept_image.is_none());

        assert_eq!(runner.captured.len(), 1);
        assert_eq!(runner.console.len(), 1);
        let flash = runner.console[0].to_string();
        assert!(flash.contains("--port /dev/ttyUSB0 --baud 460800 write_flash 0xA00000"));
        let build = runner.captured[0].to_string();
        assert!(build.contains(" 1048576 "));

        // Same image built and flashed, and gone afterwards
        assert_eq!(runner.images_seen[0], runner.images_seen[1]);
        assert!(!runner.images_seen[0].exists());
        assert!(fx.scratch_is_empty());
    }

    #[test]
    fn test_no_files_runs_nothing() {
        let fx = Fixture::new();
        let mut job = fx.job(1024 * 1024, false);
        job.extension = "png".to_string();
        let mut runner = FakeRunner::default();

        let err = fx.run(&job, &mut runner, &mut Answer::yes()).unwrap_err();
        assert!(matches!(err, Error::NoFiles { .. }));
        assert!(runner.captured.is_empty());
        assert!(runner.console.is_empty());
        assert!(fx.scratch_is_empty());
    }

    #[test]
    fn test_missing_dir_runs_nothing() {
        let fx = Fixture::new();
        let mut job = fx.job(1024 * 1024, false);
        job.source_dir = fx.src.path().join("missing");
        let mut runner = FakeRunner::default();

        let err = fx.run(&job, &mut runner, &mut Answer::yes()).unwrap_err();
        assert!(matches!(err, Error::DirectoryNotFound(_)));
        assert!(runner.captured.is_empty());
    }

    #[test]
    fn test_oversize_declined() {
        let fx = Fixture::new();
        let mut runner = FakeRunner::default();
        let mut confirm = Answer::no();

        let err = fx.run(&fx.job(2048, true), &mut runner, &mut confirm).unwrap_err();
        assert!(matches!(err, Error::Declined));
        assert_eq!(confirm.asked, 1);
        assert!(runner.captured.is_empty());
        assert!(runner.console.is_empty());
        // Not even a kept image is created
        assert!(fx.scratch_is_empty());
    }

    #[test]
    fn test_oversize_accepted() {
        let fx = Fixture::new();
        let mut runner = FakeRunner::default();
        let mut confirm = Answer::yes();

        fx.run(&fx.job(2048, false), &mut runner, &mut confirm).unwrap();
        assert_eq!(confirm.asked, 1);
        assert_eq!(runner.console.len(), 1);
    }

    #[test]
    fn test_exact_fit_does_not_ask() {
        let fx = Fixture::new();
        let mut confirm = Answer::no();
        fx.run(&fx.job(3000, false), &mut FakeRunner::default(), &mut confirm)
            .unwrap();
        assert_eq!(confirm.asked, 0);
    }

    #[test]
    fn test_build_failure_skips_flash() {
        let fx = Fixture::new();
        let mut runner = FakeRunner {
            build_code: 1,
            ..Default::default()
        };

        let err = fx
            .run(&fx.job(1024 * 1024, false), &mut runner, &mut Answer::yes())
            .unwrap_err();
        assert!(matches!(err, Error::BuildFailed { ref stderr, .. } if stderr == "boom"));
        assert!(runner.console.is_empty());
        assert!(fx.scratch_is_empty());
    }

    #[test]
    fn test_flash_failure_removes_image() {
        let fx = Fixture::new();
        let mut runner = FakeRunner {
            flash_code: 2,
            ..Default::default()
        };

        let err = fx
            .run(&fx.job(1024 * 1024, false), &mut runner, &mut Answer::yes())
            .unwrap_err();
        assert!(matches!(err, Error::FlashFailed { code: Some(2) }));
        assert!(!runner.images_seen[1].exists());
        assert!(fx.scratch_is_empty());
    }

    #[test]
    fn test_flash_failure_keeps_requested_image() {
        let fx = Fixture::new();
        let mut runner = FakeRunner {
            flash_code: 2,
            ..Default::default()
        };

        let err = fx
            .run(&fx.job(1024 * 1024, true), &mut runner, &mut Answer::yes())
            .unwrap_err();
        assert!(matches!(err, Error::FlashFailed { .. }));
        assert!(runner.images_seen[1].exists());
    }

    #[test]
    fn test_keep_image_reported() {
        let fx = Fixture::new();
        let mut runner = FakeRunner::default();

        let report = fx
            .run(&fx.job(1024 * 1024, true), &mut runner, &mut Answer::yes())
            .unwrap();
        let kept = report.kept_image.unwrap();
        assert_eq!(kept, runner.images_seen[0]);
        assert_eq!(fs::read(&kept).unwrap(), b"spiffs");
        assert!(kept.extension().is_some_and(|e| e == "bin"));
    }

    #[test]
    fn test_custom_offset() {
        let fx = Fixture::new();
        let mut job = fx.job(1024 * 1024, false);
        job.partition = Partition::new("storage", 0xD0_0000, 0x30_0000);
        job.baud = 921_600;
        let mut runner = FakeRunner::default();

        fx.run(&job, &mut runner, &mut Answer::yes()).unwrap();
        let flash = runner.console[0].to_string();
        assert!(flash.contains("--baud 921600 write_flash 0xD00000"));
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::ImageBuilt.to_string(), "image built");
        assert_eq!(Stage::Done.to_string(), "done");
    }

    #[test]
    fn test_interrupt_while_flashing_removes_image() {
        let fx = Fixture::new();
        let job = fx.job(1024 * 1024, false);
        let mut runner = FakeRunner {
            interrupt_flash: Some(job.interrupt.clone()),
            ..Default::default()
        };

        let err = fx.run(&job, &mut runner, &mut Answer::yes()).unwrap_err();
        assert!(matches!(err, Error::Interrupted));
        assert!(!runner.images_seen[1].exists());
        assert!(fx.scratch_is_empty());
        // Disarmed once the run is over
        assert!(!job.interrupt.signal());
    }

    #[test]
    fn test_interrupt_while_building_skips_flash() {
        let fx = Fixture::new();
        let job = fx.job(1024 * 1024, false);
        let mut runner = FakeRunner {
            interrupt_build: Some(job.interrupt.clone()),
            ..Default::default()
        };

        let err = fx.run(&job, &mut runner, &mut Answer::yes()).unwrap_err();
        assert!(matches!(err, Error::Interrupted));
        assert!(runner.console.is_empty());
        assert!(fx.scratch_is_empty());
    }

    #[test]
    fn test_interrupt_keeps_requested_image() {
        let fx = Fixture::new();
        let job = fx.job(1024 * 1024, true);
        let mut runner = FakeRunner {
            interrupt_flash: Some(job.interrupt.clone()),
            ..Default::default()
        };

        let err = fx.run(&job, &mut runner, &mut Answer::yes()).unwrap_err();
        assert!(matches!(err, Error::Interrupted));
        assert!(runner.images_seen[1].exists());
    }

    #[test]
    fn test_interrupt_not_armed_before_validation() {
        let fx = Fixture::new();
        let job = fx.job(2048, false);
        let interrupt = job.interrupt.clone();

        struct SignalOnPrompt(Interrupt);
        impl Confirm for SignalOnPrompt {
            fn confirm(&mut self, _question: &str) -> io::Result<bool> {
                // Not absorbed: the handler would exit the process here
                assert!(!self.0.signal());
                Ok(false)
            }
        }

        let err = run(
            &job,
            || Ok(fx.tools()),
            &mut FakeRunner::default(),
            &mut SignalOnPrompt(interrupt),
            &mut NoProgress,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Declined));
    }

    #[test]
    fn test_input_errors_reported_before_tool_lookup() {
        let fx = Fixture::new();
        let mut job = fx.job(1024 * 1024, false);
        job.source_dir = fx.src.path().join("typo");
        let mut looked_up = false;

        let err = run(
            &job,
            || {
                looked_up = true;
                Err(Error::IdfPathNotSet)
            },
            &mut FakeRunner::default(),
            &mut Answer::yes(),
            &mut NoProgress,
        )
        .unwrap_err();
        assert!(matches!(err, Error::DirectoryNotFound(_)));
        assert!(!looked_up);
    }

    #[test]
    fn test_tool_lookup_failure_creates_no_image() {
        let fx = Fixture::new();
        let mut runner = FakeRunner::default();

        let err = run(
            &fx.job(1024 * 1024, false),
            || Err(Error::IdfPathNotSet),
            &mut runner,
            &mut Answer::yes(),
            &mut NoProgress,
        )
        .unwrap_err();
        assert!(matches!(err, Error::IdfPathNotSet));
        assert!(runner.captured.is_empty());
        assert!(fx.scratch_is_empty());
    }
}
