mod pipeline;
mod receipt;

use anyhow::{anyhow, Result};
use chrono::{SecondsFormat, Utc};
use clap::{Parser, ValueEnum};
use osprey::{DeviceKind, ImageKind, Library, LibraryConfig, LogOutput, Size};
use osprey_scene::SceneFile;
use pipeline::{run_tutorial, TutorialOptions};
use receipt::{write_json, ArgsSummary, HostInfo, RunReceipt};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "osp-tutorial",
    version,
    about = "Ray-trace a triangle mesh and accumulate samples into an image",
    after_help = "Library flags (--osp:debug, --osp:numthreads N, --osp:loglevel N, ...) are accepted anywhere on the command line."
)]
struct Cli {
    /// Image width; defaults to the scene's.
    #[arg(long)]
    width: Option<u32>,

    /// Image height; defaults to the scene's.
    #[arg(long)]
    height: Option<u32>,

    /// Frames accumulated after the first one.
    #[arg(long, default_value_t = 10)]
    frames: u32,

    /// Renderer type; defaults to the scene's.
    #[arg(long)]
    renderer: Option<String>,

    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = Format::Png)]
    format: Format,

    /// Scene description (JSON); the built-in tutorial scene when omitted.
    #[arg(long)]
    scene: Option<PathBuf>,

    #[arg(long, value_enum)]
    device: Option<Device>,

    /// Write a run receipt (inputs, outputs, timings) to this path.
    #[arg(long)]
    receipt: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Png,
    Ppm,
}

#[derive(Clone, Copy, ValueEnum)]
enum Device {
    Reference,
    Native,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let started_at_utc = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

    let (mut config, rest) = LibraryConfig::from_args(std::env::args())?;
    init_logging(&config);
    let cli = Cli::parse_from(rest);

    if let Some(device) = cli.device {
        config.device = match device {
            Device::Reference => DeviceKind::Reference,
            Device::Native => DeviceKind::Native,
        };
    }

    let scene = match &cli.scene {
        Some(path) => SceneFile::load(path)
            .map_err(|err| anyhow!("failed to load scene {:?}: {}", path, err))?,
        None => SceneFile::tutorial(),
    };

    let size = Size::new(
        cli.width.unwrap_or(scene.image.width),
        cli.height.unwrap_or(scene.image.height),
    );
    if size.width == 0 || size.height == 0 {
        return Err(anyhow!("image size must be non-zero, got {size}"));
    }

    let opts = TutorialOptions {
        size,
        frames: cli.frames,
        renderer: cli.renderer.clone().unwrap_or_else(|| scene.renderer.kind.clone()),
        out_dir: cli.out_dir.clone(),
        image: match cli.format {
            Format::Png => ImageKind::Png,
            Format::Ppm => ImageKind::Ppm,
        },
    };

    let library_flags = config.flags.clone();
    let lib = Library::with_config(config)?;
    let device = lib.device_name().to_string();
    let summary = run_tutorial(&lib, &scene, &opts)?;

    let report = lib.shutdown();
    if report.leaked_objects > 0 {
        log::warn!("{} objects were still alive at shutdown", report.leaked_objects);
    }

    if let Some(path) = &cli.receipt {
        let receipt = RunReceipt {
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at_utc,
            finished_at_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            args: ArgsSummary {
                width: size.width,
                height: size.height,
                frames: cli.frames,
                renderer: opts.renderer.clone(),
                format: match opts.image {
                    ImageKind::Png => "png".to_string(),
                    ImageKind::Ppm => "ppm".to_string(),
                },
                scene: cli.scene.clone(),
                device,
                library_flags,
            },
            summary,
            host: HostInfo::current(),
        };
        write_json(path, &receipt)?;
        log::info!("wrote receipt {}", path.display());
    }

    Ok(())
}

fn init_logging(config: &LibraryConfig) {
    let target = match config.log_output {
        LogOutput::Stdout => env_logger::Target::Stdout,
        LogOutput::Stderr => env_logger::Target::Stderr,
    };
    // Progress lines are info; --osp:verbose and friends only raise the level.
    let level = config.log_level_filter().max(log::LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(level)
        .target(target)
        .parse_default_env()
        .init();
}
