use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use tracing_subscriber::EnvFilter;
use wallcrop::batch::{BatchOrchestrator, CancelToken};
use wallcrop::config::{self, ProcessingConfig};
use wallcrop::geometry::{AspectKey, Corner, CropRect, Direction, DragMode, NudgeStep};
use wallcrop::imaging::{
    Capabilities, ChromaSubsampling, ExportSettings, LogoBasis, LogoMargin, LogoPosition,
    LogoSettings, OutputFormat, PngCompression, Quality, RustBackend,
};
use wallcrop::output;
use wallcrop::ratios::{self, ConfigError};
use wallcrop::session::{Session, SessionError};

/// Shared flags for commands that read a folder of images.
#[derive(clap::Args, Clone)]
struct InputArgs {
    /// Folder of source images
    input: PathBuf,

    /// Include images in subfolders (mirrored under each target folder)
    #[arg(short, long)]
    recursive: bool,
}

#[derive(Parser)]
#[command(name = "wallcrop")]
#[command(version, about = "Batch wallpaper cropper")]
#[command(long_about = "\
Batch wallpaper cropper

Every image gets one crop per configured aspect ratio. Each ratio group
exports that crop to one or more target resolutions, each into its own
folder:

  output/
  ├── Ratio 16x9/
  │   ├── beach.png              # 3840x2160
  │   └── beach-01.png           # a second beach.* never overwrites
  ├── Ratio 16x10/
  │   └── beach.png              # 3840x2400
  └── Ratio 12x5/
      └── trips/2024/            # --recursive mirrors subfolders
          └── harbor.png

Crops default to the largest centered rectangle of each ratio. Edited crops
are remembered by file content, so renamed or moved images keep them.

Application data (ratios.json, crop_cache.json) lives in --config-dir,
$WALLCROP_CONFIG_DIR, or the platform config directory.

Run 'wallcrop ratios defaults' to print the built-in ratio configuration.")]
struct Cli {
    /// Directory holding ratios.json and crop_cache.json
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List images with their current crops
    Scan(InputArgs),
    /// Crop and resize every image to every target
    Export(ExportArgs),
    /// Edit one image's crop for one ratio
    Crop(CropArgs),
    /// Inspect or replace the ratio configuration
    #[command(subcommand)]
    Ratios(RatiosCommand),
}

#[derive(clap::Args)]
struct ExportArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output root; target folders are created inside it
    output: PathBuf,

    /// Output format: png or jpeg
    #[arg(long, default_value = "png")]
    format: OutputFormat,

    /// JPEG quality (1-100)
    #[arg(long, default_value_t = 95)]
    quality: u8,

    /// JPEG chroma subsampling: 4:4:4, 4:2:2 or 4:2:0
    #[arg(long, default_value = "4:4:4")]
    subsampling: ChromaSubsampling,

    /// PNG compression level (0-9; 0-3 fast, 4-6 default, 7-9 best)
    #[arg(long, default_value_t = 9, value_parser = clap::value_parser!(u8).range(0..=9))]
    compression: u8,

    /// Maximum export workers (default: cores - 1)
    #[arg(long)]
    workers: Option<usize>,

    /// Logo overlaid on every exported file (PNG or SVG)
    #[arg(long)]
    logo: Option<PathBuf>,

    /// top-left, top-right, bottom-left, bottom-right or center
    #[arg(long, default_value = "top-right", requires = "logo")]
    logo_position: LogoPosition,

    /// Logo width as a percentage of --logo-basis
    #[arg(long, default_value_t = 10.0, requires = "logo")]
    logo_size: f64,

    /// width, height or shorter-side
    #[arg(long, default_value = "width", requires = "logo")]
    logo_basis: LogoBasis,

    /// Margin in pixels [default: 40]
    #[arg(long, requires = "logo", conflicts_with = "logo_margin_ratio")]
    logo_margin: Option<u32>,

    /// Margin as a fraction of the logo height (e.g. 0.75)
    #[arg(long, requires = "logo")]
    logo_margin_ratio: Option<f64>,
}

impl ExportArgs {
    fn settings(&self) -> ExportSettings {
        ExportSettings {
            format: self.format,
            png_compression: PngCompression::new(self.compression),
            jpeg_quality: Quality::new(self.quality),
            jpeg_subsampling: self.subsampling,
            ..Default::default()
        }
    }

    fn logo(&self) -> Option<LogoSettings> {
        let path = self.logo.clone()?;
        let margin = match (self.logo_margin, self.logo_margin_ratio) {
            (Some(px), _) => LogoMargin::Pixels(px),
            (None, Some(ratio)) => LogoMargin::LogoHeightRatio(ratio),
            (None, None) => LogoMargin::default(),
        };
        Some(LogoSettings {
            path,
            position: self.logo_position,
            size_percent: self.logo_size,
            basis: self.logo_basis,
            margin,
        })
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CornerArg {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl From<CornerArg> for Corner {
    fn from(arg: CornerArg) -> Self {
        match arg {
            CornerArg::TopLeft => Corner::TopLeft,
            CornerArg::TopRight => Corner::TopRight,
            CornerArg::BottomLeft => Corner::BottomLeft,
            CornerArg::BottomRight => Corner::BottomRight,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    Left,
    Right,
    Up,
    Down,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Left => Direction::Left,
            DirectionArg::Right => Direction::Right,
            DirectionArg::Up => Direction::Up,
            DirectionArg::Down => Direction::Down,
        }
    }
}

#[derive(clap::Args)]
#[command(group(clap::ArgGroup::new("edit").required(true).args(["rect", "auto", "nudge", "drag", "move_by"])))]
struct CropArgs {
    /// Image to edit
    image: PathBuf,

    /// Ratio whose crop is edited, e.g. 16:9
    #[arg(long, value_parser = parse_aspect)]
    ratio: AspectKey,

    /// Set the crop to X,Y,W,H (clamped to the image)
    #[arg(long, value_parser = parse_rect)]
    rect: Option<CropRect>,

    /// Reset to the largest centered crop
    #[arg(long)]
    auto: bool,

    /// Nudge by 1px (10px with --large)
    #[arg(long)]
    nudge: Option<DirectionArg>,

    #[arg(long, requires = "nudge")]
    large: bool,

    /// Drag a corner handle to --to, keeping the aspect ratio
    #[arg(long, requires = "to")]
    drag: Option<CornerArg>,

    /// Pointer position X,Y in image pixels
    #[arg(long, value_parser = parse_point, requires = "drag")]
    to: Option<(f64, f64)>,

    /// Move the crop by DX,DY
    #[arg(long = "move", value_parser = parse_point, allow_hyphen_values = true)]
    move_by: Option<(f64, f64)>,
}

#[derive(Subcommand)]
enum RatiosCommand {
    /// Print the active ratio configuration
    Show,
    /// Validate a ratio file and list every problem
    Check { file: PathBuf },
    /// Validate and install a ratio file
    Set { file: PathBuf },
    /// Print the built-in default configuration
    Defaults,
}

fn parse_aspect(s: &str) -> Result<AspectKey, String> {
    AspectKey::parse(s).ok_or_else(|| format!("'{s}' is not a ratio like 16:9"))
}

fn parse_numbers<const N: usize>(s: &str) -> Option<[f64; N]> {
    let values: Vec<f64> = s
        .split(',')
        .map(|part| part.trim().parse().ok())
        .collect::<Option<_>>()?;
    values.try_into().ok()
}

fn parse_rect(s: &str) -> Result<CropRect, String> {
    let err = || format!("'{s}' is not X,Y,W,H");
    let [x, y, w, h] = parse_numbers::<4>(s).ok_or_else(err)?;
    if [x, y, w, h].iter().any(|v| *v < 0.0 || v.fract() != 0.0) {
        return Err(err());
    }
    Ok(CropRect::new(x as u32, y as u32, w as u32, h as u32))
}

fn parse_point(s: &str) -> Result<(f64, f64), String> {
    let [x, y] = parse_numbers::<2>(s).ok_or_else(|| format!("'{s}' is not X,Y"))?;
    Ok((x, y))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config_dir = config::resolve_config_dir(cli.config_dir.as_deref())?;

    match cli.command {
        Command::Scan(args) => {
            let backend = RustBackend::new(Capabilities::probe());
            let mut session = Session::open(&config_dir);
            let stats = session.scan(&backend, &args.input, args.recursive)?;
            output::print_scan_output(session.images(), session.ratios(), &stats);
            session.close();
        }
        Command::Export(args) => run_export(&config_dir, &args)?,
        Command::Crop(args) => run_crop(&config_dir, &args)?,
        Command::Ratios(command) => run_ratios(&config_dir, command)?,
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise info, or debug with `--verbose`. Logs go to
/// stderr so stdout stays a clean report.
fn init_logging(verbose: bool) {
    let default = if verbose { "wallcrop=debug" } else { "wallcrop=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_export(config_dir: &Path, args: &ExportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let backend = RustBackend::new(Capabilities::probe());
    let mut session = Session::open(config_dir);
    let stats = session.scan(&backend, &args.input.input, args.input.recursive)?;
    println!("Crops: {stats}");

    let jobs = session.build_jobs(&args.output, &args.settings(), args.logo().as_ref());
    let workers = config::effective_workers(&ProcessingConfig {
        max_workers: args.workers,
    });

    let (tx, rx) = mpsc::channel();
    let output_root = args.output.clone();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_batch_event(&event, &output_root) {
                println!("{}", line);
            }
        }
    });

    let orchestrator = BatchOrchestrator::new(workers).with_events(tx);
    let summary = orchestrator.run(&backend, &jobs, &CancelToken::new(), |report| {
        session.apply_report(report)
    })?;
    // Closes the event channel so the printer can finish
    drop(orchestrator);
    if printer.join().is_err() {
        tracing::error!("progress printer panicked");
    }

    println!();
    output::print_batch_summary(&summary);
    session.close();

    if summary.failed() > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn run_crop(config_dir: &Path, args: &CropArgs) -> Result<(), Box<dyn std::error::Error>> {
    let folder = match args.image.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let backend = RustBackend::new(Capabilities::probe());
    let mut session = Session::open(config_dir);
    session.scan(&backend, &folder, false)?;

    let index = session
        .images()
        .iter()
        .position(|img| img.path.file_name() == args.image.file_name())
        .ok_or_else(|| format!("{} is not a readable image", args.image.display()))?;
    let key = args.ratio;
    let current = session.crop(index, key)?;

    let rect = if let Some(rect) = args.rect {
        session.set_crop(index, key, rect)?
    } else if args.auto {
        session.auto_center(index, key)?
    } else if let Some(direction) = args.nudge {
        let step = if args.large {
            NudgeStep::Large
        } else {
            NudgeStep::Small
        };
        session.nudge(index, key, direction.into(), step)?
    } else if let (Some(corner), Some(to)) = (args.drag, args.to) {
        let corner = Corner::from(corner);
        let (hx, hy) = handle_position(corner, current);
        session.drag(index, key, DragMode::Resize(corner), current, (hx, hy), to)?
    } else if let Some(delta) = args.move_by {
        session.drag(index, key, DragMode::Move, current, (0.0, 0.0), delta)?
    } else {
        current
    };

    let image = session.image(index)?;
    for line in output::format_crop_result(index + 1, image, key, rect) {
        println!("{}", line);
    }
    session.close();
    Ok(())
}

/// Where the dragged handle sits before the drag starts.
fn handle_position(corner: Corner, rect: CropRect) -> (f64, f64) {
    let (left, top) = (rect.x as f64, rect.y as f64);
    let (right, bottom) = ((rect.x + rect.w) as f64, (rect.y + rect.h) as f64);
    match corner {
        Corner::TopLeft => (left, top),
        Corner::TopRight => (right, top),
        Corner::BottomLeft => (left, bottom),
        Corner::BottomRight => (right, bottom),
    }
}

fn run_ratios(config_dir: &Path, command: RatiosCommand) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        RatiosCommand::Show => {
            let session = Session::open(config_dir);
            println!("{}", ratios::RatioStore::new(config_dir).path().display());
            output::print_ratios(session.ratios());
        }
        RatiosCommand::Check { file } => {
            let groups = ratios::from_envelope_json(&std::fs::read_to_string(&file)?)
                .map_err(exit_on_invalid)?;
            let issues = ratios::validate(&groups);
            if !issues.is_empty() {
                output::print_config_issues(&issues);
                std::process::exit(1);
            }
            output::print_ratios(&groups);
            println!("{} is valid", file.display());
        }
        RatiosCommand::Set { file } => {
            let groups = ratios::from_envelope_json(&std::fs::read_to_string(&file)?)
                .map_err(exit_on_invalid)?;
            let mut session = Session::open(config_dir);
            match session.replace_ratios(groups) {
                Ok(()) => output::print_ratios(session.ratios()),
                Err(SessionError::Config(e)) => return Err(exit_on_invalid(e).into()),
                Err(e) => return Err(e.into()),
            }
            session.close();
        }
        RatiosCommand::Defaults => {
            println!("{}", ratios::to_envelope_json(&ratios::default_ratios())?);
        }
    }
    Ok(())
}

/// Print every validation issue and exit; other config errors pass through.
fn exit_on_invalid(err: ConfigError) -> ConfigError {
    if let ConfigError::Invalid(issues) = &err {
        output::print_config_issues(issues);
        std::process::exit(1);
    }
    err
}
