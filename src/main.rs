use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use trapframes::{DecodePolicy, LoadProgress, LoadStage, MaskedStack, SessionBuilder, SessionConfig};

#[derive(Parser)]
#[command(name = "trapframes")]
#[command(version, about = "Load triplet exposure frames and mask them around traps", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a directory and print masked statistics for each stack
    Summary {
        #[command(flatten)]
        source: SourceArgs,

        /// Trap ids to mask (comma separated); defaults to the central trap
        #[arg(long, value_name = "IDS", value_delimiter = ',')]
        traps: Vec<i64>,

        /// Mask every trap in the registry
        #[arg(long, conflicts_with = "traps")]
        all_traps: bool,

        /// Half-width of the square around each trap, in pixels
        #[arg(long, value_name = "PIXELS")]
        radius: Option<f64>,

        /// Fail instead of skipping frames that cannot be decoded
        #[arg(long)]
        fail_on_decode_error: bool,

        /// Decode frames on a single thread
        #[arg(long)]
        sequential: bool,
    },

    /// List the files selected for an exposure time, in load order
    Catalog {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print the trap positions of a directory
    Traps {
        /// Acquisition directory
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Session config file (JSON)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Acquisition directory
    #[arg(value_name = "DIR")]
    dir: PathBuf,

    /// Session config file (JSON)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Exposure time to select, in milliseconds
    #[arg(short, long, value_name = "MS")]
    exposure_ms: Option<f64>,

    /// File name pattern
    #[arg(short, long, value_name = "GLOB")]
    pattern: Option<String>,
}

impl SourceArgs {
    fn session_config(&self) -> Result<SessionConfig> {
        let mut config = load_config(self.config.as_deref())?;
        if let Some(exposure_ms) = self.exposure_ms {
            config = config.with_exposure_time_ms(exposure_ms);
        }
        if let Some(pattern) = &self.pattern {
            config = config.with_pattern(pattern.clone());
        }
        Ok(config)
    }
}

fn load_config(path: Option<&Path>) -> Result<SessionConfig> {
    match path {
        Some(path) => SessionConfig::load(path).context("loading session config"),
        None => Ok(SessionConfig::default()),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Commands::Summary {
            source,
            traps,
            all_traps,
            radius,
            fail_on_decode_error,
            sequential,
        } => {
            let mut config = source.session_config()?.with_parallel(!sequential);
            if fail_on_decode_error {
                config = config.with_decode_policy(DecodePolicy::Abort);
            }
            summary(&source.dir, config, &traps, all_traps, radius)
        }
        Commands::Catalog { source } => catalog(&source.dir, source.session_config()?),
        Commands::Traps { dir, config } => traps(&dir, load_config(config.as_deref())?),
    }
}

fn summary(
    dir: &Path,
    config: SessionConfig,
    trap_ids: &[i64],
    all_traps: bool,
    radius: Option<f64>,
) -> Result<()> {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("#>-"),
    );
    bar.set_message("decoding frames");

    let sink = bar.clone();
    let loaded = SessionBuilder::new(config)
        .with_progress(move |p| advance(&sink, p))
        .load(dir);
    bar.finish_and_clear();
    let session = loaded.with_context(|| format!("loading session from {}", dir.display()))?;

    let masked = if all_traps {
        session.mask_all_traps(radius)?
    } else {
        session.rebuild_mask(trap_ids, radius)?
    };

    let (height, width) = session.frame_shape();
    println!("Directory:    {}", dir.display());
    println!("Exposure:     {} ms", session.config().exposure_time_ms);
    println!("Frame size:   {width}x{height}");
    println!(
        "Traps:        {} (radius {})",
        format_ids(masked.trap_ids()),
        masked.radius()
    );
    println!(
        "Mask:         {} of {} pixels per frame",
        masked.all().selected_pixels_per_frame(),
        width * height
    );
    println!();
    println!("{:<8} {:>7} {:>12}", "stack", "frames", "masked mean");
    print_stack("all", &masked.all());
    print_stack("first", &masked.first());
    print_stack("second", &masked.second());
    print_stack("third", &masked.third());
    Ok(())
}

fn advance(bar: &ProgressBar, progress: LoadProgress) {
    match progress.stage {
        LoadStage::Decoding => {
            bar.set_length(progress.total as u64);
            // parallel decodes report out of order
            bar.inc(1);
        }
        LoadStage::Stacking => bar.set_message("stacking"),
    }
}

fn print_stack(label: &str, stack: &MaskedStack<'_>) {
    let mean = stack
        .mean()
        .map(|m| format!("{m:.3}"))
        .unwrap_or_else(|| "-".to_string());
    println!("{label:<8} {:>7} {mean:>12}", stack.frame_count());
}

fn catalog(dir: &Path, config: SessionConfig) -> Result<()> {
    let frames = SessionBuilder::new(config)
        .catalog(dir)
        .with_context(|| format!("listing {}", dir.display()))?;
    println!("{:>8} {:>8} {:>9} {:<8} file", "sequence", "index", "exposure", "role");
    for frame in &frames {
        println!(
            "{:>8} {:>8} {:>9.1} {:<8} {}",
            frame.sequence,
            frame.index,
            frame.exposure_ms,
            frame.role.to_string(),
            frame.name
        );
    }
    println!("{} frames", frames.len());
    Ok(())
}

fn traps(dir: &Path, config: SessionConfig) -> Result<()> {
    let path = dir.join(&config.trap_file_name);
    let registry = trapframes::data::loader::load_trap_registry(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    println!("{:>6} {:>10} {:>10}", "id", "x", "y");
    for (id, pos) in registry.iter() {
        println!("{id:>6} {:>10.3} {:>10.3}", pos.x, pos.y);
    }
    println!("{} traps", registry.len());
    Ok(())
}

fn format_ids(ids: &[i64]) -> String {
    if ids.len() > 8 {
        return format!("{} traps", ids.len());
    }
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
