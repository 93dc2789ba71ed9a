//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod diagnose;
mod project;
mod sample;

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::config::{
    load_config, merge_cli_overrides, CliOverrides, ConfigValidationError, SphereConfig,
};
use crate::layout::LayoutRegistry;
use crate::output::write_output;
use crate::projection::ProjectionStrategy;

/// Process exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// sphm - Map equirectangular panoramas onto sphere-mounted light elements
#[derive(Parser)]
#[command(name = "sphm")]
#[command(about = "sphm - Project sphere layouts onto panorama textures and check feature coverage")]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: spheremap.toml found from the working directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Show debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Texture settings shared by every layout command
#[derive(Args, Debug, Clone, Default)]
pub struct TextureArgs {
    /// Projection strategy
    #[arg(long, value_enum)]
    pub strategy: Option<ProjectionStrategy>,

    /// Texture width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Texture height in pixels
    #[arg(long)]
    pub height: Option<u32>,
}

impl TextureArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            width: self.width,
            height: self.height,
            strategy: self.strategy,
            sequential: None,
        }
    }
}

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Json,
    Csv,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Project every element of a layout to texture coordinates and pixels
    Project {
        /// Layout CSV
        layout: PathBuf,

        #[command(flatten)]
        texture: TextureArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report pixel collisions and meridian clusters
    Collisions {
        /// Layout CSV
        layout: PathBuf,

        #[command(flatten)]
        texture: TextureArgs,

        /// Output format (text or json)
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that feature bands cover every element belonging to them
    ///
    /// Exits with 1 when any feature leaves elements outside its band.
    Coverage {
        /// Layout CSV
        layout: PathBuf,

        #[command(flatten)]
        texture: TextureArgs,

        /// Only check the configured feature with this name (repeatable)
        #[arg(long = "feature", value_name = "NAME")]
        features: Vec<String>,

        /// Check an ad-hoc feature at this longitude in degrees
        #[arg(long, allow_hyphen_values = true, value_name = "DEG")]
        longitude: Option<f64>,

        /// Painted band of the ad-hoc feature (e.g. 74:85)
        #[arg(long, value_name = "START:END", requires = "longitude")]
        band: Option<String>,

        /// Membership tolerance of the ad-hoc feature in degrees
        #[arg(long, value_name = "DEG", requires = "longitude")]
        tolerance: Option<f64>,

        /// Output format (text or json)
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare the fast projection against the exact one
    ///
    /// Exits with 1 when any element deviates by the approximation bound or more.
    Compare {
        /// Layout CSV
        layout: PathBuf,

        /// Texture width in pixels
        #[arg(long)]
        width: Option<u32>,

        /// Texture height in pixels
        #[arg(long)]
        height: Option<u32>,

        /// Output format (text or json)
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compute the color of every element for one panorama frame
    Sample {
        /// Layout CSV
        layout: PathBuf,

        /// Panorama image (PNG, JPEG, ...)
        frame: PathBuf,

        /// Projection strategy
        #[arg(long, value_enum)]
        strategy: Option<ProjectionStrategy>,

        /// Group colors per strip, ordered by strip index (json only)
        #[arg(long)]
        strips: bool,

        /// Evaluate elements on one thread
        #[arg(long)]
        sequential: bool,

        /// Output format (json or csv)
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Paint every configured feature band onto a black test panorama
    Pattern {
        /// Output PNG
        #[arg(short, long)]
        output: PathBuf,

        /// Texture width in pixels
        #[arg(long)]
        width: Option<u32>,

        /// Texture height in pixels
        #[arg(long)]
        height: Option<u32>,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .try_init();
}

/// Load `spheremap.toml` (explicit or discovered) and apply CLI overrides.
pub(crate) fn resolve_config(
    path: Option<&Path>,
    overrides: &CliOverrides,
) -> Result<SphereConfig, ExitCode> {
    load_config(path).and_then(|config| merge_cli_overrides(config, overrides)).map_err(|e| {
        eprintln!("Error: {}", e);
        ExitCode::from(EXIT_INVALID_ARGS)
    })
}

/// Print validation errors and fail with the invalid-arguments code.
pub(crate) fn require_valid(errors: Vec<ConfigValidationError>) -> Result<(), ExitCode> {
    if errors.is_empty() {
        return Ok(());
    }
    for error in errors {
        eprintln!("Error: {}", error);
    }
    Err(ExitCode::from(EXIT_INVALID_ARGS))
}

/// Load a layout, reporting fatal problems on stderr.
///
/// Skipped rows are reported through the logger as they are read.
pub(crate) fn load_registry(path: &Path) -> Result<LayoutRegistry, ExitCode> {
    LayoutRegistry::open(path).map_err(|e| {
        eprintln!("Error: Cannot load layout '{}': {}", path.display(), e);
        ExitCode::from(EXIT_INVALID_ARGS)
    })
}

/// Write command output to a file or stdout.
pub(crate) fn emit(output: Option<&Path>, contents: &str) -> Result<(), ExitCode> {
    write_output(output, contents).map_err(|e| {
        eprintln!("Error: {}", e);
        ExitCode::from(EXIT_ERROR)
    })
}

/// Collapse a command result into its exit code.
pub(crate) fn finish(result: Result<ExitCode, ExitCode>) -> ExitCode {
    result.unwrap_or_else(|code| code)
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Project { layout, texture, format, output } => {
            project::run_project(config, &layout, &texture, format, output.as_deref())
        }
        Commands::Collisions { layout, texture, format, output } => {
            diagnose::run_collisions(config, &layout, &texture, format, output.as_deref())
        }
        Commands::Coverage {
            layout,
            texture,
            features,
            longitude,
            band,
            tolerance,
            format,
            output,
        } => diagnose::run_coverage(
            config,
            &layout,
            &texture,
            &features,
            longitude.map(|longitude| diagnose::AdHocFeature { longitude, band, tolerance }),
            format,
            output.as_deref(),
        ),
        Commands::Compare { layout, width, height, format, output } => {
            let texture = TextureArgs { strategy: None, width, height };
            diagnose::run_compare(config, &layout, &texture, format, output.as_deref())
        }
        Commands::Sample { layout, frame, strategy, strips, sequential, format, output } => {
            let overrides = CliOverrides {
                width: None,
                height: None,
                strategy,
                sequential: sequential.then_some(true),
            };
            sample::run_sample(config, &layout, &frame, &overrides, strips, format, output.as_deref())
        }
        Commands::Pattern { output, width, height } => {
            let texture = TextureArgs { strategy: None, width, height };
            sample::run_pattern(config, &texture, &output)
        }
    }
}
