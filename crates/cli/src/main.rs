// parcelmerge CLI - merge parcel owners from a CSV into a cadastral GeoJSON

mod exit_codes;
mod merge;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "parcelmerge")]
#[command(about = "Attach owner names from a CSV to the matching parcels of a GeoJSON")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// More output (debug logging)
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only warnings and errors
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge owners into the GeoJSON and write the reports
    #[command(after_help = "\
Examples:
  parcelmerge run merge.toml
  parcelmerge run merge.toml --yes --json
  parcelmerge run --input-csv owners.csv --input-geojson parcels.geojson \\
      --output-geojson parcels_enriched.geojson --csv-separator ';'")]
    Run(merge::RunArgs),

    /// Parse and validate a config file without running
    #[command(after_help = "\
Examples:
  parcelmerge validate merge.toml")]
    Validate {
        /// Path to the TOML config file
        config: std::path::PathBuf,
    },
}

fn init_logging(verbose: bool, quiet: bool) {
    let default_filter = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  parcelmerge-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  parcelmerge-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Run(args) => merge::cmd_run(args),
        Commands::Validate { config } => merge::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    /// Create error from an engine error with the matching exit code.
    pub fn merge(err: parcelmerge_recon::MergeError) -> Self {
        let code = exit_codes::merge_exit_code(&err);
        let hint = match &err {
            parcelmerge_recon::MergeError::MissingPath(name) => {
                Some(format!("set [paths].{name} in the config file or pass --{}", name.replace('_', "-")))
            }
            parcelmerge_recon::MergeError::MissingColumn { .. } => {
                Some("check id_csv_column / owner_csv_column and the CSV separator".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
