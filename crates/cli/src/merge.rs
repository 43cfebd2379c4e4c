//! `parcelmerge run` and `parcelmerge validate`.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use clap::Args;

use parcelmerge_io::output::{self, OutputPlan};
use parcelmerge_recon::config::ResolvedPaths;
use parcelmerge_recon::{CsvTable, MergeConfig, MergeRun};

use crate::exit_codes::{EXIT_CANCELLED, EXIT_CONFIG_INVALID, EXIT_INPUT_UNREADABLE, EXIT_WRITE_FAILURE};
use crate::CliError;

#[derive(Args)]
pub struct RunArgs {
    /// TOML config file. Relative paths inside it resolve against its directory.
    pub config: Option<PathBuf>,

    /// Owner CSV
    #[arg(long)]
    pub input_csv: Option<PathBuf>,

    /// Parcel GeoJSON (FeatureCollection)
    #[arg(long)]
    pub input_geojson: Option<PathBuf>,

    /// Destination of the enhanced GeoJSON
    #[arg(long)]
    pub output_geojson: Option<PathBuf>,

    /// Directory for the edited CSV and the reports [default: outputs]
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// CSV column holding the parcel identifier
    #[arg(long)]
    pub id_csv_column: Option<String>,

    /// CSV column holding the owner name(s)
    #[arg(long)]
    pub owner_csv_column: Option<String>,

    /// Feature property holding the parcel identifier
    #[arg(long)]
    pub geojson_id_field: Option<String>,

    /// Property receiving the owner count
    #[arg(long)]
    pub prop_name: Option<String>,

    /// Base name of the per-owner properties (empty string disables them)
    #[arg(long)]
    pub individual_prop_name: Option<String>,

    /// CSV separator: a single character or "tab"
    #[arg(long)]
    pub csv_separator: Option<String>,

    /// Split each owner cell on this string
    #[arg(long)]
    pub owner_delimiter: Option<String>,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Overwrite the enhanced GeoJSON without asking
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Never prompt; an existing enhanced GeoJSON cancels the run
    #[arg(long, conflicts_with = "yes")]
    pub no_input: bool,
}

impl RunArgs {
    fn apply_overrides(&self, config: &mut MergeConfig) {
        let paths = &mut config.paths;
        for (slot, value) in [
            (&mut paths.input_csv, &self.input_csv),
            (&mut paths.input_geojson, &self.input_geojson),
            (&mut paths.output_geojson, &self.output_geojson),
            (&mut paths.output_dir, &self.output_dir),
        ] {
            if let Some(v) = value {
                *slot = Some(v.clone());
            }
        }

        let o = &mut config.options;
        for (slot, value) in [
            (&mut o.id_csv_column, &self.id_csv_column),
            (&mut o.owner_csv_column, &self.owner_csv_column),
            (&mut o.geojson_id_field, &self.geojson_id_field),
            (&mut o.prop_name, &self.prop_name),
            (&mut o.individual_prop_name, &self.individual_prop_name),
            (&mut o.csv_separator, &self.csv_separator),
        ] {
            if let Some(v) = value {
                *slot = v.clone();
            }
        }
        if let Some(d) = &self.owner_delimiter {
            o.owner_delimiter = Some(d.clone());
        }
    }
}

// ============================================================================
// validate
// ============================================================================

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    config.validate().map_err(CliError::merge)?;

    let o = &config.options;
    eprintln!(
        "valid: id column '{}', owner column '{}', feature field '{}', separator {:?}, rule {}",
        o.id_csv_column, o.owner_csv_column, o.geojson_id_field, o.csv_separator, config.normalization,
    );
    if let Err(e) = config.require_paths() {
        eprintln!("note:  {e} (must be given on the command line)");
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<MergeConfig, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::new(EXIT_CONFIG_INVALID, format!("cannot read config {}: {e}", path.display()))
    })?;
    let mut config = MergeConfig::parse_toml(&text).map_err(CliError::merge)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    config.resolve_relative_to(base);
    Ok(config)
}

// ============================================================================
// run
// ============================================================================

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let mut config = match &args.config {
        Some(path) => {
            log::debug!("config: {}", path.display());
            load_config(path)?
        }
        None if args.input_csv.is_none() && args.input_geojson.is_none() => {
            return Err(CliError::args("no config file and no input paths given").with_hint(
                "pass a config file or the --input-csv, --input-geojson and --output-geojson flags",
            ));
        }
        None => MergeConfig::default(),
    };
    args.apply_overrides(&mut config);
    config.validate().map_err(CliError::merge)?;

    let paths = config.require_paths().map_err(CliError::merge)?;
    let delimiter = config.separator().map_err(CliError::merge)?;

    let csv = read_csv(&paths.input_csv, delimiter, &config.options.csv_separator)?;
    log::info!("read {} CSV rows from {}", csv.rows.len(), paths.input_csv.display());

    let document = parcelmerge_io::geojson::read_geojson(&paths.input_geojson).map_err(|e| {
        CliError::new(
            EXIT_INPUT_UNREADABLE,
            format!("cannot read {}: {e}", paths.input_geojson.display()),
        )
    })?;
    log::info!("read {}", paths.input_geojson.display());

    let run = parcelmerge_recon::run(&config, &csv, document).map_err(CliError::merge)?;
    for warning in &run.warnings {
        log::warn!("{warning}");
    }
    log_summary(&run);

    if !confirm_overwrite(&paths.output_geojson, &args)? {
        return Err(CliError::new(EXIT_CANCELLED, "cancelled, nothing was written"));
    }

    let plan = OutputPlan::from_paths(&paths);
    let report = output::write_outputs(&run, &plan, delimiter);
    for failure in &report.failures {
        log::error!("{failure}");
    }

    if args.json {
        print_json(&run, &paths, &report)?;
    }

    if !report.is_complete() {
        return Err(CliError::new(
            EXIT_WRITE_FAILURE,
            format!(
                "{} of {} outputs could not be written",
                report.failures.len(),
                output::OutputKind::ALL.len()
            ),
        ));
    }
    Ok(())
}

/// Read the owner CSV after checking that its header uses the configured separator.
fn read_csv(path: &Path, delimiter: u8, configured: &str) -> Result<CsvTable, CliError> {
    let content = parcelmerge_io::csv::read_file_as_utf8(path).map_err(|e| {
        CliError::new(EXIT_INPUT_UNREADABLE, format!("cannot read {}: {e}", path.display()))
    })?;

    if !parcelmerge_io::csv::separator_in_header(&content, delimiter) {
        let err = CliError::new(
            EXIT_CONFIG_INVALID,
            format!("separator {configured:?} not found in the header of {}", path.display()),
        );
        return Err(match parcelmerge_io::csv::sniff_delimiter(&content) {
            Some(found) => err.with_hint(format!(
                "the file looks {}-separated; use --csv-separator '{}'",
                parcelmerge_io::csv::separator_name(found),
                parcelmerge_io::csv::separator_name(found),
            )),
            None => err,
        });
    }

    CsvTable::parse(&content, delimiter).map_err(CliError::merge)
}

/// True if writing may proceed.
fn confirm_overwrite(path: &Path, args: &RunArgs) -> Result<bool, CliError> {
    if args.yes || !output::would_overwrite(path) {
        return Ok(true);
    }
    if args.no_input {
        log::warn!("{} already exists and --no-input is set", path.display());
        return Ok(false);
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        eprint!("{} already exists. Overwrite? [y/n] ", path.display());
        io::stderr().flush().map_err(|e| CliError::general(e.to_string()))?;

        let Some(line) = lines.next() else {
            // EOF: no answer
            eprintln!();
            return Ok(false);
        };
        let line = line.map_err(|e| CliError::general(format!("cannot read answer: {e}")))?;
        match line.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => eprintln!("please answer y or n"),
        }
    }
}

fn log_summary(run: &MergeRun) {
    let s = &run.summary;
    log::info!(
        "{} parcels with {} owner records ({} CSV rows skipped)",
        s.parcels_with_owners,
        s.owner_records,
        s.skipped_rows
    );
    log::info!(
        "{}/{} features enriched ({} skipped)",
        s.features_enriched,
        s.features,
        s.features_skipped
    );
    log::info!("done in {} ms", run.meta.elapsed_ms);
}

fn print_json(run: &MergeRun, paths: &ResolvedPaths, report: &output::WriteReport) -> Result<(), CliError> {
    let written: Vec<String> = report.written.iter().map(|(_, p)| p.display().to_string()).collect();
    let failed: Vec<String> = report.failures.iter().map(|f| f.to_string()).collect();
    let value = serde_json::json!({
        "meta": run.meta,
        "summary": run.summary,
        "inputs": {
            "csv": paths.input_csv.display().to_string(),
            "geojson": paths.input_geojson.display().to_string(),
        },
        "outputs": {
            "written": written,
            "failed": failed,
        },
        "inconsistencies": run.inconsistencies,
        "warnings": run.warnings,
    });
    let json_str = serde_json::to_string_pretty(&value)
        .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
    println!("{json_str}");
    Ok(())
}
