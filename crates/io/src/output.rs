// Report output: enhanced GeoJSON plus the CSV reports in the output directory

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use parcelmerge_recon::config::ResolvedPaths;
use parcelmerge_recon::report;
use parcelmerge_recon::MergeRun;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    EnhancedGeojson,
    EditedCsv,
    CsvOnly,
    GeojsonOnly,
    OwnersByParcel,
}

impl OutputKind {
    pub const ALL: [OutputKind; 5] = [
        OutputKind::EnhancedGeojson,
        OutputKind::EditedCsv,
        OutputKind::CsvOnly,
        OutputKind::GeojsonOnly,
        OutputKind::OwnersByParcel,
    ];

    /// File name inside the output directory. `None` for the enhanced GeoJSON,
    /// whose path is configured directly.
    pub fn file_name(self) -> Option<&'static str> {
        match self {
            Self::EnhancedGeojson => None,
            Self::EditedCsv => Some("parcelles_edited.csv"),
            Self::CsvOnly => Some("inconsistencies_csv.csv"),
            Self::GeojsonOnly => Some("inconsistencies_geojson.csv"),
            Self::OwnersByParcel => Some("owners_by_parcel.csv"),
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EnhancedGeojson => "enhanced GeoJSON",
            Self::EditedCsv => "edited CSV",
            Self::CsvOnly => "CSV-only report",
            Self::GeojsonOnly => "GeoJSON-only report",
            Self::OwnersByParcel => "owners by parcel",
        };
        f.write_str(name)
    }
}

/// One output that could not be written. Other outputs are unaffected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    pub kind: OutputKind,
    pub path: PathBuf,
    pub message: String,
}

impl fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot write {} to {}: {}", self.kind, self.path.display(), self.message)
    }
}

impl std::error::Error for WriteFailure {}

/// Where each output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPlan {
    pub geojson: PathBuf,
    pub dir: PathBuf,
}

impl OutputPlan {
    pub fn new(geojson: impl Into<PathBuf>, dir: impl Into<PathBuf>) -> Self {
        Self { geojson: geojson.into(), dir: dir.into() }
    }

    pub fn from_paths(paths: &ResolvedPaths) -> Self {
        Self::new(&paths.output_geojson, &paths.output_dir)
    }

    pub fn path_for(&self, kind: OutputKind) -> PathBuf {
        match kind.file_name() {
            Some(name) => self.dir.join(name),
            None => self.geojson.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WriteReport {
    pub written: Vec<(OutputKind, PathBuf)>,
    pub failures: Vec<WriteFailure>,
}

impl WriteReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// True if writing to `path` would replace an existing file.
pub fn would_overwrite(path: &Path) -> bool {
    path.exists()
}

/// Write every output of `run`. Each output is attempted even if an earlier one failed.
pub fn write_outputs(run: &MergeRun, plan: &OutputPlan, delimiter: u8) -> WriteReport {
    let mut report = WriteReport::default();
    let dir_error = std::fs::create_dir_all(&plan.dir).err().map(|e| e.to_string());

    for kind in OutputKind::ALL {
        let path = plan.path_for(kind);
        let result = match (&dir_error, kind.file_name()) {
            (Some(e), Some(_)) => Err(format!("cannot create directory {}: {e}", plan.dir.display())),
            _ => write_one(run, kind, &path, delimiter),
        };

        match result {
            Ok(()) => {
                log::info!("wrote {kind}: {}", path.display());
                report.written.push((kind, path));
            }
            Err(message) => report.failures.push(WriteFailure { kind, path, message }),
        }
    }

    report
}

fn write_one(run: &MergeRun, kind: OutputKind, path: &Path, delimiter: u8) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    let file = File::create(path).map_err(|e| e.to_string())?;
    let mut out = BufWriter::new(file);
    let inc = &run.inconsistencies;

    match kind {
        OutputKind::EnhancedGeojson => {
            let bytes = report::render_geojson(&run.document).map_err(|e| e.to_string())?;
            out.write_all(&bytes).map_err(|e| e.to_string())?;
        }
        OutputKind::EditedCsv => {
            report::write_edited_csv(&mut out, &run.edited_csv, delimiter).map_err(|e| e.to_string())?
        }
        OutputKind::CsvOnly => {
            report::write_inconsistencies(&mut out, &inc.csv_only, report::CSV_ONLY_REASON, delimiter)
                .map_err(|e| e.to_string())?
        }
        OutputKind::GeojsonOnly => report::write_inconsistencies(
            &mut out,
            &inc.geojson_only,
            report::GEOJSON_ONLY_REASON,
            delimiter,
        )
        .map_err(|e| e.to_string())?,
        OutputKind::OwnersByParcel => {
            report::write_owner_table(&mut out, &run.owners, delimiter).map_err(|e| e.to_string())?
        }
    }

    out.flush().map_err(|e| e.to_string())
}
