use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::error::MergeError;
use crate::normalize::{MalformedIdentifier, ParcelKey};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Header record + data records, already split into fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Split CSV text into records. The first record is the header.
    /// Rows may be shorter or longer than the header.
    pub fn parse(csv_data: &str, delimiter: u8) -> Result<Self, MergeError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(csv_data.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| MergeError::CsvParse(e.to_string()))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| MergeError::CsvParse(e.to_string()))?;
            rows.push(record.iter().map(|f| f.to_string()).collect());
        }

        Ok(Self { headers, rows })
    }

    /// No header and no rows (a zero-byte file).
    pub fn is_blank(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }

    /// Index of a header, compared after trimming whitespace.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.headers.iter().position(|h| h.trim() == name)
    }
}

// ---------------------------------------------------------------------------
// Owner table
// ---------------------------------------------------------------------------

/// Parcel key → owner names, in order of first appearance in the CSV.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnerTable {
    entries: IndexMap<ParcelKey, Vec<String>>,
}

impl OwnerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append names to the entry for `key`, creating it if absent.
    /// An empty name list never creates an entry.
    pub fn insert_or_append(&mut self, key: ParcelKey, names: Vec<String>) {
        if names.is_empty() {
            return;
        }
        self.entries.entry(key).or_default().extend(names);
    }

    pub fn get(&self, key: &ParcelKey) -> Option<&[String]> {
        self.entries.get(key).map(|v| v.as_slice())
    }

    pub fn contains(&self, key: &ParcelKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ParcelKey> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParcelKey, &[String])> {
        self.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Number of distinct parcels.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of owner records across all parcels.
    pub fn owner_count(&self) -> usize {
        self.entries.values().map(|v| v.len()).sum()
    }
}

/// Output of the owner table builder.
#[derive(Debug, Clone)]
pub struct OwnerTableBuild {
    pub table: OwnerTable,
    /// Original rows with the normalized key appended (empty when malformed).
    pub edited: CsvTable,
    pub warnings: Vec<MergeWarning>,
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Where a recoverable problem was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "index", rename_all = "snake_case")]
pub enum WarningSite {
    /// 1-based data row number (header excluded).
    CsvRow(usize),
    /// 0-based index into the `features` array.
    Feature(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningReason {
    MalformedIdentifier(MalformedIdentifier),
    /// Valid identifier but the owner cell holds no name.
    EmptyOwner,
}

/// A skipped row or feature. Never aborts the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeWarning {
    pub site: WarningSite,
    pub reason: WarningReason,
}

impl MergeWarning {
    pub fn csv_row(row: usize, reason: WarningReason) -> Self {
        Self { site: WarningSite::CsvRow(row), reason }
    }

    pub fn feature(index: usize, reason: WarningReason) -> Self {
        Self { site: WarningSite::Feature(index), reason }
    }
}

impl fmt::Display for WarningSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CsvRow(row) => write!(f, "CSV row {row}"),
            Self::Feature(index) => write!(f, "feature #{index}"),
        }
    }
}

impl fmt::Display for WarningReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedIdentifier(e) => write!(f, "{e}"),
            Self::EmptyOwner => write!(f, "owner cell is empty"),
        }
    }
}

impl fmt::Display for MergeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}, skipped", self.site, self.reason)
    }
}

// ---------------------------------------------------------------------------
// Merge + reconciliation
// ---------------------------------------------------------------------------

/// Output of the merge pass over the feature collection.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub document: Value,
    /// Distinct feature keys in first-seen order.
    pub feature_keys: Vec<ParcelKey>,
    pub feature_count: usize,
    pub enriched_features: usize,
    pub warnings: Vec<MergeWarning>,
}

/// Two-way key comparison. The three lists are disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Inconsistencies {
    /// In both sources, GeoJSON order.
    pub matched: Vec<ParcelKey>,
    /// In the owner table only, CSV order.
    pub csv_only: Vec<ParcelKey>,
    /// In the GeoJSON only, GeoJSON order.
    pub geojson_only: Vec<ParcelKey>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub csv_rows: usize,
    pub skipped_rows: usize,
    pub parcels_with_owners: usize,
    pub owner_records: usize,
    pub features: usize,
    pub features_enriched: usize,
    pub features_skipped: usize,
    pub matched: usize,
    pub csv_only: usize,
    pub geojson_only: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub engine_version: String,
    pub run_at: String,
    pub elapsed_ms: u64,
}

/// Everything one run produces, ready for the report emitter.
#[derive(Debug, Clone)]
pub struct MergeRun {
    pub meta: RunMeta,
    pub summary: RunSummary,
    pub owners: OwnerTable,
    pub edited_csv: CsvTable,
    pub document: Value,
    pub inconsistencies: Inconsistencies,
    pub warnings: Vec<MergeWarning>,
}
