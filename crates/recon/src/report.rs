use std::io::Write;

use serde::Serialize;
use serde_json::Value;

use crate::model::{CsvTable, Inconsistencies, MergeWarning, OwnerTable, RunSummary, WarningSite};
use crate::normalize::ParcelKey;

pub const CSV_ONLY_REASON: &str = "No matching parcel in GeoJSON";
pub const GEOJSON_ONLY_REASON: &str = "No matching owner data";
pub const REPORT_HEADERS: [&str; 2] = ["Parcel ID", "Reason"];
pub const OWNER_TABLE_HEADERS: [&str; 2] = ["Parcel ID", "Owners"];

/// Joins co-owners in the owners-by-parcel export.
pub const OWNER_JOIN: &str = ", ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InconsistencyRow<'a> {
    pub key: &'a ParcelKey,
    pub reason: &'static str,
}

pub fn inconsistency_rows<'a>(keys: &'a [ParcelKey], reason: &'static str) -> Vec<InconsistencyRow<'a>> {
    keys.iter().map(|key| InconsistencyRow { key, reason }).collect()
}

/// Pretty-print the enhanced document with 4-space indentation.
/// Key order is kept and non-ASCII text is written as UTF-8.
pub fn render_geojson(document: &Value) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    document.serialize(&mut ser)?;
    out.push(b'\n');
    Ok(out)
}

fn writer<W: Write>(out: W, delimiter: u8) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_writer(out)
}

pub fn write_inconsistencies<W: Write>(
    out: W,
    keys: &[ParcelKey],
    reason: &'static str,
    delimiter: u8,
) -> Result<(), csv::Error> {
    let mut wtr = writer(out, delimiter);
    wtr.write_record(REPORT_HEADERS)?;
    for row in inconsistency_rows(keys, reason) {
        wtr.write_record([row.key.as_str(), row.reason])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Original rows plus the normalized key column. Writes nothing for a blank table.
pub fn write_edited_csv<W: Write>(out: W, table: &CsvTable, delimiter: u8) -> Result<(), csv::Error> {
    let mut wtr = writer(out, delimiter);
    if !table.headers.is_empty() {
        wtr.write_record(&table.headers)?;
    }
    for row in &table.rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_owner_table<W: Write>(out: W, owners: &OwnerTable, delimiter: u8) -> Result<(), csv::Error> {
    let mut wtr = writer(out, delimiter);
    wtr.write_record(OWNER_TABLE_HEADERS)?;
    for (key, names) in owners.iter() {
        wtr.write_record([key.as_str(), names.join(OWNER_JOIN).as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn compute_summary(
    csv_rows: usize,
    owners: &OwnerTable,
    feature_count: usize,
    features_enriched: usize,
    inconsistencies: &Inconsistencies,
    warnings: &[MergeWarning],
) -> RunSummary {
    let skipped_rows = warnings
        .iter()
        .filter(|w| matches!(w.site, WarningSite::CsvRow(_)))
        .count();

    RunSummary {
        csv_rows,
        skipped_rows,
        parcels_with_owners: owners.len(),
        owner_records: owners.owner_count(),
        features: feature_count,
        features_enriched,
        features_skipped: warnings.len() - skipped_rows,
        matched: inconsistencies.matched.len(),
        csv_only: inconsistencies.csv_only.len(),
        geojson_only: inconsistencies.geojson_only.len(),
    }
}
