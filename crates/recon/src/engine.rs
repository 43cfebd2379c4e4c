use std::time::Instant;

use serde_json::Value;

use crate::config::MergeConfig;
use crate::error::MergeError;
use crate::merge::merge_owners;
use crate::model::{CsvTable, MergeRun, RunMeta};
use crate::owners::build_owner_table;
use crate::reconcile::reconcile;
use crate::report::compute_summary;

/// Run one merge: owner table, feature enrichment, reconciliation, summary.
///
/// Configuration problems (bad options, missing columns, a document that is
/// not a feature collection) abort before anything is produced. Per-row and
/// per-feature problems end up in `MergeRun::warnings`.
pub fn run(config: &MergeConfig, csv: &CsvTable, document: Value) -> Result<MergeRun, MergeError> {
    let started = Instant::now();
    config.validate()?;

    log::debug!(
        "columns id={:?} owner={:?}, feature field {:?}, rule {}",
        config.options.id_csv_column,
        config.options.owner_csv_column,
        config.options.geojson_id_field,
        config.normalization
    );

    let build = build_owner_table(csv, config)?;
    let merged = merge_owners(document, &build.table, config)?;
    let inconsistencies = reconcile(build.table.keys(), &merged.feature_keys);

    let mut warnings = build.warnings;
    warnings.extend(merged.warnings);

    let summary = compute_summary(
        csv.rows.len(),
        &build.table,
        merged.feature_count,
        merged.enriched_features,
        &inconsistencies,
        &warnings,
    );

    log::info!(
        "{} matched, {} CSV-only, {} GeoJSON-only",
        summary.matched,
        summary.csv_only,
        summary.geojson_only
    );

    Ok(MergeRun {
        meta: RunMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        },
        summary,
        owners: build.table,
        edited_csv: build.edited,
        document: merged.document,
        inconsistencies,
        warnings,
    })
}
