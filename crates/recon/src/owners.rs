use crate::config::MergeConfig;
use crate::error::MergeError;
use crate::model::{CsvTable, MergeWarning, OwnerTable, OwnerTableBuild, WarningReason};

/// Group owner names by normalized parcel key.
///
/// Rows with a malformed identifier or an empty owner cell are skipped with a
/// warning. The edited view keeps every row, with the key (or an empty cell)
/// inserted right after the last header column.
pub fn build_owner_table(csv: &CsvTable, config: &MergeConfig) -> Result<OwnerTableBuild, MergeError> {
    let options = &config.options;

    if csv.is_blank() {
        return Ok(OwnerTableBuild {
            table: OwnerTable::new(),
            edited: CsvTable::default(),
            warnings: Vec::new(),
        });
    }

    let idx = |name: &str| -> Result<usize, MergeError> {
        csv.column_index(name).ok_or_else(|| MergeError::MissingColumn {
            column: name.to_string(),
            available: csv.headers.clone(),
        })
    };
    let id_idx = idx(&options.id_csv_column)?;
    let owner_idx = idx(&options.owner_csv_column)?;
    if csv.column_index(&options.normalized_column).is_some() {
        return Err(MergeError::ConfigValidation(format!(
            "normalized_column '{}' already exists in the CSV header; pick another name",
            options.normalized_column
        )));
    }

    let width = csv.headers.len();
    let mut edited_headers = csv.headers.clone();
    edited_headers.push(options.normalized_column.clone());

    let mut table = OwnerTable::new();
    let mut edited_rows = Vec::with_capacity(csv.rows.len());
    let mut warnings = Vec::new();

    for (i, row) in csv.rows.iter().enumerate() {
        let row_number = i + 1;
        let mut edited = row.clone();
        if edited.len() < width {
            edited.resize(width, String::new());
        }

        let raw_id = row.get(id_idx).map(String::as_str).unwrap_or("");
        let key = match config.normalization.normalize(raw_id) {
            Ok(key) => key,
            Err(e) => {
                warnings.push(MergeWarning::csv_row(row_number, WarningReason::MalformedIdentifier(e)));
                edited.insert(width, String::new());
                edited_rows.push(edited);
                continue;
            }
        };
        edited.insert(width, key.as_str().to_string());
        edited_rows.push(edited);

        let cell = row.get(owner_idx).map(String::as_str).unwrap_or("");
        let names = split_owners(cell, options.owner_delimiter());
        if names.is_empty() {
            warnings.push(MergeWarning::csv_row(row_number, WarningReason::EmptyOwner));
            continue;
        }
        table.insert_or_append(key, names);
    }

    log::debug!(
        "owner table: {} rows, {} parcels, {} owner records, {} skipped",
        csv.rows.len(),
        table.len(),
        table.owner_count(),
        warnings.len()
    );

    Ok(OwnerTableBuild {
        table,
        edited: CsvTable {
            headers: edited_headers,
            rows: edited_rows,
        },
        warnings,
    })
}

/// Split one owner cell into trimmed, non-empty names.
pub fn split_owners(cell: &str, delimiter: Option<&str>) -> Vec<String> {
    match delimiter {
        Some(d) => cell
            .split(d)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        None => {
            let name = cell.trim();
            if name.is_empty() {
                Vec::new()
            } else {
                vec![name.to_string()]
            }
        }
    }
}
