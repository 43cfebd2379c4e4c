use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::MergeError;
pub use crate::normalize::NormalizationRule;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Run configuration, built once and passed by reference to every component.
///
/// Every table is optional in the TOML file; missing values take defaults,
/// except paths which are checked at run time by [`MergeConfig::require_paths`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MergeConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub options: OptionsConfig,
    #[serde(default)]
    pub normalization: NormalizationRule,
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    #[serde(default)]
    pub input_csv: Option<PathBuf>,
    #[serde(default)]
    pub input_geojson: Option<PathBuf>,
    #[serde(default)]
    pub output_geojson: Option<PathBuf>,
    /// Directory for the edited CSV and the inconsistency reports.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

/// Paths after the required ones have been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub input_csv: PathBuf,
    pub input_geojson: PathBuf,
    pub output_geojson: PathBuf,
    pub output_dir: PathBuf,
}

pub const DEFAULT_OUTPUT_DIR: &str = "outputs";

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OptionsConfig {
    /// CSV column holding the parcel identifier.
    pub id_csv_column: String,
    /// CSV column holding the owner name(s).
    pub owner_csv_column: String,
    /// Feature property holding the parcel identifier.
    pub geojson_id_field: String,
    /// Property receiving the owner count.
    pub prop_name: String,
    /// Base name of the per-owner properties (`{base}_1`, `{base}_2`, ...).
    /// Empty disables them.
    pub individual_prop_name: String,
    /// Single character, or `tab`.
    pub csv_separator: String,
    /// Splits one owner cell into several owners. Unset or empty: no splitting.
    pub owner_delimiter: Option<String>,
    /// Header of the key column appended to the edited CSV.
    pub normalized_column: String,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            id_csv_column: "id".into(),
            owner_csv_column: "owner".into(),
            geojson_id_field: "id".into(),
            prop_name: "Propriétaires".into(),
            individual_prop_name: "Propriétaire".into(),
            csv_separator: ";".into(),
            owner_delimiter: None,
            normalized_column: "normalized_id".into(),
        }
    }
}

impl OptionsConfig {
    pub fn owner_delimiter(&self) -> Option<&str> {
        self.owner_delimiter.as_deref().filter(|d| !d.is_empty())
    }

    /// Per-owner property name, 1-based.
    pub fn owner_field(&self, index: usize) -> String {
        format!("{}_{index}", self.individual_prop_name)
    }

    /// True if `name` would be written by the merge (count field or a per-owner field).
    pub fn is_owner_field(&self, name: &str) -> bool {
        if name == self.prop_name {
            return true;
        }
        !self.individual_prop_name.is_empty() && is_indexed_field(&self.individual_prop_name, name)
    }
}

/// `{base}_{digits}`
fn is_indexed_field(base: &str, name: &str) -> bool {
    name.strip_prefix(base)
        .and_then(|rest| rest.strip_prefix('_'))
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Parse a separator setting into a byte for the CSV reader/writer.
pub fn parse_separator(value: &str) -> Result<u8, MergeError> {
    match value {
        "tab" | "TAB" | "\\t" | "\t" => Ok(b'\t'),
        s if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
        other => Err(MergeError::InvalidSeparator(other.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl MergeConfig {
    pub fn from_toml(input: &str) -> Result<Self, MergeError> {
        let config = Self::parse_toml(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Deserialize without validating, for callers that apply overrides first.
    pub fn parse_toml(input: &str) -> Result<Self, MergeError> {
        toml::from_str(input).map_err(|e| MergeError::ConfigParse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), MergeError> {
        let o = &self.options;

        for (name, value) in [
            ("id_csv_column", &o.id_csv_column),
            ("owner_csv_column", &o.owner_csv_column),
            ("geojson_id_field", &o.geojson_id_field),
            ("prop_name", &o.prop_name),
            ("normalized_column", &o.normalized_column),
        ] {
            if value.trim().is_empty() {
                return Err(MergeError::ConfigValidation(format!("{name} must not be empty")));
            }
        }

        parse_separator(&o.csv_separator)?;

        if o.id_csv_column.trim() == o.owner_csv_column.trim() {
            return Err(MergeError::ConfigValidation(format!(
                "id_csv_column and owner_csv_column are both '{}'",
                o.id_csv_column
            )));
        }

        if o.is_owner_field(&o.geojson_id_field) {
            return Err(MergeError::ConfigValidation(format!(
                "geojson_id_field '{}' would be overwritten by the owner fields",
                o.geojson_id_field
            )));
        }

        if !o.individual_prop_name.is_empty() && is_indexed_field(&o.individual_prop_name, &o.prop_name) {
            return Err(MergeError::ConfigValidation(format!(
                "prop_name '{}' clashes with the per-owner fields '{}_N'",
                o.prop_name, o.individual_prop_name
            )));
        }

        if o.normalized_column.trim() == o.id_csv_column.trim()
            || o.normalized_column.trim() == o.owner_csv_column.trim()
        {
            return Err(MergeError::ConfigValidation(format!(
                "normalized_column '{}' must differ from the input columns",
                o.normalized_column
            )));
        }

        Ok(())
    }

    /// The configured separator as a byte.
    pub fn separator(&self) -> Result<u8, MergeError> {
        parse_separator(&self.options.csv_separator)
    }

    /// Check that input and output paths are set.
    pub fn require_paths(&self) -> Result<ResolvedPaths, MergeError> {
        let p = &self.paths;
        Ok(ResolvedPaths {
            input_csv: p.input_csv.clone().ok_or(MergeError::MissingPath("input_csv"))?,
            input_geojson: p
                .input_geojson
                .clone()
                .ok_or(MergeError::MissingPath("input_geojson"))?,
            output_geojson: p
                .output_geojson
                .clone()
                .ok_or(MergeError::MissingPath("output_geojson"))?,
            output_dir: p
                .output_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        })
    }

    /// Resolve relative paths against `base` (the config file's directory).
    pub fn resolve_relative_to(&mut self, base: &Path) {
        let p = &mut self.paths;
        for path in [
            &mut p.input_csv,
            &mut p.input_geojson,
            &mut p.output_geojson,
            &mut p.output_dir,
        ]
        .into_iter()
        .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
