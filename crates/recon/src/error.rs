use std::fmt;

/// Fatal, run-aborting errors. Per-row problems are `MergeWarning`s, not errors.
#[derive(Debug)]
pub enum MergeError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty column name, clashing field names, etc.).
    ConfigValidation(String),
    /// A required input or output path is not configured.
    MissingPath(&'static str),
    /// CSV separator is not a single character.
    InvalidSeparator(String),
    /// Configured column is absent from the CSV header.
    MissingColumn { column: String, available: Vec<String> },
    /// CSV data could not be split into records.
    CsvParse(String),
    /// GeoJSON document does not have the feature collection shape.
    InvalidDocument(String),
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingPath(name) => write!(f, "missing required path: {name}"),
            Self::InvalidSeparator(sep) => {
                write!(f, "invalid CSV separator {sep:?}: expected a single character or \"tab\"")
            }
            Self::MissingColumn { column, available } => {
                write!(f, "CSV header has no column '{column}' (found: {})", available.join(", "))
            }
            Self::CsvParse(msg) => write!(f, "CSV parse error: {msg}"),
            Self::InvalidDocument(msg) => write!(f, "invalid GeoJSON document: {msg}"),
        }
    }
}

impl std::error::Error for MergeError {}
