//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! | Code | Meaning                                            |
//! |------|----------------------------------------------------|
//! | 0    | Success                                            |
//! | 1    | General error (unspecified)                        |
//! | 2    | CLI usage error (bad args)                         |
//! | 3    | Configuration invalid (config file, columns, sep)  |
//! | 4    | Input file unreadable or unparsable                |
//! | 5    | One or more outputs could not be written           |
//! | 6    | Cancelled by the user at the overwrite prompt      |

use parcelmerge_recon::MergeError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
/// clap exits with this code on its own parse errors.
pub const EXIT_USAGE: u8 = 2;

/// Config file invalid, required path unset, column absent, bad separator.
pub const EXIT_CONFIG_INVALID: u8 = 3;

/// Input CSV or GeoJSON cannot be read, or is not a feature collection.
pub const EXIT_INPUT_UNREADABLE: u8 = 4;

/// At least one output failed to write. The others were still written.
pub const EXIT_WRITE_FAILURE: u8 = 5;

/// User declined to overwrite the enhanced GeoJSON. Nothing was written.
pub const EXIT_CANCELLED: u8 = 6;

/// Map an engine error to its exit code.
pub fn merge_exit_code(err: &MergeError) -> u8 {
    match err {
        MergeError::ConfigParse(_)
        | MergeError::ConfigValidation(_)
        | MergeError::MissingPath(_)
        | MergeError::InvalidSeparator(_)
        | MergeError::MissingColumn { .. } => EXIT_CONFIG_INVALID,
        MergeError::CsvParse(_) | MergeError::InvalidDocument(_) => EXIT_INPUT_UNREADABLE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_CONFIG_INVALID,
            EXIT_INPUT_UNREADABLE,
            EXIT_WRITE_FAILURE,
            EXIT_CANCELLED,
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn missing_column_is_config_error() {
        let err = MergeError::MissingColumn { column: "id".into(), available: vec![] };
        assert_eq!(merge_exit_code(&err), EXIT_CONFIG_INVALID);
        assert_eq!(
            merge_exit_code(&MergeError::InvalidDocument("x".into())),
            EXIT_INPUT_UNREADABLE
        );
    }
}
