//! `parcelmerge-recon`: parcel/owner merge engine.
//!
//! Pure engine crate: receives a parsed CSV table and a GeoJSON document,
//! returns the enriched document, the owner table and the inconsistency sets.
//! No file system access; see `parcelmerge-io` for reading and writing files.

pub mod config;
pub mod engine;
pub mod error;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod owners;
pub mod reconcile;
pub mod report;

pub use config::MergeConfig;
pub use engine::run;
pub use error::MergeError;
pub use model::{CsvTable, Inconsistencies, MergeRun, MergeWarning, OwnerTable, RunSummary};
pub use normalize::{MalformedIdentifier, NormalizationRule, ParcelKey};
