// File I/O operations

pub mod csv;
pub mod geojson;
pub mod output;
