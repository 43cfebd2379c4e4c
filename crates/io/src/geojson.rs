// GeoJSON input

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde_json::Value;

/// Parse a GeoJSON file into a JSON value, keeping member order.
/// Shape checks (object with a `features` array) belong to the engine.
pub fn read_geojson(path: &Path) -> Result<Value, String> {
    let file = File::open(path).map_err(|e| e.to_string())?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(|e| format!("invalid JSON: {e}"))
}
