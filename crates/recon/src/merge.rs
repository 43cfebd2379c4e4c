use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::config::{MergeConfig, OptionsConfig};
use crate::error::MergeError;
use crate::model::{MergeOutcome, MergeWarning, OwnerTable, WarningReason};

/// Attach owner fields to every feature whose key is in the owner table.
///
/// Features are never dropped, reordered, or touched outside `properties`.
/// A feature with a malformed identifier is left as-is and only produces a
/// warning; its key takes no part in reconciliation.
pub fn merge_owners(
    mut document: Value,
    owners: &OwnerTable,
    config: &MergeConfig,
) -> Result<MergeOutcome, MergeError> {
    let options = &config.options;

    let features = document
        .as_object_mut()
        .ok_or_else(|| MergeError::InvalidDocument("top-level value is not an object".into()))?
        .get_mut("features")
        .ok_or_else(|| MergeError::InvalidDocument("no \"features\" member".into()))?
        .as_array_mut()
        .ok_or_else(|| MergeError::InvalidDocument("\"features\" is not an array".into()))?;

    let feature_count = features.len();
    let mut feature_keys = Vec::new();
    let mut seen = HashSet::new();
    let mut enriched_features = 0;
    let mut warnings = Vec::new();

    for (index, feature) in features.iter_mut().enumerate() {
        let raw = feature
            .get("properties")
            .and_then(|p| p.get(options.geojson_id_field.as_str()));

        let key = match config.normalization.normalize_value(raw) {
            Ok(key) => key,
            Err(e) => {
                warnings.push(MergeWarning::feature(index, WarningReason::MalformedIdentifier(e)));
                continue;
            }
        };

        if let Some(names) = owners.get(&key) {
            // the id was read from `properties`, so it is an object
            if let Some(properties) = feature.get_mut("properties").and_then(Value::as_object_mut) {
                inject_owner_fields(properties, names, options);
                enriched_features += 1;
            }
        }

        if seen.insert(key.clone()) {
            feature_keys.push(key);
        }
    }

    log::debug!(
        "merged {enriched_features}/{feature_count} features, {} distinct keys, {} skipped",
        feature_keys.len(),
        warnings.len()
    );

    Ok(MergeOutcome {
        document,
        feature_keys,
        feature_count,
        enriched_features,
        warnings,
    })
}

/// Write the owner count and, unless disabled, one field per owner.
pub fn inject_owner_fields(properties: &mut Map<String, Value>, names: &[String], options: &OptionsConfig) {
    properties.insert(options.prop_name.clone(), Value::from(names.len()));

    if options.individual_prop_name.is_empty() {
        return;
    }
    for (i, name) in names.iter().enumerate() {
        properties.insert(options.owner_field(i + 1), Value::String(name.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::NormalizationRule;
    use serde_json::json;

    fn config() -> MergeConfig {
        let mut config = MergeConfig::default();
        config.normalization = NormalizationRule::ZeroPad { width: 3 };
        config
    }

    fn owners(rows: &[(&str, &[&str])]) -> OwnerTable {
        let rule = config().normalization;
        let mut table = OwnerTable::new();
        for (id, names) in rows {
            table.insert_or_append(
                rule.normalize(id).unwrap(),
                names.iter().map(|n| n.to_string()).collect(),
            );
        }
        table
    }

    fn feature(id: Value) -> Value {
        json!({
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": [0.19, 48.0]},
            "properties": {"id": id, "commune": "72181"}
        })
    }

    fn collection(features: Vec<Value>) -> Value {
        json!({"type": "FeatureCollection", "features": features})
    }

    #[test]
    fn single_owner() {
        let doc = collection(vec![feature(json!("012"))]);
        let out = merge_owners(doc, &owners(&[("12", &["Dupont"])]), &config()).unwrap();

        let props = &out.document["features"][0]["properties"];
        assert_eq!(props["Propriétaires"], json!(1));
        assert_eq!(props["Propriétaire_1"], json!("Dupont"));
        assert_eq!(props["commune"], json!("72181"));
        assert_eq!(props["id"], json!("012"));
        assert_eq!(out.enriched_features, 1);
    }

    #[test]
    fn co_owners_in_table_order() {
        let doc = collection(vec![feature(json!(7))]);
        let out = merge_owners(doc, &owners(&[("7", &["A", "B"])]), &config()).unwrap();

        let props = &out.document["features"][0]["properties"];
        assert_eq!(props["Propriétaires"], json!(2));
        assert_eq!(props["Propriétaire_1"], json!("A"));
        assert_eq!(props["Propriétaire_2"], json!("B"));
    }

    #[test]
    fn unmatched_feature_unchanged() {
        let original = feature(json!("5"));
        let doc = collection(vec![original.clone()]);
        let out = merge_owners(doc, &owners(&[("12", &["Dupont"])]), &config()).unwrap();

        assert_eq!(out.document["features"][0], original);
        assert_eq!(out.feature_keys.len(), 1);
        assert_eq!(out.feature_keys[0].as_str(), "005");
        assert_eq!(out.enriched_features, 0);
    }

    #[test]
    fn malformed_feature_id_is_warning_only() {
        let no_props = json!({"type": "Feature", "geometry": null});
        let doc = collection(vec![feature(Value::Null), no_props.clone(), feature(json!("  "))]);
        let out = merge_owners(doc, &owners(&[]), &config()).unwrap();

        assert_eq!(out.feature_count, 3);
        assert!(out.feature_keys.is_empty());
        assert_eq!(out.warnings.len(), 3);
        assert_eq!(out.document["features"][1], no_props);
    }

    #[test]
    fn features_sharing_a_key_are_all_enriched() {
        let doc = collection(vec![feature(json!("1")), feature(json!("001"))]);
        let out = merge_owners(doc, &owners(&[("1", &["A"])]), &config()).unwrap();
        assert_eq!(out.enriched_features, 2);
        assert_eq!(out.feature_keys.len(), 1);
    }

    #[test]
    fn geometry_and_top_level_members_pass_through() {
        let doc = json!({
            "type": "FeatureCollection",
            "name": "parcelles",
            "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::2154"}},
            "features": [feature(json!("12"))]
        });
        let out = merge_owners(doc.clone(), &owners(&[("12", &["Dupont"])]), &config()).unwrap();

        assert_eq!(out.document["crs"], doc["crs"]);
        assert_eq!(out.document["name"], doc["name"]);
        assert_eq!(
            out.document["features"][0]["geometry"],
            doc["features"][0]["geometry"]
        );
        let keys: Vec<&String> = out.document.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["type", "name", "crs", "features"]);
    }

    #[test]
    fn injected_fields_follow_existing_properties() {
        let doc = collection(vec![feature(json!("12"))]);
        let out = merge_owners(doc, &owners(&[("12", &["Dupont"])]), &config()).unwrap();
        let props = out.document["features"][0]["properties"].as_object().unwrap();
        let names: Vec<&String> = props.keys().collect();
        assert_eq!(names, vec!["id", "commune", "Propriétaires", "Propriétaire_1"]);
    }

    #[test]
    fn individual_fields_can_be_disabled() {
        let mut cfg = config();
        cfg.options.individual_prop_name = String::new();
        let doc = collection(vec![feature(json!("12"))]);
        let out = merge_owners(doc, &owners(&[("12", &["Dupont"])]), &cfg).unwrap();
        let props = out.document["features"][0]["properties"].as_object().unwrap();
        assert_eq!(props.len(), 3);
        assert_eq!(props["Propriétaires"], json!(1));
    }

    #[test]
    fn custom_id_field() {
        let mut cfg = config();
        cfg.options.geojson_id_field = "idu".into();
        let doc = collection(vec![json!({"type": "Feature", "properties": {"idu": "12"}, "geometry": null})]);
        let out = merge_owners(doc, &owners(&[("12", &["Dupont"])]), &cfg).unwrap();
        assert_eq!(out.enriched_features, 1);
    }

    #[test]
    fn rejects_non_collections() {
        for doc in [json!([]), json!({"type": "Feature"}), json!({"features": {}})] {
            let err = merge_owners(doc, &OwnerTable::new(), &config()).unwrap_err();
            assert!(matches!(err, MergeError::InvalidDocument(_)));
        }
    }

    #[test]
    fn empty_collection() {
        let out = merge_owners(collection(vec![]), &owners(&[("1", &["A"])]), &config()).unwrap();
        assert_eq!(out.feature_count, 0);
        assert!(out.feature_keys.is_empty());
    }
}
