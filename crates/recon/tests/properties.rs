// Property-based tests for the merge engine.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::HashSet;

use proptest::prelude::*;
use serde_json::{json, Value};

use parcelmerge_recon::report::render_geojson;
use parcelmerge_recon::{run, CsvTable, MergeConfig, NormalizationRule, ParcelKey};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

fn merge_config() -> MergeConfig {
    let mut config = MergeConfig::default();
    config.normalization = NormalizationRule::ZeroPad { width: 3 };
    config
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Small id space so that both sides overlap often.
fn arb_id() -> impl Strategy<Value = String> {
    prop_oneof![
        8 => (0u32..40).prop_map(|n| n.to_string()),
        2 => (0u32..40).prop_map(|n| format!("{n:03}")),
        1 => Just(String::new()),
        1 => Just("  ".to_string()),
    ]
}

fn arb_owner() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Z][a-z]{1,8}",
        Just("Bénédicte".to_string()),
        Just(String::new()),
    ]
}

fn arb_rows() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec((arb_id(), arb_owner()), 0..25)
}

fn arb_feature_id() -> impl Strategy<Value = Value> {
    prop_oneof![
        6 => arb_id().prop_map(Value::from),
        3 => (0i64..40).prop_map(Value::from),
        1 => Just(Value::Null),
        1 => Just(json!(true)),
        1 => Just(json!(2.5)),
    ]
}

fn arb_features() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(arb_feature_id(), 0..25)
}

fn csv_text(rows: &[(String, String)]) -> String {
    let mut text = String::from("id;owner\n");
    for (id, owner) in rows {
        text.push_str(&format!("{id};{owner}\n"));
    }
    text
}

fn document(ids: &[Value]) -> Value {
    let features: Vec<Value> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            json!({
                "type": "Feature",
                "properties": {"id": id, "n": i},
                "geometry": {"type": "Point", "coordinates": [i as f64, 1.5]}
            })
        })
        .collect();
    json!({"type": "FeatureCollection", "name": "parcels", "features": features})
}

fn run_once(rows: &[(String, String)], ids: &[Value]) -> parcelmerge_recon::MergeRun {
    let csv = CsvTable::parse(&csv_text(rows), b';').unwrap();
    run(&merge_config(), &csv, document(ids)).unwrap()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn sets_partition_the_union_of_keys(rows in arb_rows(), ids in arb_features()) {
        let result = run_once(&rows, &ids);
        let inc = &result.inconsistencies;

        let matched: HashSet<&ParcelKey> = inc.matched.iter().collect();
        let csv_only: HashSet<&ParcelKey> = inc.csv_only.iter().collect();
        let geojson_only: HashSet<&ParcelKey> = inc.geojson_only.iter().collect();

        prop_assert!(matched.is_disjoint(&csv_only));
        prop_assert!(matched.is_disjoint(&geojson_only));
        prop_assert!(csv_only.is_disjoint(&geojson_only));
        prop_assert_eq!(matched.len(), inc.matched.len());

        let owner_keys: HashSet<&ParcelKey> = result.owners.keys().collect();
        let owner_side: HashSet<&ParcelKey> = matched.union(&csv_only).copied().collect();
        prop_assert_eq!(&owner_keys, &owner_side);

        let rule = &merge_config().normalization;
        let feature_keys: HashSet<ParcelKey> =
            ids.iter().filter_map(|id| rule.normalize_value(Some(id)).ok()).collect();
        let feature_keys: HashSet<&ParcelKey> = feature_keys.iter().collect();
        let feature_side: HashSet<&ParcelKey> = matched.union(&geojson_only).copied().collect();
        prop_assert_eq!(&feature_keys, &feature_side);
    }

    #[test]
    fn feature_count_is_preserved(rows in arb_rows(), ids in arb_features()) {
        let result = run_once(&rows, &ids);
        let features = result.document["features"].as_array().unwrap();
        prop_assert_eq!(features.len(), ids.len());
        for (i, feature) in features.iter().enumerate() {
            prop_assert_eq!(&feature["properties"]["n"], &json!(i));
            prop_assert_eq!(&feature["properties"]["id"], &ids[i]);
        }
    }

    #[test]
    fn every_owner_lands_on_its_feature(rows in arb_rows(), ids in arb_features()) {
        let result = run_once(&rows, &ids);
        let rule = merge_config().normalization;

        for feature in result.document["features"].as_array().unwrap() {
            let props = &feature["properties"];
            let Ok(key) = rule.normalize_value(props.get("id")) else { continue };
            let expected: Vec<&str> = rows
                .iter()
                .filter(|(id, owner)| {
                    !owner.trim().is_empty() && rule.normalize(id).ok().as_ref() == Some(&key)
                })
                .map(|(_, owner)| owner.trim())
                .collect();

            if expected.is_empty() {
                prop_assert!(props.get("Propriétaires").is_none());
                continue;
            }
            prop_assert_eq!(&props["Propriétaires"], &json!(expected.len()));
            for (i, name) in expected.iter().enumerate() {
                prop_assert_eq!(&props[format!("Propriétaire_{}", i + 1).as_str()], &json!(name));
            }
        }
    }

    #[test]
    fn identical_inputs_render_identically(rows in arb_rows(), ids in arb_features()) {
        let first = run_once(&rows, &ids);
        let second = run_once(&rows, &ids);
        prop_assert_eq!(
            render_geojson(&first.document).unwrap(),
            render_geojson(&second.document).unwrap()
        );
        prop_assert_eq!(first.inconsistencies, second.inconsistencies);
        prop_assert_eq!(first.summary, second.summary);
        prop_assert_eq!(first.warnings, second.warnings);
    }

    #[test]
    fn normalization_is_total(raw in ".{0,24}") {
        for rule in [NormalizationRule::ZeroPad { width: 5 }, NormalizationRule::Cadastral] {
            // either outcome is fine; reaching here without a panic is the property
            let _ = rule.normalize(&raw);
            let _ = rule.normalize_value(Some(&Value::String(raw.clone())));
        }
    }

    #[test]
    fn normalization_is_idempotent(raw in "[0-9a-zA-Z ]{1,12}") {
        let rule = NormalizationRule::ZeroPad { width: 6 };
        if let Ok(key) = rule.normalize(&raw) {
            prop_assert_eq!(rule.normalize(key.as_str()).unwrap(), key);
        }
    }
}
