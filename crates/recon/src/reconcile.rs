use std::collections::HashSet;

use crate::model::Inconsistencies;
use crate::normalize::ParcelKey;

/// Two-way set difference between owner table keys and feature keys.
///
/// `owner_keys` is taken in CSV first-seen order and `feature_keys` in GeoJSON
/// first-seen order; each output list keeps the order of its source. Repeated
/// keys are reported once.
pub fn reconcile<'a>(
    owner_keys: impl IntoIterator<Item = &'a ParcelKey>,
    feature_keys: &[ParcelKey],
) -> Inconsistencies {
    let owner_keys: Vec<&ParcelKey> = owner_keys.into_iter().collect();
    let owner_set: HashSet<&ParcelKey> = owner_keys.iter().copied().collect();
    let feature_set: HashSet<&ParcelKey> = feature_keys.iter().collect();

    let mut matched = Vec::new();
    let mut geojson_only = Vec::new();
    let mut seen: HashSet<&ParcelKey> = HashSet::new();
    for key in feature_keys {
        if !seen.insert(key) {
            continue;
        }
        if owner_set.contains(key) {
            matched.push(key.clone());
        } else {
            geojson_only.push(key.clone());
        }
    }

    let mut csv_only = Vec::new();
    let mut seen: HashSet<&ParcelKey> = HashSet::new();
    for key in owner_keys {
        if seen.insert(key) && !feature_set.contains(key) {
            csv_only.push(key.clone());
        }
    }

    Inconsistencies {
        matched,
        csv_only,
        geojson_only,
    }
}
