mod common;

use common::*;
use coverage_export::hasher::HASH_SEED;
use coverage_export::{config_hash, with_sidecars, ConfigHash, ConfigHasher, ExportRequest};
use proptest::prelude::*;
use serde_json::{json, Value};

#[test]
fn test_known_vectors() {
    let hasher = ConfigHasher::new();
    assert_eq!(hasher.hash_canonical("").to_string(), "00001505");
    assert_eq!(hasher.hash_canonical("").as_u32(), HASH_SEED);
    assert_eq!(hasher.hash_canonical("a").to_string(), "0002b5c4");
    assert_eq!(config_hash(&json!({})).to_string(), "005971e3");
    assert_eq!(
        config_hash(&json!({"b": 1, "a": [true, null, "x"]})).to_string(),
        "47a1154e"
    );
    assert_eq!(config_hash(&json!("é😀")).to_string(), "08a84b11");
}

#[test]
fn test_default_request_hash() {
    let hash = ConfigHasher::new().hash(&ExportRequest::default()).unwrap();
    assert_eq!(hash.to_string(), "56d10428");
    assert_eq!(hash, "56d10428".parse::<ConfigHash>().unwrap());
}

#[test]
fn test_typed_and_untyped_hashes_agree() {
    let typed = ConfigHasher::new().hash(&valid_2d_request()).unwrap();
    assert_eq!(typed, config_hash(&valid_2d_json()));
}

#[test]
fn test_any_field_change_changes_hash() {
    let base = config_hash(&valid_2d_json());

    let mut seed = valid_2d_json();
    seed["seed"] = json!(43);
    assert_ne!(config_hash(&seed), base);

    let mut crs = valid_2d_json();
    crs["crs"] = json!("EPSG:4326");
    assert_ne!(config_hash(&crs), base);

    let mut ids = valid_2d_json();
    ids["ap_selection"]["ap_ids"] = json!(["ap-2"]);
    assert_ne!(config_hash(&ids), base);
}

#[test]
fn test_hash_is_stable_across_sidecar_attachment() {
    let request = valid_2d_request();
    let before = ConfigHasher::new().hash(&request).unwrap();
    let enriched = with_sidecars(&request, None).unwrap();
    assert_eq!(enriched.reproducibility.config_hash, before);
    assert_eq!(ConfigHasher::new().hash(&enriched.request).unwrap(), before);
}

#[test]
fn test_hash_text_round_trips_through_serde() {
    let hash = config_hash(&json!({"k": 1}));
    let as_json = serde_json::to_value(hash).unwrap();
    assert_eq!(as_json, Value::String(hash.to_string()));
    let back: ConfigHash = serde_json::from_value(as_json).unwrap();
    assert_eq!(back, hash);

    assert!("xyz".parse::<ConfigHash>().is_err());
    assert!("0011".parse::<ConfigHash>().is_err());
}

proptest! {
    #[test]
    fn prop_hash_is_eight_lowercase_hex(text in ".{0,64}") {
        let rendered = ConfigHasher::new().hash_canonical(&text).to_string();
        prop_assert_eq!(rendered.len(), 8);
        prop_assert!(rendered.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn prop_hash_is_deterministic(seed in any::<i64>(), crs in "[A-Z]{4}:[0-9]{4}") {
        let mut request = valid_2d_json();
        request["seed"] = json!(seed);
        request["crs"] = json!(crs);
        prop_assert_eq!(config_hash(&request), config_hash(&request.clone()));
    }

    #[test]
    fn prop_key_order_does_not_change_hash(
        pairs in prop::collection::vec(("[a-z]{1,6}", any::<i32>()), 0..10)
    ) {
        let mut forward = serde_json::Map::new();
        for (key, value) in &pairs {
            forward.insert(key.clone(), json!(value));
        }
        let mut backward = serde_json::Map::new();
        for (key, _) in pairs.iter().rev() {
            backward.insert(key.clone(), forward[key.as_str()].clone());
        }
        prop_assert_eq!(
            config_hash(&Value::Object(forward)),
            config_hash(&Value::Object(backward))
        );
    }
}
