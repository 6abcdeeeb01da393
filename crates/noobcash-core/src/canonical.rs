//! Canonical JSON encoding used for hashing and signing.
//!
//! Every digest in the protocol is computed over UTF-8 JSON with keys sorted
//! lexicographically at every nesting level and no insignificant whitespace.
//! `serde_json`'s default map type is a `BTreeMap`, so routing any
//! serializable value through [`serde_json::Value`] yields the sorted form;
//! compact `to_string` takes care of the whitespace.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Serialize a value to its canonical JSON text.
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    serde_json::to_string(&value)
}

/// Lowercase hex SHA-256 digest of raw bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // --- to_canonical_json ---

    #[test]
    fn keys_sorted_at_top_level() {
        let value = json!({"zebra": 1, "alpha": 2, "mid": 3});
        let text = to_canonical_json(&value).unwrap();
        assert_eq!(text, r#"{"alpha":2,"mid":3,"zebra":1}"#);
    }

    #[test]
    fn keys_sorted_at_every_level() {
        let value = json!({"outer": {"z": 1, "a": {"y": 2, "b": 3}}});
        let text = to_canonical_json(&value).unwrap();
        assert_eq!(text, r#"{"outer":{"a":{"b":3,"y":2},"z":1}}"#);
    }

    #[test]
    fn no_insignificant_whitespace() {
        let value = json!({"a": [1, 2, 3], "b": "text"});
        let text = to_canonical_json(&value).unwrap();
        assert!(!text.contains(' '));
        assert!(!text.contains('\n'));
    }

    #[test]
    fn struct_fields_come_out_sorted() {
        #[derive(serde::Serialize)]
        struct Sample {
            second: u64,
            first: u64,
        }
        let text = to_canonical_json(&Sample { second: 2, first: 1 }).unwrap();
        assert_eq!(text, r#"{"first":1,"second":2}"#);
    }

    #[test]
    fn integers_stay_decimal() {
        let text = to_canonical_json(&json!({"n": 1234567890u64})).unwrap();
        assert_eq!(text, r#"{"n":1234567890}"#);
    }

    #[test]
    fn null_survives() {
        let text = to_canonical_json(&json!({"sig": null})).unwrap();
        assert_eq!(text, r#"{"sig":null}"#);
    }

    // --- sha256_hex ---

    #[test]
    fn sha256_known_vector() {
        // SHA-256 of the empty string.
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn sha256_is_lowercase_hex() {
        let digest = sha256_hex(b"noobcash");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Parsing the canonical text and re-canonicalising is a fixpoint.
            #[test]
            fn canonical_form_is_stable(
                pairs in proptest::collection::btree_map("[a-z]{1,8}", 0u64..1000, 0..8)
            ) {
                let value = serde_json::to_value(&pairs).unwrap();
                let first = to_canonical_json(&value).unwrap();
                let reparsed: serde_json::Value = serde_json::from_str(&first).unwrap();
                prop_assert_eq!(first, to_canonical_json(&reparsed).unwrap());
            }
        }
    }
}
