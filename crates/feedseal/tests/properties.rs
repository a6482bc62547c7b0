//! Property tests over canonical JSON, signatures and the builder.

use std::collections::BTreeSet;

use feedseal::{
    create_signature_data, is_canonical, to_canonical_string, DocumentKind, ParseOptions,
    Protocol, ValidationOptions, Validator,
};
use feedseal::core::{sign_canonical, verify_canonical};
use feedseal_testkit::generators::{item_input, json_entries, json_value, keypair};
use feedseal_testkit::TestFixture;
use proptest::prelude::*;
use serde_json::{Map, Value};

fn object(entries: impl IntoIterator<Item = (String, Value)>) -> Value {
    Value::Object(entries.into_iter().collect::<Map<_, _>>())
}

proptest! {
    #[test]
    fn canonical_is_idempotent(value in json_value()) {
        let once = to_canonical_string(&value).unwrap();
        let reparsed: Value = serde_json::from_str(&once).unwrap();
        let twice = to_canonical_string(&reparsed).unwrap();
        prop_assert_eq!(&once, &twice);
        prop_assert!(is_canonical(&once));
    }

    #[test]
    fn canonical_ignores_insertion_order(entries in json_entries()) {
        let mut seen = BTreeSet::new();
        let entries: Vec<_> = entries.into_iter().filter(|(k, _)| seen.insert(k.clone())).collect();
        let forward = object(entries.clone());
        let backward = object(entries.into_iter().rev());
        prop_assert_eq!(
            to_canonical_string(&forward).unwrap(),
            to_canonical_string(&backward).unwrap()
        );
    }

    #[test]
    fn signature_data_ignores_signature_field(
        entries in json_entries(),
        signature in "ed25519:[A-Za-z0-9+/]{4,12}",
    ) {
        let bare = object(entries.into_iter().filter(|(k, _)| k != "signature"));
        let mut signed = bare.clone();
        if let Value::Object(map) = &mut signed {
            map.insert("signature".into(), Value::String(signature));
        }
        prop_assert_eq!(
            create_signature_data(&bare, DocumentKind::Item),
            create_signature_data(&signed, DocumentKind::Item)
        );
    }

    #[test]
    fn sign_verify_roundtrip(kp in keypair(), value in json_value()) {
        let data = to_canonical_string(&value).unwrap();
        let signature = sign_canonical(&data, &kp.private_envelope()).unwrap();
        prop_assert!(verify_canonical(&data, &signature, &kp.public_key().to_envelope()));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn built_feeds_validate_and_parse(
        inputs in prop::collection::vec(item_input("https://author-66.example"), 1..5),
    ) {
        let fixture = TestFixture::new();
        // Generated slugs may collide; keep the first of each url
        let mut seen = BTreeSet::new();
        let inputs: Vec<_> = inputs.into_iter().filter(|i| seen.insert(i.url.clone())).collect();

        let protocol = Protocol::default();
        let feed = protocol
            .builder()
            .create_complete_feed(fixture.metadata(), inputs.clone(), &fixture.private_key())
            .unwrap();
        prop_assert_eq!(feed.items.len(), inputs.len());
        prop_assert!(feed.items.iter().all(|i| i.tags().len() <= 20));

        let doc = feed.to_value().unwrap();
        let validation = Validator::new().validate_document(&doc, &ValidationOptions::strict());
        prop_assert!(validation.valid, "{:?}", validation.errors);

        let parsed = protocol.parser().parse(&doc, &ParseOptions::strict());
        prop_assert!(parsed.success, "{:?}", parsed.errors);
        prop_assert!(parsed.signatures.unwrap().all_valid);
    }
}
