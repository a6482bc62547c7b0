//! Proptest generators for property-based testing.

use feedseal_builder::ItemInput;
use feedseal_core::Keypair;
use proptest::prelude::*;
use serde_json::{Map, Number, Value};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Object keys, including non-ASCII and `_`-prefixed ones.
pub fn json_key() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-z_]{0,7}",
        "_[a-z]{1,6}",
        "[A-Za-zéü☕]{1,4}",
    ]
}

fn json_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(Number::from(n))),
        ".{0,12}".prop_map(Value::String),
    ]
}

/// Arbitrary JSON values up to four levels deep.
pub fn json_value() -> impl Strategy<Value = Value> {
    json_leaf().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec((json_key(), inner), 0..6)
                .prop_map(|entries| Value::Object(entries.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

/// Key/value entries for building an object in a chosen order.
pub fn json_entries() -> impl Strategy<Value = Vec<(String, Value)>> {
    prop::collection::vec((json_key(), json_value()), 0..8)
}

/// Tags in mixed case with stray whitespace.
pub fn raw_tag() -> impl Strategy<Value = String> {
    "[ ]?[A-Za-z][A-Za-z0-9]{0,8}( [a-z]{1,4})?[ ]?"
}

/// RFC 3339 timestamps in 2020-2029.
pub fn date() -> impl Strategy<Value = String> {
    (2020u32..2030, 1u32..=12, 1u32..=28, 0u32..24, 0u32..60).prop_map(|(y, mo, d, h, mi)| {
        format!("{y:04}-{mo:02}-{d:02}T{h:02}:{mi:02}:00Z")
    })
}

/// Valid item input under `origin` with some content.
pub fn item_input(origin: &'static str) -> impl Strategy<Value = ItemInput> {
    (
        "[a-z0-9]{1,12}",
        proptest::option::of("[A-Za-z][A-Za-z ]{0,30}"),
        prop_oneof![
            "[A-Za-z][A-Za-z .]{0,60}".prop_map(|t| ItemInput::default().text(t)),
            "[A-Za-z][A-Za-z ]{0,30}".prop_map(|m| ItemInput::default().markdown(format!("## {m}"))),
            "[A-Za-z][A-Za-z ]{0,30}".prop_map(|h| ItemInput::default().html(format!("<p>{h}</p>"))),
        ],
        prop::collection::vec(raw_tag(), 0..30),
        date(),
    )
        .prop_map(move |(slug, title, content, tags, date)| {
            let mut input = ItemInput {
                url: format!("{origin}/{slug}"),
                tags,
                ..content
            }
            .date_published(date);
            if let Some(title) = title {
                input = input.title(title);
            }
            input
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedseal_core::{is_canonical, to_canonical_string};

    proptest! {
        #[test]
        fn test_canonical_output_is_canonical(value in json_value()) {
            let canonical = to_canonical_string(&value).unwrap();
            prop_assert!(is_canonical(&canonical));
        }

        #[test]
        fn test_item_input_has_content(input in item_input("https://gen.example")) {
            prop_assert!(input.url.starts_with("https://gen.example/"));
            prop_assert!(
                input.content_text.is_some()
                    || input.content_markdown.is_some()
                    || input.content_html.is_some()
            );
        }
    }
}
