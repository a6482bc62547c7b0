//! End-to-end scenarios: build, sign, tamper, validate and parse.

use feedseal::core::{build_chain, verify_chain, ChainBreak, KeyMatch};
use feedseal::{
    sign_content, verify_signature, DiagnosticCode, FeedMetadata, ItemInput, ParseOptions,
    Protocol, ProtocolConfig, SignatureLevel, ValidationOptions, Validator,
};
use feedseal_testkit::{multi_author_fixtures, TestFixture};
use serde_json::{json, Value};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn signed_doc(fixture: &TestFixture, items: usize) -> Value {
    fixture.signed_feed(items).to_value().unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Signatures
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_sign_verify_roundtrip() {
    let fixture = TestFixture::new();
    let content = json!({"title": "hello", "tags": ["a", "b"]});
    let signature = sign_content(&content, &fixture.private_key()).unwrap();
    assert!(verify_signature(&content, &signature, &fixture.public_key()));
}

#[test]
fn test_tampered_content_rejected() {
    let fixture = TestFixture::new();
    let content = json!({"title": "hello"});
    let signature = sign_content(&content, &fixture.private_key()).unwrap();
    assert!(!verify_signature(&json!({"title": "hellO"}), &signature, &fixture.public_key()));
}

#[test]
fn test_other_key_rejected() {
    let authors = multi_author_fixtures(2);
    let content = json!({"title": "hello"});
    let signature = sign_content(&content, &authors[0].private_key()).unwrap();
    assert!(!verify_signature(&content, &signature, &authors[1].public_key()));
}

#[test]
fn test_replayed_item_signature_rejected() {
    init_tracing();
    let mut doc = signed_doc(&TestFixture::new(), 2);
    let stolen = doc["items"][0]["signature"].clone();
    doc["items"][1]["signature"] = stolen;

    let result = Protocol::default().parse(&doc);
    assert!(result.success);
    let report = result.signatures.unwrap();
    assert!(!report.all_valid);
    assert_eq!(report.summary.invalid, 2, "item 1 and the feed");
}

#[test]
fn test_feed_signed_by_impostor_rejected() {
    let authors = multi_author_fixtures(2);
    let mut doc = signed_doc(&authors[0], 1);
    let impostor = authors[1].signed_feed(1).to_value().unwrap();
    doc["signature"] = impostor["signature"].clone();

    let protocol = Protocol::new(ProtocolConfig::strict());
    let result = protocol.parse(&doc);
    assert!(!result.success);
    assert!(result.has_error(DiagnosticCode::InvalidFeedSignature));
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_builder_output_validates() {
    let doc = signed_doc(&TestFixture::new(), 5);
    let result = Validator::new().validate_document(&doc, &ValidationOptions::strict());
    assert!(result.valid, "{:?}", result.errors);
}

#[test]
fn test_missing_title() {
    let mut doc = signed_doc(&TestFixture::new(), 1);
    doc.as_object_mut().unwrap().remove("title");
    let result = Validator::new().validate_document(&doc, &ValidationOptions::default());
    assert!(!result.valid);
    assert!(result
        .errors
        .iter()
        .any(|d| d.code == DiagnosticCode::MissingRequiredField && d.field == "title"));
}

#[test]
fn test_http_home_page_rejected() {
    let mut doc = signed_doc(&TestFixture::new(), 1);
    doc["home_page_url"] = json!("http://author-66.example");
    let result = Validator::new().validate_document(&doc, &ValidationOptions::default());
    assert!(!result.valid);
    let diag = result
        .errors
        .iter()
        .find(|d| d.field == "home_page_url")
        .unwrap();
    assert_eq!(diag.code, DiagnosticCode::InvalidPattern);
}

#[test]
fn test_duplicate_item_ids() {
    let mut doc = signed_doc(&TestFixture::new(), 3);
    let first_id = doc["items"][0]["id"].clone();
    doc["items"][2]["id"] = first_id;
    let result = Validator::new().validate_document(&doc, &ValidationOptions::default());
    assert!(!result.valid);
    assert!(result
        .errors
        .iter()
        .any(|d| d.code == DiagnosticCode::DuplicateItemId && d.field == "items[2].id"));
}

#[test]
fn test_validate_str_rejects_garbage() {
    let protocol = Protocol::default();
    let result = protocol.validate_str("not json");
    assert!(!result.valid);
    assert_eq!(result.errors[0].code, DiagnosticCode::InvalidJson);
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_items_only_level() {
    init_tracing();
    let mut doc = signed_doc(&TestFixture::new(), 2);
    doc["signature"] = json!("not a signature");
    let options = ParseOptions::strict().level(SignatureLevel::ItemsOnly);
    let protocol = Protocol::default();

    let result = protocol.parser().parse(&doc, &options);
    assert!(result.success, "{:?}", result.errors);

    doc["items"][0]["title"] = json!("rewritten");
    let result = protocol.parser().parse(&doc, &options);
    assert!(!result.success);
    assert!(result.has_error(DiagnosticCode::InvalidItemSignature));
    assert!(!result.has_error(DiagnosticCode::InvalidFeedSignature));
}

#[test]
fn test_malformed_item_signature_is_a_warning_when_lenient() {
    let mut doc = signed_doc(&TestFixture::new(), 2);
    doc["items"][1]["signature"] = json!("ed25519:%%%");

    let protocol = Protocol::default();
    assert!(protocol.validate(&doc).valid);
    let result = protocol.parse(&doc);
    assert!(result.success, "{:?}", result.errors);
    assert!(result.has_warning(DiagnosticCode::InvalidItemSignature));

    let strict = Protocol::new(ProtocolConfig::strict()).parse(&doc);
    assert!(!strict.success);
    assert!(strict.has_error(DiagnosticCode::InvalidItemSignature));
}

#[test]
fn test_parsed_items_still_verify() {
    // Fixture items are oldest first, so parsing reorders them; item
    // signatures are independent of position
    let protocol = Protocol::new(ProtocolConfig::strict());
    let parsed = protocol.parse(&signed_doc(&TestFixture::new(), 3));
    assert!(parsed.success, "{:?}", parsed.errors);
    let doc = parsed.feed.unwrap().to_value().unwrap();

    let options = ParseOptions::strict().level(SignatureLevel::ItemsOnly);
    let again = protocol.parser().parse(&doc, &options);
    assert!(again.success, "{:?}", again.errors);
    assert_eq!(again.signatures.unwrap().summary.valid, 3);
}

#[test]
fn test_markdown_heading_roundtrip() {
    let fixture = TestFixture::new();
    let protocol = Protocol::default();
    let feed = protocol.create_feed(fixture.metadata()).unwrap();
    let feed = protocol
        .builder()
        .add_item(
            &feed,
            ItemInput::new("https://author-66.example/h").markdown("# H"),
            &fixture.private_key(),
        )
        .unwrap();

    let item = &feed.items[0];
    assert!(item.content_html.as_deref().unwrap().contains("<h1>"));
    assert_eq!(item.content_text.as_deref(), Some("H"));
    assert_eq!(item.content_markdown.as_deref(), Some("# H"));

    let parsed = protocol.parse(&feed.to_value().unwrap());
    assert!(parsed.success, "{:?}", parsed.errors);
    assert_eq!(parsed.feed.unwrap().items[0].content_text.as_deref(), Some("H"));
}

#[test]
fn test_parse_str_roundtrip() {
    let fixture = TestFixture::new();
    let text = serde_json::to_string_pretty(&fixture.signed_feed(2)).unwrap();
    let result = Protocol::new(ProtocolConfig::strict()).parse_str(&text);
    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.metadata.unwrap().size_bytes, text.len());
}

#[test]
fn test_multi_author_items() {
    let authors = multi_author_fixtures(2);
    let protocol = Protocol::default();
    let feed = protocol.create_feed(authors[0].metadata()).unwrap();
    let feed = protocol
        .builder()
        .add_item(
            &feed,
            ItemInput::new("https://author-0.example/own").text("mine"),
            &authors[0].private_key(),
        )
        .unwrap();
    let feed = protocol
        .builder()
        .add_item(
            &feed,
            ItemInput::new("https://author-0.example/guest")
                .text("guest post")
                .author(authors[1].author()),
            &authors[1].private_key(),
        )
        .unwrap();
    let feed = protocol.builder().sign_feed(&feed, &authors[0].private_key()).unwrap();

    let result = protocol.parse(&feed.to_value().unwrap());
    let report = result.signatures.unwrap();
    assert!(report.all_valid);
    let guest = report.items.iter().find(|i| i.id.ends_with("/guest")).unwrap();
    assert_eq!(guest.public_key.as_deref(), Some(authors[1].public_key().as_str()));
}

// ─────────────────────────────────────────────────────────────────────────────
// Keys and chains
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_rotated_key_still_verifies_history() {
    init_tracing();
    let protocol = Protocol::default();
    protocol.generate_key_pair("ada").unwrap();
    let content = json!({"note": "before rotation"});
    let signature = protocol.keys().sign("ada", &content).unwrap();

    protocol.rotate_key("ada").unwrap();
    assert_eq!(
        protocol.keys().verify_with_history("ada", &content, &signature),
        Some(KeyMatch::Retired { index: 0 })
    );

    let fresh = protocol.keys().sign("ada", &content).unwrap();
    assert_eq!(
        protocol.keys().verify_with_history("ada", &content, &fresh),
        Some(KeyMatch::Active)
    );
}

#[test]
fn test_managed_key_feed() {
    let protocol = Protocol::new(ProtocolConfig::strict());
    protocol.generate_key_pair("ada").unwrap();
    let mut metadata = TestFixture::new().metadata();
    metadata.author.public_key = protocol.public_key("ada").unwrap();

    let feed = protocol
        .create_complete_feed(metadata, vec![ItemInput::new("https://author-66.example/m").text("x")], "ada")
        .unwrap();
    assert!(protocol.parse(&feed.to_value().unwrap()).success);
}

#[test]
fn test_chain_over_feed_items() {
    let fixture = TestFixture::new();
    let doc = signed_doc(&fixture, 3);
    let items = doc["items"].as_array().unwrap().clone();

    let chain = build_chain(&items, &fixture.private_key()).unwrap();
    assert!(verify_chain(&chain, &fixture.public_key()).valid);

    let mut reordered = chain.clone();
    reordered.swap(1, 2);
    let report = verify_chain(&reordered, &fixture.public_key());
    assert!(!report.valid);
    assert_eq!(report.broken_at, Some(1));
    assert!(matches!(report.reason, Some(ChainBreak::IndexMismatch { .. })));
}

#[test]
fn test_metadata_only_is_cheap() {
    let protocol = Protocol::default();
    let result = protocol.parser().parse_metadata_only(&signed_doc(&TestFixture::new(), 4));
    let meta = result.metadata.unwrap();
    assert_eq!(meta.item_count, 4);
    assert_eq!(meta.signed_items, 4);
    assert_eq!(protocol.stats().validation.operations, 0);
}

#[test]
fn test_feed_metadata_builder() {
    let fixture = TestFixture::new();
    let metadata = FeedMetadata::new(" Spaced ", fixture.origin.clone(), format!("{}/f", fixture.origin), fixture.author())
        .extension("theme", json!("dark"));
    let feed = Protocol::default().create_feed(metadata).unwrap();
    assert_eq!(feed.title, "Spaced");
    assert_eq!(feed.extensions.get("_theme"), Some(&json!("dark")));
}
