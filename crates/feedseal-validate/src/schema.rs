//! Base document schema and custom extension-schema merging.
//!
//! A custom fragment has the shape
//!
//! ```json
//! {
//!   "properties":  { "_myns_field": { ... } },
//!   "definitions": { ... },
//!   "required":    ["_myns_field"],
//!   "items":       { "properties": { ... }, "required": [ ... ] }
//! }
//! ```
//!
//! Its property names extend the known-field sets used by the structural
//! pass and its `required` lists extend the required fields. The property
//! constraints themselves are compiled into a Draft 7 schema whose
//! `definitions` are the base definitions overlaid with the fragment's, so a
//! fragment can `$ref` base definitions such as `#/definitions/httpsUrl`.
//! The base schema is never mutated.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use feedseal_core::canonical;
use jsonschema::error::ValidationErrorKind;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::diagnostic::{pointer_to_path, Diagnostic, DiagnosticCode};

/// The base document schema, in JSON Schema Draft 7 form.
pub fn base_schema() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "required": ["version", "title", "home_page_url", "feed_url", "author", "items"],
        "properties": {
            "version": {"type": "string", "format": "uri"},
            "title": {"type": "string", "minLength": 1},
            "home_page_url": {"$ref": "#/definitions/httpsUrl"},
            "feed_url": {"$ref": "#/definitions/httpsUrl"},
            "description": {"type": "string"},
            "icon": {"$ref": "#/definitions/httpsUrl"},
            "language": {"type": "string", "pattern": "^[a-z]{2,3}(-[A-Za-z0-9]+)*$"},
            "author": {"$ref": "#/definitions/author"},
            "items": {"type": "array", "items": {"$ref": "#/definitions/item"}},
            "signature": {"type": "string"}
        },
        "patternProperties": {"^_": {}},
        "additionalProperties": false,
        "definitions": {
            "httpsUrl": {"type": "string", "format": "uri", "pattern": "^https://"},
            "dateTime": {"type": "string", "format": "date-time"},
            "envelope": {"type": "string", "pattern": "^ed25519:[A-Za-z0-9+/]+={0,2}$"},
            "author": {
                "type": "object",
                "required": ["name", "public_key"],
                "properties": {
                    "name": {"type": "string", "minLength": 1},
                    "public_key": {"$ref": "#/definitions/envelope"},
                    "url": {"$ref": "#/definitions/httpsUrl"},
                    "avatar": {"$ref": "#/definitions/httpsUrl"}
                },
                "patternProperties": {"^_": {}},
                "additionalProperties": false
            },
            "attachment": {
                "type": "object",
                "required": ["url", "mime_type"],
                "properties": {
                    "url": {"$ref": "#/definitions/httpsUrl"},
                    "mime_type": {"type": "string", "pattern": "^[a-z]+/[a-z0-9.+-]+$"},
                    "title": {"type": "string"},
                    "size_in_bytes": {"type": "integer", "minimum": 0},
                    "width": {"type": "integer", "exclusiveMinimum": 0},
                    "height": {"type": "integer", "exclusiveMinimum": 0},
                    "duration_in_seconds": {"type": "number", "minimum": 0},
                    "alt_text": {"type": "string"}
                },
                "patternProperties": {"^_": {}},
                "additionalProperties": false
            },
            "item": {
                "type": "object",
                "required": ["id", "url", "date_published"],
                "properties": {
                    "id": {"$ref": "#/definitions/httpsUrl"},
                    "url": {"$ref": "#/definitions/httpsUrl"},
                    "uuid": {"type": "string", "format": "uuid"},
                    "title": {"type": "string"},
                    "summary": {"type": "string"},
                    "date_published": {"$ref": "#/definitions/dateTime"},
                    "date_modified": {"$ref": "#/definitions/dateTime"},
                    "tags": {"type": "array", "items": {"type": "string"}, "maxItems": 20},
                    "in_reply_to": {"$ref": "#/definitions/httpsUrl"},
                    "content_text": {"type": "string"},
                    "content_html": {"type": "string"},
                    "content_markdown": {"type": "string"},
                    "author": {"$ref": "#/definitions/author"},
                    "attachments": {"type": "array", "items": {"$ref": "#/definitions/attachment"}},
                    "interactions": {"type": "object"},
                    "signature": {"type": "string"}
                },
                "patternProperties": {"^_": {}},
                "additionalProperties": false
            }
        }
    })
}

/// Field names and required lists contributed by a custom fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomFields {
    pub feed_properties: BTreeSet<String>,
    pub feed_required: Vec<String>,
    pub item_properties: BTreeSet<String>,
    pub item_required: Vec<String>,
}

impl CustomFields {
    pub fn from_fragment(fragment: &Value) -> Self {
        let item = fragment.get("items").unwrap_or(&Value::Null);
        Self {
            feed_properties: property_names(fragment),
            feed_required: required_names(fragment),
            item_properties: property_names(item),
            item_required: required_names(item),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn property_names(fragment: &Value) -> BTreeSet<String> {
    fragment
        .get("properties")
        .and_then(Value::as_object)
        .map(|m| m.keys().cloned().collect())
        .unwrap_or_default()
}

fn required_names(fragment: &Value) -> Vec<String> {
    fragment
        .get("required")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

/// Build the Draft 7 schema checking only the fragment's property constraints.
///
/// `required` is left to the structural pass, which reports missing fields
/// with their exact path.
pub fn merge_custom(fragment: &Value) -> Value {
    let mut definitions = base_schema()
        .get("definitions")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    if let Some(custom) = fragment.get("definitions").and_then(Value::as_object) {
        for (name, def) in custom {
            definitions.insert(name.clone(), def.clone());
        }
    }

    let mut properties: Map<String, Value> = fragment
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    if let Some(item_props) = fragment
        .get("items")
        .and_then(|i| i.get("properties"))
        .and_then(Value::as_object)
    {
        properties.insert(
            "items".into(),
            json!({
                "type": "array",
                "items": {"type": "object", "properties": item_props}
            }),
        );
    }

    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "properties": properties,
        "definitions": definitions
    })
}

/// Compiled custom schemas keyed by the Blake3 hash of the fragment's
/// canonical form.
#[derive(Default)]
pub struct SchemaCache {
    compiled: Mutex<HashMap<String, Arc<jsonschema::Validator>>>,
}

impl std::fmt::Debug for SchemaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaCache")
            .field("entries", &self.len())
            .finish()
    }
}

/// Cache key for a fragment. Independent of key order.
pub fn fragment_key(fragment: &Value) -> String {
    blake3::hash(canonical::serialize(fragment).as_bytes())
        .to_hex()
        .to_string()
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.compiled.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.compiled.lock().clear();
    }

    /// Fetch or compile the schema for `fragment`.
    ///
    /// Fragments that fail to compile produce an `INVALID_SCHEMA` diagnostic
    /// and are not cached.
    pub fn get_or_compile(
        &self,
        fragment: &Value,
    ) -> std::result::Result<Arc<jsonschema::Validator>, Diagnostic> {
        if !fragment.is_object() {
            return Err(Diagnostic::new(
                DiagnosticCode::InvalidSchema,
                "",
                "custom schema must be a JSON object",
            ));
        }

        let key = fragment_key(fragment);
        if let Some(hit) = self.compiled.lock().get(&key) {
            return Ok(Arc::clone(hit));
        }

        let schema = merge_custom(fragment);
        let mut opts = jsonschema::options();
        opts.with_draft(jsonschema::Draft::Draft7);
        let validator = opts.build(&schema).map_err(|e| {
            Diagnostic::new(
                DiagnosticCode::InvalidSchema,
                "",
                format!("custom schema does not compile: {e}"),
            )
        })?;

        debug!(key = %key, "compiled custom schema");
        let validator = Arc::new(validator);
        // A concurrent compile of the same fragment may have won; keep the first.
        let mut compiled = self.compiled.lock();
        Ok(Arc::clone(compiled.entry(key).or_insert(validator)))
    }
}

/// Run a compiled custom schema and map its errors to diagnostics.
pub fn check_custom(validator: &jsonschema::Validator, instance: &Value) -> Vec<Diagnostic> {
    validator
        .iter_errors(instance)
        .map(|e| {
            let code = match &e.kind {
                ValidationErrorKind::Required { .. } => DiagnosticCode::MissingRequiredField,
                ValidationErrorKind::Type { .. } => DiagnosticCode::InvalidType,
                ValidationErrorKind::Pattern { .. } => DiagnosticCode::InvalidPattern,
                ValidationErrorKind::Format { .. } => DiagnosticCode::InvalidFormat,
                _ => DiagnosticCode::SchemaViolation,
            };
            Diagnostic::new(code, pointer_to_path(&e.instance_path.to_string()), e.to_string())
                .with_details(json!({"schema_path": e.schema_path.to_string()}))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment() -> Value {
        json!({
            "definitions": {"score": {"type": "integer", "minimum": 0}},
            "properties": {
                "_ratings_source": {"$ref": "#/definitions/httpsUrl"},
                "_ratings_score": {"$ref": "#/definitions/score"}
            },
            "required": ["_ratings_source"],
            "items": {
                "properties": {"_ratings_stars": {"type": "integer", "maximum": 5}},
                "required": ["_ratings_stars"]
            }
        })
    }

    #[test]
    fn test_base_schema_compiles() {
        let mut opts = jsonschema::options();
        opts.with_draft(jsonschema::Draft::Draft7);
        assert!(opts.build(&base_schema()).is_ok());
    }

    #[test]
    fn test_custom_fields_extracted() {
        let fields = CustomFields::from_fragment(&fragment());
        assert!(fields.feed_properties.contains("_ratings_score"));
        assert_eq!(fields.feed_required, vec!["_ratings_source".to_string()]);
        assert!(fields.item_properties.contains("_ratings_stars"));
        assert_eq!(fields.item_required, vec!["_ratings_stars".to_string()]);
        assert!(CustomFields::from_fragment(&json!({})).is_empty());
    }

    #[test]
    fn test_merge_does_not_touch_base() {
        let before = base_schema();
        let merged = merge_custom(&fragment());
        assert_eq!(base_schema(), before);
        assert!(merged["definitions"].get("httpsUrl").is_some());
        assert!(merged["definitions"].get("score").is_some());
        assert!(before["definitions"].get("score").is_none());
    }

    #[test]
    fn test_cache_key_ignores_key_order() {
        let a = json!({"properties": {"_a": {}, "_b": {}}});
        let b = json!({"properties": {"_b": {}, "_a": {}}});
        assert_eq!(fragment_key(&a), fragment_key(&b));
        assert_ne!(fragment_key(&a), fragment_key(&json!({})));
    }

    #[test]
    fn test_cache_reuses_compiled() {
        let cache = SchemaCache::new();
        let first = cache.get_or_compile(&fragment()).unwrap();
        let second = cache.get_or_compile(&fragment()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_custom_errors_mapped() {
        let cache = SchemaCache::new();
        let validator = cache.get_or_compile(&fragment()).unwrap();
        let doc = json!({
            "_ratings_source": "http://ratings.example",
            "_ratings_score": "high",
            "items": [{"_ratings_stars": 9}]
        });
        let diags = check_custom(&validator, &doc);
        let find = |field: &str| diags.iter().find(|d| d.field == field).map(|d| d.code);
        assert_eq!(find("_ratings_source"), Some(DiagnosticCode::InvalidPattern));
        assert_eq!(find("_ratings_score"), Some(DiagnosticCode::InvalidType));
        assert_eq!(find("items[0]._ratings_stars"), Some(DiagnosticCode::SchemaViolation));
    }

    #[test]
    fn test_non_object_fragment_rejected() {
        let cache = SchemaCache::new();
        let err = cache.get_or_compile(&json!([1])).unwrap_err();
        assert_eq!(err.code, DiagnosticCode::InvalidSchema);
        assert!(cache.is_empty());
    }
}
