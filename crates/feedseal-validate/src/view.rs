//! Read-only accessors over an untyped document.
//!
//! Business rules run over these views instead of the typed model so they
//! still work on documents that failed structural checks.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::diagnostic::{field_path, index_path};

/// A feed document seen as a JSON object.
#[derive(Debug, Clone, Copy)]
pub struct DocumentView<'a> {
    root: &'a Map<String, Value>,
}

impl<'a> DocumentView<'a> {
    /// `None` when the value is not an object.
    pub fn new(value: &'a Value) -> Option<Self> {
        value.as_object().map(|root| Self { root })
    }

    pub fn fields(&self) -> &'a Map<String, Value> {
        self.root
    }

    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.root.get(name)
    }

    pub fn str_field(&self, name: &str) -> Option<&'a str> {
        self.root.get(name).and_then(Value::as_str)
    }

    pub fn author(&self) -> Option<&'a Map<String, Value>> {
        self.root.get("author").and_then(Value::as_object)
    }

    /// Items that are objects, with their positions.
    pub fn items(&self) -> impl Iterator<Item = ItemView<'a>> + 'a {
        self.root
            .get("items")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .enumerate()
            .filter_map(|(index, value)| ItemView::at(index, value))
    }
}

/// One item, either inside a document or standalone.
#[derive(Debug, Clone, Copy)]
pub struct ItemView<'a> {
    index: Option<usize>,
    map: &'a Map<String, Value>,
}

impl<'a> ItemView<'a> {
    fn at(index: usize, value: &'a Value) -> Option<Self> {
        value.as_object().map(|map| Self {
            index: Some(index),
            map,
        })
    }

    /// An item validated on its own; paths have no `items[i]` prefix.
    pub fn standalone(value: &'a Value) -> Option<Self> {
        value.as_object().map(|map| Self { index: None, map })
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Path prefix of this item.
    pub fn base_path(&self) -> String {
        match self.index {
            Some(i) => index_path("items", i),
            None => String::new(),
        }
    }

    /// Path of one of this item's fields.
    pub fn path(&self, field: &str) -> String {
        field_path(&self.base_path(), field)
    }

    pub fn fields(&self) -> &'a Map<String, Value> {
        self.map
    }

    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.map.get(name)
    }

    pub fn str_field(&self, name: &str) -> Option<&'a str> {
        self.map.get(name).and_then(Value::as_str)
    }

    pub fn id(&self) -> Option<&'a str> {
        self.str_field("id")
    }

    pub fn author(&self) -> Option<&'a Map<String, Value>> {
        self.map.get("author").and_then(Value::as_object)
    }

    /// Attachments that are objects, with their positions.
    pub fn attachments(&self) -> impl Iterator<Item = (usize, &'a Map<String, Value>)> + 'a {
        self.map
            .get("attachments")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .enumerate()
            .filter_map(|(i, v)| v.as_object().map(|m| (i, m)))
    }
}

/// Item positions keyed by id.
#[derive(Debug, Default)]
pub struct ItemIndex<'a> {
    positions: HashMap<&'a str, Vec<usize>>,
}

impl<'a> ItemIndex<'a> {
    pub fn build(doc: &DocumentView<'a>) -> Self {
        let mut positions: HashMap<&'a str, Vec<usize>> = HashMap::new();
        for item in doc.items() {
            if let (Some(id), Some(index)) = (item.id(), item.index()) {
                positions.entry(id).or_default().push(index);
            }
        }
        Self { positions }
    }

    /// First position of `id`.
    pub fn first(&self, id: &str) -> Option<usize> {
        self.positions.get(id).and_then(|p| p.first().copied())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Every repeat occurrence as `(id, first, repeat)`, ordered by `repeat`.
    pub fn duplicates(&self) -> Vec<(&'a str, usize, usize)> {
        let mut out: Vec<(&'a str, usize, usize)> = self
            .positions
            .iter()
            .flat_map(|(id, p)| p.iter().skip(1).map(move |&later| (*id, p[0], later)))
            .collect();
        out.sort_by_key(|&(_, _, later)| later);
        out
    }
}
