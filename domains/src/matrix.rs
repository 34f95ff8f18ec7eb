//! The selection matrix: one bucket choice per `(field path, aspect)`.

use crate::Aspect;
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A full bucket selection for a schema. Aspects with no entry are sampled
/// uniformly over their buckets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionMatrix {
    pub schema: String,
    selections: BTreeMap<String, BTreeMap<Aspect, String>>,
}

impl SelectionMatrix {
    pub fn new<S: Into<String>>(schema: S) -> Self {
        Self {
            schema: schema.into(),
            selections: BTreeMap::new(),
        }
    }

    /// Sets the bucket for an aspect of a field.
    pub fn select<F: Into<String>, B: Into<String>>(&mut self, field: F, aspect: Aspect, bucket: B) {
        self.selections
            .entry(field.into())
            .or_default()
            .insert(aspect, bucket.into());
    }

    /// Returns the selected bucket id for an aspect of a field.
    pub fn get(&self, field: &str, aspect: Aspect) -> Option<&str> {
        self.selections
            .get(field)
            .and_then(|aspects| aspects.get(&aspect))
            .map(String::as_str)
    }

    /// Iterates over every `(field, aspect, bucket)` selection.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Aspect, &str)> {
        self.selections.iter().flat_map(|(field, aspects)| {
            aspects
                .iter()
                .map(move |(aspect, bucket)| (field.as_str(), *aspect, bucket.as_str()))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }
}
