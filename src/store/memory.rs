//! In-process document store for local runs and tests.

use std::cmp::Ordering;

use async_trait::async_trait;
use dashmap::DashMap;
use indexmap::IndexMap;
use indexmap::map::Entry;
use serde_json::Value;

use super::{Collection, Direction, Document, DocumentStore, Fields, Query, SetAdd, StoreError};

/// Collections kept in insertion order. Each collection sits behind its
/// DashMap shard lock, so every operation below is atomic per collection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: DashMap<Collection, IndexMap<String, Fields>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Order JSON values the way the query layer needs: numbers numerically,
/// strings lexically, absent values first.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.collections.get(&collection).and_then(|docs| {
            docs.get(id).map(|fields| Document {
                id: id.to_owned(),
                fields: fields.clone(),
            })
        }))
    }

    async fn query(
        &self,
        collection: Collection,
        query: &Query,
    ) -> Result<Vec<Document>, StoreError> {
        let mut results: Vec<Document> = match self.collections.get(&collection) {
            Some(docs) => docs
                .iter()
                .filter(|(_, fields)| match &query.filter {
                    Some((field, value)) => fields.get(field) == Some(value),
                    None => true,
                })
                .map(|(id, fields)| Document {
                    id: id.clone(),
                    fields: fields.clone(),
                })
                .collect(),
            None => Vec::new(),
        };

        if let Some((field, direction)) = &query.order_by {
            // Stable sort keeps insertion order among equal keys.
            results.sort_by(|a, b| {
                let ord = compare_values(a.fields.get(field), b.fields.get(field));
                match direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            });
        }

        Ok(results)
    }

    async fn create(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> Result<bool, StoreError> {
        let mut docs = self.collections.entry(collection).or_default();
        match docs.entry(id.to_owned()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(fields);
                Ok(true)
            }
        }
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> Result<bool, StoreError> {
        let Some(mut docs) = self.collections.get_mut(&collection) else {
            return Ok(false);
        };
        let Some(existing) = docs.get_mut(id) else {
            return Ok(false);
        };
        for (key, value) in fields {
            existing.insert(key, value);
        }
        Ok(true)
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        Ok(self
            .collections
            .get_mut(&collection)
            .is_some_and(|mut docs| docs.shift_remove(id).is_some()))
    }

    async fn add_to_set(
        &self,
        collection: Collection,
        id: &str,
        field: &str,
        value: &str,
    ) -> Result<SetAdd, StoreError> {
        let Some(mut docs) = self.collections.get_mut(&collection) else {
            return Ok(SetAdd::Missing);
        };
        let Some(existing) = docs.get_mut(id) else {
            return Ok(SetAdd::Missing);
        };

        let slot = existing
            .entry(field.to_owned())
            .or_insert_with(|| Value::Array(Vec::new()));
        if slot.is_null() {
            *slot = Value::Array(Vec::new());
        }
        let Value::Array(items) = slot else {
            return Err(StoreError::NotAnArray {
                collection: collection.as_str(),
                id: id.to_owned(),
                field: field.to_owned(),
            });
        };

        if items.iter().any(|item| item.as_str() == Some(value)) {
            Ok(SetAdd::AlreadyPresent)
        } else {
            items.push(Value::String(value.to_owned()));
            Ok(SetAdd::Added)
        }
    }
}
