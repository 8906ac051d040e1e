//! Document store abstraction.
//!
//! The service persists everything as JSON documents in named collections,
//! addressed by `(collection, id)`. Backends only need a handful of
//! primitives; every set mutation the domain performs maps onto one of them
//! so it stays atomic without read-modify-write cycles:
//!
//! - [`DocumentStore::create`] is create-if-absent, used for deterministic keys.
//! - [`DocumentStore::update`] merges top-level fields, never the whole document.
//! - [`DocumentStore::add_to_set`] inserts into an array field at most once.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Top-level fields of a stored document.
pub type Fields = Map<String, Value>;

/// Named collections used by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Doubts,
    Connections,
    ConnectionRequests,
    Sessions,
}

impl Collection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Doubts => "doubts",
            Collection::Connections => "connections",
            Collection::ConnectionRequests => "connectionRequests",
            Collection::Sessions => "sessions",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database operation failed")]
    Database(#[from] sqlx::Error),
    #[error("failed to decode {collection}/{id} at `{path}`")]
    Decode {
        collection: &'static str,
        id: String,
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode document fields")]
    Encode(#[source] serde_json::Error),
    #[error("`{0}` is not a queryable field name")]
    InvalidField(String),
    #[error("field `{field}` of {collection}/{id} is not an array")]
    NotAnArray {
        collection: &'static str,
        id: String,
        field: String,
    },
}

/// A stored document: its id plus its top-level fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    /// Deserialize into a typed model. The document id is exposed to the
    /// model as an `id` field.
    pub fn decode<T: DeserializeOwned>(self, collection: Collection) -> Result<T, StoreError> {
        let Document { id, mut fields } = self;
        fields.insert("id".to_owned(), Value::String(id.clone()));
        serde_path_to_error::deserialize(Value::Object(fields)).map_err(|e| StoreError::Decode {
            collection: collection.as_str(),
            id,
            path: e.path().to_string(),
            source: e.into_inner(),
        })
    }
}

/// Decode every document of a query result, failing on the first bad one.
pub fn decode_all<T: DeserializeOwned>(
    documents: Vec<Document>,
    collection: Collection,
) -> Result<Vec<T>, StoreError> {
    documents
        .into_iter()
        .map(|doc| doc.decode(collection))
        .collect()
}

/// Serialize a model into document fields. A top-level `id` is dropped
/// because it lives in the document key.
pub fn to_fields<T: Serialize>(value: &T) -> Result<Fields, StoreError> {
    match serde_json::to_value(value).map_err(StoreError::Encode)? {
        Value::Object(mut fields) => {
            fields.remove("id");
            Ok(fields)
        }
        other => Err(StoreError::Encode(serde::ser::Error::custom(format!(
            "expected an object, got {other}"
        )))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Equality filter plus ordering over top-level fields.
///
/// Without an ordering, results come back in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filter: Option<(String, Value)>,
    pub order_by: Option<(String, Direction)>,
}

impl Query {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn field_eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            filter: Some((field.into(), value.into())),
            order_by: None,
        }
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }
}

/// Outcome of [`DocumentStore::add_to_set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetAdd {
    Added,
    AlreadyPresent,
    Missing,
}

#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Short backend name for status reporting.
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> Result<(), StoreError>;

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError>;

    async fn query(&self, collection: Collection, query: &Query)
    -> Result<Vec<Document>, StoreError>;

    /// Insert a new document. Returns `false` without writing if the id is taken.
    async fn create(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> Result<bool, StoreError>;

    /// Merge `fields` into an existing document. Returns `false` if it does not exist.
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> Result<bool, StoreError>;

    /// Returns `false` if there was nothing to delete.
    async fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError>;

    /// Atomically append `value` to the array `field` unless already present.
    /// A missing or null field is treated as an empty array.
    async fn add_to_set(
        &self,
        collection: Collection,
        id: &str,
        field: &str,
        value: &str,
    ) -> Result<SetAdd, StoreError>;
}
