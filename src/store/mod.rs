//! Document store client.
//!
//! A schemaless collection-of-documents store: every document is a JSON
//! object keyed by a UUID inside a named collection. Queries support
//! equality filters and one optional sort key, nothing more.

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

pub mod guarded;
pub mod memory;
pub mod postgres;

pub use guarded::{GuardedStore, OwnedRecord, Stored};
pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Profiles,
    Exercises,
    Payments,
    ExerciseLogs,
    Notes,
    Appointments,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Profiles => "profiles",
            Collection::Exercises => "exercises",
            Collection::Payments => "payments",
            Collection::ExerciseLogs => "exercise_logs",
            Collection::Notes => "notes",
            Collection::Appointments => "appointments",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    pub id: Uuid,
    pub fields: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Equality filters plus an optional sort key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Map<String, Value>,
    pub order_by: Option<OrderBy>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.insert(field.to_string(), value.into());
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn matches(&self, fields: &Value) -> bool {
        self.filters
            .iter()
            .all(|(k, v)| fields.get(k).map_or(false, |actual| actual == v))
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document. A generated id is used when `id` is `None`.
    async fn create(&self, collection: Collection, id: Option<Uuid>, fields: Value) -> anyhow::Result<Uuid>;

    async fn get(&self, collection: Collection, id: Uuid) -> anyhow::Result<Option<Document>>;

    async fn query(&self, collection: Collection, query: &Query) -> anyhow::Result<Vec<Document>>;

    /// Shallow-merge `partial` into the stored fields. Returns `false` when
    /// the document does not exist.
    async fn update(&self, collection: Collection, id: Uuid, partial: Value) -> anyhow::Result<bool>;

    /// Returns `false` when the document does not exist.
    async fn delete(&self, collection: Collection, id: Uuid) -> anyhow::Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_matches_every_equality_filter() {
        let q = Query::new().eq("patient_id", "p1").eq("status", "Paid");
        assert!(q.matches(&json!({"patient_id": "p1", "status": "Paid", "amount": 5})));
        assert!(!q.matches(&json!({"patient_id": "p1", "status": "Pending"})));
        assert!(!q.matches(&json!({"status": "Paid"})));
        assert!(Query::new().matches(&json!({})));
    }
}
