use std::{cmp::Ordering, collections::HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Collection, Direction, Document, DocumentStore, Query};

struct Entry {
    seq: u64,
    fields: Value,
}

#[derive(Default)]
struct Inner {
    next_seq: u64,
    docs: HashMap<(Collection, Uuid), Entry>,
}

/// Process-local store for development and tests. Same semantics as the
/// Postgres backend: shallow merge on update, textual sort keys.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sort_key(fields: &Value, field: &str) -> Option<String> {
    match fields.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, collection: Collection, id: Option<Uuid>, fields: Value) -> anyhow::Result<Uuid> {
        anyhow::ensure!(fields.is_object(), "document fields must be an object");
        let id = id.unwrap_or_else(Uuid::new_v4);
        let mut inner = self.inner.write().await;
        anyhow::ensure!(
            !inner.docs.contains_key(&(collection, id)),
            "{}/{} already exists",
            collection,
            id
        );
        inner.next_seq += 1;
        let seq = inner.next_seq;
        inner.docs.insert((collection, id), Entry { seq, fields });
        Ok(id)
    }

    async fn get(&self, collection: Collection, id: Uuid) -> anyhow::Result<Option<Document>> {
        let inner = self.inner.read().await;
        Ok(inner.docs.get(&(collection, id)).map(|e| Document {
            id,
            fields: e.fields.clone(),
        }))
    }

    async fn query(&self, collection: Collection, query: &Query) -> anyhow::Result<Vec<Document>> {
        let inner = self.inner.read().await;
        let mut hits: Vec<(u64, Document)> = inner
            .docs
            .iter()
            .filter(|((c, _), e)| *c == collection && query.matches(&e.fields))
            .map(|((_, id), e)| {
                (
                    e.seq,
                    Document {
                        id: *id,
                        fields: e.fields.clone(),
                    },
                )
            })
            .collect();

        hits.sort_by(|(sa, a), (sb, b)| {
            let by_key = match &query.order_by {
                Some(o) => {
                    let ord = sort_key(&a.fields, &o.field).cmp(&sort_key(&b.fields, &o.field));
                    if o.direction == Direction::Desc {
                        ord.reverse()
                    } else {
                        ord
                    }
                }
                None => Ordering::Equal,
            };
            by_key.then(sa.cmp(sb))
        });
        Ok(hits.into_iter().map(|(_, d)| d).collect())
    }

    async fn update(&self, collection: Collection, id: Uuid, partial: Value) -> anyhow::Result<bool> {
        let Value::Object(patch) = partial else {
            anyhow::bail!("update payload must be an object");
        };
        let mut inner = self.inner.write().await;
        let Some(entry) = inner.docs.get_mut(&(collection, id)) else {
            return Ok(false);
        };
        if let Value::Object(fields) = &mut entry.fields {
            for (k, v) in patch {
                fields.insert(k, v);
            }
        }
        Ok(true)
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> anyhow::Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.docs.remove(&(collection, id)).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn create_get_update_delete() {
        let store = MemoryStore::new();
        let id = store
            .create(Collection::Payments, None, json!({"amount": 500, "status": "Pending"}))
            .await
            .unwrap();

        assert!(store
            .update(Collection::Payments, id, json!({"status": "Paid"}))
            .await
            .unwrap());
        let doc = store.get(Collection::Payments, id).await.unwrap().unwrap();
        assert_eq!(doc.fields, json!({"amount": 500, "status": "Paid"}));

        assert!(store.delete(Collection::Payments, id).await.unwrap());
        assert!(store.get(Collection::Payments, id).await.unwrap().is_none());
        assert!(!store.update(Collection::Payments, id, json!({})).await.unwrap());
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        store.create(Collection::Profiles, Some(id), json!({"role": "patient"})).await.unwrap();
        assert!(store.get(Collection::Notes, id).await.unwrap().is_none());
        assert!(store
            .create(Collection::Profiles, Some(id), json!({"role": "patient"}))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn query_filters_and_orders() {
        let store = MemoryStore::new();
        for (d, p) in [("2025-02-01", "a"), ("2025-01-15", "a"), ("2025-03-01", "b")] {
            store
                .create(Collection::Appointments, None, json!({"date": d, "patient_id": p}))
                .await
                .unwrap();
        }
        let asc = store
            .query(
                Collection::Appointments,
                &Query::new().eq("patient_id", "a").order_by("date", Direction::Asc),
            )
            .await
            .unwrap();
        let dates: Vec<_> = asc.iter().map(|d| d.fields["date"].as_str().unwrap()).collect();
        assert_eq!(dates, ["2025-01-15", "2025-02-01"]);

        let desc = store
            .query(Collection::Appointments, &Query::new().order_by("date", Direction::Desc))
            .await
            .unwrap();
        assert_eq!(desc[0].fields["date"], "2025-03-01");
    }

    #[tokio::test]
    async fn unordered_query_keeps_insertion_order() {
        let store = MemoryStore::new();
        for n in 0..5 {
            store.create(Collection::Notes, None, json!({"n": n})).await.unwrap();
        }
        let all = store.query(Collection::Notes, &Query::new()).await.unwrap();
        let ns: Vec<_> = all.iter().map(|d| d.fields["n"].as_i64().unwrap()).collect();
        assert_eq!(ns, [0, 1, 2, 3, 4]);
    }
}
