use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{types::Json, FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use super::{Collection, Direction, Document, DocumentStore, Query};

/// Row of the `documents` table.
#[derive(Debug, FromRow)]
struct DocumentRow {
    id: Uuid,
    fields: Json<Value>,
}

impl From<DocumentRow> for Document {
    fn from(r: DocumentRow) -> Self {
        Document {
            id: r.id,
            fields: r.fields.0,
        }
    }
}

/// Documents kept as JSONB rows keyed by `(collection, id)`.
#[derive(Clone)]
pub struct PgDocumentStore {
    db: PgPool,
}

impl PgDocumentStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn create(&self, collection: Collection, id: Option<Uuid>, fields: Value) -> anyhow::Result<Uuid> {
        let id = id.unwrap_or_else(Uuid::new_v4);
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, fields)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(Json(fields))
        .execute(&self.db)
        .await
        .with_context(|| format!("insert into {}", collection))?;
        debug!(%collection, %id, "document created");
        Ok(id)
    }

    async fn get(&self, collection: Collection, id: Uuid) -> anyhow::Result<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, fields
              FROM documents
             WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .with_context(|| format!("get {}/{}", collection, id))?;
        Ok(row.map(Document::from))
    }

    async fn query(&self, collection: Collection, query: &Query) -> anyhow::Result<Vec<Document>> {
        // Sort keys are compared as text; dates are stored as ISO strings so
        // they order correctly.
        let order = match &query.order_by {
            Some(o) if o.direction == Direction::Desc => "ORDER BY fields ->> $3 DESC, created_at ASC",
            Some(_) => "ORDER BY fields ->> $3 ASC, created_at ASC",
            None => "ORDER BY created_at ASC",
        };
        let sql = format!(
            "SELECT id, fields FROM documents WHERE collection = $1 AND fields @> $2 {}",
            order
        );
        let mut q = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(collection.as_str())
            .bind(Json(Value::Object(query.filters.clone())));
        if let Some(o) = &query.order_by {
            q = q.bind(o.field.clone());
        }
        let rows = q
            .fetch_all(&self.db)
            .await
            .with_context(|| format!("query {}", collection))?;
        Ok(rows.into_iter().map(Document::from).collect())
    }

    async fn update(&self, collection: Collection, id: Uuid, partial: Value) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE documents
               SET fields = fields || $3, updated_at = now()
             WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(Json(partial))
        .execute(&self.db)
        .await
        .with_context(|| format!("update {}/{}", collection, id))?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            DELETE FROM documents
             WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .execute(&self.db)
        .await
        .with_context(|| format!("delete {}/{}", collection, id))?;
        Ok(res.rows_affected() > 0)
    }
}
