//! PostgreSQL document store.
//!
//! All collections share the `documents` table; document bodies live in a
//! JSONB column. Every trait operation is a single statement, so row-level
//! locking gives the atomicity the domain relies on.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;

use super::{Collection, Direction, Document, DocumentStore, Fields, Query, SetAdd, StoreError};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

impl Direction {
    fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC NULLS FIRST",
            Direction::Desc => "DESC NULLS LAST",
        }
    }
}

/// Quote a top-level field name as a SQL literal.
///
/// Field names are spelled into the statement so that `data -> 'toUid'`
/// matches the expression indexes, which a bound `data -> $n` never does.
fn json_key(field: &str) -> Result<String, StoreError> {
    if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(StoreError::InvalidField(field.to_owned()));
    }
    Ok(format!("'{field}'"))
}

/// Build the SELECT for a query. The collection is spelled as a literal so
/// the partial indexes apply; a filter value, when present, is bound as `$1`.
fn select_sql(collection: Collection, query: &Query) -> Result<String, StoreError> {
    let mut sql = format!(
        "SELECT id, data FROM documents WHERE collection = '{}'",
        collection.as_str()
    );
    if let Some((field, _)) = &query.filter {
        sql.push_str(&format!(" AND data -> {} = $1::jsonb", json_key(field)?));
    }
    match &query.order_by {
        Some((field, direction)) => sql.push_str(&format!(
            " ORDER BY data -> {} {}, seq ASC",
            json_key(field)?,
            direction.as_sql()
        )),
        None => sql.push_str(" ORDER BY seq ASC"),
    }
    Ok(sql)
}

#[async_trait]
impl DocumentStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        let data: Option<Json<Fields>> =
            sqlx::query_scalar("SELECT data FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection.as_str())
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(data.map(|Json(fields)| Document {
            id: id.to_owned(),
            fields,
        }))
    }

    async fn query(
        &self,
        collection: Collection,
        query: &Query,
    ) -> Result<Vec<Document>, StoreError> {
        let sql = select_sql(collection, query)?;
        let mut statement = sqlx::query_as::<_, (String, Json<Fields>)>(&sql);
        if let Some((_, value)) = &query.filter {
            statement = statement.bind(Json(value));
        }

        let rows = statement.fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|(id, Json(fields))| Document { id, fields })
            .collect())
    }

    async fn create(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3) \
             ON CONFLICT (collection, id) DO NOTHING",
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(Json(fields))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE documents SET data = data || $3, updated_at = now() \
             WHERE collection = $1 AND id = $2",
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(Json(fields))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_to_set(
        &self,
        collection: Collection,
        id: &str,
        field: &str,
        value: &str,
    ) -> Result<SetAdd, StoreError> {
        // Concurrent writers block on the row lock and re-check the
        // containment predicate, so a value is appended at most once.
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET data = jsonb_set(
                    data,
                    ARRAY[$3::text],
                    (CASE WHEN jsonb_typeof(data -> $3::text) = 'array'
                          THEN data -> $3::text ELSE '[]'::jsonb END)
                        || jsonb_build_array($4::text)
                ),
                updated_at = now()
            WHERE collection = $1
              AND id = $2
              AND COALESCE(jsonb_typeof(data -> $3::text), 'null') IN ('array', 'null')
              AND NOT (CASE WHEN jsonb_typeof(data -> $3::text) = 'array'
                            THEN data -> $3::text ELSE '[]'::jsonb END)
                      @> jsonb_build_array($4::text)
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(field)
        .bind(value)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(SetAdd::Added);
        }

        let kind: Option<Option<String>> = sqlx::query_scalar(
            "SELECT jsonb_typeof(data -> $3::text) FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(field)
        .fetch_optional(&self.pool)
        .await?;

        match kind {
            None => Ok(SetAdd::Missing),
            Some(Some(kind)) if kind != "array" && kind != "null" => Err(StoreError::NotAnArray {
                collection: collection.as_str(),
                id: id.to_owned(),
                field: field.to_owned(),
            }),
            Some(_) => Ok(SetAdd::AlreadyPresent),
        }
    }
}
