//! SQLite document store.
//!
//! Every collection shares one `documents` table. Bodies are stored as JSON
//! text and selectors are evaluated with SQLite's JSON functions, so field
//! lookups and unique indexes work on the document contents directly.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use course_core::RequestContext;
use parking_lot::RwLock;
use serde_json::Value;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::{debug, info};

use super::check_cancelled;
use crate::error::StoreError;
use crate::source::{Document, DocumentStore, Selector, validate_identifier};

const SCHEMA: [&str; 2] = [
    "CREATE TABLE IF NOT EXISTS documents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        collection TEXT NOT NULL,
        body TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS ix_documents_collection ON documents (collection)",
];

/// How long a writer waits for the database lock held by another writer.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A document store backed by a SQLite database.
pub struct SqliteStore {
    pool: SqlitePool,
    /// Unique fields declared per collection, used to name the field in
    /// duplicate errors.
    unique_fields: RwLock<HashMap<String, Vec<String>>>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("pool_size", &self.pool.size())
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Opens (creating if missing) the database at `url`, e.g.
    /// `sqlite://data/courses.db`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        info!(url = %url, max_connections, "Connected to SQLite store");
        Self::with_pool(pool).await
    }

    /// Opens a private in-memory database.
    ///
    /// The pool holds a single connection that is never recycled, since an
    /// in-memory database lives only as long as its connection.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }

        Ok(Self {
            pool,
            unique_fields: RwLock::new(HashMap::new()),
        })
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn map_write_error(&self, err: sqlx::Error, collection: &str) -> StoreError {
        match err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                let fields = self.unique_fields.read();
                let declared = fields.get(collection).map(Vec::as_slice).unwrap_or_default();
                let field = declared
                    .iter()
                    .find(|field| db.message().contains(&index_name(collection, field)))
                    .or_else(|| declared.first())
                    .map_or("unknown", String::as_str);
                StoreError::duplicate(collection, field)
            }
            other => StoreError::Database(other),
        }
    }
}

fn json_path(field: &str) -> String {
    format!("'$.\"{}\"'", field)
}

fn index_name(collection: &str, field: &str) -> String {
    format!("ux_{}_{}", collection, field).replace('-', "_")
}

/// Appends `WHERE collection = ? AND ...` for `selector`.
fn push_filter(
    qb: &mut QueryBuilder<'_, Sqlite>,
    collection: &str,
    selector: &Selector,
) -> Result<(), StoreError> {
    selector.validate()?;

    qb.push(" WHERE collection = ");
    qb.push_bind(collection.to_string());

    for (field, value) in selector.iter() {
        let path = json_path(field);
        match value {
            Value::Null => {
                qb.push(format!(
                    " AND (json_type(body, {path}) IS NULL OR json_type(body, {path}) = 'null')"
                ));
            }
            Value::Bool(b) => {
                qb.push(format!(" AND json_extract(body, {path}) = "));
                qb.push_bind(i64::from(*b));
            }
            Value::Number(n) => {
                qb.push(format!(" AND json_extract(body, {path}) = "));
                match n.as_i64() {
                    Some(i) => qb.push_bind(i),
                    None => qb.push_bind(n.as_f64().unwrap_or(f64::NAN)),
                };
            }
            Value::String(s) => {
                qb.push(format!(" AND json_extract(body, {path}) = "));
                qb.push_bind(s.clone());
            }
            Value::Array(_) | Value::Object(_) => {
                return Err(StoreError::InvalidSelector(format!(
                    "field '{}' cannot be matched against a composite value",
                    field
                )));
            }
        }
    }

    Ok(())
}

/// Appends a `json_set(body, ...)` expression replacing every field of
/// `patch` and keeping the others.
fn push_merge(qb: &mut QueryBuilder<'_, Sqlite>, patch: Document) -> Result<(), StoreError> {
    if patch.is_empty() {
        qb.push("body");
        return Ok(());
    }

    qb.push("json_set(body");
    for (field, value) in patch {
        validate_identifier(&field)?;
        qb.push(format!(", {}, json(", json_path(&field)));
        qb.push_bind(serde_json::to_string(&value)?);
        qb.push(")");
    }
    qb.push(")");
    Ok(())
}

fn decode_body(row: &SqliteRow) -> Result<Document, StoreError> {
    let body: String = row.try_get("body")?;
    Ok(serde_json::from_str(&body)?)
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn find_one(
        &self,
        ctx: &RequestContext,
        collection: &str,
        selector: &Selector,
    ) -> Result<Document, StoreError> {
        check_cancelled(ctx)?;

        let mut qb = QueryBuilder::new("SELECT body FROM documents");
        push_filter(&mut qb, collection, selector)?;
        qb.push(" ORDER BY id LIMIT 1");

        match qb.build().fetch_optional(&self.pool).await? {
            Some(row) => decode_body(&row),
            None => Err(StoreError::not_found(collection)),
        }
    }

    async fn find(
        &self,
        ctx: &RequestContext,
        collection: &str,
        selector: &Selector,
    ) -> Result<Vec<Document>, StoreError> {
        check_cancelled(ctx)?;

        let mut qb = QueryBuilder::new("SELECT body FROM documents");
        push_filter(&mut qb, collection, selector)?;
        qb.push(" ORDER BY id");

        qb.build()
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(decode_body)
            .collect()
    }

    async fn insert(
        &self,
        ctx: &RequestContext,
        collection: &str,
        document: Document,
    ) -> Result<(), StoreError> {
        check_cancelled(ctx)?;
        validate_identifier(collection)?;

        let body = serde_json::to_string(&document)?;
        sqlx::query("INSERT INTO documents (collection, body) VALUES (?, ?)")
            .bind(collection)
            .bind(body)
            .execute(&self.pool)
            .await
            .map_err(|e| self.map_write_error(e, collection))?;

        debug!(collection = %collection, "Document inserted");
        Ok(())
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        collection: &str,
        selector: &Selector,
        update: Document,
    ) -> Result<(), StoreError> {
        check_cancelled(ctx)?;

        // One statement, so concurrent writers queue on the busy timeout
        // instead of failing a read-to-write lock upgrade.
        let mut qb = QueryBuilder::new("UPDATE documents SET body = ");
        push_merge(&mut qb, update)?;
        qb.push(" WHERE id = (SELECT id FROM documents");
        push_filter(&mut qb, collection, selector)?;
        qb.push(" ORDER BY id LIMIT 1)");

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| self.map_write_error(e, collection))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(collection));
        }

        debug!(collection = %collection, selector = %selector, "Document updated");
        Ok(())
    }

    async fn remove(
        &self,
        ctx: &RequestContext,
        collection: &str,
        selector: &Selector,
    ) -> Result<(), StoreError> {
        check_cancelled(ctx)?;

        let mut qb =
            QueryBuilder::new("DELETE FROM documents WHERE id = (SELECT id FROM documents");
        push_filter(&mut qb, collection, selector)?;
        qb.push(" ORDER BY id LIMIT 1)");

        let result = qb.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(collection));
        }

        debug!(collection = %collection, selector = %selector, "Document removed");
        Ok(())
    }

    async fn count(
        &self,
        ctx: &RequestContext,
        collection: &str,
        selector: &Selector,
    ) -> Result<u64, StoreError> {
        check_cancelled(ctx)?;

        let mut qb = QueryBuilder::new("SELECT COUNT(*) AS n FROM documents");
        push_filter(&mut qb, collection, selector)?;

        let row = qb.build().fetch_one(&self.pool).await?;
        let n: i64 = row.try_get("n")?;
        Ok(u64::try_from(n).unwrap_or_default())
    }

    async fn ensure_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
    ) -> Result<(), StoreError> {
        validate_identifier(collection)?;
        validate_identifier(field)?;

        let (name, kind) = if unique {
            (index_name(collection, field), "UNIQUE INDEX")
        } else {
            (index_name(collection, field).replacen("ux_", "ix_", 1), "INDEX")
        };
        let statement = format!(
            "CREATE {kind} IF NOT EXISTS \"{name}\" \
             ON documents (json_extract(body, {path})) WHERE collection = '{collection}'",
            path = json_path(field),
        );

        sqlx::query(&statement)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    StoreError::duplicate(collection, field)
                }
                other => StoreError::Database(other),
            })?;

        if unique {
            let mut fields = self.unique_fields.write();
            let declared = fields.entry(collection.to_string()).or_default();
            if !declared.iter().any(|f| f == field) {
                declared.push(field.to_string());
            }
        }

        debug!(collection = %collection, field = %field, unique, index = %name, "Index ensured");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
