//! SQLite-backed embedding collection.

use crate::error::sql_error;
use crate::filter::Filter;
use crate::schema::{CollectionSchema, DistanceMetric, SchemaMode};
use crate::session::with_session;
use crate::types::{CollectionStats, NewRecord, SearchHit};
use crate::vector::{bytes_to_embedding, embedding_to_bytes, register_functions};
use chrono::Utc;
use imgsearch_core::{AppError, AppResult, StorageErrorKind};
use rusqlite::types::{Type, Value as SqlValue};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::Path;

const CATALOG_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS _collections (
    name TEXT PRIMARY KEY,
    dimension INTEGER NOT NULL,
    metric TEXT NOT NULL,
    created_at TEXT NOT NULL
);
"#;

/// Open a database file, creating parent directories as needed.
pub fn open_database(db_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::storage(
                    StorageErrorKind::Connectivity,
                    format!("Failed to create database directory {:?}: {}", parent, e),
                )
            })?;
        }
    }

    let conn = Connection::open(db_path).map_err(|e| {
        AppError::storage(
            StorageErrorKind::Connectivity,
            format!("Failed to open database {:?}: {}", db_path, e),
        )
    })?;
    prepare_connection(&conn)?;

    tracing::debug!("Opened database at {:?}", db_path);
    Ok(conn)
}

/// Open a private in-memory database.
pub fn open_in_memory() -> AppResult<Connection> {
    let conn = Connection::open_in_memory().map_err(sql_error)?;
    prepare_connection(&conn)?;
    Ok(conn)
}

fn prepare_connection(conn: &Connection) -> AppResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(sql_error)?;
    conn.execute_batch(CATALOG_DDL).map_err(sql_error)?;
    register_functions(conn)
}

/// A named collection of item embeddings.
///
/// Owns its connection. All writes go through one transaction per call, so a
/// failed batch leaves no trace.
pub struct Collection {
    conn: Connection,
    schema: CollectionSchema,
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl Collection {
    /// Create the collection described by `schema`.
    ///
    /// With `SchemaMode::Recreate` any existing collection of the same name is
    /// dropped first, data included.
    pub fn create(
        mut conn: Connection,
        schema: CollectionSchema,
        mode: SchemaMode,
    ) -> AppResult<Self> {
        let existing = read_catalog(&conn, &schema.name)?;

        with_session(&mut conn, |tx| {
            match (mode, existing) {
                (SchemaMode::Recreate, _) => {
                    for statement in schema.drop_statements() {
                        tx.execute(&statement, []).map_err(sql_error)?;
                    }
                    tx.execute("DELETE FROM _collections WHERE name = ?1", [&schema.name])
                        .map_err(sql_error)?;
                    tracing::info!("Dropped existing collection '{}'", schema.name);
                }
                (SchemaMode::CreateIfMissing, Some((dimension, metric))) => {
                    check_compatible(&schema, dimension, metric)?;
                }
                (SchemaMode::CreateIfMissing, None) => {}
            }

            for statement in schema.create_statements(true) {
                tx.execute(&statement, []).map_err(sql_error)?;
            }

            tx.execute(
                "INSERT OR IGNORE INTO _collections (name, dimension, metric, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    schema.name,
                    schema.dimension() as i64,
                    schema.metric().as_str(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(sql_error)?;
            Ok(())
        })?;

        tracing::info!(
            "Collection '{}' ready (dimension={}, metric={})",
            schema.name,
            schema.dimension(),
            schema.metric()
        );

        Ok(Self { conn, schema })
    }

    /// Open an existing collection.
    pub fn open(conn: Connection, name: &str) -> AppResult<Self> {
        let (dimension, metric) = read_catalog(&conn, name)?.ok_or_else(|| {
            AppError::storage(
                StorageErrorKind::MissingCollection,
                format!("Collection '{}' does not exist", name),
            )
        })?;

        let schema = CollectionSchema::new(name, dimension, metric)?;
        tracing::debug!("Opened collection '{}'", name);
        Ok(Self { conn, schema })
    }

    pub fn schema(&self) -> &CollectionSchema {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn dimension(&self) -> usize {
        self.schema.dimension()
    }

    pub fn metric(&self) -> DistanceMetric {
        self.schema.metric()
    }

    /// Drop the collection's tables and catalog entry.
    pub fn drop_collection(mut self) -> AppResult<()> {
        let schema = self.schema.clone();
        with_session(&mut self.conn, |tx| {
            for statement in schema.drop_statements() {
                tx.execute(&statement, []).map_err(sql_error)?;
            }
            tx.execute("DELETE FROM _collections WHERE name = ?1", [&schema.name])
                .map_err(sql_error)?;
            Ok(())
        })?;

        tracing::info!("Dropped collection '{}'", schema.name);
        Ok(())
    }

    /// Insert a batch atomically. Returns the new record ids in input order.
    ///
    /// Any failure (wrong dimension, duplicate item id, engine error) rolls
    /// back the whole batch.
    pub fn insert_batch(&mut self, records: &[NewRecord]) -> AppResult<Vec<i64>> {
        let dimension = self.dimension();
        if let Some(bad) = records.iter().find(|r| r.embedding.len() != dimension) {
            return Err(AppError::storage(
                StorageErrorKind::DimensionMismatch,
                format!(
                    "Item {} has a {}-dimensional embedding, collection '{}' expects {}",
                    bad.item_id,
                    bad.embedding.len(),
                    self.schema.name,
                    dimension
                ),
            ));
        }

        let items_sql = format!(
            "INSERT INTO {} (id, label, modality, content_hash, metadata) VALUES (?1, ?2, ?3, ?4, ?5)",
            self.schema.items.name
        );
        let embeddings_sql = format!(
            "INSERT INTO {} (item_id, embedding, created_at) VALUES (?1, ?2, ?3)",
            self.schema.embeddings.name
        );
        let created_at = Utc::now().to_rfc3339();

        let ids = with_session(&mut self.conn, |tx| {
            let mut insert_item = tx.prepare(&items_sql).map_err(sql_error)?;
            let mut insert_embedding = tx.prepare(&embeddings_sql).map_err(sql_error)?;
            let mut ids = Vec::with_capacity(records.len());

            for record in records {
                let metadata = serde_json::to_string(&record.metadata)?;
                insert_item
                    .execute(params![
                        record.item_id,
                        record.label,
                        record.modality,
                        record.content_hash,
                        metadata,
                    ])
                    .map_err(sql_error)?;
                let id = insert_embedding
                    .insert(params![
                        record.item_id,
                        embedding_to_bytes(&record.embedding),
                        created_at,
                    ])
                    .map_err(sql_error)?;
                ids.push(id);
            }
            Ok(ids)
        })?;

        tracing::debug!(
            "Inserted {} records into '{}'",
            ids.len(),
            self.schema.name
        );
        Ok(ids)
    }

    /// Top-`k` records nearest to `query` under the collection's metric,
    /// nearest first, ties broken by record id.
    pub fn query(
        &self,
        query: &[f32],
        k: i64,
        filter: Option<&Filter>,
    ) -> AppResult<Vec<SearchHit>> {
        if k <= 0 {
            return Err(AppError::InvalidK(k));
        }
        if query.len() != self.dimension() {
            return Err(AppError::storage(
                StorageErrorKind::DimensionMismatch,
                format!(
                    "Query has {} dimensions, collection '{}' expects {}",
                    query.len(),
                    self.schema.name,
                    self.dimension()
                ),
            ));
        }

        let mut params: Vec<SqlValue> = vec![SqlValue::Blob(embedding_to_bytes(query))];
        let where_clause = match filter {
            Some(filter) => format!("WHERE {}", filter.to_sql("i.metadata", &mut params)),
            None => String::new(),
        };
        params.push(SqlValue::Integer(k));

        let sql = format!(
            "SELECT e.id, e.item_id, {}(e.embedding, ?) AS distance, i.label, i.metadata
             FROM {} e JOIN {} i ON i.id = e.item_id
             {}
             ORDER BY distance ASC, e.id ASC
             LIMIT ?",
            self.metric().sql_function(),
            self.schema.embeddings.name,
            self.schema.items.name,
            where_clause
        );

        let mut stmt = self.conn.prepare(&sql).map_err(sql_error)?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                let metadata: String = row.get(4)?;
                let metadata = serde_json::from_str(&metadata).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e))
                })?;
                Ok(SearchHit {
                    record_id: row.get(0)?,
                    item_id: row.get(1)?,
                    distance: row.get(2)?,
                    label: row.get(3)?,
                    metadata,
                })
            })
            .map_err(sql_error)?;

        let hits = rows.collect::<Result<Vec<_>, _>>().map_err(sql_error)?;

        tracing::debug!(
            "Retrieved {} hits from '{}' (requested top-{})",
            hits.len(),
            self.schema.name,
            k
        );
        Ok(hits)
    }

    /// Delete records whose item id is in `ids` and that match `filter`.
    /// With neither, everything is deleted. Returns the number removed.
    pub fn delete(&mut self, ids: Option<&[i64]>, filter: Option<&Filter>) -> AppResult<usize> {
        let mut params: Vec<SqlValue> = Vec::new();
        let mut conditions: Vec<String> = Vec::new();

        if let Some(ids) = ids {
            if ids.is_empty() {
                return Ok(0);
            }
            conditions.push(format!("i.id IN ({})", vec!["?"; ids.len()].join(", ")));
            params.extend(ids.iter().map(|id| SqlValue::Integer(*id)));
        }
        if let Some(filter) = filter {
            conditions.push(filter.to_sql("i.metadata", &mut params));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let items = &self.schema.items.name;
        let sql = format!(
            "DELETE FROM {items} WHERE id IN (SELECT i.id FROM {items} i {where_clause})"
        );

        let removed = with_session(&mut self.conn, |tx| {
            tx.execute(&sql, params_from_iter(params.iter()))
                .map_err(sql_error)
        })?;

        tracing::info!("Deleted {} records from '{}'", removed, self.schema.name);
        Ok(removed)
    }

    /// Stored embedding for an item, if any.
    pub fn embedding(&self, item_id: i64) -> AppResult<Option<Vec<f32>>> {
        let sql = format!(
            "SELECT embedding FROM {} WHERE item_id = ?1",
            self.schema.embeddings.name
        );
        let bytes: Option<Vec<u8>> = self
            .conn
            .query_row(&sql, [item_id], |row| row.get(0))
            .optional()
            .map_err(sql_error)?;
        bytes.map(|b| bytes_to_embedding(&b)).transpose()
    }

    /// Identifier following the largest item id in use, or 1 when empty.
    pub fn next_item_id(&self) -> AppResult<i64> {
        let sql = format!(
            "SELECT COALESCE(MAX(id), 0) + 1 FROM {}",
            self.schema.items.name
        );
        self.conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(sql_error)
    }

    /// Number of stored records.
    pub fn count(&self) -> AppResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.schema.embeddings.name);
        self.conn
            .query_row(&sql, [], |row| row.get::<_, i64>(0))
            .map(|n| n as u64)
            .map_err(sql_error)
    }

    /// Catalog entry plus record count.
    pub fn stats(&self) -> AppResult<CollectionStats> {
        let created_at: String = self
            .conn
            .query_row(
                "SELECT created_at FROM _collections WHERE name = ?1",
                [&self.schema.name],
                |row| row.get(0),
            )
            .optional()
            .map_err(sql_error)?
            .ok_or_else(|| {
                AppError::storage(
                    StorageErrorKind::MissingCollection,
                    format!("Collection '{}' does not exist", self.schema.name),
                )
            })?;

        Ok(CollectionStats {
            name: self.schema.name.clone(),
            dimension: self.dimension(),
            metric: self.metric().to_string(),
            records: self.count()?,
            created_at,
        })
    }
}

fn read_catalog(conn: &Connection, name: &str) -> AppResult<Option<(usize, DistanceMetric)>> {
    let row: Option<(i64, String)> = conn
        .query_row(
            "SELECT dimension, metric FROM _collections WHERE name = ?1",
            [name],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(sql_error)?;

    row.map(|(dimension, metric)| -> AppResult<(usize, DistanceMetric)> {
        Ok((dimension as usize, metric.parse()?))
    })
    .transpose()
}

fn check_compatible(
    schema: &CollectionSchema,
    dimension: usize,
    metric: DistanceMetric,
) -> AppResult<()> {
    if dimension != schema.dimension() {
        return Err(AppError::storage(
            StorageErrorKind::DimensionMismatch,
            format!(
                "Collection '{}' stores {}-dimensional embeddings, requested {}",
                schema.name,
                dimension,
                schema.dimension()
            ),
        ));
    }
    if metric != schema.metric() {
        return Err(AppError::Config(format!(
            "Collection '{}' uses the {} metric, requested {}",
            schema.name,
            metric,
            schema.metric()
        )));
    }
    Ok(())
}
