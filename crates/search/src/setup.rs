//! Opening collections from application configuration.

use imgsearch_core::{AppConfig, AppResult, StorageConfig};
use imgsearch_store::{open_database, Collection, CollectionSchema, DistanceMetric, SchemaMode};

/// Schema described by the storage section.
pub fn schema_for(storage: &StorageConfig) -> AppResult<CollectionSchema> {
    let metric: DistanceMetric = storage.metric.parse()?;
    CollectionSchema::new(&storage.collection, storage.dimension, metric)
}

/// Create (or with `SchemaMode::CreateIfMissing`, reuse) the configured
/// collection.
pub fn init_collection(config: &AppConfig, mode: SchemaMode) -> AppResult<Collection> {
    let schema = schema_for(&config.storage)?;
    let conn = open_database(&config.database_path())?;
    Collection::create(conn, schema, mode)
}

/// Open the configured collection, which must already exist.
pub fn open_collection(config: &AppConfig) -> AppResult<Collection> {
    let conn = open_database(&config.database_path())?;
    Collection::open(conn, &config.storage.collection)
}
