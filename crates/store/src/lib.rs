//! Relational storage for embedding collections.
//!
//! Each collection is a pair of SQLite tables (items and their embeddings)
//! plus a catalog entry recording the vector dimension and distance metric.
//! Nearest-neighbour search is an exact scan ordered by a registered distance
//! function.

pub mod collection;
pub mod error;
pub mod filter;
pub mod schema;
pub mod session;
pub mod types;
pub mod vector;

pub use collection::{open_database, open_in_memory, Collection};
pub use filter::Filter;
pub use schema::{CollectionSchema, DistanceMetric, SchemaMode};
pub use types::{CollectionStats, NewRecord, SearchHit};
