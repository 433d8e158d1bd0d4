//! Explicit collection schema.
//!
//! A collection is described as data (tables, columns, vector index) and the
//! DDL is rendered from that description.

use imgsearch_core::config::validate_collection_name;
use imgsearch_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bytes per stored vector component (little-endian f32).
pub const BYTES_PER_COMPONENT: usize = 4;

/// Distance metric used to rank neighbours. Smaller is more similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// 1 - cos(a, b)
    Cosine,
    /// Euclidean distance
    L2,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::L2 => "l2",
        }
    }

    /// SQL function computing this metric over two embedding blobs.
    pub fn sql_function(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "vec_cosine_distance",
            DistanceMetric::L2 => "vec_l2_distance",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(DistanceMetric::Cosine),
            "l2" | "euclidean" => Ok(DistanceMetric::L2),
            other => Err(AppError::Config(format!(
                "Unknown distance metric: '{}'",
                other
            ))),
        }
    }
}

/// Column storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
    /// Fixed-length f32 vector stored as a blob
    Vector { dimension: usize },
}

/// One column of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
    /// Extra constraint clause (PRIMARY KEY, UNIQUE, REFERENCES, DEFAULT)
    pub constraint: Option<String>,
}

impl ColumnDef {
    fn new(name: &str, ty: ColumnType, nullable: bool, constraint: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            ty,
            nullable,
            constraint,
        }
    }

    fn to_sql(&self) -> String {
        let mut sql = match self.ty {
            ColumnType::Integer => format!("{} INTEGER", self.name),
            ColumnType::Text => format!("{} TEXT", self.name),
            ColumnType::Vector { .. } => format!("{} BLOB", self.name),
        };
        if !self.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(constraint) = &self.constraint {
            sql.push(' ');
            sql.push_str(constraint);
        }
        if let ColumnType::Vector { dimension } = self.ty {
            sql.push_str(&format!(
                " CHECK (length({}) = {})",
                self.name,
                dimension * BYTES_PER_COMPONENT
            ));
        }
        sql
    }
}

/// A table and its columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableDef {
    fn create_sql(&self, if_not_exists: bool) -> String {
        let columns: Vec<String> = self.columns.iter().map(ColumnDef::to_sql).collect();
        format!(
            "CREATE TABLE {}{} (\n    {}\n)",
            if if_not_exists { "IF NOT EXISTS " } else { "" },
            self.name,
            columns.join(",\n    ")
        )
    }
}

/// Vector index metadata: which column is searched and by which metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorIndexDef {
    pub metric: DistanceMetric,
    pub dimension: usize,
}

/// How `Collection::create` treats an existing collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaMode {
    /// Drop whatever exists and start empty. A reset, not a migration.
    Recreate,
    /// Keep an existing collection if its dimension and metric match.
    CreateIfMissing,
}

/// Complete description of a collection: an items table, an embeddings
/// table referencing it, and the vector index on the embedding column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSchema {
    pub name: String,
    pub items: TableDef,
    pub embeddings: TableDef,
    pub index: VectorIndexDef,
}

impl CollectionSchema {
    /// Describe a collection named `name` holding `dimension`-long vectors.
    pub fn new(name: &str, dimension: usize, metric: DistanceMetric) -> AppResult<Self> {
        validate_collection_name(name)?;
        if dimension == 0 {
            return Err(AppError::Config(
                "Embedding dimension must be greater than zero".to_string(),
            ));
        }

        let items_name = format!("{}_items", name);

        let items = TableDef {
            name: items_name.clone(),
            columns: vec![
                ColumnDef::new("id", ColumnType::Integer, false, Some("PRIMARY KEY".into())),
                ColumnDef::new("label", ColumnType::Text, true, None),
                ColumnDef::new("modality", ColumnType::Text, false, None),
                ColumnDef::new("content_hash", ColumnType::Text, true, None),
                ColumnDef::new(
                    "metadata",
                    ColumnType::Text,
                    false,
                    Some("DEFAULT '{}'".into()),
                ),
            ],
        };

        let embeddings = TableDef {
            name: name.to_string(),
            columns: vec![
                ColumnDef::new(
                    "id",
                    ColumnType::Integer,
                    false,
                    Some("PRIMARY KEY AUTOINCREMENT".into()),
                ),
                ColumnDef::new(
                    "item_id",
                    ColumnType::Integer,
                    false,
                    Some(format!(
                        "UNIQUE REFERENCES {}(id) ON DELETE CASCADE",
                        items_name
                    )),
                ),
                ColumnDef::new("embedding", ColumnType::Vector { dimension }, false, None),
                ColumnDef::new("created_at", ColumnType::Text, false, None),
            ],
        };

        Ok(Self {
            name: name.to_string(),
            items,
            embeddings,
            index: VectorIndexDef { metric, dimension },
        })
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension
    }

    pub fn metric(&self) -> DistanceMetric {
        self.index.metric
    }

    /// DDL creating both tables, items first so the reference resolves.
    pub fn create_statements(&self, if_not_exists: bool) -> Vec<String> {
        vec![
            self.items.create_sql(if_not_exists),
            self.embeddings.create_sql(if_not_exists),
        ]
    }

    /// DDL dropping both tables, embeddings first.
    pub fn drop_statements(&self) -> Vec<String> {
        vec![
            format!("DROP TABLE IF EXISTS {}", self.embeddings.name),
            format!("DROP TABLE IF EXISTS {}", self.items.name),
        ]
    }
}
