//! Embedding blob codec and SQL distance functions.

use crate::schema::{DistanceMetric, BYTES_PER_COMPONENT};
use imgsearch_core::{AppError, AppResult, StorageErrorKind};
use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::Connection;

/// Encode an embedding as little-endian f32 bytes.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decode little-endian f32 bytes.
pub fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % BYTES_PER_COMPONENT != 0 {
        return Err(AppError::storage(
            StorageErrorKind::DimensionMismatch,
            format!("Invalid embedding blob length {}", bytes.len()),
        ));
    }
    Ok(bytes
        .chunks_exact(BYTES_PER_COMPONENT)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Cosine distance `1 - cos(a, b)`, in `[0, 2]`.
///
/// A zero vector has no direction; its distance to anything is 1.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    (1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 2.0)
}

/// Euclidean distance.
pub fn l2_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = *x as f64 - *y as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Distance under `metric`.
pub fn distance(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f64 {
    match metric {
        DistanceMetric::Cosine => cosine_distance(a, b),
        DistanceMetric::L2 => l2_distance(a, b),
    }
}

/// Register `vec_cosine_distance(a, b)` and `vec_l2_distance(a, b)` on a
/// connection. Both take two embedding blobs of equal length.
pub fn register_functions(conn: &Connection) -> AppResult<()> {
    for metric in [DistanceMetric::Cosine, DistanceMetric::L2] {
        conn.create_scalar_function(
            metric.sql_function(),
            2,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            move |ctx| sql_distance(ctx, metric),
        )
        .map_err(|e| {
            AppError::storage(
                StorageErrorKind::Connectivity,
                format!("Failed to register {}: {}", metric.sql_function(), e),
            )
        })?;
    }
    Ok(())
}

fn sql_distance(ctx: &Context<'_>, metric: DistanceMetric) -> rusqlite::Result<f64> {
    let a = blob_arg(ctx, 0)?;
    let b = blob_arg(ctx, 1)?;
    if a.len() != b.len() {
        return Err(rusqlite::Error::UserFunctionError(
            format!(
                "dimension mismatch: {} vs {} components",
                a.len(),
                b.len()
            )
            .into(),
        ));
    }
    Ok(distance(metric, &a, &b))
}

fn blob_arg(ctx: &Context<'_>, idx: usize) -> rusqlite::Result<Vec<f32>> {
    let bytes = ctx
        .get_raw(idx)
        .as_blob()
        .map_err(|e| rusqlite::Error::UserFunctionError(Box::new(e)))?;
    bytes_to_embedding(bytes)
        .map_err(|e| rusqlite::Error::UserFunctionError(e.to_string().into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_round_trip() {
        let v = vec![0.5, -1.25, 3.0];
        let bytes = embedding_to_bytes(&v);
        assert_eq!(bytes.len(), 12);
        assert_eq!(bytes_to_embedding(&bytes).unwrap(), v);
        assert!(bytes_to_embedding(&bytes[..5]).is_err());
    }

    #[test]
    fn test_cosine_distance() {
        assert!(cosine_distance(&[1.0, 0.0], &[1.0, 0.0]).abs() < 1e-9);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-9);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-9);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
        // Scale invariant
        assert!(cosine_distance(&[1.0, 2.0], &[2.0, 4.0]).abs() < 1e-9);
    }

    #[test]
    fn test_l2_distance() {
        assert_eq!(l2_distance(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
        assert!((l2_distance(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_sql_functions() {
        let conn = Connection::open_in_memory().unwrap();
        register_functions(&conn).unwrap();

        let a = embedding_to_bytes(&[0.0, 3.0]);
        let b = embedding_to_bytes(&[4.0, 0.0]);
        let d: f64 = conn
            .query_row("SELECT vec_l2_distance(?1, ?2)", [&a, &b], |row| row.get(0))
            .unwrap();
        assert!((d - 5.0).abs() < 1e-9);

        let d: f64 = conn
            .query_row("SELECT vec_cosine_distance(?1, ?2)", [&a, &b], |row| row.get(0))
            .unwrap();
        assert!((d - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_sql_function_rejects_mismatched_lengths() {
        let conn = Connection::open_in_memory().unwrap();
        register_functions(&conn).unwrap();

        let a = embedding_to_bytes(&[1.0, 0.0]);
        let b = embedding_to_bytes(&[1.0, 0.0, 0.0]);
        let result: rusqlite::Result<f64> =
            conn.query_row("SELECT vec_cosine_distance(?1, ?2)", [&a, &b], |row| row.get(0));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("dimension mismatch"));
    }
}
