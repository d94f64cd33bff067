use chrono::Utc;
use log::{debug, info};
use rusqlite::{params, OptionalExtension};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio_rusqlite::Connection;
use uuid::Uuid;

pub type Payload = HashMap<String, Value>;

#[derive(Error, Debug)]
pub enum VectorDBError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    #[error("Collection {0} already exists with vector size {1}")]
    CollectionExists(String, u64),
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: u64, actual: usize },
    #[error("Payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Flat vector index persisted in a single SQLite file. Search is an exact
/// cosine scan over the collection.
#[derive(Clone)]
pub struct VectorDB {
    conn: Arc<Connection>,
}

impl VectorDB {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, VectorDBError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let conn = Connection::open(path).await?;
        let db = Self { conn: Arc::new(conn) };
        db.initialize().await?;
        info!("Vector index opened at {}", path.display());
        Ok(db)
    }

    pub async fn open_in_memory() -> Result<Self, VectorDBError> {
        let conn = Connection::open_in_memory().await?;
        let db = Self { conn: Arc::new(conn) };
        db.initialize().await?;
        Ok(db)
    }

    async fn initialize(&self) -> Result<(), VectorDBError> {
        self.conn
            .call(|conn| {
                conn.execute_batch(
                    "CREATE TABLE IF NOT EXISTS collections (
                        name TEXT PRIMARY KEY,
                        vector_size INTEGER NOT NULL,
                        created_at TEXT NOT NULL
                    );
                    CREATE TABLE IF NOT EXISTS points (
                        id TEXT PRIMARY KEY,
                        collection TEXT NOT NULL,
                        vector BLOB NOT NULL,
                        payload TEXT NOT NULL,
                        created_at TEXT NOT NULL
                    );
                    CREATE INDEX IF NOT EXISTS idx_points_collection ON points(collection);",
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Vector size of a collection, or `None` if it does not exist.
    pub async fn collection_info(&self, name: &str) -> Result<Option<u64>, VectorDBError> {
        let name = name.to_string();
        let size = self
            .conn
            .call(move |conn| {
                let size = conn
                    .query_row(
                        "SELECT vector_size FROM collections WHERE name = ?1",
                        params![name],
                        |row| row.get::<_, i64>(0),
                    )
                    .optional()?;
                Ok(size)
            })
            .await?;
        Ok(size.map(|s| s as u64))
    }

    pub async fn create_collection(&self, name: &str, vector_size: u64) -> Result<(), VectorDBError> {
        match self.collection_info(name).await? {
            Some(existing) if existing == vector_size => {
                info!("Collection {} already exists, skipping creation", name);
                return Ok(());
            }
            Some(existing) => return Err(VectorDBError::CollectionExists(name.to_string(), existing)),
            None => {}
        }

        let name = name.to_string();
        let created_at = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO collections (name, vector_size, created_at) VALUES (?1, ?2, ?3)",
                    params![name, vector_size as i64, created_at],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Drops a collection and all of its points. Returns whether it existed.
    pub async fn delete_collection(&self, name: &str) -> Result<bool, VectorDBError> {
        let name = name.to_string();
        let removed = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM points WHERE collection = ?1", params![name])?;
                let removed = tx.execute("DELETE FROM collections WHERE name = ?1", params![name])?;
                tx.commit()?;
                Ok(removed > 0)
            })
            .await?;
        Ok(removed)
    }

    /// Inserts all points in one transaction and returns their ids.
    pub async fn store_vectors(
        &self,
        collection: &str,
        points: Vec<(Vec<f32>, Payload)>,
    ) -> Result<Vec<String>, VectorDBError> {
        let expected = self
            .collection_info(collection)
            .await?
            .ok_or_else(|| VectorDBError::CollectionNotFound(collection.to_string()))?;

        let mut rows = Vec::with_capacity(points.len());
        for (vector, payload) in points {
            if vector.len() as u64 != expected {
                return Err(VectorDBError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
            rows.push((Uuid::new_v4().to_string(), encode_vector(&vector), serde_json::to_string(&payload)?));
        }
        let ids: Vec<String> = rows.iter().map(|(id, _, _)| id.clone()).collect();

        let collection = collection.to_string();
        let created_at = Utc::now().to_rfc3339();
        let stored = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO points (id, collection, vector, payload, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                    )?;
                    for (id, vector, payload) in &rows {
                        stmt.execute(params![id, collection, vector, payload, created_at])?;
                    }
                }
                tx.commit()?;
                Ok(rows.len())
            })
            .await?;

        debug!("Stored {} vectors", stored);
        Ok(ids)
    }

    /// Exact cosine search. Results are `(id, score, payload)`, best first.
    pub async fn search_vectors(
        &self,
        collection: &str,
        query_vector: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<(String, f32, Payload)>, VectorDBError> {
        let expected = self
            .collection_info(collection)
            .await?
            .ok_or_else(|| VectorDBError::CollectionNotFound(collection.to_string()))?;
        if query_vector.len() as u64 != expected {
            return Err(VectorDBError::DimensionMismatch {
                expected,
                actual: query_vector.len(),
            });
        }

        let collection = collection.to_string();
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare("SELECT id, vector, payload FROM points WHERE collection = ?1")?;
                let rows = stmt
                    .query_map(params![collection], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, Vec<u8>>(1)?,
                            row.get::<_, String>(2)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                Ok(rows)
            })
            .await?;

        let mut scored: Vec<(String, f32, String)> = rows
            .into_iter()
            .map(|(id, blob, payload)| {
                let score = cosine_similarity(&query_vector, &decode_vector(&blob));
                (id, score, payload)
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(limit as usize);

        scored
            .into_iter()
            .map(|(id, score, payload)| -> Result<_, VectorDBError> {
                Ok((id, score, serde_json::from_str::<Payload>(&payload)?))
            })
            .collect()
    }

    pub async fn count(&self, collection: &str) -> Result<usize, VectorDBError> {
        let collection = collection.to_string();
        let count = self
            .conn
            .call(move |conn| {
                let count = conn.query_row(
                    "SELECT COUNT(*) FROM points WHERE collection = ?1",
                    params![collection],
                    |row| row.get::<_, i64>(0),
                )?;
                Ok(count)
            })
            .await?;
        Ok(count as usize)
    }

    pub async fn delete_vectors(&self, collection: &str, ids: Vec<String>) -> Result<usize, VectorDBError> {
        let collection = collection.to_string();
        let deleted = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut deleted = 0;
                {
                    let mut stmt = tx.prepare("DELETE FROM points WHERE collection = ?1 AND id = ?2")?;
                    for id in &ids {
                        deleted += stmt.execute(params![collection, id])?;
                    }
                }
                tx.commit()?;
                Ok(deleted)
            })
            .await?;
        Ok(deleted)
    }
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(text: &str) -> Payload {
        let mut payload = HashMap::new();
        payload.insert("text".to_string(), json!(text));
        payload
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_vector_blob_encoding() {
        let vector = vec![0.25, -1.5, 3.0e-8];
        assert_eq!(decode_vector(&encode_vector(&vector)), vector);
    }

    #[tokio::test]
    async fn test_search_returns_nearest_first() {
        let db = VectorDB::open_in_memory().await.unwrap();
        db.create_collection("docs", 3).await.unwrap();
        db.store_vectors(
            "docs",
            vec![
                (vec![1.0, 0.0, 0.0], payload("x axis")),
                (vec![0.0, 1.0, 0.0], payload("y axis")),
                (vec![0.9, 0.1, 0.0], payload("mostly x")),
            ],
        )
        .await
        .unwrap();

        let results = db.search_vectors("docs", vec![1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].2["text"], json!("x axis"));
        assert_eq!(results[1].2["text"], json!("mostly x"));
        assert!(results[0].1 >= results[1].1);
    }

    #[tokio::test]
    async fn test_dimension_checks() {
        let db = VectorDB::open_in_memory().await.unwrap();
        db.create_collection("docs", 2).await.unwrap();

        let err = db
            .store_vectors("docs", vec![(vec![1.0, 2.0, 3.0], payload("bad"))])
            .await
            .unwrap_err();
        assert!(matches!(err, VectorDBError::DimensionMismatch { expected: 2, actual: 3 }));

        let err = db.search_vectors("docs", vec![1.0], 1).await.unwrap_err();
        assert!(matches!(err, VectorDBError::DimensionMismatch { .. }));

        assert!(db.create_collection("docs", 2).await.is_ok());
        assert!(matches!(
            db.create_collection("docs", 4).await,
            Err(VectorDBError::CollectionExists(_, 2))
        ));
    }

    #[tokio::test]
    async fn test_missing_collection() {
        let db = VectorDB::open_in_memory().await.unwrap();
        let err = db.search_vectors("nope", vec![1.0], 1).await.unwrap_err();
        assert!(matches!(err, VectorDBError::CollectionNotFound(_)));
        assert!(!db.delete_collection("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_vectors_and_collection() {
        let db = VectorDB::open_in_memory().await.unwrap();
        db.create_collection("docs", 2).await.unwrap();
        let ids = db
            .store_vectors(
                "docs",
                vec![(vec![1.0, 0.0], payload("a")), (vec![0.0, 1.0], payload("b"))],
            )
            .await
            .unwrap();
        assert_eq!(db.count("docs").await.unwrap(), 2);

        assert_eq!(db.delete_vectors("docs", vec![ids[0].clone()]).await.unwrap(), 1);
        assert_eq!(db.count("docs").await.unwrap(), 1);

        assert!(db.delete_collection("docs").await.unwrap());
        assert_eq!(db.count("docs").await.unwrap(), 0);
        assert_eq!(db.collection_info("docs").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_index_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("index.sqlite3");

        {
            let db = VectorDB::open(&path).await.unwrap();
            db.create_collection("docs", 2).await.unwrap();
            db.store_vectors("docs", vec![(vec![0.6, 0.8], payload("kept"))])
                .await
                .unwrap();
        }

        let db = VectorDB::open(&path).await.unwrap();
        assert_eq!(db.collection_info("docs").await.unwrap(), Some(2));
        let results = db.search_vectors("docs", vec![0.6, 0.8], 6).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].2["text"], json!("kept"));
    }
}
