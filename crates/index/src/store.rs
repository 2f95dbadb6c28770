//! SQLite-backed chunk store collaborator.
//!
//! Persists chunk content, aggregated metadata, and externally computed
//! embedding vectors such that later queries can combine vector
//! similarity with exact filters on section, page range, filing
//! identifier, and node variants. Persisting a filing is transactional:
//! either every chunk lands or none do, so an aborted pipeline never
//! leaves a filing partially represented.

use std::path::Path;

use filing_core::{AppError, AppResult};
use rusqlite::{params, Connection};

use crate::chunk::{Chunk, ChunkMetadata};
use crate::types::{FilingMeta, NodeKind};

/// A chunk paired with its externally computed embedding, ready to
/// persist.
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// Exact filters combined with similarity search.
#[derive(Debug, Clone, Default)]
pub struct ChunkFilter {
    pub filing_id: Option<String>,

    /// Chunk must contain this section in its section set
    pub section: Option<String>,

    /// Chunk page range must intersect [page_min, page_max]
    pub page_min: Option<u32>,
    pub page_max: Option<u32>,

    /// Chunk must contain this node variant
    pub kind: Option<NodeKind>,
}

/// A chunk row read back from the store.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub id: String,
    pub filing_id: String,
    pub sequence: u32,
    pub content: String,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StoreStats {
    pub filings_count: u32,
    pub chunks_count: u32,
}

/// Destination for finished chunks and their embeddings.
pub trait ChunkStore: Send {
    /// Persist a filing's complete chunk set atomically, replacing any
    /// previous chunks for the same filing.
    fn persist_filing(&mut self, meta: &FilingMeta, chunks: &[StoredChunk]) -> AppResult<()>;

    /// Top-k chunks by cosine similarity, restricted by exact filters.
    fn query(
        &self,
        embedding: &[f32],
        filter: &ChunkFilter,
        top_k: usize,
    ) -> AppResult<Vec<(ChunkRecord, f32)>>;

    fn stats(&self) -> AppResult<StoreStats>;

    /// Delete all data.
    fn reset(&mut self) -> AppResult<()>;
}

/// SQLite reference implementation of the chunk store.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Storage(format!("Failed to create store directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Storage(format!("Failed to open SQLite store: {}", e)))?;

        Self::init(conn)
    }

    /// Open an in-memory store (tests).
    pub fn in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Storage(format!("Failed to open SQLite store: {}", e)))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS filings (
                id TEXT PRIMARY KEY,
                company TEXT,
                ticker TEXT,
                form TEXT,
                filing_date TEXT,
                source_url TEXT,
                chunk_count INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                filing_id TEXT NOT NULL,
                sequence INTEGER NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL,
                section_set TEXT NOT NULL,
                page_min INTEGER,
                page_max INTEGER,
                node_kinds TEXT NOT NULL,
                oversized INTEGER NOT NULL,
                degraded INTEGER NOT NULL,
                metadata TEXT NOT NULL,
                FOREIGN KEY (filing_id) REFERENCES filings(id)
            );

            CREATE INDEX IF NOT EXISTS idx_chunks_filing ON chunks(filing_id);
            CREATE INDEX IF NOT EXISTS idx_chunks_pages ON chunks(page_min, page_max);
            "#,
        )
        .map_err(|e| AppError::Storage(format!("Failed to create tables: {}", e)))?;

        Ok(Self { conn })
    }
}

impl ChunkStore for SqliteStore {
    fn persist_filing(&mut self, meta: &FilingMeta, chunks: &[StoredChunk]) -> AppResult<()> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| AppError::Storage(format!("Failed to begin transaction: {}", e)))?;

        tx.execute("DELETE FROM chunks WHERE filing_id = ?1", params![meta.filing_id])
            .map_err(|e| AppError::Storage(format!("Failed to clear old chunks: {}", e)))?;

        tx.execute(
            "INSERT OR REPLACE INTO filings (id, company, ticker, form, filing_date, source_url, chunk_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                meta.filing_id,
                meta.company,
                meta.ticker,
                meta.form,
                meta.filing_date.map(|d| d.to_string()),
                meta.source_url,
                chunks.len() as i64,
            ],
        )
        .map_err(|e| AppError::Storage(format!("Failed to insert filing: {}", e)))?;

        for stored in chunks {
            let chunk = &stored.chunk;
            let section_set = serde_json::to_string(&chunk.metadata.section_set)?;
            let node_kinds = serde_json::to_string(&chunk.metadata.node_kinds)?;
            let metadata = serde_json::to_string(&chunk.metadata)?;

            tx.execute(
                "INSERT INTO chunks (id, filing_id, sequence, content, embedding, section_set,
                                     page_min, page_max, node_kinds, oversized, degraded, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    chunk.id,
                    chunk.filing_id,
                    chunk.sequence as i64,
                    chunk.content,
                    embedding_to_bytes(&stored.embedding),
                    section_set,
                    chunk.metadata.page_min.map(|p| p as i64),
                    chunk.metadata.page_max.map(|p| p as i64),
                    node_kinds,
                    chunk.metadata.oversized as i64,
                    chunk.metadata.degraded as i64,
                    metadata,
                ],
            )
            .map_err(|e| AppError::Storage(format!("Failed to insert chunk: {}", e)))?;
        }

        tx.commit()
            .map_err(|e| AppError::Storage(format!("Failed to commit: {}", e)))?;

        tracing::debug!(
            "Persisted {} chunks for filing {}",
            chunks.len(),
            meta.filing_id
        );
        Ok(())
    }

    fn query(
        &self,
        embedding: &[f32],
        filter: &ChunkFilter,
        top_k: usize,
    ) -> AppResult<Vec<(ChunkRecord, f32)>> {
        let mut sql = String::from(
            "SELECT id, filing_id, sequence, content, embedding, metadata FROM chunks WHERE 1=1",
        );
        let mut params: Vec<rusqlite::types::Value> = Vec::new();

        if let Some(filing_id) = &filter.filing_id {
            sql.push_str(&format!(" AND filing_id = ?{}", params.len() + 1));
            params.push(filing_id.clone().into());
        }
        if let Some(page_max) = filter.page_max {
            sql.push_str(&format!(" AND page_min <= ?{}", params.len() + 1));
            params.push((page_max as i64).into());
        }
        if let Some(page_min) = filter.page_min {
            sql.push_str(&format!(" AND page_max >= ?{}", params.len() + 1));
            params.push((page_min as i64).into());
        }

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| AppError::Storage(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(rusqlite::params_from_iter(params), |row| {
                let embedding_bytes: Vec<u8> = row.get(4)?;
                let metadata_json: String = row.get(5)?;
                Ok((
                    ChunkRecord {
                        id: row.get(0)?,
                        filing_id: row.get(1)?,
                        sequence: row.get::<_, i64>(2)? as u32,
                        content: row.get(3)?,
                        metadata: serde_json::from_str(&metadata_json).map_err(|e| {
                            rusqlite::Error::ToSqlConversionFailure(Box::new(e))
                        })?,
                    },
                    bytes_to_embedding(&embedding_bytes),
                ))
            })
            .map_err(|e| AppError::Storage(format!("Failed to query chunks: {}", e)))?;

        let mut results: Vec<(ChunkRecord, f32)> = rows
            .filter_map(|r| r.ok())
            .filter(|(record, _)| {
                let section_ok = filter
                    .section
                    .as_ref()
                    .map(|s| record.metadata.section_set.contains(s))
                    .unwrap_or(true);
                let kind_ok = filter
                    .kind
                    .map(|k| record.metadata.node_kinds.contains(&k))
                    .unwrap_or(true);
                section_ok && kind_ok
            })
            .map(|(record, chunk_embedding)| {
                let score = cosine_similarity(embedding, &chunk_embedding);
                (record, score)
            })
            .collect();

        // Sort by score descending
        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);

        tracing::debug!("Retrieved {} chunks (requested top-{})", results.len(), top_k);
        Ok(results)
    }

    fn stats(&self) -> AppResult<StoreStats> {
        let filings_count: u32 = self
            .conn
            .query_row("SELECT COUNT(*) FROM filings", [], |row| {
                row.get::<_, i64>(0).map(|v| v as u32)
            })
            .map_err(|e| AppError::Storage(format!("Failed to count filings: {}", e)))?;

        let chunks_count: u32 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| {
                row.get::<_, i64>(0).map(|v| v as u32)
            })
            .map_err(|e| AppError::Storage(format!("Failed to count chunks: {}", e)))?;

        Ok(StoreStats {
            filings_count,
            chunks_count,
        })
    }

    fn reset(&mut self) -> AppResult<()> {
        self.conn
            .execute("DELETE FROM chunks", [])
            .map_err(|e| AppError::Storage(format!("Failed to delete chunks: {}", e)))?;
        self.conn
            .execute("DELETE FROM filings", [])
            .map_err(|e| AppError::Storage(format!("Failed to delete filings: {}", e)))?;

        tracing::info!("Reset chunk store");
        Ok(())
    }
}

/// Convert embedding vector to little-endian bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to an embedding vector. Trailing partial values
/// are ignored.
fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Calculate cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{ChunkMetadata, NodeSpan};
    use std::collections::BTreeSet;

    fn stored_chunk(
        filing_id: &str,
        sequence: u32,
        section: &str,
        pages: (u32, u32),
        kind: NodeKind,
        embedding: Vec<f32>,
    ) -> StoredChunk {
        let mut section_set = BTreeSet::new();
        section_set.insert(section.to_string());
        let mut node_kinds = BTreeSet::new();
        node_kinds.insert(kind);

        StoredChunk {
            chunk: Chunk {
                id: format!("{}:{:04}", filing_id, sequence),
                filing_id: filing_id.to_string(),
                sequence,
                content: format!("chunk {} of {}", sequence, filing_id),
                spans: vec![NodeSpan {
                    node: "text_00000".to_string(),
                    range: None,
                }],
                overlap: None,
                metadata: ChunkMetadata {
                    section_set,
                    page_min: Some(pages.0),
                    page_max: Some(pages.1),
                    node_kinds,
                    ..Default::default()
                },
            },
            embedding,
        }
    }

    fn meta(filing_id: &str) -> FilingMeta {
        FilingMeta {
            filing_id: filing_id.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_persist_and_stats() {
        let mut store = SqliteStore::in_memory().unwrap();
        let chunks = vec![
            stored_chunk("f1", 0, "Item 1", (1, 2), NodeKind::Text, vec![1.0, 0.0]),
            stored_chunk("f1", 1, "Item 1A", (3, 4), NodeKind::Table, vec![0.0, 1.0]),
        ];

        store.persist_filing(&meta("f1"), &chunks).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.filings_count, 1);
        assert_eq!(stats.chunks_count, 2);
    }

    #[test]
    fn test_reindex_replaces_chunks() {
        let mut store = SqliteStore::in_memory().unwrap();
        let first = vec![
            stored_chunk("f1", 0, "Item 1", (1, 1), NodeKind::Text, vec![1.0, 0.0]),
            stored_chunk("f1", 1, "Item 1", (1, 1), NodeKind::Text, vec![1.0, 0.0]),
        ];
        let second = vec![stored_chunk(
            "f1",
            0,
            "Item 1",
            (1, 1),
            NodeKind::Text,
            vec![1.0, 0.0],
        )];

        store.persist_filing(&meta("f1"), &first).unwrap();
        store.persist_filing(&meta("f1"), &second).unwrap();

        assert_eq!(store.stats().unwrap().chunks_count, 1);
    }

    #[test]
    fn test_query_similarity_ordering() {
        let mut store = SqliteStore::in_memory().unwrap();
        let chunks = vec![
            stored_chunk("f1", 0, "Item 1", (1, 1), NodeKind::Text, vec![1.0, 0.0]),
            stored_chunk("f1", 1, "Item 1", (1, 1), NodeKind::Text, vec![0.0, 1.0]),
        ];
        store.persist_filing(&meta("f1"), &chunks).unwrap();

        let results = store
            .query(&[1.0, 0.0], &ChunkFilter::default(), 5)
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.sequence, 0);
        assert!(results[0].1 > results[1].1);
    }

    #[test]
    fn test_query_exact_filters() {
        let mut store = SqliteStore::in_memory().unwrap();
        let chunks = vec![
            stored_chunk("f1", 0, "Item 1", (1, 2), NodeKind::Text, vec![1.0, 0.0]),
            stored_chunk("f1", 1, "Item 7", (10, 12), NodeKind::Table, vec![1.0, 0.0]),
        ];
        store.persist_filing(&meta("f1"), &chunks).unwrap();
        store
            .persist_filing(
                &meta("f2"),
                &[stored_chunk("f2", 0, "Item 7", (10, 12), NodeKind::Text, vec![1.0, 0.0])],
            )
            .unwrap();

        // Section filter
        let filter = ChunkFilter {
            section: Some("Item 7".to_string()),
            ..Default::default()
        };
        let results = store.query(&[1.0, 0.0], &filter, 10).unwrap();
        assert_eq!(results.len(), 2);

        // Section + filing filter
        let filter = ChunkFilter {
            filing_id: Some("f1".to_string()),
            section: Some("Item 7".to_string()),
            ..Default::default()
        };
        let results = store.query(&[1.0, 0.0], &filter, 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.filing_id, "f1");

        // Page range filter excludes the Item 1 chunk
        let filter = ChunkFilter {
            filing_id: Some("f1".to_string()),
            page_min: Some(11),
            page_max: Some(20),
            ..Default::default()
        };
        let results = store.query(&[1.0, 0.0], &filter, 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.sequence, 1);

        // Kind filter
        let filter = ChunkFilter {
            kind: Some(NodeKind::Table),
            ..Default::default()
        };
        let results = store.query(&[1.0, 0.0], &filter, 10).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].0.metadata.node_kinds.contains(&NodeKind::Table));
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &c).abs() < 0.001);
    }

    #[test]
    fn test_embedding_roundtrip() {
        let embedding = vec![0.25, -1.5, 3.0];
        let bytes = embedding_to_bytes(&embedding);
        assert_eq!(bytes_to_embedding(&bytes), embedding);
    }
}
