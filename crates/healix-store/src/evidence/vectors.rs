//! Persisted passage embeddings
//!
//! One row per (domain, doc_id) holding the passage text and the model that
//! produced the vector, so a corpus edit or a model switch is detected and
//! only the affected rows are re-embedded.

use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use super::Domain;
use super::corpus::EvidenceDocument;
use crate::embeddings::{Embedder, cosine_similarity};

#[derive(Debug, Clone)]
struct StoredVector {
    content: String,
    model: String,
    embedding: Vec<f32>,
}

/// SQLite table of passage embeddings
#[derive(Clone)]
pub struct VectorTable {
    conn: Arc<Mutex<Connection>>,
}

impl VectorTable {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).context("Failed to open vector database")?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS evidence_vectors (
                domain TEXT NOT NULL,
                doc_id TEXT NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL,
                model TEXT NOT NULL,
                PRIMARY KEY (domain, doc_id)
            )",
            [],
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run_blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(|poisoned| {
                warn!("Vector database mutex was poisoned, recovering");
                poisoned.into_inner()
            });
            f(&conn)
        })
        .await
        .context("spawn_blocking task panicked")?
    }

    async fn load(&self, domain: Domain) -> Result<HashMap<String, StoredVector>> {
        self.run_blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT doc_id, content, model, embedding FROM evidence_vectors WHERE domain = ?1",
            )?;
            let rows = stmt.query_map(params![domain.as_str()], |row| {
                let blob: Vec<u8> = row.get(3)?;
                Ok((
                    row.get::<_, String>(0)?,
                    StoredVector {
                        content: row.get(1)?,
                        model: row.get(2)?,
                        embedding: decode_embedding(&blob),
                    },
                ))
            })?;
            let stored = rows.collect::<rusqlite::Result<HashMap<_, _>>>()?;
            Ok(stored)
        })
        .await
    }

    async fn replace(
        &self,
        domain: Domain,
        model: String,
        rows: Vec<(&'static EvidenceDocument, Vec<f32>)>,
        keep: Vec<&'static str>,
    ) -> Result<()> {
        self.run_blocking(move |conn| {
            let tx = conn.unchecked_transaction()?;
            for (doc, embedding) in &rows {
                tx.execute(
                    "INSERT OR REPLACE INTO evidence_vectors (domain, doc_id, content, embedding, model)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        domain.as_str(),
                        doc.id,
                        doc.text,
                        encode_embedding(embedding),
                        &model
                    ],
                )?;
            }

            let existing: Vec<String> = {
                let mut stmt =
                    tx.prepare("SELECT doc_id FROM evidence_vectors WHERE domain = ?1")?;
                let ids = stmt.query_map(params![domain.as_str()], |row| row.get(0))?;
                let ids = ids.collect::<rusqlite::Result<Vec<String>>>()?;
                ids
            };
            for id in existing.iter().filter(|id| !keep.contains(&id.as_str())) {
                tx.execute(
                    "DELETE FROM evidence_vectors WHERE domain = ?1 AND doc_id = ?2",
                    params![domain.as_str(), id],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }
}

/// In-memory semantic index for one domain, aligned with corpus order
pub struct SemanticIndex {
    embeddings: Vec<Vec<f32>>,
}

impl SemanticIndex {
    /// Load persisted vectors for `docs`, embedding and persisting whatever is
    /// missing or stale
    pub async fn load(
        table: &VectorTable,
        embedder: &dyn Embedder,
        domain: Domain,
        docs: &'static [EvidenceDocument],
    ) -> Result<Self> {
        let mut stored = table.load(domain).await?;
        let model = embedder.model().to_string();

        let stale: Vec<&'static EvidenceDocument> = docs
            .iter()
            .filter(|doc| {
                stored
                    .get(doc.id)
                    .is_none_or(|row| row.content != doc.text || row.model != model)
            })
            .collect();

        let has_orphans = stored
            .keys()
            .any(|id| !docs.iter().any(|d| d.id == id.as_str()));

        if !stale.is_empty() || has_orphans {
            let texts: Vec<String> = stale.iter().map(|d| d.text.to_string()).collect();
            let fresh = embedder
                .embed(&texts)
                .await
                .with_context(|| format!("Failed to embed {} evidence", domain))?;

            let rows: Vec<_> = stale.iter().copied().zip(fresh).collect();
            for (doc, embedding) in &rows {
                stored.insert(
                    doc.id.to_string(),
                    StoredVector {
                        content: doc.text.to_string(),
                        model: model.clone(),
                        embedding: embedding.clone(),
                    },
                );
            }
            let keep = docs.iter().map(|d| d.id).collect();
            table.replace(domain, model.clone(), rows, keep).await?;
            info!("Embedded {} {} evidence passages", stale.len(), domain);
        } else {
            debug!("Loaded {} persisted {} vectors", docs.len(), domain);
        }

        let embeddings = docs
            .iter()
            .map(|doc| {
                stored
                    .remove(doc.id)
                    .map(|row| row.embedding)
                    .unwrap_or_default()
            })
            .collect();

        Ok(Self { embeddings })
    }

    /// Rank passages by cosine similarity to `query`, returning corpus
    /// positions best first. Equal scores keep corpus order.
    pub async fn search(
        &self,
        embedder: &dyn Embedder,
        query: &str,
        limit: usize,
    ) -> Result<Vec<usize>> {
        let mut vectors = embedder.embed(&[query.to_string()]).await?;
        let query_vec = vectors.pop().unwrap_or_default();

        let mut scored: Vec<(usize, f32)> = self
            .embeddings
            .iter()
            .enumerate()
            .map(|(pos, emb)| (pos, cosine_similarity(&query_vec, emb)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(limit);
        Ok(scored.into_iter().map(|(pos, _)| pos).collect())
    }
}

fn encode_embedding(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
