//! Persistence layer for the Healix agents
//!
//! This crate provides:
//! - SQLite record store read through the [`RecordStore`] trait
//! - Typed views over record bodies
//! - Per-domain evidence retrieval (tantivy keyword index + persisted embeddings)
//! - Ollama embedding client

pub mod embeddings;
pub mod evidence;
pub mod models;
pub mod records;

pub use embeddings::{Embedder, OllamaEmbedder};
pub use evidence::{Domain, EvidenceDocument, EvidenceHit, EvidenceStore, NO_EVIDENCE};
pub use models::*;
pub use records::{Collection, Record, RecordDb, RecordFilter, RecordStore};
