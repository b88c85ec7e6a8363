//! Tantivy keyword index over one evidence domain

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use tantivy::{
    Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument,
    collector::TopDocs,
    query::{AllQuery, QueryParser},
    schema::*,
};
use tracing::{debug, info};

use super::corpus::EvidenceDocument;

pub struct KeywordIndex {
    index: Index,
    reader: IndexReader,
    doc_id_field: Field,
    content_field: Field,
}

impl KeywordIndex {
    /// Open the index at `path`, creating it when absent
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create index directory {:?}", path))?;

        let mut schema_builder = Schema::builder();
        let doc_id_field = schema_builder.add_text_field("doc_id", STRING | STORED);
        let content_field = schema_builder.add_text_field("content", TEXT | STORED);
        let schema = schema_builder.build();

        let index = if path.join("meta.json").exists() {
            Index::open_in_dir(path).context("Failed to open keyword index")?
        } else {
            Index::create_in_dir(path, schema).context("Failed to create keyword index")?
        };

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .context("Failed to open keyword index reader")?;

        Ok(Self {
            index,
            reader,
            doc_id_field,
            content_field,
        })
    }

    /// Make the index match `docs` exactly, rebuilding when it is empty or stale.
    ///
    /// Returns true when a rebuild happened.
    pub fn sync(&self, docs: &[EvidenceDocument]) -> Result<bool> {
        if self.matches(docs)? {
            debug!("Keyword index is current ({} docs)", docs.len());
            return Ok(false);
        }

        let mut writer = self.writer()?;
        writer.delete_all_documents()?;
        for doc in docs {
            let mut entry = TantivyDocument::default();
            entry.add_text(self.doc_id_field, doc.id);
            entry.add_text(self.content_field, doc.text);
            writer.add_document(entry)?;
        }
        writer.commit().context("Failed to commit keyword index")?;
        self.reader.reload()?;

        info!("Rebuilt keyword index with {} docs", docs.len());
        Ok(true)
    }

    /// Number of live documents in the index
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Rank documents for `query`, returning doc IDs best first.
    ///
    /// Query syntax errors are tolerated: whatever terms parse are searched
    /// with OR semantics.
    pub fn search(&self, query_str: &str, limit: usize) -> Result<Vec<String>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let searcher = self.reader.searcher();
        let parser = QueryParser::for_index(&self.index, vec![self.content_field]);
        let (query, errors) = parser.parse_query_lenient(query_str);
        if !errors.is_empty() {
            debug!("Ignored {} query parse errors for '{}'", errors.len(), query_str);
        }

        let top_docs = searcher.search(&query, &TopDocs::with_limit(limit))?;
        let mut ids = Vec::with_capacity(top_docs.len());
        for (_score, address) in top_docs {
            let doc: TantivyDocument = searcher.doc(address)?;
            if let Some(id) = doc
                .get_first(self.doc_id_field)
                .and_then(|v: &OwnedValue| v.as_str())
            {
                ids.push(id.to_string());
            }
        }

        debug!("Keyword search for '{}' returned {} docs", query_str, ids.len());
        Ok(ids)
    }

    fn matches(&self, docs: &[EvidenceDocument]) -> Result<bool> {
        let searcher = self.reader.searcher();
        if searcher.num_docs() != docs.len() as u64 {
            return Ok(false);
        }
        if docs.is_empty() {
            return Ok(true);
        }

        let stored = searcher.search(&AllQuery, &TopDocs::with_limit(docs.len()))?;
        let mut indexed: HashMap<String, String> = HashMap::with_capacity(stored.len());
        for (_score, address) in stored {
            let doc: TantivyDocument = searcher.doc(address)?;
            let id = doc
                .get_first(self.doc_id_field)
                .and_then(|v: &OwnedValue| v.as_str())
                .unwrap_or_default();
            let content = doc
                .get_first(self.content_field)
                .and_then(|v: &OwnedValue| v.as_str())
                .unwrap_or_default();
            indexed.insert(id.to_string(), content.to_string());
        }

        Ok(docs
            .iter()
            .all(|d| indexed.get(d.id).is_some_and(|text| text == d.text)))
    }

    fn writer(&self) -> Result<IndexWriter> {
        // 50MB heap size for writer
        self.index
            .writer(50_000_000)
            .context("Failed to create index writer")
    }
}
