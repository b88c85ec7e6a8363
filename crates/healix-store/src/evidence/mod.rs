//! Domain evidence retrieval
//!
//! Each domain has a fixed passage collection ([`corpus`]) searchable two ways:
//! a tantivy keyword index and, when an [`Embedder`] is configured, a persisted
//! embedding index. Both are built lazily on first use per domain and reused
//! across restarts. Rankings from the two legs are merged with reciprocal rank
//! fusion, deduplicated by passage text, and capped.
//!
//! If one leg fails the other answers alone. Only when every available leg
//! fails does [`EvidenceStore::search`] return an error, and
//! [`EvidenceStore::search_text`] turns even that into a readable sentence.

pub mod corpus;
mod keyword;
mod vectors;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::embeddings::Embedder;
pub use corpus::EvidenceDocument;
pub use keyword::KeywordIndex;
use vectors::{SemanticIndex, VectorTable};

/// Candidates pulled from the fused ranking before deduplication
pub const CANDIDATES: usize = 5;
/// Passages returned after deduplication
pub const MAX_RESULTS: usize = 4;
/// Reply when nothing matches
pub const NO_EVIDENCE: &str = "No relevant medical knowledge found for this query.";

const RRF_K: f32 = 60.0;
const VECTOR_DB: &str = "vectors.db";

/// Evidence domains, one collection each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Clinical,
    Nutrition,
    Exercise,
    Risk,
}

impl Domain {
    pub const ALL: [Domain; 4] = [Self::Clinical, Self::Nutrition, Self::Exercise, Self::Risk];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clinical => "clinical",
            Self::Nutrition => "nutrition",
            Self::Exercise => "exercise",
            Self::Risk => "risk",
        }
    }

    fn slot(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == wanted)
            .ok_or_else(|| anyhow!("Unknown evidence domain: {}", s))
    }
}

/// A ranked passage
#[derive(Debug, Clone, Copy)]
pub struct EvidenceHit {
    pub document: &'static EvidenceDocument,
    /// Fused reciprocal-rank score
    pub score: f32,
}

impl EvidenceHit {
    /// `[Source: <source> | Topic: <topic>]` followed by the passage
    pub fn citation(&self) -> String {
        format!(
            "[Source: {} | Topic: {}]\n{}",
            self.document.source, self.document.topic, self.document.text
        )
    }
}

/// Render hits the way search tools return them
pub fn format_hits(hits: &[EvidenceHit]) -> String {
    if hits.is_empty() {
        return NO_EVIDENCE.to_string();
    }
    hits.iter()
        .map(EvidenceHit::citation)
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[derive(Default)]
struct DomainIndexes {
    keyword: OnceCell<Arc<KeywordIndex>>,
    semantic: OnceCell<SemanticIndex>,
}

/// Lazily built, persisted evidence indexes for every domain
pub struct EvidenceStore {
    index_dir: PathBuf,
    embedder: Option<Arc<dyn Embedder>>,
    vectors: OnceCell<VectorTable>,
    domains: [DomainIndexes; 4],
}

impl EvidenceStore {
    /// Keyword-only store rooted at `index_dir`; nothing touches disk until the
    /// first search
    pub fn new<P: AsRef<Path>>(index_dir: P) -> Self {
        Self {
            index_dir: index_dir.as_ref().to_path_buf(),
            embedder: None,
            vectors: OnceCell::new(),
            domains: Default::default(),
        }
    }

    /// Enable the semantic leg
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    /// Ranked, deduplicated passages for `query` in `domain`
    pub async fn search(&self, domain: Domain, query: &str) -> Result<Vec<EvidenceHit>> {
        let docs = corpus::documents(domain);

        let (keyword, semantic) = tokio::join!(
            self.keyword_ranking(domain, query),
            self.semantic_ranking(domain, query)
        );

        let rankings = match (keyword, semantic) {
            (Ok(k), None) => vec![k],
            (Ok(k), Some(Ok(s))) => vec![k, s],
            (Ok(k), Some(Err(e))) => {
                warn!("Semantic {} search failed, using keyword results only: {:#}", domain, e);
                vec![k]
            }
            (Err(e), Some(Ok(s))) => {
                warn!("Keyword {} search failed, using semantic results only: {:#}", domain, e);
                vec![s]
            }
            (Err(ke), Some(Err(se))) => {
                return Err(ke.context(format!("semantic search also failed: {:#}", se)));
            }
            (Err(e), None) => return Err(e),
        };

        let hits = dedup_hits(docs, fuse(&rankings, CANDIDATES));
        debug!("{} search for '{}' returned {} passages", domain, query, hits.len());
        Ok(hits)
    }

    /// Like [`search`](Self::search) but always yields text for a tool reply
    pub async fn search_text(&self, domain: Domain, query: &str) -> String {
        match self.search(domain, query).await {
            Ok(hits) => format_hits(&hits),
            Err(e) => format!("Knowledge base search encountered an issue: {:#}", e),
        }
    }

    /// Build or load every domain's indexes up front
    pub async fn warm_up(&self) -> Vec<(Domain, Result<()>)> {
        info!("Initializing evidence indexes under {:?}", self.index_dir);
        let mut report = Vec::with_capacity(Domain::ALL.len());
        for domain in Domain::ALL {
            let mut outcome = self.keyword_index(domain).await.map(|_| ());
            if outcome.is_ok() {
                if let Some(embedder) = &self.embedder {
                    outcome = self
                        .semantic_index(domain, embedder.as_ref())
                        .await
                        .map(|_| ());
                }
            }
            match &outcome {
                Ok(()) => info!("{} evidence ready", domain),
                Err(e) => warn!("{} evidence failed to initialize: {:#}", domain, e),
            }
            report.push((domain, outcome));
        }
        report
    }

    async fn keyword_index(&self, domain: Domain) -> Result<Arc<KeywordIndex>> {
        let cell = &self.domains[domain.slot()].keyword;
        let index = cell
            .get_or_try_init(|| async {
                let path = self.index_dir.join(domain.as_str());
                let docs = corpus::documents(domain);
                tokio::task::spawn_blocking(move || {
                    let index = KeywordIndex::open(&path)?;
                    index.sync(docs)?;
                    Ok::<_, anyhow::Error>(Arc::new(index))
                })
                .await
                .context("spawn_blocking task panicked")?
            })
            .await?;
        Ok(Arc::clone(index))
    }

    async fn keyword_ranking(&self, domain: Domain, query: &str) -> Result<Vec<usize>> {
        let index = self.keyword_index(domain).await?;
        let query = query.to_string();
        let ids = tokio::task::spawn_blocking(move || index.search(&query, CANDIDATES))
            .await
            .context("spawn_blocking task panicked")??;

        let docs = corpus::documents(domain);
        Ok(ids
            .iter()
            .filter_map(|id| docs.iter().position(|d| d.id == id.as_str()))
            .collect())
    }

    async fn vector_table(&self) -> Result<&VectorTable> {
        self.vectors
            .get_or_try_init(|| async {
                let dir = self.index_dir.clone();
                tokio::task::spawn_blocking(move || {
                    std::fs::create_dir_all(&dir)
                        .with_context(|| format!("Failed to create index directory {:?}", dir))?;
                    VectorTable::open(dir.join(VECTOR_DB))
                })
                .await
                .context("spawn_blocking task panicked")?
            })
            .await
    }

    async fn semantic_index(&self, domain: Domain, embedder: &dyn Embedder) -> Result<&SemanticIndex> {
        let table = self.vector_table().await?;
        self.domains[domain.slot()]
            .semantic
            .get_or_try_init(|| {
                SemanticIndex::load(table, embedder, domain, corpus::documents(domain))
            })
            .await
    }

    /// `None` when no embedder is configured
    async fn semantic_ranking(&self, domain: Domain, query: &str) -> Option<Result<Vec<usize>>> {
        let embedder = self.embedder.as_deref()?;
        Some(
            async {
                let index = self.semantic_index(domain, embedder).await?;
                index.search(embedder, query, CANDIDATES).await
            }
            .await,
        )
    }
}

/// Reciprocal rank fusion over corpus positions. Equal scores keep corpus order.
fn fuse(rankings: &[Vec<usize>], limit: usize) -> Vec<(usize, f32)> {
    let mut scores: BTreeMap<usize, f32> = BTreeMap::new();
    for ranking in rankings {
        for (rank, &pos) in ranking.iter().enumerate() {
            *scores.entry(pos).or_default() += 1.0 / (RRF_K + rank as f32 + 1.0);
        }
    }
    let mut fused: Vec<(usize, f32)> = scores.into_iter().collect();
    fused.sort_by(|a, b| b.1.total_cmp(&a.1));
    fused.truncate(limit);
    fused
}

fn dedup_hits(docs: &'static [EvidenceDocument], fused: Vec<(usize, f32)>) -> Vec<EvidenceHit> {
    let mut seen = HashSet::new();
    fused
        .into_iter()
        .filter_map(|(pos, score)| docs.get(pos).map(|document| EvidenceHit { document, score }))
        .filter(|hit| seen.insert(hit.document.text))
        .take(MAX_RESULTS)
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::hash::{DefaultHasher, Hash, Hasher};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const DIM: usize = 256;

    /// Bag-of-words hashing embedder, deterministic and offline
    pub(crate) struct HashEmbedder {
        model: String,
    }

    impl HashEmbedder {
        pub(crate) fn new(model: &str) -> Self {
            Self {
                model: model.to_string(),
            }
        }
    }

    #[async_trait]
    impl Embedder for HashEmbedder {
        fn model(&self) -> &str {
            &self.model
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|text| {
                    let mut v = vec![0.0f32; DIM];
                    for token in text
                        .to_lowercase()
                        .split(|c: char| !c.is_alphanumeric())
                        .filter(|t| !t.is_empty())
                    {
                        let mut hasher = DefaultHasher::new();
                        token.hash(&mut hasher);
                        v[(hasher.finish() as usize) % DIM] += 1.0;
                    }
                    v
                })
                .collect())
        }
    }

    /// Counts how many texts pass through to the inner embedder
    pub(crate) struct CountingEmbedder<E> {
        inner: E,
        pub(crate) embedded: AtomicUsize,
    }

    impl<E> CountingEmbedder<E> {
        pub(crate) fn new(inner: E) -> Self {
            Self {
                inner,
                embedded: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl<E: Embedder> Embedder for CountingEmbedder<E> {
        fn model(&self) -> &str {
            self.inner.model()
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.embedded.fetch_add(texts.len(), Ordering::SeqCst);
            self.inner.embed(texts).await
        }
    }

    pub(crate) struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        fn model(&self) -> &str {
            "unreachable"
        }

        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(anyhow!("connection refused"))
        }
    }

    #[tokio::test]
    async fn test_keyword_search_returns_cited_passages() -> Result<()> {
        let temp = TempDir::new()?;
        let store = EvidenceStore::new(temp.path());

        let hits = store.search(Domain::Clinical, "blood pressure hypertension").await?;
        assert!(!hits.is_empty());
        assert!(hits.len() <= MAX_RESULTS);
        let topic = hits[0].document.topic;
        assert!(topic == "blood_pressure" || topic == "hypertension_exercise");

        let texts: HashSet<_> = hits.iter().map(|h| h.document.text).collect();
        assert_eq!(texts.len(), hits.len());

        let text = format_hits(&hits);
        assert!(text.starts_with("[Source: clinical_guidelines | Topic: "));
        Ok(())
    }

    #[tokio::test]
    async fn test_repeated_search_is_identical() -> Result<()> {
        let temp = TempDir::new()?;
        let store = EvidenceStore::new(temp.path())
            .with_embedder(Arc::new(HashEmbedder::new("hash-v1")));

        let first = store.search_text(Domain::Exercise, "knee squat safe load").await;
        let second = store.search_text(Domain::Exercise, "knee squat safe load").await;
        assert_eq!(first, second);

        let reopened = EvidenceStore::new(temp.path())
            .with_embedder(Arc::new(HashEmbedder::new("hash-v1")));
        let third = reopened.search_text(Domain::Exercise, "knee squat safe load").await;
        assert_eq!(first, third);
        Ok(())
    }

    #[tokio::test]
    async fn test_hybrid_search_finds_semantic_match() -> Result<()> {
        let temp = TempDir::new()?;
        let store = EvidenceStore::new(temp.path())
            .with_embedder(Arc::new(HashEmbedder::new("hash-v1")));

        let hits = store
            .search(Domain::Nutrition, "creatine monohydrate supplements")
            .await?;
        assert_eq!(hits[0].document.topic, "supplements");
        Ok(())
    }

    #[tokio::test]
    async fn test_semantic_failure_falls_back_to_keywords() -> Result<()> {
        let temp = TempDir::new()?;
        let store = EvidenceStore::new(temp.path()).with_embedder(Arc::new(FailingEmbedder));

        let text = store.search_text(Domain::Nutrition, "protein whey").await;
        assert!(text.contains("[Source: nutrition_science | Topic: protein]"));
        Ok(())
    }

    #[tokio::test]
    async fn test_both_legs_failing_yields_unavailable_text() -> Result<()> {
        let temp = TempDir::new()?;
        let blocker = temp.path().join("not-a-dir");
        std::fs::write(&blocker, b"occupied")?;

        let store = EvidenceStore::new(&blocker).with_embedder(Arc::new(FailingEmbedder));
        assert!(store.search(Domain::Risk, "stress").await.is_err());

        let text = store.search_text(Domain::Risk, "stress").await;
        assert!(text.starts_with("Knowledge base search encountered an issue"));
        Ok(())
    }

    #[tokio::test]
    async fn test_no_match_is_explicit() -> Result<()> {
        let temp = TempDir::new()?;
        let store = EvidenceStore::new(temp.path());
        let text = store.search_text(Domain::Risk, "zzqxv").await;
        assert_eq!(text, NO_EVIDENCE);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_first_access_builds_once() -> Result<()> {
        let temp = TempDir::new()?;
        let store = Arc::new(EvidenceStore::new(temp.path()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.search(Domain::Clinical, "heart rate").await
            }));
        }
        for handle in handles {
            assert!(!handle.await??.is_empty());
        }

        let index = store.keyword_index(Domain::Clinical).await?;
        assert_eq!(
            index.num_docs(),
            corpus::documents(Domain::Clinical).len() as u64
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_warm_up_initializes_every_domain() -> Result<()> {
        let temp = TempDir::new()?;
        let store = EvidenceStore::new(temp.path())
            .with_embedder(Arc::new(HashEmbedder::new("hash-v1")));

        let report = store.warm_up().await;
        assert_eq!(report.len(), 4);
        assert!(report.iter().all(|(_, r)| r.is_ok()));
        for domain in Domain::ALL {
            assert!(temp.path().join(domain.as_str()).join("meta.json").exists());
        }
        assert!(temp.path().join(VECTOR_DB).exists());
        Ok(())
    }

    #[test]
    fn test_fuse_breaks_ties_by_corpus_order() {
        let fused = fuse(&[vec![2, 0], vec![0, 2]], CANDIDATES);
        assert_eq!(fused.iter().map(|f| f.0).collect::<Vec<_>>(), vec![0, 2]);

        let fused = fuse(&[vec![1], vec![1, 3]], CANDIDATES);
        assert_eq!(fused[0].0, 1);
        assert_eq!(fused.len(), 2);
    }

    #[test]
    fn test_dedup_caps_results() {
        let docs = corpus::documents(Domain::Clinical);
        let fused: Vec<_> = (0..CANDIDATES).map(|p| (p, 1.0)).collect();
        assert_eq!(dedup_hits(docs, fused).len(), MAX_RESULTS);
    }

    const fn doc(id: &'static str, text: &'static str) -> EvidenceDocument {
        EvidenceDocument {
            id,
            text,
            source: "test",
            topic: "dup",
            lang: "en",
        }
    }

    static WITH_DUPLICATE: &[EvidenceDocument] = &[
        doc("a", "Hydrate before training."),
        doc("a-copy", "Hydrate before training."),
        doc("b", "Warm up for ten minutes."),
        doc("c", "Sleep seven to nine hours."),
        doc("d", "Limit sodium to 2300 mg."),
    ];

    #[test]
    fn test_dedup_drops_repeated_text_before_capping() {
        let fused: Vec<_> = (0..WITH_DUPLICATE.len()).map(|p| (p, 1.0 / (p as f32 + 1.0))).collect();
        let hits = dedup_hits(WITH_DUPLICATE, fused);

        let ids: Vec<_> = hits.iter().map(|h| h.document.id).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);

        let texts: HashSet<_> = hits.iter().map(|h| h.document.text).collect();
        assert_eq!(texts.len(), hits.len());
    }

    #[test]
    fn test_domain_parse() {
        assert_eq!("Nutrition".parse::<Domain>().unwrap(), Domain::Nutrition);
        assert!("cardio".parse::<Domain>().is_err());
    }
}
