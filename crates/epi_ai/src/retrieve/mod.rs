//! Two-stage retrieval: top-k cosine relevance, then greedy
//! maximal-marginal-relevance re-ranking for diversity.

use std::collections::{BTreeMap, BTreeSet};

use epi_core::error::AppError;

use crate::chunks::{Chunk, ChunkStore, VectorStore};

pub mod filter;
pub mod similarity;

pub use filter::{prefilter, HeuristicClassifier, QueryClassifier, QueryFilter};

pub const DEFAULT_TOP_K: usize = 10;
pub const DEFAULT_SELECT_N: usize = 3;
pub const DEFAULT_MMR_LAMBDA: f32 = 0.7;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk_key: String,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct RetrieveOptions {
    pub top_k: usize,
    pub select_n: usize,
    pub lambda: f32,
}

impl Default for RetrieveOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            select_n: DEFAULT_SELECT_N,
            lambda: DEFAULT_MMR_LAMBDA,
        }
    }
}

/// Score every candidate against the query and keep the best `k`.
///
/// Candidates arrive in chunk-key order from the store; ties on score keep
/// that order (the explicit key tie-break makes the sort deterministic even
/// across unstable re-orderings upstream).
pub fn top_k(query: &[f32], candidates: &[(String, Vec<f32>)], k: usize) -> Vec<ScoredChunk> {
    let mut scored: Vec<ScoredChunk> = candidates
        .iter()
        .map(|(key, vec)| ScoredChunk {
            chunk_key: key.clone(),
            score: similarity::dot(query, vec),
        })
        .collect();
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk_key.cmp(&b.chunk_key))
    });
    scored.truncate(k);
    scored
}

/// Greedy MMR selection over the shortlist.
///
/// At each step every unselected candidate scores
/// `lambda * relevance - (1 - lambda) * max_similarity(candidate, selected)`
/// with max-similarity 0 for an empty selection; the strict comparison keeps
/// the earliest shortlist position on ties. Greedy is intentional — O(n*k)
/// and deterministic for a fixed input order.
pub fn mmr(
    query: &[f32],
    shortlist: &[ScoredChunk],
    vectors: &BTreeMap<String, Vec<f32>>,
    n: usize,
    lambda: f32,
) -> Vec<ScoredChunk> {
    let mut selected: Vec<ScoredChunk> = Vec::new();
    let mut remaining: Vec<ScoredChunk> = shortlist.to_vec();

    while selected.len() < n && !remaining.is_empty() {
        let mut best_idx: Option<usize> = None;
        let mut best_score = f32::NEG_INFINITY;

        for (i, cand) in remaining.iter().enumerate() {
            let Some(cand_vec) = vectors.get(&cand.chunk_key) else {
                continue;
            };
            let relevance = similarity::dot(query, cand_vec);

            let mut max_sim = 0.0f32;
            for sel in &selected {
                if let Some(sel_vec) = vectors.get(&sel.chunk_key) {
                    let sim = similarity::dot(cand_vec, sel_vec);
                    if sim > max_sim {
                        max_sim = sim;
                    }
                }
            }

            let score = lambda * relevance - (1.0 - lambda) * max_sim;
            if score > best_score {
                best_score = score;
                best_idx = Some(i);
            }
        }

        match best_idx {
            Some(i) => selected.push(remaining.remove(i)),
            None => break,
        }
    }

    selected
}

/// Full retrieval pass for one query vector: prefilter, score, diversify,
/// fetch the selected chunks.
///
/// Embeddings with no matching chunk — or whose stored hash no longer
/// matches the chunk text — are inert and never scored. If the heuristic
/// restriction removes every candidate, scoring falls back to the whole
/// corpus.
pub fn search(
    chunks: &ChunkStore,
    vectors: &VectorStore,
    query_vec: &[f32],
    filter: &QueryFilter,
    opts: &RetrieveOptions,
) -> Result<Vec<Chunk>, AppError> {
    let all_chunks = chunks.list_all()?;
    if all_chunks.is_empty() {
        return Ok(Vec::new());
    }

    let allowed: BTreeSet<String> = filter::prefilter(&all_chunks, filter).into_iter().collect();

    let by_key: BTreeMap<&str, &Chunk> = all_chunks
        .iter()
        .map(|c| (c.chunk_key.as_str(), c))
        .collect();
    let live: Vec<(String, Vec<f32>)> = vectors
        .read_all()?
        .into_iter()
        .filter(|rec| {
            by_key
                .get(rec.chunk_key.as_str())
                .map(|c| rec.matches_text(&c.text))
                .unwrap_or(false)
        })
        .map(|rec| (rec.chunk_key, rec.vec))
        .collect();

    let filtered: Vec<(String, Vec<f32>)> = live
        .iter()
        .filter(|(key, _)| allowed.contains(key))
        .cloned()
        .collect();
    let candidates = if filtered.is_empty() { live } else { filtered };

    let shortlist = top_k(query_vec, &candidates, opts.top_k);
    let vector_map: BTreeMap<String, Vec<f32>> = candidates.into_iter().collect();
    let diversified = mmr(query_vec, &shortlist, &vector_map, opts.select_n, opts.lambda);

    tracing::debug!(
        selected = ?diversified.iter().map(|s| s.chunk_key.as_str()).collect::<Vec<_>>(),
        "retrieval selection"
    );

    let keys: Vec<String> = diversified.into_iter().map(|s| s.chunk_key).collect();
    let fetched = chunks.get_by_keys(&keys)?;
    Ok(dedupe_by_key(fetched))
}

fn dedupe_by_key(chunks: Vec<Chunk>) -> Vec<Chunk> {
    let mut seen = BTreeSet::new();
    chunks
        .into_iter()
        .filter(|c| seen.insert(c.chunk_key.clone()))
        .collect()
}
