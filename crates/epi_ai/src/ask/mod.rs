//! Question answering over an ingested record.

use std::sync::LazyLock;

use epi_core::error::AppError;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::chunks::{Chunk, ChunkStore, VectorStore};
use crate::embeddings::Embedder;
use crate::guardrails::enforce_extraction;
use crate::llm::{CompletionParams, Llm};
use crate::retrieve::similarity::l2_normalize;
use crate::retrieve::{search, QueryClassifier, RetrieveOptions};

pub mod prompts;

static DAY_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bd[ií]a\s*(\d{1,2})\b").unwrap());

/// Tunables for one question.
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    pub retrieve: RetrieveOptions,
    pub params: CompletionParams,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerResponse {
    pub answer: String,
    pub sources: Vec<Chunk>,
}

/// Answer one question: embed the query, compute the heuristic filter,
/// retrieve a diversified shortlist, assemble the extraction prompt, call
/// the completion engine, and normalize its output.
///
/// Read-only against the stores; safe to run concurrently with other
/// readers, never with an ingestion.
#[allow(clippy::too_many_arguments)]
pub fn answer_question(
    chunks: &ChunkStore,
    vectors: &VectorStore,
    embedder: &dyn Embedder,
    llm: &dyn Llm,
    classifier: &dyn QueryClassifier,
    embed_model: &str,
    llm_model: &str,
    question: &str,
    opts: &AskOptions,
) -> Result<AnswerResponse, AppError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(AppError::new("AI_QUESTION_EMPTY", "Question must not be empty"));
    }

    let raw_qvec = embedder.embed(embed_model, &format!("query: {question}"))?;
    let qvec = l2_normalize(&raw_qvec);

    let filter = classifier.classify(question);
    tracing::debug!(day = ?filter.day, types = ?filter.types, "query filter");

    let selected = search(chunks, vectors, &qvec, &filter, &opts.retrieve)?;

    let prompt = prompts::build_prompt(&selected, question);
    let raw = llm.complete(llm_model, &prompt, &opts.params)?;

    let enforced = enforce_extraction(&raw, &selected);

    if let Some(requested) = filter.day {
        warn_on_day_mismatch(&enforced.answer, requested);
    }

    Ok(AnswerResponse {
        answer: enforced.answer,
        sources: enforced.sources,
    })
}

/// Diagnostic only: a day-restricted question whose answer cites a
/// different day usually means the filter was bypassed by the fallback.
fn warn_on_day_mismatch(answer: &str, requested: u32) {
    let lower = answer.to_lowercase();
    for cap in DAY_MENTION.captures_iter(&lower) {
        if let Ok(mentioned) = cap[1].parse::<u32>() {
            if mentioned != requested {
                tracing::warn!(requested, mentioned, "answer mentions a different day than requested");
                return;
            }
        }
    }
}
