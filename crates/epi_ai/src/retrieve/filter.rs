//! Heuristic question classification.
//!
//! A coarse type/day restriction computed before similarity scoring. The
//! classifier is keyword-based and inherently approximate; it sits behind
//! the [`QueryClassifier`] trait so a learned model can replace it without
//! touching the retriever.

use std::collections::BTreeSet;

use regex::Regex;

use crate::chunks::{Chunk, ChunkType};

/// Restriction derived from one question; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilter {
    pub day: Option<u32>,
    /// Empty set means no type restriction.
    pub types: BTreeSet<ChunkType>,
}

impl QueryFilter {
    pub fn is_unrestricted(&self) -> bool {
        self.day.is_none() && self.types.is_empty()
    }
}

pub trait QueryClassifier {
    fn classify(&self, question: &str) -> QueryFilter;
}

/// Keyword-set classifier over the lower-cased question.
///
/// Day extraction recognizes a spelled form ("día 5") and a compact form
/// ("d5"); the spelled form wins when both appear. The four type tests are
/// independent — a question may match several types — and a detected day
/// alone implies the daily-progress type.
#[derive(Debug)]
pub struct HeuristicClassifier {
    day_spelled: Regex,
    day_compact: Regex,
    alta: Regex,
    laboratorios: Regex,
    resumen: Regex,
    evolucion: Regex,
}

impl HeuristicClassifier {
    pub fn new() -> Self {
        Self {
            day_spelled: Regex::new(r"\bd[ií]a\s*(\d{1,2})\b").unwrap(),
            day_compact: Regex::new(r"\bd(\d{1,2})\b").unwrap(),
            alta: Regex::new(
                r"\balta\b|\bindicaciones\b|\bmedicamentos\b|\bcontrol(es)?\b|\bcuidados\b|\bsignos de alarma\b",
            )
            .unwrap(),
            laboratorios: Regex::new(
                r"\blab(oratorio(s)?)?\b|\bhemoglobina\b|\bhematocrito\b|\bleucocit(os)?\b|\bplaquet(as)?\b|\bcreatinina\b|\burea\b|\bsodio\b|\bpotasio\b|\bph\b",
            )
            .unwrap(),
            resumen: Regex::new(
                r"\bmotivo\b|\bantecedentes\b|\bdiagn[oó]stic(o|os)\b|\bprocedimiento(s)?\b|\btratamiento(s)?\b|\bingreso\b|\begreso\b",
            )
            .unwrap(),
            evolucion: Regex::new(
                r"\bevoluci[oó]n\b|\bpost\s*op\b|\bpostoperatorio\b|\bd[ií]a\b|\bplan\b|\bse sugiere\b|\btorax\b|\bpleurostom[ií]a\b",
            )
            .unwrap(),
        }
    }
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryClassifier for HeuristicClassifier {
    fn classify(&self, question: &str) -> QueryFilter {
        let q = question.to_lowercase();

        let day = self
            .day_spelled
            .captures(&q)
            .and_then(|c| c.get(1))
            .or_else(|| self.day_compact.captures(&q).and_then(|c| c.get(1)))
            .and_then(|m| m.as_str().parse::<u32>().ok());

        let mut types = BTreeSet::new();
        if self.alta.is_match(&q) {
            types.insert(ChunkType::Alta);
        }
        if self.laboratorios.is_match(&q) {
            types.insert(ChunkType::Laboratorios);
        }
        if self.resumen.is_match(&q) {
            types.insert(ChunkType::Resumen);
        }
        if self.evolucion.is_match(&q) || day.is_some() {
            types.insert(ChunkType::EvolucionDia);
        }

        QueryFilter { day, types }
    }
}

/// Intersect the corpus with the filter: by type set first, then by day
/// (only daily-progress chunks whose day matches). An empty intersection
/// falls back to every chunk key so the retriever never scores an empty
/// candidate set.
pub fn prefilter(chunks: &[Chunk], filter: &QueryFilter) -> Vec<String> {
    let mut candidates: Vec<&Chunk> = chunks.iter().collect();

    if !filter.types.is_empty() {
        candidates.retain(|c| filter.types.contains(&c.chunk_type));
    }
    if let Some(day) = filter.day {
        candidates.retain(|c| c.chunk_type == ChunkType::EvolucionDia && c.day == Some(day));
    }

    if candidates.is_empty() {
        return chunks.iter().map(|c| c.chunk_key.clone()).collect();
    }
    candidates.into_iter().map(|c| c.chunk_key.clone()).collect()
}
