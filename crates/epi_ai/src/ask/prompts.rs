use crate::chunks::Chunk;

/// Character budget for one compacted context chunk.
pub const COMPACT_MAX_CHARS: usize = 1200;

const HEADER_TAGS: [&str; 7] = [
    "[TIPO]", "[DIA]", "[INGRESO]", "[ALTA]", "[EDAD]", "[SEXO]", "[MOTIVO]",
];
const MAX_HEADER_LINES: usize = 10;
const TRUNCATION_MARKER: &str = "\n[...TRUNCADO...]";

/// Compact one chunk for prompt insertion: prefer the free-text body after
/// the `[TEXTO]` marker when present, keep a few structured header lines,
/// and truncate to the character budget with an explicit marker.
pub fn compact_chunk_for_prompt(chunk: &Chunk, max_chars: usize) -> String {
    let text = chunk.text.as_str();
    let body = match text.find("[TEXTO]") {
        Some(pos) => text[pos + "[TEXTO]".len()..].trim(),
        None => text.trim(),
    };

    let headers: Vec<&str> = text
        .lines()
        .filter(|line| HEADER_TAGS.iter().any(|tag| line.starts_with(tag)))
        .take(MAX_HEADER_LINES)
        .collect();

    let combined = if headers.is_empty() {
        body.to_string()
    } else {
        format!("{}\n\n{}", headers.join("\n"), body)
    };

    if combined.chars().count() <= max_chars {
        return combined;
    }
    let truncated: String = combined.chars().take(max_chars).collect();
    format!("{truncated}{TRUNCATION_MARKER}")
}

/// Fixed extraction-contract template.
///
/// The completion side is unreliable with loose instructions, so the format
/// is rigid and mechanically checkable by the guardrails layer: exactly four
/// literal excerpts and one `Fuente:` citation line, nothing else.
pub fn build_prompt(chunks: &[Chunk], question: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str("Responde en español.\n");
    prompt.push_str("TAREA: extrae 4 frases EXACTAS del CONTEXTO.\n");
    prompt.push_str("FORMATO: 4 líneas con '- ' y luego una sola línea: 'Fuente: <sourceHint>'.\n");
    prompt.push_str("PROHIBIDO: inventar, resumir, interpretar.\n\n");

    prompt.push_str("CONTEXTO:\n");
    for (i, chunk) in chunks.iter().enumerate() {
        let compact = compact_chunk_for_prompt(chunk, COMPACT_MAX_CHARS);
        prompt.push_str(&format!("{}. {}\n{}\n\n", i + 1, chunk.source_hint, compact));
    }

    prompt.push_str(&format!("Pregunta: {question}\n"));
    prompt.push_str("Respuesta:\n- ");
    prompt
}
