//! Record-to-chunk extraction.
//!
//! Pure and deterministic: the same record always yields byte-identical
//! chunks. Section labels are Spanish and are part of the text contract —
//! each chunk must remain self-describing out of context.

use epi_core::record::{opt_text, scalar_text, ClinicalRecord, CodedEntry, IndicacionesAlta, Laboratorio, MedicamentoAlta, Tratamiento};
use serde_json::Value;

use super::model::{Chunk, ChunkType};

/// Split one clinical record into typed text chunks.
///
/// Sections whose composed text trims to empty are omitted; daily-progress
/// entries with an empty body are dropped rather than chunked as
/// placeholders. A duplicate day (explicit `dia` colliding with another
/// entry) keeps the first entry so chunk keys stay unique.
pub fn build_chunks(record: &ClinicalRecord) -> Vec<Chunk> {
    let mut chunks: Vec<Chunk> = Vec::new();
    let doc_id = record.doc_id();

    let atencion = record.atencion.clone().unwrap_or_default();
    let paciente = record.paciente.clone().unwrap_or_default();

    let ingreso = header_line("[INGRESO]", &atencion.fecha_ingreso);
    let alta_fecha = header_line("[ALTA]", &atencion.fecha_alta);
    let edad = header_line("[EDAD]", &paciente.edad);
    let sexo = header_line("[SEXO]", &paciente.sexo);
    let motivo = header_line("[MOTIVO]", &record.motivo_ingreso);

    // ---------- resumen ----------
    let antecedentes = record.antecedentes.clone().unwrap_or_default();
    let mut ant_text = String::new();
    ant_text.push_str(&list_lines("Antecedentes médicos", &antecedentes.medicos));
    ant_text.push_str(&list_lines("Antecedentes quirúrgicos", &antecedentes.quirurgicos));
    let alergias = opt_text(&antecedentes.alergias);
    if !alergias.is_empty() {
        ant_text.push_str(&format!("Alergias: {alergias}\n"));
    }

    let dx_ingreso = code_name_lines("Diagnóstico de ingreso", &record.diagnostico_ingreso);
    let dx_egreso = code_name_lines("Diagnóstico de egreso", &record.diagnostico_egreso);
    let procs = code_name_lines("Procedimientos", &record.procedimientos);
    let trats = tratamientos_lines(&record.tratamientos_intrahosp);

    let resumen_text = format!(
        "[TIPO] Epicrisis\n{ingreso}{alta_fecha}{edad}{sexo}{motivo}\n{ant_text}\n{dx_ingreso}\n{dx_egreso}\n{procs}\n{trats}"
    )
    .trim()
    .to_string();
    if !resumen_text.is_empty() {
        chunks.push(Chunk {
            chunk_key: format!("{doc_id}::resumen"),
            text: resumen_text,
            source_hint: format!("[DOC {doc_id} | resumen]"),
            chunk_type: ChunkType::Resumen,
            day: None,
        });
    }

    // ---------- evolución diaria ----------
    for (idx, entry) in record.evolucion_resumen.iter().enumerate() {
        let day = coerce_day(&entry.dia).unwrap_or(idx as u32 + 1);
        let body = opt_text(&entry.texto);
        if body.is_empty() {
            continue;
        }
        let chunk_key = format!("{doc_id}::evo:{day}");
        if chunks.iter().any(|c| c.chunk_key == chunk_key) {
            continue;
        }
        let text = format!(
            "[TIPO] Evolución diaria\n[DIA] {day}\n{ingreso}{alta_fecha}\n[TEXTO]\n{body}\n"
        )
        .trim()
        .to_string();
        chunks.push(Chunk {
            chunk_key,
            text,
            source_hint: format!("[DOC {doc_id} | evolucion_dia | dia={day}]"),
            chunk_type: ChunkType::EvolucionDia,
            day: Some(day),
        });
    }

    // ---------- laboratorios ----------
    let labs_body = labs_lines(&record.laboratorios_resumen);
    if !labs_body.is_empty() {
        let text = format!("[TIPO] Laboratorios\n{ingreso}{alta_fecha}\n{labs_body}")
            .trim()
            .to_string();
        chunks.push(Chunk {
            chunk_key: format!("{doc_id}::labs"),
            text,
            source_hint: format!("[DOC {doc_id} | laboratorios]"),
            chunk_type: ChunkType::Laboratorios,
            day: None,
        });
    }

    // ---------- indicaciones de alta ----------
    if let Some(alta) = record.indicaciones_alta.as_ref() {
        let alta_body = alta_lines(alta);
        if !alta_body.is_empty() {
            let text = format!("[TIPO] Indicaciones de alta\n{alta_fecha}\n\n{alta_body}")
                .trim()
                .to_string();
            chunks.push(Chunk {
                chunk_key: format!("{doc_id}::alta"),
                text,
                source_hint: format!("[DOC {doc_id} | alta]"),
                chunk_type: ChunkType::Alta,
                day: None,
            });
        }
    }

    chunks
}

/// Base-10 day coercion: integers and numeric strings parse; anything else
/// falls back to the caller's positional index.
fn coerce_day(v: &Option<Value>) -> Option<u32> {
    match v {
        Some(Value::Number(n)) => n.as_u64().and_then(|d| u32::try_from(d).ok()),
        Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

fn header_line(tag: &str, v: &Option<Value>) -> String {
    let text = opt_text(v);
    if text.is_empty() {
        String::new()
    } else {
        format!("{tag} {text}\n")
    }
}

fn list_lines(title: &str, items: &[Value]) -> String {
    let lines: Vec<String> = items
        .iter()
        .map(scalar_text)
        .filter(|s| !s.is_empty())
        .collect();
    if lines.is_empty() {
        return String::new();
    }
    format!("{title}:\n- {}\n", lines.join("\n- "))
}

fn code_name_lines(title: &str, entries: &[CodedEntry]) -> String {
    let mut lines: Vec<String> = Vec::new();
    for entry in entries {
        let codigo = opt_text(&entry.codigo);
        let nombre = opt_text(&entry.nombre);
        if codigo.is_empty() && nombre.is_empty() {
            continue;
        }
        if !codigo.is_empty() && !nombre.is_empty() {
            lines.push(format!("- {codigo}: {nombre}"));
        } else if codigo.is_empty() {
            lines.push(format!("- {nombre}"));
        } else {
            lines.push(format!("- {codigo}"));
        }
    }
    if lines.is_empty() {
        return String::new();
    }
    format!("{title}:\n{}\n", lines.join("\n"))
}

fn tratamientos_lines(items: &[Tratamiento]) -> String {
    let mut lines: Vec<String> = Vec::new();
    for t in items {
        let codigo = opt_text(&t.codigo); // ATC
        let nombre = opt_text(&t.nombre);
        let via = opt_text(&t.via);
        let dosis = opt_text(&t.dosis);
        let freq = opt_text(&t.frecuencia);
        let inicio = opt_text(&t.inicio);
        let fin = opt_text(&t.fin);

        let mut parts: Vec<String> = Vec::new();
        if !codigo.is_empty() {
            parts.push(format!("[{codigo}]"));
        }
        if !nombre.is_empty() {
            parts.push(nombre);
        }
        if !via.is_empty() {
            parts.push(format!("vía {via}"));
        }
        if !dosis.is_empty() {
            parts.push(format!("dosis {dosis}"));
        }
        if !freq.is_empty() {
            parts.push(format!("freq {freq}"));
        }
        if !inicio.is_empty() || !fin.is_empty() {
            parts.push(format!("({} → {})", or_question(&inicio), or_question(&fin)));
        }
        if !parts.is_empty() {
            lines.push(format!("- {}", parts.join(" ")));
        }
    }
    if lines.is_empty() {
        return String::new();
    }
    format!("Tratamientos intrahospitalarios:\n{}\n", lines.join("\n"))
}

fn labs_lines(items: &[Laboratorio]) -> String {
    let mut lines: Vec<String> = Vec::new();
    for lab in items {
        let prueba = opt_text(&lab.prueba);
        let unidad = opt_text(&lab.unidad);
        let ingreso = lab.ingreso.clone().unwrap_or_default();
        let periodo = lab.periodo.clone().unwrap_or_default();

        let mut parts: Vec<String> = Vec::new();
        if !prueba.is_empty() {
            parts.push(prueba);
        }
        if let Some(valor) = ingreso.valor.as_ref() {
            let v = scalar_text(valor);
            if unidad.is_empty() {
                parts.push(format!("ingreso={v}"));
            } else {
                parts.push(format!("ingreso={v} {unidad}"));
            }
        }
        let estado = opt_text(&ingreso.estado);
        if !estado.is_empty() {
            parts.push(format!("({estado})"));
        }
        if ingreso.rango_inferior.is_some() || ingreso.rango_superior.is_some() {
            parts.push(format!(
                "ref=[{}..{}]",
                bound_text(&ingreso.rango_inferior),
                bound_text(&ingreso.rango_superior)
            ));
        }
        let fecha = opt_text(&ingreso.fecha);
        if !fecha.is_empty() {
            parts.push(format!("fecha={fecha}"));
        }
        if periodo.min.is_some() || periodo.max.is_some() {
            parts.push(format!(
                "periodo[min={}, max={}]",
                bound_text(&periodo.min),
                bound_text(&periodo.max)
            ));
        }
        if !parts.is_empty() {
            lines.push(format!("- {}", parts.join(" ")));
        }
    }
    if lines.is_empty() {
        return String::new();
    }
    format!("Laboratorios resumen:\n{}\n", lines.join("\n"))
}

fn alta_lines(alta: &IndicacionesAlta) -> String {
    let med_lines: Vec<String> = alta
        .medicamentos
        .iter()
        .filter_map(med_line)
        .collect();

    let mut out = String::new();
    if !med_lines.is_empty() {
        out.push_str(&format!("Medicamentos:\n{}\n\n", med_lines.join("\n")));
    }
    out.push_str(&list_lines("Controles", &alta.controles));
    out.push_str(&list_lines("Cuidados", &alta.cuidados));
    out.push_str(&list_lines("Signos de alarma", &alta.signos_alarma));
    out.trim().to_string()
}

fn med_line(m: &MedicamentoAlta) -> Option<String> {
    let codigo = opt_text(&m.codigo);
    let nombre = opt_text(&m.nombre);
    let dosis = opt_text(&m.dosis);
    let via = opt_text(&m.via);
    let freq = opt_text(&m.frecuencia);
    let duracion = opt_text(&m.duracion);

    let mut parts: Vec<String> = Vec::new();
    if !codigo.is_empty() {
        parts.push(format!("[{codigo}]"));
    }
    if !nombre.is_empty() {
        parts.push(nombre);
    }
    if !dosis.is_empty() {
        parts.push(format!("dosis {dosis}"));
    }
    if !via.is_empty() {
        parts.push(format!("vía {via}"));
    }
    if !freq.is_empty() {
        parts.push(format!("freq {freq}"));
    }
    if !duracion.is_empty() {
        parts.push(format!("duración {duracion}"));
    }
    if parts.is_empty() {
        None
    } else {
        Some(format!("- {}", parts.join(" ")))
    }
}

fn or_question(s: &str) -> &str {
    if s.is_empty() {
        "?"
    } else {
        s
    }
}

fn bound_text(v: &Option<Value>) -> String {
    match v {
        Some(value) => scalar_text(value),
        None => "?".to_string(),
    }
}
