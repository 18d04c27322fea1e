use epi_ai::chunks::{build_chunks, ChunkType};
use epi_core::record::parse_record;
use pretty_assertions::assert_eq;
use serde_json::json;

fn sample_record_json() -> String {
    json!({
        "id_atencion": "EP-001",
        "atencion": {"fecha_ingreso": "2024-03-01", "fecha_alta": "2024-03-08"},
        "paciente": {"edad": 62, "sexo": "femenino"},
        "motivo_ingreso": "Dolor torácico agudo",
        "antecedentes": {
            "medicos": ["Hipertensión arterial", "Diabetes mellitus tipo 2"],
            "quirurgicos": ["Colecistectomía (2015)"],
            "alergias": "Penicilina"
        },
        "diagnostico_ingreso": [{"codigo": "I21.0", "nombre": "Infarto agudo de miocardio"}],
        "diagnostico_egreso": [{"codigo": "I21.9", "nombre": "Infarto agudo de miocardio, sin otra especificación"}],
        "procedimientos": [{"codigo": "36.06", "nombre": "Angioplastia coronaria"}],
        "tratamientos_intrahosp": [
            {"codigo": "B01AC06", "nombre": "Aspirina", "via": "oral", "dosis": "100 mg",
             "frecuencia": "c/24h", "inicio": "2024-03-01", "fin": "2024-03-08"}
        ],
        "evolucion_resumen": [
            {"dia": 1, "texto": "Paciente estable"},
            {"dia": 2, "texto": "Afebril"}
        ],
        "laboratorios_resumen": [
            {"prueba": "Hemoglobina", "unidad": "g/dL",
             "ingreso": {"valor": 9.8, "fecha": "2024-03-01", "estado": "bajo",
                          "rango_inferior": 12, "rango_superior": 16},
             "periodo": {"min": 9.1, "max": 11.2}}
        ],
        "indicaciones_alta": {
            "medicamentos": [
                {"codigo": "B01AC06", "nombre": "Aspirina", "dosis": "100 mg", "via": "oral",
                 "frecuencia": "cada 24 horas", "duracion": "indefinida"}
            ],
            "controles": ["Control con cardiología en 7 días"],
            "cuidados": ["Reposo relativo"],
            "signos_alarma": ["Dolor torácico recurrente"]
        }
    })
    .to_string()
}

#[test]
fn chunking_is_deterministic_and_idempotent() {
    let record = parse_record(&sample_record_json()).expect("parse");
    let first = build_chunks(&record);
    let second = build_chunks(&record);
    assert_eq!(first, second);

    let reparsed = parse_record(&sample_record_json()).expect("parse again");
    assert_eq!(first, build_chunks(&reparsed));
}

#[test]
fn chunk_keys_are_unique_within_one_record() {
    let record = parse_record(&sample_record_json()).expect("parse");
    let chunks = build_chunks(&record);
    let mut keys: Vec<&str> = chunks.iter().map(|c| c.chunk_key.as_str()).collect();
    let before = keys.len();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), before);
}

#[test]
fn full_record_yields_all_four_section_types() {
    let record = parse_record(&sample_record_json()).expect("parse");
    let chunks = build_chunks(&record);
    let keys: Vec<&str> = chunks.iter().map(|c| c.chunk_key.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "EP-001::resumen",
            "EP-001::evo:1",
            "EP-001::evo:2",
            "EP-001::labs",
            "EP-001::alta",
        ]
    );
}

#[test]
fn daily_chunks_carry_day_in_key_hint_and_field() {
    let record = parse_record(&sample_record_json()).expect("parse");
    let chunks = build_chunks(&record);
    let evos: Vec<_> = chunks
        .iter()
        .filter(|c| c.chunk_type == ChunkType::EvolucionDia)
        .collect();
    assert_eq!(evos.len(), 2);

    assert_eq!(evos[0].chunk_key, "EP-001::evo:1");
    assert_eq!(evos[0].day, Some(1));
    assert!(evos[0].source_hint.contains("dia=1"));
    assert!(evos[0].text.contains("[TEXTO]\nPaciente estable"));

    assert_eq!(evos[1].chunk_key, "EP-001::evo:2");
    assert_eq!(evos[1].day, Some(2));
    assert!(evos[1].source_hint.contains("dia=2"));
    assert!(evos[1].text.contains("[TEXTO]\nAfebril"));
}

#[test]
fn day_defaults_to_position_when_missing() {
    let raw = json!({
        "id_atencion": "X",
        "evolucion_resumen": [
            {"texto": "Sin novedades"},
            {"texto": "Tolera dieta"}
        ]
    })
    .to_string();
    let chunks = build_chunks(&parse_record(&raw).expect("parse"));
    let keys: Vec<&str> = chunks.iter().map(|c| c.chunk_key.as_str()).collect();
    assert!(keys.contains(&"X::evo:1"));
    assert!(keys.contains(&"X::evo:2"));
}

#[test]
fn non_numeric_day_falls_back_to_position() {
    let raw = json!({
        "id_atencion": "X",
        "evolucion_resumen": [{"dia": "primero", "texto": "Sin novedades"}]
    })
    .to_string();
    let chunks = build_chunks(&parse_record(&raw).expect("parse"));
    let evo = chunks
        .iter()
        .find(|c| c.chunk_type == ChunkType::EvolucionDia)
        .expect("evo chunk");
    assert_eq!(evo.chunk_key, "X::evo:1");
    assert_eq!(evo.day, Some(1));
}

#[test]
fn numeric_string_day_is_parsed_base_10() {
    let raw = json!({
        "id_atencion": "X",
        "evolucion_resumen": [{"dia": "3", "texto": "Tercer día"}]
    })
    .to_string();
    let chunks = build_chunks(&parse_record(&raw).expect("parse"));
    let evo = chunks
        .iter()
        .find(|c| c.chunk_type == ChunkType::EvolucionDia)
        .expect("evo chunk");
    assert_eq!(evo.chunk_key, "X::evo:3");
    assert_eq!(evo.day, Some(3));
}

#[test]
fn empty_daily_entries_are_dropped() {
    let raw = json!({
        "id_atencion": "X",
        "evolucion_resumen": [{"dia": 1, "texto": "   "}, {"dia": 2}]
    })
    .to_string();
    let chunks = build_chunks(&parse_record(&raw).expect("parse"));
    assert!(!chunks.iter().any(|c| c.chunk_type == ChunkType::EvolucionDia));
}

#[test]
fn duplicate_day_keeps_the_first_entry() {
    let raw = json!({
        "id_atencion": "X",
        "evolucion_resumen": [
            {"dia": 1, "texto": "primero"},
            {"dia": 1, "texto": "segundo"}
        ]
    })
    .to_string();
    let chunks = build_chunks(&parse_record(&raw).expect("parse"));
    let evos: Vec<_> = chunks
        .iter()
        .filter(|c| c.chunk_type == ChunkType::EvolucionDia)
        .collect();
    assert_eq!(evos.len(), 1);
    assert!(evos[0].text.contains("primero"));
}

#[test]
fn resumen_chunk_preserves_section_labels() {
    let record = parse_record(&sample_record_json()).expect("parse");
    let chunks = build_chunks(&record);
    let resumen = &chunks[0];
    assert_eq!(resumen.chunk_type, ChunkType::Resumen);
    assert_eq!(resumen.source_hint, "[DOC EP-001 | resumen]");

    assert!(resumen.text.starts_with("[TIPO] Epicrisis"));
    assert!(resumen.text.contains("[INGRESO] 2024-03-01"));
    assert!(resumen.text.contains("[ALTA] 2024-03-08"));
    assert!(resumen.text.contains("[EDAD] 62"));
    assert!(resumen.text.contains("[SEXO] femenino"));
    assert!(resumen.text.contains("[MOTIVO] Dolor torácico agudo"));
    assert!(resumen
        .text
        .contains("Antecedentes médicos:\n- Hipertensión arterial\n- Diabetes mellitus tipo 2"));
    assert!(resumen.text.contains("Alergias: Penicilina"));
    assert!(resumen
        .text
        .contains("Diagnóstico de ingreso:\n- I21.0: Infarto agudo de miocardio"));
    assert!(resumen.text.contains("Procedimientos:\n- 36.06: Angioplastia coronaria"));
    assert!(resumen.text.contains(
        "Tratamientos intrahospitalarios:\n- [B01AC06] Aspirina vía oral dosis 100 mg freq c/24h (2024-03-01 → 2024-03-08)"
    ));
}

#[test]
fn labs_chunk_renders_values_units_status_and_ranges() {
    let record = parse_record(&sample_record_json()).expect("parse");
    let chunks = build_chunks(&record);
    let labs = chunks
        .iter()
        .find(|c| c.chunk_type == ChunkType::Laboratorios)
        .expect("labs chunk");
    assert_eq!(labs.chunk_key, "EP-001::labs");
    assert_eq!(labs.source_hint, "[DOC EP-001 | laboratorios]");
    assert!(labs.text.starts_with("[TIPO] Laboratorios"));
    assert!(labs.text.contains(
        "- Hemoglobina ingreso=9.8 g/dL (bajo) ref=[12..16] fecha=2024-03-01 periodo[min=9.1, max=11.2]"
    ));
}

#[test]
fn labs_line_omits_missing_subfields() {
    let raw = json!({
        "id_atencion": "X",
        "laboratorios_resumen": [
            {"prueba": "Sodio", "ingreso": {"valor": 141}},
            {"prueba": "Potasio", "ingreso": {"rango_inferior": 3.5}}
        ]
    })
    .to_string();
    let chunks = build_chunks(&parse_record(&raw).expect("parse"));
    let labs = chunks
        .iter()
        .find(|c| c.chunk_type == ChunkType::Laboratorios)
        .expect("labs chunk");
    assert!(labs.text.contains("- Sodio ingreso=141"));
    assert!(!labs.text.contains("Sodio ingreso=141 ("));
    assert!(labs.text.contains("- Potasio ref=[3.5..?]"));
}

#[test]
fn alta_chunk_lists_medications_and_instructions() {
    let record = parse_record(&sample_record_json()).expect("parse");
    let chunks = build_chunks(&record);
    let alta = chunks
        .iter()
        .find(|c| c.chunk_type == ChunkType::Alta)
        .expect("alta chunk");
    assert_eq!(alta.chunk_key, "EP-001::alta");
    assert!(alta.text.starts_with("[TIPO] Indicaciones de alta"));
    assert!(alta.text.contains(
        "Medicamentos:\n- [B01AC06] Aspirina dosis 100 mg vía oral freq cada 24 horas duración indefinida"
    ));
    assert!(alta.text.contains("Controles:\n- Control con cardiología en 7 días"));
    assert!(alta.text.contains("Cuidados:\n- Reposo relativo"));
    assert!(alta.text.contains("Signos de alarma:\n- Dolor torácico recurrente"));
}

#[test]
fn empty_sections_are_omitted() {
    let chunks = build_chunks(&parse_record("{}").expect("parse"));
    // Only the resumen survives (its type header alone is non-empty).
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].chunk_key, "unknown::resumen");
    assert_eq!(chunks[0].text, "[TIPO] Epicrisis");
}

#[test]
fn non_array_lists_do_not_break_chunking() {
    let raw = json!({
        "id_atencion": "X",
        "evolucion_resumen": "no es una lista",
        "laboratorios_resumen": {"prueba": "suelto"}
    })
    .to_string();
    let chunks = build_chunks(&parse_record(&raw).expect("parse"));
    assert!(!chunks.iter().any(|c| c.chunk_type == ChunkType::EvolucionDia));
    assert!(!chunks.iter().any(|c| c.chunk_type == ChunkType::Laboratorios));
}
