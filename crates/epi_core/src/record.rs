//! Loosely-typed clinical discharge record ("epicrisis").
//!
//! Records arrive as hand-maintained JSON with optional fields throughout.
//! List fields tolerate missing, null, or non-array values (all become an
//! empty list) and skip elements that fail to decode; scalar leaves accept
//! any JSON value and are rendered through [`scalar_text`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::AppError;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClinicalRecord {
    pub id_atencion: Option<Value>,
    #[serde(deserialize_with = "lenient_object")]
    pub atencion: Option<Atencion>,
    #[serde(deserialize_with = "lenient_object")]
    pub paciente: Option<Paciente>,
    pub motivo_ingreso: Option<Value>,
    #[serde(deserialize_with = "lenient_object")]
    pub antecedentes: Option<Antecedentes>,
    #[serde(deserialize_with = "lenient_list")]
    pub diagnostico_ingreso: Vec<CodedEntry>,
    #[serde(deserialize_with = "lenient_list")]
    pub diagnostico_egreso: Vec<CodedEntry>,
    #[serde(deserialize_with = "lenient_list")]
    pub procedimientos: Vec<CodedEntry>,
    #[serde(deserialize_with = "lenient_list")]
    pub tratamientos_intrahosp: Vec<Tratamiento>,
    #[serde(deserialize_with = "lenient_list")]
    pub evolucion_resumen: Vec<EvolucionEntry>,
    #[serde(deserialize_with = "lenient_list")]
    pub laboratorios_resumen: Vec<Laboratorio>,
    #[serde(deserialize_with = "lenient_object")]
    pub indicaciones_alta: Option<IndicacionesAlta>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Atencion {
    pub id: Option<Value>,
    pub fecha_ingreso: Option<Value>,
    pub fecha_alta: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Paciente {
    pub edad: Option<Value>,
    pub sexo: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Antecedentes {
    #[serde(deserialize_with = "lenient_list")]
    pub medicos: Vec<Value>,
    #[serde(deserialize_with = "lenient_list")]
    pub quirurgicos: Vec<Value>,
    pub alergias: Option<Value>,
}

/// Coded diagnosis or procedure entry (`codigo` is CIE-10 or similar).
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CodedEntry {
    pub codigo: Option<Value>,
    pub nombre: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Tratamiento {
    pub codigo: Option<Value>,
    pub nombre: Option<Value>,
    pub via: Option<Value>,
    pub dosis: Option<Value>,
    pub frecuencia: Option<Value>,
    pub inicio: Option<Value>,
    pub fin: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct EvolucionEntry {
    pub dia: Option<Value>,
    pub texto: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Laboratorio {
    pub prueba: Option<Value>,
    pub unidad: Option<Value>,
    #[serde(deserialize_with = "lenient_object")]
    pub ingreso: Option<LabIngreso>,
    #[serde(deserialize_with = "lenient_object")]
    pub periodo: Option<LabPeriodo>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct LabIngreso {
    pub valor: Option<Value>,
    pub fecha: Option<Value>,
    pub estado: Option<Value>,
    pub rango_inferior: Option<Value>,
    pub rango_superior: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct LabPeriodo {
    pub min: Option<Value>,
    pub max: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndicacionesAlta {
    #[serde(deserialize_with = "lenient_list")]
    pub medicamentos: Vec<MedicamentoAlta>,
    #[serde(deserialize_with = "lenient_list")]
    pub controles: Vec<Value>,
    #[serde(deserialize_with = "lenient_list")]
    pub cuidados: Vec<Value>,
    #[serde(deserialize_with = "lenient_list")]
    pub signos_alarma: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct MedicamentoAlta {
    pub codigo: Option<Value>,
    pub nombre: Option<Value>,
    pub dosis: Option<Value>,
    pub via: Option<Value>,
    pub frecuencia: Option<Value>,
    pub duracion: Option<Value>,
}

impl ClinicalRecord {
    /// Document identifier: `id_atencion`, else `atencion.id`, else `unknown`.
    pub fn doc_id(&self) -> String {
        let direct = opt_text(&self.id_atencion);
        if !direct.is_empty() {
            return direct;
        }
        if let Some(atencion) = self.atencion.as_ref() {
            let nested = opt_text(&atencion.id);
            if !nested.is_empty() {
                return nested;
            }
        }
        "unknown".to_string()
    }
}

pub fn parse_record(raw: &str) -> Result<ClinicalRecord, AppError> {
    serde_json::from_str(raw).map_err(|e| {
        AppError::new("RECORD_PARSE_FAILED", "Failed to parse clinical record JSON")
            .with_details(e.to_string())
    })
}

/// Render any scalar JSON value as trimmed text: strings as-is, numbers in
/// base 10, booleans as `true`/`false`, null as empty.
pub fn scalar_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

pub fn opt_text(v: &Option<Value>) -> String {
    v.as_ref().map(scalar_text).unwrap_or_default()
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = Value::deserialize(deserializer)?;
    match v {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect()),
        _ => Ok(Vec::new()),
    }
}

fn lenient_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(v).ok())
}
