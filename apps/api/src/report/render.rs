//! PDF rendering for CMA reports.
//!
//! Flow: analysis row + comparables -> payload -> Typst world -> compile ->
//! PDF bytes. The template, the fonts and the timestamp are all fixed inputs,
//! so rendering the same stored record twice yields the same bytes.

use chrono::{DateTime, Utc};
use thiserror::Error;
use typst::diag::SourceDiagnostic;
use typst::foundations::Dict;
use typst_pdf::PdfOptions;

use crate::models::analysis::CmaAnalysisRow;
use crate::models::property::PropertyRow;
use crate::report::payload::build_report_payload;
use crate::report::world::{json_to_typst_value, ReportWorld};

/// Report layout, embedded at build time.
const CMA_TEMPLATE: &str = include_str!("../../templates/cma_report.typ");

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report compilation failed: {0}")]
    Compile(String),
    #[error("PDF export failed: {0}")]
    Export(String),
}

/// Render a stored analysis into the agent-facing PDF report.
///
/// `generated_at` feeds both the footer timestamp and the template's clock.
/// Callers pass the record's creation time, never the wall clock.
pub fn render_cma_pdf(
    analysis: &CmaAnalysisRow,
    comparables: &[PropertyRow; 3],
    generated_at: DateTime<Utc>,
) -> Result<Vec<u8>, ReportError> {
    let payload = build_report_payload(analysis, comparables, generated_at);

    let mut inputs = Dict::new();
    inputs.insert("report".into(), json_to_typst_value(&payload));

    let world = ReportWorld::new(CMA_TEMPLATE, inputs, generated_at);

    let warned = typst::compile(&world);
    for warning in &warned.warnings {
        tracing::warn!("Report template warning: {}", warning.message);
    }
    let document = warned
        .output
        .map_err(|diagnostics| ReportError::Compile(join_diagnostics(&diagnostics)))?;

    typst_pdf::pdf(&document, &PdfOptions::default())
        .map_err(|diagnostics| ReportError::Export(join_diagnostics(&diagnostics)))
}

fn join_diagnostics(diagnostics: &[SourceDiagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.message.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use uuid::Uuid;

    const FULL_RESULT: &str = r#"{
        "precio_minimo": 123000,
        "precio_sugerido": 135000,
        "precio_maximo": 148000,
        "ponderacion": [
            {"comparable": 1, "peso_pct": 45, "razon": "Misma zona y superficie similar"},
            {"comparable": 2, "peso_pct": 35, "razon": "Antigüedad equivalente"},
            {"comparable": 3, "peso_pct": 20, "razon": "Zona distinta"}
        ],
        "ajustes": [
            {"comparable": 1, "detalle": "-3% por piscina"},
            {"comparable": 3, "detalle": "+5% por zona"}
        ],
        "precio_m2_comparables": [
            {"comparable": 1, "precio_m2": 750},
            {"comparable": 2, "precio_m2": 789},
            {"comparable": 3, "precio_m2": 762}
        ],
        "justificacion": "Las comparables comparten zona y superficie.",
        "consideraciones": "El mercado de la zona muestra alta variabilidad."
    }"#;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 0).unwrap()
    }

    fn sample_property(title: &str, price: i64) -> PropertyRow {
        PropertyRow {
            id: Uuid::new_v4(),
            title: title.to_string(),
            rooms: 3,
            baths: 2,
            built_area: Decimal::from(200),
            lot_area: Decimal::from(400),
            price_usd: Decimal::from(price),
            parking: true,
            pool: false,
            zone: "Equipetrol".to_string(),
            city: "Santa Cruz".to_string(),
            active: true,
            created_at: fixed_time(),
        }
    }

    fn sample_comparables() -> [PropertyRow; 3] {
        [
            sample_property("Casa en Equipetrol Norte", 150_000),
            sample_property("Casa en Las Palmas", 142_000),
            sample_property("Casa en Urubó", 160_000),
        ]
    }

    fn sample_analysis(result_json: Value) -> CmaAnalysisRow {
        CmaAnalysisRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            comparable_1: Uuid::new_v4(),
            comparable_2: Uuid::new_v4(),
            comparable_3: Uuid::new_v4(),
            target_title: "Casa familiar en zona norte".to_string(),
            target_rooms: 3,
            target_baths: 2,
            target_built_area: Decimal::from(180),
            target_lot_area: Decimal::from(350),
            target_parking: true,
            target_pool: false,
            target_condition: 4,
            target_zone: "Equipetrol".to_string(),
            target_city: "Santa Cruz".to_string(),
            result_json,
            min_price: Some(Decimal::from(123_000)),
            suggested_price: Some(Decimal::from(135_000)),
            max_price: Some(Decimal::from(148_000)),
            justification: "Las comparables comparten zona y superficie.".to_string(),
            created_at: fixed_time(),
        }
    }

    #[test]
    fn test_render_produces_a_pdf() {
        let analysis = sample_analysis(serde_json::from_str(FULL_RESULT).unwrap());
        let pdf = render_cma_pdf(&analysis, &sample_comparables(), fixed_time()).unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_same_record_renders_identical_bytes() {
        let analysis = sample_analysis(serde_json::from_str(FULL_RESULT).unwrap());
        let comparables = sample_comparables();

        let first = render_cma_pdf(&analysis, &comparables, fixed_time()).unwrap();
        let second = render_cma_pdf(&analysis, &comparables, fixed_time()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_report_text_carries_analysis_content() {
        let analysis = sample_analysis(serde_json::from_str(FULL_RESULT).unwrap());
        let pdf = render_cma_pdf(&analysis, &sample_comparables(), fixed_time()).unwrap();

        let text = pdf_extract::extract_text_from_mem(&pdf).unwrap();
        assert!(text.contains("VALOR ESTIMADO"));
        assert!(text.contains("135,000"));
        assert!(text.contains("Ponderaci"));
        assert!(text.contains("Ajustes Aplicados"));
        assert!(text.contains("Consideraciones"));
        assert!(text.contains("14/03/2026 15:09"));
    }

    #[test]
    fn test_empty_result_omits_conditional_sections() {
        let mut analysis = sample_analysis(json!({}));
        analysis.justification = String::new();

        let pdf = render_cma_pdf(&analysis, &sample_comparables(), fixed_time()).unwrap();

        let text = pdf_extract::extract_text_from_mem(&pdf).unwrap();
        assert!(!text.contains("Ponderaci"));
        assert!(!text.contains("Ajustes Aplicados"));
        assert!(!text.contains("Justificaci"));
        assert!(!text.contains("Consideraciones"));
        assert!(text.contains("VALOR ESTIMADO"));
    }

    #[test]
    fn test_report_renders_without_price_band() {
        let mut analysis = sample_analysis(json!({}));
        analysis.min_price = None;
        analysis.suggested_price = None;
        analysis.max_price = None;

        let pdf = render_cma_pdf(&analysis, &sample_comparables(), fixed_time()).unwrap();

        let text = pdf_extract::extract_text_from_mem(&pdf).unwrap();
        assert!(!text.contains("123,000"));
        assert!(text.contains("VALOR ESTIMADO"));
    }
}
