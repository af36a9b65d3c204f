//! Prompt contract for CMA generation.
//!
//! The system prompt pins the adjustment heuristics and the exact JSON
//! schema the model must return. The user prompt carries the three
//! comparables and the target as labeled plain-text blocks; the model only
//! ever sees what these builders emit.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::analysis::TargetSnapshot;
use crate::models::property::PropertyRow;

/// Sampling temperature for every CMA call.
pub const CMA_TEMPERATURE: f64 = 0.3;

/// System prompt for CMA generation: pins the valuation heuristics and
/// enforces JSON-only output with the exact response schema.
pub const CMA_SYSTEM_PROMPT: &str = r#"Eres un valuador inmobiliario experto especializado en Análisis Comparativo
de Mercado (CMA). Tu tarea es estimar el valor de una propiedad objetivo basándote en
3 propiedades comparables cuyos precios son conocidos.

LÓGICA DE AJUSTES A APLICAR:
- Cada cuarto adicional/menos respecto al promedio: +/- 3% del precio/m²
- Cada baño adicional/menos: +/- 2% del precio/m²
- Estacionamiento presente vs ausente: +/- 4% del precio total
- Piscina presente vs ausente: +/- 5% del precio total
- Diferencia en antigüedad (cada punto en escala 1-5): +/- 3% del precio total
- Diferencia en m² construidos: ajuste proporcional al precio/m²

PONDERACIÓN:
Asigna mayor peso (%) a la comparable que tenga más variables similares
a la propiedad objetivo. La suma de los 3 pesos debe ser 100%.

DEBES responder ÚNICAMENTE con un objeto JSON válido con esta estructura exacta,
sin texto adicional, sin markdown, sin bloques de código:

{
  "precio_minimo": 123000,
  "precio_sugerido": 135000,
  "precio_maximo": 148000,
  "ponderacion": [
    {"comparable": 1, "peso_pct": 40, "razon": "La más similar en m² y cuartos"},
    {"comparable": 2, "peso_pct": 35, "razon": "Similar pero sin piscina"},
    {"comparable": 3, "peso_pct": 25, "razon": "Zona similar pero mayor antigüedad"}
  ],
  "ajustes": [
    {"comparable": 1, "detalle": "+5% por cuarto adicional, -3% por ausencia de piscina"},
    {"comparable": 2, "detalle": "Sin ajustes significativos"},
    {"comparable": 3, "detalle": "-6% por antigüedad inferior (2 vs 4)"}
  ],
  "precio_m2_comparables": [
    {"comparable": 1, "precio_m2": 1875},
    {"comparable": 2, "precio_m2": 1833},
    {"comparable": 3, "precio_m2": 1866}
  ],
  "justificacion": "Párrafo de 3 a 5 líneas explicando el razonamiento en lenguaje claro.",
  "consideraciones": "Factores externos que el agente debe validar: zona, tendencia del mercado, etc."
}"#;

/// One comparable as fed to the prompt: the catalog listing plus the
/// agent-supplied condition score (1-5) for this run. The score is not a
/// catalog attribute, so it travels alongside the row instead of in it.
#[derive(Debug, Clone)]
pub struct ComparableInput {
    pub property: PropertyRow,
    pub condition: i32,
}

/// Assembles the user prompt: three comparable blocks, the target block,
/// the optional free-text context, and the closing instruction.
pub fn build_user_prompt(comparables: &[ComparableInput; 3], target: &TargetSnapshot) -> String {
    let mut blocks: Vec<String> = comparables
        .iter()
        .enumerate()
        .map(|(i, comp)| comparable_block(i + 1, comp))
        .collect();
    blocks.push(target_block(target));

    let mut prompt = blocks.join("\n\n");

    if !target.context.is_empty() {
        prompt.push_str(&format!("\n\nContexto adicional: {}", target.context));
    }

    prompt.push_str("\n\nRealiza el CMA y devuelve únicamente el JSON.");
    prompt
}

fn comparable_block(number: usize, comp: &ComparableInput) -> String {
    let p = &comp.property;
    let mut lines = vec![
        format!("--- COMPARABLE {number} ---"),
        format!("Precio de venta: {}", fmt_usd_cents(&p.price_usd)),
        format!(
            "Precio por m² construido: {}",
            fmt_price_per_m2(&p.price_usd, &p.built_area)
        ),
        format!("Terreno (m²): {}", fmt_area(&p.lot_area)),
        format!("Construcción (m²): {}", fmt_area(&p.built_area)),
        format!("Cuartos: {}", p.rooms),
        format!("Baños: {}", p.baths),
        format!("Estacionamiento: {}", si_no(p.parking)),
        format!("Piscina: {}", si_no(p.pool)),
        format!("Antigüedad (1-5): {}", comp.condition),
    ];
    if !p.zone.is_empty() {
        lines.push(format!("Zona: {}", p.zone));
    }
    lines.join("\n")
}

// The target block deliberately carries no price lines.
fn target_block(target: &TargetSnapshot) -> String {
    let mut lines = vec![
        "--- PROPIEDAD OBJETIVO (sin precio) ---".to_string(),
        format!("Terreno (m²): {}", fmt_area(&target.lot_area)),
        format!("Construcción (m²): {}", fmt_area(&target.built_area)),
        format!("Cuartos: {}", target.rooms),
        format!("Baños: {}", target.baths),
        format!("Estacionamiento: {}", si_no(target.parking)),
        format!("Piscina: {}", si_no(target.pool)),
        format!("Antigüedad (1-5): {}", target.condition),
    ];
    if !target.zone.is_empty() {
        lines.push(format!("Zona: {}", target.zone));
    }
    lines.join("\n")
}

fn si_no(flag: bool) -> &'static str {
    if flag {
        "Sí"
    } else {
        "No"
    }
}

/// "$150,000.00 USD"
fn fmt_usd_cents(value: &Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{rounded:.2}");
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    format!("${}.{} USD", group_thousands(int_part), frac_part)
}

/// Whole-dollar price per built m², "N/D" when the built area is zero.
fn fmt_price_per_m2(price: &Decimal, built_area: &Decimal) -> String {
    if built_area.is_zero() {
        return "N/D".to_string();
    }
    let per_m2 = (price / built_area).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    format!("${} USD", group_thousands(&per_m2.to_string()))
}

fn fmt_area(value: &Decimal) -> String {
    value.normalize().to_string()
}

fn group_thousands(amount: &str) -> String {
    // A leading sign stays outside the digit groups.
    let (sign, digits) = match amount.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", amount),
    };
    let mut out = String::with_capacity(amount.len() + digits.len() / 3);
    out.push_str(sign);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
