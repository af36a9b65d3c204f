//! Builds the data dictionary the report template consumes.
//!
//! Every formatting decision happens here, in Rust: currency strings, Sí/No
//! flags, truncation, missing-value placeholders. The template only lays
//! values out, so the text a reader sees in the PDF is exactly the text
//! assembled in this module.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::{json, Value};

use crate::cma::parser::CmaResult;
use crate::models::analysis::CmaAnalysisRow;
use crate::models::property::PropertyRow;

/// Placeholder for missing or non-numeric values.
const MISSING: &str = "—";

pub fn build_report_payload(
    analysis: &CmaAnalysisRow,
    comparables: &[PropertyRow; 3],
    generated_at: DateTime<Utc>,
) -> Value {
    // Stored result JSON always decodes; a degenerate value just renders as
    // placeholders.
    let result: CmaResult =
        serde_json::from_value(analysis.result_json.clone()).unwrap_or_default();

    let target_rows: Vec<Vec<String>> = vec![
        vec!["Título".into(), analysis.target_title.clone()],
        vec!["Cuartos".into(), analysis.target_rooms.to_string()],
        vec!["Baños".into(), analysis.target_baths.to_string()],
        vec!["Área construida".into(), fmt_area(&analysis.target_built_area)],
        vec!["Área terreno".into(), fmt_area(&analysis.target_lot_area)],
        vec!["Estacionamiento".into(), si_no(analysis.target_parking).into()],
        vec!["Piscina".into(), si_no(analysis.target_pool).into()],
        vec!["Antigüedad (1-5)".into(), analysis.target_condition.to_string()],
        vec![
            "Zona / Ciudad".into(),
            format!("{} · {}", analysis.target_zone, analysis.target_city),
        ],
    ];

    let comparable_rows: Vec<Vec<String>> = vec![
        labeled_row("Título", comparables, |c| truncate_chars(&c.title, 30)),
        labeled_row("Precio USD", comparables, |c| fmt_usd(Some(&c.price_usd))),
        labeled_row("Cuartos", comparables, |c| c.rooms.to_string()),
        labeled_row("Baños", comparables, |c| c.baths.to_string()),
        labeled_row("Área const.", comparables, |c| fmt_area(&c.built_area)),
        labeled_row("Área terreno", comparables, |c| fmt_area(&c.lot_area)),
        labeled_row("Estacionam.", comparables, |c| si_no(c.parking).into()),
        labeled_row("Piscina", comparables, |c| si_no(c.pool).into()),
        price_per_m2_row(&result),
    ];

    let weighting_rows: Vec<Vec<String>> = result
        .weighting
        .iter()
        .map(|entry| {
            vec![
                format!("Comp. {}", number_or_empty(entry.comparable)),
                format!(
                    "{}%",
                    entry
                        .weight_pct
                        .map(|p| p.normalize().to_string())
                        .unwrap_or_default()
                ),
                entry.reason.clone(),
            ]
        })
        .collect();

    let adjustment_rows: Vec<Vec<String>> = result
        .adjustments
        .iter()
        .map(|entry| {
            vec![
                format!("Comp. {}", number_or_empty(entry.comparable)),
                entry.detail.clone(),
            ]
        })
        .collect();

    let footer = format!(
        "Informe generado automáticamente por HouseMatch IA · {} · \
         Este análisis no reemplaza un avalúo formal.",
        generated_at.format("%d/%m/%Y %H:%M")
    );

    json!({
        "target_rows": target_rows,
        "comparable_rows": comparable_rows,
        "weighting_rows": weighting_rows,
        "adjustment_rows": adjustment_rows,
        "price_min": fmt_usd(analysis.min_price.as_ref()),
        "price_suggested": fmt_usd(analysis.suggested_price.as_ref()),
        "price_max": fmt_usd(analysis.max_price.as_ref()),
        "justification": analysis.justification,
        "considerations": result.considerations,
        "footer": footer,
    })
}

/// Whole-dollar currency, rounded half away from zero: "$123,457 USD".
/// A missing value renders as an em dash.
pub fn fmt_usd(value: Option<&Decimal>) -> String {
    match value {
        Some(d) => {
            let rounded = d.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
            format!("${} USD", group_thousands(&rounded.to_string()))
        }
        None => MISSING.to_string(),
    }
}

fn labeled_row(
    label: &str,
    comparables: &[PropertyRow; 3],
    cell: impl Fn(&PropertyRow) -> String,
) -> Vec<String> {
    let mut row = vec![label.to_string()];
    row.extend(comparables.iter().map(cell));
    row
}

/// The model reports price-per-m² keyed by comparable number (1-3), not by
/// position, so each cell is a lookup.
fn price_per_m2_row(result: &CmaResult) -> Vec<String> {
    let mut row = vec!["Precio/m²".to_string()];
    for number in 1..=3i64 {
        let value = result
            .price_per_area
            .iter()
            .find(|entry| entry.comparable == Some(number))
            .and_then(|entry| entry.price_m2.as_ref());
        row.push(fmt_usd(value));
    }
    row
}

fn number_or_empty(number: Option<i64>) -> String {
    number.map(|n| n.to_string()).unwrap_or_default()
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn si_no(flag: bool) -> &'static str {
    if flag {
        "Sí"
    } else {
        "No"
    }
}

fn fmt_area(value: &Decimal) -> String {
    format!("{} m²", value.normalize())
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use uuid::Uuid;

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
            created_at: Utc::now(),
        }
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
            created_at: Utc::now(),
        }
    }

    fn sample_comparables() -> [PropertyRow; 3] {
        [
            sample_property("Casa A", 150_000),
            sample_property("Casa B", 142_000),
            sample_property("Casa C", 160_000),
        ]
    }

    #[test]
    fn test_fmt_usd_rounds_and_groups() {
        assert_eq!(fmt_usd(Some(&Decimal::from(135_000))), "$135,000 USD");
        assert_eq!(
            fmt_usd(Some(&Decimal::from_str("99999.6").unwrap())),
            "$100,000 USD"
        );
        assert_eq!(
            fmt_usd(Some(&Decimal::from_str("123456.7").unwrap())),
            "$123,457 USD"
        );
    }

    #[test]
    fn test_fmt_usd_missing_value_is_dash() {
        assert_eq!(fmt_usd(None), "—");
    }

    #[test]
    fn test_fmt_usd_negative_amount_keeps_sign_outside_groups() {
        assert_eq!(fmt_usd(Some(&Decimal::from(-150_000))), "$-150,000 USD");
        assert_eq!(fmt_usd(Some(&Decimal::from(-500))), "$-500 USD");
        assert_eq!(
            fmt_usd(Some(&Decimal::from(-1_500_000))),
            "$-1,500,000 USD"
        );
    }

    #[test]
    fn test_target_table_has_nine_rows() {
        let payload = build_report_payload(
            &sample_analysis(json!({})),
            &sample_comparables(),
            Utc::now(),
        );

        let rows = payload["target_rows"].as_array().unwrap();
        assert_eq!(rows.len(), 9);
        assert_eq!(rows[0][0], "Título");
        assert_eq!(rows[8][1], "Equipetrol · Santa Cruz");
    }

    #[test]
    fn test_price_per_m2_cells_are_looked_up_by_number() {
        let result = json!({
            "precio_m2_comparables": [
                {"comparable": 3, "precio_m2": 1866},
                {"comparable": 1, "precio_m2": 1875}
            ]
        });
        let payload =
            build_report_payload(&sample_analysis(result), &sample_comparables(), Utc::now());

        let rows = payload["comparable_rows"].as_array().unwrap();
        let m2_row = rows.last().unwrap();
        assert_eq!(m2_row[0], "Precio/m²");
        assert_eq!(m2_row[1], "$1,875 USD");
        assert_eq!(m2_row[2], "—");
        assert_eq!(m2_row[3], "$1,866 USD");
    }

    #[test]
    fn test_comparable_titles_are_truncated() {
        let mut comparables = sample_comparables();
        comparables[0].title = "Residencia de lujo con vista al parque urbano central".to_string();

        let payload =
            build_report_payload(&sample_analysis(json!({})), &comparables, Utc::now());

        let title_row = &payload["comparable_rows"][0];
        assert_eq!(title_row[1].as_str().unwrap().chars().count(), 30);
    }

    #[test]
    fn test_empty_result_leaves_conditional_sections_empty() {
        let payload = build_report_payload(
            &sample_analysis(json!({})),
            &sample_comparables(),
            Utc::now(),
        );

        assert!(payload["weighting_rows"].as_array().unwrap().is_empty());
        assert!(payload["adjustment_rows"].as_array().unwrap().is_empty());
        assert_eq!(payload["considerations"], "");
    }

    #[test]
    fn test_denormalized_prices_feed_the_price_box() {
        let mut analysis = sample_analysis(json!({}));
        analysis.suggested_price = None;

        let payload = build_report_payload(&analysis, &sample_comparables(), Utc::now());

        assert_eq!(payload["price_min"], "$123,000 USD");
        assert_eq!(payload["price_suggested"], "—");
        assert_eq!(payload["price_max"], "$148,000 USD");
    }

    #[test]
    fn test_footer_carries_generation_timestamp() {
        use chrono::TimeZone;
        let at = Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 0).unwrap();

        let payload =
            build_report_payload(&sample_analysis(json!({})), &sample_comparables(), at);

        let footer = payload["footer"].as_str().unwrap();
        assert!(footer.contains("14/03/2026 15:09"));
        assert!(footer.contains("no reemplaza un avalúo formal"));
    }
}
