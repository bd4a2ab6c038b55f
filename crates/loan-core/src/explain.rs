//! Display factors for a loan decision, as shown by the web front-end next to the verdict.
//!
//! Works on the raw (unencoded) record. The importances are the forest's global feature
//! importances, not per-record contributions.

use crate::schema::{Factor, Impact};
use anyhow::{anyhow, Result};
use serde_json::{Map, Value};

pub const FEATURE_IMPORTANCE: [(&str, f64); 13] = [
    ("loan_percent_income", 0.25),
    ("person_income", 0.15),
    ("credit_score", 0.12),
    ("loan_int_rate", 0.10),
    ("loan_amnt", 0.09),
    ("person_age", 0.07),
    ("cb_person_cred_hist_length", 0.06),
    ("person_emp_exp", 0.05),
    ("previous_loan_defaults_on_file", 0.04),
    ("person_home_ownership", 0.03),
    ("loan_intent", 0.02),
    ("person_education", 0.01),
    ("person_gender", 0.01),
];

pub fn importance(column: &str) -> f64 {
    FEATURE_IMPORTANCE
        .iter()
        .find(|(c, _)| *c == column)
        .map(|(_, w)| *w)
        .unwrap_or(0.0)
}

/// Six factors, most important first.
pub fn explain(record: &Map<String, Value>) -> Result<Vec<Factor>> {
    let ratio = num(record, "loan_percent_income")?;
    let credit = num(record, "credit_score")?;
    let income = num(record, "person_income")?;
    let defaults = text(record, "previous_loan_defaults_on_file")? == "Yes";
    let rate = num(record, "loan_int_rate")?;
    let hist = num(record, "cb_person_cred_hist_length")?;

    let mut out = vec![
        factor(
            "Ratio Prêt/Revenu",
            "loan_percent_income",
            Value::from(format!("{:.1}%", ratio * 100.0)),
            band(ratio > 0.3, ratio < 0.15),
        ),
        factor(
            "Score de Crédit",
            "credit_score",
            record
                .get("credit_score")
                .cloned()
                .unwrap_or_else(|| Value::from(credit)),
            band(credit < 600.0, credit >= 700.0),
        ),
        factor(
            "Revenu Annuel",
            "person_income",
            Value::from(format!("{} €", format_fr(income))),
            band(income < 40_000.0, income >= 80_000.0),
        ),
        factor(
            "Défauts Antérieurs",
            "previous_loan_defaults_on_file",
            Value::from(if defaults { "Oui" } else { "Non" }),
            if defaults { Impact::Negative } else { Impact::Positive },
        ),
        factor(
            "Taux d'Intérêt",
            "loan_int_rate",
            Value::from(format!("{rate}%")),
            band(rate > 15.0, rate < 10.0),
        ),
        factor(
            "Historique de Crédit",
            "cb_person_cred_hist_length",
            Value::from(format!("{hist} ans")),
            band(hist < 2.0, hist >= 5.0),
        ),
    ];

    out.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    Ok(out)
}

fn factor(label: &str, column: &str, value: Value, impact: Impact) -> Factor {
    Factor {
        feature: label.to_string(),
        importance: importance(column),
        value,
        impact,
    }
}

/// Negative wins over positive; neither is neutral.
#[inline]
fn band(negative: bool, positive: bool) -> Impact {
    if negative {
        Impact::Negative
    } else if positive {
        Impact::Positive
    } else {
        Impact::Neutral
    }
}

pub(crate) fn num(record: &Map<String, Value>, col: &str) -> Result<f64> {
    record
        .get(col)
        .and_then(Value::as_f64)
        .ok_or_else(|| anyhow!("{col}: expected a number"))
}

pub(crate) fn text<'a>(record: &'a Map<String, Value>, col: &str) -> Result<&'a str> {
    record
        .get(col)
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("{col}: expected a string"))
}

/// fr-FR grouping: narrow no-break space between thousands, comma decimals (max 3).
pub fn format_fr(x: f64) -> String {
    let rounded = (x.abs() * 1000.0).round() / 1000.0;
    let int = rounded.trunc() as u64;
    let frac = format!("{:.3}", rounded.fract());
    let frac = frac[2..].trim_end_matches('0');

    let digits = int.to_string();
    let mut out = String::with_capacity(digits.len() + 8);
    if x < 0.0 && (int > 0 || !frac.is_empty()) {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('\u{202f}');
        }
        out.push(ch);
    }
    if !frac.is_empty() {
        out.push(',');
        out.push_str(frac);
    }
    out
}
