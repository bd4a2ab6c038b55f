//! Rule-based scorer used by the web front-end when no trained model is served.
//!
//! Starts from 0.5 and adds or subtracts fixed points per band, weighted roughly like the
//! forest's feature importances. Works on the raw (unencoded) record, like `explain`.

use crate::explain::{num, text};
use crate::schema::{Verdict, FEATURE_ORDER};
use crate::util::{clamp01, round2};
use anyhow::{bail, Result};
use serde_json::{Map, Value};

const BASE: f64 = 0.5;
const APPROVE_AT: f64 = 0.5;

/// Score one application. Every model column must be present and non-null.
pub fn score(record: &Map<String, Value>) -> Result<Verdict> {
    for col in FEATURE_ORDER {
        if record.get(col).map_or(true, Value::is_null) {
            bail!("missing field: {col}");
        }
    }

    let income = num(record, "person_income")?;
    let points = [
        ratio_points(num(record, "loan_percent_income")?),
        income_points(income),
        credit_points(num(record, "credit_score")?),
        rate_points(num(record, "loan_int_rate")?),
        amount_points(num(record, "loan_amnt")? / income),
        age_points(num(record, "person_age")?),
        history_points(num(record, "cb_person_cred_hist_length")?),
        experience_points(num(record, "person_emp_exp")?),
        defaults_points(text(record, "previous_loan_defaults_on_file")?),
        home_points(text(record, "person_home_ownership")?),
        intent_points(text(record, "loan_intent")?),
        education_points(text(record, "person_education")?),
    ];

    let p = clamp01(BASE + points.iter().sum::<f64>());
    tracing::debug!(?points, p, "heuristic score");
    Ok(Verdict::decided(p >= APPROVE_AT, round2(p)))
}

/// First band with `x <= bound` wins. NaN falls through to `otherwise`.
fn at_most(x: f64, bands: &[(f64, f64)], otherwise: f64) -> f64 {
    bands
        .iter()
        .find(|(bound, _)| x <= *bound)
        .map_or(otherwise, |(_, pts)| *pts)
}

/// First band with `x >= bound` wins. NaN falls through to `otherwise`.
fn at_least(x: f64, bands: &[(f64, f64)], otherwise: f64) -> f64 {
    bands
        .iter()
        .find(|(bound, _)| x >= *bound)
        .map_or(otherwise, |(_, pts)| *pts)
}

fn ratio_points(loan_percent_income: f64) -> f64 {
    at_most(
        loan_percent_income,
        &[(0.1, 0.20), (0.2, 0.10), (0.3, 0.0), (0.4, -0.15)],
        -0.30,
    )
}

fn income_points(income: f64) -> f64 {
    at_least(
        income,
        &[(100_000.0, 0.12), (70_000.0, 0.08), (50_000.0, 0.04), (30_000.0, -0.02)],
        -0.08,
    )
}

fn credit_points(credit_score: f64) -> f64 {
    at_least(
        credit_score,
        &[(750.0, 0.15), (700.0, 0.10), (650.0, 0.03), (600.0, -0.05)],
        -0.20,
    )
}

fn rate_points(int_rate: f64) -> f64 {
    at_most(int_rate, &[(8.0, 0.06), (12.0, 0.02), (16.0, -0.04)], -0.10)
}

/// Loan amount over annual income. A zero income gives inf (or NaN), the worst band.
fn amount_points(loan_to_income: f64) -> f64 {
    at_most(loan_to_income, &[(0.3, 0.06), (0.5, 0.02), (0.8, -0.03)], -0.08)
}

fn age_points(age: f64) -> f64 {
    if (30.0..=55.0).contains(&age) {
        0.04
    } else if (25.0..30.0).contains(&age) {
        0.02
    } else if age < 25.0 {
        -0.03
    } else {
        -0.01
    }
}

fn history_points(years: f64) -> f64 {
    at_least(years, &[(10.0, 0.06), (5.0, 0.03), (2.0, 0.01)], -0.05)
}

fn experience_points(years: f64) -> f64 {
    at_least(years, &[(10.0, 0.04), (5.0, 0.02), (2.0, 0.01)], -0.03)
}

fn defaults_points(on_file: &str) -> f64 {
    if on_file == "Yes" {
        -0.25
    } else {
        0.05
    }
}

fn home_points(ownership: &str) -> f64 {
    match ownership {
        "OWN" => 0.04,
        "MORTGAGE" => 0.02,
        "RENT" => -0.01,
        _ => 0.0,
    }
}

fn intent_points(intent: &str) -> f64 {
    match intent {
        "EDUCATION" | "HOMEIMPROVEMENT" => 0.02,
        "VENTURE" => -0.02,
        _ => 0.0,
    }
}

fn education_points(education: &str) -> f64 {
    match education {
        "Doctorate" | "Master" => 0.02,
        "Bachelor" => 0.01,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::tests::applicant;
    use crate::schema::{MSG_APPROVED, MSG_REFUSED};
    use serde_json::json;

    #[test]
    fn ratio_bands_are_inclusive_upper_bounds() {
        assert_eq!(ratio_points(0.1), 0.20);
        assert_eq!(ratio_points(0.15), 0.10);
        assert_eq!(ratio_points(0.2), 0.10);
        assert_eq!(ratio_points(0.3), 0.0);
        assert_eq!(ratio_points(0.4), -0.15);
        assert_eq!(ratio_points(0.41), -0.30);
    }

    #[test]
    fn credit_bands_are_inclusive_lower_bounds() {
        assert_eq!(credit_points(750.0), 0.15);
        assert_eq!(credit_points(749.0), 0.10);
        assert_eq!(credit_points(700.0), 0.10);
        assert_eq!(credit_points(650.0), 0.03);
        assert_eq!(credit_points(600.0), -0.05);
        assert_eq!(credit_points(599.0), -0.20);
    }

    #[test]
    fn age_and_income_edges() {
        assert_eq!(age_points(24.0), -0.03);
        assert_eq!(age_points(25.0), 0.02);
        assert_eq!(age_points(30.0), 0.04);
        assert_eq!(age_points(55.0), 0.04);
        assert_eq!(age_points(56.0), -0.01);

        assert_eq!(income_points(100_000.0), 0.12);
        assert_eq!(income_points(29_999.0), -0.08);
        assert_eq!(amount_points(f64::INFINITY), -0.08);
        assert_eq!(amount_points(f64::NAN), -0.08);
    }

    #[test]
    fn example_applicant_is_approved_with_rounded_probability() {
        let v = score(&applicant()).unwrap();
        assert!(v.approved);
        assert_eq!(v.message, MSG_APPROVED);
        // 0.5 + 0.10 + 0.04 + 0.03 + 0.02 + 0.06 + 0.04 + 0.03 + 0.02 + 0.05 - 0.01 + 0.01
        assert_eq!(v.probability, 0.89);
    }

    #[test]
    fn score_is_clamped_to_unit_interval() {
        let best = json!({
            "person_age": 40, "person_gender": "female", "person_education": "Master",
            "person_income": 150000, "person_emp_exp": 12, "person_home_ownership": "OWN",
            "loan_amnt": 5000, "loan_intent": "EDUCATION", "loan_int_rate": 5.0,
            "loan_percent_income": 0.05, "cb_person_cred_hist_length": 12,
            "credit_score": 800, "previous_loan_defaults_on_file": "No"
        });
        let v = score(best.as_object().unwrap()).unwrap();
        assert!(v.approved);
        assert_eq!(v.probability, 1.0);

        let worst = json!({
            "person_age": 22, "person_gender": "male", "person_education": "High School",
            "person_income": 20000, "person_emp_exp": 0, "person_home_ownership": "RENT",
            "loan_amnt": 20000, "loan_intent": "VENTURE", "loan_int_rate": 20.0,
            "loan_percent_income": 0.6, "cb_person_cred_hist_length": 1,
            "credit_score": 500, "previous_loan_defaults_on_file": "Yes"
        });
        let v = score(worst.as_object().unwrap()).unwrap();
        assert!(!v.approved);
        assert_eq!(v.message, MSG_REFUSED);
        assert_eq!(v.probability, 0.0);
    }

    #[test]
    fn missing_or_null_field_is_an_error() {
        let mut rec = applicant();
        rec.remove("credit_score");
        let e = score(&rec).unwrap_err();
        assert_eq!(e.to_string(), "missing field: credit_score");

        let mut rec = applicant();
        rec.insert("person_gender".into(), Value::Null);
        assert!(score(&rec).is_err());
    }
}
