// crates/loan-core/src/schema.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Columns whose string values go through a label encoder before assembly.
pub const CATEGORICAL_COLS: [&str; 5] = [
    "person_gender",
    "person_education",
    "person_home_ownership",
    "loan_intent",
    "previous_loan_defaults_on_file",
];

/// Column order of the trained model. Versioned together with the artifacts.
pub const FEATURE_ORDER: [&str; N_FEATURES] = [
    "person_age",
    "person_gender",
    "person_education",
    "person_income",
    "person_emp_exp",
    "person_home_ownership",
    "loan_amnt",
    "loan_intent",
    "loan_int_rate",
    "loan_percent_income",
    "cb_person_cred_hist_length",
    "credit_score",
    "previous_loan_defaults_on_file",
];

pub const N_FEATURES: usize = 13;

pub const MSG_APPROVED: &str = "Prêt approuvé ✅";
pub const MSG_REFUSED: &str = "Prêt refusé ❌";
pub const MSG_ERROR_PREFIX: &str = "Erreur: ";

/// One verdict per invocation.
///
/// Success: `{"approved", "probability", "message"}`.
/// Failure: `{"error", "approved": false, "probability": 0.0, "message"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub approved: bool,
    pub probability: f64,
    pub message: String,
}

impl Verdict {
    pub fn decided(approved: bool, probability: f64) -> Self {
        let message = if approved { MSG_APPROVED } else { MSG_REFUSED };
        Self {
            error: None,
            approved,
            probability,
            message: message.to_string(),
        }
    }

    pub fn failure(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        Self {
            message: format!("{MSG_ERROR_PREFIX}{msg}"),
            error: Some(msg),
            approved: false,
            probability: 0.0,
        }
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Positive,
    Negative,
    Neutral,
}

/// A display-ready explanation line shown next to a verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub feature: String,
    pub importance: f64,
    /// Either a preformatted string ("20.0%", "5 ans") or a raw number.
    pub value: Value,
    pub impact: Impact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_shape_has_no_error_key() {
        let v = serde_json::to_value(Verdict::decided(true, 0.82)).unwrap();
        let obj = v.as_object().unwrap();
        assert!(!obj.contains_key("error"));
        assert_eq!(obj["approved"], true);
        assert_eq!(obj["message"], MSG_APPROVED);
    }

    #[test]
    fn failure_shape_leads_with_error() {
        let s = serde_json::to_string(&Verdict::failure("missing field: credit_score")).unwrap();
        assert_eq!(
            s,
            r#"{"error":"missing field: credit_score","approved":false,"probability":0.0,"message":"Erreur: missing field: credit_score"}"#
        );
    }

    #[test]
    fn refusal_message_pairs_with_not_approved() {
        let v = Verdict::decided(false, 0.1);
        assert!(!v.is_error());
        assert_eq!(v.message, MSG_REFUSED);
    }
}
