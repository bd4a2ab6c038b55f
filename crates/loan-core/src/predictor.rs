use crate::artifacts::Artifacts;
use crate::config::Config;
use crate::encoders::LabelEncoders;
use crate::features::{assemble, encode_record};
use crate::model::Classifier;
use crate::schema::Verdict;
use crate::util::now_us;

use serde_json::{Map, Value};
use std::path::Path;
use std::time::Instant;

/// Any failure between the raw record and the model output.
///
/// One kind only: an unknown category or a missing field surfaces the same way as a
/// model error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictError {
    message: String,
}

impl PredictError {
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for PredictError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}
impl std::error::Error for PredictError {}

impl From<anyhow::Error> for PredictError {
    fn from(e: anyhow::Error) -> Self {
        Self {
            message: format!("{e:#}"),
        }
    }
}

const NOT_AN_OBJECT: &str = "input record is not a JSON object";

pub struct Predictor {
    model: Box<dyn Classifier>,
    encoders: LabelEncoders,
}

impl Predictor {
    pub fn new(model: impl Classifier + 'static, encoders: LabelEncoders) -> Self {
        Self {
            model: Box::new(model),
            encoders,
        }
    }

    /// Load the artifacts that sit next to the running executable.
    pub fn load(cfg: &Config) -> anyhow::Result<Self> {
        let dir = Artifacts::locate()?;
        Self::load_from_dir(&dir, cfg)
    }

    pub fn load_from_dir(dir: impl AsRef<Path>, cfg: &Config) -> anyhow::Result<Self> {
        let a = Artifacts::load_from_dir(dir.as_ref(), cfg)?;
        Ok(Self::new(a.model, a.encoders))
    }

    /// Never fails: errors come back as the failure-shaped verdict.
    pub fn predict(&self, record: &Map<String, Value>) -> Verdict {
        match self.try_predict(record) {
            Ok(v) => v,
            Err(e) => {
                metrics::counter!("predict_error_total").increment(1);
                tracing::warn!(error = %e, "prediction failed");
                Verdict::failure(e.message())
            }
        }
    }

    /// Like `predict`, for any parsed JSON value. Non-objects get the failure verdict.
    pub fn predict_value(&self, input: &Value) -> Verdict {
        match input.as_object() {
            Some(record) => self.predict(record),
            None => {
                metrics::counter!("predict_error_total").increment(1);
                tracing::warn!(input = %input, "input record is not a JSON object");
                Verdict::failure(NOT_AN_OBJECT)
            }
        }
    }

    pub fn try_predict(&self, record: &Map<String, Value>) -> Result<Verdict, PredictError> {
        self.run(record).map_err(PredictError::from)
    }

    fn run(&self, record: &Map<String, Value>) -> anyhow::Result<Verdict> {
        let t_enc = Instant::now();
        let encoded = encode_record(record, &self.encoders)?;
        metrics::histogram!("stage_encode_us").record(now_us(t_enc) as f64);

        let t_asm = Instant::now();
        let row = assemble(&encoded)?;
        metrics::histogram!("stage_assemble_us").record(now_us(t_asm) as f64);

        anyhow::ensure!(
            row.len() == self.model.n_features(),
            "feature vector has {} columns, model expects {}",
            row.len(),
            self.model.n_features()
        );

        let t_inf = Instant::now();
        let label = self.model.predict(&row)?;
        let probability = self.model.predict_proba(&row)?;
        metrics::histogram!("stage_infer_us").record(now_us(t_inf) as f64);

        let approved = label != 0.0;
        tracing::debug!(?row, label, probability, "scored");
        Ok(Verdict::decided(approved, probability))
    }
}
