use crate::encoders::LabelEncoders;
use crate::schema::{CATEGORICAL_COLS, FEATURE_ORDER};
use anyhow::{anyhow, bail, Context, Result};
use serde_json::{Map, Value};

/// Replace categorical strings with their encoder codes.
///
/// Only columns present in both the record and the encoder set are touched. Returns a
/// copy; the caller's record stays as it came in, so repeated calls see the same input.
pub fn encode_record(record: &Map<String, Value>, encoders: &LabelEncoders) -> Result<Map<String, Value>> {
    let mut out = record.clone();
    for col in CATEGORICAL_COLS {
        let (Some(v), Some(le)) = (out.get_mut(col), encoders.get(col)) else {
            continue;
        };
        let label = v
            .as_str()
            .ok_or_else(|| anyhow!("column {col}: expected a string category, got {v}"))?;
        let code = le
            .transform(label)
            .with_context(|| format!("encode column {col}"))?;
        *v = Value::from(code);
    }
    Ok(out)
}

/// Dense row in training column order.
pub fn assemble(record: &Map<String, Value>) -> Result<Vec<f64>> {
    FEATURE_ORDER
        .iter()
        .map(|&col| {
            let v = record
                .get(col)
                .ok_or_else(|| anyhow!("missing field: {col}"))?;
            to_f64(col, v)
        })
        .collect()
}

fn to_f64(col: &str, v: &Value) -> Result<f64> {
    match v {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| anyhow!("column {col}: number {n} is not representable as f64")),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        // a categorical with no encoder lands here
        Value::String(s) => bail!("column {col}: could not convert string to float: {s:?}"),
        Value::Null => bail!("column {col}: value is null"),
        other => bail!("column {col}: unsupported value {other}"),
    }
}
