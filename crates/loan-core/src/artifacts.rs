//! Loading of the trained artifacts (model dump + label encoders).
//!
//! Both files sit next to the executable. Each may be plain JSON or gzip'd JSON
//! (`<name>.gz`); the plain file wins when both exist. Every failure here is fatal for
//! the process, so errors carry the offending path.

use crate::config::Config;
use crate::encoders::LabelEncoders;
use crate::model::TreeEnsemble;
use crate::schema::{CATEGORICAL_COLS, FEATURE_ORDER, N_FEATURES};
use anyhow::{anyhow, ensure, Context, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Artifacts {
    pub model_path: PathBuf,
    pub encoders_path: PathBuf,
    pub model: TreeEnsemble,
    pub encoders: LabelEncoders,
}

impl Artifacts {
    /// Directory holding the running executable.
    pub fn locate() -> Result<PathBuf> {
        let exe = std::env::current_exe().context("resolve current executable")?;
        exe.parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| anyhow!("executable has no parent directory: {}", exe.display()))
    }

    pub fn load_from_dir(dir: &Path, cfg: &Config) -> Result<Self> {
        let model_path = select_artifact(dir, &cfg.model_file)?;
        let encoders_path = select_artifact(dir, &cfg.encoders_file)?;

        let model: TreeEnsemble = read_json(&model_path)?;
        check_model(&model).with_context(|| format!("invalid model: {}", model_path.display()))?;

        let encoders: LabelEncoders = read_json(&encoders_path)?;
        for col in CATEGORICAL_COLS {
            if !encoders.contains(col) {
                tracing::warn!(column = col, "no label encoder for categorical column");
            }
        }

        tracing::info!(
            model = %model_path.display(),
            encoders = %encoders_path.display(),
            trees = model.trees.len(),
            "artifacts loaded"
        );

        Ok(Self {
            model_path,
            encoders_path,
            model,
            encoders,
        })
    }
}

fn select_artifact(dir: &Path, name: &str) -> Result<PathBuf> {
    let plain = dir.join(name);
    if plain.is_file() {
        return Ok(plain);
    }
    let gz = dir.join(format!("{name}.gz"));
    if gz.is_file() {
        return Ok(gz);
    }
    Err(anyhow!(
        "missing artifact in dir={}, expected {name} or {name}.gz",
        dir.display()
    ))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let f = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    let gzipped = path.extension().and_then(|e| e.to_str()) == Some("gz");
    let v = if gzipped {
        let dec = flate2::read::GzDecoder::new(f);
        serde_json::from_reader(BufReader::new(dec))
    } else {
        serde_json::from_reader(BufReader::new(f))
    };
    v.with_context(|| format!("parse {}", path.display()))
}

/// The column order is part of the artifact contract.
fn check_model(model: &TreeEnsemble) -> Result<()> {
    model.validate()?;
    ensure!(
        model.n_features == N_FEATURES,
        "model expects {} features, adapter builds {N_FEATURES}",
        model.n_features
    );
    if let Some(names) = &model.feature_names {
        for (i, (got, want)) in names.iter().zip(FEATURE_ORDER).enumerate() {
            ensure!(
                got == want,
                "feature order mismatch at column {i}: model={got} adapter={want}"
            );
        }
    }
    Ok(())
}
