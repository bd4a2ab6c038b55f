use serde::{Deserialize, Serialize};

/// Artifact file names, resolved against the directory holding the executable.
///
/// There are no flags or config files: the defaults are the deployed layout.
/// Hosts that embed the library can build their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Tree-ensemble dump (`.json`, or `.json.gz` next to it)
    pub model_file: String,

    /// Per-column label encoders (`.json`, or `.json.gz` next to it)
    pub encoders_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_file: "loan_approval_model.json".to_string(),
            encoders_file: "label_encoders.json".to_string(),
        }
    }
}
