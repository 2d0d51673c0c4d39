use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default model used for commentary generation.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default Vertex AI location.
pub const DEFAULT_LOCATION: &str = "us-central1";

/// Default time allowed for a generation call in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings of the `vertex` config section.
#[derive(PartialEq, Eq, Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    /// Google Cloud project id.
    pub project: String,
    /// Vertex AI location (default: us-central1).
    #[serde(default = "default_location")]
    pub location: String,
    /// Publisher model name (default: gemini-2.5-flash).
    #[serde(default = "default_model")]
    pub model: String,
    /// Service account key file. Application Default Credentials are used
    /// when not set.
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,
    /// Time allowed for a generation call in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Config {
    /// Full URL of the model's generateContent method.
    pub fn endpoint(&self) -> String {
        format!(
            "https://{location}-aiplatform.googleapis.com/v1/projects/{project}/locations/{location}/publishers/google/models/{model}:generateContent",
            location = self.location,
            project = self.project,
            model = self.model,
        )
    }
}

fn default_location() -> String {
    DEFAULT_LOCATION.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
