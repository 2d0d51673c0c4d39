//! Contract with the external generative text service.
//!
//! The response model follows the ranked-candidate shape of generative
//! model APIs: each candidate carries content made of one or more parts.

use serde::{Deserialize, Serialize};

/// Response of a single generation call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// One ranked generation candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl GenerateResponse {
    /// Builds a response holding a single text candidate.
    pub fn from_text(text: impl Into<String>) -> Self {
        GenerateResponse {
            candidates: vec![Candidate {
                content: Some(Content {
                    role: Some("model".to_string()),
                    parts: vec![Part {
                        text: Some(text.into()),
                    }],
                }),
                finish_reason: None,
            }],
        }
    }

    /// First text part of the first candidate, if any.
    pub fn primary_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }
}

/// A request/response text generator.
#[async_trait::async_trait]
pub trait Oracle: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Generates candidates for a single text prompt.
    async fn generate(&self, prompt: &str) -> Result<GenerateResponse, Self::Error>;
}
