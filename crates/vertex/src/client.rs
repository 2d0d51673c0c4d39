use crate::config::Config;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use pulsecast_core::oracle::{Content, GenerateResponse, Oracle, Part};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// OAuth scopes requested for Vertex AI calls.
const DEFAULT_SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

/// Errors that can occur while talking to Vertex AI.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Credentials could not be loaded or a token could not be issued.
    #[error("Google authentication failed with error: {source}")]
    Auth {
        #[source]
        source: gcp_auth::Error,
    },
    /// Request failed, returned an error status or an unreadable body.
    #[error("Vertex AI request failed with error: {source}")]
    Reqwest {
        #[source]
        source: reqwest::Error,
    },
    /// Client was used before `connect`.
    #[error("Client is missing or not initialized properly")]
    MissingClient(),
    /// Required builder attribute was not provided.
    #[error("Missing required attribute: {}", _0)]
    MissingRequiredAttribute(String),
}

/// Body of a generateContent call.
#[derive(Serialize, Debug)]
struct GenerateRequest {
    contents: Vec<Content>,
}

impl GenerateRequest {
    fn from_prompt(prompt: &str) -> Self {
        GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        }
    }
}

/// Vertex AI client bound to one project, location and model.
pub struct Client {
    /// Model and endpoint settings.
    config: Config,
    /// HTTP client, set once connected.
    http: Option<reqwest::Client>,
    /// Token source, set once connected.
    auth: Option<Arc<dyn TokenProvider>>,
}

impl Client {
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl pulsecast_core::client::Client for Client {
    type Error = Error;

    /// Loads credentials and prepares the HTTP client.
    async fn connect(mut self) -> Result<Self, Error> {
        let http = reqwest::ClientBuilder::new()
            .https_only(true)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()
            .map_err(|source| Error::Reqwest { source })?;

        let auth: Arc<dyn TokenProvider> = match &self.config.credentials_path {
            Some(path) => Arc::new(
                CustomServiceAccount::from_file(path).map_err(|source| Error::Auth { source })?,
            ),
            None => gcp_auth::provider()
                .await
                .map_err(|source| Error::Auth { source })?,
        };

        info!(
            "using Vertex AI model {} in {}/{}",
            self.config.model, self.config.project, self.config.location
        );
        self.http = Some(http);
        self.auth = Some(auth);
        Ok(self)
    }
}

#[async_trait::async_trait]
impl Oracle for Client {
    type Error = Error;

    async fn generate(&self, prompt: &str) -> Result<GenerateResponse, Error> {
        let (Some(http), Some(auth)) = (&self.http, &self.auth) else {
            return Err(Error::MissingClient());
        };

        let token = auth
            .token(DEFAULT_SCOPES)
            .await
            .map_err(|source| Error::Auth { source })?;

        debug!("calling {}", self.config.model);
        http.post(self.config.endpoint())
            .bearer_auth(token.as_str())
            .json(&GenerateRequest::from_prompt(prompt))
            .send()
            .await
            .map_err(|source| Error::Reqwest { source })?
            .error_for_status()
            .map_err(|source| Error::Reqwest { source })?
            .json::<GenerateResponse>()
            .await
            .map_err(|source| Error::Reqwest { source })
    }
}

/// Builder for configuring and creating Vertex AI clients.
#[derive(Default)]
pub struct ClientBuilder {
    config: Option<Config>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        ClientBuilder::default()
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<Client, Error> {
        Ok(Client {
            config: self
                .config
                .ok_or_else(|| Error::MissingRequiredAttribute("config".to_string()))?,
            http: None,
            auth: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> Config {
        serde_json::from_value(json!({"project": "match-day"})).unwrap()
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(GenerateRequest::from_prompt("Commentary:")).unwrap();
        assert_eq!(
            body,
            json!({"contents": [{"role": "user", "parts": [{"text": "Commentary:"}]}]})
        );
    }

    #[test]
    fn test_client_builder_build_missing_config() {
        let result = ClientBuilder::new().build();
        assert!(
            matches!(result, Err(Error::MissingRequiredAttribute(attr)) if attr == "config")
        );
    }

    #[test]
    fn test_client_builder_build_success() {
        let client = ClientBuilder::new().config(config()).build().unwrap();
        assert_eq!(client.config(), &config());
        assert!(client.http.is_none());
        assert!(client.auth.is_none());
    }

    #[tokio::test]
    async fn test_generate_before_connect() {
        let client = ClientBuilder::new().config(config()).build().unwrap();
        let result = client.generate("Commentary:").await;
        assert!(matches!(result, Err(Error::MissingClient())));
    }

    #[tokio::test]
    async fn test_connect_with_missing_key_file() {
        use pulsecast_core::client::Client as _;

        let client = ClientBuilder::new()
            .config(Config {
                credentials_path: Some("/nonexistent/service-account.json".into()),
                ..config()
            })
            .build()
            .unwrap();

        let result = client.connect().await;
        assert!(matches!(result, Err(Error::Auth { .. })));
    }
}
