use pulsecast_core::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use tokio_retry::Retry;
use tracing::{info, warn};

/// Default NATS Server host.
pub const DEFAULT_NATS_HOST: &str = "localhost:4222";

/// Connection name announced to the server.
const CONNECTION_NAME: &str = "pulsecast";

/// Server address and credentials, as found in the `nats` config section.
#[derive(PartialEq, Eq, Clone, Debug, Deserialize, Serialize)]
pub struct Options {
    /// Server address (default: localhost:4222).
    #[serde(default = "default_host")]
    pub host: String,
    /// User name for user/password authentication.
    #[serde(default)]
    pub user: Option<String>,
    /// Password for user/password authentication.
    #[serde(default)]
    pub password: Option<String>,
    /// Require a TLS connection.
    #[serde(default)]
    pub tls: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            host: default_host(),
            user: None,
            password: None,
            tls: false,
        }
    }
}

fn default_host() -> String {
    DEFAULT_NATS_HOST.to_string()
}

/// Errors that can occur during NATS client operations.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to establish connection to server.
    #[error("Failed to connect to NATS at {host}: {source}")]
    Connect {
        host: String,
        #[source]
        source: async_nats::ConnectError,
    },
    /// Only one half of the user/password pair was configured.
    #[error("Both user and password are required for authentication")]
    IncompleteCredentials,
    /// Required configuration attribute is missing.
    #[error("Missing required attribute: {}", _0)]
    MissingRequiredAttribute(String),
}

/// NATS client with a JetStream context for reliable messaging.
#[derive(Debug)]
pub struct Client {
    /// Server address and credentials.
    options: Options,
    /// Connection retry policy.
    retry: RetryConfig,
    /// Core connection, set once connected.
    pub client: Option<async_nats::Client>,
    /// JetStream context for reliable messaging operations.
    pub jetstream: Option<async_nats::jetstream::Context>,
}

impl Client {
    fn connect_options(&self) -> Result<async_nats::ConnectOptions, Error> {
        let connect_options = match (&self.options.user, &self.options.password) {
            (Some(user), Some(password)) => {
                async_nats::ConnectOptions::with_user_and_password(user.clone(), password.clone())
            }
            (None, None) => async_nats::ConnectOptions::new(),
            _ => return Err(Error::IncompleteCredentials),
        };
        Ok(connect_options
            .name(CONNECTION_NAME)
            .require_tls(self.options.tls))
    }

    /// Flushes pending messages and releases the connection.
    pub async fn close(mut self) {
        self.jetstream = None;
        if let Some(client) = self.client.take() {
            if let Err(e) = client.flush().await {
                warn!("failed to flush NATS connection: {}", e);
            }
            info!("disconnected from NATS at {}", self.options.host);
        }
    }
}

impl pulsecast_core::client::Client for Client {
    type Error = Error;

    /// Connects to the NATS Server, retrying with backoff.
    async fn connect(mut self) -> Result<Self, Error> {
        self.connect_options()?;

        let this = &self;
        let nats_client = Retry::spawn(this.retry.strategy(), || async move {
            let connect_options = this.connect_options()?;
            connect_options
                .connect(this.options.host.clone())
                .await
                .map_err(|source| {
                    warn!("connection to {} failed: {}", this.options.host, source);
                    Error::Connect {
                        host: this.options.host.clone(),
                        source,
                    }
                })
        })
        .await?;

        info!("connected to NATS at {}", self.options.host);
        self.jetstream = Some(async_nats::jetstream::new(nats_client.clone()));
        self.client = Some(nats_client);
        Ok(self)
    }
}

/// Builder for configuring and creating NATS clients.
#[derive(Default)]
pub struct ClientBuilder {
    options: Option<Options>,
    retry: Option<RetryConfig>,
}

impl ClientBuilder {
    /// Creates a new instance of a client builder.
    pub fn new() -> Self {
        ClientBuilder::default()
    }

    pub fn options(mut self, options: Options) -> Self {
        self.options = Some(options);
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Generates a new NATS Client or returns an error if options are missing.
    pub fn build(self) -> Result<Client, Error> {
        Ok(Client {
            options: self
                .options
                .ok_or_else(|| Error::MissingRequiredAttribute("options".to_string()))?,
            retry: self.retry.unwrap_or_default(),
            client: None,
            jetstream: None,
        })
    }
}
