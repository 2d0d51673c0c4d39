//! Process configuration shared by the three pulsecast roles.
//!
//! Loaded from a TOML file and overridable through `PULSECAST__`-prefixed
//! environment variables, e.g. `PULSECAST__NATS__PASSWORD`.

use config::{Config, Environment, File};
use pulsecast_core::retry::RetryConfig;
use pulsecast_core::throttle::DEFAULT_INTERVAL_MS;
use pulsecast_nats::client::Options as NatsOptions;
use pulsecast_nats::jetstream::config::{
    Publisher, StartPosition, StreamOptions, Subscriber, DEFAULT_ACK_WAIT_SECS,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Subject carrying raw match events.
pub const RAW_EVENTS_SUBJECT: &str = "raw-events";

/// Subject carrying enriched event contexts.
pub const COMMENTARY_CONTEXT_SUBJECT: &str = "commentary_context";

/// Prefix of environment variable overrides.
const ENV_PREFIX: &str = "PULSECAST";

/// Separator between prefix and nested keys in environment overrides.
const ENV_SEPARATOR: &str = "__";

/// Errors that can occur while loading the configuration.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Configuration parsing or deserialization error.
    #[error("Failed to load configuration from {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: config::ConfigError,
    },
}

/// Main application configuration.
#[derive(PartialEq, Clone, Debug, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// NATS server address and credentials.
    #[serde(default)]
    pub nats: NatsOptions,
    /// Connection retry policy.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Event producer settings.
    #[serde(default)]
    pub producer: ProducerOptions,
    /// Context enricher settings.
    #[serde(default)]
    pub enricher: EnricherOptions,
    /// Commentary generator settings.
    #[serde(default)]
    pub commentary: CommentaryOptions,
    /// Generative model settings, required by the commentary generator.
    #[serde(default)]
    pub vertex: Option<pulsecast_vertex::config::Config>,
}

impl AppConfig {
    /// Loads the configuration file at `path` and applies environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::load_with(path, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with(path: impl AsRef<Path>, environment: Environment) -> Result<Self, Error> {
        let path = path.as_ref();
        Config::builder()
            .add_source(File::from(path))
            .add_source(
                environment
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR),
            )
            .build()
            .and_then(|config| config.try_deserialize::<AppConfig>())
            .map_err(|source| Error::Config {
                path: path.to_path_buf(),
                source,
            })
    }
}

#[derive(PartialEq, Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ProducerOptions {
    /// Destination of the raw events.
    pub output: Publisher,
    /// Delay between two sends in milliseconds (default: 2000ms).
    pub delay_ms: u64,
    /// JSON file with the events to replay. The built-in sample match is
    /// used when not set.
    pub catalog_path: Option<PathBuf>,
}

impl Default for ProducerOptions {
    fn default() -> Self {
        ProducerOptions {
            output: Publisher {
                subject: RAW_EVENTS_SUBJECT.to_string(),
                stream: Some(raw_events_stream()),
            },
            delay_ms: DEFAULT_INTERVAL_MS,
            catalog_path: None,
        }
    }
}

#[derive(PartialEq, Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct EnricherOptions {
    /// Subscription on raw events.
    pub input: Subscriber,
    /// Destination of the enriched contexts.
    pub output: Publisher,
}

impl Default for EnricherOptions {
    fn default() -> Self {
        EnricherOptions {
            input: Subscriber {
                subject: RAW_EVENTS_SUBJECT.to_string(),
                durable_name: "context-enricher".to_string(),
                stream: raw_events_stream(),
                start: StartPosition::Earliest,
                ack_wait_secs: DEFAULT_ACK_WAIT_SECS,
            },
            output: Publisher {
                subject: COMMENTARY_CONTEXT_SUBJECT.to_string(),
                stream: Some(commentary_stream()),
            },
        }
    }
}

#[derive(PartialEq, Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct CommentaryOptions {
    /// Subscription on enriched contexts.
    pub input: Subscriber,
    /// Minimum spacing between two oracle calls in milliseconds (default: 2000ms).
    pub interval_ms: u64,
}

impl Default for CommentaryOptions {
    fn default() -> Self {
        CommentaryOptions {
            input: Subscriber {
                subject: COMMENTARY_CONTEXT_SUBJECT.to_string(),
                durable_name: "commentary-generator".to_string(),
                stream: commentary_stream(),
                start: StartPosition::Latest,
                ack_wait_secs: DEFAULT_ACK_WAIT_SECS,
            },
            interval_ms: DEFAULT_INTERVAL_MS,
        }
    }
}

fn raw_events_stream() -> StreamOptions {
    StreamOptions {
        name: "RAW_EVENTS".to_string(),
        subjects: vec![RAW_EVENTS_SUBJECT.to_string()],
        create_or_update: true,
        ..Default::default()
    }
}

fn commentary_stream() -> StreamOptions {
    StreamOptions {
        name: "COMMENTARY_CONTEXT".to_string(),
        subjects: vec![COMMENTARY_CONTEXT_SUBJECT.to_string()],
        create_or_update: true,
        ..Default::default()
    }
}
