//! The three pipeline roles, each a [`Runner`] owning its connections.
//!
//! Every role connects on start, closes its connections on every exit path
//! and, for the subscribing roles, stops on Ctrl-C.

use crate::config::AppConfig;
use async_nats::jetstream;
use pulsecast_core::catalog::{self, Catalog};
use pulsecast_core::client::Client;
use pulsecast_core::commentary::{self, SynthesizerBuilder};
use pulsecast_core::enrich::Enricher;
use pulsecast_core::stream::consumer::{Consumer, Summary};
use pulsecast_core::stream::publisher::{self, Publisher};
use pulsecast_core::task::runner::Runner;
use pulsecast_core::throttle::Gate;
use pulsecast_nats::jetstream::publisher::JetStreamSinkBuilder;
use pulsecast_nats::jetstream::subscriber::SubscriberBuilder;
use std::time::Duration;
use tracing::{info, warn};

/// Errors that can occur while running a role.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Event catalog could not be loaded.
    #[error(transparent)]
    Catalog(#[from] catalog::Error),
    /// NATS connection error.
    #[error(transparent)]
    Nats(#[from] pulsecast_nats::client::Error),
    /// JetStream publisher setup error.
    #[error(transparent)]
    Sink(#[from] pulsecast_nats::jetstream::publisher::Error),
    /// JetStream subscription error.
    #[error(transparent)]
    Subscriber(#[from] pulsecast_nats::jetstream::subscriber::Error),
    /// Publishing the catalog failed.
    #[error(transparent)]
    Publish(#[from] publisher::Error),
    /// Vertex AI client error.
    #[error(transparent)]
    Vertex(#[from] pulsecast_vertex::client::Error),
    /// Commentary synthesizer setup error.
    #[error(transparent)]
    Commentary(#[from] commentary::Error),
    /// NATS client connected without a JetStream context.
    #[error("Client is missing or not initialized properly")]
    MissingClient(),
    /// Required configuration section is missing.
    #[error("Missing required attribute: {}", _0)]
    MissingRequiredAttribute(String),
}

async fn connect_nats(config: &AppConfig) -> Result<pulsecast_nats::client::Client, Error> {
    Ok(pulsecast_nats::client::ClientBuilder::new()
        .options(config.nats.clone())
        .retry(config.retry.clone())
        .build()?
        .connect()
        .await?)
}

fn jetstream_context(
    client: &pulsecast_nats::client::Client,
) -> Result<jetstream::Context, Error> {
    client.jetstream.clone().ok_or_else(Error::MissingClient)
}

/// Headroom between one commentary cycle and the broker's redelivery deadline.
const ACK_WAIT_MARGIN_SECS: u64 = 10;

/// Acknowledgement deadline covering a full commentary cycle: the pacing wait
/// plus an oracle call that runs into its timeout.
fn commentary_ack_wait_secs(configured: u64, interval_ms: u64, timeout_secs: u64) -> u64 {
    configured.max(interval_ms.div_ceil(1000) + timeout_secs + ACK_WAIT_MARGIN_SECS)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl-C"),
        Err(e) => {
            warn!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await
        }
    }
}

/// Replays the event catalog onto the raw events subject.
pub struct Producer {
    pub config: AppConfig,
}

impl Producer {
    async fn produce(&self, client: &pulsecast_nats::client::Client) -> Result<usize, Error> {
        let catalog = match &self.config.producer.catalog_path {
            Some(path) => Catalog::from_path(path)?,
            None => Catalog::sample(),
        };

        let sink = JetStreamSinkBuilder::new()
            .jetstream(jetstream_context(client)?)
            .config(self.config.producer.output.clone())
            .build()
            .await?;

        let gate = Gate::new(Duration::from_millis(self.config.producer.delay_ms));
        let mut publisher = Publisher::new(sink, gate);
        Ok(publisher.publish(&catalog).await?)
    }
}

impl Runner for Producer {
    type Error = Error;

    #[tracing::instrument(skip(self), name = "event-producer")]
    async fn run(self) -> Result<(), Error> {
        let client = connect_nats(&self.config).await?;
        let result = self.produce(&client).await;
        client.close().await;

        let sent = result?;
        info!("producer finished after {} events", sent);
        Ok(())
    }
}

/// Keeps running per-player totals and forwards enriched contexts.
pub struct ContextEnricher {
    pub config: AppConfig,
}

impl ContextEnricher {
    async fn enrich(&self, client: &pulsecast_nats::client::Client) -> Result<Summary, Error> {
        let jetstream = jetstream_context(client)?;

        let sink = JetStreamSinkBuilder::new()
            .jetstream(jetstream.clone())
            .config(self.config.enricher.output.clone())
            .build()
            .await?;

        let messages = SubscriberBuilder::new()
            .jetstream(jetstream)
            .config(self.config.enricher.input.clone())
            .build()?
            .subscribe()
            .await?;

        let consumer = Consumer::new(Enricher::new(sink), Gate::open());
        Ok(consumer.run(messages, shutdown_signal()).await)
    }
}

impl Runner for ContextEnricher {
    type Error = Error;

    #[tracing::instrument(skip(self), name = "context-enricher")]
    async fn run(self) -> Result<(), Error> {
        let client = connect_nats(&self.config).await?;
        let result = self.enrich(&client).await;
        client.close().await;

        result.map(|summary| info!("enricher stopped: {:?}", summary))
    }
}

/// Turns enriched contexts into paced commentary lines.
pub struct CommentaryGenerator {
    pub config: AppConfig,
}

impl CommentaryGenerator {
    async fn comment(&self, client: &pulsecast_nats::client::Client) -> Result<Summary, Error> {
        let vertex_config = self
            .config
            .vertex
            .clone()
            .ok_or_else(|| Error::MissingRequiredAttribute("vertex".to_string()))?;
        let timeout = Duration::from_secs(vertex_config.timeout_secs);

        let oracle = pulsecast_vertex::client::ClientBuilder::new()
            .config(vertex_config)
            .build()?
            .connect()
            .await?;

        let synthesizer = SynthesizerBuilder::new()
            .oracle(oracle)
            .timeout(timeout)
            .build()?;

        let mut input = self.config.commentary.input.clone();
        input.ack_wait_secs = commentary_ack_wait_secs(
            input.ack_wait_secs,
            self.config.commentary.interval_ms,
            timeout.as_secs(),
        );

        let messages = SubscriberBuilder::new()
            .jetstream(jetstream_context(client)?)
            .config(input)
            .build()?
            .subscribe()
            .await?;

        let gate = Gate::new(Duration::from_millis(self.config.commentary.interval_ms));
        let consumer = Consumer::new(synthesizer, gate);
        Ok(consumer.run(messages, shutdown_signal()).await)
    }
}

impl Runner for CommentaryGenerator {
    type Error = Error;

    #[tracing::instrument(skip(self), name = "commentary-generator")]
    async fn run(self) -> Result<(), Error> {
        let client = connect_nats(&self.config).await?;
        let result = self.comment(&client).await;
        client.close().await;

        result.map(|summary| info!("commentary generator stopped: {:?}", summary))
    }
}
