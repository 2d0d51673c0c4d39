use async_nats::jetstream::{self, context::Publish};
use pulsecast_core::stream::publisher::RecordSink;
use tracing::debug;

/// Errors that can occur during NATS JetStream publishing operations.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to publish message to JetStream.
    #[error("Failed to publish message to JetStream: {source}")]
    Publish {
        #[source]
        source: async_nats::jetstream::context::PublishError,
    },
    /// Stream management error.
    #[error(transparent)]
    Stream(#[from] super::stream::Error),
    /// Required attribute is missing.
    #[error("Missing required attribute: {}", _0)]
    MissingRequiredAttribute(String),
}

/// Publishes keyed payloads to a single subject.
///
/// The key travels as the message id, which lets the stream drop
/// re-published records inside its duplicate window.
#[derive(Debug, Clone)]
pub struct JetStreamSink {
    jetstream: jetstream::Context,
    subject: String,
}

#[async_trait::async_trait]
impl RecordSink for JetStreamSink {
    type Error = Error;

    /// Publishes one payload and waits for the stream acknowledgement.
    async fn send(&self, key: &str, payload: Vec<u8>) -> Result<(), Error> {
        let publish = Publish::build().payload(payload.into()).message_id(key);

        let ack_future = self
            .jetstream
            .send_publish(self.subject.clone(), publish)
            .await
            .map_err(|source| Error::Publish { source })?;
        let ack = ack_future
            .await
            .map_err(|source| Error::Publish { source })?;

        if ack.duplicate {
            debug!("message {} already stored in {}", key, ack.stream);
        } else {
            debug!("message {} stored in {} at {}", key, ack.stream, ack.sequence);
        }
        Ok(())
    }
}

/// Builder for configuring and creating JetStream sinks.
#[derive(Default)]
pub struct JetStreamSinkBuilder {
    jetstream: Option<jetstream::Context>,
    config: Option<super::config::Publisher>,
}

impl JetStreamSinkBuilder {
    pub fn new() -> JetStreamSinkBuilder {
        JetStreamSinkBuilder::default()
    }

    pub fn jetstream(mut self, jetstream: jetstream::Context) -> Self {
        self.jetstream = Some(jetstream);
        self
    }

    pub fn config(mut self, config: super::config::Publisher) -> Self {
        self.config = Some(config);
        self
    }

    /// Builds the sink, creating or updating its stream when configured to.
    pub async fn build(self) -> Result<JetStreamSink, Error> {
        let config = self
            .config
            .ok_or_else(|| Error::MissingRequiredAttribute("config".to_string()))?;
        let jetstream = self
            .jetstream
            .ok_or_else(|| Error::MissingRequiredAttribute("jetstream".to_string()))?;

        if let Some(stream_opts) = config.stream.as_ref().filter(|s| s.create_or_update) {
            super::stream::create_or_update_stream(&jetstream, stream_opts).await?;
        }

        Ok(JetStreamSink {
            jetstream,
            subject: config.subject,
        })
    }
}
