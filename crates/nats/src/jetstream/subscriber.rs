use super::config::StartPosition;
use async_nats::jetstream::{self, consumer::pull, consumer::DeliverPolicy, AckKind};
use futures_util::stream::{BoxStream, StreamExt};
use pulsecast_core::stream::consumer::{BoxError, Delivery};
use std::time::Duration;
use tracing::info;

/// Messages requested from the server per pull. The consumer loop handles one
/// message at a time, so nothing is prefetched.
const MESSAGES_PER_BATCH: usize = 1;

/// Unacknowledged messages the server lets this consumer hold at once.
const MAX_ACK_PENDING: i64 = 1;

/// Delay before a negatively acknowledged message is redelivered.
const NAK_DELAY: Duration = Duration::from_secs(5);

/// Item type of a subscription stream.
pub type Messages = BoxStream<'static, Result<JetStreamDelivery, pull::MessagesError>>;

/// Errors that can occur during NATS JetStream subscription operations.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Stream management error.
    #[error(transparent)]
    Stream(#[from] super::stream::Error),
    /// JetStream consumer operation error.
    #[error(transparent)]
    Consumer(#[from] async_nats::jetstream::stream::ConsumerError),
    /// JetStream consumer stream error.
    #[error(transparent)]
    ConsumerStream(#[from] async_nats::jetstream::consumer::StreamError),
    /// Failed to get JetStream stream.
    #[error(transparent)]
    GetStream(#[from] async_nats::jetstream::context::GetStreamError),
    /// Consumer exists with conflicting filter subject configuration.
    #[error("Consumer '{consumer}' exists with different filter subject '{existing}', expected '{expected}'. Please delete the existing consumer or use a different durable name")]
    ConsumerFilterMismatch {
        consumer: String,
        existing: String,
        expected: String,
    },
    /// Required configuration attribute is missing.
    #[error("Missing required attribute: {}", _0)]
    MissingRequiredAttribute(String),
}

/// A JetStream message awaiting acknowledgement.
pub struct JetStreamDelivery(jetstream::Message);

#[async_trait::async_trait]
impl Delivery for JetStreamDelivery {
    fn payload(&self) -> &[u8] {
        &self.0.payload
    }

    async fn ack(&self) -> Result<(), BoxError> {
        self.0.ack().await
    }

    async fn nak(&self) -> Result<(), BoxError> {
        self.0.ack_with(AckKind::Nak(Some(NAK_DELAY))).await
    }
}

/// Durable pull subscription on a single subject.
#[derive(Debug)]
pub struct Subscriber {
    jetstream: jetstream::Context,
    config: super::config::Subscriber,
}

impl Subscriber {
    /// Binds to the durable consumer, creating it on first use, and returns
    /// its message stream.
    ///
    /// An existing consumer keeps its delivery position while its
    /// acknowledgement settings are brought in line with the configuration.
    pub async fn subscribe(&self) -> Result<Messages, Error> {
        if self.config.stream.create_or_update {
            super::stream::create_or_update_stream(&self.jetstream, &self.config.stream).await?;
        }

        let stream = self.jetstream.get_stream(&self.config.stream.name).await?;
        let durable_name = &self.config.durable_name;

        let mut config = consumer_config(&self.config);
        let consumer: jetstream::consumer::Consumer<pull::Config> =
            match stream.get_consumer::<pull::Config>(durable_name).await {
                Ok(existing_consumer) => {
                    let existing = &existing_consumer.cached_info().config;
                    if existing.filter_subject != self.config.subject {
                        return Err(Error::ConsumerFilterMismatch {
                            consumer: durable_name.clone(),
                            existing: existing.filter_subject.clone(),
                            expected: self.config.subject.clone(),
                        });
                    }
                    config.deliver_policy = existing.deliver_policy;
                    stream.create_consumer(config).await?
                }
                Err(_) => stream.create_consumer(config).await?,
            };

        info!(
            "subscribed to {} as {} on stream {}",
            self.config.subject, durable_name, self.config.stream.name
        );

        let messages = consumer
            .stream()
            .max_messages_per_batch(MESSAGES_PER_BATCH)
            .messages()
            .await?;
        Ok(messages
            .map(|message| message.map(JetStreamDelivery))
            .boxed())
    }
}

fn consumer_config(config: &super::config::Subscriber) -> pull::Config {
    let deliver_policy = match config.start {
        StartPosition::Latest => DeliverPolicy::New,
        StartPosition::Earliest => DeliverPolicy::All,
    };

    pull::Config {
        durable_name: Some(config.durable_name.clone()),
        filter_subject: config.subject.clone(),
        deliver_policy,
        ack_wait: Duration::from_secs(config.ack_wait_secs),
        max_ack_pending: MAX_ACK_PENDING,
        ..Default::default()
    }
}

/// Builder for configuring and creating NATS JetStream subscribers.
#[derive(Default)]
pub struct SubscriberBuilder {
    jetstream: Option<jetstream::Context>,
    config: Option<super::config::Subscriber>,
}

impl SubscriberBuilder {
    pub fn new() -> SubscriberBuilder {
        SubscriberBuilder::default()
    }

    pub fn jetstream(mut self, jetstream: jetstream::Context) -> Self {
        self.jetstream = Some(jetstream);
        self
    }

    pub fn config(mut self, config: super::config::Subscriber) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<Subscriber, Error> {
        Ok(Subscriber {
            config: self
                .config
                .ok_or_else(|| Error::MissingRequiredAttribute("config".to_string()))?,
            jetstream: self
                .jetstream
                .ok_or_else(|| Error::MissingRequiredAttribute("jetstream".to_string()))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jetstream::config::{StreamOptions, Subscriber as SubscriberConfig};

    fn config(start: StartPosition) -> SubscriberConfig {
        SubscriberConfig {
            subject: "commentary_context".to_string(),
            durable_name: "commentary-generator".to_string(),
            stream: StreamOptions {
                name: "COMMENTARY".to_string(),
                ..Default::default()
            },
            start,
            ack_wait_secs: 45,
        }
    }

    #[test]
    fn test_subscriber_builder_new() {
        let builder = SubscriberBuilder::new();
        assert!(builder.config.is_none());
        assert!(builder.jetstream.is_none());
    }

    #[test]
    fn test_subscriber_builder_build_missing_config() {
        let result = SubscriberBuilder::new().build();
        assert!(
            matches!(result.unwrap_err(), Error::MissingRequiredAttribute(attr) if attr == "config")
        );
    }

    #[test]
    fn test_subscriber_builder_build_missing_jetstream() {
        let result = SubscriberBuilder::new()
            .config(config(StartPosition::Latest))
            .build();
        assert!(
            matches!(result.unwrap_err(), Error::MissingRequiredAttribute(attr) if attr == "jetstream")
        );
    }

    #[test]
    fn test_consumer_config_latest() {
        let consumer = consumer_config(&config(StartPosition::Latest));
        assert_eq!(consumer.durable_name.as_deref(), Some("commentary-generator"));
        assert_eq!(consumer.filter_subject, "commentary_context");
        assert_eq!(consumer.deliver_policy, DeliverPolicy::New);
    }

    #[test]
    fn test_consumer_config_holds_one_message_at_a_time() {
        let consumer = consumer_config(&config(StartPosition::Latest));
        assert_eq!(consumer.max_ack_pending, 1);
        assert_eq!(consumer.ack_wait, Duration::from_secs(45));
    }

    #[test]
    fn test_consumer_config_earliest() {
        let consumer = consumer_config(&config(StartPosition::Earliest));
        assert_eq!(consumer.deliver_policy, DeliverPolicy::All);
    }

    #[test]
    fn test_filter_mismatch_message() {
        let err = Error::ConsumerFilterMismatch {
            consumer: "commentary-generator".to_string(),
            existing: "old.subject".to_string(),
            expected: "commentary_context".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("commentary-generator"));
        assert!(msg.contains("old.subject"));
        assert!(msg.contains("Please delete the existing consumer"));
    }
}
