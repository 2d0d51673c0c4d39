//! Paced, strictly sequential publishing of event records.

use crate::catalog::EventSource;
use crate::event::encode;
use crate::throttle::Gate;
use tracing::{error, info};

/// Errors that can occur while publishing records.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Record could not be serialized.
    #[error("Failed to encode event {event_id}: {source}")]
    Encode {
        event_id: String,
        #[source]
        source: crate::event::Error,
    },
    /// Transport rejected the record.
    #[error("Failed to send event {event_id}: {source}")]
    Send {
        event_id: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Destination for keyed payloads.
#[async_trait::async_trait]
pub trait RecordSink: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Sends one payload and waits until the transport accepted it.
    async fn send(&self, key: &str, payload: Vec<u8>) -> Result<(), Self::Error>;
}

/// Publishes every record of a source through a sink, one at a time.
pub struct Publisher<S> {
    sink: S,
    gate: Gate,
}

impl<S: RecordSink> Publisher<S> {
    pub fn new(sink: S, gate: Gate) -> Self {
        Publisher { sink, gate }
    }

    /// Gives the sink back, e.g. to close the underlying connection.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Publishes all records in order and returns how many were sent.
    ///
    /// Stops at the first record that cannot be encoded or sent.
    #[tracing::instrument(skip_all)]
    pub async fn publish<E: EventSource + Sync>(&mut self, source: &E) -> Result<usize, Error> {
        let mut sent = 0;
        for record in source.events() {
            let payload = encode(&record).map_err(|source| Error::Encode {
                event_id: record.event_id.clone(),
                source,
            })?;

            self.gate.admit().await;
            info!("sending {} event {}", record.event_type, record.event_id);

            if let Err(e) = self.sink.send(&record.event_id, payload).await {
                error!("failed to send event {}: {}", record.event_id, e);
                return Err(Error::Send {
                    event_id: record.event_id,
                    source: Box::new(e),
                });
            }
            self.gate.complete();

            info!(
                "sent {} by player #{}",
                record.event_type, record.player_number
            );
            sent += 1;
        }
        info!("all {} events sent", sent);
        Ok(sent)
    }
}
