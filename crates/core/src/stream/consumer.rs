//! Transport-agnostic subscription loop.
//!
//! The loop pulls deliveries from a stream one at a time, decodes them with
//! the stage and paces processing through a [`Gate`]. A delivery is
//! acknowledged once it was processed or skipped as undecodable. A delivery
//! whose processing failed is negatively acknowledged so the transport
//! redelivers it. Undecodable payloads are skipped without consuming a pacing
//! slot. Processing runs in its own task so that a panic inside a stage is
//! logged instead of ending the subscription.

use crate::decode::DecodeError;
use crate::throttle::Gate;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, error, info, warn};

/// Boxed error used across transport boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A message handed over by the transport.
#[async_trait::async_trait]
pub trait Delivery: Send + Sync {
    fn payload(&self) -> &[u8];
    /// Acknowledges the message to the transport.
    async fn ack(&self) -> Result<(), BoxError>;
    /// Hands the message back to the transport for redelivery.
    async fn nak(&self) -> Result<(), BoxError>;
}

/// In-memory payload without acknowledgement semantics.
#[async_trait::async_trait]
impl Delivery for Vec<u8> {
    fn payload(&self) -> &[u8] {
        self
    }

    async fn ack(&self) -> Result<(), BoxError> {
        Ok(())
    }

    async fn nak(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// A processing step applied to each decodable message.
#[async_trait::async_trait]
pub trait Stage: Send + Sync + 'static {
    type Input: Send + 'static;
    type Error: Display + Send + 'static;

    fn decode(&self, payload: &[u8]) -> Result<Self::Input, DecodeError>;

    async fn process(&self, input: Self::Input) -> Result<(), Self::Error>;
}

/// Per-loop counters, returned when the loop stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// What became of a single delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Processed,
    Skipped,
    Failed,
}

/// Drives a stage over a stream of deliveries.
pub struct Consumer<T: Stage> {
    stage: Arc<T>,
    gate: Gate,
}

impl<T: Stage> Consumer<T> {
    pub fn new(stage: T, gate: Gate) -> Self {
        Consumer {
            stage: Arc::new(stage),
            gate,
        }
    }

    /// Consumes until the stream ends or `shutdown` resolves.
    #[tracing::instrument(skip_all)]
    pub async fn run<S, D, E, F>(mut self, mut stream: S, shutdown: F) -> Summary
    where
        S: Stream<Item = Result<D, E>> + Unpin,
        D: Delivery,
        E: Display + Send,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut summary = Summary::default();

        loop {
            let next = tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested, leaving subscription");
                    break;
                }
                next = stream.next() => next,
            };

            let delivery = match next {
                Some(Ok(delivery)) => delivery,
                Some(Err(e)) => {
                    warn!("failed to receive message: {}", e);
                    continue;
                }
                None => {
                    info!("message stream ended");
                    break;
                }
            };

            let settled = match self.handle(&delivery).await {
                Outcome::Processed => {
                    summary.processed += 1;
                    delivery.ack().await
                }
                Outcome::Skipped => {
                    summary.skipped += 1;
                    delivery.ack().await
                }
                Outcome::Failed => {
                    summary.failed += 1;
                    delivery.nak().await
                }
            };

            if let Err(e) = settled {
                error!("failed to settle message: {}", e);
            }
        }

        info!(
            processed = summary.processed,
            skipped = summary.skipped,
            failed = summary.failed,
            "consumer stopped"
        );
        summary
    }

    async fn handle<D: Delivery>(&mut self, delivery: &D) -> Outcome {
        let input = match self.stage.decode(delivery.payload()) {
            Ok(input) => input,
            Err(e) => {
                debug!("skipping message: {}", e);
                return Outcome::Skipped;
            }
        };

        self.gate.admit().await;

        let stage = Arc::clone(&self.stage);
        let result = tokio::spawn(async move { stage.process(input).await }).await;

        self.gate.complete();

        match result {
            Ok(Ok(())) => Outcome::Processed,
            Ok(Err(e)) => {
                error!("failed to process message: {}", e);
                Outcome::Failed
            }
            Err(e) => {
                error!("message processing aborted: {}", e);
                Outcome::Failed
            }
        }
    }
}
