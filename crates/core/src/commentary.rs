//! Commentary synthesis on top of a generative oracle.
//!
//! The prompt is a pure function of the event context. Whatever happens on
//! the oracle side, `synthesize` returns a line: when no usable text comes
//! back it degrades to `"<event_type> by #<player_number>"`.

use crate::decode::{decode, DecodeError};
use crate::event::{EventContext, EventType};
use crate::oracle::Oracle;
use crate::stream::consumer::Stage;
use std::convert::Infallible;
use std::time::Duration;
use tokio::time;
use tracing::{info, warn};

/// Default time allowed for a single oracle call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Fouls from which the prompt asks for a disciplinary warning.
pub const FOUL_WARNING_THRESHOLD: u32 = 3;

/// Marker that opens the disciplinary directive in the prompt.
pub const WARNING_MARKER: &str = "- WARN:";

/// Reasons for falling back to the deterministic line.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Oracle call failed.
    #[error("Oracle call failed: {source}")]
    Oracle {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Oracle did not answer in time.
    #[error("Oracle call timed out after {0:?}")]
    Timeout(Duration),
    /// Oracle answered without a usable text candidate.
    #[error("Oracle response has no text candidate")]
    NoCandidate,
    /// Required builder attribute was not provided.
    #[error("Missing required attribute: {}", _0)]
    MissingRequiredAttribute(String),
}

/// Builds the generation prompt for an event.
pub fn build_prompt(context: &EventContext) -> String {
    let mut prompt = format!(
        "You are a legendary sports commentator with perfect memory.\n\
         \n\
         EVENT: {} by Player #{} ({})\n\
         Time: {}\n\
         \n\
         PLAYER STATS:\n\
         - Shots: {}\n\
         - Goals: {}\n\
         - Fouls: {}\n\
         \n\
         Generate ONE exciting commentary sentence:\n",
        context.event_type,
        context.player_number,
        context.team,
        context.event_timestamp,
        context.player_total_shots,
        context.player_total_goals,
        context.player_total_fouls,
    );

    match context.event_type {
        EventType::Goal => prompt.push_str(&format!(
            "- Be VERY excited! This is goal #{}!\n",
            context.player_total_goals
        )),
        EventType::Shot => prompt.push_str(&format!(
            "- Mention this is shot #{}\n",
            context.player_total_shots
        )),
        _ => {}
    }

    if context.player_total_fouls >= FOUL_WARNING_THRESHOLD {
        prompt.push_str(&format!(
            "{} {} fouls - \"walking a tightrope\", \"one more and he's off!\"\n",
            WARNING_MARKER, context.player_total_fouls
        ));
    }

    prompt.push_str("\nCommentary:");
    prompt
}

/// Oracle-independent commentary line.
pub fn fallback(context: &EventContext) -> String {
    format!("{} by #{}", context.event_type, context.player_number)
}

/// Produces one commentary line per event context.
pub struct Synthesizer<O> {
    oracle: O,
    timeout: Duration,
}

impl<O: Oracle> Synthesizer<O> {
    /// Returns the model's line, or the fallback when there is none.
    pub async fn synthesize(&self, context: &EventContext) -> String {
        let prompt = build_prompt(context);
        match self.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!("{}, using fallback commentary", e);
                fallback(context)
            }
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String, Error> {
        let response = time::timeout(self.timeout, self.oracle.generate(prompt))
            .await
            .map_err(|_| Error::Timeout(self.timeout))?
            .map_err(|e| Error::Oracle {
                source: Box::new(e),
            })?;

        response
            .primary_text()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .ok_or(Error::NoCandidate)
    }
}

/// Builder for [`Synthesizer`].
pub struct SynthesizerBuilder<O> {
    oracle: Option<O>,
    timeout: Duration,
}

impl<O> Default for SynthesizerBuilder<O> {
    fn default() -> Self {
        SynthesizerBuilder {
            oracle: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl<O: Oracle> SynthesizerBuilder<O> {
    pub fn new() -> Self {
        SynthesizerBuilder::default()
    }

    pub fn oracle(mut self, oracle: O) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Synthesizer<O>, Error> {
        Ok(Synthesizer {
            oracle: self
                .oracle
                .ok_or_else(|| Error::MissingRequiredAttribute("oracle".to_string()))?,
            timeout: self.timeout,
        })
    }
}

/// Consumer stage that decodes contexts and logs their commentary.
#[async_trait::async_trait]
impl<O: Oracle> Stage for Synthesizer<O> {
    type Input = EventContext;
    type Error = Infallible;

    fn decode(&self, payload: &[u8]) -> Result<EventContext, DecodeError> {
        decode(payload)
    }

    async fn process(&self, context: EventContext) -> Result<(), Infallible> {
        info!(
            "📥 Event: {} by #{}-{}",
            context.event_type, context.player_number, context.team
        );
        info!(
            "📊 Stats: {} shots, {} goals, {} fouls",
            context.player_total_shots, context.player_total_goals, context.player_total_fouls
        );

        let commentary = self.synthesize(&context).await;
        info!(commentary = %commentary, "🎙️ \"{}\"", commentary);
        Ok(())
    }
}
