use super::config::StreamOptions;
use async_nats::jetstream::{self, stream::Config};
use std::time::Duration;
use tracing::info;

/// Default maximum age for messages in seconds (24 hours).
const DEFAULT_MAX_AGE_SECS: u64 = 86400;

/// Default duplicate window in seconds.
const DEFAULT_DUPLICATE_WINDOW_SECS: u64 = 120;

/// Errors that can occur during stream operations.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to create or update the JetStream stream.
    #[error("Failed to create JetStream stream {name}: {source}")]
    CreateStream {
        name: String,
        #[source]
        source: async_nats::jetstream::context::CreateStreamError,
    },
}

/// Creates the stream, or updates it if it already exists.
///
/// On update the subjects are merged with the existing ones and unspecified
/// values keep their current setting.
pub async fn create_or_update_stream(
    jetstream: &jetstream::Context,
    stream_opts: &StreamOptions,
) -> Result<(), Error> {
    match jetstream.get_stream(&stream_opts.name).await {
        Ok(stream) => {
            let config = merged_config(stream.cached_info().config.clone(), stream_opts);
            jetstream
                .update_stream(config)
                .await
                .map_err(|source| Error::CreateStream {
                    name: stream_opts.name.clone(),
                    source,
                })?;
            info!("updated stream {}", stream_opts.name);
        }
        Err(_) => {
            jetstream
                .create_stream(new_config(stream_opts))
                .await
                .map_err(|source| Error::CreateStream {
                    name: stream_opts.name.clone(),
                    source,
                })?;
            info!("created stream {}", stream_opts.name);
        }
    }
    Ok(())
}

fn new_config(stream_opts: &StreamOptions) -> Config {
    // Default to wildcard if no subjects specified.
    let subjects = if stream_opts.subjects.is_empty() {
        vec![">".to_string()]
    } else {
        stream_opts.subjects.clone()
    };

    Config {
        name: stream_opts.name.clone(),
        description: stream_opts.description.clone(),
        subjects,
        max_age: Duration::from_secs(stream_opts.max_age_secs.unwrap_or(DEFAULT_MAX_AGE_SECS)),
        duplicate_window: Duration::from_secs(
            stream_opts
                .duplicate_window_secs
                .unwrap_or(DEFAULT_DUPLICATE_WINDOW_SECS),
        ),
        ..Default::default()
    }
}

fn merged_config(existing: Config, stream_opts: &StreamOptions) -> Config {
    let mut subjects = existing.subjects.clone();
    subjects.extend(stream_opts.subjects.clone());
    subjects.sort();
    subjects.dedup();

    Config {
        name: stream_opts.name.clone(),
        description: stream_opts.description.clone().or(existing.description.clone()),
        subjects,
        max_age: stream_opts
            .max_age_secs
            .map(Duration::from_secs)
            .unwrap_or(existing.max_age),
        duplicate_window: stream_opts
            .duplicate_window_secs
            .map(Duration::from_secs)
            .unwrap_or(existing.duplicate_window),
        ..existing
    }
}
